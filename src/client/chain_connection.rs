//! Chain event subscription.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::client::rpc::{msg_type_query, parse_msg_type, subscribe_request, RpcResponse, NEW_BLOCK_QUERY};
use crate::client::session::{Connection, Session};
use crate::client::state::{ConnectionState, StateHandle};
use crate::client::{ConnectionError, WsStream};
use crate::config::{ConnectionRetriesConfig, SharedConfig};
use crate::events::EventDispatcher;
use crate::lifecycle::Shutdown;

pub const SIDE: &str = "chain";

const PING_INTERVAL: Duration = Duration::from_secs(30);
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// Normalise `host:port`, `tcp://`, `http(s)://` or `ws(s)://` into the
/// CometBFT websocket URL.
pub fn websocket_url(server: &str) -> Result<Url, ConnectionError> {
    let invalid = |reason: String| ConnectionError::InvalidEndpoint {
        endpoint: server.to_string(),
        reason,
    };

    let trimmed = server.trim();
    let (scheme, rest) = match trimmed.split_once("://") {
        Some(("tcp" | "http" | "ws", rest)) => ("ws", rest),
        Some(("https" | "wss", rest)) => ("wss", rest),
        Some((other, _)) => return Err(invalid(format!("unsupported scheme {other:?}"))),
        None => ("ws", trimmed),
    };
    if rest.is_empty() {
        return Err(invalid("missing host".to_string()));
    }

    let mut url = Url::parse(&format!("{scheme}://{rest}")).map_err(|e| invalid(e.to_string()))?;
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    if url.path().is_empty() || url.path() == "/" {
        url.set_path("/websocket");
    }
    Ok(url)
}

/// Subscribes to every handled message type plus new blocks and feeds
/// results to the dispatcher.
pub struct ChainConnection {
    config: SharedConfig,
    dispatcher: Arc<EventDispatcher>,
    new_blocks: broadcast::Sender<()>,
    state: Arc<StateHandle>,
}

impl ChainConnection {
    pub fn new(config: SharedConfig, dispatcher: Arc<EventDispatcher>, new_blocks: broadcast::Sender<()>) -> Self {
        Self {
            config,
            dispatcher,
            new_blocks,
            state: Arc::new(StateHandle::new(SIDE)),
        }
    }

    /// Every query subscribed on connect, new blocks first.
    pub fn queries(&self) -> Vec<String> {
        std::iter::once(NEW_BLOCK_QUERY.to_string())
            .chain(self.dispatcher.registry().msg_types().into_iter().map(msg_type_query))
            .collect()
    }
}

#[async_trait]
impl Connection for ChainConnection {
    fn side(&self) -> &'static str {
        SIDE
    }

    fn state(&self) -> &StateHandle {
        &self.state
    }

    fn retries(&self) -> ConnectionRetriesConfig {
        self.config.load().stratos_chain.connection_retries.clone()
    }

    async fn connect(&self, session: &Session) -> Result<(), ConnectionError> {
        let url = websocket_url(&self.config.load().stratos_chain.websocket_server)?;
        let (mut ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(ConnectionError::Dial)?;

        let queries = self.queries();
        let mut next_id = 0;
        subscribe_all(&mut ws, &queries, &mut next_id).await?;
        tracing::info!(url = %url, queries = queries.len(), "Subscribed to chain events");
        self.state.set(ConnectionState::Subscribed);

        let reader = Reader {
            ws,
            queries,
            next_id,
            dispatcher: self.dispatcher.clone(),
            new_blocks: self.new_blocks.clone(),
            state: self.state.clone(),
            cancel: session.cancel.clone(),
        };
        session.spawn("chain-reader", reader.run());
        Ok(())
    }
}

/// Issue one subscription per query. Subscriptions do not survive a
/// reconnect, so this runs on every connect.
async fn subscribe_all(ws: &mut WsStream, queries: &[String], next_id: &mut u64) -> Result<(), ConnectionError> {
    for query in queries {
        *next_id += 1;
        let request = subscribe_request(*next_id, query).map_err(ConnectionError::Encode)?;
        ws.send(Message::text(request)).await.map_err(ConnectionError::Write)?;
    }
    Ok(())
}

struct Reader {
    ws: WsStream,
    queries: Vec<String>,
    next_id: u64,
    dispatcher: Arc<EventDispatcher>,
    new_blocks: broadcast::Sender<()>,
    state: Arc<StateHandle>,
    cancel: Shutdown,
}

impl Reader {
    async fn run(mut self) -> Result<(), ConnectionError> {
        let mut ping = interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL);

        loop {
            let frame = tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = self.ws.close(None).await;
                    return Ok(());
                }
                _ = ping.tick() => {
                    self.ws.send(Message::Ping(Default::default())).await.map_err(ConnectionError::Write)?;
                    continue;
                }
                frame = self.ws.next() => frame,
            };

            let payload = match frame {
                None => return Err(ConnectionError::Closed),
                Some(Err(e)) => return Err(ConnectionError::Read(e)),
                Some(Ok(Message::Text(text))) => text.as_str().as_bytes().to_vec(),
                Some(Ok(Message::Binary(bytes))) => bytes.to_vec(),
                Some(Ok(Message::Close(_))) => return Err(ConnectionError::Closed),
                Some(Ok(_)) => continue,
            };

            let response: RpcResponse = match serde_json::from_slice(&payload) {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring undecodable chain websocket frame");
                    continue;
                }
            };

            if let Some(error) = response.error {
                tracing::error!(error = %error, "Chain websocket error");
                if !error.is_already_subscribed() {
                    tokio::select! {
                        _ = self.cancel.cancelled() => continue,
                        _ = tokio::time::sleep(RESUBSCRIBE_DELAY) => {}
                    }
                    subscribe_all(&mut self.ws, &self.queries, &mut self.next_id).await?;
                }
                continue;
            }

            let Some(mut result) = response.result else { continue };
            if result.query.is_empty() {
                continue;
            }
            self.state.set(ConnectionState::Streaming);
            result.clean();

            if result.query == NEW_BLOCK_QUERY {
                let _ = self.new_blocks.send(());
                self.dispatcher.handle_block(&result).await;
                continue;
            }

            match parse_msg_type(&result.query) {
                Some(msg_type) => {
                    self.dispatcher.handle_tx(msg_type, &result).await;
                }
                None => tracing::debug!(query = %result.query, "Result for unknown query"),
            }
        }
    }
}
