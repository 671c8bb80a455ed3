//! Storage network subscription.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

use crate::blockchain::{ChainApi, UnsignedMessage, Wallet};
use crate::broadcaster::{Broadcaster, FlushReport};
use crate::client::session::{Connection, Session};
use crate::client::state::{ConnectionState, StateHandle};
use crate::client::{ConnectionError, WsStream};
use crate::config::{ConnectionRetriesConfig, SharedConfig};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::sds::{decode_broadcast, RelayMessage, TYPE_BROADCAST};

pub const SIDE: &str = "sds";

/// `ws://{network_address}:{websocket_port}/websocket`.
pub fn websocket_url(network_address: &str, websocket_port: u16) -> String {
    format!("ws://{network_address}:{websocket_port}/websocket")
}

/// Receives relay envelopes from the storage node and runs the
/// broadcaster that turns them into transactions.
pub struct SdsConnection {
    config: SharedConfig,
    api: Arc<dyn ChainApi>,
    wallet: Arc<Wallet>,
    state: Arc<StateHandle>,
    reports: Option<mpsc::UnboundedSender<FlushReport>>,
}

impl SdsConnection {
    pub fn new(config: SharedConfig, api: Arc<dyn ChainApi>, wallet: Arc<Wallet>) -> Self {
        Self {
            config,
            api,
            wallet,
            state: Arc::new(StateHandle::new(SIDE)),
            reports: None,
        }
    }

    /// Forward every broadcaster flush report to `reports`.
    pub fn set_reports(&mut self, reports: mpsc::UnboundedSender<FlushReport>) {
        self.reports = Some(reports);
    }
}

#[async_trait]
impl Connection for SdsConnection {
    fn side(&self) -> &'static str {
        SIDE
    }

    fn state(&self) -> &StateHandle {
        &self.state
    }

    fn retries(&self) -> ConnectionRetriesConfig {
        self.config.load().sds.connection_retries.clone()
    }

    fn refresh_interval(&self) -> Option<Duration> {
        match self.config.load().sds.connection_retries.refresh_interval {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    async fn connect(&self, session: &Session) -> Result<(), ConnectionError> {
        let config = self.config.load_full();
        let url = websocket_url(&config.sds.network_address, config.sds.websocket_port);

        let mut request = url.as_str().into_client_request().map_err(ConnectionError::Dial)?;
        request
            .headers_mut()
            .insert("topics", HeaderValue::from_static(TYPE_BROADCAST));
        let (ws, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(ConnectionError::Dial)?;
        tracing::info!(url = %url, topic = TYPE_BROADCAST, "Subscribed to storage network events");
        self.state.set(ConnectionState::Subscribed);

        let (queue, pending) = mpsc::channel(config.stratos_chain.broadcast.channel_size.max(1));
        let mut broadcaster = Broadcaster::new(pending, self.api.clone(), self.config.clone(), &self.wallet);
        if let Some(reports) = &self.reports {
            broadcaster = broadcaster.with_reports(reports.clone());
        }

        let reader = Reader {
            ws,
            queue,
            state: self.state.clone(),
            cancel: session.cancel.clone(),
        };
        session.spawn("sds-reader", reader.run());
        session.spawn("broadcaster", broadcaster.run(session.cancel.clone()));
        Ok(())
    }
}

struct Reader {
    ws: WsStream,
    queue: mpsc::Sender<UnsignedMessage>,
    state: Arc<StateHandle>,
    cancel: Shutdown,
}

impl Reader {
    async fn run(mut self) -> Result<(), ConnectionError> {
        loop {
            let frame = tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = self.ws.close(None).await;
                    return Ok(());
                }
                frame = self.ws.next() => frame,
            };

            match frame {
                None => return Err(ConnectionError::Closed),
                Some(Err(e)) => return Err(ConnectionError::Read(e)),
                Some(Ok(Message::Binary(bytes))) => self.forward(&bytes).await?,
                Some(Ok(Message::Text(text))) => self.forward(text.as_str().as_bytes()).await?,
                Some(Ok(Message::Close(_))) => return Err(ConnectionError::Closed),
                Some(Ok(_)) => {}
            }
        }
    }

    /// Decode one frame and queue its messages for broadcast.
    async fn forward(&self, frame: &[u8]) -> Result<(), ConnectionError> {
        self.state.set(ConnectionState::Streaming);

        let envelope = match RelayMessage::decode_frame(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(error = %e, "Couldn't decode relay message");
                metrics::record_batch_dropped("decode", 1);
                return Ok(());
            }
        };
        if !envelope.is_broadcast() {
            tracing::debug!(kind = %envelope.r#type, "Ignoring relay message");
            return Ok(());
        }

        let entries = match decode_broadcast(&envelope.data) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %e, "Couldn't decode broadcast payload");
                metrics::record_batch_dropped("decode", 1);
                return Ok(());
            }
        };

        for entry in entries {
            let msg = match entry {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!(error = %e, "Skipping undecodable pending message");
                    metrics::record_batch_dropped("decode", 1);
                    continue;
                }
            };
            tracing::debug!(msg_type = %msg.msg_type, "Queueing message for broadcast");
            tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                sent = self.queue.send(msg) => sent.map_err(|_| ConnectionError::QueueClosed)?,
            }
        }
        Ok(())
    }
}
