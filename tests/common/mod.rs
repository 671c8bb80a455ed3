//! Mock peers shared by the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use prost::Message as _;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use stratos_relayer::blockchain::{AccountInfo, BlockchainResult, ChainApi, GasInfo, TxResponse};
use stratos_relayer::config::{ConnectionRetriesConfig, RelayConfig};
use stratos_relayer::sds::{RelayMessage, TYPE_BROADCAST};

pub const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Chain websocket: acknowledges and records every subscription, pushes
/// frames to the current connection and can drop it on demand.
pub struct MockChainWs {
    pub addr: SocketAddr,
    subscriptions: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    push: broadcast::Sender<String>,
    kick: broadcast::Sender<()>,
}

impl MockChainWs {
    pub async fn start() -> Self {
        let (listener, addr) = bind().await;
        let subscriptions = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let (push, _) = broadcast::channel(64);
        let (kick, _) = broadcast::channel(4);

        let mock = Self {
            addr,
            subscriptions: subscriptions.clone(),
            connections: connections.clone(),
            push: push.clone(),
            kick: kick.clone(),
        };

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };
                let subscriptions = subscriptions.clone();
                let mut frames = push.subscribe();
                let mut kicked = kick.subscribe();
                connections.fetch_add(1, Ordering::SeqCst);

                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            incoming = ws.next() => {
                                let text = match incoming {
                                    Some(Ok(Message::Text(text))) => text,
                                    Some(Ok(_)) => continue,
                                    _ => break,
                                };
                                let request: Value = serde_json::from_str(text.as_str()).unwrap_or_default();
                                if let Some(query) = request["params"]["query"].as_str() {
                                    subscriptions.lock().unwrap().push(query.to_string());
                                }
                                let ack = json!({"jsonrpc": "2.0", "id": request["id"], "result": {}});
                                if ws.send(Message::text(ack.to_string())).await.is_err() {
                                    break;
                                }
                            }
                            frame = frames.recv() => {
                                let Ok(frame) = frame else { break };
                                if ws.send(Message::text(frame)).await.is_err() {
                                    break;
                                }
                            }
                            _ = kicked.recv() => break,
                        }
                    }
                });
            }
        });
        mock
    }

    pub fn url(&self) -> String {
        format!("ws://{}/websocket", self.addr)
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Send a raw JSON frame to every open connection.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.push.send(frame.into());
    }

    /// Drop every open connection.
    pub fn drop_connections(&self) {
        let _ = self.kick.send(());
    }
}

/// A subscription notification for one transaction.
pub fn tx_notification(msg_type: &str, tx_hash: &str, events: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": {
            "query": format!("message.action='{msg_type}'"),
            "data": {
                "type": "tendermint/event/Tx",
                "value": {"TxResult": {"height": "7", "result": {"events": events}}}
            },
            "events": {"tx.hash": [tx_hash]}
        }
    })
    .to_string()
}

/// Storage network websocket: records the `topics` header of every
/// handshake and pushes relay envelopes.
pub struct MockSdsWs {
    pub addr: SocketAddr,
    topics: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    push: broadcast::Sender<Vec<u8>>,
}

impl MockSdsWs {
    pub async fn start() -> Self {
        let (listener, addr) = bind().await;
        let topics = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let (push, _) = broadcast::channel(64);

        let mock = Self {
            addr,
            topics: topics.clone(),
            connections: connections.clone(),
            push: push.clone(),
        };

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let seen = topics.clone();
                let record = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                    let topic = request
                        .headers()
                        .get("topics")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    seen.lock().unwrap().push(topic);
                    Ok(response)
                };
                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, record).await else {
                    continue;
                };
                let mut frames = push.subscribe();
                connections.fetch_add(1, Ordering::SeqCst);

                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            incoming = ws.next() => {
                                if !matches!(incoming, Some(Ok(_))) {
                                    break;
                                }
                            }
                            frame = frames.recv() => {
                                let Ok(frame) = frame else { break };
                                if ws.send(Message::binary(frame)).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
        });
        mock
    }

    pub fn topics(&self) -> Vec<String> {
        self.topics.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Push a `broadcast` envelope carrying `payload` as its JSON data.
    pub fn push_broadcast(&self, payload: &Value) {
        let frame = RelayMessage {
            r#type: TYPE_BROADCAST.to_string(),
            data: serde_json::to_vec(payload).unwrap(),
        };
        let _ = self.push.send(frame.encode_to_vec());
    }

    pub fn push_raw(&self, frame: Vec<u8>) {
        let _ = self.push.send(frame);
    }
}

#[derive(Clone, Default)]
struct NodeState {
    posts: Arc<Mutex<Vec<(String, Value)>>>,
}

/// Storage node HTTP API recording every POST.
pub struct MockStorageNode {
    pub addr: SocketAddr,
    state: NodeState,
}

impl MockStorageNode {
    pub async fn start() -> Self {
        let (listener, addr) = bind().await;
        let state = NodeState::default();

        let app = Router::new()
            .route("/{*path}", post(record_post))
            .with_state(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn posts(&self) -> Vec<(String, Value)> {
        self.state.posts.lock().unwrap().clone()
    }

    pub fn posts_to(&self, path: &str) -> Vec<Value> {
        self.posts()
            .into_iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body)
            .collect()
    }
}

async fn record_post(State(state): State<NodeState>, Path(path): Path<String>, Json(body): Json<Value>) -> Json<Value> {
    state.posts.lock().unwrap().push((format!("/{path}"), body));
    Json(json!({"ReturnCode": 0, "Msg": "ok"}))
}

/// In-memory chain: every address exists, broadcasts are recorded.
#[derive(Default)]
pub struct MemoryChain {
    pub sequences: Mutex<HashMap<String, u64>>,
    pub broadcasts: Mutex<Vec<Vec<u8>>>,
}

impl MemoryChain {
    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChainApi for MemoryChain {
    async fn query_account(&self, address: &str) -> BlockchainResult<AccountInfo> {
        let sequence = *self.sequences.lock().unwrap().entry(address.to_string()).or_default();
        Ok(AccountInfo {
            account_number: 1,
            sequence,
        })
    }

    async fn simulate(&self, _tx_bytes: Vec<u8>) -> BlockchainResult<GasInfo> {
        Ok(GasInfo {
            gas_wanted: 0,
            gas_used: 80_000,
        })
    }

    async fn broadcast_tx(&self, tx_bytes: Vec<u8>) -> BlockchainResult<TxResponse> {
        let mut broadcasts = self.broadcasts.lock().unwrap();
        broadcasts.push(tx_bytes);
        for sequence in self.sequences.lock().unwrap().values_mut() {
            *sequence += 1;
        }
        Ok(TxResponse {
            tx_hash: format!("TX{}", broadcasts.len()),
            code: 0,
            raw_log: String::new(),
        })
    }
}

/// Configuration pointing both connections and the storage node API at
/// local mocks, with fast retries and flushes.
pub fn relay_config(chain_ws: &str, sds_ws: SocketAddr, api: SocketAddr) -> RelayConfig {
    let retries = ConnectionRetriesConfig {
        max: 50,
        sleep_duration: 20,
        refresh_interval: 0,
    };
    let mut config = RelayConfig::default();
    config.sds.network_address = sds_ws.ip().to_string();
    config.sds.websocket_port = sds_ws.port();
    config.sds.api_port = api.port();
    config.sds.connection_retries = retries.clone();
    config.stratos_chain.websocket_server = chain_ws.to_string();
    config.stratos_chain.connection_retries = retries;
    config.stratos_chain.broadcast.flush_interval_ms = 50;
    config
}

/// Run `fut` with a generous deadline so a hang fails the test instead of
/// stalling the suite.
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), fut)
        .await
        .expect("test deadline exceeded")
}
