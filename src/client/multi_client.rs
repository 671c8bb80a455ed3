//! Relay orchestrator.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::blockchain::{ChainApi, GrpcChainClient, Wallet};
use crate::broadcaster::FlushReport;
use crate::client::chain_connection::ChainConnection;
use crate::client::sds_connection::SdsConnection;
use crate::client::session::{supervise, Connection};
use crate::client::state::ConnectionState;
use crate::client::ClientError;
use crate::config::SharedConfig;
use crate::events::{EventDispatcher, HandlerRegistry, HttpStorageNode, StorageNode};
use crate::lifecycle::{Shutdown, TaskGroup};

const NEW_BLOCK_CAPACITY: usize = 16;

/// Owns the wallet and the root cancellation token, and keeps both
/// connections alive until stopped.
pub struct MultiClient {
    config: SharedConfig,
    wallet: Arc<Wallet>,
    grpc: Option<Arc<GrpcChainClient>>,
    chain: Arc<ChainConnection>,
    sds: Arc<SdsConnection>,
    new_blocks: broadcast::Sender<()>,
    root: Shutdown,
    supervisors: TaskGroup,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl MultiClient {
    /// Load the relay wallet from `sp_home` and wire up both connections
    /// against the gRPC chain client and the storage node's HTTP API.
    pub fn new(sp_home: &Path, config: SharedConfig) -> Result<Self, ClientError> {
        let snapshot = config.load_full();
        let wallet = Wallet::load(sp_home, &snapshot.keys, &snapshot.blockchain_info.address_prefix)?;

        let grpc = Arc::new(GrpcChainClient::new());
        let storage = Arc::new(HttpStorageNode::new(config.clone()));
        let mut client = Self::from_parts(config, wallet, grpc.clone(), storage);
        client.grpc = Some(grpc);
        Ok(client)
    }

    /// Assemble a client from already-built collaborators.
    pub fn from_parts(
        config: SharedConfig,
        wallet: Wallet,
        api: Arc<dyn ChainApi>,
        storage: Arc<dyn StorageNode>,
    ) -> Self {
        let wallet = Arc::new(wallet);
        let (new_blocks, _) = broadcast::channel(NEW_BLOCK_CAPACITY);
        let dispatcher = Arc::new(EventDispatcher::new(Arc::new(HandlerRegistry::standard()), storage));

        Self {
            chain: Arc::new(ChainConnection::new(config.clone(), dispatcher, new_blocks.clone())),
            sds: Arc::new(SdsConnection::new(config.clone(), api, wallet.clone())),
            config,
            wallet,
            grpc: None,
            new_blocks,
            root: Shutdown::new(),
            supervisors: TaskGroup::new(),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Publish every broadcaster flush outcome on `reports`. Must be
    /// called before `start()`.
    pub fn with_flush_reports(mut self, reports: mpsc::UnboundedSender<FlushReport>) -> Self {
        if let Some(sds) = Arc::get_mut(&mut self.sds) {
            sds.set_reports(reports);
        }
        self
    }

    pub fn wallet_address(&self) -> &str {
        self.wallet.address()
    }

    /// Root token; cancelled on `stop()` or when a connection gives up.
    pub fn shutdown(&self) -> Shutdown {
        self.root.clone()
    }

    /// Best-effort notification of every new chain block.
    pub fn new_blocks(&self) -> broadcast::Receiver<()> {
        self.new_blocks.subscribe()
    }

    pub fn chain_state(&self) -> ConnectionState {
        self.chain.state().get()
    }

    pub fn sds_state(&self) -> ConnectionState {
        self.sds.state().get()
    }

    /// Point the chain client at the configured endpoint and start both
    /// connections in the background. Only the first call has any effect.
    pub fn start(&self) -> Result<(), ClientError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(grpc) = &self.grpc {
            grpc.configure(&self.config.load().stratos_chain.grpc)?;
        }

        tracing::info!(wallet = %self.wallet.address(), "Starting relay connections");
        self.spawn_supervisor(self.chain.clone());
        self.spawn_supervisor(self.sds.clone());
        Ok(())
    }

    /// Cancel both connections and wait for them to drain. Idempotent.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Stopping relay connections");
        self.root.trigger();
        self.supervisors.wait().await;
        tracing::info!("Relay connections stopped");
    }

    /// Resolve once the root token is cancelled.
    pub async fn wait_stopped(&self) {
        self.root.cancelled().await;
    }

    fn spawn_supervisor<C: Connection>(&self, conn: Arc<C>) {
        let root = self.root.clone();
        self.supervisors.spawn(async move {
            let side = conn.side();
            if let Err(e) = supervise(conn, root).await {
                tracing::error!(side, error = %e, "Connection supervisor stopped");
            }
        });
    }
}
