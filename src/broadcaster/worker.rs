//! Broadcaster event loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::blockchain::transaction::attach_wallet_key;
use crate::blockchain::{ChainApi, TxParams, UnsignedMessage, Wallet};
use crate::broadcaster::batch::{flush_batch, FlushReport};
use crate::config::SharedConfig;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Turns queued messages into transactions.
///
/// Owns the pending list; nothing else touches it.
pub struct Broadcaster {
    queue: mpsc::Receiver<UnsignedMessage>,
    api: Arc<dyn ChainApi>,
    config: SharedConfig,
    wallet_address: String,
    wallet_key: Vec<u8>,
    reports: Option<mpsc::UnboundedSender<FlushReport>>,
}

impl Broadcaster {
    pub fn new(
        queue: mpsc::Receiver<UnsignedMessage>,
        api: Arc<dyn ChainApi>,
        config: SharedConfig,
        wallet: &Wallet,
    ) -> Self {
        Self {
            queue,
            api,
            config,
            wallet_address: wallet.address().to_string(),
            wallet_key: wallet.private_key_bytes(),
            reports: None,
        }
    }

    /// Publish every flush outcome on `reports`.
    pub fn with_reports(mut self, reports: mpsc::UnboundedSender<FlushReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Run until `cancel` fires or every queue sender is gone.
    ///
    /// A full batch is flushed as soon as it fills up; otherwise the timer
    /// flushes whatever is pending. The timer restarts after every flush or
    /// empty tick.
    pub async fn run(mut self, cancel: Shutdown) -> Result<(), std::convert::Infallible> {
        let mut pending: Vec<UnsignedMessage> = Vec::new();
        let timer = tokio::time::sleep(self.flush_interval());
        tokio::pin!(timer);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if !pending.is_empty() {
                        tracing::warn!(count = pending.len(), "Broadcaster stopping, discarding pending messages");
                    }
                    return Ok(());
                }
                received = self.queue.recv() => {
                    let Some(mut msg) = received else {
                        if !pending.is_empty() {
                            self.flush(&mut pending).await;
                        }
                        tracing::debug!("Broadcast queue closed");
                        return Ok(());
                    };

                    if attach_wallet_key(&mut msg, &self.wallet_address, &self.wallet_key) > 0 {
                        tracing::debug!(msg_type = %msg.msg_type, "Attached relay wallet key");
                    }
                    pending.push(msg);

                    let max = self.config.load().stratos_chain.broadcast.max_msg_per_tx.max(1);
                    if pending.len() >= max {
                        self.flush(&mut pending).await;
                        timer.as_mut().reset(Instant::now() + self.flush_interval());
                    }
                }
                _ = &mut timer => {
                    if !pending.is_empty() {
                        self.flush(&mut pending).await;
                    }
                    timer.as_mut().reset(Instant::now() + self.flush_interval());
                }
            }
        }
    }

    fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.config.load().stratos_chain.broadcast.flush_interval_ms.max(1))
    }

    /// Flush and clear `pending`, whatever the outcome.
    async fn flush(&self, pending: &mut Vec<UnsignedMessage>) {
        let batch = std::mem::take(pending);
        let config = self.config.load_full();

        let report = match TxParams::from_config(&config.blockchain_info) {
            Ok(params) => flush_batch(self.api.as_ref(), &params, batch).await,
            Err(e) => {
                tracing::error!(error = %e, count = batch.len(), "Invalid transaction parameters, batch dropped");
                metrics::record_batch_dropped("invalid_params", batch.len());
                FlushReport {
                    total: batch.len(),
                    dropped_unsignable: 0,
                    dropped_unresolved: 0,
                    submitted: 0,
                    result: Some(Err(e)),
                }
            }
        };

        if let Some(reports) = &self.reports {
            let _ = reports.send(report);
        }
    }
}
