//! Connection sessions and the supervisor that renews them.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::client::state::{ConnectionState, StateHandle};
use crate::client::ConnectionError;
use crate::config::ConnectionRetriesConfig;
use crate::lifecycle::{Shutdown, TaskGroup, TaskReport};
use crate::observability::metrics;
use crate::resilience::{retry_fixed, RetryError, RetryPolicy};

/// Why a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// The orchestrator is shutting down.
    Stopped,
    /// A session task returned, failed or panicked.
    TaskExited(TaskReport),
    /// The forced refresh interval elapsed.
    RefreshDue,
}

/// Tasks of one connection session and their report channel.
pub struct Session {
    pub id: u64,
    pub cancel: Shutdown,
    tasks: TaskGroup,
    reports_tx: mpsc::UnboundedSender<TaskReport>,
    reports: mpsc::UnboundedReceiver<TaskReport>,
}

impl Session {
    pub fn new(id: u64, root: &Shutdown) -> Self {
        let (reports_tx, reports) = mpsc::unbounded_channel();
        Self {
            id,
            cancel: root.child(),
            tasks: TaskGroup::new(),
            reports_tx,
            reports,
        }
    }

    pub fn spawn<F, E>(&self, task: &'static str, fut: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        self.tasks
            .spawn_supervised(task, self.id, self.reports_tx.clone(), fut);
    }

    /// Wait for the first reason to end this session.
    pub async fn watch(&mut self, root: &Shutdown, refresh_after: Option<Duration>) -> SessionEnd {
        let refresh = async {
            match refresh_after {
                Some(after) => tokio::time::sleep(after).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = root.cancelled() => SessionEnd::Stopped,
            Some(report) = self.reports.recv() => SessionEnd::TaskExited(report),
            _ = refresh => SessionEnd::RefreshDue,
        }
    }

    /// Cancel every task and wait for them to drain.
    pub async fn close(self) {
        self.cancel.trigger();
        self.tasks.wait().await;
    }
}

/// One side of the relay, as seen by [`supervise`].
#[async_trait]
pub trait Connection: Send + Sync + 'static {
    fn side(&self) -> &'static str;

    fn state(&self) -> &StateHandle;

    /// Retry budget, read at the start of every refresh.
    fn retries(&self) -> ConnectionRetriesConfig;

    /// Forced reconnect interval, if any.
    fn refresh_interval(&self) -> Option<Duration> {
        None
    }

    /// Dial once and start the session's tasks.
    ///
    /// Must not spawn anything into `session` when it fails.
    async fn connect(&self, session: &Session) -> Result<(), ConnectionError>;
}

/// Keep `conn` connected until `root` is cancelled.
///
/// Every session end other than shutdown leads to a refresh: the old
/// session is drained, then a new one dials with the configured retry
/// budget. An exhausted budget cancels `root`.
pub async fn supervise<C: Connection>(conn: Arc<C>, root: Shutdown) -> Result<(), ConnectionError> {
    let side = conn.side();
    let mut id = 0;

    loop {
        id += 1;
        let mut session = Session::new(id, &root);
        conn.state().set(ConnectionState::Connecting);

        let policy = RetryPolicy::from(&conn.retries());
        let dialer: &C = &conn;
        let current = &session;
        let connected = retry_fixed(policy, &root, side, move |_attempt| dialer.connect(current)).await;

        match connected {
            Ok(()) => tracing::info!(side, session = id, "Connection established"),
            Err(RetryError::Cancelled) => {
                session.close().await;
                conn.state().set(ConnectionState::Disconnected);
                return Ok(());
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                tracing::error!(side, attempts, error = %last, "Connection retries exhausted, relay will shut down");
                session.close().await;
                conn.state().set(ConnectionState::Disconnected);
                root.trigger();
                return Err(ConnectionError::Exhausted {
                    side,
                    attempts,
                    last: Box::new(last),
                });
            }
        }

        let end = session.watch(&root, conn.refresh_interval()).await;
        session.close().await;
        match end {
            SessionEnd::Stopped => {
                conn.state().set(ConnectionState::Disconnected);
                return Ok(());
            }
            SessionEnd::TaskExited(report) => {
                tracing::warn!(side, task = report.task, exit = ?report.exit, "Session task ended, refreshing connection");
            }
            SessionEnd::RefreshDue => {
                tracing::info!(side, "Connection has been alive for a long time, refreshing");
            }
        }

        if root.is_triggered() {
            conn.state().set(ConnectionState::Disconnected);
            return Ok(());
        }
        metrics::record_reconnect(side);
    }
}
