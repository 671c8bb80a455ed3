//! Supervised task groups.
//!
//! A `TaskGroup` is the wait-group of one connection session. Tasks spawned
//! with `spawn_supervised` never take the process down: a returned error or
//! a panic is turned into a `TaskReport` on the owner's report channel, and
//! the owner decides whether to restart.

use std::fmt::Display;
use std::future::Future;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How a supervised task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskExit {
    /// Returned `Ok(())`.
    Completed,
    /// Returned an error.
    Failed(String),
    /// Panicked; carries the panic message when it was a string.
    Panicked(String),
    /// Aborted before completion.
    Aborted,
}

impl TaskExit {
    /// Whether the owner should consider the session broken.
    pub fn is_abnormal(&self) -> bool {
        !matches!(self, TaskExit::Completed)
    }
}

/// Exit report of a supervised task.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub task: &'static str,
    /// Session the task belonged to, so stale reports can be ignored.
    pub session: u64,
    pub exit: TaskExit,
}

/// Tracks the tasks of one session so they can be awaited together.
#[derive(Debug, Default)]
pub struct TaskGroup {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an untracked-outcome task that is still awaited by `wait()`.
    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        self.push(handle);
    }

    /// Spawn a task whose outcome is reported on `reports`.
    pub fn spawn_supervised<F, E>(
        &self,
        task: &'static str,
        session: u64,
        reports: mpsc::UnboundedSender<TaskReport>,
        fut: F,
    ) where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let inner = tokio::spawn(fut);
        let handle = tokio::spawn(async move {
            let exit = match inner.await {
                Ok(Ok(())) => TaskExit::Completed,
                Ok(Err(e)) => TaskExit::Failed(e.to_string()),
                Err(e) if e.is_panic() => TaskExit::Panicked(panic_message(e.into_panic())),
                Err(_) => TaskExit::Aborted,
            };
            match &exit {
                TaskExit::Panicked(message) => {
                    tracing::error!(task, session, panic = %message, "Task panicked");
                }
                TaskExit::Failed(error) => {
                    tracing::warn!(task, session, error = %error, "Task failed");
                }
                _ => tracing::debug!(task, session, "Task finished"),
            }
            let _ = reports.send(TaskReport { task, session, exit });
        });
        self.push(handle);
    }

    /// Number of tasks not yet collected by `wait()`.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for every spawned task to finish.
    pub async fn wait(&self) {
        loop {
            let handles = std::mem::take(&mut *self.lock());
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                let _ = handle.await;
            }
        }
    }

    fn push(&self, handle: JoinHandle<()>) {
        self.lock().push(handle);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_panic_is_reported() {
        let group = TaskGroup::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        group.spawn_supervised("reader", 7, tx, async {
            if true {
                panic!("boom");
            }
            Ok::<(), String>(())
        });
        group.wait().await;

        let report = rx.recv().await.unwrap();
        assert_eq!(report.task, "reader");
        assert_eq!(report.session, 7);
        assert_eq!(report.exit, TaskExit::Panicked("boom".into()));
        assert!(report.exit.is_abnormal());
    }

    #[tokio::test]
    async fn test_error_and_success_reported() {
        let group = TaskGroup::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        group.spawn_supervised("ok", 1, tx.clone(), async { Ok::<(), String>(()) });
        group.wait().await;
        group.spawn_supervised("err", 1, tx, async { Err::<(), _>("read failed") });
        group.wait().await;

        assert_eq!(rx.recv().await.unwrap().exit, TaskExit::Completed);
        assert_eq!(rx.recv().await.unwrap().exit, TaskExit::Failed("read failed".into()));
        assert!(group.is_empty());
    }
}
