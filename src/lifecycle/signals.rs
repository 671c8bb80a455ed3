//! OS signal handling.
//!
//! SIGINT and SIGTERM (plus SIGQUIT and SIGHUP on unix) all request a
//! shutdown of the relay. Configuration reload is driven by the file
//! watcher, not by a signal.

/// Resolve when the process receives a termination signal.
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = signal(SignalKind::terminate())?;
        let mut quit = signal(SignalKind::quit())?;
        let mut hangup = signal(SignalKind::hangup())?;

        tokio::select! {
            res = tokio::signal::ctrl_c() => res.map(|_| "SIGINT"),
            _ = term.recv() => Ok("SIGTERM"),
            _ = quit.recv() => Ok("SIGQUIT"),
            _ = hangup.recv() => Ok("SIGHUP"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|_| "ctrl-c")
    }
}
