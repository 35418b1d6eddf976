//! # Termination signals.
//!
//! [`wait_for_shutdown_signal`] resolves once the process is asked to stop and
//! reports which signal did it, so the service can log the cause before it
//! unsubscribes everything.
//!
//! | Platform | Signals                          |
//! |----------|----------------------------------|
//! | Unix     | `SIGINT`, `SIGTERM`, `SIGQUIT`   |
//! | other    | Ctrl-C                           |

use std::fmt;

/// The signal that requested shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Ctrl-C / `SIGINT`.
    Interrupt,
    /// `SIGTERM` (systemd, Kubernetes, `kill`).
    Terminate,
    /// `SIGQUIT`.
    Quit,
}

impl ShutdownSignal {
    /// Returns a short stable label for logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Quit => "SIGQUIT",
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Waits for a termination signal.
///
/// Every call registers its own listeners. Fails only if registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<ShutdownSignal> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let sig = tokio::select! {
        _ = sigint.recv()  => ShutdownSignal::Interrupt,
        _ = sigterm.recv() => ShutdownSignal::Terminate,
        _ = sigquit.recv() => ShutdownSignal::Quit,
    };
    Ok(sig)
}

/// Waits for a termination signal.
///
/// Every call registers its own listener. Fails only if registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<ShutdownSignal> {
    tokio::signal::ctrl_c().await?;
    Ok(ShutdownSignal::Interrupt)
}
