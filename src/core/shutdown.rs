//! # Cross-platform OS signal handling.
//!
//! Provides [`wait_for_shutdown_signal`], an async helper that completes when the
//! process receives a termination signal. Used by the scheduler when
//! [`Config::stop_on_signal`](crate::Config::stop_on_signal) is set.
//!
//! ## Signals
//! **Unix platforms:** `SIGINT`, `SIGTERM`, `SIGQUIT`
//!
//! **Windows platforms:** `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! A signal is turned into a cancellation of the batch's interrupt token; the
//! watchdog then stops the drive loop exactly as on the hard deadline.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns a watcher that cancels `interrupt` on the first termination signal.
///
/// The watcher exits without side effects once `done` is cancelled, or if the
/// signal handlers cannot be registered.
pub(crate) fn watch_signals(
    interrupt: CancellationToken,
    done: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = done.cancelled() => {}
            res = wait_for_shutdown_signal() => {
                if res.is_ok() {
                    interrupt.cancel();
                }
            }
        }
    })
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` when any signal is received, or `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Returns `Ok(())` when Ctrl-C is received, or `Err` if signal registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
