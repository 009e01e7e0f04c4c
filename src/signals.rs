//! Process signal handling.

use std::io;

use tokio::signal;

/// Resolve once the process is asked to stop.
///
/// On Unix this waits for SIGINT or SIGTERM; elsewhere for Ctrl+C.
pub async fn wait_for_shutdown() -> io::Result<()> {
  #[cfg(unix)]
  {
    use signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
      _ = sigint.recv() => tracing::info!("received SIGINT"),
      _ = sigterm.recv() => tracing::info!("received SIGTERM"),
    }
  }

  #[cfg(not(unix))]
  {
    signal::ctrl_c().await?;
    tracing::info!("received Ctrl+C");
  }

  Ok(())
}
