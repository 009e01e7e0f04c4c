use std::io::{self, IsTerminal};

use anyhow::{Context, Result};

use crate::{
  cli::Cli,
  logging, signals,
  session::{Session, Termination},
  transport::FrostbiteTransport,
  ui,
};

/// Exit status used when the listener is stopped by a signal.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Orchestrate the full listener lifecycle for a single invocation.
pub async fn run(cli: Cli) -> Result<i32> {
  let use_color_stdout = !cli.plain && io::stdout().is_terminal();
  let use_color_logs = !cli.plain && io::stderr().is_terminal();

  logging::init(cli.verbose, use_color_logs);

  let transport_config = cli.transport_config();
  let session_config = cli.session_config();
  let endpoint = format!("{}:{}", transport_config.host, transport_config.port);
  tracing::debug!(config = ?transport_config, "transport configured");

  ui::render_banner(&endpoint, cli.poll_interval_secs, use_color_stdout);

  let mut session = Session::new(
    FrostbiteTransport::new(transport_config),
    ui::ConsoleSink::new(use_color_stdout),
    session_config,
  );

  let termination = session
    .run(shutdown_requested())
    .await
    .with_context(|| format!("RCON session with {endpoint} ended"))?;

  match termination {
    Termination::Interrupted => {
      tracing::info!("listener stopped");
      Ok(INTERRUPTED_EXIT_CODE)
    }
  }
}

async fn shutdown_requested() {
  if let Err(err) = signals::wait_for_shutdown().await {
    tracing::warn!(
      error = %err,
      "signal handling unavailable; running until the process is killed"
    );
    std::future::pending::<()>().await;
  }
}
