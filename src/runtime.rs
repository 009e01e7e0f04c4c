use crate::{Cli, run};
use owo_colors::OwoColorize;

/// Executes the listener lifecycle and reports errors uniformly.
pub struct Runtime {
  cli: Cli,
}

impl Runtime {
  /// Construct a new [`Runtime`] from parsed CLI arguments.
  #[must_use]
  pub fn new(cli: Cli) -> Self {
    Self { cli }
  }

  /// Run the listener and return the process exit code.
  ///
  /// A signal-driven stop yields [`crate::core::INTERRUPTED_EXIT_CODE`]. A
  /// failed startup connect or an unrecoverable reconnect prints the error
  /// chain and yields `1`.
  pub async fn execute(self) -> i32 {
    let use_color = !self.cli.plain;
    match run(self.cli).await {
      Ok(code) => code,
      Err(err) => {
        log_error_chain(&err, use_color);
        1
      }
    }
  }
}

fn log_error_chain(err: &anyhow::Error, use_color: bool) {
  if use_color {
    eprintln!("{} {}", "error:".red().bold(), err.to_string().red().bold());
  } else {
    eprintln!("error: {err}");
  }

  for cause in err.chain().skip(1) {
    if use_color {
      eprintln!("  {} {}", "↳".red(), cause);
    } else {
      eprintln!("  caused by: {cause}");
    }
  }
}
