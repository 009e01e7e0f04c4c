use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::session::SessionConfig;
use crate::transport::TransportConfig;
use crate::util::words;

/// Command-line arguments for the RCON event listener.
#[derive(Parser, Debug, Clone)]
#[command(
  author,
  version,
  about = "Listen to live events from a Frostbite RCON game server"
)]
pub struct Cli {
  /// Hostname or IP address of the game server.
  #[arg(long, env = "FBRCON_HOST", default_value = "127.0.0.1")]
  pub host: String,

  /// RCON port exposed by the game server.
  #[arg(long, env = "FBRCON_PORT", default_value_t = 47_200)]
  pub port: u16,

  /// Password used for `login.plainText`; omit for servers without one.
  #[arg(long, env = "FBRCON_PASSWORD", hide_env_values = true)]
  pub password: Option<String>,

  /// Connect and command round-trip timeout in milliseconds.
  #[arg(
    long,
    default_value_t = 8_000,
    value_name = "MILLISECONDS",
    value_parser = clap::value_parser!(u64).range(1..)
  )]
  pub timeout_ms: u64,

  /// How long one wait for an event lasts before it counts as idle.
  #[arg(
    long,
    default_value_t = 5_000,
    value_name = "MILLISECONDS",
    value_parser = clap::value_parser!(u64).range(1..)
  )]
  pub listen_timeout_ms: u64,

  /// Seconds between liveness polls.
  #[arg(
    long,
    env = "FBRCON_POLL_INTERVAL",
    default_value_t = 10,
    value_name = "SECONDS",
    value_parser = clap::value_parser!(u64).range(1..)
  )]
  pub poll_interval_secs: u64,

  /// Command issued as the liveness poll.
  #[arg(long, default_value = "serverInfo", value_name = "COMMAND")]
  pub poll_command: String,

  /// Connection attempts made per reconnect before giving up.
  #[arg(long, default_value_t = 3)]
  pub reconnect_attempts: u32,

  /// Pause between reconnect attempts in milliseconds.
  #[arg(long, default_value_t = 2_000, value_name = "MILLISECONDS")]
  pub reconnect_backoff_ms: u64,

  /// Increase logging verbosity (repeat for TRACE).
  #[arg(short, long, action = ArgAction::Count)]
  pub verbose: u8,

  /// Disable ANSI color output.
  #[arg(long)]
  pub plain: bool,
}

impl Cli {
  /// Connection settings for [`crate::transport::FrostbiteTransport`].
  pub fn transport_config(&self) -> TransportConfig {
    TransportConfig {
      host: self.host.clone(),
      port: self.port,
      password: self.password.clone(),
      timeout: Duration::from_millis(self.timeout_ms),
      listen_timeout: Duration::from_millis(self.listen_timeout_ms),
      reconnect_attempts: self.reconnect_attempts,
      reconnect_backoff: Duration::from_millis(self.reconnect_backoff_ms),
    }
  }

  /// Poll settings; a blank `--poll-command` falls back to `serverInfo`.
  pub fn session_config(&self) -> SessionConfig {
    let poll_command = words::split(&self.poll_command);
    SessionConfig {
      poll_interval: Duration::from_secs(self.poll_interval_secs),
      poll_command: if poll_command.is_empty() {
        SessionConfig::default().poll_command
      } else {
        poll_command
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_documented_values() {
    let cli = Cli::try_parse_from(["fbrcon-listener"]).unwrap();
    let session = cli.session_config();
    assert_eq!(session, SessionConfig::default());

    let transport = cli.transport_config();
    assert_eq!(transport.port, 47_200);
    assert_eq!(transport.listen_timeout, Duration::from_secs(5));
    assert_eq!(transport.reconnect_attempts, 3);
  }

  #[test]
  fn poll_command_is_split_into_words() {
    let cli = Cli::try_parse_from([
      "fbrcon-listener",
      "--poll-command",
      "vars.serverName",
      "--poll-interval-secs",
      "30",
    ])
    .unwrap();
    let session = cli.session_config();
    assert_eq!(session.poll_command, vec!["vars.serverName"]);
    assert_eq!(session.poll_interval, Duration::from_secs(30));
  }

  #[test]
  fn blank_poll_command_falls_back_to_server_info() {
    let cli =
      Cli::try_parse_from(["fbrcon-listener", "--poll-command", "  "]).unwrap();
    assert_eq!(cli.session_config().poll_command, vec!["serverInfo"]);
  }

  #[test]
  fn zero_intervals_and_timeouts_are_rejected() {
    for flag in ["--poll-interval-secs", "--timeout-ms", "--listen-timeout-ms"] {
      let parsed = Cli::try_parse_from(["fbrcon-listener", flag, "0"]);
      assert!(parsed.is_err(), "{flag} 0 was accepted");
    }

    let cli = Cli::try_parse_from(["fbrcon-listener", "--poll-interval-secs", "1"])
      .unwrap();
    assert_eq!(cli.session_config().poll_interval, Duration::from_secs(1));
  }
}
