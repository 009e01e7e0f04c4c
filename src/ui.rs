use owo_colors::OwoColorize;

use crate::events::ServerEvent;
use crate::session::EventSink;

/// Print the banner shown once the listener is about to connect.
pub fn render_banner(endpoint: &str, poll_interval_secs: u64, use_color: bool) {
  if use_color {
    println!(
      "{} listening to {} {}",
      "⇢".bright_cyan(),
      endpoint.bold(),
      format!("(liveness poll every {poll_interval_secs}s)").dimmed()
    );
  } else {
    println!(
      "listening to {endpoint} (liveness poll every {poll_interval_secs}s)"
    );
  }
  println!();
}

/// Render a validated event as a single human-friendly line.
pub fn format_event(event: &ServerEvent, use_color: bool) -> String {
  let label = event.kind().as_str();
  let label = if use_color {
    format!("{}", label.bright_magenta().bold())
  } else {
    label.to_owned()
  };

  let detail = match event {
    ServerEvent::PlayerJoin(join) if join.guid.is_empty() => {
      format!("{} joined", join.name)
    }
    ServerEvent::PlayerJoin(join) => {
      format!("{} joined ({})", join.name, join.guid)
    }
    ServerEvent::PlayerAuthenticated(auth) => {
      format!("{} authenticated", auth.name)
    }
    ServerEvent::PlayerDisconnect(gone) => {
      format!("{} disconnected: {}", gone.name, gone.reason)
    }
    ServerEvent::PlayerLeave(_) => "a player left".to_owned(),
    ServerEvent::PlayerKill(kill) => {
      let headshot = match (kill.headshot, use_color) {
        (true, true) => format!(" {}", "headshot".red().bold()),
        (true, false) => " headshot".to_owned(),
        (false, _) => String::new(),
      };
      format!(
        "{} killed {} with {}{headshot}",
        kill.killer, kill.victim, kill.weapon
      )
    }
  };

  format!("{label} {detail}")
}

/// Event sink that prints each event to stdout.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
  use_color: bool,
}

impl ConsoleSink {
  /// Create a sink; `use_color` enables ANSI styling.
  #[must_use]
  pub fn new(use_color: bool) -> Self {
    Self { use_color }
  }
}

impl EventSink for ConsoleSink {
  fn on_event(&mut self, event: ServerEvent) {
    println!("{}", format_event(&event, self.use_color));
  }
}
