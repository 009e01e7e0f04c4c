use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `verbosity` is the count of `-v` flags: none logs INFO, one DEBUG, two or
/// more TRACE. Protocol chatter (`-->`/`<--` lines) only appears from DEBUG.
/// `RUST_LOG` takes precedence when set.
pub fn init(verbosity: u8, use_color: bool) {
  let level = match verbosity {
    0 => tracing::Level::INFO,
    1 => tracing::Level::DEBUG,
    _ => tracing::Level::TRACE,
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    EnvFilter::new(format!("warn,fbrcon_listener={level}"))
  });

  // A second init (e.g. from tests) is harmless, so the error is dropped.
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(verbosity > 1)
    .with_ansi(use_color)
    .with_writer(std::io::stderr)
    .compact()
    .try_init();
}
