//! Event-driven session loop.
//!
//! A [`Session`] connects once, then drives two activities on the current
//! task until shutdown: the event receiver, which pulls server-pushed events
//! and routes them, and the liveness poller, which issues a status command
//! on a fixed interval and rebuilds the connection when it fails. Both share
//! a single [`Transport`]; only the poller ever reconnects.

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use crate::events::ServerEvent;
use crate::router::{Dispatch, Router};
use crate::server_info::ServerInfo;
use crate::transport::{Transport, TransportError};
use crate::util::words;

/// Tunables for the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
  /// Pause between liveness polls. Bounds how long a dead link goes unnoticed.
  pub poll_interval: Duration,
  /// Command used as the liveness check.
  pub poll_command: Vec<String>,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      poll_interval: Duration::from_secs(10),
      poll_command: vec!["serverInfo".to_owned()],
    }
  }
}

/// Receives every validated event, in delivery order.
pub trait EventSink {
  fn on_event(&mut self, event: ServerEvent);
}

/// Sink that records events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
  fn on_event(&mut self, event: ServerEvent) {
    tracing::info!(kind = %event.kind(), ?event, "server event");
  }
}

/// Why a session stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
  /// The shutdown future resolved, e.g. on SIGINT.
  Interrupted,
}

/// Owns the transport and event sink for the lifetime of one listener run.
pub struct Session<T, S> {
  transport: T,
  sink: S,
  router: Router,
  config: SessionConfig,
}

impl<T, S> Session<T, S>
where
  T: Transport,
  S: EventSink,
{
  /// Build a session over `transport`; nothing connects until [`Session::run`].
  pub fn new(transport: T, sink: S, config: SessionConfig) -> Self {
    Self {
      transport,
      sink,
      router: Router::new(),
      config,
    }
  }

  /// Connect, then run until `shutdown` resolves or an activity fails.
  ///
  /// A failed initial connect is returned as-is; there is no retry at
  /// startup. Whatever ends the session, both activities are dropped
  /// together and the transport is closed before returning.
  pub async fn run<F>(
    &mut self,
    shutdown: F,
  ) -> Result<Termination, TransportError>
  where
    F: Future<Output = ()>,
  {
    self.transport.connect().await?;

    let Self {
      transport,
      sink,
      router,
      config,
    } = self;

    let outcome = tokio::select! {
      result = receive_events(&*transport, router, sink) => settle(result),
      result = poll_liveness(&*transport, config) => settle(result),
      () = shutdown => {
        tracing::info!("shutdown requested; stopping session");
        Ok(Termination::Interrupted)
      }
    };

    if let Err(err) = &outcome {
      tracing::debug!(error = %err, "session activity failed");
    }
    transport.close().await;
    outcome
  }
}

// The activities only ever return on error.
fn settle(
  result: Result<Infallible, TransportError>,
) -> Result<Termination, TransportError> {
  result.map(|never| match never {})
}

/// Pull events forever, routing each one before asking for the next.
///
/// Listen timeouts are idle periods, not failures. This activity never
/// reconnects; any other transport error ends it.
async fn receive_events<T, S>(
  transport: &T,
  router: &Router,
  sink: &mut S,
) -> Result<Infallible, TransportError>
where
  T: Transport + ?Sized,
  S: EventSink,
{
  loop {
    let event = match transport.listen().await {
      Ok(event) => event,
      Err(TransportError::Timeout(_)) => continue,
      Err(err) => return Err(err),
    };

    match router.dispatch(&event) {
      Dispatch::Delivered(model) => sink.on_event(model),
      Dispatch::Rejected(kind) => {
        tracing::debug!(%kind, "ignored malformed event");
      }
      Dispatch::Unhandled => {
        tracing::trace!(event = %words::render(&event), "no handler for event");
      }
    }
  }
}

/// Check the connection every `poll_interval`, reconnecting once per failed
/// check. A failed reconnect ends the activity.
async fn poll_liveness<T>(
  transport: &T,
  config: &SessionConfig,
) -> Result<Infallible, TransportError>
where
  T: Transport + ?Sized,
{
  loop {
    match transport.send_command(&config.poll_command).await {
      Ok(response) => {
        if let Some(info) = ServerInfo::from_response(&response) {
          tracing::debug!(
            server = %info.name,
            players = info.players,
            max_players = info.max_players,
            mode = %info.game_mode,
            map = %info.map,
            "status poll"
          );
        }
      }
      Err(err) => {
        tracing::warn!(error = %err, "status poll failed; reconnecting");
        transport.reconnect().await?;
      }
    }

    tokio::time::sleep(config.poll_interval).await;
  }
}
