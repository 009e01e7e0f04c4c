use std::collections::HashMap;

use crate::events::{
  EventKind, PlayerOnAuthenticated, PlayerOnDisconnect, PlayerOnJoin,
  PlayerOnKill, PlayerOnLeave, ServerEvent, ValidationError,
};

/// Turns the arguments of a raw event into a validated model, or nothing.
pub type Handler = fn(&[String]) -> Option<ServerEvent>;

/// Result of routing one raw event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
  /// No handler is registered for the event's kind.
  Unhandled,
  /// A handler ran but the payload failed validation.
  Rejected(EventKind),
  /// A validated model was produced.
  Delivered(ServerEvent),
}

/// Immutable table from event kind to handler, built once per session.
#[derive(Debug, Clone)]
pub struct Router {
  handlers: HashMap<EventKind, Handler>,
}

impl Default for Router {
  fn default() -> Self {
    Self::new()
  }
}

impl Router {
  /// Register one handler per supported [`EventKind`].
  pub fn new() -> Self {
    let handlers: [(EventKind, Handler); 5] = [
      (EventKind::PlayerJoin, on_join),
      (EventKind::PlayerAuthenticated, on_authenticated),
      (EventKind::PlayerDisconnect, on_disconnect),
      (EventKind::PlayerLeave, on_leave),
      (EventKind::PlayerKill, on_kill),
    ];
    Self {
      handlers: handlers.into_iter().collect(),
    }
  }

  /// Route one raw event to its handler.
  ///
  /// Unknown kinds and empty events are normal and come back as
  /// [`Dispatch::Unhandled`].
  pub fn dispatch(&self, event: &[String]) -> Dispatch {
    let Some((head, args)) = event.split_first() else {
      return Dispatch::Unhandled;
    };
    let Some(kind) = EventKind::from_token(head) else {
      return Dispatch::Unhandled;
    };
    let Some(handler) = self.handlers.get(&kind) else {
      return Dispatch::Unhandled;
    };

    match handler(args) {
      Some(model) => Dispatch::Delivered(model),
      None => Dispatch::Rejected(kind),
    }
  }
}

fn accept<T>(
  kind: EventKind,
  result: Result<T, ValidationError>,
  wrap: fn(T) -> ServerEvent,
) -> Option<ServerEvent> {
  match result {
    Ok(model) => Some(wrap(model)),
    Err(err) => {
      tracing::trace!(%kind, error = %err, "dropping malformed event");
      None
    }
  }
}

fn on_join(args: &[String]) -> Option<ServerEvent> {
  accept(
    EventKind::PlayerJoin,
    PlayerOnJoin::from_args(args),
    ServerEvent::PlayerJoin,
  )
}

fn on_authenticated(args: &[String]) -> Option<ServerEvent> {
  accept(
    EventKind::PlayerAuthenticated,
    PlayerOnAuthenticated::from_args(args),
    ServerEvent::PlayerAuthenticated,
  )
}

fn on_disconnect(args: &[String]) -> Option<ServerEvent> {
  accept(
    EventKind::PlayerDisconnect,
    PlayerOnDisconnect::from_args(args),
    ServerEvent::PlayerDisconnect,
  )
}

fn on_leave(args: &[String]) -> Option<ServerEvent> {
  accept(
    EventKind::PlayerLeave,
    PlayerOnLeave::from_args(args),
    ServerEvent::PlayerLeave,
  )
}

fn on_kill(args: &[String]) -> Option<ServerEvent> {
  accept(
    EventKind::PlayerKill,
    PlayerOnKill::from_args(args),
    ServerEvent::PlayerKill,
  )
}
