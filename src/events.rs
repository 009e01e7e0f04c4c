use std::fmt;

/// Raw event as delivered by the transport: kind first, then positional arguments.
pub type RawEvent = Vec<String>;

/// Server-pushed event kinds this listener handles.
///
/// Every other kind the server emits is recognised as "not ours" and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
  PlayerJoin,
  PlayerAuthenticated,
  PlayerDisconnect,
  PlayerLeave,
  PlayerKill,
}

impl EventKind {
  pub const ALL: [EventKind; 5] = [
    Self::PlayerJoin,
    Self::PlayerAuthenticated,
    Self::PlayerDisconnect,
    Self::PlayerLeave,
    Self::PlayerKill,
  ];

  /// Wire identifier carried in the first word of the event.
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::PlayerJoin => "player.onJoin",
      Self::PlayerAuthenticated => "player.onAuthenticated",
      Self::PlayerDisconnect => "player.onDisconnect",
      Self::PlayerLeave => "player.onLeave",
      Self::PlayerKill => "player.onKill",
    }
  }

  /// Match a wire identifier exactly; anything unknown yields `None`.
  pub fn from_token(token: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|kind| kind.as_str() == token)
  }
}

impl fmt::Display for EventKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Why an event payload failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
  #[error("missing argument `{field}` at position {position}")]
  Missing {
    field: &'static str,
    position: usize,
  },
  #[error("argument `{field}` must not be empty")]
  Empty { field: &'static str },
  #[error("argument `{field}` has invalid value `{value}`")]
  Invalid { field: &'static str, value: String },
}

/// Validated identifier of the weapon used in a kill.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WeaponKey(String);

impl WeaponKey {
  /// Accept any non-empty token free of whitespace and control characters.
  pub fn parse(raw: &str) -> Result<Self, ValidationError> {
    if raw.is_empty() {
      return Err(ValidationError::Empty { field: "weapon" });
    }
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
      return Err(ValidationError::Invalid {
        field: "weapon",
        value: raw.to_owned(),
      });
    }
    Ok(Self(raw.to_owned()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for WeaponKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerOnJoin {
  pub name: String,
  pub guid: String,
}

impl PlayerOnJoin {
  pub fn from_args(args: &[String]) -> Result<Self, ValidationError> {
    Ok(Self {
      name: player_name(args, 0, "name")?,
      guid: required(args, 1, "guid")?.to_owned(),
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerOnAuthenticated {
  pub name: String,
}

impl PlayerOnAuthenticated {
  pub fn from_args(args: &[String]) -> Result<Self, ValidationError> {
    Ok(Self {
      name: player_name(args, 0, "name")?,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerOnDisconnect {
  pub name: String,
  pub reason: String,
}

impl PlayerOnDisconnect {
  pub fn from_args(args: &[String]) -> Result<Self, ValidationError> {
    Ok(Self {
      name: player_name(args, 0, "name")?,
      reason: required(args, 1, "reason")?.to_owned(),
    })
  }
}

/// `player.onLeave` carries nothing the listener consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerOnLeave {}

impl PlayerOnLeave {
  pub fn from_args(_args: &[String]) -> Result<Self, ValidationError> {
    Ok(Self {})
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerOnKill {
  pub killer: String,
  pub victim: String,
  pub weapon: WeaponKey,
  pub headshot: bool,
}

impl PlayerOnKill {
  pub fn from_args(args: &[String]) -> Result<Self, ValidationError> {
    Ok(Self {
      killer: player_name(args, 0, "killer")?,
      victim: player_name(args, 1, "victim")?,
      weapon: WeaponKey::parse(required(args, 2, "weapon")?)?,
      headshot: flag(required(args, 3, "headshot")?, "headshot")?,
    })
  }
}

/// A validated event, one variant per handled kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
  PlayerJoin(PlayerOnJoin),
  PlayerAuthenticated(PlayerOnAuthenticated),
  PlayerDisconnect(PlayerOnDisconnect),
  PlayerLeave(PlayerOnLeave),
  PlayerKill(PlayerOnKill),
}

impl ServerEvent {
  /// The kind tag this event was routed by.
  pub fn kind(&self) -> EventKind {
    match self {
      Self::PlayerJoin(_) => EventKind::PlayerJoin,
      Self::PlayerAuthenticated(_) => EventKind::PlayerAuthenticated,
      Self::PlayerDisconnect(_) => EventKind::PlayerDisconnect,
      Self::PlayerLeave(_) => EventKind::PlayerLeave,
      Self::PlayerKill(_) => EventKind::PlayerKill,
    }
  }
}

// `position` is relative to the arguments, i.e. after the kind word.
fn required<'a>(
  args: &'a [String],
  position: usize,
  field: &'static str,
) -> Result<&'a str, ValidationError> {
  args
    .get(position)
    .map(String::as_str)
    .ok_or(ValidationError::Missing { field, position })
}

fn player_name(
  args: &[String],
  position: usize,
  field: &'static str,
) -> Result<String, ValidationError> {
  let value = required(args, position, field)?;
  if value.trim().is_empty() {
    return Err(ValidationError::Empty { field });
  }
  Ok(value.to_owned())
}

fn flag(raw: &str, field: &'static str) -> Result<bool, ValidationError> {
  if raw.eq_ignore_ascii_case("true") || raw == "1" {
    Ok(true)
  } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
    Ok(false)
  } else {
    Err(ValidationError::Invalid {
      field,
      value: raw.to_owned(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn kind_tokens_match_exactly() {
    for kind in EventKind::ALL {
      assert_eq!(EventKind::from_token(kind.as_str()), Some(kind));
    }
    assert_eq!(EventKind::from_token("player.onjoin"), None);
    assert_eq!(EventKind::from_token("player.onChat"), None);
    assert_eq!(EventKind::from_token(""), None);
  }

  #[test]
  fn kill_maps_fields_positionally() {
    let kill = PlayerOnKill::from_args(&args(&["A", "B", "w1", "true"])).unwrap();
    assert_eq!(kill.killer, "A");
    assert_eq!(kill.victim, "B");
    assert_eq!(kill.weapon.as_str(), "w1");
    assert!(kill.headshot);
  }

  #[test]
  fn kill_rejects_bad_headshot_flag() {
    let err = PlayerOnKill::from_args(&args(&["A", "B", "w1", "maybe"]))
      .unwrap_err();
    assert_eq!(
      err,
      ValidationError::Invalid {
        field: "headshot",
        value: "maybe".into()
      }
    );
  }

  #[test]
  fn kill_rejects_truncated_payload() {
    let err = PlayerOnKill::from_args(&args(&["A", "B", "w1"])).unwrap_err();
    assert_eq!(
      err,
      ValidationError::Missing {
        field: "headshot",
        position: 3
      }
    );
  }

  #[test]
  fn weapon_key_rejects_whitespace() {
    assert!(WeaponKey::parse("M16 A4").is_err());
    assert!(WeaponKey::parse("").is_err());
    assert!(WeaponKey::parse("U_AK12").is_ok());
  }

  #[test]
  fn headshot_flag_accepts_case_and_digits() {
    assert_eq!(flag("TRUE", "f"), Ok(true));
    assert_eq!(flag("False", "f"), Ok(false));
    assert_eq!(flag("1", "f"), Ok(true));
    assert_eq!(flag("0", "f"), Ok(false));
  }

  #[test]
  fn join_requires_non_empty_name() {
    assert_eq!(
      PlayerOnJoin::from_args(&args(&["", "GUID"])).unwrap_err(),
      ValidationError::Empty { field: "name" }
    );
    let join = PlayerOnJoin::from_args(&args(&["Alice", ""])).unwrap();
    assert_eq!(join.guid, "");
  }

  #[test]
  fn disconnect_requires_reason_argument() {
    assert!(PlayerOnDisconnect::from_args(&args(&["Bob"])).is_err());
    let event =
      PlayerOnDisconnect::from_args(&args(&["Bob", "timeout"])).unwrap();
    assert_eq!(event.reason, "timeout");
  }

  #[test]
  fn extra_arguments_are_ignored() {
    let auth =
      PlayerOnAuthenticated::from_args(&args(&["Carol", "extra"])).unwrap();
    assert_eq!(auth.name, "Carol");
    assert_eq!(PlayerOnLeave::from_args(&args(&["x"])), Ok(PlayerOnLeave {}));
  }
}
