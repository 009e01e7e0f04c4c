/// Summary of a `serverInfo` response.
///
/// Only the leading fields shared by every Frostbite title are read; the
/// rest of the response (scores, uptime, ...) varies between games.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
  pub name: String,
  pub players: u32,
  pub max_players: u32,
  pub game_mode: String,
  pub map: String,
}

impl ServerInfo {
  /// Returns `None` unless the status is `OK` and the counts are numeric.
  pub fn from_response(words: &[String]) -> Option<Self> {
    let [status, name, players, max_players, game_mode, map, ..] = words else {
      return None;
    };
    if status != "OK" {
      return None;
    }

    Some(Self {
      name: name.clone(),
      players: players.parse().ok()?,
      max_players: max_players.parse().ok()?,
      game_mode: game_mode.clone(),
      map: map.clone(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn parses_leading_fields() {
    let info = ServerInfo::from_response(&words(&[
      "OK",
      "My Server",
      "12",
      "64",
      "ConquestLarge0",
      "MP_Prison",
      "0",
      "2",
    ]))
    .unwrap();

    assert_eq!(info.name, "My Server");
    assert_eq!(info.players, 12);
    assert_eq!(info.max_players, 64);
    assert_eq!(info.game_mode, "ConquestLarge0");
    assert_eq!(info.map, "MP_Prison");
  }

  #[test]
  fn rejects_short_or_malformed_responses() {
    assert!(ServerInfo::from_response(&words(&["OK"])).is_none());
    assert!(
      ServerInfo::from_response(&words(&["OK", "S", "many", "64", "M", "P"]))
        .is_none()
    );
    assert!(
      ServerInfo::from_response(&words(&["ERR", "S", "1", "64", "M", "P"]))
        .is_none()
    );
  }
}
