/// Utilities shared across the listener.
///
/// RCON commands and events travel as lists of words; these helpers convert
/// between that form and the single line an operator types or reads in logs.
pub mod words {
  /// Split an operator-supplied command line into protocol words.
  ///
  /// Words are separated by whitespace. A double-quoted section is kept as a
  /// single word, which is how server names and chat messages with spaces
  /// are passed.
  ///
  /// # Examples
  ///
  /// ```
  /// use fbrcon_listener::util::words::split;
  ///
  /// assert_eq!(split("serverInfo"), vec!["serverInfo"]);
  /// assert_eq!(
  ///   split(r#"admin.say "hello there" all"#),
  ///   vec!["admin.say", "hello there", "all"]
  /// );
  /// ```
  #[must_use]
  pub fn split(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for ch in line.chars() {
      match ch {
        '"' => {
          quoted = !quoted;
          pending = true;
        }
        c if c.is_whitespace() && !quoted => {
          if pending {
            words.push(std::mem::take(&mut current));
            pending = false;
          }
        }
        c => {
          current.push(c);
          pending = true;
        }
      }
    }
    if pending {
      words.push(current);
    }
    words
  }

  /// Render words back into one line, quoting those that would not survive
  /// [`split`] on their own.
  #[must_use]
  pub fn render(words: &[String]) -> String {
    words
      .iter()
      .map(|word| {
        if word.is_empty() || word.chars().any(char::is_whitespace) {
          format!("\"{word}\"")
        } else {
          word.clone()
        }
      })
      .collect::<Vec<_>>()
      .join(" ")
  }
}

#[cfg(test)]
mod tests {
  use super::words::{render, split};

  #[test]
  fn split_collapses_repeated_whitespace() {
    assert_eq!(split("  serverInfo   \n"), vec!["serverInfo"]);
    assert_eq!(split("a \t b"), vec!["a", "b"]);
    assert!(split("   ").is_empty());
  }

  #[test]
  fn split_keeps_empty_quoted_words() {
    assert_eq!(split(r#"vars.serverName """#), vec!["vars.serverName", ""]);
  }

  #[test]
  fn render_quotes_words_with_spaces() {
    let rendered = render(&[
      "player.onDisconnect".to_string(),
      "Bob".to_string(),
      "client quit".to_string(),
    ]);
    assert_eq!(rendered, r#"player.onDisconnect Bob "client quit""#);
    assert_eq!(split(&rendered)[2], "client quit");
  }
}
