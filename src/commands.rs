//! Palette commands and autocomplete

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  /// Placeholder for the argument, if the command takes one
  pub arg: Option<&'static str>,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "projects",
    aliases: &["p", "bots"],
    description: "Your chatbot projects",
    arg: None,
  },
  Command {
    name: "library",
    aliases: &["l", "data", "kb"],
    description: "Data library across all projects",
    arg: None,
  },
  Command {
    name: "open",
    aliases: &["o", "go"],
    description: "Open a path, e.g. /chat/<slug>",
    arg: Some("<path>"),
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Reload the current view",
    arg: None,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit chatdeck",
    arg: None,
  },
];

/// A submitted palette line: command name plus the rest of the line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub name: String,
  pub arg: Option<String>,
}

/// Split `input` into its command word and argument.
pub fn split_input(input: &str) -> (&str, Option<&str>) {
  let input = input.trim_start();
  match input.split_once(char::is_whitespace) {
    Some((word, rest)) => {
      let rest = rest.trim();
      (word, (!rest.is_empty()).then_some(rest))
    }
    None => (input.trim_end(), None),
  }
}

/// Get autocomplete suggestions for the command word of `input`
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let (word, _) = split_input(input);
  let input_lower = word.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    let priority = if cmd.name == input_lower {
      0
    } else if cmd.aliases.contains(&input_lower.as_str()) {
      1
    } else if cmd.name.starts_with(&input_lower) {
      2
    } else if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      3
    } else if cmd.name.contains(&input_lower) {
      4
    } else if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      5
    } else {
      continue;
    };
    matches.push((cmd, priority));
  }

  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Resolve a palette line, using the highlighted suggestion for the command word.
pub fn resolve(input: &str, selected: usize) -> Invocation {
  let (word, arg) = split_input(input);
  let suggestions = get_suggestions(input);
  let name = match suggestions.get(selected) {
    Some(cmd) => cmd.name.to_string(),
    None => word.to_lowercase(),
  };

  Invocation {
    name,
    arg: arg.map(str::to_string),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("library");
    assert_eq!(suggestions[0].name, "library");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("kb");
    assert_eq!(suggestions[0].name, "library");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("proj");
    assert_eq!(suggestions[0].name, "projects");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("fres");
    assert_eq!(suggestions[0].name, "refresh");
  }

  #[test]
  fn test_argument_is_kept() {
    assert_eq!(
      resolve("op /chat/support-bot ", 0),
      Invocation {
        name: "open".to_string(),
        arg: Some("/chat/support-bot".to_string()),
      }
    );
  }

  #[test]
  fn test_unknown_command_passes_through() {
    assert_eq!(
      resolve("Zap", 0),
      Invocation {
        name: "zap".to_string(),
        arg: None,
      }
    );
  }
}
