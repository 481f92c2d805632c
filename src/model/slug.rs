/// Turn a project name into a URL-safe slug.
///
/// Lowercases, replaces every run of non-alphanumeric characters with a
/// single hyphen and trims hyphens from both ends.
pub fn slugify(name: &str) -> String {
  let mut slug = String::with_capacity(name.len());
  let mut pending_hyphen = false;

  for c in name.chars().flat_map(char::to_lowercase) {
    if c.is_ascii_alphanumeric() {
      if pending_hyphen && !slug.is_empty() {
        slug.push('-');
      }
      pending_hyphen = false;
      slug.push(c);
    } else {
      pending_hyphen = true;
    }
  }

  slug
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_simple_name() {
    assert_eq!(slugify("Support Bot"), "support-bot");
  }

  #[test]
  fn test_collapses_and_trims() {
    assert_eq!(slugify("  --My   Shop!! Assistant--  "), "my-shop-assistant");
  }

  #[test]
  fn test_keeps_digits() {
    assert_eq!(slugify("Bot 2.0"), "bot-2-0");
  }

  #[test]
  fn test_non_ascii_becomes_separator() {
    assert_eq!(slugify("Café Crème"), "caf-cr-me");
  }

  #[test]
  fn test_empty_and_symbols_only() {
    assert_eq!(slugify(""), "");
    assert_eq!(slugify("!!!"), "");
  }
}
