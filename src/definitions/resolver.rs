/*!

Context arithmetic on symbol names. A fully qualified name is `context`short`, where the context itself may be nested,
`A`B`x`. These functions are pure string manipulation. The stateful part of name resolution, which needs to know what
is defined, lives in `Definitions::lookup_name`.

*/

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
  static ref CONTEXT_NAME: Regex = Regex::new(r"^(?:[A-Za-z$][A-Za-z0-9$]*`)+$").unwrap();
}

/// The name with its context removed: `x` for ``Global`x``.
pub fn strip_context(name: &str) -> &str {
  match name.rfind('`') {
    Some(position) => &name[position + 1..],
    None           => name,
  }
}

/// The context of a name including the trailing backtick, or the empty string.
pub fn context_of(name: &str) -> &str {
  match name.rfind('`') {
    Some(position) => &name[..=position],
    None           => "",
  }
}

/// A name is fully qualified if it has a context and the context does not start with a backtick.
pub fn is_fully_qualified(name: &str) -> bool {
  name.contains('`') && !name.starts_with('`')
}

/// Is `name` directly in `context`, not in a subcontext of it?
pub fn in_context(name: &str, context: &str) -> bool {
  match name.strip_prefix(context) {
    Some(rest) => !rest.contains('`'),
    None       => false,
  }
}

/// Is `context` a well formed context name such as ``Global` `` or ``A`B` ``?
pub fn is_valid_context(context: &str) -> bool {
  CONTEXT_NAME.is_match(context)
}

/// Translates a `Names` pattern into a regex over fully qualified names. In the short name, `*` matches any run of
/// characters and `@` any run of characters other than uppercase letters. A pattern without a context matches in the
/// accessible contexts only.
pub fn name_pattern(pattern: &str, current_context: &str, accessible_contexts: &[String]) -> Option<Regex> {
  let (context_pattern, short_pattern) =
    match pattern.rfind('`') {
      Some(position) => {
        let context = &pattern[..=position];
        let context_pattern =
          if context == "`" {
            regex::escape(current_context)
          } else {
            let context = context.strip_prefix('`').map_or_else(|| context.to_string(), |c| format!("{}{}", current_context, c));
            translate_wildcards(&context, "[^A-Z`]+", ".*")
          };
        (context_pattern, &pattern[position + 1..])
      }
      None => {
        let alternatives = accessible_contexts.iter()
                                              .map(|context| regex::escape(context))
                                              .collect::<Vec<String>>()
                                              .join("|");
        (format!("(?:{})", alternatives), pattern)
      }
    };

  let short_pattern = translate_wildcards(short_pattern, "[^A-Z`]+", "[^`]*");
  Regex::new(format!("^{}{}$", context_pattern, short_pattern).as_str()).ok()
}

fn translate_wildcards(pattern: &str, at: &str, star: &str) -> String {
  let mut translated = String::with_capacity(pattern.len() * 2);
  for c in pattern.chars() {
    match c {
      '*' => translated.push_str(star),
      '@' => translated.push_str(at),
      c   => translated.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
    }
  }
  translated
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_and_contexts() {
    assert_eq!(strip_context("Global`x"), "x");
    assert_eq!(strip_context("A`B`x"), "x");
    assert_eq!(strip_context("x"), "x");
    assert_eq!(context_of("A`B`x"), "A`B`");
    assert!(is_fully_qualified("System`Plus"));
    assert!(!is_fully_qualified("`x"));
    assert!(!is_fully_qualified("x"));
    assert!(in_context("Global`x", "Global`"));
    assert!(!in_context("Global`Private`x", "Global`"));
  }

  #[test]
  fn context_names() {
    assert!(is_valid_context("Global`"));
    assert!(is_valid_context("A`B`"));
    assert!(!is_valid_context("Global"));
    assert!(!is_valid_context("1a`"));
  }

  #[test]
  fn name_patterns() {
    let accessible = vec!["Global`".to_string(), "System`".to_string()];
    let regex = name_pattern("Pl*", "Global`", &accessible).unwrap();
    assert!(regex.is_match("System`Plus"));
    assert!(!regex.is_match("Other`Plus"));
    assert!(!regex.is_match("System`Sub`Plus"));

    let regex = name_pattern("Other`*", "Global`", &accessible).unwrap();
    assert!(regex.is_match("Other`Plus"));

    let regex = name_pattern("$R*", "Global`", &accessible).unwrap();
    assert!(regex.is_match("System`$RecursionLimit"));
  }
}
