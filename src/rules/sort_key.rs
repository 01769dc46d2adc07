/*!

The specificity key of a pattern. Rules are kept sorted by this key, smallest first, so that more specific patterns
are tried before more general ones.

A key is a short tuple compared lexicographically:

| position | meaning                                                                             |
|----------|-------------------------------------------------------------------------------------|
| 0        | 0 for an atom, 2 for an expression, 3 for a malformed pattern construct              |
| 1        | 0, or 11/12/13 for a blank with a head, 21/22/23 for a bare `_`, `__`, `___`; 40 for `OptionsPattern` |
| 2        | 0 inside a `PatternTest`                                                             |
| 3        | 0 inside a named `Pattern`                                                           |
| 4        | 1 inside an `Optional`                                                               |
| 5        | the key of the head                                                                  |
| 6        | the keys of the elements, followed by an end marker so that longer patterns sort first |
| 7        | 0 inside a `Condition`                                                               |

*/

use crate::{
  atom::Atom,
  expression::Expression,
  system_symbols as sys,
};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum KeyPart {
  Int(u32),
  Key(PatternKey),
  Keys(Vec<PatternKey>),
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatternKey(Vec<KeyPart>);

const IS_ATOM      : u32 = 0;
const IS_EXPRESSION: u32 = 2;
const IS_MALFORMED : u32 = 3;

const TEST_POSITION     : usize = 2;
const NAMED_POSITION    : usize = 3;
const OPTIONAL_POSITION : usize = 4;
const CONDITION_POSITION: usize = 7;

impl PatternKey {
  pub fn of(pattern: &Atom) -> PatternKey {
    match pattern {
      Atom::Expression(expression) => expression_key(expression),
      _                            => atom_key(),
    }
  }

  /// Sorts after every element key, so that of two patterns that agree on their common elements the one with more
  /// elements comes first.
  fn end_of_elements() -> PatternKey {
    PatternKey(vec![KeyPart::Int(4)])
  }

  fn with(mut self, position: usize, value: u32) -> PatternKey {
    if let Some(part) = self.0.get_mut(position) {
      *part = KeyPart::Int(value);
    }
    self
  }
}

fn atom_key() -> PatternKey {
  PatternKey([IS_ATOM, 0, 1, 1, 0, 0, 0, 1].iter().map(|i| KeyPart::Int(*i)).collect())
}

fn malformed_key(expression: &Expression) -> PatternKey {
  PatternKey(vec![
    KeyPart::Int(IS_MALFORMED),
    KeyPart::Int(0),
    KeyPart::Int(0),
    KeyPart::Int(0),
    KeyPart::Int(0),
    KeyPart::Key(PatternKey::of(expression.head())),
    KeyPart::Keys(expression.elements().iter().map(PatternKey::of).collect()),
    KeyPart::Int(1),
  ])
}

fn expression_key(expression: &Expression) -> PatternKey {
  let elements = expression.elements();
  let name = match expression.head().symbol_name() {
    Some(name) => name,
    None       => return general_key(expression),
  };

  let blank_kind =
    if name == *sys::BLANK {
      1
    } else if name == *sys::BLANK_SEQUENCE {
      2
    } else if name == *sys::BLANK_NULL_SEQUENCE {
      3
    } else {
      0
    };

  if blank_kind > 0 {
    let kind = if elements.is_empty() { blank_kind + 20 } else { blank_kind + 10 };
    return PatternKey(vec![
      KeyPart::Int(IS_EXPRESSION),
      KeyPart::Int(kind),
      KeyPart::Int(1),
      KeyPart::Int(1),
      KeyPart::Int(0),
      KeyPart::Key(PatternKey::of(expression.head())),
      KeyPart::Keys(elements.iter().map(PatternKey::of).collect()),
      KeyPart::Int(1),
    ]);
  }

  if name == *sys::PATTERN_TEST {
    return match elements.len() {
      2 => PatternKey::of(&elements[0]).with(TEST_POSITION, 0),
      _ => malformed_key(expression),
    };
  }
  if name == *sys::CONDITION {
    return match elements.len() {
      2 => PatternKey::of(&elements[0]).with(CONDITION_POSITION, 0),
      _ => malformed_key(expression),
    };
  }
  if name == *sys::PATTERN {
    return match elements.len() {
      2 => PatternKey::of(&elements[1]).with(NAMED_POSITION, 0),
      _ => malformed_key(expression),
    };
  }
  if name == *sys::OPTIONAL {
    return match elements.len() {
      1 | 2 => PatternKey::of(&elements[0]).with(OPTIONAL_POSITION, 1),
      _     => malformed_key(expression),
    };
  }
  if name == *sys::ALTERNATIVES {
    // The most specific alternative. No alternatives at all is very restrictive.
    return elements.iter()
                   .map(PatternKey::of)
                   .min()
                   .unwrap_or_else(|| PatternKey(vec![KeyPart::Int(IS_EXPRESSION), KeyPart::Int(1)]));
  }
  if name == *sys::VERBATIM || name == *sys::HOLD_PATTERN {
    return match elements.len() {
      1 => PatternKey::of(&elements[0]),
      _ => malformed_key(expression),
    };
  }
  if name == *sys::OPTIONS_PATTERN {
    return PatternKey(vec![
      KeyPart::Int(IS_EXPRESSION),
      KeyPart::Int(40),
      KeyPart::Int(0),
      KeyPart::Int(1),
      KeyPart::Int(1),
      KeyPart::Key(PatternKey::of(expression.head())),
      KeyPart::Keys(elements.iter().map(PatternKey::of).collect()),
      KeyPart::Int(1),
    ]);
  }

  general_key(expression)
}

fn general_key(expression: &Expression) -> PatternKey {
  let mut element_keys: Vec<PatternKey> = expression.elements().iter().map(PatternKey::of).collect();
  element_keys.push(PatternKey::end_of_elements());
  PatternKey(vec![
    KeyPart::Int(IS_EXPRESSION),
    KeyPart::Int(0),
    KeyPart::Int(1),
    KeyPart::Int(1),
    KeyPart::Int(0),
    KeyPart::Key(PatternKey::of(expression.head())),
    KeyPart::Keys(element_keys),
    KeyPart::Int(1),
  ])
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::parsing::parse;

  fn key(text: &str) -> PatternKey {
    PatternKey::of(&parse(text).unwrap())
  }

  #[test]
  fn typed_blanks_before_bare_blanks() {
    assert!(key("x_Integer") < key("x_"));
    assert!(key("f[x_Integer]") < key("f[x_]"));
    assert!(key("f[x_]") < key("f[x__]"));
    assert!(key("f[x__]") < key("f[x___]"));
  }

  #[test]
  fn literals_before_patterns() {
    assert!(key("f[3]") < key("f[x_Integer]"));
    assert!(key("f[g[y_]]") < key("f[x_]"));
  }

  #[test]
  fn longer_patterns_first() {
    assert!(key("f[x_, y_]") < key("f[x_]"));
  }

  #[test]
  fn conditions_and_tests_are_more_specific() {
    assert!(key("x_ /; x > 0") < key("x_"));
    assert!(key("x_?g") < key("x_"));
    assert!(key("x_") < key("x_."));
  }

  #[test]
  fn names_do_not_matter_between_named_patterns() {
    assert_eq!(key("x_Integer"), key("y_Integer"));
    assert!(key("x_") < key("_"));
  }
}
