/*!

# Pattern Matching

The matcher is written in continuation passing style. Matching a pattern against an expression does not return a
list of solutions. Instead, every time the matcher finds a way to match, it calls a *continuation* with the
bindings it has accumulated so far and whatever part of the expression it did not consume. The continuation decides
what happens next:

  * it can accept the solution by returning `Flow::Stop`, which unwinds the whole search, or
  * it can reject it by returning `Flow::Continue`, which makes the matcher backtrack into its next alternative.

This gives the generator semantics needed by rule application (most callers want the first match for which a
`Condition` holds) without materializing the, potentially exponential, set of solutions of an `Orderless` or `Flat`
match.

Bindings live on a single stack. A pattern variable pushes its binding before it calls into its subpattern and
truncates the stack on the way back out, so the continuation always sees exactly the bindings in scope.

Evaluation may happen during matching: `Condition` and `PatternTest` evaluate their tests, and `Optional` may
consult `DefaultValues`. A `ControlSignal` raised by such an evaluation aborts the match and propagates to the
caller. The matcher also polls the evaluation for cancellation.

*/

mod matcher;
mod sequences;

use std::fmt::{Display, Formatter};

use smallvec::SmallVec;
use thiserror::Error;

use crate::{
  atom::Atom,
  evaluation::Evaluation,
  interner::{resolve_str, InternedString},
  interrupt::ControlSignal,
  logging::{log, Channel},
  system_symbols as sys,
};

pub(crate) use matcher::{match_pattern, MatchContext};

/// What a continuation wants the matcher to do next.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Flow {
  /// Reject this solution and backtrack.
  Continue,
  /// Accept this solution and unwind.
  Stop,
}

/// The elements of the subject expression that a match did not consume, when matching with `fully == false`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Rest {
  pub before: Vec<Atom>,
  pub after : Vec<Atom>,
}

impl Rest {
  pub fn is_empty(&self) -> bool {
    self.before.is_empty() && self.after.is_empty()
  }

  pub fn len(&self) -> usize {
    self.before.len() + self.after.len()
  }
}

/// The continuation called for every solution.
pub type Yield<'y> = dyn FnMut(&mut Evaluation, &mut Bindings, Option<Rest>) -> Result<Flow, ControlSignal> + 'y;

/// The substitution stack. Later bindings shadow earlier ones, though the matcher never binds a name twice.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bindings {
  stack: SmallVec<[(InternedString, Atom); 8]>
}

impl Bindings {
  pub fn new() -> Bindings {
    Bindings::default()
  }

  pub fn get(&self, name: InternedString) -> Option<&Atom> {
    self.stack.iter().rev().find(|(n, _)| *n == name).map(|(_, value)| value)
  }

  pub fn push(&mut self, name: InternedString, value: Atom) {
    self.stack.push((name, value));
  }

  pub fn len(&self) -> usize {
    self.stack.len()
  }

  pub fn is_empty(&self) -> bool {
    self.stack.is_empty()
  }

  /// Pops every binding above `len`.
  pub fn truncate(&mut self, len: usize) {
    self.stack.truncate(len);
  }

  pub fn iter(&self) -> impl Iterator<Item = &(InternedString, Atom)> {
    self.stack.iter()
  }

  /// Instantiates `template` by replacing every bound symbol with its value.
  pub fn substitute(&self, template: &Atom) -> Atom {
    if self.is_empty() {
      return template.clone();
    }
    template.replace_symbols(&|name| self.get(name).cloned())
  }
}

impl Display for Bindings {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let bindings = self.stack
                       .iter()
                       .map(|(name, value)| format!("{} -> {}", resolve_str(*name), value))
                       .collect::<Vec<String>>()
                       .join(", ");
    write!(f, "{{{}}}", bindings)
  }
}

// region Matcher construction errors

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PatternError {
  #[error("the name of the pattern {0} is not a symbol")]
  PatternName(String),
  #[error("{0} does not have a blank or a pattern to make optional")]
  OptionalTarget(String),
  #[error("{pattern} has {count} arguments")]
  Arity {
    pattern: String,
    count  : usize,
  },
}

/// Validates the pattern constructs inside `pattern`. A pattern that fails here could never match anything
/// sensible, so rules are not built from it.
pub fn check_pattern(pattern: &Atom) -> Result<(), PatternError> {
  let expression = match pattern {
    Atom::Expression(expression) => expression,
    _                            => return Ok(()),
  };
  let arity_error = || PatternError::Arity { pattern: pattern.to_string(), count: expression.len() };

  match expression.head().symbol_name() {

    Some(name) if name == *sys::PATTERN => {
      if expression.len() != 2 {
        return Err(arity_error());
      }
      if expression.elements()[0].symbol_name().is_none() {
        return Err(PatternError::PatternName(pattern.to_string()));
      }
      check_pattern(&expression.elements()[1])
    }

    Some(name) if name == *sys::BLANK || name == *sys::BLANK_SEQUENCE || name == *sys::BLANK_NULL_SEQUENCE => {
      if expression.len() > 1 {
        return Err(arity_error());
      }
      Ok(())
    }

    Some(name) if name == *sys::OPTIONAL => {
      if expression.is_empty() || expression.len() > 2 {
        return Err(arity_error());
      }
      let target = &expression.elements()[0];
      if !is_optional_target(target) {
        return Err(PatternError::OptionalTarget(pattern.to_string()));
      }
      check_pattern(target)
    }

    Some(name) if name == *sys::CONDITION || name == *sys::PATTERN_TEST => {
      if expression.len() != 2 {
        return Err(arity_error());
      }
      // The test is an ordinary expression.
      check_pattern(&expression.elements()[0])
    }

    Some(name) if name == *sys::VERBATIM => {
      match expression.len() {
        1 => Ok(()),
        _ => Err(arity_error()),
      }
    }

    Some(name) if name == *sys::HOLD_PATTERN => {
      if expression.len() != 1 {
        return Err(arity_error());
      }
      check_pattern(&expression.elements()[0])
    }

    _ => {
      check_pattern(expression.head())?;
      expression.elements().iter().try_for_each(check_pattern)
    }

  }
}

fn is_optional_target(target: &Atom) -> bool {
  let is_blank = |atom: &Atom| {
    atom.has_form_range(*sys::BLANK, 0, 1)
        || atom.has_form_range(*sys::BLANK_SEQUENCE, 0, 1)
        || atom.has_form_range(*sys::BLANK_NULL_SEQUENCE, 0, 1)
  };
  if is_blank(target) {
    return true;
  }
  // `x_.` and `x:p:d` both make a named pattern optional.
  target.has_form(*sys::PATTERN, Some(2))
}

// endregion

// region Public API

/// Calls `yield_` for every way `pattern` matches `expression`, until a call returns `Flow::Stop`. With `fully ==
/// false`, a pattern may match only some of the elements of a `Flat` or `Orderless` expression. The elements that
/// were not matched are then passed to `yield_` as a `Rest`.
pub fn for_each_match(
  evaluation: &mut Evaluation,
  pattern   : &Atom,
  expression: &Atom,
  fully     : bool,
  yield_    : &mut Yield
) -> Result<Flow, ControlSignal>
{
  log(
    Channel::Debug,
    5,
    format!("Matching {} against {}", pattern, expression).as_str()
  );
  let mut bindings = Bindings::new();
  let context = MatchContext::top_level(fully);
  match_pattern(evaluation, pattern, expression, &mut bindings, context, yield_)
}

/// The bindings of the first complete match of `pattern` against `expression`.
pub fn match_first(
  evaluation: &mut Evaluation,
  pattern   : &Atom,
  expression: &Atom,
) -> Result<Option<Bindings>, ControlSignal>
{
  let mut found: Option<Bindings> = None;
  for_each_match(
    evaluation,
    pattern,
    expression,
    true,
    &mut |_, bindings, _| {
      found = Some(bindings.clone());
      Ok(Flow::Stop)
    }
  )?;
  Ok(found)
}

/// Does `pattern` match `expression`?
pub fn matches(evaluation: &mut Evaluation, pattern: &Atom, expression: &Atom) -> Result<bool, ControlSignal> {
  Ok(match_first(evaluation, pattern, expression)?.is_some())
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    atom::{SExpression, Symbol},
    attributes::Attribute,
    definitions::Definitions,
    interner::interned,
    parsing::parse,
  };

  fn pattern(text: &str, definitions: &mut Definitions) -> Atom {
    let parsed = parse(text).unwrap();
    definitions.qualify_symbols(&parsed)
  }

  fn first_match(text_pattern: &str, text_expression: &str) -> Option<Bindings> {
    let mut definitions = Definitions::new_with_builtins(None);
    let p = pattern(text_pattern, &mut definitions);
    let e = pattern(text_expression, &mut definitions);
    let mut evaluation = Evaluation::new(definitions);
    match_first(&mut evaluation, &p, &e).unwrap()
  }

  fn bound(bindings: &Bindings, name: &str) -> String {
    bindings.get(interned(&format!("Global`{}", name))).map(|v| v.to_string()).unwrap_or_default()
  }

  #[test]
  fn blanks_and_heads() {
    assert!(first_match("f[x_]", "f[1]").is_some());
    assert!(first_match("f[x_Integer]", "f[1]").is_some());
    assert!(first_match("f[x_Integer]", "f[1.5]").is_none());
    assert!(first_match("f[x_]", "f[1, 2]").is_none());
    assert!(first_match("f[x_]", "g[1]").is_none());
  }

  #[test]
  fn sequences_split_leftmost_shortest_first() {
    let bindings = first_match("f[x__, y__]", "f[1, 2, 3]").unwrap();
    assert_eq!(bound(&bindings, "x"), "1");
    assert_eq!(bound(&bindings, "y"), "Sequence[2, 3]");

    let bindings = first_match("f[x___, 3]", "f[1, 2, 3]").unwrap();
    assert_eq!(bound(&bindings, "x"), "Sequence[1, 2]");

    let bindings = first_match("f[x___]", "f[]").unwrap();
    assert_eq!(bound(&bindings, "x"), "Sequence[]");
  }

  #[test]
  fn repeated_names_must_agree() {
    assert!(first_match("f[x_, x_]", "f[1, 1]").is_some());
    assert!(first_match("f[x_, x_]", "f[1, 2]").is_none());
  }

  #[test]
  fn alternatives_and_verbatim() {
    assert!(first_match("f[a | b]", "f[b]").is_some());
    assert!(first_match("f[a | b]", "f[c]").is_none());
    assert!(first_match("f[Verbatim[x_]]", "f[1]").is_none());
  }

  #[test]
  fn orderless_matches_any_permutation() {
    let mut definitions = Definitions::new_with_builtins(None);
    let g = interned("Global`g");
    definitions.set_attribute(g, Attribute::Orderless);
    let p = pattern("g[a, x_]", &mut definitions);
    let e = SExpression::with_head(g, vec![Atom::integer(1), Symbol::from_str("Global`a")]);
    let mut evaluation = Evaluation::new(definitions);
    let bindings = match_first(&mut evaluation, &p, &e).unwrap().unwrap();
    assert_eq!(bound(&bindings, "x"), "1");
  }

  #[test]
  fn flat_groups_elements() {
    let mut definitions = Definitions::new_with_builtins(None);
    let g = interned("Global`g");
    definitions.set_attribute(g, Attribute::Flat);
    let p = pattern("g[x_, c]", &mut definitions);
    let e = pattern("g[a, b, c]", &mut definitions);
    let mut evaluation = Evaluation::new(definitions);
    let bindings = match_first(&mut evaluation, &p, &e).unwrap().unwrap();
    assert_eq!(bound(&bindings, "x"), "g[a, b]");
  }

  #[test]
  fn partial_match_reports_rest() {
    let mut definitions = Definitions::new_with_builtins(None);
    let g = interned("Global`g");
    definitions.set_attribute(g, Attribute::Flat);
    definitions.set_attribute(g, Attribute::Orderless);
    let p = pattern("g[a, b]", &mut definitions);
    let e = pattern("g[c, b, a]", &mut definitions);
    let mut evaluation = Evaluation::new(definitions);

    let mut rest_found = None;
    for_each_match(&mut evaluation, &p, &e, false, &mut |_, _, rest| {
      rest_found = rest;
      Ok(Flow::Stop)
    }).unwrap();
    let rest = rest_found.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest.after[0], Symbol::from_str("Global`c"));
  }

  #[test]
  fn malformed_patterns_are_rejected() {
    let bad_name = SExpression::with_head(*sys::PATTERN, vec![Atom::integer(1), SExpression::with_head(*sys::BLANK, vec![])]);
    assert!(matches!(check_pattern(&bad_name), Err(PatternError::PatternName(_))));

    let bad_optional = SExpression::with_head(*sys::OPTIONAL, vec![Atom::integer(1)]);
    assert!(matches!(check_pattern(&bad_optional), Err(PatternError::OptionalTarget(_))));

    assert!(check_pattern(&parse("f[x_, y__Integer, z_.]").unwrap()).is_ok());
  }
}
