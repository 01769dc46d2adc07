/*!

A `Rule` is a pattern together with what to do with a match: either instantiate a template (the right hand side of a
user definition) or call a native function (a built-in). Rules are what the definition store keeps in its
categories, sorted by `PatternKey`.

*/

mod sort_key;

use std::{
  cmp::Ordering,
  fmt::{Debug, Display, Formatter},
};

use smallvec::SmallVec;

use crate::{
  atom::{Atom, SExpression},
  definitions::strip_context,
  evaluation::Evaluation,
  interner::{resolve_str, InternedString},
  interrupt::ControlSignal,
  logging::{log, Channel},
  matching::{check_pattern, for_each_match, Bindings, Flow, PatternError},
  system_symbols as sys,
};

pub use sort_key::PatternKey;

/// The signature of a built-in. A callback receives the values bound by its pattern, the expression being rewritten,
/// and the evaluation. Returning `Ok(None)` declines the match, and the matcher tries the next one.
pub type NativeFn = fn(&Arguments, &Atom, &mut Evaluation) -> Result<Option<Atom>, ControlSignal>;

#[derive(Clone, Copy)]
pub struct NativeRule {
  /// The registered name, by which the rule is persisted.
  pub name    : &'static str,
  pub callback: NativeFn,
}

impl Debug for NativeRule {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "NativeRule({})", self.name)
  }
}

impl PartialEq for NativeRule {
  fn eq(&self, other: &Self) -> bool {
    self.name == other.name
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RuleAction {
  Template(Atom),
  Native(NativeRule),
}

#[derive(Clone, Debug)]
pub struct Rule {
  pattern: Atom,
  action : RuleAction,
  /// Rules of the builtin tier sort after user rules of the same specificity.
  system : bool,
  key    : PatternKey,
}

impl Rule {
  pub fn new(pattern: Atom, action: RuleAction, system: bool) -> Result<Rule, PatternError> {
    check_pattern(&pattern)?;
    let key = PatternKey::of(&pattern);
    Ok(Rule { pattern, action, system, key })
  }

  /// A rule that rewrites matches of `pattern` to `replacement`.
  pub fn template(pattern: Atom, replacement: Atom) -> Result<Rule, PatternError> {
    Rule::new(pattern, RuleAction::Template(replacement), false)
  }

  pub fn native(pattern: Atom, name: &'static str, callback: NativeFn) -> Result<Rule, PatternError> {
    Rule::new(pattern, RuleAction::Native(NativeRule { name, callback }), true)
  }

  /// The own-value rule `symbol :> value`. A bare symbol is always a valid pattern.
  pub fn own_value(symbol: InternedString, value: Atom) -> Rule {
    let pattern = Atom::Symbol(symbol);
    let key = PatternKey::of(&pattern);
    Rule { pattern, action: RuleAction::Template(value), system: false, key }
  }

  pub fn pattern(&self) -> &Atom {
    &self.pattern
  }

  pub fn action(&self) -> &RuleAction {
    &self.action
  }

  pub fn is_system(&self) -> bool {
    self.system
  }

  pub fn with_system(mut self, system: bool) -> Rule {
    self.system = system;
    self
  }

  pub fn replacement(&self) -> Option<&Atom> {
    match &self.action {
      RuleAction::Template(replacement) => Some(replacement),
      RuleAction::Native(_)             => None,
    }
  }

  /// Compares specificity. `Less` means `self` is tried first.
  pub fn compare_key(&self, other: &Rule) -> Ordering {
    (self.system, &self.key).cmp(&(other.system, &other.key))
  }

  /// A conditional rule is guarded by a `Condition`, either around its pattern or at the top of its replacement.
  pub fn is_conditional(&self) -> bool {
    let mut pattern = &self.pattern;
    while pattern.has_form(*sys::HOLD_PATTERN, Some(1)) {
      pattern = &pattern.elements()[0];
    }
    pattern.has_form(*sys::CONDITION, Some(2))
        || matches!(&self.action, RuleAction::Template(r) if r.has_form(*sys::CONDITION, Some(2)))
  }

  /// The rule as the expression `HoldPattern[pattern] :> replacement`. Native rules have no such form.
  pub fn to_atom(&self) -> Option<Atom> {
    let replacement = self.replacement()?;
    let pattern =
      if self.pattern.has_form(*sys::HOLD_PATTERN, Some(1)) {
        self.pattern.clone()
      } else {
        SExpression::hold_pattern(self.pattern.clone())
      };
    Some(SExpression::rule_delayed(pattern, replacement.clone()))
  }

  /// Rewrites `expression` with the first match of the pattern for which the rule produces a value. Elements of a
  /// `Flat` or `Orderless` expression that the pattern did not consume are kept around the result.
  pub fn apply(&self, evaluation: &mut Evaluation, expression: &Atom) -> Result<Option<Atom>, ControlSignal> {
    let mut result: Option<Atom> = None;

    for_each_match(
      evaluation,
      &self.pattern,
      expression,
      false,
      &mut |evaluation, bindings, rest| {
        let rest = rest.unwrap_or_default();
        // A match that leaves every element behind did not match the expression at all.
        if !rest.is_empty() && rest.len() == expression.len() {
          return Ok(Flow::Continue);
        }

        let new = match &self.action {
          RuleAction::Template(replacement) => {
            match instantiate(evaluation, bindings, replacement)? {
              Some(new) => new,
              None      => return Ok(Flow::Continue),
            }
          }
          RuleAction::Native(native) => {
            let arguments = Arguments::from_bindings(bindings);
            log(
              Channel::Debug,
              5,
              format!("{} called with arguments {}", native.name, arguments).as_str()
            );
            match (native.callback)(&arguments, expression, evaluation)? {
              Some(new) => new,
              None      => return Ok(Flow::Continue),
            }
          }
        };

        result = Some(
          if rest.is_empty() {
            new
          } else {
            let mut elements = rest.before;
            elements.push(new);
            elements.extend(rest.after);
            expression.with_elements(elements)
          }
        );
        Ok(Flow::Stop)
      }
    )?;

    Ok(result)
  }
}

/// Substitutes `bindings` into `replacement`. A `Condition` at the top of the result is a guard: the instantiation
/// fails unless its test evaluates to `True`.
fn instantiate(
  evaluation : &mut Evaluation,
  bindings   : &Bindings,
  replacement: &Atom
) -> Result<Option<Atom>, ControlSignal>
{
  let mut new = bindings.substitute(replacement);
  while new.has_form(*sys::CONDITION, Some(2)) {
    let value = new.elements()[0].clone();
    let test = evaluation.evaluate(&new.elements()[1])?;
    if !test.is_true() {
      return Ok(None);
    }
    new = value;
  }
  Ok(Some(new))
}

impl PartialEq for Rule {
  /// Rules are the same if they would do the same thing.
  fn eq(&self, other: &Self) -> bool {
    self.pattern == other.pattern && self.action == other.action
  }
}

impl Display for Rule {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match &self.action {
      RuleAction::Template(replacement) => write!(f, "{} :> {}", self.pattern, replacement),
      RuleAction::Native(native)        => write!(f, "{} :> <{}>", self.pattern, native.name),
    }
  }
}

/// The values bound by the pattern of a native rule, keyed by the short name of the pattern variable.
pub struct Arguments {
  values: SmallVec<[(&'static str, Atom); 4]>
}

impl Arguments {
  fn from_bindings(bindings: &Bindings) -> Arguments {
    Arguments {
      values: bindings.iter()
                      .map(|(name, value)| (strip_context(resolve_str(*name)), value.clone()))
                      .collect()
    }
  }

  pub fn get(&self, name: &str) -> Option<&Atom> {
    self.values.iter().rev().find(|(n, _)| *n == name).map(|(_, value)| value)
  }

  /// The elements bound by a sequence pattern. A variable bound to a single element gives that element alone.
  pub fn sequence(&self, name: &str) -> Vec<Atom> {
    match self.get(name) {
      Some(value) => match value.sequence_elements() {
        Some(elements) => elements.to_vec(),
        None           => vec![value.clone()],
      },
      None => vec![],
    }
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

impl Display for Arguments {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let values = self.values
                     .iter()
                     .map(|(name, value)| format!("{} -> {}", name, value))
                     .collect::<Vec<String>>()
                     .join(", ");
    write!(f, "{{{}}}", values)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    definitions::Definitions,
    parsing::parse,
  };

  fn read(text: &str, definitions: &mut Definitions) -> Atom {
    definitions.qualify_symbols(&parse(text).unwrap())
  }

  #[test]
  fn template_rule_rewrites() {
    let mut definitions = Definitions::new_with_builtins(None);
    let rule = Rule::template(read("f[x_]", &mut definitions), read("g[x, x]", &mut definitions)).unwrap();
    let subject = read("f[1]", &mut definitions);
    let mut evaluation = Evaluation::new(definitions);

    let result = rule.apply(&mut evaluation, &subject).unwrap().unwrap();
    assert_eq!(result.to_string(), "g[1, 1]");
  }

  #[test]
  fn failed_guard_declines() {
    let mut definitions = Definitions::new_with_builtins(None);
    let rule = Rule::template(
      read("f[x_]", &mut definitions),
      read("Condition[x, SameQ[x, 2]]", &mut definitions)
    ).unwrap();
    assert!(rule.is_conditional());
    let one = read("f[1]", &mut definitions);
    let two = read("f[2]", &mut definitions);
    let mut evaluation = Evaluation::new(definitions);

    assert_eq!(rule.apply(&mut evaluation, &one).unwrap(), None);
    assert_eq!(rule.apply(&mut evaluation, &two).unwrap(), Some(Atom::integer(2)));
  }

  #[test]
  fn user_rules_sort_before_system_rules() {
    let mut definitions = Definitions::new_with_builtins(None);
    let user = Rule::template(read("f[x_]", &mut definitions), Atom::integer(1)).unwrap();
    let system = user.clone().with_system(true);
    assert_eq!(user.compare_key(&system), Ordering::Less);
  }

  #[test]
  fn malformed_pattern_is_an_error() {
    let bad = SExpression::with_head(*sys::PATTERN, vec![Atom::integer(1), SExpression::with_head(*sys::BLANK, vec![])]);
    assert!(Rule::template(bad, Atom::integer(0)).is_err());
  }

  #[test]
  fn to_atom_wraps_in_hold_pattern() {
    let mut definitions = Definitions::new_with_builtins(None);
    let rule = Rule::template(read("f[x_]", &mut definitions), read("x^2", &mut definitions)).unwrap();
    assert_eq!(rule.to_atom().unwrap().to_string(), "HoldPattern[f[x_]] :> x^2");
  }
}
