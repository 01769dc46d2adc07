/*!

Structural Operations

Identity tests, heads and lengths, parts, and rule replacement. These look at the form of an expression only.

*/

use crate::{
  atom::{Atom, SExpression},
  definitions::Definitions,
  evaluation::Evaluation,
  interrupt::ControlSignal,
  matching::matches,
  rules::{Arguments, Rule},
  system_symbols as sys,
};

type BuiltinResult = Result<Option<Atom>, ControlSignal>;

callbacks![SameQ, UnsameQ, Head, Length, Part, Replace, ReplaceAll, MatchQ];

pub(super) fn register_builtins(definitions: &mut Definitions) {
  register_builtin!(definitions, SameQ, "SameQ[expressions___]");
  register_builtin!(definitions, UnsameQ, "UnsameQ[expressions___]");
  register_builtin!(definitions, Head, "Head[expression_]");
  register_builtin!(definitions, Length, "Length[expression_]");
  register_builtin!(definitions, Part, "Part[expression_, indices___]");
  register_builtin!(definitions, Replace, "Replace[expression_, rules_]");
  register_builtin!(definitions, ReplaceAll, "ReplaceAll[expression_, rules_]");
  register_builtin!(definitions, MatchQ, "MatchQ[expression_, form_]");
}

/// Implements calls matching
///     `SameQ[expressions___]`
pub(crate) fn SameQ(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  let expressions = arguments.sequence("expressions");
  let same = expressions.windows(2).all(|pair| pair[0].same_q(&pair[1]));
  Ok(Some(Atom::boolean(same)))
}

/// Implements calls matching
///     `UnsameQ[expressions___]`
/// True if no two of the expressions are the same.
pub(crate) fn UnsameQ(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  let expressions = arguments.sequence("expressions");
  let distinct = expressions.iter()
                            .enumerate()
                            .all(|(i, a)| expressions[i + 1..].iter().all(|b| !a.same_q(b)));
  Ok(Some(Atom::boolean(distinct)))
}

/// Implements calls matching
///     `Head[expression_]`
pub(crate) fn Head(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  Ok(arguments.get("expression").map(Atom::head))
}

/// Implements calls matching
///     `Length[expression_]`
pub(crate) fn Length(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  Ok(arguments.get("expression").map(|expression| Atom::from(expression.len() as i64)))
}

// region Parts

/// A part that does not exist: `index` of `target`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PartError {
  pub index : Atom,
  pub target: Atom,
}

impl PartError {
  fn new(index: &Atom, target: &Atom) -> PartError {
    PartError { index: index.clone(), target: target.clone() }
  }
}

fn is_part_specification(index: &Atom) -> bool {
  match index {
    Atom::Integer(_) => true,
    Atom::Symbol(name) => *name == *sys::ALL,
    _ if index.has_form(*sys::LIST, None) => index.elements().iter().all(|i| matches!(i, Atom::Integer(_))),
    _ => false,
  }
}

/// The element at `index`, counting from 1, or from the end if negative. Index 0 is the head.
fn element_at(target: &Atom, index: &Atom) -> Option<Atom> {
  let position = index.to_i64()?;
  if position == 0 {
    return Some(target.head());
  }
  let elements = target.elements();
  let length = elements.len() as i64;
  let offset = if position > 0 { position - 1 } else { length + position };
  if (0..length).contains(&offset) {
    Some(elements[offset as usize].clone())
  } else {
    None
  }
}

/// `target[[indices]]`. `All` takes every element, and a list of integers the elements at those positions, each
/// under the head of `target`.
fn get_part(target: &Atom, indices: &[Atom]) -> Result<Atom, PartError> {
  let (index, rest) = match indices.split_first() {
    Some(split) => split,
    None        => return Ok(target.clone()),
  };

  if index.is_symbol(*sys::ALL) {
    if target.is_atom() {
      return Err(PartError::new(index, target));
    }
    let elements = target.elements()
                         .iter()
                         .map(|element| get_part(element, rest))
                         .collect::<Result<Vec<Atom>, PartError>>()?;
    return Ok(target.with_elements(elements));
  }

  if index.has_form(*sys::LIST, None) {
    if target.is_atom() {
      return Err(PartError::new(index, target));
    }
    let elements = index.elements()
                        .iter()
                        .map(|i| {
                          let element = element_at(target, i).ok_or_else(|| PartError::new(i, target))?;
                          get_part(&element, rest)
                        })
                        .collect::<Result<Vec<Atom>, PartError>>()?;
    return Ok(target.with_elements(elements));
  }

  match element_at(target, index) {
    Some(element) => get_part(&element, rest),
    None          => Err(PartError::new(index, target)),
  }
}

/// `target` with the part at `indices` replaced by `value`. Only integer indices are accepted.
pub(crate) fn replace_part(target: &Atom, indices: &[Atom], value: &Atom) -> Result<Atom, PartError> {
  let (index, rest) = match indices.split_first() {
    Some(split) => split,
    None        => return Ok(value.clone()),
  };
  let expression = target.as_expression().ok_or_else(|| PartError::new(index, target))?;
  let position = index.to_i64().ok_or_else(|| PartError::new(index, target))?;

  let length = expression.len() as i64;
  if position == 0 {
    let head = replace_part(expression.head(), rest, value)?;
    return Ok(SExpression::new(head, expression.elements().to_vec()));
  }
  let offset = if position > 0 { position - 1 } else { length + position };
  if !(0..length).contains(&offset) {
    return Err(PartError::new(index, target));
  }

  let mut elements = expression.elements().to_vec();
  let offset = offset as usize;
  elements[offset] = replace_part(&elements[offset], rest, value)?;
  Ok(target.with_elements(elements))
}

/// Implements calls matching
///     `Part[expression_, indices___]`
pub(crate) fn Part(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let expression = match arguments.get("expression") {
    Some(expression) => expression,
    None             => return Ok(None),
  };
  let indices = arguments.sequence("indices");

  if let Some(index) = indices.iter().find(|index| !is_part_specification(index)) {
    evaluation.message(*sys::PART, "pkspec1", vec![index.clone()]);
    return Ok(None);
  }

  match get_part(expression, &indices) {
    Ok(part) => Ok(Some(part)),
    Err(error) => {
      evaluation.message(*sys::PART, "partw", vec![error.index, error.target]);
      Ok(None)
    }
  }
}

// endregion

// region Replacement

/// The rules of a `lhs -> rhs`, `lhs :> rhs`, or a list of these.
fn replacement_rules(rules: &Atom) -> Option<Vec<Rule>> {
  let is_rule = |atom: &Atom| atom.has_form(*sys::RULE, Some(2)) || atom.has_form(*sys::RULE_DELAYED, Some(2));
  let candidates: Vec<&Atom> =
    if rules.has_form(*sys::LIST, None) {
      rules.elements().iter().collect()
    } else {
      vec![rules]
    };

  candidates.into_iter()
            .map(|rule| {
              if !is_rule(rule) {
                return None;
              }
              let elements = rule.elements();
              Rule::template(elements[0].clone(), elements[1].clone()).ok()
            })
            .collect()
}

/// The first rule that rewrites `expression` as a whole.
fn apply_rules(evaluation: &mut Evaluation, rules: &[Rule], expression: &Atom) -> BuiltinResult {
  for rule in rules {
    if let Some(new) = rule.apply(evaluation, expression)? {
      return Ok(Some(new));
    }
  }
  Ok(None)
}

/// Rewrites every subexpression some rule applies to, outermost first. Replaced parts are not looked into again.
fn replace_all(evaluation: &mut Evaluation, rules: &[Rule], expression: &Atom) -> BuiltinResult {
  if let Some(new) = apply_rules(evaluation, rules, expression)? {
    return Ok(Some(new));
  }
  let e = match expression.as_expression() {
    Some(e) => e,
    None    => return Ok(None),
  };

  let head = replace_all(evaluation, rules, e.head())?;
  let mut changed = head.is_some();
  let mut elements = Vec::with_capacity(e.len());
  for element in e.elements() {
    match replace_all(evaluation, rules, element)? {
      Some(new) => {
        changed = true;
        elements.push(new);
      }
      None => elements.push(element.clone()),
    }
  }

  if changed {
    Ok(Some(SExpression::new(head.unwrap_or_else(|| e.head().clone()), elements)))
  } else {
    Ok(None)
  }
}

/// Implements calls matching
///     `Replace[expression_, rules_]`
pub(crate) fn Replace(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let (expression, rules) = match (arguments.get("expression"), arguments.get("rules")) {
    (Some(expression), Some(rules)) => (expression, rules),
    _                               => return Ok(None),
  };
  let rules = match replacement_rules(rules) {
    Some(rules) => rules,
    None => {
      evaluation.message(*sys::REPLACE, "reps", vec![rules.clone()]);
      return Ok(None);
    }
  };
  Ok(Some(apply_rules(evaluation, &rules, expression)?.unwrap_or_else(|| expression.clone())))
}

/// Implements calls matching
///     `ReplaceAll[expression_, rules_]`
pub(crate) fn ReplaceAll(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let (expression, rules) = match (arguments.get("expression"), arguments.get("rules")) {
    (Some(expression), Some(rules)) => (expression, rules),
    _                               => return Ok(None),
  };
  let rules = match replacement_rules(rules) {
    Some(rules) => rules,
    None => {
      evaluation.message(*sys::REPLACE_ALL, "reps", vec![rules.clone()]);
      return Ok(None);
    }
  };
  Ok(Some(replace_all(evaluation, &rules, expression)?.unwrap_or_else(|| expression.clone())))
}

/// Implements calls matching
///     `MatchQ[expression_, form_]`
pub(crate) fn MatchQ(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  match (arguments.get("expression"), arguments.get("form")) {
    (Some(expression), Some(form)) => Ok(Some(Atom::boolean(matches(evaluation, form, expression)?))),
    _                              => Ok(None),
  }
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{evaluation::Session, parsing::parse};

  fn run(session: &mut Session, text: &str) -> String {
    session.evaluate_str(text).unwrap().result.to_string()
  }

  #[test]
  fn identity() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "a === a"), "True");
    assert_eq!(run(&mut session, "1 === 1."), "False");
    assert_eq!(run(&mut session, "SameQ[]"), "True");
    assert_eq!(run(&mut session, "a =!= b"), "True");
    assert_eq!(run(&mut session, "UnsameQ[a, b, a]"), "False");
  }

  #[test]
  fn heads_and_lengths() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "Head[f[x]]"), "f");
    assert_eq!(run(&mut session, "Head[1/2]"), "Rational");
    assert_eq!(run(&mut session, "Head[\"s\"]"), "String");
    assert_eq!(run(&mut session, "Length[{1, 2, 3}]"), "3");
    assert_eq!(run(&mut session, "Length[x]"), "0");
  }

  #[test]
  fn reading_parts() {
    let mut session = Session::new();
    run(&mut session, "v = {1, {2, 3}, 4}");
    assert_eq!(run(&mut session, "v[[2, 1]]"), "2");
    assert_eq!(run(&mut session, "v[[-1]]"), "4");
    assert_eq!(run(&mut session, "v[[0]]"), "List");
    assert_eq!(run(&mut session, "v[[{1, 3}]]"), "{1, 4}");
    assert_eq!(run(&mut session, "{{1, 2}, {3, 4}}[[All, 2]]"), "{2, 4}");

    let result = session.evaluate_str("v[[7]]").unwrap();
    assert_eq!(result.message_names(), vec!["Part::partw".to_string()]);
    assert_eq!(result.output[0].to_string(), "Part::partw: Part 7 of {1, {2, 3}, 4} does not exist.");
    assert_eq!(result.result.to_string(), "{1, {2, 3}, 4}[[7]]");

    let result = session.evaluate_str("v[[x]]").unwrap();
    assert_eq!(result.message_names(), vec!["Part::pkspec1".to_string()]);
  }

  #[test]
  fn replacing_parts() {
    let list = parse("{1, {2, 3}}").unwrap();
    let new = replace_part(&list, &[Atom::integer(2), Atom::integer(-1)], &Atom::integer(9)).unwrap();
    assert_eq!(new.to_string(), "{1, {2, 9}}");
    let error = replace_part(&list, &[Atom::integer(3)], &Atom::integer(9)).unwrap_err();
    assert_eq!(error.index, Atom::integer(3));
    assert_eq!(error.target, list);
  }

  #[test]
  fn replacement() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "f[x, g[x]] /. x -> 1"), "f[1, g[1]]");
    assert_eq!(run(&mut session, "f[x, y] /. {x -> 1, y -> 2}"), "f[1, 2]");
    assert_eq!(run(&mut session, "f[2] /. f[n_] :> n + 1"), "3");
    assert_eq!(run(&mut session, "g[g[a]] /. g[u_] :> h[u]"), "h[g[a]]");
    assert_eq!(run(&mut session, "Replace[f[x], x -> 1]"), "f[x]");
    assert_eq!(run(&mut session, "Replace[x, x -> 1]"), "1");
    assert_eq!(run(&mut session, "a + b + c /. a + b -> z"), "c + z");

    let result = session.evaluate_str("x /. 1").unwrap();
    assert_eq!(result.message_names(), vec!["ReplaceAll::reps".to_string()]);
  }

  #[test]
  fn pattern_tests() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "MatchQ[f[1], f[_Integer]]"), "True");
    assert_eq!(run(&mut session, "MatchQ[f[a], f[_Integer]]"), "False");
  }
}
