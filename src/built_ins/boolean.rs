/*!

Logic and Comparison

`And` and `Or` hold their arguments and evaluate them one at a time, stopping as soon as the value is known.
Comparisons decide what they can: numbers by value, strings by content, and identical expressions as equal.
Anything else is left as it is.

*/

use std::cmp::Ordering;

use crate::{
  atom::{Atom, SExpression},
  definitions::Definitions,
  evaluation::Evaluation,
  interner::InternedString,
  interrupt::ControlSignal,
  rules::Arguments,
  system_symbols as sys,
};

use super::numeric::Number;

type BuiltinResult = Result<Option<Atom>, ControlSignal>;

callbacks![Not, And, Or, Equal, Unequal, Less, Greater, LessEqual, GreaterEqual];

pub(super) fn register_builtins(definitions: &mut Definitions) {
  register_builtin!(definitions, Not, "Not[x_]");
  register_builtin!(definitions, And, "And[expressions___]");
  register_builtin!(definitions, Or, "Or[expressions___]");
  register_builtin!(definitions, Equal, "Equal[expressions___]");
  register_builtin!(definitions, Unequal, "Unequal[expressions___]");
  register_builtin!(definitions, Less, "Less[expressions___]");
  register_builtin!(definitions, Greater, "Greater[expressions___]");
  register_builtin!(definitions, LessEqual, "LessEqual[expressions___]");
  register_builtin!(definitions, GreaterEqual, "GreaterEqual[expressions___]");
}

// region Connectives

/// Implements calls matching
///     `Not[x_]`
pub(crate) fn Not(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  let x = match arguments.get("x") {
    Some(x) => x,
    None    => return Ok(None),
  };
  if x.is_true() {
    Ok(Some(Atom::boolean(false)))
  } else if x.is_false() {
    Ok(Some(Atom::boolean(true)))
  } else if x.has_form(*sys::NOT, Some(1)) {
    Ok(Some(x.elements()[0].clone()))
  } else {
    Ok(None)
  }
}

/// Evaluates the held arguments of `And` or `Or` in order. The truth value `deciding` ends the evaluation with itself
/// as the value, and the other truth value is dropped. What cannot be decided stays in the expression.
fn short_circuit(
  evaluation: &mut Evaluation,
  original  : &Atom,
  elements  : &[Atom],
  deciding  : bool,
  head      : InternedString
) -> BuiltinResult
{
  let mut undecided = Vec::with_capacity(elements.len());
  for element in elements {
    let value = evaluation.evaluate(element)?;
    if value.is_true() || value.is_false() {
      if value.is_true() == deciding {
        return Ok(Some(Atom::boolean(deciding)));
      }
    } else {
      undecided.push(value);
    }
  }

  match undecided.len() {
    0 => Ok(Some(Atom::boolean(!deciding))),
    1 => Ok(undecided.pop()),
    _ => {
      let new = SExpression::with_head(head, undecided);
      Ok(Some(if new.same_q(original) { original.clone() } else { new }))
    }
  }
}

/// Implements calls matching
///     `And[expressions___]`
pub(crate) fn And(arguments: &Arguments, original: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  short_circuit(evaluation, original, &arguments.sequence("expressions"), false, *sys::AND)
}

/// Implements calls matching
///     `Or[expressions___]`
pub(crate) fn Or(arguments: &Arguments, original: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  short_circuit(evaluation, original, &arguments.sequence("expressions"), true, *sys::OR)
}

// endregion

// region Comparison

/// Whether `a` and `b` are equal, if that can be known.
fn equality(a: &Atom, b: &Atom) -> Option<bool> {
  if let (Some(x), Some(y)) = (Number::from_atom(a), Number::from_atom(b)) {
    return Some(x.compare(&y) == Some(Ordering::Equal));
  }
  if a.same_q(b) {
    return Some(true);
  }
  match (a, b) {
    (Atom::String(_), Atom::String(_)) => Some(false),
    // A number is never a string.
    (Atom::String(_), n) | (n, Atom::String(_)) if n.is_number() => Some(false),
    _ => None,
  }
}

/// Implements calls matching
///     `Equal[expressions___]`
pub(crate) fn Equal(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  let expressions = arguments.sequence("expressions");
  let mut all_equal = true;
  for pair in expressions.windows(2) {
    match equality(&pair[0], &pair[1]) {
      Some(true)  => {}
      Some(false) => return Ok(Some(Atom::boolean(false))),
      None        => all_equal = false,
    }
  }
  if all_equal {
    Ok(Some(Atom::boolean(true)))
  } else {
    Ok(None)
  }
}

/// Implements calls matching
///     `Unequal[expressions___]`
/// True if no two of the expressions are equal.
pub(crate) fn Unequal(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  let expressions = arguments.sequence("expressions");
  let mut decided = true;
  for (i, a) in expressions.iter().enumerate() {
    for b in &expressions[i + 1..] {
      match equality(a, b) {
        Some(true)  => return Ok(Some(Atom::boolean(false))),
        Some(false) => {}
        None        => decided = false,
      }
    }
  }
  if decided {
    Ok(Some(Atom::boolean(true)))
  } else {
    Ok(None)
  }
}

/// Checks that each adjacent pair of `expressions` is ordered as `accept` requires. Only real numbers are compared.
fn chain(expressions: &[Atom], accept: fn(Ordering) -> bool) -> BuiltinResult {
  let mut numbers = Vec::with_capacity(expressions.len());
  for expression in expressions {
    match Number::from_atom(expression) {
      Some(number) => numbers.push(number),
      None         => return Ok(None),
    }
  }
  for pair in numbers.windows(2) {
    match pair[0].compare(&pair[1]) {
      Some(ordering) if accept(ordering) => {}
      Some(_)                            => return Ok(Some(Atom::boolean(false))),
      None                               => return Ok(None),
    }
  }
  Ok(Some(Atom::boolean(true)))
}

/// Implements calls matching
///     `Less[expressions___]`
pub(crate) fn Less(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  chain(&arguments.sequence("expressions"), |ordering| ordering == Ordering::Less)
}

/// Implements calls matching
///     `Greater[expressions___]`
pub(crate) fn Greater(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  chain(&arguments.sequence("expressions"), |ordering| ordering == Ordering::Greater)
}

/// Implements calls matching
///     `LessEqual[expressions___]`
pub(crate) fn LessEqual(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  chain(&arguments.sequence("expressions"), |ordering| ordering != Ordering::Greater)
}

/// Implements calls matching
///     `GreaterEqual[expressions___]`
pub(crate) fn GreaterEqual(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  chain(&arguments.sequence("expressions"), |ordering| ordering != Ordering::Less)
}

// endregion


#[cfg(test)]
mod tests {
  use crate::evaluation::Session;

  fn run(session: &mut Session, text: &str) -> String {
    session.evaluate_str(text).unwrap().result.to_string()
  }

  #[test]
  fn connectives() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "!True"), "False");
    assert_eq!(run(&mut session, "Not[Not[x]]"), "x");
    assert_eq!(run(&mut session, "True && x"), "x");
    assert_eq!(run(&mut session, "x && y"), "x && y");
    assert_eq!(run(&mut session, "False || x || True"), "True");
    assert_eq!(run(&mut session, "And[]"), "True");
    assert_eq!(run(&mut session, "Or[]"), "False");
  }

  #[test]
  fn and_stops_at_the_first_false() {
    let mut session = Session::new();
    run(&mut session, "n = 0");
    run(&mut session, "False && (n = 1)");
    assert_eq!(run(&mut session, "n"), "0");
    run(&mut session, "True || (n = 2)");
    assert_eq!(run(&mut session, "n"), "0");
  }

  #[test]
  fn equality() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "1 == 1."), "True");
    assert_eq!(run(&mut session, "1/2 == 0.5"), "True");
    assert_eq!(run(&mut session, "1 == 2"), "False");
    assert_eq!(run(&mut session, "\"a\" == \"b\""), "False");
    assert_eq!(run(&mut session, "x == x"), "True");
    assert_eq!(run(&mut session, "x == y"), "x == y");
    assert_eq!(run(&mut session, "1 != 2"), "True");
    assert_eq!(run(&mut session, "Unequal[1, 2, 1]"), "False");
  }

  #[test]
  fn ordering() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "1 < 2 < 3"), "True");
    assert_eq!(run(&mut session, "1 < 3 < 2"), "False");
    assert_eq!(run(&mut session, "2 <= 2"), "True");
    assert_eq!(run(&mut session, "1/3 > 0.3"), "True");
    assert_eq!(run(&mut session, "3 >= x"), "3 >= x");
  }
}
