/*!

Assignment Built-ins

The work is done in `crate::assignment`. These only unpack their arguments and decide what the assignment
evaluates to: the right hand side for the immediate forms, `Null` or `$Failed` for the delayed ones.

*/

use crate::{
  assignment::{assign, clear, unset, Tags},
  atom::Atom,
  definitions::Definitions,
  evaluation::Evaluation,
  interner::InternedString,
  interrupt::ControlSignal,
  rules::Arguments,
  system_symbols as sys,
};

type BuiltinResult = Result<Option<Atom>, ControlSignal>;

callbacks![Set, SetDelayed, UpSet, UpSetDelayed, TagSet, TagSetDelayed, Unset, Clear, ClearAll];

pub(super) fn register_builtins(definitions: &mut Definitions) {
  register_builtin!(definitions, Set, "Set[lhs_, rhs_]");
  register_builtin!(definitions, SetDelayed, "SetDelayed[lhs_, rhs_]");
  register_builtin!(definitions, UpSet, "UpSet[lhs_, rhs_]");
  register_builtin!(definitions, UpSetDelayed, "UpSetDelayed[lhs_, rhs_]");
  register_builtin!(definitions, TagSet, "TagSet[f_, lhs_, rhs_]");
  register_builtin!(definitions, TagSetDelayed, "TagSetDelayed[f_, lhs_, rhs_]");
  register_builtin!(definitions, Unset, "Unset[lhs_]");
  register_builtin!(definitions, Clear, "Clear[symbols___]");
  register_builtin!(definitions, ClearAll, "ClearAll[symbols___]");
}

fn sides(arguments: &Arguments) -> Option<(&Atom, &Atom)> {
  match (arguments.get("lhs"), arguments.get("rhs")) {
    (Some(lhs), Some(rhs)) => Some((lhs, rhs)),
    _                      => None,
  }
}

fn null_or_failed(stored: bool) -> Atom {
  if stored {
    Atom::Symbol(*sys::NULL)
  } else {
    Atom::Symbol(*sys::FAILED)
  }
}

/// Implements calls matching
///     `Set[lhs_, rhs_]`
/// The right hand side has already been evaluated. It is the value whether or not the assignment took place.
pub(crate) fn Set(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let (lhs, rhs) = match sides(arguments) {
    Some(sides) => sides,
    None        => return Ok(None),
  };
  assign(evaluation, *sys::SET, lhs, rhs, Tags::Lookup)?;
  Ok(Some(rhs.clone()))
}

/// Implements calls matching
///     `SetDelayed[lhs_, rhs_]`
pub(crate) fn SetDelayed(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let (lhs, rhs) = match sides(arguments) {
    Some(sides) => sides,
    None        => return Ok(None),
  };
  let stored = assign(evaluation, *sys::SET_DELAYED, lhs, rhs, Tags::Lookup)?;
  Ok(Some(null_or_failed(stored)))
}

/// Implements calls matching
///     `UpSet[lhs_, rhs_]`
pub(crate) fn UpSet(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let (lhs, rhs) = match sides(arguments) {
    Some(sides) => sides,
    None        => return Ok(None),
  };
  assign(evaluation, *sys::UP_SET, lhs, rhs, Tags::Up)?;
  Ok(Some(rhs.clone()))
}

/// Implements calls matching
///     `UpSetDelayed[lhs_, rhs_]`
pub(crate) fn UpSetDelayed(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let (lhs, rhs) = match sides(arguments) {
    Some(sides) => sides,
    None        => return Ok(None),
  };
  let stored = assign(evaluation, *sys::UP_SET_DELAYED, lhs, rhs, Tags::Up)?;
  Ok(Some(null_or_failed(stored)))
}

/// The symbol `f` of `f /: lhs = rhs`. Anything else leaves the expression as it is.
fn tag_symbol(arguments: &Arguments, operator: InternedString, evaluation: &mut Evaluation) -> Option<InternedString> {
  let tag = arguments.get("f")?;
  match tag.symbol_name() {
    Some(name) => Some(name),
    None => {
      evaluation.message(operator, "sym", vec![tag.clone(), Atom::from(1)]);
      None
    }
  }
}

/// Implements calls matching
///     `TagSet[f_, lhs_, rhs_]`
/// `TagSet` holds all of its arguments, so the right hand side is evaluated here.
pub(crate) fn TagSet(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let (lhs, rhs) = match sides(arguments) {
    Some(sides) => sides,
    None        => return Ok(None),
  };
  let tag = match tag_symbol(arguments, *sys::TAG_SET, evaluation) {
    Some(tag) => tag,
    None      => return Ok(None),
  };
  let rhs = evaluation.evaluate(rhs)?;
  assign(evaluation, *sys::TAG_SET, lhs, &rhs, Tags::Given(tag))?;
  Ok(Some(rhs))
}

/// Implements calls matching
///     `TagSetDelayed[f_, lhs_, rhs_]`
pub(crate) fn TagSetDelayed(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let (lhs, rhs) = match sides(arguments) {
    Some(sides) => sides,
    None        => return Ok(None),
  };
  let tag = match tag_symbol(arguments, *sys::TAG_SET_DELAYED, evaluation) {
    Some(tag) => tag,
    None      => return Ok(None),
  };
  let stored = assign(evaluation, *sys::TAG_SET_DELAYED, lhs, rhs, Tags::Given(tag))?;
  Ok(Some(null_or_failed(stored)))
}

/// Implements calls matching
///     `Unset[lhs_]`
pub(crate) fn Unset(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  match arguments.get("lhs") {
    Some(lhs) => Ok(Some(unset(evaluation, lhs)?)),
    None      => Ok(None),
  }
}

/// Implements calls matching
///     `Clear[symbols___]`
pub(crate) fn Clear(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  Ok(Some(clear(evaluation, &arguments.sequence("symbols"), false)))
}

/// Implements calls matching
///     `ClearAll[symbols___]`
pub(crate) fn ClearAll(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  Ok(Some(clear(evaluation, &arguments.sequence("symbols"), true)))
}


#[cfg(test)]
mod tests {
  use crate::evaluation::Session;

  fn run(session: &mut Session, text: &str) -> String {
    session.evaluate_str(text).unwrap().result.to_string()
  }

  #[test]
  fn values_of_assignments() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "x = 1 + 1"), "2");
    assert_eq!(run(&mut session, "y := 1 + 1"), "Null");
    assert_eq!(run(&mut session, "g[u] ^= 3"), "3");
    assert_eq!(run(&mut session, "g[v] ^:= 4"), "Null");
    assert_eq!(run(&mut session, "u /: k[u] = 1 + 4"), "5");
    assert_eq!(run(&mut session, "k[u]"), "5");
  }

  #[test]
  fn tags_must_be_symbols() {
    let mut session = Session::new();
    let result = session.evaluate_str("1 /: k[u] = 2").unwrap();
    assert_eq!(result.message_names(), vec!["TagSet::sym".to_string()]);
    assert_eq!(run(&mut session, "k[u]"), "k[u]");
  }

  #[test]
  fn sequences_are_held_by_assignments() {
    let mut session = Session::new();
    run(&mut session, "s = Sequence[1, 2]");
    assert_eq!(run(&mut session, "{s}"), "{1, 2}");
  }
}
