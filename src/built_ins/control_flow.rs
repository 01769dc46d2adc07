/*!

Program Control Flow Built-ins

Sequencing, branching and the non-local exits. The exits raise a `ControlSignal`, which travels up through `?` until
whatever handles it: `Catch` for `Throw`, the evaluation of a user rule for `Return`, the top level for the rest.

*/

use crate::{
  atom::{Atom, SExpression},
  definitions::Definitions,
  evaluation::Evaluation,
  interrupt::ControlSignal,
  matching::matches,
  rules::Arguments,
  system_symbols as sys,
};

type BuiltinResult = Result<Option<Atom>, ControlSignal>;

callbacks![
  CompoundExpression,
  If,
  IfElse,
  IfOtherwise,
  Return,
  ReturnValue,
  Throw,
  ThrowTagged,
  Catch,
  CatchTagged,
  CatchTaggedApply,
  Abort,
  Break,
  Continue,
  Evaluate,
];

pub(super) fn register_builtins(definitions: &mut Definitions) {
  register_builtin!(definitions, CompoundExpression, "CompoundExpression[expressions___]");
  register_builtin!(definitions, If, "If[condition_, then_]");
  register_builtin!(definitions, IfElse, "If[condition_, then_, else_]");
  register_builtin!(definitions, IfOtherwise, "If[condition_, then_, else_, otherwise_]");
  register_builtin!(definitions, Return, "Return[]");
  register_builtin!(definitions, ReturnValue, "Return[value_]");
  register_builtin!(definitions, Throw, "Throw[value_]");
  register_builtin!(definitions, ThrowTagged, "Throw[value_, tag_]");
  register_builtin!(definitions, Catch, "Catch[expression_]");
  register_builtin!(definitions, CatchTagged, "Catch[expression_, form_]");
  register_builtin!(definitions, CatchTaggedApply, "Catch[expression_, form_, f_]");
  register_builtin!(definitions, Abort, "Abort[]");
  register_builtin!(definitions, Break, "Break[]");
  register_builtin!(definitions, Continue, "Continue[]");
  register_builtin!(definitions, Evaluate, "Evaluate[expressions___]");
}

/// Implements calls matching
///     `CompoundExpression[expressions___]`
/// The elements are held, and evaluated here in order. The value is that of the last.
pub(crate) fn CompoundExpression(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let expressions = arguments.sequence("expressions");
  let mut value = Atom::Symbol(*sys::NULL);
  for expression in expressions.iter() {
    value = evaluation.evaluate(expression)?;
  }
  Ok(Some(value))
}

// region If

/// The branch of `If` chosen by the already evaluated `condition`: the first for `True`, the second for `False`,
/// the third for anything else. `None` where the branch is absent.
fn branch<'a>(condition: &Atom, branches: [Option<&'a Atom>; 3]) -> Option<Option<&'a Atom>> {
  if condition.is_true() {
    Some(branches[0])
  } else if condition.is_false() {
    Some(branches[1])
  } else {
    branches[2].map(Some)
  }
}

fn choose(arguments: &Arguments, with_else: bool, with_otherwise: bool) -> BuiltinResult {
  let condition = match arguments.get("condition") {
    Some(condition) => condition,
    None            => return Ok(None),
  };
  let branches = [
    arguments.get("then"),
    if with_else { arguments.get("else") } else { None },
    if with_otherwise { arguments.get("otherwise") } else { None },
  ];

  match branch(condition, branches) {
    Some(Some(chosen)) => Ok(Some(chosen.clone())),
    // `If[False, t]` is `Null`.
    Some(None)         => Ok(Some(Atom::Symbol(*sys::NULL))),
    None               => Ok(None),
  }
}

/// Implements calls matching
///     `If[condition_, then_]`
pub(crate) fn If(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  choose(arguments, false, false)
}

/// Implements calls matching
///     `If[condition_, then_, else_]`
pub(crate) fn IfElse(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  choose(arguments, true, false)
}

/// Implements calls matching
///     `If[condition_, then_, else_, otherwise_]`
pub(crate) fn IfOtherwise(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  choose(arguments, true, true)
}

// endregion

// region Non-local exits

/// Implements calls matching
///     `Return[]`
pub(crate) fn Return(_: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  Err(ControlSignal::Return(Atom::Symbol(*sys::NULL)))
}

/// Implements calls matching
///     `Return[value_]`
pub(crate) fn ReturnValue(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  match arguments.get("value") {
    Some(value) => Err(ControlSignal::Return(value.clone())),
    None        => Ok(None),
  }
}

/// Implements calls matching
///     `Throw[value_]`
pub(crate) fn Throw(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  match arguments.get("value") {
    Some(value) => Err(ControlSignal::Throw(value.clone(), None)),
    None        => Ok(None),
  }
}

/// Implements calls matching
///     `Throw[value_, tag_]`
pub(crate) fn ThrowTagged(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  match (arguments.get("value"), arguments.get("tag")) {
    (Some(value), Some(tag)) => Err(ControlSignal::Throw(value.clone(), Some(tag.clone()))),
    _                        => Ok(None),
  }
}

/// Implements calls matching
///     `Catch[expression_]`
/// Catches only untagged throws.
pub(crate) fn Catch(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let expression = match arguments.get("expression") {
    Some(expression) => expression,
    None             => return Ok(None),
  };
  match evaluation.evaluate(expression) {
    Ok(value)                              => Ok(Some(value)),
    Err(ControlSignal::Throw(value, None)) => Ok(Some(value)),
    Err(signal)                            => Err(signal),
  }
}

/// Evaluates `expression`, catching throws whose tag matches `form`. Gives the value and tag that were caught.
fn catch_tagged(
  evaluation: &mut Evaluation,
  expression: &Atom,
  form      : &Atom
) -> Result<Result<Atom, (Atom, Atom)>, ControlSignal>
{
  match evaluation.evaluate(expression) {
    Ok(value) => Ok(Ok(value)),
    Err(ControlSignal::Throw(value, Some(tag))) => {
      if matches(evaluation, form, &tag)? {
        Ok(Err((value, tag)))
      } else {
        Err(ControlSignal::Throw(value, Some(tag)))
      }
    }
    Err(signal) => Err(signal),
  }
}

/// Implements calls matching
///     `Catch[expression_, form_]`
pub(crate) fn CatchTagged(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let (expression, form) = match (arguments.get("expression"), arguments.get("form")) {
    (Some(expression), Some(form)) => (expression, form),
    _                              => return Ok(None),
  };
  match catch_tagged(evaluation, expression, form)? {
    Ok(value)       => Ok(Some(value)),
    Err((value, _)) => Ok(Some(value)),
  }
}

/// Implements calls matching
///     `Catch[expression_, form_, f_]`
/// A caught value is given as `f[value, tag]`.
pub(crate) fn CatchTaggedApply(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let (expression, form, f) = match (arguments.get("expression"), arguments.get("form"), arguments.get("f")) {
    (Some(expression), Some(form), Some(f)) => (expression, form, f),
    _                                       => return Ok(None),
  };
  match catch_tagged(evaluation, expression, form)? {
    Ok(value)         => Ok(Some(value)),
    Err((value, tag)) => Ok(Some(SExpression::new(f.clone(), vec![value, tag]))),
  }
}

/// Implements calls matching
///     `Abort[]`
pub(crate) fn Abort(_: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  Err(ControlSignal::Abort)
}

/// Implements calls matching
///     `Break[]`
pub(crate) fn Break(_: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  Err(ControlSignal::Break)
}

/// Implements calls matching
///     `Continue[]`
pub(crate) fn Continue(_: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  Err(ControlSignal::Continue)
}

// endregion

/// Implements calls matching
///     `Evaluate[expressions___]`
/// Outside a held position `Evaluate` does nothing but go away.
pub(crate) fn Evaluate(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  let mut expressions = arguments.sequence("expressions");
  if expressions.len() == 1 {
    Ok(expressions.pop())
  } else {
    Ok(Some(SExpression::sequence(expressions)))
  }
}


#[cfg(test)]
mod tests {
  use crate::evaluation::Session;

  fn run(session: &mut Session, text: &str) -> String {
    session.evaluate_str(text).unwrap().result.to_string()
  }

  #[test]
  fn compound_expressions() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "a = 1; b = a + 1; b"), "2");
    assert_eq!(run(&mut session, "a = 5;"), "Null");
    assert_eq!(run(&mut session, "a"), "5");
  }

  #[test]
  fn branches() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "If[1 < 2, yes, no]"), "yes");
    assert_eq!(run(&mut session, "If[1 > 2, yes, no]"), "no");
    assert_eq!(run(&mut session, "If[1 > 2, yes]"), "Null");
    assert_eq!(run(&mut session, "If[c, yes, no]"), "If[c, yes, no]");
    assert_eq!(run(&mut session, "If[c, yes, no, neither]"), "neither");

    run(&mut session, "n = 0");
    run(&mut session, "If[True, n = 1, n = 2]");
    assert_eq!(run(&mut session, "n"), "1");
  }

  #[test]
  fn throw_and_catch() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "Catch[a; Throw[1]; b]"), "1");
    assert_eq!(run(&mut session, "Catch[Throw[1, t], t]"), "1");
    assert_eq!(run(&mut session, "Catch[Throw[1, t], u]"), "Hold[Throw[1, t]]");
    assert_eq!(run(&mut session, "Catch[Catch[Throw[2, t], u], t]"), "2");
    assert_eq!(run(&mut session, "Catch[Throw[3, t], _, f]"), "f[3, t]");
    assert_eq!(run(&mut session, "Catch[Throw[1, t]]"), "Hold[Throw[1, t]]");

    let result = session.evaluate_str("Throw[4]").unwrap();
    assert_eq!(result.result.to_string(), "Hold[Throw[4]]");
    assert_eq!(result.message_names(), vec!["Throw::nocatch".to_string()]);
  }

  #[test]
  fn returns() {
    let mut session = Session::new();
    run(&mut session, "f[x_] := (If[x > 0, Return[positive]]; other)");
    assert_eq!(run(&mut session, "f[1]"), "positive");
    assert_eq!(run(&mut session, "f[-1]"), "other");
    assert_eq!(run(&mut session, "Return[5]"), "5");
  }

  #[test]
  fn aborts() {
    let mut session = Session::new();
    run(&mut session, "x = 1");
    assert_eq!(run(&mut session, "x = 2; Abort[]; x = 3"), "$Aborted");
    assert_eq!(run(&mut session, "x"), "2");

    let result = session.evaluate_str("Break[]").unwrap();
    assert_eq!(result.result.to_string(), "Hold[Break[]]");
    assert_eq!(result.message_names(), vec!["Break::nofdw".to_string()]);
  }

  #[test]
  fn evaluate_outside_holds() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "Evaluate[1 + 1]"), "2");
    assert_eq!(run(&mut session, "f[Evaluate[1, 2]]"), "f[1, 2]");
  }
}
