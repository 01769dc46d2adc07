/*!

Queries of what the definition store holds for a symbol: its rules by category, its options, the defaults of its
optional arguments, and its context.

*/

use crate::{
  atom::{Atom, SExpression},
  definitions::{context_of, Category, Definitions},
  evaluation::Evaluation,
  interner::{resolve_str, InternedString},
  interrupt::ControlSignal,
  rules::Arguments,
  system_symbols as sys,
};

type BuiltinResult = Result<Option<Atom>, ControlSignal>;

callbacks![
  OwnValues,
  DownValues,
  SubValues,
  UpValues,
  NValues,
  DefaultValues,
  FormatValues,
  Messages,
  Options,
  OptionsNamed,
  Default,
  Context,
  ContextOf,
];

pub(super) fn register_builtins(definitions: &mut Definitions) {
  register_builtin!(definitions, OwnValues, "OwnValues[symbol_]");
  register_builtin!(definitions, DownValues, "DownValues[symbol_]");
  register_builtin!(definitions, SubValues, "SubValues[symbol_]");
  register_builtin!(definitions, UpValues, "UpValues[symbol_]");
  register_builtin!(definitions, NValues, "NValues[symbol_]");
  register_builtin!(definitions, DefaultValues, "DefaultValues[symbol_]");
  register_builtin!(definitions, FormatValues, "FormatValues[symbol_]");
  register_builtin!(definitions, Messages, "Messages[symbol_]");
  register_builtin!(definitions, Options, "Options[symbol_]");
  register_builtin!(definitions, OptionsNamed, "Options[symbol_, name_]");
  register_builtin!(definitions, Default, "Default[symbol_, position___]");
  register_builtin!(definitions, Context, "Context[]");
  register_builtin!(definitions, ContextOf, "Context[symbol_]");
}

/// The symbol `atom` names, either itself or by a string. Anything else is reported as `operator::sym`.
fn symbol_of(evaluation: &mut Evaluation, operator: InternedString, atom: &Atom) -> Option<InternedString> {
  if let Some(symbol) = atom.symbol_name() {
    return Some(symbol);
  }
  if let Some(name) = atom.as_str() {
    return Some(evaluation.definitions_mut().lookup_name(name));
  }
  evaluation.message(operator, "sym", vec![atom.clone(), Atom::from(1)]);
  None
}

// region Rule lists

/// The rules of `category` of the symbol bound to `symbol`, each as `HoldPattern[lhs] :> rhs`. Native rules are
/// left out.
fn rule_list(arguments: &Arguments, evaluation: &mut Evaluation, operator: InternedString, category: Category) -> BuiltinResult {
  let symbol = match arguments.get("symbol") {
    Some(symbol) => symbol,
    None         => return Ok(None),
  };
  let symbol = match symbol_of(evaluation, operator, symbol) {
    Some(symbol) => symbol,
    None         => return Ok(None),
  };

  let rules = evaluation.definitions_mut()
                        .get_values(symbol, category)
                        .iter()
                        .filter_map(|rule| rule.to_atom())
                        .collect();
  Ok(Some(SExpression::list(rules)))
}

/// Implements calls matching
///     `OwnValues[symbol_]`
pub(crate) fn OwnValues(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  rule_list(arguments, evaluation, *sys::OWN_VALUES, Category::Own)
}

/// Implements calls matching
///     `DownValues[symbol_]`
pub(crate) fn DownValues(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  rule_list(arguments, evaluation, *sys::DOWN_VALUES, Category::Down)
}

/// Implements calls matching
///     `SubValues[symbol_]`
pub(crate) fn SubValues(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  rule_list(arguments, evaluation, *sys::SUB_VALUES, Category::Sub)
}

/// Implements calls matching
///     `UpValues[symbol_]`
pub(crate) fn UpValues(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  rule_list(arguments, evaluation, *sys::UP_VALUES, Category::Up)
}

/// Implements calls matching
///     `NValues[symbol_]`
pub(crate) fn NValues(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  rule_list(arguments, evaluation, *sys::N_VALUES, Category::N)
}

/// Implements calls matching
///     `DefaultValues[symbol_]`
pub(crate) fn DefaultValues(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  rule_list(arguments, evaluation, *sys::DEFAULT_VALUES, Category::Default)
}

/// Implements calls matching
///     `FormatValues[symbol_]`
pub(crate) fn FormatValues(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  rule_list(arguments, evaluation, *sys::FORMAT_VALUES, Category::Format)
}

/// Implements calls matching
///     `Messages[symbol_]`
pub(crate) fn Messages(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  rule_list(arguments, evaluation, *sys::MESSAGES, Category::Message)
}

// endregion

// region Options and defaults

fn option_rule(name: InternedString, value: Atom) -> Atom {
  SExpression::rule(Atom::Symbol(name), value)
}

/// Implements calls matching
///     `Options[symbol_]`
pub(crate) fn Options(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let symbol = match arguments.get("symbol") {
    Some(symbol) => symbol,
    None         => return Ok(None),
  };
  let symbol = match symbol_of(evaluation, *sys::OPTIONS, symbol) {
    Some(symbol) => symbol,
    None         => return Ok(None),
  };

  let options = evaluation.definitions_mut()
                          .get_definition(symbol)
                          .options
                          .iter()
                          .map(|(name, value)| option_rule(*name, value.clone()))
                          .collect();
  Ok(Some(SExpression::list(options)))
}

/// Implements calls matching
///     `Options[symbol_, name_]`
/// The option as a one element list, or the empty list with `Options::optnf` if there is no such option.
pub(crate) fn OptionsNamed(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let (symbol, name) = match (arguments.get("symbol"), arguments.get("name")) {
    (Some(symbol), Some(name)) => (symbol, name),
    _                          => return Ok(None),
  };
  let symbol = match symbol_of(evaluation, *sys::OPTIONS, symbol) {
    Some(symbol) => symbol,
    None         => return Ok(None),
  };
  let option = match name.as_str() {
    Some(text) => evaluation.definitions_mut().lookup_name(text),
    None => match name.symbol_name() {
      Some(option) => option,
      None         => return Ok(None),
    },
  };

  match evaluation.definitions_mut().get_option(symbol, option) {
    Some(value) => Ok(Some(SExpression::list(vec![option_rule(option, value)]))),
    None => {
      evaluation.message(*sys::OPTIONS, "optnf", vec![Atom::Symbol(option), Atom::Symbol(symbol)]);
      Ok(Some(SExpression::list(vec![])))
    }
  }
}

/// Implements calls matching
///     `Default[symbol_, position___]`
/// Declines when no default is defined, so that `Default[f]` stays as it is.
pub(crate) fn Default(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let symbol = match arguments.get("symbol").and_then(Atom::symbol_name) {
    Some(symbol) => symbol,
    None         => return Ok(None),
  };
  let position = arguments.sequence("position");
  if position.len() > 2 {
    return Ok(None);
  }
  let mut indices = Vec::with_capacity(position.len());
  for index in &position {
    match index.to_usize() {
      Some(index) => indices.push(index),
      None        => return Ok(None),
    }
  }

  let result = evaluation.default_value(symbol, indices.first().copied(), indices.get(1).copied())?;
  Ok(result.filter(|value| !value.has_form(*sys::DEFAULT, None)))
}

// endregion

// region Contexts

/// Implements calls matching
///     `Context[]`
pub(crate) fn Context(_: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  Ok(Some(Atom::string(evaluation.definitions().current_context())))
}

/// Implements calls matching
///     `Context[symbol_]`
pub(crate) fn ContextOf(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let symbol = match arguments.get("symbol") {
    Some(symbol) => symbol,
    None         => return Ok(None),
  };
  match symbol_of(evaluation, *sys::CONTEXT, symbol) {
    Some(symbol) => Ok(Some(Atom::string(context_of(resolve_str(symbol))))),
    None         => Ok(None),
  }
}

// endregion


#[cfg(test)]
mod tests {
  use crate::evaluation::Session;

  fn run(session: &mut Session, text: &str) -> String {
    session.evaluate_str(text).unwrap().result.to_string()
  }

  fn messages(session: &mut Session, text: &str) -> Vec<String> {
    session.evaluate_str(text).unwrap().message_names()
  }

  #[test]
  fn rule_lists() {
    let mut session = Session::new();
    run(&mut session, "x = 1");
    run(&mut session, "f[n_] := n + 1");
    run(&mut session, "g /: h[g] = 2");
    assert_eq!(run(&mut session, "OwnValues[x]"), "{HoldPattern[x] :> 1}");
    assert_eq!(run(&mut session, "DownValues[f]"), "{HoldPattern[f[n_]] :> n + 1}");
    assert_eq!(run(&mut session, "UpValues[g]"), "{HoldPattern[h[g]] :> 2}");
    assert_eq!(run(&mut session, "DownValues[\"f\"]"), "{HoldPattern[f[n_]] :> n + 1}");
    assert_eq!(run(&mut session, "SubValues[f]"), "{}");
    // Built-ins have no rules to show.
    assert_eq!(run(&mut session, "DownValues[Plus]"), "{}");
    assert_eq!(messages(&mut session, "DownValues[1]"), vec!["DownValues::sym".to_string()]);
  }

  #[test]
  fn messages_of_a_symbol() {
    let mut session = Session::new();
    run(&mut session, "f::oops = \"Oops.\"");
    assert_eq!(run(&mut session, "Messages[f]"), "{HoldPattern[f::oops] :> \"Oops.\"}");
  }

  #[test]
  fn options() {
    let mut session = Session::new();
    run(&mut session, "Options[f] = {a -> 1, b -> 2}");
    assert_eq!(run(&mut session, "Options[f, b]"), "{b -> 2}");
    assert_eq!(run(&mut session, "Options[f, \"a\"]"), "{a -> 1}");
    let result = session.evaluate_str("Options[f, c]").unwrap();
    assert_eq!(result.result.to_string(), "{}");
    assert_eq!(result.message_names(), vec!["Options::optnf".to_string()]);
    assert_eq!(run(&mut session, "Options[g]"), "{}");
  }

  #[test]
  fn defaults() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "Default[f]"), "Default[f]");
    run(&mut session, "Default[f] = 0");
    run(&mut session, "Default[f, 2] = 5");
    assert_eq!(run(&mut session, "Default[f]"), "0");
    assert_eq!(run(&mut session, "Default[f, 1]"), "0");
    assert_eq!(run(&mut session, "Default[f, 2]"), "5");
  }

  #[test]
  fn contexts() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "Context[]"), "\"Global`\"");
    assert_eq!(run(&mut session, "Context[x]"), "\"Global`\"");
    assert_eq!(run(&mut session, "Context[Plus]"), "\"System`\"");
    assert_eq!(run(&mut session, "Context[\"Plus\"]"), "\"System`\"");
  }
}
