/*!

Output and the message table.

`Print` and `Message` add to the output of the evaluation. The texts of the messages the core issues are installed
here as ordinary message rules, most of them on `General`, so that a user can override any of them with
`f::tag = "text"`.

*/

use crate::{
  atom::{Atom, SExpression},
  definitions::{Category, Definitions},
  evaluation::Evaluation,
  format::{DisplayForm, Formattable},
  interner::InternedString,
  interrupt::ControlSignal,
  logging::{log, Channel},
  rules::{Arguments, Rule},
  system_symbols as sys,
};

type BuiltinResult = Result<Option<Atom>, ControlSignal>;

callbacks![Print, Message, MessageName];

pub(super) fn register_builtins(definitions: &mut Definitions) {
  register_builtin!(definitions, Print, "Print[expressions___]");
  register_builtin!(definitions, Message, "Message[name_MessageName, arguments___]");
  register_builtin!(definitions, MessageName, "MessageName[symbol_, tag_]");
}

/// Implements calls matching
///     `Print[expressions___]`
pub(crate) fn Print(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let text: String = arguments.sequence("expressions")
                              .iter()
                              .map(|expression| expression.format(&DisplayForm::Output.into()))
                              .collect();
  evaluation.print(text);
  Ok(Some(Atom::Symbol(*sys::NULL)))
}

/// Implements calls matching
///     `Message[name_MessageName, arguments___]`
pub(crate) fn Message(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let name = match arguments.get("name") {
    Some(name) if name.len() == 2 => name,
    _                             => return Ok(None),
  };
  let (symbol, tag) = match (name.elements()[0].symbol_name(), name.elements()[1].as_str()) {
    (Some(symbol), Some(tag)) => (symbol, tag.to_string()),
    _                         => return Ok(None),
  };
  evaluation.message(symbol, &tag, arguments.sequence("arguments"));
  Ok(Some(Atom::Symbol(*sys::NULL)))
}

/// Implements calls matching
///     `MessageName[symbol_, tag_]`
/// The text of the message, from the symbol or else from `General`.
pub(crate) fn MessageName(arguments: &Arguments, original: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let (symbol, tag) = match (arguments.get("symbol"), arguments.get("tag")) {
    (Some(symbol), Some(tag)) => (symbol, tag),
    _                         => return Ok(None),
  };
  let (symbol, tag) = match (symbol.symbol_name(), tag.as_str()) {
    (Some(symbol), Some(tag)) => (symbol, tag.to_string()),
    _                         => return Ok(None),
  };

  if let Some(text) = evaluation.get_value(symbol, Category::Message, original)? {
    return Ok(Some(text));
  }
  let general = SExpression::message_name(*sys::GENERAL, &tag);
  evaluation.get_value(*sys::GENERAL, Category::Message, &general)
}

// region Message table

/// Messages of `General`, used by any symbol that does not have its own.
const GENERAL_MESSAGES: &[(&str, &str)] = &[
  ("argx", "`1` called with `2` arguments; 1 argument is expected."),
  ("argrx", "`1` called with `2` arguments; `3` arguments are expected."),
  ("argb", "`1` called with `2` arguments; between `3` and `4` arguments are expected."),
  ("badpat", "`1` is not a valid pattern."),
  ("cxlist", "`1` is not a list of valid context names."),
  ("cxset", "`1` is not a valid context name."),
  ("fnsym", "First argument in `1` is not a symbol or a string naming a symbol."),
  ("fttp", "Format type `1` is not a symbol."),
  ("locked", "Symbol `1` is locked."),
  ("nosym", "`1` does not contain a symbol to attach a rule to."),
  ("noval", "Symbol `1` in part assignment does not have an immediate value."),
  ("normal", "Nonatomic expression expected at position 1 in `1`."),
  ("options", "`1` is not a valid option of `2`."),
  ("optnf", "`1` is not a known option for `2`."),
  ("reps", "`1` is not a valid replacement rule or list of replacement rules."),
  ("setp", "Part assignment to `1` could not be made."),
  ("setps", "`1` in the part assignment is not a symbol."),
  ("setraw", "Cannot assign to raw object `1`."),
  ("shape", "Lists `1` and `2` are not the same shape."),
  ("spsym", "`1` is a special symbol and cannot be cleared."),
  ("ssym", "`1` is not a symbol or a string."),
  ("sym", "Argument `1` at position `2` is expected to be a symbol."),
  ("tag", "Rule for `1` can only be attached to `2`."),
  ("tagnfd", "Tag `1` not found or too deep for an assigned rule."),
  ("timeout", "The evaluation timed out and was aborted."),
  ("unknownattr", "`1` is not a known attribute."),
  ("usraw", "Cannot unset raw object `1`."),
  ("vrule", "Cannot set `1` because `2` is not a valid rule."),
  ("write", "Tag `1` in `2` is Protected."),
  ("wrsym", "Symbol `1` is Protected."),
];

fn symbol_messages() -> Vec<(InternedString, &'static str, &'static str)> {
  vec![
    (*sys::DOLLAR_RECURSION_LIMIT, "reclim", "Recursion depth of `1` exceeded."),
    (*sys::DOLLAR_RECURSION_LIMIT, "limset", "Cannot set `1` to `2`; value must be an integer between 20 and the largest depth the stack allows."),
    (*sys::DOLLAR_ITERATION_LIMIT, "itlim", "Iteration limit of `1` exceeded."),
    (*sys::DOLLAR_ITERATION_LIMIT, "limset", "Cannot set `1` to `2`; value must be an integer of at least 20 or Infinity."),
    (*sys::DOLLAR_MODULE_NUMBER, "set", "Cannot set `1` to `2`; value must be a positive integer."),
    (*sys::DOLLAR_LINE, "intnn", "Cannot set `1` to `2`; value must be a nonnegative integer."),
    (*sys::DOLLAR_HISTORY_LENGTH, "intnn", "Cannot set `1` to `2`; value must be a nonnegative integer."),
    (*sys::DOLLAR_MIN_PRECISION, "precset", "Cannot set `1` to `2`; value must be a nonnegative number."),
    (*sys::DOLLAR_MIN_PRECISION, "preccon", "Cannot set `1` to `2`; value must not exceed $MaxPrecision."),
    (*sys::DOLLAR_MAX_PRECISION, "precset", "Cannot set `1` to `2`; value must be a positive number or Infinity."),
    (*sys::DOLLAR_MAX_PRECISION, "preccon", "Cannot set `1` to `2`; value must not be less than $MinPrecision."),
    (*sys::DOLLAR_RANDOM_STATE, "rndst", "`1` is not a valid random state."),
    (*sys::THROW, "nocatch", "Uncaught `1` returned to top level."),
    (*sys::BREAK, "nofdw", "Break[] called with no enclosing loop."),
    (*sys::CONTINUE, "nofdw", "Continue[] called with no enclosing loop."),
    (*sys::THREAD, "tdlen", "Objects of unequal length in `1` cannot be combined."),
    (*sys::PART, "partw", "Part `1` of `2` does not exist."),
    (*sys::PART, "pkspec1", "The expression `1` cannot be used as a part specification."),
    (*sys::UNSET, "norep", "Assignment on `2` for `1` not found."),
  ]
}

/// Installs the message texts as system rules of the message category.
pub(super) fn register_messages(definitions: &mut Definitions) {
  let general = GENERAL_MESSAGES.iter().map(|(tag, text)| (*sys::GENERAL, *tag, *text));

  for (symbol, tag, text) in general.chain(symbol_messages()) {
    match Rule::template(SExpression::message_name(symbol, tag), Atom::string(text)) {
      Ok(rule) => {
        definitions.builtin_definition(symbol).add_rule(Category::Message, rule.with_system(true));
      }
      Err(error) => {
        log(Channel::Error, 1, format!("Could not install the message {}: {}", tag, error).as_str());
      }
    }
  }
}

// endregion


#[cfg(test)]
mod tests {
  use crate::evaluation::{OutputRecord, Session};

  fn run(session: &mut Session, text: &str) -> String {
    session.evaluate_str(text).unwrap().result.to_string()
  }

  #[test]
  fn printing() {
    let mut session = Session::new();
    let result = session.evaluate_str("Print[\"x = \", 1 + 2]").unwrap();
    assert_eq!(result.result.to_string(), "Null");
    assert_eq!(result.output, vec![OutputRecord::Print("x = 3".to_string())]);
  }

  #[test]
  fn issuing_messages() {
    let mut session = Session::new();
    run(&mut session, "f::oops = \"Bad value `1`.\"");
    let result = session.evaluate_str("Message[f::oops, 1 + 1]").unwrap();
    assert_eq!(result.output[0].to_string(), "f::oops: Bad value 2.");

    let result = session.evaluate_str("Message[f::wrsym, g]").unwrap();
    assert_eq!(result.output[0].to_string(), "f::wrsym: Symbol g is Protected.");
  }

  #[test]
  fn message_texts() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "f::locked"), "\"Symbol `1` is locked.\"");
    assert_eq!(run(&mut session, "Part::partw"), "\"Part `1` of `2` does not exist.\"");
    assert_eq!(run(&mut session, "f::nosuchtag"), "f::nosuchtag");
  }
}
