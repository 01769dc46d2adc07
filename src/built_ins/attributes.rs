/*!

Reading and changing the attributes of symbols.

*/

use crate::{
  atom::{Atom, SExpression},
  attributes::{Attribute, Attributes as AttributeSet},
  definitions::{strip_context, Definitions},
  evaluation::Evaluation,
  interner::{interned, resolve_str, InternedString},
  interrupt::ControlSignal,
  rules::Arguments,
  system_symbols as sys,
};

type BuiltinResult = Result<Option<Atom>, ControlSignal>;

callbacks![Attributes, SetAttributes, ClearAttributes, Protect, Unprotect];

pub(super) fn register_builtins(definitions: &mut Definitions) {
  register_builtin!(definitions, Attributes, "Attributes[symbols_]");
  register_builtin!(definitions, SetAttributes, "SetAttributes[symbols_, attributes_]");
  register_builtin!(definitions, ClearAttributes, "ClearAttributes[symbols_, attributes_]");
  register_builtin!(definitions, Protect, "Protect[symbols___]");
  register_builtin!(definitions, Unprotect, "Unprotect[symbols___]");
}

/// The symbols named by `atom`: a symbol, a string naming one, or a list of these. Reports `operator::sym` and
/// gives `None` for anything else.
fn symbols_of(evaluation: &mut Evaluation, operator: InternedString, atom: &Atom) -> Option<Vec<InternedString>> {
  let elements: Vec<Atom> =
    if atom.has_form(*sys::LIST, None) {
      atom.elements().to_vec()
    } else {
      vec![atom.clone()]
    };

  let mut symbols = Vec::with_capacity(elements.len());
  for (position, element) in elements.iter().enumerate() {
    if let Some(symbol) = element.symbol_name() {
      symbols.push(symbol);
    } else if let Some(name) = element.as_str() {
      symbols.push(evaluation.definitions_mut().lookup_name(name));
    } else {
      evaluation.message(operator, "sym", vec![element.clone(), Atom::from(position as i64 + 1)]);
      return None;
    }
  }
  Some(symbols)
}

/// The attributes named by `atom`, a symbol or a list of symbols. Unknown names are reported and left out.
fn attributes_of(evaluation: &mut Evaluation, operator: InternedString, atom: &Atom) -> AttributeSet {
  let names: &[Atom] =
    if atom.has_form(*sys::LIST, None) {
      atom.elements()
    } else {
      std::slice::from_ref(atom)
    };

  let mut attributes = AttributeSet::new();
  for name in names {
    match name.symbol_str().and_then(|name| AttributeSet::attribute_from_name(strip_context(name))) {
      Some(attribute) => attributes.set(attribute),
      None            => evaluation.message(operator, "unknownattr", vec![name.clone()]),
    }
  }
  attributes
}

fn attribute_list(attributes: AttributeSet) -> Atom {
  let names = attributes.iter()
                        .map(|attribute| {
                          let name: &'static str = attribute.into();
                          Atom::Symbol(interned(format!("System`{}", name).as_str()))
                        })
                        .collect();
  SExpression::list(names)
}

/// Implements calls matching
///     `Attributes[symbols_]`
pub(crate) fn Attributes(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  let symbols = match arguments.get("symbols") {
    Some(symbols) => symbols,
    None          => return Ok(None),
  };
  let names = match symbols_of(evaluation, *sys::ATTRIBUTES, symbols) {
    Some(names) => names,
    None        => return Ok(None),
  };

  let lists: Vec<Atom> = names.iter().map(|name| attribute_list(evaluation.attributes(*name))).collect();
  if symbols.has_form(*sys::LIST, None) {
    Ok(Some(SExpression::list(lists)))
  } else {
    Ok(lists.into_iter().next())
  }
}

/// Applies `change` to the attributes of each of `symbols`, unless the symbol is `Locked`.
fn change_attributes(
  evaluation: &mut Evaluation,
  operator  : InternedString,
  arguments : &Arguments,
  change    : fn(&mut AttributeSet, AttributeSet),
) -> BuiltinResult
{
  let (symbols, attributes) = match (arguments.get("symbols"), arguments.get("attributes")) {
    (Some(symbols), Some(attributes)) => (symbols, attributes),
    _                                 => return Ok(None),
  };
  let symbols = match symbols_of(evaluation, operator, symbols) {
    Some(symbols) => symbols,
    None          => return Ok(None),
  };
  let attributes = attributes_of(evaluation, operator, attributes);

  for symbol in symbols {
    let mut current = evaluation.attributes(symbol);
    if current.locked() {
      evaluation.message(operator, "locked", vec![Atom::Symbol(symbol)]);
      continue;
    }
    change(&mut current, attributes);
    evaluation.definitions_mut().set_attributes(symbol, current);
  }
  Ok(Some(Atom::Symbol(*sys::NULL)))
}

/// Implements calls matching
///     `SetAttributes[symbols_, attributes_]`
pub(crate) fn SetAttributes(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  change_attributes(evaluation, *sys::SET_ATTRIBUTES, arguments, AttributeSet::update)
}

/// Implements calls matching
///     `ClearAttributes[symbols_, attributes_]`
pub(crate) fn ClearAttributes(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  change_attributes(evaluation, *sys::CLEAR_ATTRIBUTES, arguments, AttributeSet::remove)
}

/// Sets or resets `Protected` on each symbol named in `symbols`. The names may be strings with `*` wildcards. Gives
/// the names of the symbols whose protection changed.
fn set_protection(evaluation: &mut Evaluation, operator: InternedString, symbols: &[Atom], protect: bool) -> Atom {
  let mut names: Vec<InternedString> = Vec::new();
  for symbol in symbols {
    if let Some(name) = symbol.symbol_name() {
      names.push(name);
    } else if let Some(pattern) = symbol.as_str() {
      let matching = evaluation.definitions().get_matching_names(pattern);
      names.extend(matching.iter().map(|name| interned(name)));
    } else {
      evaluation.message(operator, "ssym", vec![symbol.clone()]);
    }
  }

  let mut changed = Vec::new();
  for name in names {
    let mut attributes = evaluation.attributes(name);
    if attributes.protected() == protect {
      continue;
    }
    if attributes.locked() {
      evaluation.message(operator, "locked", vec![Atom::Symbol(name)]);
      continue;
    }
    if protect {
      attributes.set(Attribute::Protected);
    } else {
      attributes.reset(Attribute::Protected);
    }
    evaluation.definitions_mut().set_attributes(name, attributes);
    let short_name = evaluation.definitions().shorten_name(resolve_str(name));
    changed.push(Atom::string(&short_name));
  }
  SExpression::list(changed)
}

/// Implements calls matching
///     `Protect[symbols___]`
pub(crate) fn Protect(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  Ok(Some(set_protection(evaluation, *sys::PROTECT, &arguments.sequence("symbols"), true)))
}

/// Implements calls matching
///     `Unprotect[symbols___]`
pub(crate) fn Unprotect(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  Ok(Some(set_protection(evaluation, *sys::UNPROTECT, &arguments.sequence("symbols"), false)))
}


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
  fn reading_attributes() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "Attributes[Plus]"), "{Flat, Listable, NumericFunction, OneIdentity, Orderless, Protected}");
    assert_eq!(run(&mut session, "Attributes[\"Set\"]"), "{HoldFirst, Protected, SequenceHold}");
    assert_eq!(run(&mut session, "Attributes[{f, List}]"), "{{}, {Locked, Protected}}");
    assert_eq!(messages(&mut session, "Attributes[1]"), vec!["Attributes::sym".to_string()]);
  }

  #[test]
  fn setting_and_clearing() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "SetAttributes[f, {Orderless, Listable}]"), "Null");
    assert_eq!(run(&mut session, "f[b, a]"), "f[a, b]");
    run(&mut session, "ClearAttributes[f, Orderless]");
    assert_eq!(run(&mut session, "Attributes[f]"), "{Listable}");
    assert_eq!(messages(&mut session, "SetAttributes[f, Bogus]"), vec!["SetAttributes::unknownattr".to_string()]);
    assert_eq!(messages(&mut session, "SetAttributes[List, Flat]"), vec!["SetAttributes::locked".to_string()]);
  }

  #[test]
  fn protection() {
    let mut session = Session::new();
    run(&mut session, "f[1] = 1");
    assert_eq!(run(&mut session, "Protect[f]"), "{\"f\"}");
    assert_eq!(run(&mut session, "Protect[f]"), "{}");

    let result = session.evaluate_str("f[2] = 2").unwrap();
    assert_eq!(result.message_names(), vec!["Set::write".to_string()]);
    assert_eq!(run(&mut session, "DownValues[f]"), "{HoldPattern[f[1]] :> 1}");

    assert_eq!(run(&mut session, "Unprotect[f]"), "{\"f\"}");
    run(&mut session, "f[2] = 2");
    assert_eq!(run(&mut session, "f[2]"), "2");
  }
}
