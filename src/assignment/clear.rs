/*!

Removing definitions: `lhs =.` removes the one rule stored for `lhs`, `Clear` removes all rules of a symbol, and
`ClearAll` also its attributes, messages, defaults and options.

*/

use crate::{
  atom::Atom,
  attributes::Attributes,
  definitions::Category,
  evaluation::Evaluation,
  interner::{interned, InternedString},
  interrupt::ControlSignal,
  system_symbols as sys,
};

use super::unroll_patterns;

/// `Unset[lhs]`. Gives `Null`, or `$Failed` if nothing was removed.
pub(crate) fn unset(evaluation: &mut Evaluation, lhs: &Atom) -> Result<Atom, ControlSignal> {
  let null = Atom::Symbol(*sys::NULL);
  let failed = Atom::Symbol(*sys::FAILED);

  if let Some(category) = lhs.head_name().and_then(values_category) {
    if lhs.len() != 1 {
      evaluation.message(*sys::UNSET, "argx", vec![lhs.head(), Atom::from(lhs.len() as i64)]);
      return Ok(failed);
    }
    let symbol = match lhs.elements()[0].symbol_name() {
      Some(symbol) => symbol,
      None => {
        evaluation.message(*sys::UNSET, "fnsym", vec![lhs.clone()]);
        return Ok(failed);
      }
    };
    let definitions = evaluation.definitions_mut();
    match category {
      ValuesCategory::Rules(category) => {
        if definitions.set_values(symbol, category, vec![]).is_err() {
          evaluation.message(*sys::UNSET, "wrsym", vec![Atom::Symbol(symbol)]);
          return Ok(failed);
        }
      }
      ValuesCategory::Options => {
        definitions.modify_user_definition(symbol, |definition| definition.options.clear());
      }
    }
    return Ok(null);
  }

  let (lhs, _) = unroll_patterns(lhs.clone(), &null);
  let name = match lhs.lookup_name() {
    Some(name) => name,
    None => {
      evaluation.message(*sys::UNSET, "usraw", vec![lhs.clone()]);
      return Ok(failed);
    }
  };

  let lhs = match lhs.as_expression() {
    Some(expression) => {
      let attributes = match expression.head().symbol_name() {
        Some(head) => evaluation.attributes(head),
        None       => Attributes::default(),
      };
      let elements = crate::evaluate::evaluate_elements(evaluation, attributes, expression.elements())?;
      lhs.with_elements(elements)
    }
    None => lhs,
  };

  match evaluation.definitions_mut().remove_rule(name, &lhs) {
    Ok(true) => Ok(null),
    Ok(false) if lhs.is_atom() => Ok(null),
    Ok(false) => {
      evaluation.message(*sys::UNSET, "norep", vec![lhs.clone(), Atom::Symbol(name)]);
      Ok(failed)
    }
    Err(_) => {
      if lhs.is_symbol(name) {
        evaluation.message(*sys::UNSET, "wrsym", vec![Atom::Symbol(name)]);
      } else {
        evaluation.message(*sys::UNSET, "write", vec![Atom::Symbol(name), lhs.clone()]);
      }
      Ok(failed)
    }
  }
}

enum ValuesCategory {
  Rules(Category),
  Options,
}

fn values_category(head: InternedString) -> Option<ValuesCategory> {
  if head == *sys::OPTIONS {
    return Some(ValuesCategory::Options);
  }
  Category::from_symbol(head).map(ValuesCategory::Rules)
}

/// `Clear[…]` or, with `all`, `ClearAll[…]`. The arguments are symbols or strings naming symbols, which may contain
/// the `Names` wildcards.
pub(crate) fn clear(evaluation: &mut Evaluation, arguments: &[Atom], all: bool) -> Atom {
  let operator = if all { *sys::CLEAR_ALL } else { *sys::CLEAR };

  for argument in arguments {
    let names: Vec<InternedString> =
      if let Some(symbol) = argument.symbol_name() {
        if symbol == *sys::DOLLAR_CONTEXT || symbol == *sys::DOLLAR_CONTEXT_PATH {
          evaluation.message(operator, "spsym", vec![argument.clone()]);
          continue;
        }
        vec![symbol]
      } else if let Some(pattern) = argument.as_str() {
        let definitions = evaluation.definitions_mut();
        let pattern =
          match pattern.strip_prefix('`') {
            Some(relative) => format!("{}{}", definitions.current_context(), relative),
            None           => pattern.to_string(),
          };
        definitions.get_matching_names(&pattern).iter().map(|name| interned(name)).collect()
      } else {
        evaluation.message(operator, "ssym", vec![argument.clone()]);
        continue;
      };

    for name in names {
      let attributes = evaluation.attributes(name);
      if attributes.protected() {
        evaluation.message(operator, "wrsym", vec![Atom::Symbol(name)]);
        continue;
      }
      if all && attributes.locked() {
        evaluation.message(operator, "locked", vec![Atom::Symbol(name)]);
        continue;
      }

      evaluation.definitions_mut().modify_user_definition(name, |definition| {
        definition.clear_values();
        if all {
          definition.attributes = Attributes::default();
          definition.messages.clear();
          definition.defaultvalues.clear();
          definition.options.clear();
        }
      });
    }
  }

  Atom::Symbol(*sys::NULL)
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
  fn unset_removes_one_rule() {
    let mut session = Session::new();
    run(&mut session, "f[1] = one");
    run(&mut session, "f[x_] := x");
    assert_eq!(run(&mut session, "f[1] =."), "Null");
    assert_eq!(run(&mut session, "f[1]"), "1");
    assert_eq!(run(&mut session, "DownValues[f]"), "{HoldPattern[f[x_]] :> x}");

    let result = session.evaluate_str("f[2] =.").unwrap();
    assert_eq!(result.result.to_string(), "$Failed");
    assert_eq!(result.message_names(), vec!["Unset::norep".to_string()]);

    run(&mut session, "a = 1");
    assert_eq!(run(&mut session, "a =."), "Null");
    assert_eq!(run(&mut session, "a"), "a");
    assert!(messages(&mut session, "a =.").is_empty());
  }

  #[test]
  fn unset_a_values_list() {
    let mut session = Session::new();
    run(&mut session, "g[1] = 2");
    run(&mut session, "Options[g] = {o -> 1}");
    assert_eq!(run(&mut session, "DownValues[g] =."), "Null");
    assert_eq!(run(&mut session, "Options[g] =."), "Null");
    assert_eq!(run(&mut session, "{DownValues[g], Options[g]}"), "{{}, {}}");
    assert_eq!(messages(&mut session, "DownValues[1] =."), vec!["Unset::fnsym".to_string()]);
  }

  #[test]
  fn unset_respects_protection() {
    let mut session = Session::new();
    assert_eq!(messages(&mut session, "Plus[x_, y_] =."), vec!["Unset::write".to_string()]);
    assert_eq!(messages(&mut session, "1 =."), vec!["Unset::usraw".to_string()]);
  }

  #[test]
  fn clear_and_clear_all() {
    let mut session = Session::new();
    run(&mut session, "x = 1");
    run(&mut session, "y = 2");
    run(&mut session, "SetAttributes[y, Listable]");
    assert_eq!(run(&mut session, "Clear[x, y]"), "Null");
    assert_eq!(run(&mut session, "{x, y}"), "{x, y}");
    assert_eq!(run(&mut session, "Attributes[y]"), "{Listable}");
    run(&mut session, "ClearAll[y]");
    assert_eq!(run(&mut session, "Attributes[y]"), "{}");
  }

  #[test]
  fn clear_by_name_pattern() {
    let mut session = Session::new();
    run(&mut session, "var1 = 1");
    run(&mut session, "var2 = 2");
    run(&mut session, "other = 3");
    run(&mut session, "Clear[\"var*\"]");
    assert_eq!(run(&mut session, "{var1, var2, other}"), "{var1, var2, 3}");
  }

  #[test]
  fn clear_refuses_some_symbols() {
    let mut session = Session::new();
    assert_eq!(messages(&mut session, "Clear[Plus]"), vec!["Clear::wrsym".to_string()]);
    assert_eq!(messages(&mut session, "Clear[$Context]"), vec!["Clear::spsym".to_string()]);
    assert_eq!(messages(&mut session, "Clear[1]"), vec!["Clear::ssym".to_string()]);
  }
}
