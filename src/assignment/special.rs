/*!

Assignments that do something other than add a rule for the lookup name of their left hand side.

A handler gets the left hand side with its elements evaluated and its `Condition`s split off into `test`. Handlers
that store rules put the guard back; the others ignore it.

*/

use fnv::FnvHashMap;
use lazy_static::lazy_static;

use crate::{
  atom::{Atom, SExpression},
  attributes::Attributes,
  built_ins::replace_part,
  definitions::{is_valid_context, strip_context, Category, Definitions},
  interner::{resolve_str, InternedString},
  rules::Rule,
  settings::{MAX_RECURSION_DEPTH, MIN_EVALUATION_LIMIT},
  system_symbols as sys,
};

use super::{with_guard, Assignment, AssignmentError, AssignmentResult, TagList, Tags};

pub(super) type Handler = fn(&mut Assignment, &Atom, Option<&Atom>, &Atom) -> AssignmentResult<bool>;

lazy_static! {
  static ref HANDLERS: FnvHashMap<InternedString, Handler> = {
    let mut handlers: FnvHashMap<InternedString, Handler> = FnvHashMap::default();
    handlers.insert(*sys::DOLLAR_CONTEXT, assign_context as Handler);
    handlers.insert(*sys::DOLLAR_CONTEXT_PATH, assign_context_path as Handler);
    handlers.insert(*sys::DOLLAR_RANDOM_STATE, assign_random_state as Handler);
    handlers.insert(*sys::ATTRIBUTES, assign_attributes as Handler);
    handlers.insert(*sys::DEFAULT, assign_default as Handler);
    handlers.insert(*sys::FORMAT, assign_format as Handler);
    handlers.insert(*sys::LIST, assign_list as Handler);
    handlers.insert(*sys::MESSAGE_NAME, assign_message_name as Handler);
    handlers.insert(*sys::N, assign_n as Handler);
    handlers.insert(*sys::OPTIONS, assign_options as Handler);
    handlers.insert(*sys::PART, assign_part as Handler);
    for name in [
      *sys::OWN_VALUES,
      *sys::DOWN_VALUES,
      *sys::SUB_VALUES,
      *sys::UP_VALUES,
      *sys::N_VALUES,
      *sys::DEFAULT_VALUES,
      *sys::FORMAT_VALUES,
      *sys::MESSAGES,
    ] {
      handlers.insert(name, assign_values as Handler);
    }
    handlers
  };
}

pub(super) fn handler(lookup_name: InternedString) -> Option<Handler> {
  HANDLERS.get(&lookup_name).copied()
}

// region Settings

/// Checks a value for one of the settings kept as own-values, `$RecursionLimit` and the like, and refuses a bad one.
/// Gives whether the assignment may go ahead regardless of protection, which is the case for every setting.
pub(super) fn check_setting(assignment: &mut Assignment, lhs: &Atom, rhs: &Atom) -> AssignmentResult<bool> {
  let name = match lhs.symbol_name() {
    Some(name) => name,
    None       => return Ok(false),
  };
  let is_infinity = rhs.is_symbol(*sys::INFINITY)
      || (rhs.has_form(*sys::DIRECTED_INFINITY, Some(1)) && rhs.elements()[0].to_i64() == Some(1));

  let (accepted, tag) =
    if name == *sys::DOLLAR_RECURSION_LIMIT {
      let accepted = rhs.to_usize()
                        .map_or(false, |n| (MIN_EVALUATION_LIMIT..=*MAX_RECURSION_DEPTH).contains(&n));
      (accepted, "limset")
    } else if name == *sys::DOLLAR_ITERATION_LIMIT {
      (is_infinity || rhs.to_usize().map_or(false, |n| n >= MIN_EVALUATION_LIMIT), "limset")
    } else if name == *sys::DOLLAR_MODULE_NUMBER {
      (rhs.to_i64().map_or(false, |n| n > 0), "set")
    } else if name == *sys::DOLLAR_LINE || name == *sys::DOLLAR_HISTORY_LENGTH {
      (rhs.to_i64().map_or(false, |n| n >= 0), "intnn")
    } else if name == *sys::DOLLAR_MIN_PRECISION {
      match rhs.to_i64() {
        Some(n) if n >= 0 => {
          let max = precision_setting(assignment.evaluation().definitions_mut(), *sys::DOLLAR_MAX_PRECISION);
          (max.map_or(true, |max| n <= max), "preccon")
        }
        _ => (false, "precset"),
      }
    } else if name == *sys::DOLLAR_MAX_PRECISION {
      if is_infinity {
        (true, "precset")
      } else {
        match rhs.to_i64() {
          Some(n) if n > 0 => {
            let min = precision_setting(assignment.evaluation().definitions_mut(), *sys::DOLLAR_MIN_PRECISION);
            (min.map_or(true, |min| n >= min), "preccon")
          }
          _ => (false, "precset"),
        }
      }
    } else {
      return Ok(false);
    };

  if accepted {
    Ok(true)
  } else {
    Err(assignment.reject(name, tag, vec![lhs.clone(), rhs.clone()]))
  }
}

/// The value of `$MinPrecision` or `$MaxPrecision`, or `None` if it is not a number.
fn precision_setting(definitions: &mut Definitions, name: InternedString) -> Option<i64> {
  definitions.get_ownvalue(name).and_then(|value| value.to_i64())
}

// endregion

// region Contexts

/// A context name starting with a backtick is relative to the current context.
fn absolute_context(context: &str, current: &str) -> String {
  match context.strip_prefix('`') {
    Some(relative) => format!("{}{}", current, relative),
    None           => context.to_string(),
  }
}

fn assign_context(assignment: &mut Assignment, lhs: &Atom, _: Option<&Atom>, rhs: &Atom) -> AssignmentResult<bool> {
  if !lhs.is_symbol(*sys::DOLLAR_CONTEXT) {
    return assignment.store_rules_by_tag(lhs, None, rhs);
  }
  let current = assignment.evaluation().definitions().current_context().to_string();
  match rhs.as_str().map(|context| absolute_context(context, &current)) {
    Some(context) if is_valid_context(&context) => {
      assignment.evaluation().definitions_mut().set_current_context(&context);
      Ok(true)
    }
    _ => Err(assignment.reject(*sys::DOLLAR_CONTEXT, "cxset", vec![rhs.clone()])),
  }
}

fn assign_context_path(
  assignment: &mut Assignment,
  lhs       : &Atom,
  _         : Option<&Atom>,
  rhs       : &Atom
) -> AssignmentResult<bool>
{
  if !lhs.is_symbol(*sys::DOLLAR_CONTEXT_PATH) {
    return assignment.store_rules_by_tag(lhs, None, rhs);
  }
  let current = assignment.evaluation().definitions().current_context().to_string();
  let current = current.strip_suffix('`').unwrap_or(&current);

  let path: Option<Vec<String>> =
    if rhs.has_form(*sys::LIST, None) {
      rhs.elements()
         .iter()
         .map(|element| {
           element.as_str()
                  .map(|context| absolute_context(context, current))
                  .filter(|context| is_valid_context(context))
         })
         .collect()
    } else {
      None
    };

  match path {
    Some(path) => {
      assignment.evaluation().definitions_mut().set_context_path(path);
      Ok(true)
    }
    None => Err(assignment.reject(*sys::DOLLAR_CONTEXT_PATH, "cxlist", vec![rhs.clone()])),
  }
}

fn assign_random_state(assignment: &mut Assignment, lhs: &Atom, _: Option<&Atom>, rhs: &Atom) -> AssignmentResult<bool> {
  if !lhs.is_symbol(*sys::DOLLAR_RANDOM_STATE) {
    return assignment.store_rules_by_tag(lhs, None, rhs);
  }
  Err(assignment.reject(*sys::DOLLAR_RANDOM_STATE, "rndst", vec![rhs.clone()]))
}

// endregion

// region Properties of a single symbol

/// The symbol in `head[symbol]`, which an assignment to `head[symbol]` changes.
fn single_symbol(assignment: &mut Assignment, lhs: &Atom) -> AssignmentResult<InternedString> {
  let head = lhs.head_name().unwrap_or_else(|| assignment.operator());
  if lhs.len() != 1 {
    return Err(assignment.reject_arity(head, lhs.len(), 1, 1));
  }
  let element = &lhs.elements()[0];
  let symbol = match element.symbol_name() {
    Some(symbol) => symbol,
    None         => return Err(assignment.reject(head, "sym", vec![element.clone(), Atom::from(1)])),
  };
  match assignment.tags() {
    Tags::Given(tag) if tag != symbol => {
      Err(assignment.reject(assignment.operator(), "tag", vec![Atom::Symbol(head), element.clone()]))
    }
    _ => Ok(symbol),
  }
}

/// `single_symbol` for a symbol that must not be protected.
fn unprotected_symbol(assignment: &mut Assignment, lhs: &Atom) -> AssignmentResult<InternedString> {
  let symbol = single_symbol(assignment, lhs)?;
  if assignment.rejected_because_protected(&Atom::Symbol(symbol), symbol) {
    return Err(AssignmentError::Rejected);
  }
  Ok(symbol)
}

fn assign_attributes(assignment: &mut Assignment, lhs: &Atom, _: Option<&Atom>, rhs: &Atom) -> AssignmentResult<bool> {
  let symbol = single_symbol(assignment, lhs)?;
  if assignment.evaluation().attributes(symbol).locked() {
    return Err(assignment.reject(assignment.operator(), "locked", vec![Atom::Symbol(symbol)]));
  }
  if assignment.rejected_because_protected(&Atom::Symbol(symbol), symbol) {
    return Err(AssignmentError::Rejected);
  }

  let names: &[Atom] =
    if rhs.has_form(*sys::LIST, None) {
      rhs.elements()
    } else {
      std::slice::from_ref(rhs)
    };
  let mut attributes = Attributes::new();
  for name in names {
    match name.symbol_str().and_then(|name| Attributes::attribute_from_name(strip_context(name))) {
      Some(attribute) => attributes.set(attribute),
      None => {
        assignment.message(*sys::SET_ATTRIBUTES, "unknownattr", vec![name.clone()]);
      }
    }
  }
  assignment.evaluation().definitions_mut().set_attributes(symbol, attributes);
  Ok(true)
}

/// `OwnValues[f] = {…}` and the rest of the family replace the whole list of rules.
fn assign_values(assignment: &mut Assignment, lhs: &Atom, _: Option<&Atom>, rhs: &Atom) -> AssignmentResult<bool> {
  let symbol = unprotected_symbol(assignment, lhs)?;
  let category = match lhs.head_name().and_then(Category::from_symbol) {
    Some(category) => category,
    None           => return Ok(false),
  };

  let given: &[Atom] =
    if rhs.has_form(*sys::LIST, None) {
      rhs.elements()
    } else {
      std::slice::from_ref(rhs)
    };
  let mut rules: Vec<Rule> = Vec::with_capacity(given.len());
  for rule in given {
    let is_rule = rule.has_form(*sys::RULE, Some(2)) || rule.has_form(*sys::RULE_DELAYED, Some(2));
    let converted =
      if is_rule {
        Rule::template(rule.elements()[0].clone(), rule.elements()[1].clone()).ok()
      } else {
        None
      };
    match converted {
      Some(converted) => rules.push(converted),
      None => {
        return Err(assignment.reject(assignment.operator(), "vrule", vec![lhs.clone(), rule.clone()]));
      }
    }
  }

  Ok(assignment.evaluation().definitions_mut().set_values(symbol, category, rules).is_ok())
}

fn assign_options(assignment: &mut Assignment, lhs: &Atom, _: Option<&Atom>, rhs: &Atom) -> AssignmentResult<bool> {
  let symbol = unprotected_symbol(assignment, lhs)?;

  let given: &[Atom] =
    if rhs.has_form(*sys::LIST, None) {
      rhs.elements()
    } else {
      std::slice::from_ref(rhs)
    };
  let mut options: Vec<(InternedString, Atom)> = Vec::with_capacity(given.len());
  for option in given {
    let is_rule = option.has_form(*sys::RULE, Some(2)) || option.has_form(*sys::RULE_DELAYED, Some(2));
    let name =
      if is_rule {
        let name = &option.elements()[0];
        match name.as_str() {
          Some(text) => Some(assignment.evaluation().definitions_mut().lookup_name(text)),
          None       => name.symbol_name(),
        }
      } else {
        None
      };
    match name {
      Some(name) => options.push((name, option.elements()[1].clone())),
      None => {
        return Err(assignment.reject(assignment.operator(), "options", vec![option.clone(), lhs.clone()]));
      }
    }
  }

  assignment.evaluation()
            .definitions_mut()
            .modify_user_definition(symbol, |definition| definition.options = options);
  Ok(true)
}

// endregion

// region Rules stored elsewhere than under their lookup name

/// Stores `rule` with `store` for each tag that is not protected.
fn store_for_each<F>(assignment: &mut Assignment, lhs: &Atom, tags: TagList, rule: Rule, mut store: F) -> bool
  where F: FnMut(&mut Definitions, InternedString, Rule) -> bool
{
  let mut stored = false;
  for tag in tags {
    if assignment.rejected_because_protected(lhs, tag) {
      continue;
    }
    stored |= store(assignment.evaluation().definitions_mut(), tag, rule.clone());
  }
  stored
}

fn assign_default(assignment: &mut Assignment, lhs: &Atom, test: Option<&Atom>, rhs: &Atom) -> AssignmentResult<bool> {
  let count = lhs.len();
  if !(1..=3).contains(&count) {
    return Err(assignment.reject_arity(*sys::DEFAULT, count, 1, 3));
  }
  let tags = assignment.focus_tags(&lhs.elements()[0])?;
  let rule = assignment.make_rule(with_guard(lhs.clone(), test.cloned()), rhs.clone())?;
  Ok(store_for_each(assignment, lhs, tags, rule, |definitions, tag, rule| {
    definitions.add_default(tag, rule).is_ok()
  }))
}

/// `Format[f[x_]] := …` for every form, `Format[f[x_], form] := …` for one. The rule is stored with `f[x_]` as its
/// pattern.
fn assign_format(assignment: &mut Assignment, lhs: &Atom, test: Option<&Atom>, rhs: &Atom) -> AssignmentResult<bool> {
  let count = lhs.len();
  if !(1..=2).contains(&count) {
    return Err(assignment.reject_arity(*sys::FORMAT, count, 1, 2));
  }

  let form: Option<&'static str> =
    match lhs.elements().get(1) {
      None => None,
      Some(form) => {
        let forms = [*sys::INPUT_FORM, *sys::FULL_FORM, *sys::OUTPUT_FORM, *sys::STANDARD_FORM];
        match form.symbol_name() {
          Some(name) if forms.contains(&name) => Some(resolve_str(name)),
          _ => return Err(assignment.reject(*sys::FORMAT, "fttp", vec![form.clone()])),
        }
      }
    };

  let focus = &lhs.elements()[0];
  let tags = assignment.focus_tags(focus)?;
  let rule = assignment.make_rule(with_guard(focus.clone(), test.cloned()), rhs.clone())?;
  let forms: Vec<&str> = form.into_iter().collect();
  Ok(store_for_each(assignment, focus, tags, rule, |definitions, tag, rule| {
    definitions.add_format(tag, rule, &forms).is_ok()
  }))
}

/// `f::tag = "text"` defines a message. Messages can be given to protected symbols.
fn assign_message_name(
  assignment: &mut Assignment,
  lhs       : &Atom,
  test      : Option<&Atom>,
  rhs       : &Atom
) -> AssignmentResult<bool>
{
  if lhs.len() != 2 {
    return Err(assignment.reject_arity(*sys::MESSAGE_NAME, lhs.len(), 2, 2));
  }
  let tags = assignment.focus_tags(&lhs.elements()[0])?;
  let rule = assignment.make_rule(with_guard(lhs.clone(), test.cloned()), rhs.clone())?;
  for tag in tags {
    assignment.evaluation().definitions_mut().add_message(tag, rule.clone());
  }
  Ok(true)
}

/// `N[c] = 2.5` and `N[c, p] = …`. An assignment to `N` itself is an ordinary one.
fn assign_n(assignment: &mut Assignment, lhs: &Atom, test: Option<&Atom>, rhs: &Atom) -> AssignmentResult<bool> {
  if lhs.is_atom() {
    return assignment.store_rules_by_tag(lhs, test.cloned(), rhs);
  }
  let count = lhs.len();
  if !(1..=2).contains(&count) {
    return Err(assignment.reject_arity(*sys::N, count, 1, 2));
  }

  let focus = &lhs.elements()[0];
  let precision = lhs.elements()
                     .get(1)
                     .cloned()
                     .unwrap_or_else(|| Atom::Symbol(*sys::MACHINE_PRECISION));
  let lhs = SExpression::with_head(*sys::N, vec![focus.clone(), precision]);
  let tags = assignment.focus_tags(focus)?;
  let rule = assignment.make_rule(with_guard(lhs.clone(), test.cloned()), rhs.clone())?;
  Ok(store_for_each(assignment, &lhs, tags, rule, |definitions, tag, rule| {
    definitions.add_nvalue(tag, rule).is_ok()
  }))
}

// endregion

// region Structural assignments

/// `{a, b} = {1, 2}` assigns element by element.
fn assign_list(assignment: &mut Assignment, lhs: &Atom, _: Option<&Atom>, rhs: &Atom) -> AssignmentResult<bool> {
  if !lhs.has_form(*sys::LIST, None) {
    return Ok(false);
  }
  if !rhs.has_form(*sys::LIST, Some(lhs.len())) {
    assignment.message(assignment.operator(), "shape", vec![lhs.clone(), rhs.clone()]);
    return Ok(false);
  }

  let mut stored = false;
  for (left, right) in lhs.elements().iter().zip(rhs.elements()) {
    stored |= assignment.assign_nested(left, right)?;
  }
  Ok(stored)
}

/// `v[[i, j]] = x` replaces a part of the own-value of `v`.
fn assign_part(assignment: &mut Assignment, lhs: &Atom, _: Option<&Atom>, rhs: &Atom) -> AssignmentResult<bool> {
  let (target, indices) = match lhs.elements().split_first() {
    Some(split) => split,
    None        => return Err(assignment.reject(assignment.operator(), "setp", vec![lhs.clone()])),
  };
  let symbol = match target.symbol_name() {
    Some(symbol) => symbol,
    None         => return Err(assignment.reject(assignment.operator(), "setps", vec![target.clone()])),
  };
  if assignment.rejected_because_protected(target, symbol) {
    return Err(AssignmentError::Rejected);
  }
  let value = match assignment.evaluation().definitions_mut().get_ownvalue(symbol) {
    Some(value) => value,
    None        => return Err(assignment.reject(assignment.operator(), "noval", vec![target.clone()])),
  };

  let mut positions: Vec<Atom> = Vec::with_capacity(indices.len());
  for index in indices {
    positions.push(assignment.evaluation().evaluate(index)?);
  }

  match replace_part(&value, &positions, rhs) {
    Ok(new_value) => {
      assignment.evaluation().definitions_mut().set_ownvalue(symbol, new_value);
      Ok(true)
    }
    Err(error) => Err(assignment.reject(*sys::PART, "partw", vec![error.index, error.target])),
  }
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;
  use crate::evaluation::Session;

  fn run(session: &mut Session, text: &str) -> String {
    session.evaluate_str(text).unwrap().result.to_string()
  }

  fn messages(session: &mut Session, text: &str) -> Vec<String> {
    session.evaluate_str(text).unwrap().message_names()
  }

  #[test]
  fn relative_contexts() {
    assert_eq!(absolute_context("`Private`", "A`"), "A`Private`");
    assert_eq!(absolute_context("B`", "A`"), "B`");
  }

  #[test]
  fn every_values_symbol_has_a_handler() {
    for name in [*sys::DOWN_VALUES, *sys::MESSAGES, *sys::PART, *sys::N] {
      assert!(handler(name).is_some());
    }
    assert!(handler(*sys::PLUS).is_none());
  }

  #[test]
  fn evaluation_limits_are_checked() {
    let mut session = Session::new();
    assert_eq!(messages(&mut session, "$RecursionLimit = 10"), vec!["$RecursionLimit::limset".to_string()]);
    assert_eq!(run(&mut session, "$RecursionLimit"), "200");
    run(&mut session, "$RecursionLimit = 50");
    assert_eq!(run(&mut session, "$RecursionLimit"), "50");

    assert_eq!(messages(&mut session, "$IterationLimit = 5"), vec!["$IterationLimit::limset".to_string()]);
    assert!(messages(&mut session, "$IterationLimit = Infinity").is_empty());
    assert_eq!(run(&mut session, "$IterationLimit"), "Infinity");
  }

  #[test]
  fn other_settings_are_checked() {
    let mut session = Session::new();
    assert_eq!(messages(&mut session, "$ModuleNumber = 0"), vec!["$ModuleNumber::set".to_string()]);
    assert_eq!(messages(&mut session, "$Line = -1"), vec!["$Line::intnn".to_string()]);
    assert_eq!(messages(&mut session, "$RandomState = 1"), vec!["$RandomState::rndst".to_string()]);
    run(&mut session, "$MaxPrecision = 10");
    assert_eq!(messages(&mut session, "$MinPrecision = 20"), vec!["$MinPrecision::preccon".to_string()]);
    assert!(messages(&mut session, "$MinPrecision = 5").is_empty());
    assert_eq!(run(&mut session, "$MinPrecision"), "5");
  }

  #[test]
  fn context_assignment() {
    let mut session = Session::new();
    assert_eq!(messages(&mut session, "$Context = 3"), vec!["$Context::cxset".to_string()]);
    run(&mut session, "$Context = \"A`\"");
    assert_eq!(session.definitions().current_context(), "A`");
    assert_eq!(run(&mut session, "$Context"), "\"A`\"");

    run(&mut session, "$ContextPath = {\"System`\", \"Global`\"}");
    assert_eq!(session.definitions().context_path(), &["System`".to_string(), "Global`".to_string()]);
    assert_eq!(messages(&mut session, "$ContextPath = {1}"), vec!["$ContextPath::cxlist".to_string()]);
  }

  #[test]
  fn attributes_can_be_assigned() {
    let mut session = Session::new();
    run(&mut session, "Attributes[f] = {Orderless, Flat}");
    assert_eq!(run(&mut session, "Attributes[f]"), "{Flat, Orderless}");
    assert_eq!(run(&mut session, "f[b, f[c, a]]"), "f[a, b, c]");

    assert_eq!(messages(&mut session, "Attributes[g] = {Bogus}"), vec!["SetAttributes::unknownattr".to_string()]);
    assert_eq!(messages(&mut session, "Attributes[Plus] = {}"), vec!["Set::wrsym".to_string()]);
    assert_eq!(messages(&mut session, "Attributes[1] = {}"), vec!["Attributes::sym".to_string()]);
  }

  #[test]
  fn value_lists_can_be_assigned() {
    let mut session = Session::new();
    run(&mut session, "DownValues[f] = {HoldPattern[f[1]] :> one, f[2] -> two}");
    assert_eq!(run(&mut session, "{f[1], f[2], f[3]}"), "{one, two, f[3]}");
    assert_eq!(messages(&mut session, "DownValues[f] = 3"), vec!["Set::vrule".to_string()]);
    run(&mut session, "OwnValues[x] = {HoldPattern[x] :> 7}");
    assert_eq!(run(&mut session, "x"), "7");
  }

  #[test]
  fn defaults_fill_optional_arguments() {
    let mut session = Session::new();
    run(&mut session, "Default[f] = 0");
    run(&mut session, "f[x_, y_.] := {x, y}");
    assert_eq!(run(&mut session, "f[1]"), "{1, 0}");
    assert_eq!(run(&mut session, "f[1, 2]"), "{1, 2}");
    assert_eq!(messages(&mut session, "Default[] = 0"), vec!["Default::argb".to_string()]);
  }

  #[test]
  fn numeric_values() {
    let mut session = Session::new();
    run(&mut session, "N[c] = 2.5");
    assert_eq!(run(&mut session, "N[c]"), "2.5");
    assert_eq!(run(&mut session, "c"), "c");
    assert_eq!(run(&mut session, "NValues[c]"), "{HoldPattern[N[c, MachinePrecision]] :> 2.5}");
  }

  #[test]
  fn formats_and_messages() {
    let mut session = Session::new();
    run(&mut session, "Format[f[x_]] := \"f\"");
    assert_eq!(run(&mut session, "FormatValues[f]"), "{HoldPattern[f[x_]] :> \"f\"}");
    assert_eq!(messages(&mut session, "Format[f[x_], 3] := 1"), vec!["Format::fttp".to_string()]);

    run(&mut session, "Protect[h]");
    let result = session.evaluate_str("h::oops = \"Oops: `1`.\"").unwrap();
    assert!(result.output.is_empty());
    let result = session.evaluate_str("Message[h::oops, 3]").unwrap();
    assert_eq!(result.output[0].to_string(), "h::oops: Oops: 3.");
  }

  #[test]
  fn options_can_be_assigned() {
    let mut session = Session::new();
    run(&mut session, "Options[f] = {a -> 1, \"b\" :> 2}");
    assert_eq!(run(&mut session, "Options[f]"), "{a -> 1, b -> 2}");
    assert_eq!(messages(&mut session, "Options[f] = {3}"), vec!["Set::options".to_string()]);
  }

  #[test]
  fn parts_can_be_assigned() {
    let mut session = Session::new();
    run(&mut session, "v = {1, {2, 3}, 4}");
    assert_eq!(run(&mut session, "v[[2, 1]] = 20"), "20");
    assert_eq!(run(&mut session, "v"), "{1, {20, 3}, 4}");
    run(&mut session, "v[[-1]] = last");
    assert_eq!(run(&mut session, "v"), "{1, {20, 3}, last}");

    assert_eq!(messages(&mut session, "v[[5]] = 0"), vec!["Part::partw".to_string()]);
    assert_eq!(messages(&mut session, "w[[1]] = 0"), vec!["Set::noval".to_string()]);
  }
}
