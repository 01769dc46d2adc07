/*!

# The Evaluation Loop

Evaluating a compound expression repeats a single rewrite step until the step leaves the expression as it is:

 1. Evaluate the head. Its attributes decide which elements are evaluated: `HoldFirst`, `HoldRest`, `HoldAll` and
    `HoldAllComplete` hold, and `Evaluate[…]` is evaluated in a held position unless the hold is complete.
 2. Splice `Sequence[…]` elements, unless the head has `SequenceHold` or `HoldAllComplete`. Strip `Unevaluated`
    wrappers, remembering where they were.
 3. Splice nested expressions with the same head if the head is `Flat`, and sort into canonical order if it is
    `Orderless`.
 4. Thread a `Listable` head over `List` elements.
 5. Try the up-values of each element, then the down-values or, for `f[…][…]`, the sub-values of the lookup name.
    The first rule that applies gives the next expression.

When no rule applies the `Unevaluated` wrappers are put back and the expression is stamped with the store
generation, so that evaluating it again before the store changes returns at once.

A symbol evaluates through its own-values. The value is evaluated in turn, one level deeper.

*/

use smallvec::SmallVec;

use crate::{
  atom::{Atom, SExpression},
  attributes::Attributes,
  definitions::Category,
  evaluation::Evaluation,
  interner::InternedString,
  interrupt::ControlSignal,
  logging::{log, Channel},
  normal_form::NormalFormOrder,
  system_symbols as sys,
};

/// Evaluates `atom` until it is a fixed point of the definitions.
pub(crate) fn evaluate(evaluation: &mut Evaluation, atom: &Atom) -> Result<Atom, ControlSignal> {
  match atom {
    Atom::Symbol(name) => evaluate_symbol(evaluation, *name, atom),

    Atom::Expression(expression) => {
      if expression.is_fully_evaluated(evaluation.definitions().generation()) {
        return Ok(atom.clone());
      }
      evaluation.enter()?;
      let result = evaluate_expression(evaluation, atom);
      evaluation.leave();
      result
    }

    _ => Ok(atom.clone()),
  }
}

fn evaluate_symbol(evaluation: &mut Evaluation, name: InternedString, atom: &Atom) -> Result<Atom, ControlSignal> {
  evaluation.check_stopped()?;
  match evaluation.get_value(name, Category::Own, atom)? {
    // Also when the value is the symbol itself: `x := x` runs into the recursion limit.
    Some(value) => {
      evaluation.enter()?;
      let result = evaluate(evaluation, &value);
      evaluation.leave();
      result
    }
    None => Ok(atom.clone()),
  }
}

fn evaluate_expression(evaluation: &mut Evaluation, atom: &Atom) -> Result<Atom, ControlSignal> {
  let mut expression = atom.clone();
  // The lookup names of every form the expression has taken. A `Return` from the body of a user rule for any of
  // them ends here.
  let mut names: SmallVec<[InternedString; 4]> = SmallVec::new();
  let mut iteration: usize = 1;

  loop {
    if let Some(name) = expression.lookup_name() {
      if !names.contains(&name) {
        names.push(name);
      }
    }

    let (new, changed) =
      match rewrite_step(evaluation, &expression) {
        Ok(step) => step,
        Err(ControlSignal::Return(value))
          if names.iter().any(|name| evaluation.definitions().has_user_definition(*name)) => {
          return Ok(value);
        }
        Err(signal) => return Err(signal),
      };

    if !changed {
      return Ok(new);
    }
    log(Channel::Debug, 4, format!("{} -> {}", expression, new).as_str());

    match &new {
      Atom::Expression(e) if e.is_fully_evaluated(evaluation.definitions().generation()) => return Ok(new),
      Atom::Expression(_) => {}
      _ => return evaluate(evaluation, &new),
    }

    iteration += 1;
    if let Some(limit) = evaluation.iteration_limit() {
      if iteration > limit {
        evaluation.message(*sys::DOLLAR_ITERATION_LIMIT, "itlim", vec![Atom::from(limit as i64)]);
        return Err(ControlSignal::IterationLimit);
      }
    }
    expression = new;
  }
}

/// One pass of the loop. Gives the next form of the expression and whether it differs from `atom`.
fn rewrite_step(evaluation: &mut Evaluation, atom: &Atom) -> Result<(Atom, bool), ControlSignal> {
  let expression = match atom.as_expression() {
    Some(expression) => expression,
    None             => return Ok((atom.clone(), false)),
  };

  let head = evaluate(evaluation, expression.head())?;
  let attributes = match head.symbol_name() {
    Some(name) => evaluation.attributes(name),
    None       => Attributes::default(),
  };

  let mut elements = evaluate_elements(evaluation, attributes, expression.elements())?;
  if !(attributes.sequence_hold() || attributes.hold_all_complete()) {
    elements = splice_sequences(elements);
  }

  // Each element, and whether it was wrapped in `Unevaluated`.
  let mut marked: Vec<(Atom, bool)> =
    elements.into_iter()
            .map(|element| {
              if !attributes.hold_all_complete() && element.has_form(*sys::UNEVALUATED, Some(1)) {
                (element.elements()[0].clone(), true)
              } else {
                (element, false)
              }
            })
            .collect();

  if attributes.flat() {
    marked = flatten(&head, marked);
  }
  if attributes.orderless() {
    marked.sort_by(|a, b| NormalFormOrder::cmp(&a.0, &b.0));
  }

  let wrapped: SmallVec<[bool; 8]> = marked.iter().map(|(_, wrapped)| *wrapped).collect();
  let new = SExpression::new(head.clone(), marked.into_iter().map(|(element, _)| element).collect());
  if let Some(e) = new.as_expression() {
    if attributes.orderless() {
      e.set_ordered();
    }
    if attributes.flat() && !wrapped.contains(&true) {
      e.set_flat();
    }
  }

  if attributes.listable() {
    match thread_over_lists(&new) {
      Threading::NotApplicable => {}
      Threading::Threaded(threaded) => return Ok((threaded, true)),
      Threading::LengthMismatch => {
        evaluation.message(*sys::THREAD, "tdlen", vec![new.clone()]);
        stamp(evaluation, &new);
        return Ok((new, false));
      }
    }
  }

  evaluation.check_stopped()?;

  if !attributes.hold_all_complete() {
    let mut element_names: SmallVec<[InternedString; 8]> = SmallVec::new();
    for name in new.elements().iter().filter_map(Atom::lookup_name) {
      if !element_names.contains(&name) {
        element_names.push(name);
      }
    }
    for name in element_names {
      if let Some(result) = evaluation.get_value(name, Category::Up, &new)? {
        return Ok(settle(evaluation, new, result));
      }
    }
  }

  if let Some(name) = new.lookup_name() {
    let category = if new.head_name() == Some(name) { Category::Down } else { Category::Sub };
    if let Some(result) = evaluation.get_value(name, category, &new)? {
      return Ok(settle(evaluation, new, result));
    }
  }

  let new =
    if wrapped.contains(&true) {
      let elements = new.elements()
                        .iter()
                        .zip(wrapped.iter())
                        .map(|(element, wrapped)| {
                          if *wrapped {
                            SExpression::with_head(*sys::UNEVALUATED, vec![element.clone()])
                          } else {
                            element.clone()
                          }
                        })
                        .collect();
      new.with_elements(elements)
    } else {
      new
    };
  stamp(evaluation, &new);
  Ok((new, false))
}

pub(crate) fn evaluate_elements(
  evaluation: &mut Evaluation,
  attributes: Attributes,
  elements  : &[Atom]
) -> Result<Vec<Atom>, ControlSignal>
{
  if attributes.hold_all_complete() {
    return Ok(elements.to_vec());
  }
  let (first, rest) =
    if attributes.hold_all() {
      (false, false)
    } else {
      (!attributes.hold_first(), !attributes.hold_rest())
    };

  elements.iter()
          .enumerate()
          .map(|(index, element)| {
            let evaluate_this = if index == 0 { first } else { rest };
            if evaluate_this || element.has_form(*sys::EVALUATE, None) {
              evaluate(evaluation, element)
            } else {
              Ok(element.clone())
            }
          })
          .collect()
}

fn splice_sequences(elements: Vec<Atom>) -> Vec<Atom> {
  if !elements.iter().any(|element| element.sequence_elements().is_some()) {
    return elements;
  }
  let mut spliced = Vec::with_capacity(elements.len());
  for element in elements {
    match element.sequence_elements() {
      Some(inner) => spliced.extend_from_slice(inner),
      None        => spliced.push(element),
    }
  }
  spliced
}

/// Splices the elements of nested expressions with head `head`, at any depth. Elements that were wrapped in
/// `Unevaluated` stay whole.
fn flatten(head: &Atom, elements: Vec<(Atom, bool)>) -> Vec<(Atom, bool)> {
  let mut flat = Vec::with_capacity(elements.len());
  for (element, wrapped) in elements {
    let same_head = matches!(&element, Atom::Expression(e) if e.head().same_q(head));
    if same_head && !wrapped {
      let inner = element.elements().iter().map(|e| (e.clone(), false)).collect();
      flat.extend(flatten(head, inner));
    } else {
      flat.push((element, wrapped));
    }
  }
  flat
}

enum Threading {
  NotApplicable,
  Threaded(Atom),
  LengthMismatch,
}

/// `f[{a, b}, c, {d, e}]` becomes `{f[a, c, d], f[b, c, e]}`.
fn thread_over_lists(expression: &Atom) -> Threading {
  let mut items: Vec<Vec<Atom>> = vec![];
  let mut scalars: Vec<Atom> = vec![];
  let mut length: Option<usize> = None;

  for element in expression.elements() {
    if element.has_form(*sys::LIST, None) {
      match length {
        None => {
          length = Some(element.len());
          items = element.elements()
                         .iter()
                         .map(|inner| {
                           let mut item = scalars.clone();
                           item.push(inner.clone());
                           item
                         })
                         .collect();
        }
        Some(n) if n != element.len() => return Threading::LengthMismatch,
        Some(_) => {
          for (item, inner) in items.iter_mut().zip(element.elements()) {
            item.push(inner.clone());
          }
        }
      }
    } else {
      match length {
        None    => scalars.push(element.clone()),
        Some(_) => items.iter_mut().for_each(|item| item.push(element.clone())),
      }
    }
  }

  match length {
    None => Threading::NotApplicable,
    Some(_) => {
      let threaded = items.into_iter().map(|item| expression.with_elements(item)).collect();
      Threading::Threaded(SExpression::list(threaded))
    }
  }
}

/// A rule gave `result` for `new`. A result identical to `new` is a fixed point.
fn settle(evaluation: &Evaluation, new: Atom, result: Atom) -> (Atom, bool) {
  if result.same_q(&new) {
    stamp(evaluation, &new);
    (new, false)
  } else {
    (result, true)
  }
}

fn stamp(evaluation: &Evaluation, atom: &Atom) {
  if let Some(expression) = atom.as_expression() {
    expression.set_fully_evaluated(evaluation.definitions().generation());
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    definitions::Definitions,
    evaluation::Session,
    parsing::parse,
  };

  fn run(session: &mut Session, text: &str) -> String {
    session.evaluate_str(text).unwrap().result.to_string()
  }

  #[test]
  fn sequences_are_spliced() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "f[a, Sequence[b, c], d]"), "f[a, b, c, d]");
    assert_eq!(run(&mut session, "Hold[Sequence[b, c]]"), "Hold[b, c]");
    assert_eq!(run(&mut session, "HoldComplete[Sequence[b, c]]"), "HoldComplete[Sequence[b, c]]");
  }

  #[test]
  fn flat_and_orderless_heads_normalize() {
    let mut session = Session::new();
    run(&mut session, "SetAttributes[g, {Flat, Orderless}]");
    assert_eq!(run(&mut session, "g[c, g[b, a]]"), "g[a, b, c]");
  }

  #[test]
  fn listable_heads_thread() {
    let mut session = Session::new();
    run(&mut session, "SetAttributes[h, Listable]");
    assert_eq!(run(&mut session, "h[{1, 2}, x]"), "{h[1, x], h[2, x]}");
    assert_eq!(run(&mut session, "{1, 2} + {10, 20}"), "{11, 22}");

    let result = session.evaluate_str("h[{1, 2}, {1, 2, 3}]").unwrap();
    assert_eq!(result.result.to_string(), "h[{1, 2}, {1, 2, 3}]");
    assert_eq!(result.message_names(), vec!["Thread::tdlen".to_string()]);
  }

  #[test]
  fn held_positions_stay_unevaluated() {
    let mut session = Session::new();
    run(&mut session, "a = 1");
    assert_eq!(run(&mut session, "Hold[a, Evaluate[a]]"), "Hold[a, 1]");
    run(&mut session, "SetAttributes[k, HoldFirst]");
    assert_eq!(run(&mut session, "k[a, a]"), "k[a, 1]");
  }

  #[test]
  fn unevaluated_is_restored_when_nothing_applies() {
    let mut session = Session::new();
    run(&mut session, "a = 1");
    assert_eq!(run(&mut session, "f[Unevaluated[a]]"), "f[Unevaluated[a]]");
    assert_eq!(run(&mut session, "Length[Unevaluated[{1, a}]]"), "2");
  }

  #[test]
  fn upvalues_come_before_downvalues() {
    let mut session = Session::new();
    run(&mut session, "f[x_] := down");
    run(&mut session, "f[u] ^:= up");
    assert_eq!(run(&mut session, "f[u]"), "up");
    assert_eq!(run(&mut session, "f[v]"), "down");
  }

  #[test]
  fn subvalues_apply_to_curried_forms() {
    let mut session = Session::new();
    run(&mut session, "f[x_][y_] := {x, y}");
    assert_eq!(run(&mut session, "f[1][2]"), "{1, 2}");
  }

  #[test]
  fn fixed_points_are_stamped() {
    let mut definitions = Definitions::new_with_builtins(None);
    let expression = definitions.qualify_symbols(&parse("f[1, g[2]]").unwrap());
    let mut evaluation = Evaluation::new(definitions);

    let first = evaluation.evaluate(&expression).unwrap();
    assert_eq!(first, expression);
    let generation = evaluation.definitions().generation();
    assert!(first.as_expression().unwrap().is_fully_evaluated(generation));

    let second = evaluation.evaluate(&first).unwrap();
    assert!(second.same_q(&first));
  }

  #[test]
  fn rewriting_continues_to_a_fixed_point() {
    let mut session = Session::new();
    run(&mut session, "f[0] = done");
    run(&mut session, "f[n_] := f[n - 1]");
    assert_eq!(run(&mut session, "f[10]"), "done");
  }

  #[test]
  fn iteration_limit_aborts() {
    let mut session = Session::new();
    run(&mut session, "$IterationLimit = 20");
    run(&mut session, "f[n_] := f[n + 1]");
    let result = session.evaluate_str("f[0]").unwrap();
    assert_eq!(result.result.to_string(), "$Aborted");
    assert_eq!(result.message_names(), vec!["$IterationLimit::itlim".to_string()]);
  }

  #[test]
  fn return_leaves_the_user_rule() {
    let mut session = Session::new();
    run(&mut session, "f[x_] := (Return[x + 1]; 0)");
    assert_eq!(run(&mut session, "f[1]"), "2");
    assert_eq!(run(&mut session, "{f[1], f[2]}"), "{2, 3}");
  }

  #[test]
  fn threading_splits_scalars_and_lists() {
    let mut definitions = Definitions::new();
    let expression = definitions.qualify_symbols(&parse("f[a, {1, 2}, b]").unwrap());
    match thread_over_lists(&expression) {
      Threading::Threaded(threaded) => assert_eq!(threaded.to_string(), "{f[a, 1, b], f[a, 2, b]}"),
      _                             => panic!("expected threading"),
    }
  }
}
