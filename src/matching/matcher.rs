/*!

The matching algorithm proper.

`match_pattern` dispatches on the kind of pattern. The pattern constructs (`Blank`, `Pattern`, `Condition`, …) each
have a small matcher of their own. Any other compound pattern is matched structurally by `match_expression`, which
matches the head and then hands the elements to `match_element`. That is where the attributes of the head come in:

  * Without attributes, each pattern element claims a contiguous run of the remaining elements, shortest runs first
    while more pattern elements follow and longest runs first for the last one.
  * `Orderless` lets a pattern element claim any subset of the remaining elements, and lets a sequence of claimed
    elements be presented to the pattern in any order.
  * `Flat` lets a pattern element claim several elements wrapped in the head itself, as if the expression had been
    written nested.
  * `OneIdentity` lets `f[p1, p2, …]` match a lone expression `e` as if it were `f[e]`, so that the remaining
    pattern elements can take their defaults.

*/

use crate::{
  atom::{Atom, SExpression},
  attributes::Attributes,
  evaluation::Evaluation,
  expression::Expression,
  interrupt::ControlSignal,
  matching::{
    sequences::{permutations, subranges, subsets},
    Bindings,
    Flow,
    Rest,
    Yield,
  },
  system_symbols as sys,
};

/// Where the expression being matched sits. The head and position are needed to look up the defaults of `Optional`.
#[derive(Copy, Clone)]
pub(crate) struct MatchContext<'a> {
  pub head         : Option<&'a Atom>,
  /// One based, as in `Default[f, i, n]`.
  pub element_index: usize,
  pub element_count: usize,
  pub fully        : bool,
  pub wrap_oneid   : bool,
}

impl<'a> MatchContext<'a> {
  pub fn top_level(fully: bool) -> MatchContext<'static> {
    MatchContext {
      head         : None,
      element_index: 0,
      element_count: 0,
      fully,
      wrap_oneid   : true,
    }
  }

  /// The context for a subpattern of a pattern construct: the position is kept, everything else is reset.
  fn nested(&self) -> MatchContext<'a> {
    MatchContext {
      fully     : true,
      wrap_oneid: true,
      ..*self
    }
  }
}

/// The elements of a compound expression currently being matched, with everything `match_element` needs to know
/// about them.
struct ElementFrame<'f> {
  head         : &'f Atom,
  /// Number of elements of the expression.
  length       : usize,
  attributes   : Attributes,
  patterns     : &'f [Atom],
  fully        : bool,
  wrap_oneid   : bool,
}

fn is_pattern_construct(head: &Atom) -> bool {
  match head.symbol_name() {
    Some(name) => {
      name == *sys::PATTERN
          || name == *sys::PATTERN_TEST
          || name == *sys::CONDITION
          || name == *sys::OPTIONAL
          || name == *sys::BLANK
          || name == *sys::BLANK_SEQUENCE
          || name == *sys::BLANK_NULL_SEQUENCE
          || name == *sys::ALTERNATIVES
          || name == *sys::OPTIONS_PATTERN
    }
    None => false
  }
}

/// `Sequence[a, b, …]` gives `a, b, …`. Anything else is a sequence of one.
fn get_sequence(expression: &Atom) -> &[Atom] {
  match expression.sequence_elements() {
    Some(elements) => elements,
    None           => std::slice::from_ref(expression)
  }
}

/// The minimum and, if bounded, maximum number of elements `pattern` can match.
pub(crate) fn match_count(pattern: &Atom) -> (usize, Option<usize>) {
  let expression = match pattern {
    Atom::Expression(e) => e,
    _                   => return (1, Some(1)),
  };
  let elements = expression.elements();

  match expression.head().symbol_name() {
    Some(name) if name == *sys::BLANK_SEQUENCE && elements.len() <= 1      => (1, None),
    Some(name) if name == *sys::BLANK_NULL_SEQUENCE && elements.len() <= 1 => (0, None),
    Some(name) if name == *sys::OPTIONAL && !elements.is_empty()          => (0, Some(1)),
    Some(name) if name == *sys::OPTIONS_PATTERN                            => (0, None),

    Some(name) if name == *sys::PATTERN && elements.len() == 2 => match_count(&elements[1]),

    Some(name) if (name == *sys::CONDITION || name == *sys::PATTERN_TEST) && elements.len() == 2 => {
      match_count(&elements[0])
    }

    Some(name) if name == *sys::HOLD_PATTERN && elements.len() == 1 => match_count(&elements[0]),

    Some(name) if name == *sys::ALTERNATIVES && !elements.is_empty() => {
      elements.iter()
              .map(match_count)
              .reduce(|(min_a, max_a), (min_b, max_b)| {
                let max = match (max_a, max_b) {
                  (Some(a), Some(b)) => Some(a.max(b)),
                  _                  => None,
                };
                (min_a.min(min_b), max)
              })
              .unwrap_or((1, Some(1)))
    }

    _ => (1, Some(1))
  }
}

/// Matches `pattern` against `expression`, calling `yield_` for every solution.
pub(crate) fn match_pattern(
  evaluation: &mut Evaluation,
  pattern   : &Atom,
  expression: &Atom,
  bindings  : &mut Bindings,
  context   : MatchContext,
  yield_    : &mut Yield
) -> Result<Flow, ControlSignal>
{
  let p = match pattern {
    Atom::Expression(p) => p,
    // An atom matches only itself.
    _ => {
      return if pattern.same_q(expression) {
        yield_(evaluation, bindings, None)
      } else {
        Ok(Flow::Continue)
      };
    }
  };
  let elements = p.elements();

  match p.head().symbol_name() {

    Some(name) if name == *sys::BLANK && elements.len() <= 1 => {
      if expression.has_form(*sys::SEQUENCE, Some(0)) {
        return Ok(Flow::Continue);
      }
      match elements.first() {
        Some(head) if !expression.head().same_q(head) => Ok(Flow::Continue),
        _                                            => yield_(evaluation, bindings, None),
      }
    }

    Some(name) if (name == *sys::BLANK_SEQUENCE || name == *sys::BLANK_NULL_SEQUENCE) && elements.len() <= 1 => {
      let items = get_sequence(expression);
      if name == *sys::BLANK_SEQUENCE && items.is_empty() {
        return Ok(Flow::Continue);
      }
      match elements.first() {
        Some(head) if !items.iter().all(|item| item.head().same_q(head)) => Ok(Flow::Continue),
        _ => yield_(evaluation, bindings, None),
      }
    }

    Some(name) if name == *sys::PATTERN && elements.len() == 2 => {
      let variable = match elements[0].symbol_name() {
        Some(variable) => variable,
        None           => return Ok(Flow::Continue),
      };
      match bindings.get(variable).map(|existing| existing.same_q(expression)) {
        Some(true)  => yield_(evaluation, bindings, None),
        Some(false) => Ok(Flow::Continue),
        None => {
          let mark = bindings.len();
          bindings.push(variable, expression.clone());
          let flow = match_pattern(evaluation, &elements[1], expression, bindings, context.nested(), yield_);
          bindings.truncate(mark);
          flow
        }
      }
    }

    Some(name) if name == *sys::CONDITION && elements.len() == 2 => {
      let test = &elements[1];
      match_pattern(
        evaluation,
        &elements[0],
        expression,
        bindings,
        context.nested(),
        &mut |evaluation, bindings, rest| {
          let instantiated = bindings.substitute(test);
          if evaluation.evaluate(&instantiated)?.is_true() {
            yield_(evaluation, bindings, rest)
          } else {
            Ok(Flow::Continue)
          }
        }
      )
    }

    Some(name) if name == *sys::PATTERN_TEST && elements.len() == 2 => {
      let test = &elements[1];
      match_pattern(
        evaluation,
        &elements[0],
        expression,
        bindings,
        context.nested(),
        &mut |evaluation, bindings, _| {
          for item in get_sequence(expression) {
            let item = evaluation.evaluate(item)?;
            let application = SExpression::new(test.clone(), vec![item]);
            if !evaluation.evaluate(&application)?.is_true() {
              return Ok(Flow::Continue);
            }
          }
          yield_(evaluation, bindings, None)
        }
      )
    }

    Some(name) if name == *sys::ALTERNATIVES => {
      for alternative in elements {
        if match_pattern(evaluation, alternative, expression, bindings, context.nested(), yield_)? == Flow::Stop {
          return Ok(Flow::Stop);
        }
      }
      Ok(Flow::Continue)
    }

    Some(name) if name == *sys::OPTIONAL && (1..=2).contains(&elements.len()) => {
      match_optional(evaluation, p, expression, bindings, context, yield_)
    }

    Some(name) if name == *sys::VERBATIM && elements.len() == 1 => {
      if elements[0].same_q(expression) {
        yield_(evaluation, bindings, None)
      } else {
        Ok(Flow::Continue)
      }
    }

    Some(name) if name == *sys::HOLD_PATTERN && elements.len() == 1 => {
      match_pattern(evaluation, &elements[0], expression, bindings, context.nested(), yield_)
    }

    Some(name) if name == *sys::OPTIONS_PATTERN && elements.len() <= 1 => {
      if get_sequence(expression).iter().all(is_option_sequence) {
        yield_(evaluation, bindings, None)
      } else {
        Ok(Flow::Continue)
      }
    }

    _ => match_expression(evaluation, p, expression, bindings, context, yield_)

  }
}

fn is_option_sequence(atom: &Atom) -> bool {
  atom.has_form(*sys::RULE, Some(2))
      || atom.has_form(*sys::RULE_DELAYED, Some(2))
      || (atom.has_form(*sys::LIST, None) && atom.elements().iter().all(is_option_sequence))
}

/// An empty sequence in an optional position takes the explicit default, or the one from `Default[f, i, n]`.
fn match_optional(
  evaluation: &mut Evaluation,
  p         : &Expression,
  expression: &Atom,
  bindings  : &mut Bindings,
  context   : MatchContext,
  yield_    : &mut Yield
) -> Result<Flow, ControlSignal>
{
  let elements = p.elements();
  if !expression.has_form(*sys::SEQUENCE, Some(0)) {
    return match_pattern(evaluation, &elements[0], expression, bindings, context.nested(), yield_);
  }

  let default = match elements.get(1) {
    Some(default) => Some(default.clone()),
    None => {
      match context.head.and_then(|head| head.symbol_name()) {
        Some(head) => evaluation.default_value(head, Some(context.element_index), Some(context.element_count))?,
        None       => None,
      }
    }
  };

  match default {
    Some(default) => match_pattern(evaluation, &elements[0], &default, bindings, context.nested(), yield_),
    None => {
      let head = context.head.cloned().unwrap_or_else(|| Atom::Symbol(*sys::NULL));
      evaluation.message(
        *sys::PATTERN,
        "nodef",
        vec![head, Atom::from(context.element_index as i64), Atom::from(context.element_count as i64)]
      );
      Ok(Flow::Continue)
    }
  }
}

/// Matches a compound pattern that is not a pattern construct.
fn match_expression(
  evaluation: &mut Evaluation,
  p         : &Expression,
  expression: &Atom,
  bindings  : &mut Bindings,
  context   : MatchContext,
  yield_    : &mut Yield
) -> Result<Flow, ControlSignal>
{
  evaluation.check_stopped()?;

  let attributes = match p.head().symbol_name() {
    Some(name) => evaluation.attributes(name),
    None       => Attributes::default(),
  };
  let fully = if attributes.flat() { context.fully } else { true };

  if let Atom::Expression(e) = expression {
    let frame = ElementFrame {
      head      : e.head(),
      length    : e.len(),
      attributes,
      patterns  : p.elements(),
      fully,
      wrap_oneid: context.wrap_oneid,
    };
    let flow = match_pattern(
      evaluation,
      p.head(),
      e.head(),
      bindings,
      MatchContext::top_level(true),
      &mut |evaluation, bindings, _| {
        if frame.patterns.is_empty() {
          return if e.is_empty() {
            yield_(evaluation, bindings, None)
          } else {
            Ok(Flow::Continue)
          };
        }
        if cannot_fit(frame.patterns, e.len()) {
          return Ok(Flow::Continue);
        }
        let rest = Rest { before: vec![], after: e.elements().to_vec() };
        match_element(evaluation, bindings, &frame, 0, rest, true, yield_)
      }
    )?;
    if flow == Flow::Stop {
      return Ok(Flow::Stop);
    }
  }

  // `OneIdentity`: try `f[expression]`, leaving the remaining pattern elements to their defaults.
  if context.wrap_oneid
      && attributes.one_identity()
      && !p.is_empty()
      && !p.head().same_q(&expression.head())
      && !p.head().same_q(expression)
  {
    if p.elements().iter().any(|element| match_count(element).0 > 1) {
      return Ok(Flow::Continue);
    }
    let frame = ElementFrame {
      head      : p.head(),
      length    : 1,
      attributes,
      patterns  : p.elements(),
      fully,
      wrap_oneid: true,
    };
    let rest = Rest { before: vec![], after: vec![expression.clone()] };
    return match_element(evaluation, bindings, &frame, 0, rest, true, yield_);
  }

  Ok(Flow::Continue)
}

/// The pattern elements need more elements than there are.
fn cannot_fit(patterns: &[Atom], available: usize) -> bool {
  patterns.iter().map(|p| match_count(p).0).sum::<usize>() > available
}

/// Could `candidate` be matched by `pattern`? Used to prune the subsets tried for an `Orderless` head.
fn is_candidate(
  evaluation: &mut Evaluation,
  pattern   : &Atom,
  candidate : &Atom,
  bindings  : &mut Bindings
) -> Result<bool, ControlSignal>
{
  let p = match pattern {
    Atom::Expression(p) => p,
    _                   => return Ok(pattern.same_q(candidate)),
  };
  let elements = p.elements();

  match p.head().symbol_name() {
    Some(name) if (name == *sys::BLANK || name == *sys::BLANK_SEQUENCE || name == *sys::BLANK_NULL_SEQUENCE)
        && elements.len() <= 1 =>
    {
      Ok(elements.first().map_or(true, |head| candidate.head().same_q(head)))
    }

    Some(name) if name == *sys::PATTERN && elements.len() == 2 => {
      match elements[0].symbol_name().and_then(|variable| bindings.get(variable)) {
        Some(_) => Ok(true),
        None    => is_candidate(evaluation, &elements[1], candidate, bindings),
      }
    }

    _ if is_pattern_construct(p.head()) => Ok(true),
    Some(name) if name == *sys::VERBATIM || name == *sys::HOLD_PATTERN => Ok(true),

    _ => {
      let mut found = false;
      match_pattern(
        evaluation,
        pattern,
        candidate,
        bindings,
        MatchContext::top_level(true),
        &mut |_, _, _| {
          found = true;
          Ok(Flow::Stop)
        }
      )?;
      Ok(found)
    }
  }
}

/// Matches `frame.patterns[index]` and everything after it against the elements in `rest_expression.after`.
fn match_element(
  evaluation     : &mut Evaluation,
  bindings       : &mut Bindings,
  frame          : &ElementFrame,
  index          : usize,
  rest_expression: Rest,
  first          : bool,
  yield_         : &mut Yield
) -> Result<Flow, ControlSignal>
{
  evaluation.check_stopped()?;

  let element = &frame.patterns[index];
  let (min, max) = match_count(element);
  let flat = frame.attributes.flat();
  let element_head = element.head();

  // A pattern construct under a `Flat` head may claim more elements than it says, wrapped in the head.
  let mut try_flattened = flat && is_pattern_construct(&element_head);
  let set_max = if try_flattened { None } else { max };
  try_flattened = try_flattened || (flat && element_head.same_q(frame.head));
  let less_first = index + 1 < frame.patterns.len();

  let candidates = &rest_expression.after;

  if frame.attributes.orderless() {
    let mut included = Vec::with_capacity(candidates.len());
    for candidate in candidates.iter() {
      included.push(is_candidate(evaluation, element, candidate, bindings)?);
    }
    if included.iter().filter(|i| **i).count() < min {
      return Ok(Flow::Continue);
    }

    // A variable that is already bound can only take the elements it is bound to.
    if let Some(existing) = bound_value(element, bindings) {
      let needed: Vec<Atom> = match existing.sequence_elements() {
        Some(elements) => elements.to_vec(),
        None if flat && existing.head().same_q(frame.head) => existing.elements().to_vec(),
        None => vec![existing.clone()],
      };
      let mut available: Vec<(Atom, bool)> = candidates.iter().cloned().zip(included.into_iter()).collect();
      for needed_element in needed.iter() {
        match available.iter().position(|(c, i)| *i && c == needed_element) {
          Some(position) => { available.remove(position); }
          None           => return Ok(Flow::Continue),
        }
      }
      let items_rest = Rest { before: vec![], after: available.into_iter().map(|(c, _)| c).collect() };
      return match_items(
        evaluation, bindings, frame, index, &rest_expression, needed, items_rest, try_flattened, max, yield_
      );
    }

    subsets(
      candidates.len(),
      min,
      set_max,
      &included,
      less_first,
      &mut |chosen, not_chosen| {
        let items = chosen.iter().map(|i| candidates[*i].clone()).collect();
        let items_rest = Rest {
          before: vec![],
          after : not_chosen.iter().map(|i| candidates[*i].clone()).collect()
        };
        match_items(
          evaluation, bindings, frame, index, &rest_expression, items, items_rest, try_flattened, max, yield_
        )
      }
    )
  } else {
    if candidates.len() < min {
      return Ok(Flow::Continue);
    }
    subranges(
      candidates.len(),
      min,
      set_max,
      first && !frame.fully,
      less_first,
      &mut |start, length| {
        let items = candidates[start..start + length].to_vec();
        let items_rest = Rest {
          before: candidates[..start].to_vec(),
          after : candidates[start + length..].to_vec(),
        };
        match_items(
          evaluation, bindings, frame, index, &rest_expression, items, items_rest, try_flattened, max, yield_
        )
      }
    )
  }
}

/// The value already bound to the variable of a `Pattern` element.
fn bound_value(element: &Atom, bindings: &Bindings) -> Option<Atom> {
  if !element.has_form(*sys::PATTERN, Some(2)) {
    return None;
  }
  element.elements()[0]
         .symbol_name()
         .and_then(|variable| bindings.get(variable))
         .cloned()
}

/// Tries `items` as the match of `frame.patterns[index]`, then continues with the next pattern element.
#[allow(clippy::too_many_arguments)]
fn match_items(
  evaluation     : &mut Evaluation,
  bindings       : &mut Bindings,
  frame          : &ElementFrame,
  index          : usize,
  rest_expression: &Rest,
  items          : Vec<Atom>,
  items_rest     : Rest,
  try_flattened  : bool,
  max            : Option<usize>,
  yield_         : &mut Yield
) -> Result<Flow, ControlSignal>
{
  // Wrapping every element in the head would match the same expression over again.
  let include_flattened = try_flattened && !items.is_empty() && items.len() < frame.length;
  let element = &frame.patterns[index];
  let has_more = index + 1 < frame.patterns.len();
  let element_context = MatchContext {
    head         : Some(frame.head),
    element_index: index + 1,
    element_count: frame.patterns.len(),
    fully        : true,
    wrap_oneid   : frame.wrap_oneid,
  };

  get_wrappings(
    evaluation,
    bindings,
    &items,
    max,
    frame,
    include_flattened,
    &mut |evaluation, bindings, item| {
      match_pattern(
        evaluation,
        element,
        &item,
        bindings,
        element_context,
        &mut |evaluation, bindings, _| {
          if has_more {
            match_element(
              evaluation,
              bindings,
              frame,
              index + 1,
              items_rest.clone(),
              false,
              &mut |evaluation, bindings, next_rest| {
                let before = rest_expression.before
                                            .iter()
                                            .chain(items_rest.before.iter())
                                            .cloned()
                                            .collect();
                let after = next_rest.map(|rest| rest.after).unwrap_or_default();
                yield_(evaluation, bindings, Some(Rest { before, after }))
              }
            )
          } else if !frame.fully || items_rest.is_empty() {
            yield_(evaluation, bindings, Some(items_rest.clone()))
          } else {
            Ok(Flow::Continue)
          }
        }
      )
    }
  )
}

/// The ways `items` can be presented to a single pattern element: a lone item as itself, several as a `Sequence`
/// (in every order, for an `Orderless` head), and, for a `Flat` head, wrapped in the head.
fn get_wrappings(
  evaluation       : &mut Evaluation,
  bindings         : &mut Bindings,
  items            : &[Atom],
  max              : Option<usize>,
  frame            : &ElementFrame,
  include_flattened: bool,
  f                : &mut dyn FnMut(&mut Evaluation, &mut Bindings, Atom) -> Result<Flow, ControlSignal>,
) -> Result<Flow, ControlSignal>
{
  if items.len() == 1 {
    return f(evaluation, bindings, items[0].clone());
  }

  if max.map_or(true, |max| items.len() <= max) {
    let flow =
      if frame.attributes.orderless() {
        permutations(items, &mut |permutation| {
          f(evaluation, bindings, SExpression::sequence(permutation.to_vec()))
        })?
      } else {
        f(evaluation, bindings, SExpression::sequence(items.to_vec()))?
      };
    if flow == Flow::Stop {
      return Ok(Flow::Stop);
    }
  }

  if frame.attributes.flat() && include_flattened {
    return f(evaluation, bindings, SExpression::new(frame.head.clone(), items.to_vec()));
  }
  Ok(Flow::Continue)
}
