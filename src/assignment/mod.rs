/*!

# Assignment

`Set`, `SetDelayed`, `UpSet`, `UpSetDelayed`, `TagSet` and `TagSetDelayed` all end up in `assign`. Whatever the
surface form, an assignment goes through the same steps:

 1. `Condition`s wrapped around the left hand side are collected into a single guard.
 2. The elements of the left hand side are evaluated, though not its head, unless it is a `List` or a `Part`. This
    is what stores `M[F[x_]] := …` as a rule for `M[G[x_]]` when `F[x_] := G[x]`.
 3. A left hand side whose lookup name has a handler in `special` goes to that handler. These are the assignments
    that change something other than a list of rules: `Attributes[f] = …`, `$Context = …`, `v[[i]] = …`, and so on.
 4. Anything else becomes a rule. A `Pattern` or `HoldPattern` around the whole left hand side is removed, a
    `Condition` at the top of the right hand side moves to the left, and the rule is attached to each tag.

A rejected assignment issues its message and unwinds to `assign` as `AssignmentError::Rejected`, which turns it into
`false`. The error never leaves this module.

`Unset`, `Clear` and `ClearAll` are in `clear`.

*/

mod clear;
mod special;

use smallvec::{smallvec, SmallVec};

use crate::{
  atom::{Atom, SExpression},
  attributes::Attributes,
  definitions::{tag_position, Category, DefinitionError},
  evaluate::evaluate_elements,
  evaluation::Evaluation,
  interner::{resolve_str, InternedString},
  interrupt::ControlSignal,
  logging::{log, Channel},
  rules::Rule,
  system_symbols as sys,
};

pub(crate) use clear::{clear, unset};

/// Whether the elements of a left hand side stay as they are: lists, parts, and nested assignments.
fn keeps_elements(lhs: &Atom) -> bool {
  let head = match lhs.as_expression().and_then(|expression| expression.head().symbol_name()) {
    Some(head) => head,
    None       => return false,
  };
  [
    *sys::LIST,
    *sys::PART,
    *sys::SET,
    *sys::SET_DELAYED,
    *sys::UP_SET,
    *sys::UP_SET_DELAYED,
    *sys::TAG_SET,
    *sys::TAG_SET_DELAYED,
  ].contains(&head)
}

pub(crate) enum AssignmentError {
  /// The assignment was refused and the message saying why has been issued.
  Rejected,
  Signal(ControlSignal),
}

impl From<ControlSignal> for AssignmentError {
  fn from(signal: ControlSignal) -> Self {
    AssignmentError::Signal(signal)
  }
}

pub(crate) type AssignmentResult<T> = Result<T, AssignmentError>;

/// Which symbols a new rule is attached to.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Tags {
  /// The lookup name of the left hand side.
  Lookup,
  /// The lookup name of each element of the left hand side.
  Up,
  /// The given symbol, which must occur in the left hand side.
  Given(InternedString),
}

type TagList = SmallVec<[InternedString; 4]>;

/// Performs the assignment `operator[lhs, rhs]`. Gives whether anything was stored. A refused assignment has issued
/// its message and gives `false`.
pub(crate) fn assign(
  evaluation: &mut Evaluation,
  operator  : InternedString,
  lhs       : &Atom,
  rhs       : &Atom,
  tags      : Tags
) -> Result<bool, ControlSignal>
{
  let mut assignment = Assignment { evaluation, operator, tags };
  match assignment.assign(lhs, rhs) {
    Ok(stored)                           => Ok(stored),
    Err(AssignmentError::Rejected)       => Ok(false),
    Err(AssignmentError::Signal(signal)) => Err(signal),
  }
}

pub(crate) struct Assignment<'e> {
  evaluation: &'e mut Evaluation,
  /// The assignment operator, under which messages are issued.
  operator  : InternedString,
  tags      : Tags,
}

impl<'e> Assignment<'e> {

  fn assign(&mut self, lhs: &Atom, rhs: &Atom) -> AssignmentResult<bool> {
    let (lhs, test, lookup_name) = self.normalize_lhs(lhs)?;
    log(
      Channel::Debug,
      4,
      format!("{}[{}, {}]", resolve_str(self.operator), with_guard(lhs.clone(), test.clone()), rhs).as_str()
    );

    match lookup_name.and_then(special::handler) {
      Some(handler) => handler(self, &lhs, test.as_ref(), rhs),
      None          => self.store_rules_by_tag(&lhs, test, rhs),
    }
  }

  /// Like `assign`, but a refusal is only a `false`. For assignments that are part of a larger one.
  pub(crate) fn assign_nested(&mut self, lhs: &Atom, rhs: &Atom) -> AssignmentResult<bool> {
    match self.assign(lhs, rhs) {
      Err(AssignmentError::Rejected) => Ok(false),
      result                         => result,
    }
  }

  /// Gives the left hand side with its elements evaluated, its merged guard, and the lookup name it had before
  /// evaluation.
  fn normalize_lhs(&mut self, lhs: &Atom) -> AssignmentResult<(Atom, Option<Atom>, Option<InternedString>)> {
    let (stripped, test) = unroll_conditions(lhs);
    let lookup_name = stripped.lookup_name();

    let stripped =
      if keeps_elements(&stripped) {
        stripped
      } else {
        self.evaluate_elements_of(&stripped)?
      };
    Ok((stripped, test, lookup_name))
  }

  fn evaluate_elements_of(&mut self, atom: &Atom) -> AssignmentResult<Atom> {
    let expression = match atom.as_expression() {
      Some(expression) => expression,
      None             => return Ok(atom.clone()),
    };
    let attributes = match expression.head().symbol_name() {
      Some(name) => self.evaluation.attributes(name),
      None       => Attributes::default(),
    };
    let elements = evaluate_elements(self.evaluation, attributes, expression.elements())?;
    Ok(atom.with_elements(elements))
  }

  // region The general case

  pub(super) fn store_rules_by_tag(&mut self, lhs: &Atom, test: Option<Atom>, rhs: &Atom) -> AssignmentResult<bool> {
    let (lhs, rhs) = unroll_patterns(lhs.clone(), rhs);
    let tags = self.tags_of(&lhs)?;
    let ignore_protection = special::check_setting(self, &lhs, &rhs)?;
    let (lhs, rhs) = move_rhs_conditions(lhs, rhs, test);

    let rule = self.make_rule(lhs.clone(), rhs)?;
    let category = if self.tags == Tags::Up { Some(Category::Up) } else { None };

    let mut stored = false;
    for tag in tags {
      if !ignore_protection && self.rejected_because_protected(&lhs, tag) {
        continue;
      }
      stored |= self.attach(tag, rule.clone(), category, ignore_protection);
    }
    Ok(stored)
  }

  /// Adds `rule` to the definition of `tag`. Gives whether it was added.
  fn attach(&mut self, tag: InternedString, rule: Rule, category: Option<Category>, ignore_protection: bool) -> bool {
    let pattern = rule.pattern().clone();

    if ignore_protection {
      return match category.or_else(|| tag_position(&pattern, tag)) {
        Some(category) => {
          self.evaluation.definitions_mut().insert_user_rule(tag, rule, category);
          true
        }
        None => {
          self.message(self.operator, "tagnfd", vec![Atom::Symbol(tag)]);
          false
        }
      };
    }

    match self.evaluation.definitions_mut().add_rule(tag, rule, category) {
      Ok(()) => true,
      Err(DefinitionError::Protected(_)) => {
        self.message(self.operator, "write", vec![Atom::Symbol(tag), pattern]);
        false
      }
      Err(DefinitionError::NoTag { .. }) | Err(DefinitionError::BadPattern { .. }) => {
        self.message(self.operator, "tagnfd", vec![Atom::Symbol(tag)]);
        false
      }
    }
  }

  /// The symbols a rule for `lhs` is attached to.
  fn tags_of(&mut self, lhs: &Atom) -> AssignmentResult<TagList> {
    match self.tags {
      Tags::Lookup => {
        match lhs.lookup_name() {
          Some(name) => Ok(smallvec![name]),
          None       => Err(self.reject(self.operator, "setraw", vec![lhs.clone()])),
        }
      }

      Tags::Up => {
        if lhs.is_atom() {
          return Err(self.reject(self.operator, "normal", vec![lhs.clone()]));
        }
        let mut tags = TagList::new();
        for name in lhs.elements().iter().filter_map(Atom::lookup_name) {
          if !tags.contains(&name) {
            tags.push(name);
          }
        }
        if tags.is_empty() {
          Err(self.reject(self.operator, "nosym", vec![lhs.clone()]))
        } else {
          Ok(tags)
        }
      }

      Tags::Given(tag) => {
        let found = lhs.lookup_name() == Some(tag)
            || lhs.elements().iter().any(|element| tag_candidate(element) == Some(tag));
        if found {
          Ok(smallvec![tag])
        } else {
          Err(self.reject(self.operator, "tagnfd", vec![Atom::Symbol(tag)]))
        }
      }
    }
  }

  /// The tags for the assignments that only attach to the symbol they are about, `f` in `Default[f] = …`.
  pub(crate) fn focus_tags(&mut self, focus: &Atom) -> AssignmentResult<TagList> {
    match (self.tags, focus.lookup_name()) {
      (Tags::Given(tag), name) if name != Some(tag) => {
        Err(self.reject(self.operator, "tagnfd", vec![Atom::Symbol(tag)]))
      }
      (_, Some(name)) => Ok(smallvec![name]),
      (_, None)       => Err(self.reject(self.operator, "setraw", vec![focus.clone()])),
    }
  }

  // endregion

  // region Utilities shared with the handlers

  pub(crate) fn evaluation(&mut self) -> &mut Evaluation {
    self.evaluation
  }

  pub(crate) fn operator(&self) -> InternedString {
    self.operator
  }

  pub(crate) fn tags(&self) -> Tags {
    self.tags
  }

  pub(crate) fn message(&mut self, symbol: InternedString, tag: &str, arguments: Vec<Atom>) {
    self.evaluation.message(symbol, tag, arguments);
  }

  /// Issues a message and gives the error that refuses the assignment.
  pub(crate) fn reject(&mut self, symbol: InternedString, tag: &str, arguments: Vec<Atom>) -> AssignmentError {
    self.evaluation.message(symbol, tag, arguments);
    AssignmentError::Rejected
  }

  /// Refuses an assignment to `name[…]` with `count` elements when `name` takes `min..=max`.
  pub(crate) fn reject_arity(&mut self, name: InternedString, count: usize, min: usize, max: usize) -> AssignmentError {
    let symbol = Atom::Symbol(name);
    let count = Atom::from(count as i64);
    match (min, max) {
      (1, 1)                 => self.reject(name, "argx", vec![symbol, count]),
      (min, max) if min == max => self.reject(name, "argrx", vec![symbol, count, Atom::from(min as i64)]),
      (min, max)             => {
        self.reject(name, "argb", vec![symbol, count, Atom::from(min as i64), Atom::from(max as i64)])
      }
    }
  }

  /// Issues `wrsym` or `write` if `tag` is protected.
  pub(crate) fn rejected_because_protected(&mut self, lhs: &Atom, tag: InternedString) -> bool {
    if !self.evaluation.attributes(tag).protected() {
      return false;
    }
    if lhs.is_symbol(tag) {
      self.message(self.operator, "wrsym", vec![Atom::Symbol(tag)]);
    } else {
      self.message(self.operator, "write", vec![Atom::Symbol(tag), lhs.clone()]);
    }
    true
  }

  pub(crate) fn make_rule(&mut self, lhs: Atom, rhs: Atom) -> AssignmentResult<Rule> {
    match Rule::template(lhs.clone(), rhs) {
      Ok(rule) => Ok(rule),
      Err(error) => {
        log(Channel::Debug, 4, format!("Refusing the rule for {}: {}", lhs, error).as_str());
        Err(self.reject(self.operator, "badpat", vec![lhs]))
      }
    }
  }

  // endregion
}

// region Normalization

/// Splits `lhs /; c1 /; c2` into `lhs` and the test `c1 && c2`.
pub(crate) fn unroll_conditions(lhs: &Atom) -> (Atom, Option<Atom>) {
  let mut lhs = lhs;
  let mut tests: Vec<Atom> = vec![];
  while lhs.has_form(*sys::CONDITION, Some(2)) {
    tests.push(lhs.elements()[1].clone());
    lhs = &lhs.elements()[0];
  }
  tests.reverse();

  let test = match tests.len() {
    0 => None,
    1 => tests.pop(),
    _ => Some(SExpression::with_head(*sys::AND, tests)),
  };
  (lhs.clone(), test)
}

pub(crate) fn with_guard(lhs: Atom, test: Option<Atom>) -> Atom {
  match test {
    Some(test) => SExpression::with_head(*sys::CONDITION, vec![lhs, test]),
    None       => lhs,
  }
}

/// `p:f[x_] = …` becomes `f[x_] = …` with `p` in the right hand side replaced by `f[x]`. `HoldPattern` is removed.
pub(crate) fn unroll_patterns(lhs: Atom, rhs: &Atom) -> (Atom, Atom) {
  let mut lhs = lhs;
  let mut rhs = rhs.clone();

  if lhs.has_form(*sys::PATTERN, Some(2)) {
    let pattern = lhs.elements()[1].clone();
    if let Some(name) = lhs.elements()[0].symbol_name() {
      let value = pattern_names_to_symbols(&pattern);
      rhs = rhs.replace_symbols(&|symbol| if symbol == name { Some(value.clone()) } else { None });
    }
    lhs = pattern;
  }
  if lhs.has_form(*sys::HOLD_PATTERN, Some(1)) {
    lhs = lhs.elements()[0].clone();
  }
  (lhs, rhs)
}

/// Replaces every `Pattern[x, p]` by `x`.
fn pattern_names_to_symbols(pattern: &Atom) -> Atom {
  if pattern.has_form(*sys::PATTERN, Some(2)) {
    return pattern.elements()[0].clone();
  }
  match pattern.as_expression() {
    Some(expression) => {
      let elements = expression.elements().iter().map(pattern_names_to_symbols).collect();
      pattern.with_elements(elements)
    }
    None => pattern.clone(),
  }
}

/// `lhs := rhs /; test` becomes `lhs /; test := rhs`, and the guard collected from the left hand side goes back
/// around it.
pub(crate) fn move_rhs_conditions(lhs: Atom, rhs: Atom, test: Option<Atom>) -> (Atom, Atom) {
  let mut lhs = lhs;
  let mut rhs = rhs;
  while rhs.has_form(*sys::CONDITION, Some(2)) {
    lhs = SExpression::with_head(*sys::CONDITION, vec![lhs, rhs.elements()[1].clone()]);
    rhs = rhs.elements()[0].clone();
  }
  (with_guard(lhs, test), rhs)
}

/// The symbol an element of a left hand side could be tagged with: `g` for `g[x]`, `x_g` or `HoldPattern[g[…]]`.
fn tag_candidate(element: &Atom) -> Option<InternedString> {
  let mut element = element;
  if element.has_form(*sys::HOLD_PATTERN, Some(1)) {
    element = &element.elements()[0];
  }
  if element.has_form(*sys::PATTERN, Some(2)) {
    element = &element.elements()[1];
  }
  let is_blank = element.has_form(*sys::BLANK, Some(1))
      || element.has_form(*sys::BLANK_SEQUENCE, Some(1))
      || element.has_form(*sys::BLANK_NULL_SEQUENCE, Some(1));
  if is_blank {
    element = &element.elements()[0];
  }
  element.lookup_name()
}

// endregion
