/*!

Numeric Computation

`Plus` and `Times` fold their numeric arguments into one number and collect like terms and factors. Exact numbers
stay exact; as soon as a machine real takes part, the folded number is a machine real. `Power` only computes when
the result is a number it can represent. `N` converts to machine reals, consulting the `NValues` of symbols and
heads on the way.

Neither `Plus` nor `Times` ever declines: when nothing can be simplified they return the expression they were given,
which the evaluation loop takes as a fixed point.

*/

use std::{
  cmp::Ordering,
  ops::{Add, Mul},
};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::{
  atom::{Atom, SExpression},
  attributes::Attribute,
  definitions::{Category, Definitions},
  evaluation::Evaluation,
  interrupt::ControlSignal,
  normal_form::sort_canonical,
  rules::Arguments,
  system_symbols as sys,
};

type BuiltinResult = Result<Option<Atom>, ControlSignal>;

/// Exponents beyond this are left unevaluated rather than computed exactly.
const MAX_EXACT_EXPONENT: u32 = 100_000;

callbacks![Plus, Times, Power, N, NPrecision];

pub(super) fn register_builtins(definitions: &mut Definitions) {
  register_builtin!(definitions, Plus, "Plus[terms___]");
  register_builtin!(definitions, Times, "Times[factors___]");
  register_builtin!(definitions, Power, "Power[base_, exponent_]");
  register_builtin!(definitions, N, "N[x_]");
  register_builtin!(definitions, NPrecision, "N[x_, precision_]");
}

// region Numbers

/// A real number as arithmetic sees it.
#[derive(Clone, Debug, PartialEq)]
pub(super) enum Number {
  Exact(BigRational),
  Machine(f64),
}

impl Number {
  pub(super) fn from_atom(atom: &Atom) -> Option<Number> {
    match atom {
      Atom::Integer(n)  => Some(Number::Exact(BigRational::from_integer(n.clone()))),
      Atom::Rational(q) => Some(Number::Exact(q.as_ref().clone())),
      Atom::Real(x)     => Some(Number::Machine(*x)),
      _                 => None,
    }
  }

  fn to_atom(&self) -> Atom {
    match self {
      Number::Exact(q)   => Atom::rational(q.clone()),
      Number::Machine(x) => Atom::Real(*x),
    }
  }

  fn to_f64(&self) -> f64 {
    match self {
      Number::Exact(q)   => q.to_f64().unwrap_or(f64::NAN),
      Number::Machine(x) => *x,
    }
  }

  fn is_zero(&self) -> bool {
    match self {
      Number::Exact(q)   => q.is_zero(),
      Number::Machine(x) => *x == 0.0,
    }
  }

  fn is_one(&self) -> bool {
    match self {
      Number::Exact(q)   => q.is_one(),
      Number::Machine(x) => *x == 1.0,
    }
  }

  fn is_exact(&self) -> bool {
    matches!(self, Number::Exact(_))
  }

  /// Exact numbers compare exactly. Otherwise both are compared as machine reals.
  pub(super) fn compare(&self, other: &Number) -> Option<Ordering> {
    match (self, other) {
      (Number::Exact(a), Number::Exact(b)) => Some(a.cmp(b)),
      (a, b)                               => a.to_f64().partial_cmp(&b.to_f64()),
    }
  }
}

impl Add for Number {
  type Output = Number;

  fn add(self, other: Number) -> Number {
    match (self, other) {
      (Number::Exact(a), Number::Exact(b)) => Number::Exact(a + b),
      (a, b)                               => Number::Machine(a.to_f64() + b.to_f64()),
    }
  }
}

impl Mul for Number {
  type Output = Number;

  fn mul(self, other: Number) -> Number {
    match (self, other) {
      (Number::Exact(a), Number::Exact(b)) => Number::Exact(a * b),
      (a, b)                               => Number::Machine(a.to_f64() * b.to_f64()),
    }
  }
}

// endregion

// region Plus and Times

/// Splits a term into its numeric coefficient and the rest: `2*x*y` into `2` and `x*y`.
fn split_coefficient(term: &Atom) -> (Number, Atom) {
  if term.has_form_range(*sys::TIMES, 2, usize::MAX) {
    if let Some(coefficient) = Number::from_atom(&term.elements()[0]) {
      let rest = &term.elements()[1..];
      let rest =
        if rest.len() == 1 {
          rest[0].clone()
        } else {
          SExpression::with_head(*sys::TIMES, rest.to_vec())
        };
      return (coefficient, rest);
    }
  }
  (Number::Exact(BigRational::one()), term.clone())
}

/// `coefficient*term`, without a coefficient of 1.
fn with_coefficient(coefficient: Number, term: Atom) -> Atom {
  if coefficient.is_one() && coefficient.is_exact() {
    return term;
  }
  let mut elements = vec![coefficient.to_atom()];
  if term.has_form(*sys::TIMES, None) {
    elements.extend_from_slice(term.elements());
  } else {
    elements.push(term);
  }
  SExpression::with_head(*sys::TIMES, elements)
}

/// Splits a factor into base and exponent: `x^2` into `x` and `2`.
fn split_exponent(factor: &Atom) -> (Atom, Atom) {
  if factor.has_form(*sys::POWER, Some(2)) {
    (factor.elements()[0].clone(), factor.elements()[1].clone())
  } else {
    (factor.clone(), Atom::integer(1))
  }
}

/// The numbers of `elements` folded with `fold` from `identity`, and the elements that are not numbers.
fn fold_numbers(elements: &[Atom], identity: Number, fold: fn(Number, Number) -> Number) -> (Number, Vec<Atom>) {
  let mut accumulator = identity;
  let mut others = Vec::with_capacity(elements.len());
  for element in elements {
    match Number::from_atom(element) {
      Some(number) => accumulator = fold(accumulator, number),
      None         => others.push(element.clone()),
    }
  }
  (accumulator, others)
}

/// Assembles the folded number and the remaining elements into the value of `head[…]`, or gives `original` if
/// nothing changed.
fn assemble(head: Atom, number: Option<Number>, mut others: Vec<Atom>, empty: Atom, original: &Atom) -> Atom {
  sort_canonical(&mut others);
  let mut elements = Vec::with_capacity(others.len() + 1);
  elements.extend(number.map(|number| number.to_atom()));
  elements.extend(others);

  match elements.len() {
    0 => empty,
    1 => elements.remove(0),
    _ => {
      let result = SExpression::new(head, elements);
      if result.same_q(original) {
        original.clone()
      } else {
        result
      }
    }
  }
}

/// Implements calls matching
///     `Plus[terms___]`
pub(crate) fn Plus(arguments: &Arguments, original: &Atom, _: &mut Evaluation) -> BuiltinResult {
  let terms = arguments.sequence("terms");
  let (sum, others) = fold_numbers(&terms, Number::Exact(BigRational::zero()), |a, b| a + b);

  // Like terms: `a + 2*a` is `3*a`.
  let mut collected: Vec<(Atom, Number)> = Vec::with_capacity(others.len());
  for term in others.iter() {
    let (coefficient, rest) = split_coefficient(term);
    match collected.iter_mut().find(|(existing, _)| existing.same_q(&rest)) {
      Some((_, total)) => *total = total.clone() + coefficient,
      None             => collected.push((rest, coefficient)),
    }
  }
  let others: Vec<Atom> =
    collected.into_iter()
             .filter(|(_, coefficient)| !(coefficient.is_zero() && coefficient.is_exact()))
             .map(|(term, coefficient)| with_coefficient(coefficient, term))
             .collect();

  let number = if sum.is_zero() && !others.is_empty() { None } else { Some(sum) };
  let head = Atom::Symbol(*sys::PLUS);
  Ok(Some(assemble(head, number, others, Atom::integer(0), original)))
}

/// Implements calls matching
///     `Times[factors___]`
pub(crate) fn Times(arguments: &Arguments, original: &Atom, _: &mut Evaluation) -> BuiltinResult {
  let factors = arguments.sequence("factors");
  let (product, others) = fold_numbers(&factors, Number::Exact(BigRational::one()), |a, b| a * b);

  if product.is_zero() && product.is_exact() {
    return Ok(Some(Atom::integer(0)));
  }

  // Like factors: `x*x^2` is `x^3`. Only numeric exponents are added up.
  let mut collected: Vec<(Atom, Atom)> = Vec::with_capacity(others.len());
  let mut combined = false;
  for factor in others.iter() {
    let (base, exponent) = split_exponent(factor);
    let sum = collected.iter()
                       .position(|(existing, _)| existing.same_q(&base))
                       .and_then(|position| {
                         let total = Number::from_atom(&collected[position].1)?;
                         Some((position, total + Number::from_atom(&exponent)?))
                       });
    match sum {
      Some((position, sum)) => {
        collected[position].1 = sum.to_atom();
        combined = true;
      }
      None => collected.push((base, exponent)),
    }
  }
  let others: Vec<Atom> =
    if combined {
      collected.into_iter()
               .map(|(base, exponent)| {
                 if exponent == Atom::integer(1) {
                   base
                 } else {
                   SExpression::with_head(*sys::POWER, vec![base, exponent])
                 }
               })
               .collect()
    } else {
      others
    };

  let number = if product.is_one() && product.is_exact() && !others.is_empty() { None } else { Some(product) };
  let head = Atom::Symbol(*sys::TIMES);
  Ok(Some(assemble(head, number, others, Atom::integer(1), original)))
}

// endregion

// region Power

/// `base^exponent` for an exact base and an integer exponent.
fn exact_power(base: &BigRational, exponent: &BigInt) -> Option<BigRational> {
  let magnitude = exponent.abs().to_u32().filter(|e| *e <= MAX_EXACT_EXPONENT)?;
  let numerator = num_traits::pow(base.numer().clone(), magnitude as usize);
  let denominator = num_traits::pow(base.denom().clone(), magnitude as usize);
  if exponent.is_negative() {
    if numerator.is_zero() {
      return None;
    }
    Some(BigRational::new(denominator, numerator))
  } else {
    Some(BigRational::new(numerator, denominator))
  }
}

/// The exact `n`th root of a nonnegative `base`, if it has one.
fn exact_root(base: &BigRational, n: &BigInt) -> Option<BigRational> {
  let n = n.to_u32().filter(|n| *n <= MAX_EXACT_EXPONENT)?;
  if base.is_negative() {
    return None;
  }
  let numerator = base.numer().nth_root(n);
  let denominator = base.denom().nth_root(n);
  let root = BigRational::new(numerator, denominator);
  if exact_power(&root, &BigInt::from(n)).as_ref() == Some(base) {
    Some(root)
  } else {
    None
  }
}

/// Implements calls matching
///     `Power[base_, exponent_]`
pub(crate) fn Power(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> BuiltinResult {
  let (base, exponent) = match (arguments.get("base"), arguments.get("exponent")) {
    (Some(base), Some(exponent)) => (base, exponent),
    _                            => return Ok(None),
  };

  if exponent == &Atom::integer(1) {
    return Ok(Some(base.clone()));
  }
  if exponent == &Atom::integer(0) {
    return if base.is_zero() { Ok(None) } else { Ok(Some(Atom::integer(1))) };
  }
  if base == &Atom::integer(1) {
    return Ok(Some(Atom::integer(1)));
  }

  // `(x^a)^n` is `x^(a*n)` for an integer `n`.
  if base.has_form(*sys::POWER, Some(2)) && matches!(exponent, Atom::Integer(_)) {
    let inner = base.elements();
    let product = SExpression::with_head(*sys::TIMES, vec![inner[1].clone(), exponent.clone()]);
    return Ok(Some(SExpression::with_head(*sys::POWER, vec![inner[0].clone(), product])));
  }

  let (b, e) = match (Number::from_atom(base), Number::from_atom(exponent)) {
    (Some(b), Some(e)) => (b, e),
    _                  => return Ok(None),
  };

  match (&b, &e) {
    (Number::Exact(b), Number::Exact(e)) => {
      if e.is_integer() {
        return Ok(exact_power(b, e.numer()).map(Atom::rational));
      }
      // `4^(3/2)` is `8`, `2^(1/2)` stays.
      let root = match exact_root(b, e.denom()) {
        Some(root) => root,
        None       => return Ok(None),
      };
      Ok(exact_power(&root, e.numer()).map(Atom::rational))
    }
    _ => {
      let value = b.to_f64().powf(e.to_f64());
      if value.is_finite() {
        Ok(Some(Atom::Real(value)))
      } else {
        Ok(None)
      }
    }
  }
}

// endregion

// region N

/// The numeric value of `atom` at `precision`. Only machine precision is supported, so `precision` serves to look
/// up `NValues`.
fn numeric_value(evaluation: &mut Evaluation, atom: &Atom, precision: &Atom) -> Result<Atom, ControlSignal> {
  match atom {
    Atom::Integer(_) | Atom::Rational(_) => Ok(Atom::Real(atom.to_f64().unwrap_or(f64::NAN))),

    Atom::Complex(parts) => {
      let re = numeric_value(evaluation, &parts.0, precision)?;
      let im = numeric_value(evaluation, &parts.1, precision)?;
      Ok(Atom::complex(re, im))
    }

    Atom::Symbol(name) => {
      let query = SExpression::with_head(*sys::N, vec![atom.clone(), precision.clone()]);
      match evaluation.get_value(*name, Category::N, &query)? {
        Some(value) => {
          let value = evaluation.evaluate(&value)?;
          numeric_value(evaluation, &value, precision)
        }
        None => Ok(atom.clone()),
      }
    }

    Atom::Expression(expression) => {
      if let Some(name) = atom.lookup_name() {
        let query = SExpression::with_head(*sys::N, vec![atom.clone(), precision.clone()]);
        if let Some(value) = evaluation.get_value(name, Category::N, &query)? {
          return evaluation.evaluate(&value);
        }
      }

      let attributes = match expression.head().symbol_name() {
        Some(head) => evaluation.attributes(head),
        None       => Default::default(),
      };
      let hold_all = attributes.get(Attribute::NHoldAll);
      let hold_first = hold_all || attributes.get(Attribute::NHoldFirst);
      let hold_rest = hold_all || attributes.get(Attribute::NHoldRest);

      let mut elements = Vec::with_capacity(expression.len());
      for (index, element) in expression.elements().iter().enumerate() {
        let held = if index == 0 { hold_first } else { hold_rest };
        if held {
          elements.push(element.clone());
        } else {
          elements.push(numeric_value(evaluation, element, precision)?);
        }
      }
      Ok(atom.with_elements(elements))
    }

    _ => Ok(atom.clone()),
  }
}

/// Implements calls matching
///     `N[x_]`
pub(crate) fn N(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  match arguments.get("x") {
    Some(x) => {
      let precision = Atom::Symbol(*sys::MACHINE_PRECISION);
      Ok(Some(numeric_value(evaluation, x, &precision)?))
    }
    None => Ok(None),
  }
}

/// Implements calls matching
///     `N[x_, precision_]`
pub(crate) fn NPrecision(arguments: &Arguments, _: &Atom, evaluation: &mut Evaluation) -> BuiltinResult {
  match (arguments.get("x"), arguments.get("precision")) {
    (Some(x), Some(precision)) => Ok(Some(numeric_value(evaluation, x, precision)?)),
    _                          => Ok(None),
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

  #[test]
  fn number_arithmetic() {
    let a = Number::Exact(BigRational::new(BigInt::from(1), BigInt::from(2)));
    let b = Number::Exact(BigRational::new(BigInt::from(1), BigInt::from(3)));
    assert_eq!((a.clone() + b).to_atom().to_string(), "5/6");
    assert_eq!(a * Number::Machine(3.0), Number::Machine(1.5));
  }

  #[test]
  fn sums() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "1 + 2"), "3");
    assert_eq!(run(&mut session, "1/2 + 1/3"), "5/6");
    assert_eq!(run(&mut session, "1 + 0.5"), "1.5");
    assert_eq!(run(&mut session, "Plus[]"), "0");
    assert_eq!(run(&mut session, "a + a"), "2*a");
    assert_eq!(run(&mut session, "a + 2*a - 3*a"), "0");
    assert_eq!(run(&mut session, "b + a + 1"), "1 + a + b");
  }

  #[test]
  fn products() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "2*3"), "6");
    assert_eq!(run(&mut session, "Times[]"), "1");
    assert_eq!(run(&mut session, "0*a"), "0");
    assert_eq!(run(&mut session, "x*x"), "x^2");
    assert_eq!(run(&mut session, "x^2/x"), "x");
    assert_eq!(run(&mut session, "6/4"), "3/2");
  }

  #[test]
  fn powers() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "2^10"), "1024");
    assert_eq!(run(&mut session, "2^-2"), "1/4");
    assert_eq!(run(&mut session, "(2/3)^2"), "4/9");
    assert_eq!(run(&mut session, "4^0.5"), "2.");
    assert_eq!(run(&mut session, "x^0"), "1");
    assert_eq!(run(&mut session, "x^1"), "x");
    assert_eq!(run(&mut session, "2^(1/2)"), "2^(1/2)");
    assert_eq!(run(&mut session, "4^(3/2)"), "8");
    assert_eq!(run(&mut session, "(8/27)^(-1/3)"), "3/2");
    assert_eq!(run(&mut session, "(-8)^(1/3)"), "(-8)^(1/3)");
    assert_eq!(run(&mut session, "(x^2)^3"), "x^6");
  }

  #[test]
  fn numeric_values() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "N[1/4]"), "0.25");
    assert_eq!(run(&mut session, "N[{1, 1/2}]"), "{1., 0.5}");
    assert_eq!(run(&mut session, "N[c]"), "c");
    run(&mut session, "N[c] = 2.5");
    assert_eq!(run(&mut session, "N[c + 1]"), "3.5");
    assert_eq!(run(&mut session, "N[f[1]]"), "f[1.]");
  }
}
