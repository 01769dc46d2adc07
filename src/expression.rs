/*!

A compound expression `head[e1, e2, …]`.

The head and elements are immutable once constructed. The only interior mutability is a handful of derived caches:
whether the expression is known to be flat and ordered, and the store generation at which it was last found to be
fully evaluated. Clearing or setting any of these never changes what the expression *is*, so they take no part in
equality or hashing.

*/

use std::{
  fmt::{Debug, Formatter},
  sync::atomic::{AtomicU64, AtomicU8, Ordering}
};

use crate::{
  atom::Atom,
  normal_form::NormalFormOrder,
};

// Cache flags
const FLAT_KNOWN   : u8 = 0b0001;
const FLAT         : u8 = 0b0010;
const ORDERED_KNOWN: u8 = 0b0100;
const ORDERED      : u8 = 0b1000;

pub struct Expression {
  head        : Atom,
  elements    : Vec<Atom>,
  properties  : AtomicU8,
  /// The store generation at which this expression was found to be a fixed point. Zero means never.
  evaluated_at: AtomicU64,
}

impl Expression {
  pub fn new(head: Atom, elements: Vec<Atom>) -> Expression {
    Expression {
      head,
      elements,
      properties  : AtomicU8::new(0),
      evaluated_at: AtomicU64::new(0),
    }
  }

  pub fn head(&self) -> &Atom {
    &self.head
  }

  pub fn elements(&self) -> &[Atom] {
    &self.elements
  }

  pub fn len(&self) -> usize {
    self.elements.len()
  }

  pub fn is_empty(&self) -> bool {
    self.elements.is_empty()
  }

  // region Cached properties

  fn cached(&self, known: u8, value: u8, compute: impl FnOnce() -> bool) -> bool {
    let properties = self.properties.load(Ordering::Relaxed);
    if properties & known != 0 {
      return properties & value != 0;
    }
    let result = compute();
    self.properties.fetch_or(known | if result { value } else { 0 }, Ordering::Relaxed);
    result
  }

  /// No element has the same head as `self`. A `Flat` head needs no splicing when this holds.
  pub fn is_flat(&self) -> bool {
    self.cached(FLAT_KNOWN, FLAT, || {
      self.elements.iter().all(|e| !matches!(e, Atom::Expression(inner) if inner.head == self.head))
    })
  }

  /// The elements are in canonical order. An `Orderless` head needs no sorting when this holds.
  pub fn is_ordered(&self) -> bool {
    self.cached(ORDERED_KNOWN, ORDERED, || {
      self.elements.windows(2).all(|pair| !pair[0].is_greater(&pair[1]))
    })
  }

  /// Records that the expression was built flat. Only call this if it is true.
  pub fn set_flat(&self) {
    self.properties.fetch_or(FLAT_KNOWN | FLAT, Ordering::Relaxed);
  }

  /// Records that the expression was built in canonical order. Only call this if it is true.
  pub fn set_ordered(&self) {
    self.properties.fetch_or(ORDERED_KNOWN | ORDERED, Ordering::Relaxed);
  }

  /// Is `self` known to be fully evaluated with respect to the definitions as they stood at `generation`?
  pub fn is_fully_evaluated(&self, generation: u64) -> bool {
    generation != 0 && self.evaluated_at.load(Ordering::Relaxed) == generation
  }

  pub fn set_fully_evaluated(&self, generation: u64) {
    self.evaluated_at.store(generation, Ordering::Relaxed);
  }

  pub fn clear_cache(&self) {
    self.properties.store(0, Ordering::Relaxed);
    self.evaluated_at.store(0, Ordering::Relaxed);
  }

  // endregion
}

impl Clone for Expression {
  fn clone(&self) -> Self {
    Expression {
      head        : self.head.clone(),
      elements    : self.elements.clone(),
      properties  : AtomicU8::new(self.properties.load(Ordering::Relaxed)),
      evaluated_at: AtomicU64::new(self.evaluated_at.load(Ordering::Relaxed)),
    }
  }
}

impl PartialEq for Expression {
  fn eq(&self, other: &Self) -> bool {
    self.head == other.head && self.elements == other.elements
  }
}

impl Eq for Expression {}

impl Debug for Expression {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Expression")
     .field("head", &self.head)
     .field("elements", &self.elements)
     .finish()
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::atom::{Symbol, SExpression};

  #[test]
  fn cache_flags_do_not_affect_equality() {
    let f = Symbol::from_str("Global`f");
    let a = Expression::new(f.clone(), vec![Atom::integer(2), Atom::integer(1)]);
    let b = Expression::new(f.clone(), vec![Atom::integer(2), Atom::integer(1)]);

    assert!(!a.is_ordered());
    a.set_fully_evaluated(7);
    assert!(a.is_fully_evaluated(7));
    assert!(!a.is_fully_evaluated(8));
    assert_eq!(a, b);

    a.clear_cache();
    assert!(!a.is_fully_evaluated(7));
    assert_eq!(a, b);
  }

  #[test]
  fn flatness() {
    let f = Symbol::from_str("Global`f");
    let nested = SExpression::new(f.clone(), vec![Atom::integer(1)]);
    let outer = Expression::new(f.clone(), vec![nested, Atom::integer(2)]);
    assert!(!outer.is_flat());

    let flat = Expression::new(f, vec![Atom::integer(1), Atom::integer(2)]);
    assert!(flat.is_flat());
    assert!(flat.is_ordered());
  }
}
