/*!

Primitive expression node types.

An `Atom` is either a leaf (a symbol, number, or string) or a compound `Expression` behind an `Arc`. Atoms are
immutable. Rewriting an expression builds a new spine and shares every untouched subtree with the original.

*/

use std::{
  hash::{Hash, Hasher},
  sync::Arc
};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero, One};
use strum_macros::{EnumDiscriminants, IntoStaticStr};

use crate::{
  expression::Expression,
  interner::{interned, resolve_str, InternedString},
  system_symbols as sys,
};

#[derive(Clone, Debug, IntoStaticStr, EnumDiscriminants)]
#[strum_discriminants(name(AtomKind))]
pub enum Atom {
  String(Arc<str>),
  Integer(BigInt),
  Rational(Arc<BigRational>),
  /// Machine precision only.
  Real(f64),
  /// `(real part, imaginary part)`, each an exact or machine number.
  Complex(Arc<(Atom, Atom)>),
  Symbol(InternedString),
  Expression(Arc<Expression>),
}


impl Atom {

  // region Construction

  pub fn integer(value: i64) -> Atom {
    Atom::Integer(BigInt::from(value))
  }

  pub fn real(value: f64) -> Atom {
    Atom::Real(value)
  }

  pub fn string(value: &str) -> Atom {
    Atom::String(Arc::from(value))
  }

  pub fn symbol(name: &str) -> Atom {
    Atom::Symbol(interned(name))
  }

  /// Builds an exact number, demoting to an `Integer` when the denominator is 1.
  pub fn rational(value: BigRational) -> Atom {
    if value.denom().is_one() {
      Atom::Integer(value.numer().clone())
    } else {
      Atom::Rational(Arc::new(value))
    }
  }

  pub fn complex(re: Atom, im: Atom) -> Atom {
    Atom::Complex(Arc::new((re, im)))
  }

  pub fn boolean(value: bool) -> Atom {
    if value {
      Atom::Symbol(*sys::TRUE)
    } else {
      Atom::Symbol(*sys::FALSE)
    }
  }

  // endregion

  /// The head of `self`. Atoms have a symbolic head naming their kind.
  pub fn head(&self) -> Atom {
    match self {
      Atom::String(_)     => Atom::Symbol(*sys::STRING),
      Atom::Integer(_)    => Atom::Symbol(*sys::INTEGER),
      Atom::Rational(_)   => Atom::Symbol(*sys::RATIONAL),
      Atom::Real(_)       => Atom::Symbol(*sys::REAL),
      Atom::Complex(_)    => Atom::Symbol(*sys::COMPLEX),
      Atom::Symbol(_)     => Atom::Symbol(*sys::SYMBOL),
      Atom::Expression(e) => e.head().clone(),
    }
  }

  /// Reports the `AtomKind` of `self`.
  pub fn kind(&self) -> AtomKind {
    self.into()
  }

  pub fn is_atom(&self) -> bool {
    !matches!(self, Atom::Expression(_))
  }

  pub fn is_expression(&self) -> bool {
    matches!(self, Atom::Expression(_))
  }

  pub fn as_expression(&self) -> Option<&Expression> {
    match self {
      Atom::Expression(e) => Some(e.as_ref()),
      _                   => None
    }
  }

  /// The elements of a compound expression. Atoms have none.
  pub fn elements(&self) -> &[Atom] {
    match self {
      Atom::Expression(e) => e.elements(),
      _                   => &[]
    }
  }

  pub fn len(&self) -> usize {
    self.elements().len()
  }

  pub fn is_empty(&self) -> bool {
    self.elements().is_empty()
  }

  // region Names

  /// The name if `self` is a symbol.
  pub fn symbol_name(&self) -> Option<InternedString> {
    match self {
      Atom::Symbol(name) => Some(*name),
      _                  => None
    }
  }

  /// The name of the head if the head is a symbol. Atoms report the name of their kind.
  pub fn head_name(&self) -> Option<InternedString> {
    match self {
      Atom::Expression(e) => e.head().symbol_name(),
      atom                => atom.head().symbol_name(),
    }
  }

  /// Gives the symbol under which the properties of this expression would be stored in the symbol table: the
  /// leftmost head, `f` in `f[x][y]`.
  pub fn lookup_name(&self) -> Option<InternedString> {
    let mut current = self;
    loop {
      match current {
        Atom::Symbol(name)  => return Some(*name),
        Atom::Expression(e) => current = e.head(),
        _                   => return None,
      }
    }
  }

  pub fn is_symbol(&self, name: InternedString) -> bool {
    matches!(self, Atom::Symbol(s) if *s == name)
  }

  /// Is `self` an expression with head `head` and, if given, exactly `length` elements?
  pub fn has_form(&self, head: InternedString, length: Option<usize>) -> bool {
    match self {
      Atom::Expression(e) => {
        e.head().is_symbol(head) && length.map_or(true, |n| e.len() == n)
      }
      _ => false
    }
  }

  /// Is `self` an expression with head `head` and a length in `min..=max`?
  pub fn has_form_range(&self, head: InternedString, min: usize, max: usize) -> bool {
    match self {
      Atom::Expression(e) => e.head().is_symbol(head) && (min..=max).contains(&e.len()),
      _                   => false
    }
  }

  // endregion

  // region Predicates and conversions

  /// Is `atom` the symbol `True`
  pub fn is_true(&self) -> bool {
    self.is_symbol(*sys::TRUE)
  }

  pub fn is_false(&self) -> bool {
    self.is_symbol(*sys::FALSE)
  }

  pub fn is_null(&self) -> bool {
    self.is_symbol(*sys::NULL)
  }

  /// If `self` has the form `Sequence[a, b, …]`, returns the children `a, b, …`.
  pub fn sequence_elements(&self) -> Option<&[Atom]> {
    match self {
      Atom::Expression(e) if e.head().is_symbol(*sys::SEQUENCE) => Some(e.elements()),
      _ => None
    }
  }

  pub fn is_number(&self) -> bool {
    matches!(self, Atom::Integer(_) | Atom::Rational(_) | Atom::Real(_) | Atom::Complex(_))
  }

  pub fn is_exact_number(&self) -> bool {
    match self {
      Atom::Integer(_) | Atom::Rational(_) => true,
      Atom::Complex(parts)                 => parts.0.is_exact_number() && parts.1.is_exact_number(),
      _                                    => false
    }
  }

  pub fn is_zero(&self) -> bool {
    match self {
      Atom::Integer(n)  => n.is_zero(),
      Atom::Rational(q) => q.is_zero(),
      Atom::Real(x)     => *x == 0.0,
      _                 => false
    }
  }

  pub fn to_i64(&self) -> Option<i64> {
    match self {
      Atom::Integer(n) => n.to_i64(),
      _                => None
    }
  }

  pub fn to_usize(&self) -> Option<usize> {
    match self {
      Atom::Integer(n) => n.to_usize(),
      _                => None
    }
  }

  /// The value of a real number as a machine float.
  pub fn to_f64(&self) -> Option<f64> {
    match self {
      Atom::Integer(n)  => n.to_f64(),
      Atom::Rational(q) => q.to_f64(),
      Atom::Real(x)     => Some(*x),
      _                 => None
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Atom::String(s) => Some(s.as_ref()),
      _               => None
    }
  }

  /// The fully qualified name of a symbol, or `None`.
  pub fn symbol_str(&self) -> Option<&'static str> {
    self.symbol_name().map(resolve_str)
  }

  // endregion

  /// A new expression with the same head as `self` and the given elements. For an atom, this is `self`.
  pub fn with_elements(&self, elements: Vec<Atom>) -> Atom {
    match self {
      Atom::Expression(e) => SExpression::new(e.head().clone(), elements),
      atom                => atom.clone()
    }
  }

  /// Syntactic identity.
  pub fn same_q(&self, other: &Atom) -> bool {
    self == other
  }

  /// Replaces every symbol bound in `bindings` with its value. Used to instantiate templates.
  pub fn replace_symbols<F>(&self, lookup: &F) -> Atom
    where F: Fn(InternedString) -> Option<Atom>
  {
    match self {
      Atom::Symbol(name) => lookup(*name).unwrap_or_else(|| self.clone()),

      Atom::Expression(e) => {
        let head = e.head().replace_symbols(lookup);
        let mut changed = head != *e.head();
        let mut elements = Vec::with_capacity(e.len());
        for element in e.elements() {
          let new_element = element.replace_symbols(lookup);
          if !changed && new_element != *element {
            changed = true;
          }
          elements.push(new_element);
        }
        if changed {
          SExpression::new(head, elements)
        } else {
          self.clone()
        }
      }

      _ => self.clone()
    }
  }

  /// Does a symbol named `name` occur anywhere in `self`, heads included?
  pub fn contains_symbol(&self, name: InternedString) -> bool {
    match self {
      Atom::Symbol(s)     => *s == name,
      Atom::Expression(e) => e.head().contains_symbol(name) || e.elements().iter().any(|c| c.contains_symbol(name)),
      _                   => false
    }
  }
}


impl PartialEq for Atom {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Atom::String(a), Atom::String(b))         => a == b,
      (Atom::Integer(a), Atom::Integer(b))       => a == b,
      (Atom::Rational(a), Atom::Rational(b))     => a == b,
      // Bitwise, so that `Eq` and `Hash` agree.
      (Atom::Real(a), Atom::Real(b))             => a.to_bits() == b.to_bits(),
      (Atom::Complex(a), Atom::Complex(b))       => a == b,
      (Atom::Symbol(a), Atom::Symbol(b))         => a == b,
      (Atom::Expression(a), Atom::Expression(b)) => Arc::ptr_eq(a, b) || a == b,
      _                                          => false
    }
  }
}

impl Eq for Atom {}

/**
  If two expressions just happen to have the same representation, a string and a symbol, we still want their hashes
  to differ. So we hash a type-specific prefix before hashing the data. The prefixes are those of expreduce.

  ```text
      real      : [195, 244, 76 , 249, 227, 115, 88 , 251]
      complex   : [82 , 226, 223, 39 , 113, 26 , 149, 249]
      expression: [72 , 5  , 244, 86 , 5  , 210, 69 , 30]
      integer   : [242, 99 , 84 , 113, 102, 46 , 118, 94]
      rational  : [90 , 82 , 214, 51 , 52 , 7  , 7  , 33]
      string    : [102, 206, 57 , 172, 207, 100, 198, 133]
      symbol    : [107, 10 , 247, 23 , 33 , 221, 163, 156]
  ```

*/
impl Hash for Atom {
  fn hash<H: Hasher>(&self, hasher: &mut H) {
    match self {
      Atom::String(v) => {
        hasher.write(&[102, 206, 57 , 172, 207, 100, 198, 133]);
        v.hash(hasher);
      }

      Atom::Integer(v) => {
        hasher.write(&[242, 99, 84, 113, 102, 46, 118, 94]);
        v.hash(hasher)
      }

      Atom::Rational(v) => {
        hasher.write(&[90 , 82 , 214, 51 , 52 , 7  , 7  , 33]);
        v.hash(hasher)
      }

      Atom::Real(v) => {
        hasher.write(&[195, 244, 76 , 249, 227, 115, 88 , 251]);
        v.to_bits().hash(hasher);
      }

      Atom::Complex(v) => {
        hasher.write(&[82 , 226, 223, 39 , 113, 26 , 149, 249]);
        v.0.hash(hasher);
        v.1.hash(hasher);
      }

      Atom::Symbol(v) => {
        hasher.write(&[107, 10 , 247, 23 , 33 , 221, 163, 156]);
        v.hash(hasher);
      }

      Atom::Expression(v) => {
        hasher.write(&[72 , 5  , 244, 86 , 5  , 210, 69 , 30]);
        v.head().hash(hasher);
        for part in v.elements() {
          part.hash(hasher);
        }
      }

    }
  }
}

impl From<i64> for Atom {
  fn from(value: i64) -> Self {
    Atom::integer(value)
  }
}

impl From<BigInt> for Atom {
  fn from(value: BigInt) -> Self {
    Atom::Integer(value)
  }
}

impl From<f64> for Atom {
  fn from(value: f64) -> Self {
    Atom::Real(value)
  }
}

impl From<bool> for Atom {
  fn from(value: bool) -> Self {
    Atom::boolean(value)
  }
}


#[allow(non_snake_case)]
pub mod Symbol {
  use crate::atom::Atom;
  use crate::interner::{
    interned,
    interned_static
  };

  /// We often have a need to create an expression for some standard built-in or stdlib symbol.
  pub fn from_static_str(name: &'static str) -> Atom {
    Atom::Symbol(interned_static(name))
  }

  /// Create a symbol from a `&str`.
  pub fn from_str(name: &str) -> Atom {
    Atom::Symbol(interned(name))
  }

}

#[allow(non_snake_case)]
pub mod SExpression {
  use std::sync::Arc;

  use crate::{
    atom::Atom,
    expression::Expression,
    interner::InternedString,
    system_symbols as sys,
  };

  // region Convenience construction functions
  // Using these functions decreases the probability of an incorrectly constructed expression.

  /// Creates a new `Atom::Expression` having head `head` and children `elements`.
  pub fn new(head: Atom, elements: Vec<Atom>) -> Atom {
    Atom::Expression(Arc::new(Expression::new(head, elements)))
  }

  /// Creates a new expression whose head is the symbol `head`.
  pub fn with_head(head: InternedString, elements: Vec<Atom>) -> Atom {
    new(Atom::Symbol(head), elements)
  }

  pub fn list(elements: Vec<Atom>) -> Atom {
    with_head(*sys::LIST, elements)
  }

  /// Creates a `Sequence[]` with the provided children.
  pub fn sequence(elements: Vec<Atom>) -> Atom {
    with_head(*sys::SEQUENCE, elements)
  }

  /// Creates an empty `Sequence[]`.
  pub fn empty_sequence() -> Atom {
    with_head(*sys::SEQUENCE, vec![])
  }

  pub fn hold(expression: Atom) -> Atom {
    with_head(*sys::HOLD, vec![expression])
  }

  pub fn rule(lhs: Atom, rhs: Atom) -> Atom {
    with_head(*sys::RULE, vec![lhs, rhs])
  }

  pub fn rule_delayed(lhs: Atom, rhs: Atom) -> Atom {
    with_head(*sys::RULE_DELAYED, vec![lhs, rhs])
  }

  pub fn hold_pattern(pattern: Atom) -> Atom {
    with_head(*sys::HOLD_PATTERN, vec![pattern])
  }

  pub fn message_name(symbol: InternedString, tag: &str) -> Atom {
    with_head(*sys::MESSAGE_NAME, vec![Atom::Symbol(symbol), Atom::string(tag)])
  }

  // endregion
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn heads_of_atoms() {
    assert!(Atom::integer(3).head().is_symbol(*sys::INTEGER));
    assert!(Atom::real(3.0).head().is_symbol(*sys::REAL));
    assert!(Atom::string("a").head().is_symbol(*sys::STRING));
    assert!(Symbol::from_str("Global`x").head().is_symbol(*sys::SYMBOL));
  }

  #[test]
  fn lookup_name_is_leftmost_head() {
    let f = Symbol::from_str("Global`f");
    let inner = SExpression::new(f.clone(), vec![Atom::integer(1)]);
    let outer = SExpression::new(inner, vec![Atom::integer(2)]);
    assert_eq!(outer.lookup_name(), f.symbol_name());
    assert_eq!(outer.head_name(), None);
  }

  #[test]
  fn equality_is_syntactic() {
    let a = SExpression::list(vec![Atom::integer(1), Atom::real(1.0)]);
    let b = SExpression::list(vec![Atom::integer(1), Atom::real(1.0)]);
    let c = SExpression::list(vec![Atom::integer(1), Atom::integer(1)]);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(Atom::string("x"), Symbol::from_str("x"));
  }

  #[test]
  fn rational_demotes_to_integer() {
    let q = BigRational::new(BigInt::from(4), BigInt::from(2));
    assert_eq!(Atom::rational(q), Atom::integer(2));
  }

  #[test]
  fn replace_symbols_shares_untouched_subtrees() {
    let x = interned("Global`x");
    let untouched = SExpression::list(vec![Atom::integer(1)]);
    let expression = SExpression::list(vec![Atom::Symbol(x), untouched.clone()]);
    let replaced = expression.replace_symbols(&|name| if name == x { Some(Atom::integer(5)) } else { None });

    assert_eq!(replaced.elements()[0], Atom::integer(5));
    match (&replaced.elements()[1], &untouched) {
      (Atom::Expression(a), Atom::Expression(b)) => assert!(Arc::ptr_eq(a, b)),
      _ => panic!("expected expressions")
    }
  }
}
