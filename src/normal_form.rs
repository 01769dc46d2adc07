/*!

# Canonical Order

The elements of an `Orderless` expression are kept sorted in a fixed, total, canonical order so that
`f[b, a]` and `f[a, b]` are the same expression. The order is that of `Sort`:

 1. Numbers, by value. Exact numbers precede inexact numbers of equal value.
 2. Strings, alphabetically.
 3. Symbols, by short name, then by full (context qualified) name.
 4. Compound expressions, by head, then by length, then element by element.

The system does not account for distributive functions, so mathematical expressions are not semantically unique
with respect to canonical order. They are only unique with respect to the chosen total ordering, associativity and
commutativity.

*/

use std::cmp::Ordering;

use num_rational::BigRational;

use crate::{
  atom::Atom,
  interner::resolve_str,
};

/// A total order on all expressions.
///
/// The total ordering of expressions does not use Rust's in-built `Ord` trait, because implementors may have a
/// different ordering that is natural for the type, and normalization does not require Rust's ordering machinery.
pub trait NormalFormOrder {
  fn cmp(&self, other: &Self) -> Ordering;

  fn is_greater(&self, other: &Self) -> bool {
      self.cmp(other) == Ordering::Greater
  }

  fn is_less(&self, other: &Self) -> bool {
      self.cmp(other) == Ordering::Less
  }
}

fn class_rank(atom: &Atom) -> u8 {
  match atom {
    Atom::Integer(_)
    | Atom::Rational(_)
    | Atom::Real(_)
    | Atom::Complex(_)    => 0,
    Atom::String(_)       => 1,
    Atom::Symbol(_)       => 2,
    Atom::Expression(_)   => 3,
  }
}

fn exactness_rank(atom: &Atom) -> u8 {
  match atom {
    Atom::Integer(_)  => 0,
    Atom::Rational(_) => 1,
    Atom::Real(_)     => 2,
    _                 => 3,
  }
}

fn as_rational(atom: &Atom) -> Option<BigRational> {
  match atom {
    Atom::Integer(n)  => Some(BigRational::from_integer(n.clone())),
    Atom::Rational(q) => Some(q.as_ref().clone()),
    _                 => None,
  }
}

fn real_part(atom: &Atom) -> &Atom {
  match atom {
    Atom::Complex(parts) => &parts.0,
    atom                 => atom,
  }
}

fn imaginary_part(atom: &Atom) -> Option<&Atom> {
  match atom {
    Atom::Complex(parts) => Some(&parts.1),
    _                    => None,
  }
}

fn compare_real_values(a: &Atom, b: &Atom) -> Ordering {
  if let (Some(x), Some(y)) = (as_rational(a), as_rational(b)) {
    return x.cmp(&y);
  }
  let x = a.to_f64().unwrap_or(f64::NAN);
  let y = b.to_f64().unwrap_or(f64::NAN);
  x.partial_cmp(&y).unwrap_or(Ordering::Equal)
}

fn compare_numbers(a: &Atom, b: &Atom) -> Ordering {
  compare_real_values(real_part(a), real_part(b))
    .then_with(|| {
      match (imaginary_part(a), imaginary_part(b)) {
        (None, None)       => Ordering::Equal,
        (None, Some(_))    => Ordering::Less,
        (Some(_), None)    => Ordering::Greater,
        (Some(x), Some(y)) => compare_real_values(x, y),
      }
    })
    .then_with(|| exactness_rank(a).cmp(&exactness_rank(b)))
    .then_with(|| {
      // Same value, same kind, different representation, e.g. 0. and -0.
      match (a.to_f64(), b.to_f64()) {
        (Some(x), Some(y)) => x.to_bits().cmp(&y.to_bits()),
        _                  => Ordering::Equal
      }
    })
}

fn short_name(name: &str) -> &str {
  match name.rfind('`') {
    Some(position) => &name[position + 1..],
    None           => name
  }
}

fn compare_strings(a: &str, b: &str) -> Ordering {
  a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| b.cmp(a))
}

impl NormalFormOrder for Atom {
  fn cmp(&self, other: &Self) -> Ordering {
    let rank = class_rank(self).cmp(&class_rank(other));
    if rank != Ordering::Equal {
      return rank;
    }

    match (self, other) {
      (Atom::String(a), Atom::String(b)) => compare_strings(a, b),

      (Atom::Symbol(a), Atom::Symbol(b)) => {
        if a == b {
          return Ordering::Equal;
        }
        let (a, b) = (resolve_str(*a), resolve_str(*b));
        compare_strings(short_name(a), short_name(b)).then_with(|| a.cmp(b))
      }

      (Atom::Expression(a), Atom::Expression(b)) => {
        NormalFormOrder::cmp(a.head(), b.head())
          .then_with(|| a.len().cmp(&b.len()))
          .then_with(|| {
            for (x, y) in a.elements().iter().zip(b.elements()) {
              let ordering = NormalFormOrder::cmp(x, y);
              if ordering != Ordering::Equal {
                return ordering;
              }
            }
            Ordering::Equal
          })
      }

      // Both numbers.
      (a, b) => compare_numbers(a, b),
    }
  }
}

/// Sorts `elements` into canonical order.
pub fn sort_canonical(elements: &mut [Atom]) {
  elements.sort_by(|a, b| NormalFormOrder::cmp(a, b));
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::atom::{Symbol, SExpression};

  #[test]
  fn numbers_before_strings_before_symbols_before_expressions() {
    let mut elements = vec![
      SExpression::new(Symbol::from_str("Global`f"), vec![]),
      Symbol::from_str("Global`x"),
      Atom::string("a"),
      Atom::integer(1),
    ];
    sort_canonical(&mut elements);
    assert_eq!(elements[0], Atom::integer(1));
    assert_eq!(elements[1], Atom::string("a"));
    assert_eq!(elements[2], Symbol::from_str("Global`x"));
  }

  #[test]
  fn numbers_by_value() {
    let mut elements = vec![Atom::real(2.5), Atom::integer(3), Atom::integer(-1), Atom::real(3.0)];
    sort_canonical(&mut elements);
    assert_eq!(elements, vec![Atom::integer(-1), Atom::real(2.5), Atom::integer(3), Atom::real(3.0)]);
  }

  #[test]
  fn symbols_by_short_name() {
    let a = Symbol::from_str("System`b");
    let b = Symbol::from_str("Global`a");
    assert!(b.is_less(&a));
  }

  #[test]
  fn expressions_by_head_then_length() {
    let f = Symbol::from_str("Global`f");
    let g = Symbol::from_str("Global`g");
    let f2 = SExpression::new(f.clone(), vec![Atom::integer(1), Atom::integer(2)]);
    let f1 = SExpression::new(f, vec![Atom::integer(9)]);
    let g0 = SExpression::new(g, vec![]);
    assert!(f1.is_less(&f2));
    assert!(f2.is_less(&g0));
  }
}
