/*!

The attributes of a symbol, e.g. `Flat`, `Listable`, ….

Attributes are implemented as a bitfield. They belong to the symbol, not to its value, and are stored in the
symbol's `Definition`.

*/

use std::{
  iter::Sum,
  ops::{Add, Index},
  str::FromStr
};

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// The variants are declared in alphabetical order, which is the order `Attributes[f]` reports them in.
#[derive(Copy, Clone, PartialEq, Eq, Display, IntoStaticStr, Debug, EnumString, EnumIter)]
#[repr(u32)]
pub enum Attribute {
  Constant = 0,
  /// Associative: `f[a, f[b, c]] == f[a, b, c]`.
  Flat,
  HoldAll,
  /// Not even `Evaluate`, `Unevaluated` or `Sequence` are looked at.
  HoldAllComplete,
  HoldFirst,
  HoldRest,
  /// The function is automatically threaded over lists: `f[{a, b, c}] == {f[a], f[b], f[c]}`.
  Listable,
  /// Attributes of the symbol cannot be changed.
  Locked,
  NHoldAll,
  NHoldFirst,
  NHoldRest,
  NumericFunction,
  /// `f[x] == x` for the purposes of pattern matching.
  OneIdentity,
  /// Commutative.
  Orderless,
  Protected,
  ReadProtected,
  SequenceHold,
  Stub,
  Temporary,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Default)]
pub struct Attributes(pub u32);

// These exist solely to be static references, which the `Index` trait insists on requiring.
static ATTRIBUTE_SET: bool = true;
static ATTRIBUTE_UNSET: bool = false;

impl Index<Attribute> for Attributes {
  type Output = bool;

  fn index(&self, index: Attribute) -> &Self::Output {
    if self.get(index) {
      &ATTRIBUTE_SET
    } else {
      &ATTRIBUTE_UNSET
    }
  }
}

impl From<Attribute> for Attributes {
  fn from(attribute: Attribute) -> Self {
    Attributes(1u32 << attribute as u32)
  }
}

impl From<&[Attribute]> for Attributes {
  fn from(attributes: &[Attribute]) -> Self {
    attributes.iter().map(|a| Attributes::from(*a)).sum()
  }
}

impl Attributes {
  pub fn new() -> Self {
    Attributes::default()
  }

  pub fn is_empty(&self) -> bool {
    self.0 == 0
  }

  pub fn update(&mut self, attributes: Attributes) {
    self.0 |= attributes.0;
  }

  pub fn remove(&mut self, attributes: Attributes) {
    self.0 &= !attributes.0;
  }

  pub fn contains(&self, attributes: Attributes) -> bool {
    self.0 & attributes.0 == attributes.0
  }

  /// The attribute named by a short symbol name, `"Flat"`, say.
  pub fn attribute_from_name(name: &str) -> Option<Attribute> {
    Attribute::from_str(name).ok()
  }

  /// The attributes that are set, in canonical order.
  pub fn iter(&self) -> impl Iterator<Item = Attribute> + '_ {
    Attribute::iter().filter(move |a| self.get(*a))
  }

  // region Convenience getters and setters

  pub fn get(&self, attribute: Attribute) -> bool {
    (self.0 & (1 << attribute as u32)) != 0
  }

  pub fn set(&mut self, attribute: Attribute) {
    self.0 |= 1 << attribute as u32
  }

  pub fn reset(&mut self, attribute: Attribute) {
    self.0 &= !(1 << attribute as u32)
  }

  pub fn flat(&self) -> bool {
    self.get(Attribute::Flat)
  }

  pub fn orderless(&self) -> bool {
    self.get(Attribute::Orderless)
  }

  pub fn one_identity(&self) -> bool {
    self.get(Attribute::OneIdentity)
  }

  pub fn listable(&self) -> bool {
    self.get(Attribute::Listable)
  }

  pub fn sequence_hold(&self) -> bool {
    self.get(Attribute::SequenceHold)
  }

  pub fn hold_first(&self) -> bool {
    self.get(Attribute::HoldFirst)
  }

  pub fn hold_rest(&self) -> bool {
    self.get(Attribute::HoldRest)
  }

  pub fn hold_all(&self) -> bool {
    self.get(Attribute::HoldAll)
  }

  pub fn hold_all_complete(&self) -> bool {
    self.get(Attribute::HoldAllComplete)
  }

  pub fn protected(&self) -> bool {
    self.get(Attribute::Protected)
  }

  pub fn locked(&self) -> bool {
    self.get(Attribute::Locked)
  }

  pub fn read_protected(&self) -> bool {
    self.get(Attribute::ReadProtected)
  }

  // endregion

}

// region Attribute addition implementations.

impl Sum<Attributes> for Attributes {
  fn sum<I: Iterator<Item=Attributes>>(iter: I) -> Self {
    let mut attributes: Attributes = Attributes::default();
    for a in iter{
      attributes.update(a);
    }
    attributes
  }
}

impl Add<Attribute> for Attributes {
  type Output = Self;

  fn add(mut self, other: Attribute) -> Self {
    self.set(other);
    self
  }
}

impl Add<Attribute> for Attribute {
  type Output = Attributes;

  fn add(self, other: Attribute) -> Attributes {
    Attributes::from(self) + other
  }
}

impl Add<Attributes> for Attributes {
  type Output = Self;

  fn add(mut self, other: Attributes) -> Self {
    self.update(other);
    self
  }
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn set_and_reset() {
    let mut attributes = Attribute::Flat + Attribute::Orderless;
    assert!(attributes.flat());
    assert!(attributes[Attribute::Orderless]);
    assert!(!attributes.protected());

    attributes.reset(Attribute::Flat);
    assert!(!attributes.flat());
    attributes.set(Attribute::Protected);
    assert!(attributes.protected());
  }

  #[test]
  fn names_round_trip() {
    assert_eq!(Attributes::attribute_from_name("HoldAllComplete"), Some(Attribute::HoldAllComplete));
    assert_eq!(Attributes::attribute_from_name("NotAnAttribute"), None);

    let attributes = Attribute::Protected + Attribute::Flat + Attribute::Listable;
    let names: Vec<String> = attributes.iter().map(|a| a.to_string()).collect();
    assert_eq!(names, vec!["Flat", "Listable", "Protected"]);
  }
}
