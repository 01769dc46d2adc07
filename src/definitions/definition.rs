/*!

The rules and properties of a single symbol.

*/

use std::cmp::Ordering;

use fnv::FnvHashMap;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
  atom::Atom,
  attributes::Attributes,
  interner::InternedString,
  rules::Rule,
  system_symbols as sys,
};

/// The categories of rules a `Definition` keeps. The names are those of the symbols that query them.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum Category {
  #[strum(serialize = "OwnValues")]
  Own,
  #[strum(serialize = "DownValues")]
  Down,
  #[strum(serialize = "SubValues")]
  Sub,
  #[strum(serialize = "UpValues")]
  Up,
  #[strum(serialize = "NValues")]
  N,
  #[strum(serialize = "DefaultValues")]
  Default,
  #[strum(serialize = "FormatValues")]
  Format,
  #[strum(serialize = "Messages")]
  Message,
}

impl Category {
  /// The category queried by the symbol `name`, `DownValues` for `Category::Down` and so on.
  pub fn from_symbol(name: InternedString) -> Option<Category> {
    let categories = [
      (*sys::OWN_VALUES, Category::Own),
      (*sys::DOWN_VALUES, Category::Down),
      (*sys::SUB_VALUES, Category::Sub),
      (*sys::UP_VALUES, Category::Up),
      (*sys::N_VALUES, Category::N),
      (*sys::DEFAULT_VALUES, Category::Default),
      (*sys::FORMAT_VALUES, Category::Format),
      (*sys::MESSAGES, Category::Message),
    ];
    categories.iter().find(|(symbol, _)| *symbol == name).map(|(_, category)| *category)
  }
}

/// The form name under which format rules that apply to every form are kept.
pub const ALL_FORMS: &str = "";

#[derive(Clone, Debug)]
pub struct Definition {
  pub name         : InternedString,
  pub attributes   : Attributes,
  pub ownvalues    : Vec<Rule>,
  pub downvalues   : Vec<Rule>,
  pub subvalues    : Vec<Rule>,
  pub upvalues     : Vec<Rule>,
  pub nvalues      : Vec<Rule>,
  pub defaultvalues: Vec<Rule>,
  pub messages     : Vec<Rule>,
  /// Keyed by the fully qualified name of the form, or `ALL_FORMS`.
  pub formatvalues : FnvHashMap<String, Vec<Rule>>,
  /// Option name and value, in the order they were given.
  pub options      : Vec<(InternedString, Atom)>,
  /// The store generation of the last change to this definition.
  pub changed      : u64,
}

impl Definition {
  pub fn new(name: InternedString) -> Definition {
    Definition {
      name,
      attributes   : Attributes::default(),
      ownvalues    : vec![],
      downvalues   : vec![],
      subvalues    : vec![],
      upvalues     : vec![],
      nvalues      : vec![],
      defaultvalues: vec![],
      messages     : vec![],
      formatvalues : FnvHashMap::default(),
      options      : vec![],
      changed      : 0,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.attributes.is_empty()
        && self.ownvalues.is_empty()
        && self.downvalues.is_empty()
        && self.subvalues.is_empty()
        && self.upvalues.is_empty()
        && self.nvalues.is_empty()
        && self.defaultvalues.is_empty()
        && self.messages.is_empty()
        && self.formatvalues.values().all(Vec::is_empty)
        && self.options.is_empty()
  }

  /// The rules of `category`. Format rules of every form are returned together, the form-specific ones first.
  pub fn get_values(&self, category: Category) -> Vec<Rule> {
    match category {
      Category::Format => {
        let mut forms: Vec<&String> = self.formatvalues.keys().collect();
        // `ALL_FORMS` is the empty string, so reversing puts it last.
        forms.sort();
        forms.reverse();
        forms.iter().flat_map(|form| self.formatvalues[*form].iter().cloned()).collect()
      }
      category => self.values(category).to_vec(),
    }
  }

  fn values(&self, category: Category) -> &[Rule] {
    match category {
      Category::Own     => &self.ownvalues,
      Category::Down    => &self.downvalues,
      Category::Sub     => &self.subvalues,
      Category::Up      => &self.upvalues,
      Category::N       => &self.nvalues,
      Category::Default => &self.defaultvalues,
      Category::Message => &self.messages,
      Category::Format  => self.formatvalues.get(ALL_FORMS).map(|rules| rules.as_slice()).unwrap_or(&[]),
    }
  }

  fn values_mut(&mut self, category: Category) -> &mut Vec<Rule> {
    match category {
      Category::Own     => &mut self.ownvalues,
      Category::Down    => &mut self.downvalues,
      Category::Sub     => &mut self.subvalues,
      Category::Up      => &mut self.upvalues,
      Category::N       => &mut self.nvalues,
      Category::Default => &mut self.defaultvalues,
      Category::Message => &mut self.messages,
      Category::Format  => self.formatvalues.entry(ALL_FORMS.to_string()).or_default(),
    }
  }

  /// Replaces every rule of `category`. The rules are inserted one at a time so that they end up in order.
  pub fn set_values(&mut self, category: Category, rules: Vec<Rule>) {
    if category == Category::Format {
      self.formatvalues.clear();
    }
    let values = self.values_mut(category);
    values.clear();
    for rule in rules {
      insert_rule(values, rule);
    }
  }

  pub fn add_rule(&mut self, category: Category, rule: Rule) {
    insert_rule(self.values_mut(category), rule);
  }

  pub fn add_format(&mut self, form: &str, rule: Rule) {
    insert_rule(self.formatvalues.entry(form.to_string()).or_default(), rule);
  }

  /// Removes the rule of an own, down, sub or up value whose pattern is `lhs`.
  pub fn remove_rule(&mut self, lhs: &Atom) -> bool {
    for category in [Category::Own, Category::Down, Category::Sub, Category::Up] {
      let values = self.values_mut(category);
      if let Some(position) = values.iter().position(|rule| rule.pattern().same_q(lhs)) {
        values.remove(position);
        return true;
      }
    }
    false
  }

  /// What `Clear` clears.
  pub fn clear_values(&mut self) {
    self.ownvalues.clear();
    self.downvalues.clear();
    self.subvalues.clear();
    self.upvalues.clear();
    self.nvalues.clear();
    self.formatvalues.clear();
  }

  pub fn get_option(&self, name: InternedString) -> Option<&Atom> {
    self.options.iter().find(|(option, _)| *option == name).map(|(_, value)| value)
  }

  pub fn set_option(&mut self, name: InternedString, value: Atom) {
    match self.options.iter_mut().find(|(option, _)| *option == name) {
      Some(entry) => entry.1 = value,
      None        => self.options.push((name, value)),
    }
  }
}

/// Inserts `rule` before the first rule that is no more specific than it. An unconditional rule replaces an
/// unconditional rule with the same pattern.
pub fn insert_rule(values: &mut Vec<Rule>, rule: Rule) {
  if !rule.is_conditional() {
    let existing = values.iter()
                         .position(|r| !r.is_conditional() && r.pattern().same_q(rule.pattern()));
    if let Some(position) = existing {
      values.remove(position);
    }
  }
  let position = values.iter()
                       .position(|existing| existing.compare_key(&rule) != Ordering::Less)
                       .unwrap_or(values.len());
  values.insert(position, rule);
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    atom::{SExpression, Symbol},
    interner::interned,
    parsing::parse,
  };

  fn rule(pattern: &str, value: i64) -> Rule {
    Rule::template(parse(pattern).unwrap(), Atom::integer(value)).unwrap()
  }

  #[test]
  fn more_specific_rules_first_in_either_order() {
    let mut forwards = Definition::new(interned("Global`f"));
    forwards.add_rule(Category::Down, rule("f[x_Integer]", 1));
    forwards.add_rule(Category::Down, rule("f[x_]", 2));

    let mut backwards = Definition::new(interned("Global`f"));
    backwards.add_rule(Category::Down, rule("f[x_]", 2));
    backwards.add_rule(Category::Down, rule("f[x_Integer]", 1));

    for definition in [forwards, backwards] {
      let values = definition.get_values(Category::Down);
      assert_eq!(values.len(), 2);
      assert_eq!(values[0].pattern().to_string(), "f[x_Integer]");
      assert_eq!(values[1].pattern().to_string(), "f[x_]");
    }
  }

  #[test]
  fn same_pattern_replaces() {
    let mut definition = Definition::new(interned("Global`f"));
    definition.add_rule(Category::Down, rule("f[x_]", 1));
    definition.add_rule(Category::Down, rule("f[x_]", 2));
    let values = definition.get_values(Category::Down);
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].replacement(), Some(&Atom::integer(2)));
  }

  #[test]
  fn newest_of_equal_specificity_first() {
    let mut definition = Definition::new(interned("Global`f"));
    definition.add_rule(Category::Down, rule("f[x_]", 1));
    definition.add_rule(Category::Down, rule("f[y_]", 2));
    let values = definition.get_values(Category::Down);
    assert_eq!(values[0].replacement(), Some(&Atom::integer(2)));
  }

  #[test]
  fn conditional_rules_accumulate() {
    let mut definition = Definition::new(interned("Global`f"));
    definition.add_rule(Category::Down, rule("f[x_] /; x > 0", 1));
    definition.add_rule(Category::Down, rule("f[x_] /; x > 0", 2));
    assert_eq!(definition.get_values(Category::Down).len(), 2);
  }

  #[test]
  fn remove_by_pattern() {
    let mut definition = Definition::new(interned("Global`a"));
    let a = Symbol::from_str("Global`a");
    definition.add_rule(Category::Own, Rule::template(a.clone(), Atom::integer(1)).unwrap());
    assert!(definition.remove_rule(&a));
    assert!(!definition.remove_rule(&a));
    assert!(definition.is_empty());
  }

  #[test]
  fn options_keep_order() {
    let mut definition = Definition::new(interned("Global`f"));
    let a = interned("Global`a");
    let b = interned("Global`b");
    definition.set_option(a, Atom::integer(1));
    definition.set_option(b, Atom::integer(2));
    definition.set_option(a, SExpression::list(vec![]));
    assert_eq!(definition.options[0].0, a);
    assert_eq!(definition.get_option(a), Some(&SExpression::list(vec![])));
  }

  #[test]
  fn categories_by_symbol() {
    assert_eq!(Category::from_symbol(*sys::UP_VALUES), Some(Category::Up));
    assert_eq!(Category::Down.to_string(), "DownValues");
    assert_eq!(Category::from_symbol(*sys::LIST), None);
  }
}
