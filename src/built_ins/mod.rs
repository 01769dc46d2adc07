/*!

# Built-in Functions

The functions, constants and messages of the `System`` context that the core itself provides. Everything else in the
language is meant to be defined on top of these.

A built-in is a function with the `NativeFn` signature, named after the symbol it implements, and is attached to
that symbol by `register_builtin!` together with the pattern it handles:

```ignore
register_builtin!(definitions, If, "If[condition_, then_, else_]");
```

Unqualified symbols in the pattern are put in `System``, and the rule goes into the builtin tier of the
definition store, where user rules of the same specificity are tried before it. The name given to
`register_builtin!` is also the name under which the builtin cache stores the rule, so every callback must appear
in its module's `CALLBACKS` table for `native_callback` to find it again.

Libraries built on the core register their built-ins with `Definitions::register_builtin` instead, which takes the
symbol, the attributes and optionally the category explicitly, and remembers the callback for the cache.

*/
#![allow(non_snake_case)]

use std::sync::{Mutex, MutexGuard};

use fnv::FnvHashMap;
use lazy_static::lazy_static;

use crate::{
  atom::{Atom, SExpression},
  attributes::{Attribute, Attributes},
  definitions::{is_fully_qualified, tag_position, Category, DefinitionError, Definitions},
  interner::{interned, resolve_str, InternedString},
  logging::{log, Channel},
  parsing::parse,
  rules::{NativeFn, NativeRule, Rule},
  settings::{DEFAULT_CONTEXT, DEFAULT_ITERATION_LIMIT, DEFAULT_RECURSION_LIMIT, SYSTEM_CONTEXT},
  system_symbols as sys,
};

/// Attaches the built-in function `$name` to the symbol its `$pattern` is for.
macro_rules! register_builtin {
  ($definitions:ident, $name:ident, $pattern:literal) => {
    $crate::built_ins::install($definitions, $pattern, stringify!($name), $name)
  };
}

/// The `CALLBACKS` table of a module: each built-in by the name it is registered under.
macro_rules! callbacks {
  ($($name:ident),* $(,)?) => {
    pub(super) const CALLBACKS: &[(&str, $crate::rules::NativeFn)] = &[
      $((stringify!($name), $name as $crate::rules::NativeFn)),*
    ];
  };
}

mod assignment;
mod attributes;
mod boolean;
mod control_flow;
mod messages;
mod numeric;
mod structure;
mod values;

pub(crate) use structure::replace_part;

const CALLBACK_TABLES: &[&[(&str, NativeFn)]] = &[
  assignment::CALLBACKS,
  attributes::CALLBACKS,
  boolean::CALLBACKS,
  control_flow::CALLBACKS,
  messages::CALLBACKS,
  numeric::CALLBACKS,
  structure::CALLBACKS,
  values::CALLBACKS,
];

lazy_static! {
  /// Callbacks of built-ins registered from outside the crate, by name.
  static ref REGISTERED_CALLBACKS: Mutex<FnvHashMap<&'static str, NativeFn>> = Mutex::new(FnvHashMap::default());
}

fn registered_callbacks() -> MutexGuard<'static, FnvHashMap<&'static str, NativeFn>> {
  REGISTERED_CALLBACKS.lock().unwrap_or_else(|e| e.into_inner())
}

/// Makes `callback` known under `name`, so that rules calling it can be read back from the builtin cache. A name
/// taken by one of the core's own built-ins is not replaced.
pub(crate) fn remember_callback(name: &'static str, callback: NativeFn) {
  if core_callback(name).is_none() {
    registered_callbacks().insert(name, callback);
  }
}

fn core_callback(name: &str) -> Option<NativeRule> {
  CALLBACK_TABLES.iter()
                 .flat_map(|table| table.iter())
                 .find(|(registered, _)| *registered == name)
                 .map(|(name, callback)| NativeRule { name: *name, callback: *callback })
}

/// The callback registered under `name`, for reading rules back from the builtin cache.
pub(crate) fn native_callback(name: &str) -> Option<NativeRule> {
  core_callback(name).or_else(|| {
    registered_callbacks().get_key_value(name)
                          .map(|(name, callback)| NativeRule { name: *name, callback: *callback })
  })
}

/// Used by `register_builtin!`. Failures are logged; a built-in that cannot be installed is simply missing.
pub(crate) fn install(definitions: &mut Definitions, pattern: &str, name: &'static str, callback: NativeFn) {
  if let Err(error) = install_rule(definitions, None, pattern, name, callback, None) {
    log(Channel::Error, 1, format!("Could not install {}: {}", name, error).as_str());
  }
}

/// Parses `pattern`, puts its unqualified symbols in `System``, and adds the rule calling `callback` to the builtin
/// definition of `symbol`, or of the symbol the pattern is for. Without a `category` one is inferred, falling back to
/// a down-value. Returns the symbol the rule went to.
pub(crate) fn install_rule(
  definitions: &mut Definitions,
  symbol     : Option<&str>,
  pattern    : &str,
  name       : &'static str,
  callback   : NativeFn,
  category   : Option<Category>,
) -> Result<InternedString, DefinitionError> {
  let bad_pattern = |reason: String| DefinitionError::BadPattern { pattern: pattern.to_string(), reason };

  let parsed = match parse(pattern) {
    Ok(parsed) => qualify_in_system(&parsed),
    Err(error) => return Err(bad_pattern(error.to_string())),
  };
  let tag = match symbol {
    Some(symbol) if is_fully_qualified(symbol) => interned(symbol),
    Some(symbol)                               => interned(format!("{}{}", SYSTEM_CONTEXT, symbol).as_str()),
    None => match parsed.lookup_name() {
      Some(tag) => tag,
      None      => return Err(bad_pattern("it has no symbol to attach to".to_string())),
    },
  };
  let category = category.or_else(|| tag_position(&parsed, tag)).unwrap_or(Category::Down);

  let rule = Rule::native(parsed, name, callback).map_err(|error| bad_pattern(error.to_string()))?;
  definitions.builtin_definition(tag).add_rule(category, rule);
  Ok(tag)
}

fn qualify_in_system(atom: &Atom) -> Atom {
  atom.replace_symbols(&|name| {
    let text = resolve_str(name);
    if is_fully_qualified(text) {
      None
    } else {
      Some(Atom::symbol(format!("{}{}", SYSTEM_CONTEXT, text).as_str()))
    }
  })
}

pub(crate) fn register_builtins(definitions: &mut Definitions) {
  assignment::register_builtins(definitions);
  attributes::register_builtins(definitions);
  boolean::register_builtins(definitions);
  control_flow::register_builtins(definitions);
  messages::register_builtins(definitions);
  numeric::register_builtins(definitions);
  structure::register_builtins(definitions);
  values::register_builtins(definitions);

  messages::register_messages(definitions);
  register_own_values(definitions);
  register_attributes(definitions);
}

// region Attributes and settings

fn register_attributes(definitions: &mut Definitions) {
  use Attribute::*;

  let hold_first    : &[Attribute] = &[HoldFirst];
  let hold_all      : &[Attribute] = &[HoldAll];
  let hold_complete : &[Attribute] = &[HoldAllComplete];
  let assignment    : &[Attribute] = &[HoldFirst, SequenceHold];
  let delayed       : &[Attribute] = &[HoldAll, SequenceHold];
  let arithmetic    : &[Attribute] = &[Flat, Listable, NumericFunction, OneIdentity, Orderless];
  let power         : &[Attribute] = &[Listable, NumericFunction, OneIdentity];
  let listable      : &[Attribute] = &[Listable];
  let hold_rest     : &[Attribute] = &[HoldRest];
  let rule          : &[Attribute] = &[SequenceHold];
  let rule_delayed  : &[Attribute] = &[HoldRest, SequenceHold];
  let part          : &[Attribute] = &[NHoldRest];
  let locked        : &[Attribute] = &[Locked];

  let table = [
    (*sys::PLUS, arithmetic),
    (*sys::TIMES, arithmetic),
    (*sys::POWER, power),
    (*sys::N, listable),
    (*sys::HOLD, hold_all),
    (*sys::HOLD_FORM, hold_all),
    (*sys::HOLD_PATTERN, hold_all),
    (*sys::HOLD_COMPLETE, hold_complete),
    (*sys::UNEVALUATED, hold_complete),
    (*sys::VERBATIM, hold_all),
    (*sys::SET, assignment),
    (*sys::UP_SET, assignment),
    (*sys::SET_DELAYED, delayed),
    (*sys::UP_SET_DELAYED, delayed),
    (*sys::TAG_SET, delayed),
    (*sys::TAG_SET_DELAYED, delayed),
    (*sys::UNSET, hold_first),
    (*sys::CLEAR, hold_all),
    (*sys::CLEAR_ALL, hold_all),
    (*sys::ATTRIBUTES, hold_all),
    (*sys::SET_ATTRIBUTES, hold_first),
    (*sys::CLEAR_ATTRIBUTES, hold_first),
    (*sys::PROTECT, hold_all),
    (*sys::UNPROTECT, hold_all),
    (*sys::OWN_VALUES, hold_all),
    (*sys::DOWN_VALUES, hold_all),
    (*sys::SUB_VALUES, hold_all),
    (*sys::UP_VALUES, hold_all),
    (*sys::N_VALUES, hold_all),
    (*sys::DEFAULT_VALUES, hold_all),
    (*sys::FORMAT_VALUES, hold_all),
    (*sys::MESSAGES, hold_all),
    (*sys::OPTIONS, hold_first),
    (*sys::MESSAGE_NAME, hold_first),
    (*sys::MESSAGE, hold_first),
    (*sys::CONTEXT, hold_first),
    (*sys::COMPOUND_EXPRESSION, hold_all),
    (*sys::IF, hold_rest),
    (*sys::CATCH, hold_first),
    (*sys::AND, hold_all),
    (*sys::OR, hold_all),
    (*sys::PATTERN, hold_first),
    (*sys::CONDITION, hold_all),
    (*sys::RULE, rule),
    (*sys::RULE_DELAYED, rule_delayed),
    (*sys::PART, part),
    (*sys::LIST, locked),
  ];

  for (name, attributes) in table {
    let definition = definitions.builtin_definition(name);
    definition.attributes.update(Attributes::from(attributes));
  }

  // Every function and constant is protected. The settings are not.
  for name in sys::all() {
    if !resolve_str(name).starts_with("System`$") {
      definitions.builtin_definition(name).attributes.set(Attribute::Protected);
    }
  }
}

fn register_own_values(definitions: &mut Definitions) {
  let contexts = SExpression::list(vec![Atom::string(DEFAULT_CONTEXT), Atom::string(SYSTEM_CONTEXT)]);
  let settings = vec![
    (*sys::DOLLAR_RECURSION_LIMIT, Atom::from(DEFAULT_RECURSION_LIMIT as i64)),
    (*sys::DOLLAR_ITERATION_LIMIT, Atom::from(DEFAULT_ITERATION_LIMIT as i64)),
    (*sys::DOLLAR_CONTEXT, Atom::string(DEFAULT_CONTEXT)),
    (*sys::DOLLAR_CONTEXT_PATH, contexts),
    (*sys::DOLLAR_MODULE_NUMBER, Atom::integer(1)),
    (*sys::DOLLAR_MIN_PRECISION, Atom::integer(0)),
    (*sys::DOLLAR_MAX_PRECISION, Atom::Symbol(*sys::INFINITY)),
    (*sys::DOLLAR_LINE, Atom::integer(1)),
    (*sys::DOLLAR_HISTORY_LENGTH, Atom::integer(100)),
    (*sys::DOLLAR_RANDOM_STATE, Atom::integer(0)),
  ];

  for (name, value) in settings {
    let rule = Rule::own_value(name, value).with_system(true);
    definitions.builtin_definition(name).add_rule(Category::Own, rule);
  }
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{evaluation::Evaluation, interrupt::ControlSignal, rules::{Arguments, RuleAction}};

  #[test]
  fn every_installed_callback_can_be_found_again() {
    let definitions = Definitions::new_with_builtins(None);
    let mut count = 0;
    for definition in definitions.builtin_definitions().values() {
      for category in [Category::Own, Category::Down, Category::Sub, Category::Up, Category::N] {
        for rule in definition.get_values(category) {
          if let RuleAction::Native(native) = rule.action() {
            count += 1;
            let found = native_callback(native.name);
            assert!(found.is_some(), "{} is missing from the callback tables", native.name);
          }
        }
      }
    }
    assert!(count > 50);
  }

  fn Twice(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> Result<Option<Atom>, ControlSignal> {
    match arguments.get("n").and_then(Atom::to_i64) {
      Some(n) => Ok(Some(Atom::integer(2 * n))),
      None    => Ok(None),
    }
  }

  #[test]
  fn registered_builtins_go_to_the_builtin_tier() {
    let mut definitions = Definitions::new_with_builtins(None);
    let attributes = Attributes::from(&[Attribute::Listable, Attribute::Protected][..]);
    definitions.register_builtin("Twice", "Twice[n_Integer]", "TestTwice", Twice, attributes, None).unwrap();

    let twice = interned("System`Twice");
    assert!(definitions.builtin_definitions().contains_key(&twice));
    assert!(definitions.get_attributes(twice).listable());
    assert_eq!(definitions.get_values(twice, Category::Down).len(), 1);
    assert_eq!(native_callback("TestTwice").map(|native| native.name), Some("TestTwice"));
    // The names of the core's own built-ins cannot be taken over.
    remember_callback("Plus", Twice);
    assert!(native_callback("Plus").map(|native| native.callback as usize) != Some(Twice as NativeFn as usize));
  }

  #[test]
  fn an_explicit_category_overrides_inference() {
    let mut definitions = Definitions::new_with_builtins(None);
    definitions.register_builtin(
      "Ext`g", "Ext`h[Ext`g, n_]", "TestTwiceUp", Twice, Attributes::default(), Some(Category::Up)
    ).unwrap();
    let g = interned("Ext`g");
    assert_eq!(definitions.get_values(g, Category::Up).len(), 1);

    let error = definitions.register_builtin("Bad", "Bad[", "TestBad", Twice, Attributes::default(), None);
    assert!(matches!(error, Err(DefinitionError::BadPattern { .. })));
  }

  #[test]
  fn patterns_are_put_in_system() {
    let atom = qualify_in_system(&parse("If[c_, t_]").unwrap());
    assert_eq!(atom.head_name(), Some(*sys::IF));
    assert_eq!(atom.elements()[0].elements()[0].symbol_str(), Some("System`c"));
  }

  #[test]
  fn functions_are_protected_and_settings_are_not() {
    let mut definitions = Definitions::new_with_builtins(None);
    assert!(definitions.get_attributes(*sys::PLUS).protected());
    assert!(definitions.get_attributes(*sys::SET).hold_first());
    assert!(!definitions.get_attributes(*sys::DOLLAR_RECURSION_LIMIT).protected());
    assert_eq!(definitions.get_config_value(*sys::DOLLAR_RECURSION_LIMIT, None), Some(DEFAULT_RECURSION_LIMIT));
    assert_eq!(definitions.get_config_value(*sys::DOLLAR_ITERATION_LIMIT, None), Some(DEFAULT_ITERATION_LIMIT));
  }
}
