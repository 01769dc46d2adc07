/*!

# The Definition Store

Every symbol's attributes and rules live here, in one of three tiers:

  * `builtin`, populated once at startup by the built-in library or from the builtin cache,
  * `extension`, for definitions loaded from add-on modules,
  * `user`, for everything assigned during a session.

A lookup merges the tiers that define a name into a single `Definition`. Rule lists are concatenated in the order
user, extension, builtin, and the attributes come from the first tier that has the name. The merged definition is
cached under the name it was looked up by.

Two caches are kept: the merged definitions, and the resolution of unqualified names. Both are keyed by the name as
it was asked for, which may be unqualified. The `proxy` map indexes the cache keys by their short name, so that a
change to ``A`x`` can evict the entries for `x`, ``A`x`` and ``B`x`` in one step. A change of `$Context` or
`$ContextPath` evicts everything.

Every change bumps `now`, the store generation, and stamps it on the definition that changed.

*/

mod definition;
mod persistence;
mod resolver;

use std::{
  path::Path,
  sync::Arc,
  time::SystemTime,
};

use fnv::{FnvHashMap, FnvHashSet};
use thiserror::Error;

use crate::{
  atom::{Atom, SExpression},
  attributes::{Attribute, Attributes},
  built_ins,
  interner::{get_interned, interned, resolve_str, InternedString},
  logging::{log, Channel},
  rules::{NativeFn, Rule},
  settings::{init_from_environment, BUILTIN_CACHE_PATH, DEFAULT_CONTEXT, SYSTEM_CONTEXT},
  system_symbols as sys,
};

pub use definition::{insert_rule, Category, Definition, ALL_FORMS};
pub use persistence::PersistenceError;
pub use resolver::{context_of, in_context, is_fully_qualified, is_valid_context, strip_context};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DefinitionError {
  #[error("symbol {0} is protected")]
  Protected(String),
  #[error("no symbol to attach {pattern} to in {symbol}")]
  NoTag {
    symbol : String,
    pattern: String,
  },
  #[error("{pattern} is not a valid builtin pattern: {reason}")]
  BadPattern {
    pattern: String,
    reason : String,
  },
}

pub struct Definitions {
  builtin          : FnvHashMap<InternedString, Definition>,
  extension        : FnvHashMap<InternedString, Definition>,
  user             : FnvHashMap<InternedString, Definition>,
  definitions_cache: FnvHashMap<InternedString, Arc<Definition>>,
  lookup_cache     : FnvHashMap<InternedString, InternedString>,
  /// Cache keys by short name.
  proxy            : FnvHashMap<&'static str, FnvHashSet<InternedString>>,
  now              : u64,
  current_context  : String,
  context_path     : Vec<String>,
}

impl Default for Definitions {
  fn default() -> Self {
    Definitions::new()
  }
}

impl Definitions {

  // region Construction

  /// An empty store. Nothing, not even `List`, is defined.
  pub fn new() -> Definitions {
    init_from_environment();
    Definitions {
      builtin          : FnvHashMap::default(),
      extension        : FnvHashMap::default(),
      user             : FnvHashMap::default(),
      definitions_cache: FnvHashMap::default(),
      lookup_cache     : FnvHashMap::default(),
      proxy            : FnvHashMap::default(),
      // Zero means "never" to the evaluated-expression stamps.
      now              : 1,
      current_context  : DEFAULT_CONTEXT.to_string(),
      context_path     : vec![DEFAULT_CONTEXT.to_string(), SYSTEM_CONTEXT.to_string()],
    }
  }

  /// A store with the builtin tier loaded. If a cache path is given, or set in the environment, the builtin tier is
  /// read from the cache when the cache is newer than the running executable, and written to it otherwise.
  pub fn new_with_builtins(cache_path: Option<&Path>) -> Definitions {
    let sources: Vec<SystemTime> = persistence::executable_timestamp().into_iter().collect();
    Definitions::new_with_builtin_cache(cache_path, &sources)
  }

  /// Like `new_with_builtins`, but the cache is used only if it is newer than every one of `sources`.
  pub fn new_with_builtin_cache(cache_path: Option<&Path>, sources: &[SystemTime]) -> Definitions {
    let mut definitions = Definitions::new();
    let cache_path = cache_path.map(Path::to_path_buf).or_else(|| BUILTIN_CACHE_PATH.clone());

    if let Some(path) = &cache_path {
      match persistence::load_builtin_cache(path, sources) {
        Ok(Some(builtin)) => {
          log(Channel::Notice, 3, format!("Loaded builtin definitions from {}.", path.display()).as_str());
          definitions.builtin = builtin;
          definitions.clear_all_caches();
          return definitions;
        }
        Ok(None) => {
          log(Channel::Notice, 3, format!("Builtin cache {} is missing or stale.", path.display()).as_str());
        }
        Err(error) => {
          log(Channel::Warning, 2, format!("Discarding builtin cache {}: {}", path.display(), error).as_str());
        }
      }
    }

    built_ins::register_builtins(&mut definitions);

    if let Some(path) = &cache_path {
      if let Err(error) = persistence::save_builtin_cache(path, &definitions.builtin) {
        log(Channel::Warning, 2, format!("Could not write builtin cache {}: {}", path.display(), error).as_str());
      }
    }
    definitions
  }

  // endregion

  // region Caches and generations

  /// The store generation. It increases with every change to any definition.
  pub fn generation(&self) -> u64 {
    self.now
  }

  /// Evicts every cache entry that could refer to `name`.
  pub fn clear_cache(&mut self, name: InternedString) {
    self.definitions_cache.remove(&name);
    let tail = strip_context(resolve_str(name));
    if let Some(keys) = self.proxy.remove(tail) {
      for key in keys {
        self.definitions_cache.remove(&key);
        self.lookup_cache.remove(&key);
      }
    }
  }

  pub fn clear_all_caches(&mut self) {
    self.definitions_cache.clear();
    self.lookup_cache.clear();
    self.proxy.clear();
  }

  /// Records a change to the definition of `name`.
  pub fn mark_changed(&mut self, name: InternedString) {
    self.now += 1;
    let now = self.now;
    for tier in [&mut self.user, &mut self.extension, &mut self.builtin] {
      if let Some(definition) = tier.get_mut(&name) {
        definition.changed = now;
      }
    }
    self.clear_cache(name);
  }

  fn remember(&mut self, key: InternedString) {
    self.proxy.entry(strip_context(resolve_str(key))).or_default().insert(key);
  }

  // endregion

  // region Name resolution

  pub fn current_context(&self) -> &str {
    &self.current_context
  }

  pub fn context_path(&self) -> &[String] {
    &self.context_path
  }

  pub fn set_current_context(&mut self, context: &str) {
    self.current_context = context.to_string();
    self.insert_user_rule(*sys::DOLLAR_CONTEXT, Rule::own_value(*sys::DOLLAR_CONTEXT, Atom::string(context)), Category::Own);
    self.clear_all_caches();
  }

  pub fn set_context_path(&mut self, path: Vec<String>) {
    let value = SExpression::list(path.iter().map(|context| Atom::string(context)).collect());
    self.context_path = path;
    self.insert_user_rule(*sys::DOLLAR_CONTEXT_PATH, Rule::own_value(*sys::DOLLAR_CONTEXT_PATH, value), Category::Own);
    self.clear_all_caches();
  }

  /// The current context followed by the context path.
  pub fn accessible_contexts(&self) -> Vec<String> {
    let mut contexts = vec![self.current_context.clone()];
    for context in &self.context_path {
      if !contexts.contains(context) {
        contexts.push(context.clone());
      }
    }
    contexts
  }

  /// The fully qualified name `name` refers to. A name with a context is already qualified unless the context
  /// starts with a backtick, in which case it is relative to `$Context`. A bare name is looked up in `$Context` and
  /// then along `$ContextPath`. A name that is not defined anywhere is put in `$Context`.
  pub fn lookup_name(&mut self, name: &str) -> InternedString {
    if is_fully_qualified(name) {
      return interned(name);
    }
    let key = interned(name);
    if let Some(qualified) = self.lookup_cache.get(&key) {
      return *qualified;
    }

    let qualified = self.resolve(name);
    self.lookup_cache.insert(key, qualified);
    self.remember(key);
    qualified
  }

  fn resolve(&self, name: &str) -> InternedString {
    if let Some(relative) = name.strip_prefix('`') {
      return interned(format!("{}{}", self.current_context, relative).as_str());
    }

    let with_context = format!("{}{}", self.current_context, name);
    if self.is_defined(&with_context) {
      return interned(&with_context);
    }
    for context in &self.context_path {
      let candidate = format!("{}{}", context, name);
      if self.is_defined(&candidate) {
        return interned(&candidate);
      }
    }
    interned(&with_context)
  }

  fn is_defined(&self, name: &str) -> bool {
    get_interned(name).map_or(false, |name| self.have_definition(name))
  }

  /// `lookup_name` for a name that is already interned.
  pub fn lookup_symbol(&mut self, name: InternedString) -> InternedString {
    let text = resolve_str(name);
    if is_fully_qualified(text) {
      name
    } else {
      self.lookup_name(text)
    }
  }

  /// Replaces every symbol in `atom` by its fully qualified name.
  pub fn qualify_symbols(&mut self, atom: &Atom) -> Atom {
    match atom {
      Atom::Symbol(name) => {
        let qualified = self.lookup_symbol(*name);
        if qualified == *name {
          atom.clone()
        } else {
          Atom::Symbol(qualified)
        }
      }

      Atom::Expression(expression) => {
        let head = self.qualify_symbols(expression.head());
        let mut changed = head != *expression.head();
        let mut elements = Vec::with_capacity(expression.len());
        for element in expression.elements() {
          let qualified = self.qualify_symbols(element);
          changed = changed || qualified != *element;
          elements.push(qualified);
        }
        if changed {
          SExpression::new(head, elements)
        } else {
          atom.clone()
        }
      }

      _ => atom.clone()
    }
  }

  /// `name` without its context, if that context is `$Context` or on `$ContextPath`.
  pub fn shorten_name(&self, name: &str) -> String {
    if !name.contains('`') {
      return name.to_string();
    }
    let contexts = std::iter::once(&self.current_context).chain(self.context_path.iter());
    for context in contexts {
      if in_context(name, context) {
        return name[context.len()..].to_string();
      }
    }
    name.to_string()
  }

  // endregion

  // region Queries

  /// Is `name` defined in any tier? The name must be fully qualified.
  pub fn have_definition(&self, name: InternedString) -> bool {
    self.user.contains_key(&name) || self.extension.contains_key(&name) || self.builtin.contains_key(&name)
  }

  pub fn has_user_definition(&self, name: InternedString) -> bool {
    self.user.contains_key(&name)
  }

  /// Every defined name, sorted.
  pub fn get_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.builtin
                                     .keys()
                                     .chain(self.extension.keys())
                                     .chain(self.user.keys())
                                     .map(|name| resolve_str(*name).to_string())
                                     .collect();
    names.sort();
    names.dedup();
    names
  }

  pub fn get_user_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.user.keys().map(|name| resolve_str(*name).to_string()).collect();
    names.sort();
    names
  }

  /// The defined names matching a `Names` pattern such as `"Plus*"` or ``"Global`*"``.
  pub fn get_matching_names(&self, pattern: &str) -> Vec<String> {
    let regex = match resolver::name_pattern(pattern, &self.current_context, &self.accessible_contexts()) {
      Some(regex) => regex,
      None        => return vec![],
    };
    self.get_names().into_iter().filter(|name| regex.is_match(name)).collect()
  }

  /// The merged definition of `name`. An undefined name has an empty definition.
  pub fn get_definition(&mut self, name: InternedString) -> Arc<Definition> {
    if let Some(cached) = self.definitions_cache.get(&name) {
      return cached.clone();
    }

    let qualified = self.lookup_symbol(name);
    let tiers: Vec<&Definition> = [&self.user, &self.extension, &self.builtin]
        .iter()
        .filter_map(|tier| tier.get(&qualified))
        .collect();
    let definition = match tiers.as_slice() {
      []       => Definition::new(qualified),
      [single] => (*single).clone(),
      _        => merge(qualified, &tiers),
    };

    let definition = Arc::new(definition);
    self.definitions_cache.insert(name, definition.clone());
    self.remember(name);
    definition
  }

  pub fn get_attributes(&mut self, name: InternedString) -> Attributes {
    self.get_definition(name).attributes
  }

  pub fn get_values(&mut self, name: InternedString, category: Category) -> Vec<Rule> {
    self.get_definition(name).get_values(category)
  }

  /// The value of the first own-value of `name`.
  pub fn get_ownvalue(&mut self, name: InternedString) -> Option<Atom> {
    self.get_definition(name).ownvalues.first().and_then(|rule| rule.replacement().cloned())
  }

  /// A nonnegative integer setting such as `$RecursionLimit`. `Infinity` gives `None`, anything else `default`.
  pub fn get_config_value(&mut self, name: InternedString, default: Option<usize>) -> Option<usize> {
    match self.get_ownvalue(name) {
      Some(value) if value.is_symbol(*sys::INFINITY) => None,
      Some(value) => value.to_usize().or(default),
      None        => default,
    }
  }

  /// The format rules of `name` for `form`, followed by those for every form.
  pub fn get_formats(&mut self, name: InternedString, form: &str) -> Vec<Rule> {
    let definition = self.get_definition(name);
    let mut rules: Vec<Rule> = definition.formatvalues.get(form).cloned().unwrap_or_default();
    if form != ALL_FORMS {
      rules.extend(definition.formatvalues.get(ALL_FORMS).into_iter().flatten().cloned());
    }
    rules
  }

  pub fn get_option(&mut self, name: InternedString, option: InternedString) -> Option<Atom> {
    self.get_definition(name).get_option(option).cloned()
  }

  // endregion

  // region User tier

  pub fn get_user_definition(&mut self, name: InternedString, create: bool) -> Option<&mut Definition> {
    if !self.user.contains_key(&name) {
      if !create {
        return None;
      }
      let base = self.extension.get(&name).or_else(|| self.builtin.get(&name));
      let seeded = seed_definition(name, base);
      self.user.insert(name, seeded);
      self.clear_cache(name);
    }
    self.user.get_mut(&name)
  }

  /// Applies `f` to the user definition of `name`, creating it if need be, and records the change.
  pub fn modify_user_definition<R>(&mut self, name: InternedString, f: impl FnOnce(&mut Definition) -> R) -> R {
    self.now += 1;
    let now = self.now;
    let result = {
      let Definitions { builtin, extension, user, .. } = self;
      let definition = user.entry(name)
                           .or_insert_with(|| seed_definition(name, extension.get(&name).or_else(|| builtin.get(&name))));
      definition.changed = now;
      f(definition)
    };
    self.clear_cache(name);
    result
  }

  /// Replaces the user definition of `name` by a fresh one. The name stays defined.
  pub fn reset_user_definition(&mut self, name: InternedString) {
    let base = self.extension.get(&name).or_else(|| self.builtin.get(&name));
    let mut fresh = seed_definition(name, base);
    self.now += 1;
    fresh.changed = self.now;
    self.user.insert(name, fresh);
    self.clear_cache(name);
  }

  pub fn set_user_definition(&mut self, name: InternedString, mut definition: Definition) {
    self.now += 1;
    definition.changed = self.now;
    self.user.insert(name, definition);
    self.clear_cache(name);
  }

  /// Removes `name` from the user tier. Returns whether there was anything to remove.
  pub fn clear_user_definition(&mut self, name: InternedString) -> bool {
    if self.user.remove(&name).is_some() {
      self.now += 1;
      self.clear_cache(name);
      true
    } else {
      false
    }
  }

  pub(crate) fn user_definitions(&self) -> impl Iterator<Item = &Definition> {
    self.user.values()
  }

  // endregion

  // region Mutation

  fn check_protection(&mut self, name: InternedString) -> Result<(), DefinitionError> {
    if self.get_attributes(name).protected() {
      Err(DefinitionError::Protected(resolve_str(name).to_string()))
    } else {
      Ok(())
    }
  }

  /// Adds `rule` to the user definition of `name`. Without a `category`, one is inferred from the shape of the
  /// pattern. Protected symbols refuse the rule.
  pub fn add_rule(&mut self, name: InternedString, rule: Rule, category: Option<Category>) -> Result<(), DefinitionError> {
    let category = match category.or_else(|| tag_position(rule.pattern(), name)) {
      Some(category) => category,
      None => {
        return Err(DefinitionError::NoTag {
          symbol : resolve_str(name).to_string(),
          pattern: rule.pattern().to_string(),
        });
      }
    };
    self.check_protection(name)?;
    self.insert_user_rule(name, rule, category);
    Ok(())
  }

  /// `add_rule` for the few system settings that may be assigned even though they are protected.
  pub(crate) fn insert_user_rule(&mut self, name: InternedString, rule: Rule, category: Category) {
    match category {
      Category::Format => self.modify_user_definition(name, |definition| definition.add_format(ALL_FORMS, rule)),
      category         => self.modify_user_definition(name, |definition| definition.add_rule(category, rule)),
    }
  }

  /// Removes the own, down, sub or up value of `name` whose pattern is `lhs`.
  pub fn remove_rule(&mut self, name: InternedString, lhs: &Atom) -> Result<bool, DefinitionError> {
    self.check_protection(name)?;
    let removed = match self.user.get_mut(&name) {
      Some(definition) => definition.remove_rule(lhs),
      None             => false,
    };
    if removed {
      self.mark_changed(name);
    }
    Ok(removed)
  }

  pub fn set_ownvalue(&mut self, name: InternedString, value: Atom) {
    self.insert_user_rule(name, Rule::own_value(name, value), Category::Own);
  }

  pub fn set_values(&mut self, name: InternedString, category: Category, rules: Vec<Rule>) -> Result<(), DefinitionError> {
    self.check_protection(name)?;
    self.modify_user_definition(name, |definition| definition.set_values(category, rules));
    Ok(())
  }

  /// Adds a format rule for each of `forms`, or for every form if `forms` is empty.
  pub fn add_format(&mut self, name: InternedString, rule: Rule, forms: &[&str]) -> Result<(), DefinitionError> {
    self.check_protection(name)?;
    self.modify_user_definition(name, |definition| {
      if forms.is_empty() {
        definition.add_format(ALL_FORMS, rule);
      } else {
        for form in forms {
          definition.add_format(form, rule.clone());
        }
      }
    });
    Ok(())
  }

  pub fn add_nvalue(&mut self, name: InternedString, rule: Rule) -> Result<(), DefinitionError> {
    self.add_rule(name, rule, Some(Category::N))
  }

  pub fn add_default(&mut self, name: InternedString, rule: Rule) -> Result<(), DefinitionError> {
    self.add_rule(name, rule, Some(Category::Default))
  }

  /// Messages can be set even for protected symbols.
  pub fn add_message(&mut self, name: InternedString, rule: Rule) {
    self.insert_user_rule(name, rule, Category::Message);
  }

  pub fn set_attributes(&mut self, name: InternedString, attributes: Attributes) {
    self.modify_user_definition(name, |definition| definition.attributes = attributes);
  }

  pub fn set_attribute(&mut self, name: InternedString, attribute: Attribute) {
    self.modify_user_definition(name, |definition| definition.attributes.set(attribute));
  }

  pub fn clear_attribute(&mut self, name: InternedString, attribute: Attribute) {
    self.modify_user_definition(name, |definition| definition.attributes.reset(attribute));
  }

  pub fn set_option(&mut self, name: InternedString, option: InternedString, value: Atom) {
    self.modify_user_definition(name, |definition| definition.set_option(option, value));
  }

  // endregion

  // region Builtin and extension tiers

  /// The builtin definition of `name`, created if need be. Only the built-in library writes here.
  pub(crate) fn builtin_definition(&mut self, name: InternedString) -> &mut Definition {
    self.clear_cache(name);
    self.builtin.entry(name).or_insert_with(|| Definition::new(name))
  }

  /// Adds a built-in to the builtin tier: the rule `pattern` calling `callback`, attached to `symbol`, and the
  /// `attributes` of `symbol`. Unqualified names, in `symbol` and in the pattern, are put in `System``. The category
  /// is inferred from the pattern unless one is given. `callback_name` is the name the builtin cache stores the rule
  /// under; it must be unique.
  pub fn register_builtin(
    &mut self,
    symbol       : &str,
    pattern      : &str,
    callback_name: &'static str,
    callback     : NativeFn,
    attributes   : Attributes,
    category     : Option<Category>,
  ) -> Result<(), DefinitionError> {
    built_ins::remember_callback(callback_name, callback);
    let tag = built_ins::install_rule(self, Some(symbol), pattern, callback_name, callback, category)?;
    self.builtin_definition(tag).attributes.update(attributes);
    self.mark_changed(tag);
    log(Channel::Debug, 4, format!("Registered {} for {}.", callback_name, resolve_str(tag)).as_str());
    Ok(())
  }

  /// Writes the builtin tier to `path`, so that a later `new_with_builtins(Some(path))` can skip registration.
  pub fn save_builtin_cache(&self, path: &Path) -> Result<(), PersistenceError> {
    persistence::save_builtin_cache(path, &self.builtin)
  }

  pub(crate) fn builtin_definitions(&self) -> &FnvHashMap<InternedString, Definition> {
    &self.builtin
  }

  /// Adds the definitions of an add-on module. A definition replaces any earlier extension definition of the name.
  pub fn load_extension(&mut self, definitions: Vec<Definition>) {
    for definition in definitions {
      let name = definition.name;
      self.extension.insert(name, definition);
      self.mark_changed(name);
    }
  }

  pub fn unload_extensions(&mut self) {
    self.extension.clear();
    self.now += 1;
    self.clear_all_caches();
  }

  // endregion
}

/// A new user definition starts out with the attributes and options of the definition it shadows.
fn seed_definition(name: InternedString, base: Option<&Definition>) -> Definition {
  let mut definition = Definition::new(name);
  if let Some(base) = base {
    definition.attributes = base.attributes;
    definition.options = base.options.clone();
  }
  definition
}

/// Merges the definitions of a name from several tiers, highest priority first.
fn merge(name: InternedString, tiers: &[&Definition]) -> Definition {
  let mut merged = Definition::new(name);
  merged.attributes = tiers[0].attributes;
  merged.changed = tiers.iter().map(|d| d.changed).max().unwrap_or(0);

  for definition in tiers {
    merged.ownvalues.extend(definition.ownvalues.iter().cloned());
    merged.downvalues.extend(definition.downvalues.iter().cloned());
    merged.subvalues.extend(definition.subvalues.iter().cloned());
    merged.upvalues.extend(definition.upvalues.iter().cloned());
    merged.nvalues.extend(definition.nvalues.iter().cloned());
    merged.defaultvalues.extend(definition.defaultvalues.iter().cloned());
    merged.messages.extend(definition.messages.iter().cloned());
    for (form, rules) in &definition.formatvalues {
      merged.formatvalues.entry(form.clone()).or_default().extend(rules.iter().cloned());
    }
  }
  // Options of higher tiers override those of lower ones.
  for definition in tiers.iter().rev() {
    for (option, value) in &definition.options {
      merged.set_option(*option, value.clone());
    }
  }
  merged
}

// region Tag inference

fn strip_pattern_name_and_condition(pattern: &Atom) -> &Atom {
  let mut pattern = pattern;
  loop {
    if pattern.has_form(*sys::PATTERN, Some(2)) {
      pattern = &pattern.elements()[1];
    } else if pattern.has_form(*sys::CONDITION, Some(2)) || pattern.has_form(*sys::HOLD_PATTERN, Some(1)) {
      pattern = &pattern.elements()[0];
    } else {
      return pattern;
    }
  }
}

/// Does `pattern` stand for something whose lookup name is `name`, either literally or as `_name`?
fn is_pattern_a_kind_of(pattern: &Atom, name: InternedString) -> bool {
  if pattern.lookup_name() == Some(name) {
    return true;
  }
  let is_blank = pattern.has_form(*sys::BLANK, Some(1))
      || pattern.has_form(*sys::BLANK_SEQUENCE, Some(1))
      || pattern.has_form(*sys::BLANK_NULL_SEQUENCE, Some(1));
  is_blank && pattern.elements()[0].is_symbol(name)
}

/// The category a rule for `pattern` belongs to in the definition of `name`:
///
///  1. the symbol itself is an own-value,
///  2. `name[…]` is a down-value,
///  3. `N[expr, precision]` is an n-value,
///  4. `Pattern`, `Condition` and `HoldPattern` wrappers are looked through,
///  5. `name[…][…]` is a sub-value,
///  6. an element that is `name`, `name[…]` or `_name` makes an up-value.
///
/// Anything else cannot be attached to `name`.
pub fn tag_position(pattern: &Atom, name: InternedString) -> Option<Category> {
  if pattern.is_symbol(name) {
    return Some(Category::Own);
  }
  if pattern.is_atom() {
    return None;
  }
  let head_name = pattern.head_name();
  if head_name == Some(name) {
    return Some(Category::Down);
  }
  if head_name == Some(*sys::N) && pattern.len() == 2 {
    return Some(Category::N);
  }
  if pattern.has_form(*sys::CONDITION, Some(2)) || pattern.has_form(*sys::HOLD_PATTERN, Some(1)) {
    return tag_position(&pattern.elements()[0], name);
  }
  if pattern.has_form(*sys::PATTERN, Some(2)) {
    return tag_position(&pattern.elements()[1], name);
  }
  if pattern.lookup_name() == Some(name) {
    return Some(Category::Sub);
  }
  for element in pattern.elements() {
    if is_pattern_a_kind_of(strip_pattern_name_and_condition(element), name) {
      return Some(Category::Up);
    }
  }
  None
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{atom::Symbol, parsing::parse};

  fn read(definitions: &mut Definitions, text: &str) -> Atom {
    definitions.qualify_symbols(&parse(text).unwrap())
  }

  #[test]
  fn names_resolve_along_the_context_path() {
    let mut definitions = Definitions::new_with_builtins(None);
    assert_eq!(resolve_str(definitions.lookup_name("Plus")), "System`Plus");
    assert_eq!(resolve_str(definitions.lookup_name("undefinedThing")), "Global`undefinedThing");
    assert_eq!(resolve_str(definitions.lookup_name("`local")), "Global`local");
    assert_eq!(resolve_str(definitions.lookup_name("Other`x")), "Other`x");
  }

  #[test]
  fn context_change_invalidates_lookups() {
    let mut definitions = Definitions::new_with_builtins(None);
    assert_eq!(resolve_str(definitions.lookup_name("y")), "Global`y");
    definitions.set_current_context("Private`");
    assert_eq!(resolve_str(definitions.lookup_name("y")), "Private`y");
    assert_eq!(definitions.get_ownvalue(*sys::DOLLAR_CONTEXT), Some(Atom::string("Private`")));
  }

  #[test]
  fn new_definition_invalidates_short_name() {
    let mut definitions = Definitions::new_with_builtins(None);
    definitions.set_context_path(vec!["Global`".to_string(), "Other`".to_string(), "System`".to_string()]);
    assert_eq!(resolve_str(definitions.lookup_name("z")), "Global`z");

    let other = interned("Other`z");
    definitions.set_ownvalue(other, Atom::integer(1));
    assert_eq!(resolve_str(definitions.lookup_name("z")), "Other`z");
  }

  #[test]
  fn qualified_symbols() {
    let mut definitions = Definitions::new_with_builtins(None);
    let atom = read(&mut definitions, "f[x, List]");
    assert_eq!(atom.head().symbol_str(), Some("Global`f"));
    assert_eq!(atom.elements()[1].symbol_str(), Some("System`List"));
  }

  #[test]
  fn tiers_merge_user_first() {
    let mut definitions = Definitions::new();
    let f = interned("Global`tiered");
    let pattern = SExpression::with_head(f, vec![Atom::integer(1)]);
    definitions.builtin_definition(f).add_rule(
      Category::Down,
      Rule::template(pattern.clone(), Atom::string("builtin")).unwrap().with_system(true)
    );
    definitions.builtin_definition(f).attributes.set(Attribute::Orderless);
    definitions.add_rule(f, Rule::template(pattern, Atom::string("user")).unwrap(), None).unwrap();

    let merged = definitions.get_definition(f);
    assert_eq!(merged.downvalues.len(), 2);
    assert_eq!(merged.downvalues[0].replacement(), Some(&Atom::string("user")));
    // The user definition was seeded from the builtin one.
    assert!(merged.attributes.orderless());
  }

  #[test]
  fn changes_bump_the_generation() {
    let mut definitions = Definitions::new();
    let a = interned("Global`a");
    let before = definitions.generation();
    definitions.set_ownvalue(a, Atom::integer(1));
    assert!(definitions.generation() > before);
    assert_eq!(definitions.get_definition(a).changed, definitions.generation());
    assert_eq!(definitions.get_ownvalue(a), Some(Atom::integer(1)));
  }

  #[test]
  fn protected_symbols_refuse_rules() {
    let mut definitions = Definitions::new_with_builtins(None);
    let f = interned("Global`F");
    definitions.set_attribute(f, Attribute::Protected);
    let rule = Rule::template(read(&mut definitions, "F[x_]"), Atom::integer(1)).unwrap();
    assert!(matches!(definitions.add_rule(f, rule, None), Err(DefinitionError::Protected(_))));
    assert!(definitions.get_values(f, Category::Down).is_empty());
  }

  #[test]
  fn tag_inference() {
    let mut definitions = Definitions::new_with_builtins(None);
    let f = interned("Global`f");
    let g = interned("Global`g");
    let cases = [
      ("f", f, Some(Category::Own)),
      ("f[x_]", f, Some(Category::Down)),
      ("f[x_] /; x > 0", f, Some(Category::Down)),
      ("HoldPattern[f[x_]]", f, Some(Category::Down)),
      ("f[x_][y_]", f, Some(Category::Sub)),
      ("N[f, p_]", f, Some(Category::N)),
      ("h[g[x_]]", g, Some(Category::Up)),
      ("h[x_g]", g, Some(Category::Up)),
      ("h[y:g[x_]]", g, Some(Category::Up)),
      ("h[k[g]]", g, None),
      ("3", f, None),
    ];
    for (text, name, expected) in cases {
      let pattern = read(&mut definitions, text);
      assert_eq!(tag_position(&pattern, name), expected, "{}", text);
    }
  }

  #[test]
  fn shortening_and_matching_names() {
    let mut definitions = Definitions::new_with_builtins(None);
    assert_eq!(definitions.shorten_name("System`Plus"), "Plus");
    assert_eq!(definitions.shorten_name("Other`Plus"), "Other`Plus");

    definitions.set_ownvalue(interned("Global`myValue"), Atom::integer(1));
    assert_eq!(definitions.get_matching_names("myV*"), vec!["Global`myValue".to_string()]);
    assert!(definitions.get_matching_names("Plu*").contains(&"System`Plus".to_string()));
    assert_eq!(definitions.get_user_names(), vec!["Global`myValue".to_string()]);
  }

  #[test]
  fn user_definitions_can_be_cleared() {
    let mut definitions = Definitions::new_with_builtins(None);
    let a = interned("Global`a");
    definitions.set_ownvalue(a, Atom::integer(1));
    assert!(definitions.have_definition(a));
    assert!(definitions.clear_user_definition(a));
    assert!(!definitions.have_definition(a));
    assert_eq!(definitions.get_ownvalue(a), None);
    assert_eq!(Symbol::from_str("Global`a").symbol_name(), Some(a));
  }

  #[test]
  fn config_values() {
    let mut definitions = Definitions::new_with_builtins(None);
    assert_eq!(definitions.get_config_value(*sys::DOLLAR_RECURSION_LIMIT, None), Some(200));
    definitions.set_ownvalue(*sys::DOLLAR_ITERATION_LIMIT, Symbol::from_static_str("System`Infinity"));
    assert_eq!(definitions.get_config_value(*sys::DOLLAR_ITERATION_LIMIT, Some(5)), None);
  }
}
