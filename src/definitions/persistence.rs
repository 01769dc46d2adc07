/*!

Saving and restoring definitions as JSON.

The user tier can be dumped to a string and loaded back into a store, which is how a session is saved. The builtin
tier can be written to a cache file so that later startups skip registration. The cache is only trusted if it is
newer than the sources it was built from.

Atoms and rules are not serialized directly. They are converted to the record types below, which mirror their
structure with plain data: symbols by their fully qualified name, big numbers as decimal strings, reals by their bit
pattern, and native rules by the name their callback was registered under.

*/

use std::{
  collections::BTreeMap,
  fs,
  io::ErrorKind,
  path::Path,
  time::SystemTime,
};

use fnv::FnvHashMap;
use num_bigint::BigInt;
use num_rational::BigRational;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  atom::{Atom, SExpression},
  attributes::{Attribute, Attributes},
  built_ins::native_callback,
  definitions::{Definition, Definitions},
  interner::{interned, resolve_str, InternedString},
  logging::{log, Channel},
  matching::PatternError,
  rules::{Rule, RuleAction},
  system_symbols as sys,
};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistenceError {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
  #[error("malformed definitions: {0}")]
  Serialization(#[from] serde_json::Error),
  #[error("unsupported format version {0}")]
  Version(u32),
  #[error("no built-in is registered as {0}")]
  UnknownCallback(String),
  #[error("invalid number {0}")]
  InvalidNumber(String),
  #[error("invalid attribute {0}")]
  InvalidAttribute(String),
  #[error("invalid rule: {0}")]
  InvalidRule(#[from] PatternError),
}

// region Records

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
enum AtomRecord {
  String(String),
  Integer(String),
  Rational(String, String),
  Real(u64),
  Complex(Box<AtomRecord>, Box<AtomRecord>),
  Symbol(String),
  Expression(Box<AtomRecord>, Vec<AtomRecord>),
}

#[derive(Serialize, Deserialize)]
struct RuleRecord {
  pattern : AtomRecord,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  template: Option<AtomRecord>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  native  : Option<String>,
  system  : bool,
}

#[derive(Serialize, Deserialize)]
struct DefinitionRecord {
  name         : String,
  attributes   : Vec<String>,
  ownvalues    : Vec<RuleRecord>,
  downvalues   : Vec<RuleRecord>,
  subvalues    : Vec<RuleRecord>,
  upvalues     : Vec<RuleRecord>,
  nvalues      : Vec<RuleRecord>,
  defaultvalues: Vec<RuleRecord>,
  messages     : Vec<RuleRecord>,
  formatvalues : BTreeMap<String, Vec<RuleRecord>>,
  options      : Vec<(String, AtomRecord)>,
}

#[derive(Serialize, Deserialize)]
struct DefinitionsRecord {
  version    : u32,
  definitions: Vec<DefinitionRecord>,
}

// endregion

// region Conversions

fn atom_to_record(atom: &Atom) -> AtomRecord {
  match atom {
    Atom::String(s)     => AtomRecord::String(s.to_string()),
    Atom::Integer(n)    => AtomRecord::Integer(n.to_string()),
    Atom::Rational(q)   => AtomRecord::Rational(q.numer().to_string(), q.denom().to_string()),
    Atom::Real(x)       => AtomRecord::Real(x.to_bits()),
    Atom::Complex(c)    => AtomRecord::Complex(Box::new(atom_to_record(&c.0)), Box::new(atom_to_record(&c.1))),
    Atom::Symbol(name)  => AtomRecord::Symbol(resolve_str(*name).to_string()),
    Atom::Expression(e) => AtomRecord::Expression(
      Box::new(atom_to_record(e.head())),
      e.elements().iter().map(atom_to_record).collect()
    ),
  }
}

fn parse_integer(text: &str) -> Result<BigInt, PersistenceError> {
  text.parse::<BigInt>().map_err(|_| PersistenceError::InvalidNumber(text.to_string()))
}

fn record_to_atom(record: &AtomRecord) -> Result<Atom, PersistenceError> {
  Ok(
    match record {
      AtomRecord::String(s)      => Atom::string(s),
      AtomRecord::Integer(n)     => Atom::Integer(parse_integer(n)?),
      AtomRecord::Rational(n, d) => {
        let denominator = parse_integer(d)?;
        if denominator == BigInt::from(0) {
          return Err(PersistenceError::InvalidNumber(format!("{}/{}", n, d)));
        }
        Atom::rational(BigRational::new(parse_integer(n)?, denominator))
      }
      AtomRecord::Real(bits)     => Atom::Real(f64::from_bits(*bits)),
      AtomRecord::Complex(re, im) => Atom::complex(record_to_atom(re)?, record_to_atom(im)?),
      AtomRecord::Symbol(name)   => Atom::Symbol(interned(name)),
      AtomRecord::Expression(head, elements) => {
        let head = record_to_atom(head)?;
        let elements = elements.iter().map(record_to_atom).collect::<Result<Vec<Atom>, PersistenceError>>()?;
        SExpression::new(head, elements)
      }
    }
  )
}

fn rule_to_record(rule: &Rule) -> RuleRecord {
  let (template, native) = match rule.action() {
    RuleAction::Template(replacement) => (Some(atom_to_record(replacement)), None),
    RuleAction::Native(native)        => (None, Some(native.name.to_string())),
  };
  RuleRecord {
    pattern: atom_to_record(rule.pattern()),
    template,
    native,
    system : rule.is_system(),
  }
}

fn record_to_rule(record: &RuleRecord) -> Result<Rule, PersistenceError> {
  let pattern = record_to_atom(&record.pattern)?;
  let action = match (&record.template, &record.native) {
    (Some(template), _) => RuleAction::Template(record_to_atom(template)?),
    (None, Some(name))  => {
      let native = native_callback(name).ok_or_else(|| PersistenceError::UnknownCallback(name.clone()))?;
      RuleAction::Native(native)
    }
    (None, None) => return Err(PersistenceError::UnknownCallback(String::new())),
  };
  Ok(Rule::new(pattern, action, record.system)?)
}

fn rules_to_records(rules: &[Rule]) -> Vec<RuleRecord> {
  rules.iter().map(rule_to_record).collect()
}

fn records_to_rules(records: &[RuleRecord]) -> Result<Vec<Rule>, PersistenceError> {
  records.iter().map(record_to_rule).collect()
}

fn definition_to_record(definition: &Definition) -> DefinitionRecord {
  DefinitionRecord {
    name         : resolve_str(definition.name).to_string(),
    attributes   : definition.attributes.iter().map(|attribute| attribute.to_string()).collect(),
    ownvalues    : rules_to_records(&definition.ownvalues),
    downvalues   : rules_to_records(&definition.downvalues),
    subvalues    : rules_to_records(&definition.subvalues),
    upvalues     : rules_to_records(&definition.upvalues),
    nvalues      : rules_to_records(&definition.nvalues),
    defaultvalues: rules_to_records(&definition.defaultvalues),
    messages     : rules_to_records(&definition.messages),
    formatvalues : definition.formatvalues
                             .iter()
                             .map(|(form, rules)| (form.clone(), rules_to_records(rules)))
                             .collect(),
    options      : definition.options
                             .iter()
                             .map(|(name, value)| (resolve_str(*name).to_string(), atom_to_record(value)))
                             .collect(),
  }
}

/// Rules were saved in order, so they are restored as they are rather than reinserted.
fn record_to_definition(record: &DefinitionRecord) -> Result<Definition, PersistenceError> {
  let mut definition = Definition::new(interned(&record.name));

  let mut attributes = Attributes::default();
  for name in &record.attributes {
    let attribute = name.parse::<Attribute>().map_err(|_| PersistenceError::InvalidAttribute(name.clone()))?;
    attributes.set(attribute);
  }
  definition.attributes    = attributes;
  definition.ownvalues     = records_to_rules(&record.ownvalues)?;
  definition.downvalues    = records_to_rules(&record.downvalues)?;
  definition.subvalues     = records_to_rules(&record.subvalues)?;
  definition.upvalues      = records_to_rules(&record.upvalues)?;
  definition.nvalues       = records_to_rules(&record.nvalues)?;
  definition.defaultvalues = records_to_rules(&record.defaultvalues)?;
  definition.messages      = records_to_rules(&record.messages)?;
  for (form, rules) in &record.formatvalues {
    definition.formatvalues.insert(form.clone(), records_to_rules(rules)?);
  }
  for (name, value) in &record.options {
    definition.options.push((interned(name), record_to_atom(value)?));
  }
  Ok(definition)
}

fn to_json<'d>(definitions: impl Iterator<Item = &'d Definition>) -> Result<String, PersistenceError> {
  let mut records: Vec<DefinitionRecord> = definitions.map(definition_to_record).collect();
  records.sort_by(|a, b| a.name.cmp(&b.name));
  let record = DefinitionsRecord { version: FORMAT_VERSION, definitions: records };
  Ok(serde_json::to_string(&record)?)
}

fn from_json(text: &str) -> Result<Vec<Definition>, PersistenceError> {
  let record: DefinitionsRecord = serde_json::from_str(text)?;
  if record.version != FORMAT_VERSION {
    return Err(PersistenceError::Version(record.version));
  }
  record.definitions.iter().map(record_to_definition).collect()
}

// endregion

// region User tier

impl Definitions {
  /// Serializes the user tier.
  pub fn dump_user_definitions(&self) -> Result<String, PersistenceError> {
    to_json(self.user_definitions())
  }

  /// Replaces the user tier with the one in `text`. On error the store is left unchanged.
  pub fn load_user_definitions(&mut self, text: &str) -> Result<(), PersistenceError> {
    let loaded = from_json(text)?;
    log(Channel::Notice, 3, format!("Loaded {} user definitions.", loaded.len()).as_str());

    self.user.clear();
    self.now += 1;
    for mut definition in loaded {
      definition.changed = self.now;
      self.user.insert(definition.name, definition);
    }
    self.clear_all_caches();

    // The context settings are mirrored outside the rules.
    if let Some(context) = self.get_ownvalue(*sys::DOLLAR_CONTEXT).and_then(|v| v.as_str().map(str::to_string)) {
      self.current_context = context;
    }
    if let Some(path) = self.get_ownvalue(*sys::DOLLAR_CONTEXT_PATH) {
      let path: Option<Vec<String>> = path.elements().iter().map(|c| c.as_str().map(str::to_string)).collect();
      if let Some(path) = path {
        self.context_path = path;
      }
    }
    self.clear_all_caches();
    Ok(())
  }
}

// endregion

// region Builtin cache

/// The modification time of the running executable.
pub(crate) fn executable_timestamp() -> Option<SystemTime> {
  let path = std::env::current_exe().ok()?;
  fs::metadata(path).ok()?.modified().ok()
}

/// The builtin tier stored at `path`, or `None` if there is no cache or it is older than one of `sources`.
pub(crate) fn load_builtin_cache(
  path   : &Path,
  sources: &[SystemTime]
) -> Result<Option<FnvHashMap<InternedString, Definition>>, PersistenceError>
{
  let metadata = match fs::metadata(path) {
    Ok(metadata)                                     => metadata,
    Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
    Err(error)                                       => return Err(error.into()),
  };
  let cache_time = metadata.modified()?;
  if sources.iter().any(|source| *source >= cache_time) {
    return Ok(None);
  }

  let text = fs::read_to_string(path)?;
  let definitions = from_json(&text)?;
  Ok(Some(definitions.into_iter().map(|definition| (definition.name, definition)).collect()))
}

pub(crate) fn save_builtin_cache(
  path   : &Path,
  builtin: &FnvHashMap<InternedString, Definition>
) -> Result<(), PersistenceError>
{
  let text = to_json(builtin.values())?;
  fs::write(path, text)?;
  log(Channel::Notice, 3, format!("Wrote builtin cache {}.", path.display()).as_str());
  Ok(())
}

// endregion


#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::{definitions::Category, parsing::parse};

  #[test]
  fn user_tier_survives_a_round_trip() {
    let mut definitions = Definitions::new_with_builtins(None);
    let f = interned("Global`f");
    let pattern = definitions.qualify_symbols(&parse("f[x_Integer]").unwrap());
    let replacement = definitions.qualify_symbols(&parse("{x, 1/2, 2.5, \"s\"}").unwrap());
    definitions.add_rule(f, Rule::template(pattern, replacement.clone()).unwrap(), None).unwrap();
    definitions.set_attribute(f, Attribute::Listable);

    let text = definitions.dump_user_definitions().unwrap();

    let mut restored = Definitions::new_with_builtins(None);
    restored.load_user_definitions(&text).unwrap();
    let values = restored.get_values(f, Category::Down);
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].replacement(), Some(&replacement));
    assert!(restored.get_attributes(f).listable());
  }

  #[test]
  fn malformed_input_leaves_store_alone() {
    let mut definitions = Definitions::new_with_builtins(None);
    let a = interned("Global`a");
    definitions.set_ownvalue(a, Atom::integer(1));
    assert!(definitions.load_user_definitions("{\"version\": 1, \"definitions\": 3}").is_err());
    assert!(definitions.load_user_definitions("{\"version\": 99, \"definitions\": []}").is_err());
    assert_eq!(definitions.get_ownvalue(a), Some(Atom::integer(1)));
  }

  #[test]
  fn builtin_cache_is_written_and_reused() {
    let path = std::env::temp_dir().join(format!("symcore-builtin-cache-{}.json", std::process::id()));
    let _ = fs::remove_file(&path);

    let old = SystemTime::now() - Duration::from_secs(3600);
    let first = Definitions::new_with_builtin_cache(Some(&path), &[old]);
    assert!(path.exists());

    let loaded = load_builtin_cache(&path, &[old]).unwrap().unwrap();
    assert_eq!(loaded.len(), first.builtin_definitions().len());

    let mut second = Definitions::new_with_builtin_cache(Some(&path), &[old]);
    assert_eq!(resolve_str(second.lookup_name("Plus")), "System`Plus");
    assert!(second.get_attributes(*sys::PLUS).orderless());

    let future = SystemTime::now() + Duration::from_secs(3600);
    assert!(load_builtin_cache(&path, &[future]).unwrap().is_none());
    let _ = fs::remove_file(&path);
  }
}
