/*!
A global dictionary of interned strings. Provides an abstraction API for any interner library.

The interner is shared by the thread that builds expressions and the worker thread that evaluates them, so it lives
behind a mutex. Resolved strings are leaked once, on first interning, so that `resolve_str` can hand out
`&'static str` without holding the lock.

*/

use std::sync::{Mutex, MutexGuard};

use lazy_static::lazy_static;
use string_interner::{
  StringInterner,
  Symbol,
  symbol::SymbolU32
};

pub type InternedString = SymbolU32;

struct Interner {
  strings : StringInterner,
  /// Indexed by `InternedString::to_usize()`.
  resolved: Vec<&'static str>,
}

impl Interner {
  fn intern_static(&mut self, string: &'static str) -> InternedString {
    let symbol = self.strings.get_or_intern_static(string);
    if symbol.to_usize() == self.resolved.len() {
      self.resolved.push(string);
    }
    symbol
  }

  fn intern(&mut self, string: &str) -> InternedString {
    if let Some(symbol) = self.strings.get(string) {
      return symbol;
    }
    let leaked: &'static str = Box::leak(string.to_string().into_boxed_str());
    self.intern_static(leaked)
  }
}

lazy_static! {
  static ref STRING_INTERNER: Mutex<Interner> = Mutex::new(
    Interner {
      strings : StringInterner::default(),
      resolved: Vec::new(),
    }
  );
}

fn interner() -> MutexGuard<'static, Interner> {
  STRING_INTERNER.lock().unwrap_or_else(|e| e.into_inner())
}

pub fn interned(string: &str) -> InternedString {
  interner().intern(string)
}

pub fn interned_static(string: &'static str) -> InternedString {
  interner().intern_static(string)
}

pub fn get_interned(string: &str) -> Option<InternedString> {
  interner().strings.get(string)
}

pub fn resolve_str(symbol: InternedString) -> &'static str {
  resolve_str_checked(symbol).unwrap_or("")
}

pub fn resolve_str_checked(symbol: InternedString) -> Option<&'static str> {
  interner().resolved.get(symbol.to_usize()).copied()
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn interning_is_idempotent() {
    let a = interned("Global`interner_test");
    let b = interned(&format!("Global`{}", "interner_test"));
    assert_eq!(a, b);
    assert_eq!(resolve_str(a), "Global`interner_test");
    assert_eq!(get_interned("Global`interner_test"), Some(a));
  }

  #[test]
  fn static_and_dynamic_agree() {
    let a = interned_static("System`InternerStatic");
    let b = interned("System`InternerStatic");
    assert_eq!(a, b);
  }
}
