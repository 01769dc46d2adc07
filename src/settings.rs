/*!

Compile-time defaults, some of which can be overridden from the environment. The environment is read once.

Per-session settings such as `$RecursionLimit` are not kept here. They live in the language as own-values of system
symbols and are read through `Definitions::get_config_value`.

*/

use std::{env, path::PathBuf};

use lazy_static::lazy_static;

use crate::logging::{set_verbosity, log, Channel};

/// The largest value `$RecursionLimit` may be set to unless `SYMCORE_MAX_RECURSION_DEPTH` says otherwise.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 512;
pub const DEFAULT_RECURSION_LIMIT    : usize = 200;
pub const DEFAULT_ITERATION_LIMIT    : usize = 1000;
/// `$RecursionLimit` and `$IterationLimit` cannot be set below this.
pub const MIN_EVALUATION_LIMIT       : usize = 20;

/// Worker thread stack size is `WORKER_STACK_BASE + WORKER_STACK_PER_LEVEL * recursion_limit`.
pub const WORKER_STACK_BASE     : usize = 8 * 1024 * 1024;
pub const WORKER_STACK_PER_LEVEL: usize = 64 * 1024;

pub const DEFAULT_CONTEXT: &str = "Global`";
pub const SYSTEM_CONTEXT : &str = "System`";

lazy_static! {
  pub static ref MAX_RECURSION_DEPTH: usize = {
    match env::var("SYMCORE_MAX_RECURSION_DEPTH").ok().and_then(|v| v.parse::<usize>().ok()) {
      Some(depth) => depth.max(DEFAULT_MAX_RECURSION_DEPTH),
      None        => DEFAULT_MAX_RECURSION_DEPTH
    }
  };

  pub static ref BUILTIN_CACHE_PATH: Option<PathBuf> = env::var_os("SYMCORE_BUILTIN_CACHE").map(PathBuf::from);

  static ref VERBOSITY_FROM_ENV: () = verbosity_from_environment();
}

fn verbosity_from_environment() {
  if let Some(level) = env::var("SYMCORE_VERBOSITY").ok().and_then(|v| v.trim().parse::<i32>().ok()) {
    set_verbosity(level);
    log(Channel::Notice, 3, format!("Verbosity set to {} from the environment.", level).as_str());
  }
}

/// Applies the environment overrides that have global side effects. Only the first call reads the environment.
/// Every `Definitions` store calls this when it is created.
pub fn init_from_environment() {
  lazy_static::initialize(&VERBOSITY_FROM_ENV);
}

/// The worker stack needed to reach `recursion_limit` nested evaluations.
pub fn worker_stack_size(recursion_limit: usize) -> usize {
  WORKER_STACK_BASE + WORKER_STACK_PER_LEVEL * recursion_limit
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::logging::get_verbosity;

  #[test]
  fn stack_grows_linearly() {
    assert_eq!(worker_stack_size(0), WORKER_STACK_BASE);
    assert_eq!(
      worker_stack_size(200) - worker_stack_size(100),
      100 * WORKER_STACK_PER_LEVEL
    );
    assert!(*MAX_RECURSION_DEPTH >= DEFAULT_MAX_RECURSION_DEPTH);
  }

  #[test]
  fn verbosity_comes_from_the_environment() {
    let before = get_verbosity();
    env::set_var("SYMCORE_VERBOSITY", "2");
    verbosity_from_environment();
    assert_eq!(get_verbosity(), 2);

    // Garbage leaves the level alone.
    env::set_var("SYMCORE_VERBOSITY", "loud");
    set_verbosity(before);
    verbosity_from_environment();
    assert_eq!(get_verbosity(), before);
    env::remove_var("SYMCORE_VERBOSITY");
  }
}
