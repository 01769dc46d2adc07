/*!

Global control over verbose messaging.

Diagnostics are written to a single process-wide stream, filtered by a global verbosity level. Level 0 is off.
Level 1 is errors, 2 warnings, 3 notices (definition loading, caches), 4 evaluation progress, 5 matching progress.
Level n includes all messages in levels m < n.

These are not the messages a user of the language sees. Those are issued through `Evaluation::message` and travel
with the result of an evaluation.

*/

use std::{
  io::{stdout, Stdout, Write},
  sync::{
    atomic::{AtomicI32, Ordering},
    Mutex
  }
};

use lazy_static::lazy_static;
use strum_macros::{Display, IntoStaticStr};
use yansi::Paint;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, IntoStaticStr)]
pub enum Channel {
  Error,
  Warning,
  Notice,
  Debug,
}

static VERBOSITY: AtomicI32 = AtomicI32::new(0);

lazy_static! {
  static ref VERBOSE_STREAM: Mutex<Stdout> = Mutex::new(stdout());
}

pub fn set_verbosity(new_value: i32) {
  VERBOSITY.store(new_value, Ordering::Relaxed);
}

pub fn get_verbosity() -> i32 {
  VERBOSITY.load(Ordering::Relaxed)
}

fn verbosity_is_at_least(level: i32) -> bool {
  get_verbosity() >= level
}

fn channel_prefix(channel: Channel) -> String {
  let name: &'static str = channel.into();
  match channel {
    Channel::Error   => Paint::red(name).bold().to_string(),
    Channel::Warning => Paint::yellow(name).bold().to_string(),
    Channel::Notice  => Paint::cyan(name).to_string(),
    Channel::Debug   => Paint::blue(name).to_string(),
  }
}

pub(crate) fn verbose_emit(msg: &str) {
  // A poisoned stream is still a perfectly good stream.
  let mut stream = VERBOSE_STREAM.lock().unwrap_or_else(|e| e.into_inner());
  let _ = stream.write_all(msg.as_bytes());
  let _ = stream.write_all(b"\n");
}

/// Only emits a message if the verbosity level is at least `level`.
pub fn log(channel: Channel, level: i32, msg: &str) {
  if verbosity_is_at_least(level) {
    verbose_emit(format!("{}: {}", channel_prefix(channel), msg).as_str());
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn verbosity_round_trips() {
    let old = get_verbosity();
    set_verbosity(3);
    assert!(verbosity_is_at_least(3));
    assert!(!verbosity_is_at_least(4));
    set_verbosity(old);
  }
}
