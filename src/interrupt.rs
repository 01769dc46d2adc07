/*!

Non-local exits. Evaluation functions return `Result<Atom, ControlSignal>`, and `?` carries a signal up the call chain
until something that handles it (a `Catch`, a loop, a rule body, or the top level) turns it back into a value.

*/

use std::fmt::{Display, Formatter};

use crate::atom::Atom;

#[derive(Clone, Debug, PartialEq)]
pub enum ControlSignal {
  /// `Abort[]`.
  Abort,
  /// The wall clock limit of the top level evaluation ran out.
  TimedOut,
  /// `$RecursionLimit` was exceeded. The message has already been issued.
  RecursionLimit,
  /// `$IterationLimit` was exceeded. The message has already been issued.
  IterationLimit,
  Break,
  Continue,
  Return(Atom),
  /// The thrown value and the optional tag.
  Throw(Atom, Option<Atom>),
}

impl ControlSignal {
  /// Does this signal end the evaluation with `$Aborted`, whatever is in between?
  pub fn is_abort(&self) -> bool {
    matches!(
      self,
      ControlSignal::Abort | ControlSignal::TimedOut | ControlSignal::RecursionLimit | ControlSignal::IterationLimit
    )
  }
}

impl Display for ControlSignal {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      ControlSignal::Abort                 => write!(f, "Abort"),
      ControlSignal::TimedOut              => write!(f, "TimedOut"),
      ControlSignal::RecursionLimit        => write!(f, "RecursionLimit"),
      ControlSignal::IterationLimit        => write!(f, "IterationLimit"),
      ControlSignal::Break                 => write!(f, "Break"),
      ControlSignal::Continue              => write!(f, "Continue"),
      ControlSignal::Return(value)         => write!(f, "Return[{}]", value),
      ControlSignal::Throw(value, None)    => write!(f, "Throw[{}]", value),
      ControlSignal::Throw(value, Some(t)) => write!(f, "Throw[{}, {}]", value, t),
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn aborting_signals() {
    assert!(ControlSignal::TimedOut.is_abort());
    assert!(ControlSignal::RecursionLimit.is_abort());
    assert!(!ControlSignal::Break.is_abort());
    assert!(!ControlSignal::Return(Atom::integer(1)).is_abort());
    assert_eq!(ControlSignal::Throw(Atom::integer(1), None).to_string(), "Throw[1]");
  }
}
