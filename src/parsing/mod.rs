/*!

The reader: turns source text into an `Atom`. The syntax is the subset of Wolfram Language input syntax needed to
write definitions and test programs, described by the operator table in `operator.rs`.

 */
mod lexer;
mod operator;
mod parser;

use thiserror::Error;

pub use operator::{Affix, Associativity, Operator, OPERATOR_TABLES};
pub use parser::parse;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("unexpected character {0:?} at position {1}")]
  UnexpectedCharacter(char, usize),
  #[error("unexpected end of input")]
  UnexpectedEnd,
  #[error("unexpected token {0}")]
  UnexpectedToken(String),
  #[error("expected {expected} but found {found}")]
  Expected {
    expected: String,
    found   : String,
  },
  #[error("{0}")]
  Invalid(String),
}
