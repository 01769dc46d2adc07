/*!

An operator is a syntactic component of an expression grammar that may take arguments. The `Operator` struct holds
syntactic data about the operator, which is used by the generic Pratt parsing algorithm and, in reverse, by the
formatter to decide where parentheses are needed.

The operator tables are keyed by token (sigil). There are two: the *null* table of operators that begin an expression
(prefix and matchfix operators) and the *left* table of operators that take an expression on their left (infix and
postfix operators). The same sigil may appear in both, as `-` does.

*/

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::interner::{interned_static, InternedString};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Associativity {
  Null,  // Things like constants or identifiers that have no affix or associativity. Also,
         // matchfix operators.
  Non,   // The operator cannot be adjacent to another operator of the same precedence.
  Right, // E.g. 2^3^4 == 2^(3^4) != (2^3)^4
  Left,  // E.g. 3-4-5 == (3-4)-5 != 3 - (4-5)
  Full   // Adjacent operators collapse into a single variadic function,
         // e.g. 1 + 2 + 3 + 4 == Plus(1, 2, 3, 4)
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Affix {
  Prefix,
  Postfix,  // Synonym: suffix (but not used in computer science)
  Infix,
  Matchfix, // Synonyms: circumfix, confix, ambifix
}

/// An operator has a set of properties that determine how it is parsed. Other properties like commutativity that do
/// not affect how an expression is parsed are not associated with the operator but rather with the function the
/// operator is interpreted as.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Operator {                       // Example Value
  /// The fully qualified head the operator builds.
  pub name         : &'static str,          // "System`Times"
  pub token        : &'static str,          // "*"
  /// Closing token of a matchfix operator.
  pub o_token      : Option<&'static str>,  // <None>
  pub precedence   : i32,                   // 400
  pub associativity: Associativity,         // Full
  pub affix        : Affix,                 // Infix
}

impl Operator {
  const fn new(
    name: &'static str,
    token: &'static str,
    precedence: i32,
    associativity: Associativity,
    affix: Affix
  ) -> Operator {
    Operator { name, token, o_token: None, precedence, associativity, affix }
  }

  const fn matchfix(name: &'static str, token: &'static str, o_token: &'static str) -> Operator {
    Operator {
      name,
      token,
      o_token      : Some(o_token),
      precedence   : 0,
      associativity: Associativity::Null,
      affix        : Affix::Matchfix
    }
  }

  pub fn left_binding_power(&self) -> i32 {
    match self.affix {

      | Affix::Infix
      | Affix::Postfix => self.precedence,

      _ => -1

    }
  }

  /// The binding power with which the operand to the right of this operator is parsed.
  pub fn right_binding_power(&self) -> i32 {
    match self.affix {
      Affix::Prefix   => self.precedence,
      Affix::Matchfix => 0,
      Affix::Postfix  => -1,
      Affix::Infix    => {
        match self.associativity {
          Associativity::Right => self.precedence - 1,
          _                    => self.precedence,
        }
      }
    }
  }

  pub fn head(&self) -> InternedString {
    interned_static(self.name)
  }
}

use Affix::*;
use Associativity as A;

/// Precedences follow those of the Wolfram Language.
static OPERATORS: &[Operator] = &[
  Operator::new("System`CompoundExpression", ";",   10,   A::Full,  Infix),
  Operator::new("System`Set",                "=",   40,   A::Right, Infix),
  Operator::new("System`SetDelayed",         ":=",  40,   A::Right, Infix),
  Operator::new("System`UpSet",              "^=",  40,   A::Right, Infix),
  Operator::new("System`UpSetDelayed",       "^:=", 40,   A::Right, Infix),
  Operator::new("System`TagSet",             "/:",  40,   A::Right, Infix),
  Operator::new("System`Unset",              "=.",  40,   A::Null,  Postfix),
  Operator::new("System`ReplaceAll",         "/.",  110,  A::Left,  Infix),
  Operator::new("System`Rule",               "->",  120,  A::Right, Infix),
  Operator::new("System`RuleDelayed",        ":>",  120,  A::Right, Infix),
  Operator::new("System`Condition",          "/;",  130,  A::Left,  Infix),
  Operator::new("System`Pattern",            ":",   150,  A::Non,   Infix),
  Operator::new("System`Alternatives",       "|",   160,  A::Full,  Infix),
  Operator::new("System`Or",                 "||",  215,  A::Full,  Infix),
  Operator::new("System`And",                "&&",  220,  A::Full,  Infix),
  Operator::new("System`Not",                "!",   230,  A::Null,  Prefix),
  Operator::new("System`SameQ",              "===", 290,  A::Full,  Infix),
  Operator::new("System`UnsameQ",            "=!=", 290,  A::Full,  Infix),
  Operator::new("System`Equal",              "==",  290,  A::Full,  Infix),
  Operator::new("System`Unequal",            "!=",  290,  A::Full,  Infix),
  Operator::new("System`Less",               "<",   290,  A::Full,  Infix),
  Operator::new("System`Greater",            ">",   290,  A::Full,  Infix),
  Operator::new("System`LessEqual",          "<=",  290,  A::Full,  Infix),
  Operator::new("System`GreaterEqual",       ">=",  290,  A::Full,  Infix),
  Operator::new("System`Plus",               "+",   310,  A::Full,  Infix),
  Operator::new("System`Subtract",           "-",   310,  A::Left,  Infix),
  Operator::new("System`Times",              "*",   400,  A::Full,  Infix),
  Operator::new("System`Divide",             "/",   400,  A::Left,  Infix),
  Operator::new("System`Minus",              "-",   480,  A::Null,  Prefix),
  Operator::new("System`Plus",               "+",   480,  A::Null,  Prefix),
  Operator::new("System`Power",              "^",   590,  A::Right, Infix),
  Operator::new("System`Prefix",             "@",   640,  A::Right, Infix),
  Operator::new("System`PatternTest",        "?",   680,  A::Non,   Infix),
  Operator::new("System`MessageName",        "::",  750,  A::Non,   Infix),
  // `f[x]` and `x[[i]]` bind tighter than anything else.
  Operator::new("System`Construct",          "[",   1000, A::Left,  Postfix),
  Operator::new("System`Part",               "[[",  1000, A::Left,  Postfix),
  Operator::matchfix("System`List",          "{",   "}"),
  Operator::matchfix("Parentheses",          "(",   ")"),
];

/// Tokens that are neither operators nor operands but still need to be lexed.
pub static DELIMITERS: &[&str] = &["]", "}", ")", ","];

pub struct OperatorTables {
  pub null: HashMap<&'static str, Operator>,
  pub left: HashMap<&'static str, Operator>,
  /// Operators by the head they build, for the formatter.
  by_head : HashMap<&'static str, Operator>,
}

impl OperatorTables {
  fn new() -> OperatorTables {
    let mut tables = OperatorTables {
      null   : HashMap::new(),
      left   : HashMap::new(),
      by_head: HashMap::new(),
    };

    for operator in OPERATORS {
      match operator.affix {
        Prefix | Matchfix => {
          tables.null.insert(operator.token, operator.clone());
        }
        Infix | Postfix => {
          tables.left.insert(operator.token, operator.clone());
        }
      }
      if operator.affix != Matchfix && operator.affix != Prefix {
        tables.by_head.entry(operator.name).or_insert_with(|| operator.clone());
      }
    }
    tables
  }

  /// The infix or postfix operator that builds expressions with head `name`.
  pub fn by_head(&self, name: &str) -> Option<&Operator> {
    self.by_head.get(name)
  }

  /// Every sigil the lexer needs to recognize.
  pub fn all_tokens(&self) -> Vec<&'static str> {
    let mut tokens: Vec<&'static str> = OPERATORS.iter().map(|o| o.token).collect();
    tokens.extend(OPERATORS.iter().filter_map(|o| o.o_token));
    tokens.extend(DELIMITERS.iter());
    tokens.sort_unstable();
    tokens.dedup();
    tokens
  }
}

lazy_static! {
  pub static ref OPERATOR_TABLES: OperatorTables = OperatorTables::new();
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn minus_is_both_null_and_left() {
    let minus_prefix = OPERATOR_TABLES.null.get("-").map(|o| o.name);
    let minus_infix  = OPERATOR_TABLES.left.get("-").map(|o| o.name);
    assert_eq!(minus_prefix, Some("System`Minus"));
    assert_eq!(minus_infix, Some("System`Subtract"));
  }

  #[test]
  fn right_associative_operators_bind_their_rhs_loosely() {
    let power = OPERATOR_TABLES.left.get("^").cloned();
    let times = OPERATOR_TABLES.left.get("*").cloned();
    match (power, times) {
      (Some(power), Some(times)) => {
        assert!(power.right_binding_power() < power.left_binding_power());
        assert_eq!(times.right_binding_power(), times.left_binding_power());
      }
      _ => panic!("missing operators")
    }
  }
}
