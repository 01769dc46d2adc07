/*!
The parser reads the expression grammar, building a syntax tree along the way. The `OperatorTables` drive the control
flow of the parsing algorithm, but they are a data structure only. All methods live here.

This design is an evolution of that described by Theodore Norvell, which itself is very similar to the standard
object oriented design and Pratt's original description. Norvell describes three tables: `LeftCommand`,
`NullCommand`, and "Other." The "Command" suffix is historical and refers to what command the parsing algorithm
should take when it encounters a particular token.

L (left) tokens:  Takes a left operand (binary ops, postfix ops).
                  L tokens are those directly consumed by the E procedure.
N (null) tokens:  No left operand (prefix ops and leaves).
                  N tokens are those that are used to make the initial
                  choice in the P procedure and that are then consumed as
                  opposed to leading to an error being reported
O (other) tokens: All other tokens: ), ], etc.

See Theodore S. Norvell, "From Precedence Climbing to Pratt Parsing," 2016:
https://www.engr.mun.ca/~theo/Misc/pratt_parsing.htm

A handful of operators do not simply build `Head[lhs, rhs]`. Those are rewritten here as they are parsed:

| Source        | Result                          |
|:--------------|:--------------------------------|
| `a - b`       | `Plus[a, Times[-1, b]]`         |
| `a / b`       | `Times[a, Power[b, -1]]`        |
| `-a`          | `Times[-1, a]`, or a negated number |
| `f @ x`       | `f[x]`                          |
| `x : p`       | `Pattern[x, p]`                 |
| `x_ : d`      | `Optional[x_, d]`               |
| `f /: l = r`  | `TagSet[f, l, r]`               |
| `a::b`        | `MessageName[a, "b"]`           |
| `a; b;`       | `CompoundExpression[a, b, Null]`|

*/

use crate::{
  atom::{Atom, SExpression, Symbol},
  interner::resolve_str,
  logging::{log, Channel},
  parsing::{
    lexer::{Lexer, Token},
    operator::{Associativity, Operator, OPERATOR_TABLES},
    ParseError,
  },
  system_symbols as sys,
};

/// Parses a single complete expression. Trailing input is an error.
pub fn parse(input: &str) -> Result<Atom, ParseError> {
  let mut lexer: Lexer = Lexer::new(input);

  // Bootstrap the parsing algorithm...
  let result = parse_expression(0, &mut lexer).and_then(|expression| {
    match lexer.next_token()? {
      None        => Ok(expression),
      Some(token) => Err(ParseError::UnexpectedToken(token.to_string())),
    }
  });

  match result {
    Err(error) => {
      log(Channel::Error, 1, format!("Parse failed: {}", error).as_str());
      Err(error)
    }

    Ok(a) => {
      log(Channel::Debug, 5, format!("Successfully parsed expression: {}", &a).as_str());
      Ok(a)
    }
  }
}

/// Parses a complete expression whose operators all bind tighter than `previous_binding_power`, the binding power of
/// the parent expression that called us.
fn parse_expression(previous_binding_power: i32, lexer: &mut Lexer) -> Result<Atom, ParseError> {
  // STEP 1: Every complete expression must start with a null token: a leaf, a prefix operator, or an opening bracket.
  let token = match lexer.next_token()? {
    Some(token) => token,
    None        => return Err(ParseError::UnexpectedEnd),
  };
  log(Channel::Debug, 6, format!("Found null token: {}", &token).as_str());

  // STEP 2: The null denotation of the token is the leftmost subexpression of what we are parsing.
  let mut current_root = null_denotation(token, lexer)?;

  // STEP 3: Parse left tokens, i.e. tokens that take an expression on their LHS, placing the `current_root` in the
  // LHS position of new left tokens as we go, so long as their precedence is high enough.
  //
  // It is possible that the precedence of the left token we find is too low to bind to `current_root`, in which case
  // the expression that will end up on the LHS of the left token lives in an ancestor caller of this iteration of
  // `parse_expression`. (High precedence means binding at deeper call levels, high in the call stack.)
  loop {
    // Don't consume the token in case its binding power is out of bound. This is just a peek.
    let operator: Operator = match lexer.peek()?.cloned() {
      None => break,

      // Juxtaposition is not multiplication. A leaf here ends the expression, and the caller reports it.
      Some(Token::Leaf(_)) => break,

      Some(Token::Operator(token)) => {
        match OPERATOR_TABLES.left.get(token) {
          Some(operator) => operator.clone(),
          // If the token doesn't exist in the left table, it is an o-token ending an ancestor expression farther
          // down in the call stack, or else garbage that the ancestor will report.
          None => break,
        }
      }
    };

    // If the new operator has a precedence no higher than the parent expression's, then the parent expression itself
    // deserves to be on its LHS, not the `current_root`, which is merely a subexpression of the parent.
    if operator.left_binding_power() <= previous_binding_power {
      log(
        Channel::Debug,
        6,
        format!(
          "Binding power out of range: p={}, lbp={}",
          previous_binding_power,
          operator.left_binding_power()
        ).as_str()
      );
      break;
    }

    // The l-operator binds tighter than the parent, so we commit to parsing it and consume the token.
    lexer.next_token()?;
    current_root = left_denotation(current_root, &operator, lexer)?;
  }

  Ok(current_root)
}

/// Parses whatever follows the null token `token` and returns the resulting expression.
fn null_denotation(token: Token, lexer: &mut Lexer) -> Result<Atom, ParseError> {
  let operator = match token {
    Token::Leaf(atom) => return Ok(atom),

    Token::Operator(sigil) => {
      match OPERATOR_TABLES.null.get(sigil) {
        Some(operator) => operator.clone(),
        None           => return Err(ParseError::UnexpectedToken(sigil.to_string())),
      }
    }
  };

  match operator.token {
    "(" => {
      let inner = parse_expression(0, lexer)?;
      expect(")", lexer)?;
      Ok(inner)
    }

    "{" => Ok(SExpression::list(parse_arguments("}", lexer)?)),

    "-" => Ok(negate(parse_expression(operator.right_binding_power(), lexer)?)),

    "+" => parse_expression(operator.right_binding_power(), lexer),

    _ => {
      let operand = parse_expression(operator.right_binding_power(), lexer)?;
      Ok(SExpression::with_head(operator.head(), vec![operand]))
    }
  }
}

/// Builds the expression for the left operator `operator` having LHS `lhs`, parsing its RHS if it has one.
fn left_denotation(lhs: Atom, operator: &Operator, lexer: &mut Lexer) -> Result<Atom, ParseError> {
  let rbp = operator.right_binding_power();

  match operator.token {
    "[" => {
      let arguments = parse_arguments("]", lexer)?;
      Ok(SExpression::new(lhs, arguments))
    }

    "[[" => {
      let mut arguments = vec![lhs];
      arguments.extend(parse_arguments("]", lexer)?);
      expect("]", lexer)?;
      Ok(SExpression::with_head(*sys::PART, arguments))
    }

    "=." => Ok(SExpression::with_head(*sys::UNSET, vec![lhs])),

    ";" => {
      let mut elements = vec![lhs];
      loop {
        if ends_compound_expression(lexer)? {
          // A trailing `;` discards the value.
          elements.push(Symbol::from_static_str("System`Null"));
          break;
        }
        elements.push(parse_expression(rbp, lexer)?);
        if !lexer.accept(";")? {
          break;
        }
      }
      Ok(SExpression::with_head(*sys::COMPOUND_EXPRESSION, elements))
    }

    "+" | "-" => {
      let mut elements = vec![lhs];
      let mut subtract = operator.token == "-";
      loop {
        let term = parse_expression(rbp, lexer)?;
        elements.push(if subtract { negate(term) } else { term });
        if lexer.accept("+")? {
          subtract = false;
        } else if lexer.accept("-")? {
          subtract = true;
        } else {
          break;
        }
      }
      Ok(SExpression::with_head(*sys::PLUS, elements))
    }

    "*" | "/" => {
      let mut elements = vec![lhs];
      let mut divide = operator.token == "/";
      loop {
        let factor = parse_expression(rbp, lexer)?;
        elements.push(if divide { reciprocal(factor) } else { factor });
        if lexer.accept("*")? {
          divide = false;
        } else if lexer.accept("/")? {
          divide = true;
        } else {
          break;
        }
      }
      Ok(SExpression::with_head(*sys::TIMES, elements))
    }

    "@" => {
      let argument = parse_expression(rbp, lexer)?;
      Ok(SExpression::new(lhs, vec![argument]))
    }

    ":" => {
      let rhs = parse_expression(rbp, lexer)?;
      if lhs.symbol_name().is_some() {
        Ok(SExpression::with_head(*sys::PATTERN, vec![lhs, rhs]))
      } else if lhs.has_form(*sys::PATTERN, Some(2)) || is_blank(&lhs) {
        Ok(SExpression::with_head(*sys::OPTIONAL, vec![lhs, rhs]))
      } else {
        Err(ParseError::Invalid(format!("{} cannot be named or given a default", lhs)))
      }
    }

    "/:" => {
      // Parse just below assignment precedence so the assignment is our RHS.
      let assignment = parse_expression(operator.precedence - 1, lexer)?;
      let head = match assignment.head_name() {
        Some(name) if name == *sys::SET         => *sys::TAG_SET,
        Some(name) if name == *sys::SET_DELAYED => *sys::TAG_SET_DELAYED,
        _ => return Err(ParseError::Expected { expected: "= or :=".to_string(), found: assignment.to_string() }),
      };
      let mut elements = vec![lhs];
      elements.extend_from_slice(assignment.elements());
      Ok(SExpression::with_head(head, elements))
    }

    "::" => {
      let tag = match lexer.next_token()? {
        Some(Token::Leaf(Atom::Symbol(name))) => Atom::string(resolve_str(name)),
        Some(Token::Leaf(Atom::String(tag)))  => Atom::String(tag),
        Some(token) => return Err(ParseError::Expected { expected: "a message tag".to_string(), found: token.to_string() }),
        None        => return Err(ParseError::UnexpectedEnd),
      };
      Ok(SExpression::with_head(*sys::MESSAGE_NAME, vec![lhs, tag]))
    }

    _ => {
      let mut elements = vec![lhs, parse_expression(rbp, lexer)?];
      // A fully associative operator collects every adjacent operand into one expression.
      if operator.associativity == Associativity::Full {
        while lexer.accept(operator.token)? {
          elements.push(parse_expression(rbp, lexer)?);
        }
      }
      Ok(SExpression::with_head(operator.head(), elements))
    }
  }
}

/// Parses a comma separated sequence of expressions up to and including `close`. An empty slot is `Null`.
fn parse_arguments(close: &'static str, lexer: &mut Lexer) -> Result<Vec<Atom>, ParseError> {
  let mut arguments = Vec::new();
  if lexer.accept(close)? {
    return Ok(arguments);
  }

  loop {
    if matches!(lexer.peek()?, Some(Token::Operator(t)) if *t == "," || *t == close) {
      arguments.push(Symbol::from_static_str("System`Null"));
    } else {
      arguments.push(parse_expression(0, lexer)?);
    }

    match lexer.next_token()? {
      Some(Token::Operator(",")) => continue,
      Some(Token::Operator(t)) if t == close => break,
      Some(token) => return Err(ParseError::Expected { expected: format!(", or {}", close), found: token.to_string() }),
      None        => return Err(ParseError::UnexpectedEnd),
    }
  }

  Ok(arguments)
}

/// Consumes the next token, giving success if the token is the operator `expected`.
fn expect(expected: &'static str, lexer: &mut Lexer) -> Result<(), ParseError> {
  match lexer.next_token()? {
    Some(Token::Operator(t)) if t == expected => Ok(()),
    Some(token) => {
      log(Channel::Error, 1, format!("Expected {} but found {}.", expected, token).as_str());
      Err(ParseError::Expected { expected: expected.to_string(), found: token.to_string() })
    }
    None => Err(ParseError::UnexpectedEnd),
  }
}

/// A compound expression ends at the end of input or at a closing delimiter.
fn ends_compound_expression(lexer: &mut Lexer) -> Result<bool, ParseError> {
  Ok(match lexer.peek()? {
    None => true,
    Some(Token::Operator(t)) => matches!(*t, ")" | "]" | "}" | ","),
    Some(Token::Leaf(_)) => false,
  })
}

fn is_blank(atom: &Atom) -> bool {
  match atom.head_name() {
    Some(name) => {
      atom.is_expression()
        && (name == *sys::BLANK || name == *sys::BLANK_SEQUENCE || name == *sys::BLANK_NULL_SEQUENCE)
    }
    None => false
  }
}

fn negate(atom: Atom) -> Atom {
  match atom {
    Atom::Integer(n)  => Atom::Integer(-n),
    Atom::Real(x)     => Atom::Real(-x),
    Atom::Rational(q) => Atom::rational(-q.as_ref().clone()),
    other             => SExpression::with_head(*sys::TIMES, vec![Atom::integer(-1), other]),
  }
}

fn reciprocal(atom: Atom) -> Atom {
  SExpression::with_head(*sys::POWER, vec![atom, Atom::integer(-1)])
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::format::{DisplayForm, Formattable};

  fn full_form(text: &str) -> String {
    parse(text).unwrap().format(&DisplayForm::Full.into())
  }

  #[test]
  fn arithmetic_precedence() {
    assert_eq!(full_form("a + b*c^d"), "Plus[a, Times[b, Power[c, d]]]");
    assert_eq!(full_form("a - b + c"), "Plus[a, Times[-1, b], c]");
    assert_eq!(full_form("a/b"), "Times[a, Power[b, -1]]");
    assert_eq!(full_form("-3"), "-3");
    assert_eq!(full_form("2^3^4"), "Power[2, Power[3, 4]]");
    assert_eq!(full_form("2*x/y"), "Times[2, x, Power[y, -1]]");
  }

  #[test]
  fn assignments_and_rules() {
    assert_eq!(full_form("f[x_] := x^2"), "SetDelayed[f[Pattern[x, Blank[]]], Power[x, 2]]");
    assert_eq!(full_form("a = b = 1"), "Set[a, Set[b, 1]]");
    assert_eq!(full_form("g /: f[g] = 1"), "TagSet[g, f[g], 1]");
    assert_eq!(full_form("x =."), "Unset[x]");
    assert_eq!(full_form("x /. x -> 1"), "ReplaceAll[x, Rule[x, 1]]");
    assert_eq!(full_form("f[x_ /; x > 0] :> x"), "RuleDelayed[f[Condition[Pattern[x, Blank[]], Greater[x, 0]]], x]");
  }

  #[test]
  fn patterns_and_names() {
    assert_eq!(full_form("x:_Integer"), "Pattern[x, Blank[Integer]]");
    assert_eq!(full_form("x_:0"), "Optional[Pattern[x, Blank[]], 0]");
    assert_eq!(full_form("a | b | c"), "Alternatives[a, b, c]");
    assert_eq!(full_form("f::usage"), "MessageName[f, \"usage\"]");
    assert_eq!(full_form("x_?NumberQ"), "PatternTest[Pattern[x, Blank[]], NumberQ]");
  }

  #[test]
  fn compound_expressions_and_brackets() {
    assert_eq!(full_form("a; b;"), "CompoundExpression[a, b, Null]");
    assert_eq!(full_form("{1, {2}}[[2, 1]]"), "Part[List[1, List[2]], 2, 1]");
    assert_eq!(full_form("f[g[x]]"), "f[g[x]]");
    assert_eq!(full_form("f@g@x"), "f[g[x]]");
    assert_eq!(full_form("!a && b"), "And[Not[a], b]");
    assert_eq!(full_form("(a + b)*c"), "Times[Plus[a, b], c]");
  }

  #[test]
  fn errors() {
    assert_eq!(parse("f[a"), Err(ParseError::UnexpectedEnd));
    assert!(matches!(parse("a b"), Err(ParseError::UnexpectedToken(_))));
    assert!(matches!(parse("(a + b"), Err(ParseError::UnexpectedEnd)));
    assert!(parse("").is_err());
  }
}
