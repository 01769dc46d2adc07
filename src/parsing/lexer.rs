/*!

Minimal lexer. An unusual feature of this lexer/parser combination is that `Atom`s are created very early, already in
the lexer, instead of later in the parser. We only do this for leaf nodes: numbers, strings, symbols, and the blank
shorthand `x_h`, `__`, `x_.`, which lexes directly to `Pattern[x, Blank[h]]` and friends.

Symbols are emitted with the name exactly as written. Resolving names against `$Context` and `$ContextPath` is the
job of the definition store, not the reader.

*/

use std::fmt::{Display, Formatter};

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use lazy_static::lazy_static;
use num_bigint::BigInt;
use regex::Regex;

use crate::{
  atom::{Atom, SExpression, Symbol},
  logging::{log, Channel},
  parsing::{operator::OPERATOR_TABLES, ParseError},
  system_symbols as sys,
};

#[derive(Clone, PartialEq, Debug)]
pub enum Token {
  Leaf(Atom),
  Operator(&'static str),
}

impl Display for Token {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Token::Leaf(atom)      => write!(f, "{}", atom),
      Token::Operator(token) => write!(f, "{}", token),
    }
  }
}

// The regex crate is built without Unicode tables, so the classes are spelled out in ASCII.
const IDENTIFIER: &str = r"`?[A-Za-z$][A-Za-z0-9$]*(?:`[A-Za-z$][A-Za-z0-9$]*)*";

lazy_static! {
  static ref WHITESPACE: Regex = Regex::new(r"^[ \t\r\n]+").unwrap();
  static ref NUMBER    : Regex = Regex::new(r"^[0-9]+(\.[0-9]*)?").unwrap();
  static ref STRING    : Regex = Regex::new(r#"^"((?:[^"\\]|\\.)*)""#).unwrap();
  static ref SYMBOL_OR_BLANK: Regex = Regex::new(
    &format!(r"^({ident})?(?:(_\.)|(_{{1,3}})({ident})?)?", ident = IDENTIFIER)
  ).unwrap();

  static ref OPERATOR_TOKENS: Vec<&'static str> = OPERATOR_TABLES.all_tokens();
  static ref OPERATOR_MATCHER: AhoCorasick = AhoCorasickBuilder::new()
    .match_kind(MatchKind::LeftmostLongest)
    .anchored(true)
    .build(OPERATOR_TOKENS.iter());
}

pub struct Lexer<'t> {
  text    : &'t str,
  position: usize,
  peeked  : Option<Token>,
}

impl<'t> Lexer<'t> {
  pub fn new(text: &'t str) -> Lexer<'t> {
    Lexer {
      text,
      position: 0,
      peeked  : None,
    }
  }

  /// Looks at the next token without consuming it.
  pub fn peek(&mut self) -> Result<Option<&Token>, ParseError> {
    if self.peeked.is_none() {
      self.peeked = self.lex()?;
    }
    Ok(self.peeked.as_ref())
  }

  pub fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
    match self.peeked.take() {
      Some(token) => Ok(Some(token)),
      None        => self.lex(),
    }
  }

  /// Is the next token the operator `token`? Consumes it if so.
  pub fn accept(&mut self, token: &str) -> Result<bool, ParseError> {
    match self.peek()? {
      Some(Token::Operator(t)) if *t == token => {
        self.peeked = None;
        Ok(true)
      }
      _ => Ok(false)
    }
  }

  fn rest(&self) -> &'t str {
    &self.text[self.position..]
  }

  fn skip_trivia(&mut self) -> Result<(), ParseError> {
    loop {
      if let Some(m) = WHITESPACE.find(self.rest()) {
        self.position += m.end();
        continue;
      }
      if self.rest().starts_with("(*") {
        self.skip_comment()?;
        continue;
      }
      return Ok(());
    }
  }

  /// Comments nest.
  fn skip_comment(&mut self) -> Result<(), ParseError> {
    let mut depth = 0usize;
    while !self.rest().is_empty() {
      if self.rest().starts_with("(*") {
        depth += 1;
        self.position += 2;
      } else if self.rest().starts_with("*)") {
        depth -= 1;
        self.position += 2;
        if depth == 0 {
          return Ok(());
        }
      } else {
        // Advance a whole character.
        let width = self.rest().chars().next().map_or(1, char::len_utf8);
        self.position += width;
      }
    }
    Err(ParseError::UnexpectedEnd)
  }

  fn lex(&mut self) -> Result<Option<Token>, ParseError> {
    self.skip_trivia()?;
    let rest = self.rest();
    if rest.is_empty() {
      return Ok(None);
    }

    let token =
      if let Some(captures) = NUMBER.captures(rest) {
        let text = &captures[0];
        self.position += text.len();
        Token::Leaf(make_number(text, captures.get(1).is_some())?)
      }
      else if let Some(captures) = STRING.captures(rest) {
        self.position += captures[0].len();
        Token::Leaf(Atom::string(&unescape(&captures[1])))
      }
      else if let Some(leaf) = self.lex_symbol_or_blank(rest) {
        leaf
      }
      else if let Some(m) = OPERATOR_MATCHER.find(rest) {
        self.position += m.end();
        Token::Operator(OPERATOR_TOKENS[m.pattern()])
      }
      else {
        let c = rest.chars().next().unwrap_or('\0');
        log(Channel::Error, 1, format!("Unexpected character {:?} at {}.", c, self.position).as_str());
        return Err(ParseError::UnexpectedCharacter(c, self.position));
      };

    log(Channel::Debug, 6, format!("Lexed token: {}", token).as_str());
    Ok(Some(token))
  }

  fn lex_symbol_or_blank(&mut self, rest: &str) -> Option<Token> {
    let captures = SYMBOL_OR_BLANK.captures(rest)?;
    let length = captures[0].len();
    if length == 0 {
      return None;
    }
    self.position += length;

    let name = captures.get(1).map(|m| m.as_str());
    let optional = captures.get(2).is_some();
    let underscores = captures.get(3).map(|m| m.as_str().len());
    let blank_head = captures.get(4).map(|m| Symbol::from_str(m.as_str()));

    let blank = if optional {
      Some(SExpression::with_head(*sys::BLANK, vec![]))
    } else {
      underscores.map(|count| {
        let head = match count {
          1 => *sys::BLANK,
          2 => *sys::BLANK_SEQUENCE,
          _ => *sys::BLANK_NULL_SEQUENCE,
        };
        SExpression::with_head(head, blank_head.into_iter().collect())
      })
    };

    let leaf = match (name, blank) {
      (Some(name), None)        => Symbol::from_str(name),
      (None, Some(blank))       => blank,
      (Some(name), Some(blank)) => SExpression::with_head(*sys::PATTERN, vec![Symbol::from_str(name), blank]),
      (None, None)              => return None,
    };

    if optional {
      Some(Token::Leaf(SExpression::with_head(*sys::OPTIONAL, vec![leaf])))
    } else {
      Some(Token::Leaf(leaf))
    }
  }
}

fn make_number(text: &str, is_real: bool) -> Result<Atom, ParseError> {
  if is_real {
    let normalized = if text.ends_with('.') { format!("{}0", text) } else { text.to_string() };
    normalized
      .parse::<f64>()
      .map(Atom::Real)
      .map_err(|_| ParseError::Invalid(format!("malformed number {}", text)))
  } else {
    text
      .parse::<BigInt>()
      .map(Atom::Integer)
      .map_err(|_| ParseError::Invalid(format!("malformed number {}", text)))
  }
}

fn unescape(text: &str) -> String {
  let mut result = String::with_capacity(text.len());
  let mut chars = text.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      result.push(c);
      continue;
    }
    match chars.next() {
      Some('n')   => result.push('\n'),
      Some('t')   => result.push('\t'),
      Some(other) => result.push(other),
      None        => result.push('\\'),
    }
  }
  result
}


#[cfg(test)]
mod tests {
  use super::*;

  fn tokens(text: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(text);
    let mut result = Vec::new();
    while let Some(token) = lexer.next_token().unwrap() {
      result.push(token);
    }
    result
  }

  #[test]
  fn numbers_and_strings() {
    assert_eq!(
      tokens(r#"12 3. "a\"b""#),
      vec![
        Token::Leaf(Atom::integer(12)),
        Token::Leaf(Atom::real(3.0)),
        Token::Leaf(Atom::string("a\"b")),
      ]
    );
  }

  #[test]
  fn longest_operator_wins() {
    assert_eq!(
      tokens("a ^:= b =!= c"),
      vec![
        Token::Leaf(Symbol::from_str("a")),
        Token::Operator("^:="),
        Token::Leaf(Symbol::from_str("b")),
        Token::Operator("=!="),
        Token::Leaf(Symbol::from_str("c")),
      ]
    );
  }

  #[test]
  fn blanks_lex_to_patterns() {
    let x_integer = SExpression::with_head(
      *sys::PATTERN,
      vec![Symbol::from_str("x"), SExpression::with_head(*sys::BLANK, vec![Symbol::from_str("Integer")])]
    );
    assert_eq!(tokens("x_Integer"), vec![Token::Leaf(x_integer)]);

    let sequence = SExpression::with_head(*sys::BLANK_NULL_SEQUENCE, vec![]);
    assert_eq!(tokens("___"), vec![Token::Leaf(sequence)]);

    let optional = SExpression::with_head(
      *sys::OPTIONAL,
      vec![SExpression::with_head(*sys::PATTERN, vec![Symbol::from_str("y"), SExpression::with_head(*sys::BLANK, vec![])])]
    );
    assert_eq!(tokens("y_."), vec![Token::Leaf(optional)]);
  }

  #[test]
  fn comments_nest() {
    assert_eq!(tokens("(* a (* b *) c *) 1"), vec![Token::Leaf(Atom::integer(1))]);
  }

  #[test]
  fn unterminated_comment_is_an_error() {
    let mut lexer = Lexer::new("(* open");
    assert_eq!(lexer.next_token(), Err(ParseError::UnexpectedEnd));
  }
}
