/*!

A `Formatter` holds information about how to format an expression, that is, how to express the expression as a
string.

"Formatting" needs to be distinct from Rust's standard `Display` trait, because expressions are formatted
differently depending on the context. `InputForm` prints operators infix and is read back by the parser, `FullForm`
prints every compound expression as `head[args]`, and `OutputForm` is `InputForm` with strings printed bare. The
`Display` impl for `Atom` uses `InputForm`.

*/

use strum_macros::{Display, EnumString, IntoStaticStr};
use num_traits::Signed;

use crate::{
  atom::{Atom, SExpression},
  expression::Expression,
  interner::resolve_str,
  parsing::{Associativity, OPERATOR_TABLES},
  system_symbols as sys,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumString, Display, IntoStaticStr, Hash)]
pub enum DisplayForm {
  #[strum(serialize = "System`InputForm")]
  Input,
  #[strum(serialize = "System`FullForm")]
  Full,
  #[strum(serialize = "System`OutputForm")]
  Output,
}

impl Default for DisplayForm {
  fn default() -> DisplayForm {
    DisplayForm::Input
  }
}

/// Parameters used in methods that transform expressions into strings.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Default)]
pub struct Formatter {
  pub form: DisplayForm,
}

impl From<DisplayForm> for Formatter {
  fn from(form: DisplayForm) -> Self {
    Formatter {
      form
    }
  }
}

pub trait Formattable {
  fn format(&self, formatter: &Formatter) -> String;
}


macro_rules! display_formattable_impl {
  ($type_name:ty) => {
    impl std::fmt::Display for $type_name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format(&Formatter::default()))
      }
    }
  }
}

display_formattable_impl!(Atom);

impl Formattable for Atom {
  fn format(&self, formatter: &Formatter) -> String {
    match formatter.form {
      DisplayForm::Full => full_form(self),
      form              => InputFormatter { form }.format(self, 0),
    }
  }
}

// Precedence of anything that never needs parentheses.
const ATOMIC: i32 = 1000;
const PREFIX_MINUS: i32 = 480;
const TIMES: i32 = 400;

// region Shared leaf formatting

/// Strips the `System`` and `Global`` contexts, which are always on the context path.
pub fn short_symbol_name(name: &str) -> &str {
  for context in ["System`", "Global`"] {
    if let Some(rest) = name.strip_prefix(context) {
      if !rest.contains('`') {
        return rest;
      }
    }
  }
  name
}

fn format_real(value: f64) -> String {
  if value.is_nan() {
    "Indeterminate".to_string()
  } else if value.is_infinite() {
    if value > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
  } else if value.fract() == 0.0 && value.abs() < 1e15 {
    format!("{}.", value)
  } else {
    format!("{}", value)
  }
}

fn quote_string(value: &str) -> String {
  let mut quoted = String::with_capacity(value.len() + 2);
  quoted.push('"');
  for c in value.chars() {
    match c {
      '"'  => quoted.push_str("\\\""),
      '\\' => quoted.push_str("\\\\"),
      '\n' => quoted.push_str("\\n"),
      '\t' => quoted.push_str("\\t"),
      c    => quoted.push(c),
    }
  }
  quoted.push('"');
  quoted
}

// endregion

// region FullForm

fn full_form(atom: &Atom) -> String {
  match atom {
    Atom::String(s)   => quote_string(s),
    Atom::Integer(n)  => n.to_string(),
    Atom::Rational(q) => format!("Rational[{}, {}]", q.numer(), q.denom()),
    Atom::Real(x)     => format_real(*x),
    Atom::Complex(c)  => format!("Complex[{}, {}]", full_form(&c.0), full_form(&c.1)),
    Atom::Symbol(s)   => short_symbol_name(resolve_str(*s)).to_string(),
    Atom::Expression(e) => {
      let elements: Vec<String> = e.elements().iter().map(full_form).collect();
      format!("{}[{}]", full_form(e.head()), elements.join(", "))
    }
  }
}

// endregion

// region InputForm

/// If `atom` prints with a leading minus sign, the atom it negates.
fn negated(atom: &Atom) -> Option<Atom> {
  match atom {
    Atom::Integer(n) if n.is_negative()  => Some(Atom::Integer(-n)),
    Atom::Rational(q) if q.is_negative() => Some(Atom::rational(-q.as_ref().clone())),
    Atom::Real(x) if *x < 0.0            => Some(Atom::Real(-*x)),
    Atom::Expression(e) if e.head().is_symbol(*sys::TIMES) && e.len() >= 2 => {
      let first = &e.elements()[0];
      let rest = &e.elements()[1..];
      let positive_first = negated(first)?;
      if positive_first == Atom::integer(1) {
        if rest.len() == 1 {
          Some(rest[0].clone())
        } else {
          Some(SExpression::with_head(*sys::TIMES, rest.to_vec()))
        }
      } else {
        let mut elements = vec![positive_first];
        elements.extend_from_slice(rest);
        Some(SExpression::with_head(*sys::TIMES, elements))
      }
    }
    _ => None
  }
}

struct InputFormatter {
  form: DisplayForm,
}

impl InputFormatter {

  /// Formats `atom`, parenthesized if it binds looser than `min_precedence`.
  fn format(&self, atom: &Atom, min_precedence: i32) -> String {
    let (text, precedence) = self.format_with_precedence(atom);
    if precedence < min_precedence {
      format!("({})", text)
    } else {
      text
    }
  }

  fn format_with_precedence(&self, atom: &Atom) -> (String, i32) {
    match atom {
      Atom::String(s) => {
        match self.form {
          DisplayForm::Output => (s.to_string(), ATOMIC),
          _                   => (quote_string(s), ATOMIC),
        }
      }
      Atom::Integer(n) => {
        let precedence = if n.is_negative() { PREFIX_MINUS } else { ATOMIC };
        (n.to_string(), precedence)
      }
      Atom::Rational(q) => {
        let precedence = if q.is_negative() { PREFIX_MINUS } else { TIMES };
        (format!("{}/{}", q.numer(), q.denom()), precedence)
      }
      Atom::Real(x) => {
        let precedence = if *x < 0.0 { PREFIX_MINUS } else { ATOMIC };
        (format_real(*x), precedence)
      }
      Atom::Complex(c) => {
        (format!("Complex[{}, {}]", self.format(&c.0, 0), self.format(&c.1, 0)), ATOMIC)
      }
      Atom::Symbol(s) => (short_symbol_name(resolve_str(*s)).to_string(), ATOMIC),
      Atom::Expression(e) => self.format_expression(atom, e),
    }
  }

  fn join(&self, elements: &[Atom]) -> String {
    elements.iter().map(|e| self.format(e, 0)).collect::<Vec<_>>().join(", ")
  }

  fn format_expression(&self, atom: &Atom, expression: &Expression) -> (String, i32) {
    let elements = expression.elements();
    let head_name = match expression.head().symbol_name() {
      Some(name) => name,
      None       => return (self.format_application(expression), ATOMIC),
    };

    if head_name == *sys::LIST {
      return (format!("{{{}}}", self.join(elements)), ATOMIC);
    }

    if let Some(blank) = self.format_blank(atom) {
      return (blank, ATOMIC);
    }

    match (resolve_str(head_name), elements.len()) {

      ("System`Pattern", 2) => {
        if let Some(name) = elements[0].symbol_str() {
          let name = short_symbol_name(name);
          return match self.format_blank(&elements[1]) {
            Some(blank) => (format!("{}{}", name, blank), ATOMIC),
            None        => (format!("{}:{}", name, self.format(&elements[1], 151)), 150),
          };
        }
      }

      ("System`Optional", 1) => {
        return (format!("{}.", self.format(&elements[0], ATOMIC)), ATOMIC);
      }

      ("System`Optional", 2) => {
        return (format!("{}:{}", self.format(&elements[0], 151), self.format(&elements[1], 151)), 150);
      }

      ("System`Times", n) if n >= 2 => {
        if let Some(positive) = negated(atom) {
          return (format!("-{}", self.format(&positive, PREFIX_MINUS + 1)), PREFIX_MINUS);
        }
      }

      ("System`Plus", n) if n >= 2 => {
        let mut text = self.format(&elements[0], 311);
        for element in &elements[1..] {
          match negated(element) {
            Some(positive) => {
              text.push_str(" - ");
              text.push_str(&self.format(&positive, 311));
            }
            None => {
              text.push_str(" + ");
              text.push_str(&self.format(element, 311));
            }
          }
        }
        return (text, 310);
      }

      ("System`Not", 1) => {
        return (format!("!{}", self.format(&elements[0], 231)), 230);
      }

      ("System`Unset", 1) => {
        return (format!("{}=.", self.format(&elements[0], 41)), 40);
      }

      ("System`MessageName", 2) => {
        if let Some(tag) = elements[1].as_str() {
          return (format!("{}::{}", self.format(&elements[0], 751), tag), 750);
        }
      }

      ("System`Part", n) if n >= 2 => {
        return (format!("{}[[{}]]", self.format(&elements[0], ATOMIC), self.join(&elements[1..])), ATOMIC);
      }

      ("System`TagSet", 3) | ("System`TagSetDelayed", 3) => {
        let token = if head_name == *sys::TAG_SET { "=" } else { ":=" };
        return (
          format!(
            "{} /: {} {} {}",
            self.format(&elements[0], 41),
            self.format(&elements[1], 41),
            token,
            self.format(&elements[2], 40)
          ),
          40
        );
      }

      _ => { /* pass */ }
    }

    if let Some(operator) = OPERATOR_TABLES.by_head(resolve_str(head_name)) {
      let binary = matches!(operator.associativity, Associativity::Left | Associativity::Right | Associativity::Non);
      let arity_fits = if binary { elements.len() == 2 } else { elements.len() >= 2 };
      if operator.token != "[" && operator.token != "[[" && arity_fits {
        return (self.format_infix(operator.token, operator.precedence, operator.associativity, elements),
                operator.precedence);
      }
    }

    (self.format_application(expression), ATOMIC)
  }

  fn format_infix(&self, token: &str, precedence: i32, associativity: Associativity, elements: &[Atom]) -> String {
    let separator = match token {
      "*" | "^" | "?" => token.to_string(),
      ";"             => "; ".to_string(),
      _               => format!(" {} ", token),
    };
    let last = elements.len() - 1;
    elements
        .iter()
        .enumerate()
        .map(|(index, element)| {
          let min_precedence = match associativity {
            Associativity::Left  if index == 0    => precedence,
            Associativity::Right if index == last => precedence,
            _                                     => precedence + 1,
          };
          self.format(element, min_precedence)
        })
        .collect::<Vec<_>>()
        .join(&separator)
  }

  fn format_application(&self, expression: &Expression) -> String {
    format!("{}[{}]", self.format(expression.head(), ATOMIC), self.join(expression.elements()))
  }

  /// `_`, `_h`, `__`, `___h`, …
  fn format_blank(&self, atom: &Atom) -> Option<String> {
    let expression = atom.as_expression()?;
    let underscores = match expression.head().symbol_name()? {
      name if name == *sys::BLANK               => "_",
      name if name == *sys::BLANK_SEQUENCE      => "__",
      name if name == *sys::BLANK_NULL_SEQUENCE => "___",
      _                                         => return None,
    };
    match expression.elements() {
      []                       => Some(underscores.to_string()),
      [Atom::Symbol(head)] => Some(format!("{}{}", underscores, short_symbol_name(resolve_str(*head)))),
      _                        => None,
    }
  }
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;
  use crate::atom::Symbol;

  fn input_form(atom: &Atom) -> String {
    atom.format(&Formatter::from(DisplayForm::Input))
  }

  #[test]
  fn leaves() {
    assert_eq!(input_form(&Atom::real(3.0)), "3.");
    assert_eq!(input_form(&Atom::real(2.5)), "2.5");
    assert_eq!(input_form(&Atom::string("a\"b")), "\"a\\\"b\"");
    assert_eq!(input_form(&Symbol::from_str("System`Plus")), "Plus");
    assert_eq!(input_form(&Symbol::from_str("Private`x")), "Private`x");
  }

  #[test]
  fn operators_and_parentheses() {
    let a = Symbol::from_str("Global`a");
    let b = Symbol::from_str("Global`b");
    let c = Symbol::from_str("Global`c");
    let sum = SExpression::with_head(*sys::PLUS, vec![a.clone(), b.clone()]);
    let product = SExpression::with_head(*sys::TIMES, vec![sum, c.clone()]);
    assert_eq!(input_form(&product), "(a + b)*c");

    let difference = SExpression::with_head(
      *sys::PLUS,
      vec![a.clone(), SExpression::with_head(*sys::TIMES, vec![Atom::integer(-1), b.clone()])]
    );
    assert_eq!(input_form(&difference), "a - b");

    let power = SExpression::with_head(*sys::POWER, vec![a.clone(), Atom::integer(2)]);
    assert_eq!(input_form(&power), "a^2");

    let rule = SExpression::rule(a, SExpression::list(vec![b, c]));
    assert_eq!(input_form(&rule), "a -> {b, c}");
  }

  #[test]
  fn patterns() {
    let x = Symbol::from_str("Global`x");
    let blank = SExpression::with_head(*sys::BLANK, vec![Symbol::from_str("System`Integer")]);
    let pattern = SExpression::with_head(*sys::PATTERN, vec![x.clone(), blank]);
    assert_eq!(input_form(&pattern), "x_Integer");

    let optional = SExpression::with_head(
      *sys::OPTIONAL,
      vec![SExpression::with_head(*sys::PATTERN, vec![x, SExpression::with_head(*sys::BLANK, vec![])])]
    );
    assert_eq!(input_form(&optional), "x_.");
  }

  #[test]
  fn full_form_and_output_form() {
    let a = Symbol::from_str("Global`a");
    let sum = SExpression::with_head(*sys::PLUS, vec![a, Atom::string("s")]);
    assert_eq!(sum.format(&DisplayForm::Full.into()), "Plus[a, \"s\"]");
    assert_eq!(sum.format(&DisplayForm::Output.into()), "a + s");
  }
}
