/*!

The evaluation core of a Wolfram Language compatible term rewriting system: expressions, the pattern matcher, the
definition store, the evaluation loop, assignment, and the built-ins the core cannot do without.

```ignore
let mut session = Session::new();
session.evaluate_str("f[x_] := x^2").unwrap();
assert_eq!(session.evaluate_str("f[3]").unwrap().result.to_string(), "9");
```

*/

#![recursion_limit = "512"]

mod atom;
mod attributes;
mod expression;
mod format;
mod interner;
mod normal_form;
mod system_symbols;
pub mod logging;
pub mod settings;
mod parsing;
mod matching;
mod rules;
mod definitions;
mod interrupt;
mod evaluation;
mod evaluate;
mod assignment;
mod built_ins;

pub use atom::{Atom, SExpression, Symbol};
pub use attributes::{Attribute, Attributes};
pub use definitions::{Category, Definition, DefinitionError, Definitions, PersistenceError};
pub use evaluation::{Evaluation, EvaluationResult, OutputRecord, Session};
pub use format::{DisplayForm, Formattable, Formatter};
pub use interner::{interned, resolve_str, InternedString};
pub use interrupt::ControlSignal;
pub use matching::PatternError;
pub use parsing::{parse, ParseError};
pub use rules::{Arguments, NativeFn, Rule, RuleAction};
