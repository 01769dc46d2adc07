/*!

Interned names of the `System`` symbols the core refers to by name. Every name is fully qualified.

*/

use lazy_static::lazy_static;

use crate::interner::{interned_static, InternedString};

macro_rules! system_symbols {
  ($($ident:ident => $name:literal),* $(,)?) => {
    lazy_static! {
      $(
        pub static ref $ident: InternedString = interned_static(concat!("System`", $name));
      )*
    }

    /// Every name in this module.
    pub fn all() -> Vec<InternedString> {
      vec![$(*$ident),*]
    }
  };
}

system_symbols! {
  // Structure
  LIST                => "List",
  SEQUENCE            => "Sequence",
  RULE                => "Rule",
  RULE_DELAYED        => "RuleDelayed",
  COMPOUND_EXPRESSION => "CompoundExpression",
  ALL                 => "All",

  // Atom heads
  INTEGER  => "Integer",
  RATIONAL => "Rational",
  REAL     => "Real",
  COMPLEX  => "Complex",
  STRING   => "String",
  SYMBOL   => "Symbol",

  // Patterns
  BLANK               => "Blank",
  BLANK_SEQUENCE      => "BlankSequence",
  BLANK_NULL_SEQUENCE => "BlankNullSequence",
  PATTERN             => "Pattern",
  CONDITION           => "Condition",
  PATTERN_TEST        => "PatternTest",
  OPTIONAL            => "Optional",
  ALTERNATIVES        => "Alternatives",
  VERBATIM            => "Verbatim",
  HOLD_PATTERN        => "HoldPattern",
  OPTIONS_PATTERN     => "OptionsPattern",
  DEFAULT             => "Default",

  // Assignment
  SET              => "Set",
  SET_DELAYED      => "SetDelayed",
  UP_SET           => "UpSet",
  UP_SET_DELAYED   => "UpSetDelayed",
  TAG_SET          => "TagSet",
  TAG_SET_DELAYED  => "TagSetDelayed",
  UNSET            => "Unset",
  CLEAR            => "Clear",
  CLEAR_ALL        => "ClearAll",
  ATTRIBUTES       => "Attributes",
  SET_ATTRIBUTES   => "SetAttributes",
  CLEAR_ATTRIBUTES => "ClearAttributes",
  PROTECT          => "Protect",
  UNPROTECT        => "Unprotect",
  OPTIONS          => "Options",
  FORMAT           => "Format",
  MESSAGE_NAME     => "MessageName",
  MESSAGES         => "Messages",
  OWN_VALUES       => "OwnValues",
  DOWN_VALUES      => "DownValues",
  SUB_VALUES       => "SubValues",
  UP_VALUES        => "UpValues",
  N_VALUES         => "NValues",
  DEFAULT_VALUES   => "DefaultValues",
  FORMAT_VALUES    => "FormatValues",
  PART             => "Part",
  N                => "N",

  // Evaluation control
  HOLD          => "Hold",
  HOLD_FORM     => "HoldForm",
  HOLD_COMPLETE => "HoldComplete",
  UNEVALUATED   => "Unevaluated",
  EVALUATE      => "Evaluate",
  THROW         => "Throw",
  CATCH         => "Catch",
  BREAK         => "Break",
  CONTINUE      => "Continue",
  RETURN        => "Return",
  ABORT         => "Abort",
  IF            => "If",

  // Logic and comparison
  TRUE          => "True",
  FALSE         => "False",
  NULL          => "Null",
  AND           => "And",
  OR            => "Or",
  NOT           => "Not",
  SAME_Q        => "SameQ",
  UNSAME_Q      => "UnsameQ",
  EQUAL         => "Equal",
  UNEQUAL       => "Unequal",
  LESS          => "Less",
  GREATER       => "Greater",
  LESS_EQUAL    => "LessEqual",
  GREATER_EQUAL => "GreaterEqual",
  MATCH_Q       => "MatchQ",

  // Arithmetic
  PLUS              => "Plus",
  TIMES             => "Times",
  POWER             => "Power",
  INFINITY          => "Infinity",
  DIRECTED_INFINITY => "DirectedInfinity",
  MACHINE_PRECISION => "MachinePrecision",

  // Structural queries and the rest
  HEAD        => "Head",
  LENGTH      => "Length",
  REPLACE     => "Replace",
  REPLACE_ALL => "ReplaceAll",
  CONTEXT     => "Context",
  PRINT       => "Print",
  MESSAGE     => "Message",
  GENERAL     => "General",
  STRING_FORM => "StringForm",
  THREAD      => "Thread",

  // Forms
  INPUT_FORM    => "InputForm",
  FULL_FORM     => "FullForm",
  OUTPUT_FORM   => "OutputForm",
  STANDARD_FORM => "StandardForm",

  // Special values and session variables
  FAILED                  => "$Failed",
  ABORTED                 => "$Aborted",
  DOLLAR_CONTEXT          => "$Context",
  DOLLAR_CONTEXT_PATH     => "$ContextPath",
  DOLLAR_RECURSION_LIMIT  => "$RecursionLimit",
  DOLLAR_ITERATION_LIMIT  => "$IterationLimit",
  DOLLAR_MODULE_NUMBER    => "$ModuleNumber",
  DOLLAR_MIN_PRECISION    => "$MinPrecision",
  DOLLAR_MAX_PRECISION    => "$MaxPrecision",
  DOLLAR_LINE             => "$Line",
  DOLLAR_HISTORY_LENGTH   => "$HistoryLength",
  DOLLAR_RANDOM_STATE     => "$RandomState",
}
