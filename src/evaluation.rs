/*!

# Evaluation

An `Evaluation` is the state of one top level evaluation: the definition store it owns for the duration, the output
it has produced, the current nesting depth, and the flag by which the caller asks it to stop.

The entry point is `evaluate`, which runs the evaluation on a worker thread so that it can be given a stack sized
for `$RecursionLimit` and a wall clock timeout. When the timeout expires the caller raises the stop flag and keeps
waiting. The worker notices the flag the next time it is about to try rules, unwinds with `ControlSignal::TimedOut`,
and hands the store back. Nothing is killed, so a built-in that never returns to the evaluator cannot be stopped.

`Session` wraps a store and a timeout for callers that evaluate one input after another.

*/

use std::{
  fmt::{Display, Formatter},
  mem,
  panic::{self, AssertUnwindSafe},
  sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, RecvTimeoutError},
    Arc,
  },
  thread,
  time::Duration,
};

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::{
  atom::{Atom, SExpression},
  attributes::Attributes,
  definitions::{Category, Definitions},
  format::{DisplayForm, Formattable},
  interner::{resolve_str, InternedString},
  interrupt::ControlSignal,
  logging::{log, Channel},
  parsing::{parse, ParseError},
  rules::RuleAction,
  settings::{
    worker_stack_size,
    DEFAULT_ITERATION_LIMIT,
    DEFAULT_RECURSION_LIMIT,
    MAX_RECURSION_DEPTH,
    MIN_EVALUATION_LIMIT,
  },
  system_symbols as sys,
};

lazy_static! {
  static ref PLACEHOLDER: Regex = Regex::new(r"`([0-9]+)`").unwrap();
}

/// What an evaluation says besides its result, in the order it was said.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputRecord {
  Message {
    symbol: String,
    tag   : String,
    text  : String,
  },
  Print(String),
}

impl Display for OutputRecord {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      OutputRecord::Message { symbol, tag, text } => write!(f, "{}::{}: {}", symbol, tag, text),
      OutputRecord::Print(text)                   => write!(f, "{}", text),
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationResult {
  pub result: Atom,
  pub output: Vec<OutputRecord>,
}

impl EvaluationResult {
  /// The messages only, as `symbol::tag` strings.
  pub fn message_names(&self) -> Vec<String> {
    self.output
        .iter()
        .filter_map(|record| match record {
          OutputRecord::Message { symbol, tag, .. } => Some(format!("{}::{}", symbol, tag)),
          OutputRecord::Print(_)                    => None,
        })
        .collect()
  }
}

pub struct Evaluation {
  definitions : Definitions,
  output      : Vec<OutputRecord>,
  depth       : usize,
  stop        : Arc<AtomicBool>,
  /// The depth the stack of the current thread was sized for, if known.
  stack_levels: Option<usize>,
  /// `(generation, recursion limit, iteration limit)` as last read from the store.
  limits      : Option<(u64, usize, Option<usize>)>,
}

impl Evaluation {
  pub fn new(definitions: Definitions) -> Evaluation {
    Evaluation::with_stop_flag(definitions, Arc::new(AtomicBool::new(false)))
  }

  pub fn with_stop_flag(definitions: Definitions, stop: Arc<AtomicBool>) -> Evaluation {
    Evaluation {
      definitions,
      output      : vec![],
      depth       : 0,
      stop,
      stack_levels: None,
      limits      : None,
    }
  }

  pub fn definitions(&self) -> &Definitions {
    &self.definitions
  }

  pub fn definitions_mut(&mut self) -> &mut Definitions {
    &mut self.definitions
  }

  pub fn output(&self) -> &[OutputRecord] {
    &self.output
  }

  pub fn into_parts(self) -> (Definitions, Vec<OutputRecord>) {
    (self.definitions, self.output)
  }

  // region Evaluation

  pub fn evaluate(&mut self, atom: &Atom) -> Result<Atom, ControlSignal> {
    crate::evaluate::evaluate(self, atom)
  }

  /// Qualifies the symbols of `expression`, evaluates it, and turns whatever signal reaches the top into a value.
  pub fn evaluate_top_level(&mut self, expression: &Atom) -> Atom {
    self.depth = 0;
    let expression = self.definitions.qualify_symbols(expression);
    log(Channel::Debug, 4, format!("Evaluating {}", expression).as_str());

    match self.evaluate(&expression) {
      Ok(result) => result,
      Err(signal) => {
        log(Channel::Notice, 4, format!("Evaluation of {} ended by {}.", expression, signal).as_str());
        self.handle_signal(signal)
      }
    }
  }

  fn handle_signal(&mut self, signal: ControlSignal) -> Atom {
    match signal {
      ControlSignal::Return(value) => value,

      ControlSignal::Throw(value, tag) => {
        let mut elements = vec![value];
        elements.extend(tag);
        let throw = SExpression::with_head(*sys::THROW, elements);
        self.message(*sys::THROW, "nocatch", vec![throw.clone()]);
        SExpression::hold(throw)
      }

      ControlSignal::Break => {
        let signal = SExpression::with_head(*sys::BREAK, vec![]);
        self.message(*sys::BREAK, "nofdw", vec![]);
        SExpression::hold(signal)
      }

      ControlSignal::Continue => {
        let signal = SExpression::with_head(*sys::CONTINUE, vec![]);
        self.message(*sys::CONTINUE, "nofdw", vec![]);
        SExpression::hold(signal)
      }

      ControlSignal::TimedOut => {
        self.message(*sys::GENERAL, "timeout", vec![]);
        Atom::Symbol(*sys::ABORTED)
      }

      ControlSignal::Abort | ControlSignal::RecursionLimit | ControlSignal::IterationLimit => {
        Atom::Symbol(*sys::ABORTED)
      }
    }
  }

  /// `evaluate_top_level` with a panic turned into `$Aborted`, so that the store survives it.
  fn evaluate_guarded(&mut self, expression: &Atom) -> Atom {
    match panic::catch_unwind(AssertUnwindSafe(|| self.evaluate_top_level(expression))) {
      Ok(result) => result,
      Err(_) => {
        log(Channel::Error, 1, format!("The evaluation of {} panicked.", expression).as_str());
        Atom::Symbol(*sys::ABORTED)
      }
    }
  }

  /// Fails with `TimedOut` once the caller has asked the evaluation to stop.
  pub fn check_stopped(&self) -> Result<(), ControlSignal> {
    if self.stop.load(Ordering::Relaxed) {
      Err(ControlSignal::TimedOut)
    } else {
      Ok(())
    }
  }

  // endregion

  // region Limits

  fn limits(&mut self) -> (usize, Option<usize>) {
    let generation = self.definitions.generation();
    if let Some((cached_at, recursion, iteration)) = self.limits {
      if cached_at == generation {
        return (recursion, iteration);
      }
    }
    let recursion = recursion_limit(&mut self.definitions);
    let iteration = self.definitions
                        .get_config_value(*sys::DOLLAR_ITERATION_LIMIT, Some(DEFAULT_ITERATION_LIMIT))
                        .map(|limit| limit.max(MIN_EVALUATION_LIMIT));
    self.limits = Some((generation, recursion, iteration));
    (recursion, iteration)
  }

  /// The nesting depth at which evaluation gives up. Never more than the stack was sized for.
  pub fn recursion_limit(&mut self) -> usize {
    let (limit, _) = self.limits();
    match self.stack_levels {
      Some(levels) => limit.min(levels),
      None         => limit,
    }
  }

  /// How often one node may be rewritten, or `None` for no limit.
  pub fn iteration_limit(&mut self) -> Option<usize> {
    self.limits().1
  }

  pub fn depth(&self) -> usize {
    self.depth
  }

  /// Enters a nested evaluation. Fails with `RecursionLimit`, after saying so, if that is one level too many.
  pub(crate) fn enter(&mut self) -> Result<(), ControlSignal> {
    let limit = self.recursion_limit();
    if self.depth >= limit {
      self.message(*sys::DOLLAR_RECURSION_LIMIT, "reclim", vec![Atom::from(limit as i64)]);
      return Err(ControlSignal::RecursionLimit);
    }
    self.depth += 1;
    Ok(())
  }

  pub(crate) fn leave(&mut self) {
    self.depth = self.depth.saturating_sub(1);
  }

  // endregion

  // region Definitions

  pub fn attributes(&mut self, name: InternedString) -> Attributes {
    self.definitions.get_attributes(name)
  }

  /// Rewrites `expression` with the first rule of `category` of `name` that applies to it.
  pub fn get_value(
    &mut self,
    name      : InternedString,
    category  : Category,
    expression: &Atom
  ) -> Result<Option<Atom>, ControlSignal>
  {
    for rule in self.definitions.get_values(name, category) {
      if let Some(result) = rule.apply(self, expression)? {
        return Ok(Some(result));
      }
    }
    Ok(None)
  }

  /// The default of an optional argument of `name`: from `Default[name, index, count]` if defined, else from
  /// `Default[name, index]`, else from `Default[name]`.
  pub fn default_value(
    &mut self,
    name : InternedString,
    index: Option<usize>,
    count: Option<usize>
  ) -> Result<Option<Atom>, ControlSignal>
  {
    let position: Vec<Atom> = index.into_iter().chain(count).map(|n| Atom::from(n as i64)).collect();
    for length in (0..=position.len()).rev() {
      let mut elements = vec![Atom::Symbol(name)];
      elements.extend_from_slice(&position[..length]);
      let query = SExpression::with_head(*sys::DEFAULT, elements);

      if let Some(result) = self.get_value(name, Category::Default, &query)? {
        return if result.same_q(&query) {
          Ok(Some(result))
        } else {
          Ok(Some(self.evaluate(&result)?))
        };
      }
    }
    Ok(None)
  }

  // endregion

  // region Output

  /// Issues the message `symbol::tag`. The text is looked up as a message of `symbol`, then of `General`, and
  /// `` `n` `` in it is replaced by the `n`th of `arguments`.
  pub fn message(&mut self, symbol: InternedString, tag: &str, arguments: Vec<Atom>) {
    let short_name = self.definitions.shorten_name(resolve_str(symbol));
    let text = match self.message_text(symbol, tag) {
      Some(text) => interpolate(&text, &arguments),
      None       => format!("Message {}::{} not found.", short_name, tag),
    };
    log(Channel::Notice, 4, format!("{}::{}: {}", short_name, tag, text).as_str());
    self.output.push(OutputRecord::Message { symbol: short_name, tag: tag.to_string(), text });
  }

  fn message_text(&mut self, symbol: InternedString, tag: &str) -> Option<String> {
    for owner in [symbol, *sys::GENERAL] {
      let wanted = SExpression::message_name(owner, tag);
      for rule in self.definitions.get_values(owner, Category::Message) {
        let mut pattern = rule.pattern();
        while pattern.has_form(*sys::HOLD_PATTERN, Some(1)) {
          pattern = &pattern.elements()[0];
        }
        if !pattern.same_q(&wanted) {
          continue;
        }
        if let RuleAction::Template(text) = rule.action() {
          if let Some(text) = text.as_str() {
            return Some(text.to_string());
          }
        }
      }
    }
    None
  }

  pub fn print(&mut self, text: String) {
    log(Channel::Debug, 4, format!("Print: {}", text).as_str());
    self.output.push(OutputRecord::Print(text));
  }

  // endregion
}

fn interpolate(text: &str, arguments: &[Atom]) -> String {
  PLACEHOLDER.replace_all(text, |captures: &Captures| {
    captures[1].parse::<usize>()
               .ok()
               .and_then(|n| n.checked_sub(1))
               .and_then(|n| arguments.get(n))
               .map(|argument| argument.format(&DisplayForm::Input.into()))
               .unwrap_or_else(|| captures[0].to_string())
  }).into_owned()
}

fn recursion_limit(definitions: &mut Definitions) -> usize {
  match definitions.get_config_value(*sys::DOLLAR_RECURSION_LIMIT, Some(DEFAULT_RECURSION_LIMIT)) {
    Some(limit) => limit.clamp(MIN_EVALUATION_LIMIT, *MAX_RECURSION_DEPTH),
    None        => *MAX_RECURSION_DEPTH,
  }
}

// region Top level

/// Evaluates `expression` against `definitions` on a worker thread. With a `timeout`, an evaluation that runs past
/// it is stopped at its next opportunity and gives `$Aborted`. Changes made to the store before that are kept.
pub fn evaluate(definitions: &mut Definitions, expression: &Atom, timeout: Option<Duration>) -> EvaluationResult {
  let levels = recursion_limit(definitions);
  let stop = Arc::new(AtomicBool::new(false));
  let (to_worker, worker_inbox) = mpsc::channel::<Definitions>();
  let (to_caller, caller_inbox) = mpsc::channel::<(Definitions, EvaluationResult)>();

  let worker_stop = stop.clone();
  let worker_expression = expression.clone();
  let spawned = thread::Builder::new()
    .name("evaluation".to_string())
    .stack_size(worker_stack_size(levels))
    .spawn(move || {
      let definitions = match worker_inbox.recv() {
        Ok(definitions) => definitions,
        Err(_)          => return,
      };
      let mut evaluation = Evaluation::with_stop_flag(definitions, worker_stop);
      evaluation.stack_levels = Some(levels);
      let result = evaluation.evaluate_guarded(&worker_expression);
      let (definitions, output) = evaluation.into_parts();
      to_caller.send((definitions, EvaluationResult { result, output })).ok();
    });

  let handle = match spawned {
    Ok(handle) => handle,
    Err(error) => {
      log(
        Channel::Warning,
        2,
        format!("Could not start an evaluation thread ({}). Evaluating on the calling thread.", error).as_str()
      );
      let mut evaluation = Evaluation::with_stop_flag(mem::take(definitions), stop);
      let result = evaluation.evaluate_guarded(expression);
      let (returned, output) = evaluation.into_parts();
      *definitions = returned;
      return EvaluationResult { result, output };
    }
  };

  if let Err(mpsc::SendError(returned)) = to_worker.send(mem::take(definitions)) {
    *definitions = returned;
    handle.join().ok();
    return EvaluationResult { result: Atom::Symbol(*sys::ABORTED), output: vec![] };
  }

  let reply = match timeout {
    None => caller_inbox.recv().ok(),
    Some(timeout) => {
      match caller_inbox.recv_timeout(timeout) {
        Ok(reply) => Some(reply),
        Err(RecvTimeoutError::Timeout) => {
          log(Channel::Notice, 4, format!("Evaluation timed out after {:?}. Stopping.", timeout).as_str());
          stop.store(true, Ordering::Relaxed);
          caller_inbox.recv().ok()
        }
        Err(RecvTimeoutError::Disconnected) => None,
      }
    }
  };
  handle.join().ok();

  match reply {
    Some((returned, result)) => {
      *definitions = returned;
      result
    }
    None => {
      log(Channel::Error, 1, "The evaluation thread exited without returning the definitions. Reloading the builtins.");
      *definitions = Definitions::new_with_builtins(None);
      EvaluationResult { result: Atom::Symbol(*sys::ABORTED), output: vec![] }
    }
  }
}

/// A definition store together with the settings for evaluating against it.
pub struct Session {
  definitions: Definitions,
  timeout    : Option<Duration>,
}

impl Default for Session {
  fn default() -> Self {
    Session::new()
  }
}

impl Session {
  /// A session with the builtins loaded and no timeout.
  pub fn new() -> Session {
    Session::with_definitions(Definitions::new_with_builtins(None))
  }

  pub fn with_definitions(definitions: Definitions) -> Session {
    Session { definitions, timeout: None }
  }

  pub fn set_timeout(&mut self, timeout: Option<Duration>) {
    self.timeout = timeout;
  }

  pub fn definitions(&self) -> &Definitions {
    &self.definitions
  }

  pub fn definitions_mut(&mut self) -> &mut Definitions {
    &mut self.definitions
  }

  pub fn evaluate(&mut self, expression: &Atom) -> EvaluationResult {
    evaluate(&mut self.definitions, expression, self.timeout)
  }

  pub fn evaluate_str(&mut self, text: &str) -> Result<EvaluationResult, ParseError> {
    let expression = parse(text)?;
    Ok(self.evaluate(&expression))
  }
}

// endregion


#[cfg(test)]
mod tests {
  use super::*;
  use crate::rules::Rule;

  #[test]
  fn placeholders_are_replaced_in_input_form() {
    let text = interpolate("Symbol `1` is `2`.", &[Atom::symbol("System`Plus"), Atom::string("x")]);
    assert_eq!(text, "Symbol Plus is \"x\".");
    assert_eq!(interpolate("`3` stays", &[]), "`3` stays");
  }

  #[test]
  fn messages_fall_back_to_general() {
    let mut evaluation = Evaluation::new(Definitions::new_with_builtins(None));
    evaluation.message(*sys::SET, "wrsym", vec![Atom::symbol("System`Plus")]);
    assert_eq!(
      evaluation.output()[0],
      OutputRecord::Message {
        symbol: "Set".to_string(),
        tag   : "wrsym".to_string(),
        text  : "Symbol Plus is Protected.".to_string(),
      }
    );
  }

  #[test]
  fn missing_messages_say_so() {
    let mut evaluation = Evaluation::new(Definitions::new_with_builtins(None));
    evaluation.message(*sys::SET, "nosuchtag", vec![]);
    assert_eq!(evaluation.output()[0].to_string(), "Set::nosuchtag: Message Set::nosuchtag not found.");
  }

  #[test]
  fn symbol_messages_shadow_general_ones() {
    let mut definitions = Definitions::new_with_builtins(None);
    let f = definitions.lookup_name("f");
    let rule = Rule::template(SExpression::message_name(f, "wrsym"), Atom::string("mine")).unwrap();
    definitions.add_message(f, rule);
    let mut evaluation = Evaluation::new(definitions);
    evaluation.message(f, "wrsym", vec![]);
    assert_eq!(evaluation.output()[0].to_string(), "f::wrsym: mine");
  }

  #[test]
  fn limits_follow_the_store() {
    let mut definitions = Definitions::new_with_builtins(None);
    definitions.set_ownvalue(*sys::DOLLAR_RECURSION_LIMIT, Atom::integer(5));
    definitions.set_ownvalue(*sys::DOLLAR_ITERATION_LIMIT, Atom::Symbol(*sys::INFINITY));
    let mut evaluation = Evaluation::new(definitions);
    assert_eq!(evaluation.recursion_limit(), MIN_EVALUATION_LIMIT);
    assert_eq!(evaluation.iteration_limit(), None);
  }

  #[test]
  fn stop_flag_times_out() {
    let stop = Arc::new(AtomicBool::new(false));
    let evaluation = Evaluation::with_stop_flag(Definitions::new(), stop.clone());
    assert!(evaluation.check_stopped().is_ok());
    stop.store(true, Ordering::Relaxed);
    assert_eq!(evaluation.check_stopped(), Err(ControlSignal::TimedOut));
  }

  #[test]
  fn top_level_signals_become_values() {
    let mut evaluation = Evaluation::new(Definitions::new_with_builtins(None));
    assert_eq!(evaluation.handle_signal(ControlSignal::Return(Atom::integer(3))), Atom::integer(3));
    assert_eq!(evaluation.handle_signal(ControlSignal::Break).to_string(), "Hold[Break[]]");
    assert_eq!(evaluation.handle_signal(ControlSignal::RecursionLimit), Atom::Symbol(*sys::ABORTED));
    assert_eq!(
      evaluation.handle_signal(ControlSignal::Throw(Atom::integer(1), None)).to_string(),
      "Hold[Throw[1]]"
    );
    let tags: Vec<String> = evaluation.output()
                                      .iter()
                                      .map(|record| record.to_string())
                                      .collect();
    assert_eq!(tags.len(), 2);
    assert!(tags[0].starts_with("Break::nofdw"));
    assert!(tags[1].starts_with("Throw::nocatch"));
  }

  #[test]
  fn a_timed_out_evaluation_leaves_the_session_usable() {
    let mut session = Session::new();
    session.evaluate_str("$IterationLimit = Infinity").unwrap();
    session.evaluate_str("f[n_] := f[n + 1]").unwrap();
    session.set_timeout(Some(Duration::from_millis(50)));

    let result = session.evaluate_str("f[0]").unwrap();
    assert_eq!(result.result, Atom::Symbol(*sys::ABORTED));
    assert_eq!(result.message_names(), vec!["General::timeout".to_string()]);

    let result = session.evaluate_str("g = 1 + 1").unwrap();
    assert_eq!(result.result, Atom::integer(2));
    assert_eq!(session.evaluate_str("DownValues[f]").unwrap().result.to_string(), "{HoldPattern[f[n_]] :> f[n + 1]}");
  }

  #[test]
  fn protected_symbols_refuse_new_rules() {
    let mut session = Session::new();
    session.evaluate_str("f[1] = one").unwrap();
    session.evaluate_str("Protect[f]").unwrap();

    let result = session.evaluate_str("f[x_] := x").unwrap();
    assert_eq!(result.result, Atom::Symbol(*sys::FAILED));
    assert_eq!(result.output.len(), 1);
    assert_eq!(result.output[0].to_string(), "SetDelayed::write: Tag f in f[x_] is Protected.");
    assert_eq!(session.evaluate_str("DownValues[f]").unwrap().result.to_string(), "{HoldPattern[f[1]] :> one}");
  }

  #[test]
  fn limit_and_protection_messages_are_rendered() {
    let mut session = Session::new();
    session.evaluate_str("$RecursionLimit = 40").unwrap();
    session.evaluate_str("f[n_] := h[f[n - 1]]").unwrap();
    let result = session.evaluate_str("f[1]").unwrap();
    assert_eq!(result.result, Atom::Symbol(*sys::ABORTED));
    assert_eq!(result.output.len(), 1);
    assert_eq!(result.output[0].to_string(), "$RecursionLimit::reclim: Recursion depth of 40 exceeded.");

    session.evaluate_str("Protect[z]").unwrap();
    let result = session.evaluate_str("z = 3").unwrap();
    assert_eq!(result.result, Atom::integer(3));
    assert_eq!(result.output.len(), 1);
    assert_eq!(result.output[0].to_string(), "Set::wrsym: Symbol z is Protected.");

    // Later messages in the same process still render.
    let result = session.evaluate_str("z = 4").unwrap();
    assert_eq!(result.output[0].to_string(), "Set::wrsym: Symbol z is Protected.");
  }

  #[test]
  fn the_store_comes_back_from_the_worker() {
    let mut definitions = Definitions::new_with_builtins(None);
    let expression = parse("a = 5").unwrap();
    let result = evaluate(&mut definitions, &expression, None);
    assert_eq!(result.result, Atom::integer(5));
    let a = definitions.lookup_name("a");
    assert_eq!(definitions.get_ownvalue(a), Some(Atom::integer(5)));
  }
}
