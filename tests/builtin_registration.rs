//! A library built on the core adds its own built-ins to the builtin tier.
#![allow(non_snake_case)]

use std::{fs, time::{Duration, SystemTime}};

use symcore::{
  Arguments,
  Atom,
  Attribute,
  Attributes,
  ControlSignal,
  Definitions,
  Evaluation,
  Session,
};

fn Twice(arguments: &Arguments, _: &Atom, _: &mut Evaluation) -> Result<Option<Atom>, ControlSignal> {
  match arguments.get("n").and_then(Atom::to_i64) {
    Some(n) => Ok(Some(Atom::integer(2 * n))),
    None    => Ok(None),
  }
}

fn with_twice() -> Definitions {
  let mut definitions = Definitions::new_with_builtins(None);
  let attributes = Attributes::from(&[Attribute::Listable, Attribute::Protected][..]);
  definitions.register_builtin("Twice", "Twice[n_Integer]", "LibraryTwice", Twice, attributes, None)
             .unwrap();
  definitions
}

fn run(session: &mut Session, text: &str) -> String {
  session.evaluate_str(text).unwrap().result.to_string()
}

#[test]
fn registered_builtins_are_called() {
  let mut session = Session::with_definitions(with_twice());
  assert_eq!(run(&mut session, "Twice[21]"), "42");
  assert_eq!(run(&mut session, "Twice[{1, 2}]"), "{2, 4}");
  assert_eq!(run(&mut session, "Twice[x]"), "Twice[x]");
  assert_eq!(run(&mut session, "Attributes[Twice]"), "{Listable, Protected}");

  let result = session.evaluate_str("Twice[n_] := 0").unwrap();
  assert_eq!(result.message_names(), vec!["SetDelayed::write".to_string()]);
  assert_eq!(run(&mut session, "Twice[4]"), "8");
}

#[test]
fn registered_builtins_survive_the_builtin_cache() {
  let path = std::env::temp_dir().join(format!("symcore-library-cache-{}.json", std::process::id()));
  let _ = fs::remove_file(&path);

  with_twice().save_builtin_cache(&path).unwrap();
  let old = SystemTime::now() - Duration::from_secs(3600);
  let definitions = Definitions::new_with_builtin_cache(Some(&path), &[old]);
  let _ = fs::remove_file(&path);

  let mut session = Session::with_definitions(definitions);
  assert_eq!(run(&mut session, "Twice[5]"), "10");
}
