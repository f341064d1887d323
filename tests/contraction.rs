use clausal::clause::{Conjunction, RoleName};
use clausal::compiler::{ClauseReport, Compiler, Outcome};
use clausal::config::Settings;
use clausal::contraction::{Contraction, is_continuing};
use clausal::query::StepId;

const MODEL: &str = "entity type Person; entity type Company;
    Person is parent of Person;
    Person is happy;
    Person directs Company;
    Company is owned by Person;";

fn setup() -> Compiler {
    let mut compiler = Compiler::new();
    compiler.compile(MODEL).expect("model ok");
    compiler
}

fn query(compiler: &mut Compiler, script: &str) -> Vec<ClauseReport> {
    match compiler.compile(script).expect("query ok").pop() {
        Some(Outcome::Query { matches, .. }) => matches,
        other => panic!("expected a query, got {other:?}"),
    }
}

#[test]
fn left_contraction_borrows_the_last_player() {
    let mut compiler = setup();
    let matches = query(&mut compiler, "Person(1) is parent of Person(2) and is happy?");
    assert_eq!(matches[0].contraction, None);
    assert_eq!(matches[1].contraction, Some(Contraction::Left));
    assert_eq!(matches[1].clause, "Person (2) is happy");

    let stored = compiler.vocabulary().queries().last().expect("stored query");
    assert_eq!(stored.steps.len(), 2);
    let happy = stored.step(StepId(1));
    let player = stored.variable(stored.play(happy.input_play).variable);
    assert_eq!(player.role_name, Some(RoleName::Subscript(2)));
}

#[test]
fn right_contraction_borrows_the_first_player() {
    let mut compiler = setup();
    let matches = query(&mut compiler, "Person directs Company and Company is owned by?");
    assert_eq!(matches[1].contraction, Some(Contraction::Right));
    assert_eq!(matches[1].clause, "Company is owned by Person");
    let stored = compiler.vocabulary().queries().last().expect("stored query");
    // the borrowed Person is the same variable in both steps
    assert_eq!(stored.variables.len(), 2);
}

#[test]
fn contraction_needs_a_continuing_conjunction() {
    let mut compiler = setup();
    let err = compiler.compile("Person(1) is parent of Person(2) or is happy?").unwrap_err();
    assert!(format!("{err}").contains("No fact type matches 'is happy'"), "{err}");
}

#[test]
fn contraction_can_be_switched_off() {
    let settings = Settings {
        contraction: false,
        ..Settings::default()
    };
    let mut compiler = Compiler::with_settings(settings);
    compiler.compile(MODEL).expect("model ok");
    let err = compiler.compile("Person(1) is parent of Person(2) and is happy?").unwrap_err();
    assert!(format!("{err}").contains("No fact type matches"), "{err}");
}

#[test]
fn continuing_conjunctions() {
    assert!(is_continuing(None, None));
    assert!(is_continuing(Some(Conjunction::Or), Some(Conjunction::And)));
    assert!(is_continuing(None, Some(Conjunction::That)));
    assert!(is_continuing(Some(Conjunction::Comma), Some(Conjunction::Comma)));
    assert!(!is_continuing(None, Some(Conjunction::Or)));
    assert!(!is_continuing(Some(Conjunction::And), Some(Conjunction::Comma)));
}
