use clausal::clause::Literal;
use clausal::compiler::{Compiler, Outcome};
use clausal::query::{Query, StepId, VariableId};
use clausal::vocabulary::FactTypeKind;

fn setup() -> Compiler {
    let mut compiler = Compiler::new();
    compiler
        .compile(
            "entity type Person; entity type Company; entity type Team;
             value type Name; value type Age; value type Date;
             Person directs Company;
             Person has Name;
             Person has Age;
             Person is happy;
             Team is big;
             Directorship is where Person directs Company;
             Directorship began on Date;",
        )
        .expect("model ok");
    compiler
}

fn stored(compiler: &mut Compiler, script: &str) -> Query {
    match compiler.compile(script).expect("query ok").pop() {
        Some(Outcome::Query { query, .. }) => compiler.vocabulary()[query].clone(),
        other => panic!("expected a query, got {other:?}"),
    }
}

#[test]
fn steps_join_on_shared_variables() {
    let mut compiler = setup();
    let query = stored(&mut compiler, "Person directs Company and Person has Name?");
    assert_eq!(query.variables.len(), 3);
    assert_eq!(query.steps.len(), 2);
    let person = query.play(query.step(StepId(0)).input_play).variable;
    assert_eq!(query.play(query.step(StepId(1)).input_play).variable, person);
    assert_eq!(query.variable(person).plays.len(), 2);
}

#[test]
fn disconnected_clauses_are_refused() {
    let mut compiler = setup();
    let err = compiler.compile("Person directs Company and Team is big?").unwrap_err();
    let message = format!("{err}");
    assert!(
        message.contains("Query is disconnected between [Person directs Company] and [Team is big]"),
        "{message}"
    );
    assert!(compiler.vocabulary().queries().is_empty());
}

#[test]
fn unary_step_plays_its_variable_twice() {
    let mut compiler = setup();
    let query = stored(&mut compiler, "Person is happy?");
    let step = query.step(StepId(0));
    assert_ne!(step.input_play, step.output_play);
    assert_eq!(query.play(step.input_play).variable, query.play(step.output_play).variable);
    assert!(step.incidental_plays.is_empty());
}

#[test]
fn certainty_marks_steps() {
    let mut compiler = setup();
    let query = stored(&mut compiler, "Person is happy and maybe Person has Name?");
    assert!(!query.steps[0].is_optional);
    assert!(query.steps[1].is_optional);
    let query = stored(&mut compiler, "Person directs Company and it is not the case that Person is happy?");
    assert!(!query.steps[0].is_disallowed);
    assert!(query.steps[1].is_disallowed);
}

#[test]
fn literal_values_become_valued_variables() {
    let mut compiler = setup();
    let query = stored(&mut compiler, "Person has Name 'Fred'?");
    let values: Vec<&Literal> = query.variables.iter().filter_map(|v| v.value.as_ref()).collect();
    assert_eq!(values, vec![&Literal::Text("Fred".to_string())]);
}

#[test]
fn comparisons_join_through_comparison_fact_types() {
    let mut compiler = setup();
    let query = stored(&mut compiler, "Person has Age and Age > 18?");
    assert_eq!(query.steps.len(), 2);
    let comparison = query.steps[1].fact_type;
    assert_eq!(
        compiler.vocabulary()[comparison].kind(),
        &FactTypeKind::Comparison { operator: ">".to_string() }
    );
    let limit = query
        .variables
        .iter()
        .find(|v| v.value.is_some())
        .expect("valued variable");
    assert_eq!(limit.value, Some(Literal::Number("18".to_string())));
    // the same comparison is not made twice
    let again = stored(&mut compiler, "Person has Age and Age > 21?");
    assert_eq!(again.steps[1].fact_type, comparison);
}

#[test]
fn objectification_adds_a_link_step() {
    let mut compiler = setup();
    let query = stored(&mut compiler, "Directorship (where Person directs Company) began on Date?");
    assert_eq!(query.steps.len(), 3);
    let vocabulary = compiler.vocabulary();
    let directorship = vocabulary.object_type("Directorship").expect("Directorship");
    let outer = query
        .variables
        .iter()
        .position(|v| v.object_type == directorship)
        .expect("Directorship variable");
    assert_eq!(query.variables[outer].objectification_step, Some(StepId(0)));
    assert_eq!(query.steps[0].objectification_variable.map(|v| v.0), Some(outer));
    let link = &vocabulary[query.steps[1].fact_type];
    assert!(matches!(link.kind(), FactTypeKind::Link { objectification, .. } if *objectification == directorship));
    assert_eq!(query.play(query.steps[1].input_play).variable.0, outer);
}

#[test]
fn nested_clause_must_match_the_objectified_fact_type() {
    let mut compiler = setup();
    let err = compiler
        .compile("Directorship (where Person is happy) began on Date?")
        .unwrap_err();
    assert!(format!("{err}").contains("'Directorship' does not objectify 'Person is happy'"), "{err}");
}

#[test]
fn existential_clause_is_a_result_position() {
    let mut compiler = setup();
    let query = stored(&mut compiler, "Person?");
    assert_eq!(query.variables.len(), 1);
    assert!(query.steps.is_empty());
    assert_eq!(query.projection, vec![VariableId(0)]);

    let query = stored(&mut compiler, "Person and Person directs Company?");
    assert_eq!(query.steps.len(), 1);
    assert_eq!(query.projection.len(), 1);
    let person = compiler.vocabulary().object_type("Person").expect("Person");
    assert_eq!(query.variable(query.projection[0]).object_type, person);
}

#[test]
fn existential_clause_must_join_the_rest() {
    let mut compiler = setup();
    let err = compiler.compile("Person directs Company and Team?").unwrap_err();
    assert!(
        format!("{err}").contains("Query is disconnected between [Person directs Company] and [Team]"),
        "{err}"
    );
}

#[test]
fn unused_variable_is_refused() {
    let mut compiler = setup();
    let err = compiler
        .compile("Directorship (where Person) began on Date?")
        .unwrap_err();
    assert!(format!("{err}").contains("Query variable for Person is not used in any step"), "{err}");
}

#[test]
fn derived_fact_type_keeps_its_join() {
    let mut compiler = Compiler::new();
    compiler
        .compile(
            "entity type Person; Person is parent of Person;
             Person is grandparent of Person(2) where Person is parent of Person(3), Person(3) is parent of Person(2);",
        )
        .expect("derivation ok");
    let vocabulary = compiler.vocabulary();
    let grandparent = vocabulary
        .fact_types()
        .iter()
        .find(|ft| ft.derivation().is_some())
        .expect("derived fact type");
    assert_eq!(vocabulary.describe_fact_type(grandparent.id()), "Person is grandparent of Person");
    let query = &vocabulary[grandparent.derivation().expect("derivation")];
    assert_eq!(query.steps.len(), 2);
    assert_eq!(query.variables.len(), 3);
    assert_eq!(query.projection.len(), 2);
    assert_ne!(query.projection[0], query.projection[1]);
}
