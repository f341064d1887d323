use clausal::compiler::Compiler;
use clausal::vocabulary::{Enforcement, RingKind, Vocabulary};

fn setup() -> Compiler {
    let mut compiler = Compiler::new();
    compiler
        .compile("entity type Person; entity type Company; value type Name;")
        .expect("model ok");
    compiler
}

fn spanned(vocabulary: &Vocabulary, index: usize) -> String {
    let pc = &vocabulary.presence_constraints()[index];
    vocabulary.describe_role_sequence(pc.role_sequence())
}

#[test]
fn quantifier_constrains_the_other_roles() {
    let mut compiler = setup();
    compiler.compile("Person has at most one Name;").expect("fact type ok");
    let vocabulary = compiler.vocabulary();
    assert_eq!(vocabulary.presence_constraints().len(), 1);
    let pc = &vocabulary.presence_constraints()[0];
    assert_eq!(pc.max_frequency(), Some(1));
    assert_eq!(pc.min_frequency(), None);
    assert!(!pc.is_mandatory());
    assert_eq!(spanned(vocabulary, 0), "Person");
}

#[test]
fn exactly_one_is_mandatory() {
    let mut compiler = setup();
    compiler.compile("each Person has exactly one Name;").expect("fact type ok");
    let vocabulary = compiler.vocabulary();
    assert_eq!(vocabulary.presence_constraints().len(), 1);
    let pc = &vocabulary.presence_constraints()[0];
    assert_eq!((pc.min_frequency(), pc.max_frequency()), (Some(1), Some(1)));
    assert!(pc.is_mandatory());
}

#[test]
fn quantifiers_on_both_sides_make_two_constraints() {
    let mut compiler = setup();
    compiler
        .compile("Person directs at least 1 Company, Company is directed by from 1 to 3 Person;")
        .expect("fact type ok");
    let vocabulary = compiler.vocabulary();
    assert_eq!(vocabulary.presence_constraints().len(), 2);
    assert_eq!(spanned(vocabulary, 0), "Person");
    assert_eq!(vocabulary.presence_constraints()[0].min_frequency(), Some(1));
    assert_eq!(spanned(vocabulary, 1), "Company");
    assert_eq!(vocabulary.presence_constraints()[1].max_frequency(), Some(3));
}

#[test]
fn repeated_quantifier_reuses_the_constraint() {
    let mut compiler = setup();
    compiler.compile("Person has at most one Name;").expect("fact type ok");
    compiler.compile("Person has at least one Name;").expect("restriction ok");
    let vocabulary = compiler.vocabulary();
    assert_eq!(vocabulary.presence_constraints().len(), 1);
    let pc = &vocabulary.presence_constraints()[0];
    assert_eq!((pc.min_frequency(), pc.max_frequency()), (Some(1), Some(1)));
    assert!(pc.is_mandatory());
}

#[test]
fn conflicting_frequency_is_refused_and_rolled_back() {
    let mut compiler = setup();
    compiler.compile("Person has at most one Name;").expect("fact type ok");
    let readings = compiler.vocabulary().readings().len();
    let err = compiler
        .compile("Person has at most 2 Name, Name is of at most one Person;")
        .unwrap_err();
    assert!(format!("{err}").contains("Conflicting maximum frequency for the constraint over Person"), "{err}");
    assert_eq!(compiler.vocabulary().readings().len(), readings);
    assert_eq!(compiler.vocabulary().presence_constraints()[0].max_frequency(), Some(1));
}

#[test]
fn unary_quantifier_constrains_nothing() {
    let mut compiler = setup();
    compiler.compile("exactly one Person is happy;").expect("fact type ok");
    assert!(compiler.vocabulary().presence_constraints().is_empty());
}

#[test]
fn enforcement_is_recorded() {
    let mut compiler = setup();
    compiler
        .compile("Person has at most one (otherwise alert Company) Name;")
        .expect("fact type ok");
    let pc = &compiler.vocabulary().presence_constraints()[0];
    assert_eq!(
        pc.enforcement(),
        Some(&Enforcement {
            action: "alert".to_string(),
            agent: Some("Company".to_string())
        })
    );
}

#[test]
fn qualifiers_make_a_ring_constraint() {
    let mut compiler = setup();
    compiler
        .compile("Person is parent of Person [acyclic, intransitive];")
        .expect("fact type ok");
    let vocabulary = compiler.vocabulary();
    assert_eq!(vocabulary.ring_constraints().len(), 1);
    let ring = &vocabulary.ring_constraints()[0];
    assert_eq!(ring.kinds(), &[RingKind::Acyclic, RingKind::Intransitive]);
    assert_ne!(ring.role(), ring.other_role());
    compiler
        .compile("Person is parent of Person [acyclic];")
        .expect("same ring ok");
    assert_eq!(compiler.vocabulary().ring_constraints().len(), 1);
}

#[test]
fn ring_over_subtype_players() {
    let mut compiler = setup();
    compiler
        .compile("Employee is a kind of Person; Employee reports to Person [irreflexive];")
        .expect("fact type ok");
    assert_eq!(compiler.vocabulary().ring_constraints()[0].kinds(), &[RingKind::Irreflexive]);
}

#[test]
fn bad_qualifiers_are_refused() {
    let mut compiler = setup();
    let err = compiler.compile("Person is parent of Person [bogus];").unwrap_err();
    assert!(format!("{err}").contains("Invalid qualifier: bogus"), "{err}");
    assert!(compiler.vocabulary().fact_types().is_empty());
    let err = compiler.compile("Person directs Company [acyclic];").unwrap_err();
    assert!(format!("{err}").contains("needs two roles of compatible players"), "{err}");
}
