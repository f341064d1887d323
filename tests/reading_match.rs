use clausal::ast::Declaration;
use clausal::binding::CompilationContext;
use clausal::clause::Clause;
use clausal::compiler::{ClauseReport, Compiler, Outcome};
use clausal::matching::{MatchOptions, Mismatch, rank_matches, word_walk};
use clausal::parser;
use clausal::vocabulary::Vocabulary;
use proptest::prelude::*;

fn setup() -> Compiler {
    let mut compiler = Compiler::new();
    compiler
        .compile(
            "entity type Person; entity type Company; entity type Team; value type Name;
             Person directs Company;
             Person has given- Name;
             Person is happy;
             Employee is a kind of Person;
             Person manages Team;",
        )
        .expect("model ok");
    compiler
}

// Parses a query and binds its clauses without matching anything.
fn bind<'v>(vocabulary: &'v mut Vocabulary, script: &str) -> (CompilationContext<'v>, Vec<Clause>) {
    let Some(Declaration::Query(parsed)) = parser::parse(script).expect("parse ok").into_iter().next() else {
        panic!("expected a query in {script}");
    };
    let mut context = CompilationContext::new(vocabulary);
    let clauses: Vec<Clause> = parsed.into_iter().map(|c| context.adopt(c)).collect();
    context.identify_players(&clauses).expect("players ok");
    context.bind_clauses(&clauses).expect("bind ok");
    (context, clauses)
}

fn query(compiler: &mut Compiler, script: &str) -> Vec<ClauseReport> {
    let outcomes = compiler.compile(script).expect("query ok");
    match outcomes.into_iter().last() {
        Some(Outcome::Query { matches, .. }) => matches,
        other => panic!("expected a query, got {other:?}"),
    }
}

#[test]
fn exact_reading_costs_nothing() {
    let mut compiler = setup();
    let matches = query(&mut compiler, "Person directs Company?");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].cost, 0);
    let reading = matches[0].reading.expect("reading");
    assert_eq!(compiler.vocabulary().expand_reading(reading), "Person directs Company");
    let declared = compiler.vocabulary().object_type("Person").expect("Person");
    let fact_type = matches[0].fact_type.expect("fact type");
    assert_eq!(compiler.vocabulary()[compiler.vocabulary()[fact_type].roles()[0]].object_type(), declared);
}

#[test]
fn absorbed_adjective_costs_one() {
    let mut compiler = setup();
    let matches = query(&mut compiler, "Person has given Name?");
    assert_eq!(matches[0].cost, 1);
    // the absorbed word is spliced out and the reading's role ref keeps the adjective
    assert_eq!(matches[0].clause, "Person has Name");
    let exact = query(&mut compiler, "Person has given- Name?");
    assert_eq!(exact[0].cost, 0);
    assert_eq!(exact[0].clause, "Person has Name");
    assert_eq!(exact[0].fact_type, matches[0].fact_type);
}

#[test]
fn matched_adjectives_are_stripped_and_rebound() {
    let mut compiler = Compiler::new();
    compiler
        .compile(
            "entity type Person; value type Name;
             Person has given- Name; Person has family- Name; Name is long;",
        )
        .expect("model ok");
    let matches = query(&mut compiler, "Person has given- Name and Person has family- Name and Name is long?");
    assert_eq!(matches.len(), 3);
    assert!(matches.iter().all(|m| m.cost == 0));
    let stored = compiler.vocabulary().queries().last().expect("stored query");
    assert_eq!(stored.steps.len(), 3);
    // both stripped mentions join the plain Name
    let name = compiler.vocabulary().object_type("Name").expect("Name");
    assert_eq!(stored.variables.iter().filter(|v| v.object_type == name).count(), 1);
}

#[test]
fn two_subtype_steps_on_an_inheritance_are_refused() {
    let mut compiler = Compiler::new();
    compiler
        .compile(
            "entity type Party; Person is a kind of Party; Company is a kind of Party;
             Employee is a kind of Person;",
        )
        .expect("model ok");
    let err = compiler.compile("Company is a kind of Employee?").unwrap_err();
    assert!(format!("{err}").contains("runs against the inheritance"), "{err}");

    let mut vocabulary = compiler.into_vocabulary();
    let reading = vocabulary
        .readings()
        .iter()
        .map(|r| r.id())
        .find(|&r| vocabulary.expand_reading(r) == "Person is a kind of Party")
        .expect("inheritance reading");
    let (context, clauses) = bind(&mut vocabulary, "Company is a kind of Employee?");
    // Company steps up to Person and Employee up to Party
    let walked = word_walk(&context, &clauses[0], reading, MatchOptions::default());
    assert!(matches!(walked, Err(Mismatch::TooManySubtypeSteps)), "{walked:?}");
    let ranking = rank_matches(&context, &clauses[0], MatchOptions::default());
    assert!(ranking.matches.is_empty());
    assert!(ranking.direction_conflicts.contains(&reading));
}

#[test]
fn missing_adjective_does_not_match() {
    let mut compiler = setup();
    let err = compiler.compile("Person has Name?").unwrap_err();
    assert!(format!("{err}").contains("No fact type matches 'Person has Name'"), "{err}");
}

#[test]
fn subtype_step_costs_one() {
    let mut compiler = setup();
    let matches = query(&mut compiler, "Employee manages Team?");
    assert_eq!(matches[0].cost, 1);
    let reading = matches[0].reading.expect("reading");
    assert_eq!(compiler.vocabulary().expand_reading(reading), "Person manages Team");
    let ranked = compiler.rank_readings("Employee manages Team").expect("rank ok");
    assert_eq!(ranked, vec![("Person manages Team".to_string(), 1)]);
}

#[test]
fn type_inheritance_reading_matches() {
    let mut compiler = setup();
    let matches = query(&mut compiler, "Employee is a kind of Person?");
    assert_eq!(matches[0].cost, 0);
    let fact_type = matches[0].fact_type.expect("fact type");
    assert!(compiler.vocabulary()[fact_type].is_type_inheritance());
    let matches = query(&mut compiler, "Person is a supertype of Employee?");
    assert_eq!(matches[0].fact_type, Some(fact_type));
}

#[test]
fn subtype_step_against_inheritance_is_reported() {
    let mut compiler = setup();
    let err = compiler.compile("Person is a kind of Employee?").unwrap_err();
    assert!(format!("{err}").contains("runs against the inheritance"), "{err}");
}

#[test]
fn equal_cost_over_different_fact_types_is_ambiguous() {
    let mut compiler = setup();
    compiler
        .compile("Manager is a kind of Person; Employee likes Company; Manager likes Company;")
        .expect("model ok");
    let before = compiler.vocabulary().queries().len();
    let err = compiler.compile("Person likes Company?").unwrap_err();
    let message = format!("{err}");
    assert!(message.contains("has more than one possible match"), "{message}");
    assert!(message.contains("'Employee likes Company' (cost 1)"), "{message}");
    assert!(message.contains("'Manager likes Company' (cost 1)"), "{message}");
    assert_eq!(compiler.vocabulary().queries().len(), before);
    // the exact player is cheaper than either subtype step
    let matches = query(&mut compiler, "Employee likes Company?");
    assert_eq!(matches[0].cost, 0);
}

#[test]
fn residual_adjectives_need_a_second_mention() {
    let mut compiler = Compiler::new();
    compiler
        .compile("entity type Person; value type Name; Person has Name; Person is called Name;")
        .expect("model ok");
    let err = compiler.compile("Person has given- Name?").unwrap_err();
    assert!(format!("{err}").contains("No fact type matches"), "{err}");
    let matches = query(&mut compiler, "Person has given- Name and Person is called given- Name?");
    assert_eq!(matches.len(), 2);
    assert!(matches.iter().all(|m| m.cost == 1));
    assert_eq!(matches[0].clause, "Person has given- Name");
    let ranked = compiler
        .rank_readings("Person has given- Name and Person is called given- Name")
        .expect("rank ok");
    assert_eq!(ranked, vec![("Person has Name".to_string(), 1)]);
}

#[test]
fn unmatched_not_negates_the_clause() {
    let mut compiler = setup();
    let matches = query(&mut compiler, "Person is not happy?");
    assert_eq!(matches[0].cost, 2);
    assert_eq!(matches[0].clause, "Person is happy");
    let stored = compiler.vocabulary().queries().last().expect("stored query");
    assert!(stored.steps[0].is_disallowed);
}

#[test]
fn negative_reading_serves_negated_clauses_only() {
    let mut compiler = setup();
    compiler.compile("it is not the case that Person is lazy;").expect("negative reading ok");
    let err = compiler.compile("Person is lazy?").unwrap_err();
    assert!(format!("{err}").contains("No fact type matches"), "{err}");
    let matches = query(&mut compiler, "it is not the case that Person is lazy?");
    assert_eq!(matches[0].cost, 0);
}

#[test]
fn ranking_is_cheapest_first() {
    let mut compiler = setup();
    compiler.compile("Employee has given- Name;").expect("model ok");
    let ranked = compiler.rank_readings("Employee has given Name").expect("rank ok");
    let costs: Vec<usize> = ranked.iter().map(|(_, cost)| *cost).collect();
    assert_eq!(costs, vec![1, 2]);
    assert_eq!(ranked[0].0, "Employee has given- Name");
}

proptest! {
    #[test]
    fn ranking_is_deterministic(pick in prop::sample::select(vec![
        "Person directs Company",
        "Person has given Name",
        "Employee manages Team",
        "Employee is happy",
        "Person is not happy",
    ])) {
        let compiler = setup();
        let first = compiler.rank_readings(pick).expect("rank ok");
        let second = compiler.rank_readings(pick).expect("rank ok");
        prop_assert_eq!(&first, &second);
        prop_assert!(first.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn every_absorbed_word_costs_one(n in 1usize..5) {
        let words = ["alpha", "beta", "gamma", "delta", "epsilon"];
        let adjective = &words[..n];
        let mut compiler = Compiler::new();
        let declared = format!(
            "entity type Person; value type Name; Person has {}- {} Name;",
            adjective[0],
            adjective[1..].join(" ")
        );
        compiler.compile(&declared).expect("model ok");
        let ranked = compiler
            .rank_readings(&format!("Person has {} Name", adjective.join(" ")))
            .expect("rank ok");
        prop_assert_eq!(ranked.len(), 1);
        prop_assert_eq!(ranked[0].1, n);
    }

    #[test]
    fn declared_clause_matches_itself_for_free(
        verbs in prop::sample::subsequence(vec!["owns", "likes", "keeps", "uses", "with", "for", "near", "beside"], 1..=3),
        adjective in prop::option::of(prop::sample::select(vec!["given", "preferred"])),
    ) {
        let mention = adjective.map_or("Name".to_string(), |a| format!("{a}- Name"));
        let clause = format!("Person {} {mention}", verbs.join(" "));
        let mut compiler = Compiler::new();
        let outcomes = compiler
            .compile(&format!("entity type Person; value type Name; {clause};"))
            .expect("model ok");
        let Some(Outcome::FactType { fact_type, created: true, .. }) = outcomes.last().cloned() else {
            panic!("expected a new fact type for {clause}");
        };
        let matches = query(&mut compiler, &format!("{clause}?"));
        prop_assert_eq!(matches[0].fact_type, Some(fact_type));
        prop_assert_eq!(matches[0].cost, 0);

        let mut vocabulary = compiler.into_vocabulary();
        let (context, clauses) = bind(&mut vocabulary, &format!("{clause}?"));
        let ranking = rank_matches(&context, &clauses[0], MatchOptions::default());
        prop_assert_eq!(ranking.matches.len(), 1);
        let side_effects = &ranking.matches[0].side_effects;
        prop_assert_eq!(side_effects.fact_type, fact_type);
        prop_assert!(side_effects.effects.iter().all(|e| e.cost() == 0 && !e.has_residual_adjectives()));
        prop_assert_eq!(side_effects.negation, None);
    }

    #[test]
    fn an_extra_adjective_never_lowers_a_cost(
        verb in prop::sample::select(vec!["has", "is called"]),
        adjective in prop::option::of(prop::sample::select(vec!["given", "family"])),
        explicit in any::<bool>(),
        hyphenated in any::<bool>(),
    ) {
        let mut compiler = Compiler::new();
        compiler
            .compile(
                "entity type Person; value type Name;
                 Person has Name; Person has given- Name; Person is called family- Name;",
            )
            .expect("model ok");
        let mention = |extra: bool| -> String {
            match (adjective, extra) {
                (None, false) => "Name".to_string(),
                (None, true) if hyphenated => "spare- Name".to_string(),
                (None, true) => "spare Name".to_string(),
                (Some(a), false) if explicit => format!("{a}- Name"),
                (Some(a), false) => format!("{a} Name"),
                (Some(a), true) if hyphenated && explicit => format!("spare- {a} Name"),
                (Some(a), true) if hyphenated => format!("{a} spare- Name"),
                (Some(a), true) if explicit => format!("spare {a}- Name"),
                (Some(a), true) => format!("spare {a} Name"),
            }
        };
        // the second clause gives residual adjectives a second mention
        let text = |extra: bool| format!("Person {verb} {} and Person owns {}", mention(extra), mention(extra));
        let plain = compiler.rank_readings(&text(false)).expect("rank ok");
        let extended = compiler.rank_readings(&text(true)).expect("rank ok");
        for (reading, cost) in &extended {
            let before = plain.iter().find(|(r, _)| r == reading);
            prop_assert!(
                before.is_some_and(|(_, c)| c <= cost),
                "{} costs {} with the extra adjective, before: {:?}", reading, cost, before
            );
        }
    }
}
