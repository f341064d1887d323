// The compiler drives declarations through the core: it adopts parsed clauses
// into a fresh CompilationContext, binds them, matches or synthesises fact
// types, and builds join graphs for queries and derivations. A declaration
// that fails leaves the vocabulary exactly as it found it.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::ast::{self, Declaration};
use crate::binding::CompilationContext;
use crate::clause::{Clause, Conjunction, Phrase};
use crate::config::Settings;
use crate::constraint::{embed_presence_constraints, ring_constraint_from_qualifiers};
use crate::contraction::{Contraction, contract};
use crate::error::{ClausalError, Result};
use crate::matching::{MatchOptions, match_clause, rank_matches};
use crate::parser;
use crate::query::{build_projected_query, build_query};
use crate::synthesis::{adjust_for_match, make_fact_type, make_reading};
use crate::vocabulary::{FactTypeId, ObjectTypeId, QueryId, ReadingId, Vocabulary};

/// How one clause of a declaration was resolved.
#[derive(Clone, Debug, Serialize)]
pub struct ClauseReport {
    pub clause: String,
    pub fact_type: Option<FactTypeId>,
    pub reading: Option<ReadingId>,
    pub cost: usize,
    pub contraction: Option<Contraction>,
}

#[derive(Clone, Debug, Serialize)]
pub enum Outcome {
    ObjectType {
        object_type: ObjectTypeId,
    },
    Subtype {
        subtype: ObjectTypeId,
        fact_types: Vec<FactTypeId>,
    },
    FactType {
        fact_type: FactTypeId,
        created: bool,
        matches: Vec<ClauseReport>,
    },
    Query {
        query: QueryId,
        matches: Vec<ClauseReport>,
    },
}

fn reports(context: &CompilationContext, clauses: &[Clause]) -> Vec<ClauseReport> {
    clauses
        .iter()
        .map(|clause| ClauseReport {
            clause: context.describe_clause(clause),
            fact_type: clause.fact_type,
            reading: clause.reading,
            cost: clause.side_effects.as_ref().map_or(0, |s| s.cost()),
            contraction: clause.contracted,
        })
        .collect()
}

// Clauses of a fact type declaration either invoke one existing fact type or
// define a new one; those that match nothing become new readings of it.
fn define_fact_type(context: &mut CompilationContext, clauses: &mut [Clause]) -> Result<(FactTypeId, bool)> {
    let options = MatchOptions { exact_types: true };
    for clause in clauses.iter_mut() {
        if !clause.phrases.iter().any(|p| matches!(p, Phrase::Word(_))) {
            return Err(ClausalError::NoFactTypeMatch(context.describe_clause(clause)));
        }
        match_clause(context, clause, options)?;
    }
    let mut matched: Vec<FactTypeId> = Vec::new();
    for fact_type in clauses.iter().filter_map(|c| c.fact_type) {
        if !matched.contains(&fact_type) {
            matched.push(fact_type);
        }
    }
    if matched.len() > 1 {
        let vocabulary = context.vocabulary();
        return Err(ClausalError::ConflictingFactTypes(
            matched.iter().map(|&ft| vocabulary.describe_fact_type(ft)).collect(),
        ));
    }
    let (fact_type, created) = match matched.first() {
        Some(&existing) => (existing, false),
        None => (make_fact_type(context, &mut clauses[0])?, true),
    };
    for clause in clauses.iter_mut() {
        if clause.reading.is_some() {
            adjust_for_match(context, clause)?;
        } else {
            make_reading(context, clause, fact_type)?;
        }
    }
    for clause in clauses.iter() {
        embed_presence_constraints(context, clause)?;
        ring_constraint_from_qualifiers(context, clause)?;
    }
    Ok((fact_type, created))
}

// Every clause of a query must match, if need be by contraction.
fn match_query_clauses(context: &mut CompilationContext, clauses: &mut [Clause], contraction: bool) -> Result<()> {
    let options = MatchOptions::default();
    for index in 0..clauses.len() {
        if match_clause(context, &mut clauses[index], options)? {
            continue;
        }
        if contraction && index > 0 {
            contract(context, clauses, index, options)?;
            continue;
        }
        return Err(ClausalError::NoFactTypeMatch(context.describe_clause(&clauses[index])));
    }
    Ok(())
}

#[derive(Clone)]
pub struct Compiler {
    vocabulary: Vocabulary,
    settings: Settings,
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            vocabulary: Vocabulary::new(&settings.vocabulary),
            settings,
        }
    }
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
    pub fn into_vocabulary(self) -> Vocabulary {
        self.vocabulary
    }
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Compiles every declaration in the script, stopping at the first failure.
    /// Declarations before the failing one stay compiled.
    pub fn compile(&mut self, script: &str) -> Result<Vec<Outcome>> {
        let declarations = parser::parse(script)?;
        let mut outcomes = Vec::with_capacity(declarations.len());
        for declaration in declarations {
            outcomes.push(self.declare(declaration)?);
        }
        Ok(outcomes)
    }

    /// Compiles one declaration. On failure the vocabulary is restored.
    pub fn declare(&mut self, declaration: Declaration) -> Result<Outcome> {
        let started = Instant::now();
        let checkpoint = self.vocabulary.clone();
        match self.apply(declaration) {
            Ok(outcome) => {
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                info!(ms = elapsed_ms, fact_types = self.vocabulary.fact_types().len(), "declaration compiled");
                Ok(outcome)
            }
            Err(e) => {
                self.vocabulary = checkpoint;
                warn!(error = %e, "declaration rejected");
                Err(e)
            }
        }
    }

    fn context(&mut self) -> CompilationContext<'_> {
        CompilationContext::new(&mut self.vocabulary).with_forward_terms(&self.settings.allowed_forward_terms)
    }

    fn apply(&mut self, declaration: Declaration) -> Result<Outcome> {
        match declaration {
            Declaration::EntityType(name) => Ok(Outcome::ObjectType {
                object_type: self.vocabulary.add_entity_type(&name)?,
            }),
            Declaration::ValueType(name) => Ok(Outcome::ObjectType {
                object_type: self.vocabulary.add_value_type(&name)?,
            }),
            Declaration::Subtype { subtype, supertypes } => self.subtype(&subtype, &supertypes),
            Declaration::FactType(clauses) => {
                match clauses.iter().position(|c| c.conjunction == Some(Conjunction::Where)) {
                    Some(split) if split > 0 => self.derived_fact_type(clauses, split),
                    _ => self.fact_type(clauses).map(|(outcome, _)| outcome),
                }
            }
            Declaration::Objectification { term, clauses } => {
                let (outcome, fact_type) = self.fact_type(clauses)?;
                self.vocabulary.objectify(&term, fact_type)?;
                Ok(outcome)
            }
            Declaration::Query(clauses) => self.query(clauses),
        }
    }

    fn subtype(&mut self, subtype: &str, supertypes: &[String]) -> Result<Outcome> {
        let sub = match self.vocabulary.object_type(subtype) {
            Some(existing) => existing,
            None => self.vocabulary.add_entity_type(subtype)?,
        };
        let mut fact_types = Vec::with_capacity(supertypes.len());
        for name in supertypes {
            let (supertype, _) = self.context().resolve_player(name)?;
            fact_types.push(self.vocabulary.add_subtype(sub, supertype)?);
        }
        Ok(Outcome::Subtype {
            subtype: sub,
            fact_types,
        })
    }

    fn fact_type(&mut self, clauses: Vec<ast::Clause>) -> Result<(Outcome, FactTypeId)> {
        let mut context = self.context();
        let mut clauses: Vec<Clause> = clauses.into_iter().map(|c| context.adopt(c)).collect();
        context.identify_players(&clauses)?;
        context.bind_clauses(&clauses)?;
        let (fact_type, created) = define_fact_type(&mut context, &mut clauses)?;
        let outcome = Outcome::FactType {
            fact_type,
            created,
            matches: reports(&context, &clauses),
        };
        Ok((outcome, fact_type))
    }

    // `head where body`: the head is a fact type declaration, the body a query whose
    // join graph becomes the fact type's derivation.
    fn derived_fact_type(&mut self, clauses: Vec<ast::Clause>, split: usize) -> Result<Outcome> {
        let contraction = self.settings.contraction;
        let mut context = self.context();
        let mut clauses: Vec<Clause> = clauses.into_iter().map(|c| context.adopt(c)).collect();
        context.identify_players(&clauses)?;
        context.bind_clauses(&clauses)?;
        let (head, body) = clauses.split_at_mut(split);
        let (fact_type, created) = define_fact_type(&mut context, head)?;
        match_query_clauses(&mut context, body, contraction)?;
        context.loose_binding();
        let projection = head[0].refs();
        let query = build_projected_query(&mut context, body, &projection)?;
        let matches = reports(&context, &clauses);
        let vocabulary = context.vocabulary_mut();
        let query = vocabulary.add_query(query);
        vocabulary.set_derivation(fact_type, query);
        Ok(Outcome::FactType {
            fact_type,
            created,
            matches,
        })
    }

    fn query(&mut self, clauses: Vec<ast::Clause>) -> Result<Outcome> {
        let contraction = self.settings.contraction;
        let mut context = self.context();
        let mut clauses: Vec<Clause> = clauses.into_iter().map(|c| context.adopt(c)).collect();
        context.identify_players(&clauses)?;
        context.bind_clauses(&clauses)?;
        match_query_clauses(&mut context, &mut clauses, contraction)?;
        context.loose_binding();
        let query = build_query(&mut context, &clauses)?;
        info!(variables = query.variables.len(), steps = query.steps.len(), "query joined");
        let matches = reports(&context, &clauses);
        let query = context.vocabulary_mut().add_query(query);
        Ok(Outcome::Query { query, matches })
    }

    /// Ranks the readings the first clause of `text` could invoke, without changing
    /// the vocabulary. Each entry is the expanded reading and its cost.
    pub fn rank_readings(&self, text: &str) -> Result<Vec<(String, usize)>> {
        let script = format!("{}?", text.trim_end_matches(['?', ';']));
        let Some(Declaration::Query(clauses)) = parser::parse(&script)?.into_iter().next() else {
            return Err(ClausalError::Parse {
                message: format!("'{text}' is not a clause"),
                line: None,
                col: None,
            });
        };
        let mut vocabulary = self.vocabulary.clone();
        let mut context =
            CompilationContext::new(&mut vocabulary).with_forward_terms(&self.settings.allowed_forward_terms);
        let clauses: Vec<Clause> = clauses.into_iter().map(|c| context.adopt(c)).collect();
        context.identify_players(&clauses)?;
        context.bind_clauses(&clauses)?;
        let Some(clause) = clauses.first() else {
            return Ok(Vec::new());
        };
        let ranking = rank_matches(&context, clause, MatchOptions::default());
        Ok(ranking
            .matches
            .iter()
            .map(|m| (context.vocabulary().expand_reading(m.reading), m.cost))
            .collect())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
