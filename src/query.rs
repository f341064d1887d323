// Join graph of a query or derivation. Each binding becomes a variable, each
// matched clause a step, and every reference a play of its variable in a role
// of the step's fact type. Nested clauses add the steps of the objectified fact
// type plus one link step tying the objectifying variable to it.

use std::collections::HashMap;

use roaring::RoaringBitmap;
use serde::Serialize;
use tracing::debug;

use crate::binding::{BindingId, CompilationContext};
use crate::clause::{Certainty, Clause, Literal, ReferenceId, RoleName};
use crate::error::{ClausalError, Result};
use crate::vocabulary::{FactTypeId, ObjectTypeId, OtherHasher, ReadingId, RoleId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct VariableId(pub usize);
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PlayId(pub usize);
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StepId(pub usize);

// ------------- Variable -------------
#[derive(Clone, Debug, Serialize)]
pub struct Variable {
    pub object_type: ObjectTypeId,
    pub role_name: Option<RoleName>,
    pub value: Option<Literal>,
    /// The step whose fact type this variable objectifies.
    pub objectification_step: Option<StepId>,
    pub plays: Vec<PlayId>,
}

// ------------- Play -------------
#[derive(Clone, Debug, Serialize)]
pub struct Play {
    pub variable: VariableId,
    pub role: RoleId,
    pub step: StepId,
}

// ------------- Step -------------
#[derive(Clone, Debug, Serialize)]
pub struct Step {
    pub fact_type: FactTypeId,
    pub reading: Option<ReadingId>,
    pub input_play: PlayId,
    pub output_play: PlayId,
    /// Plays beyond the first two.
    pub incidental_plays: Vec<PlayId>,
    pub is_disallowed: bool,
    pub is_optional: bool,
    pub objectification_variable: Option<VariableId>,
}
impl Step {
    pub fn plays(&self) -> impl Iterator<Item = PlayId> + '_ {
        [self.input_play, self.output_play].into_iter().chain(self.incidental_plays.iter().copied())
    }
}

// ------------- Query -------------
#[derive(Clone, Debug, Default, Serialize)]
pub struct Query {
    pub variables: Vec<Variable>,
    pub plays: Vec<Play>,
    pub steps: Vec<Step>,
    /// For derived fact types, the variable behind each role of the derived reading.
    /// For queries, the variables their existential clauses name.
    pub projection: Vec<VariableId>,
}
impl Query {
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0]
    }
    pub fn play(&self, id: PlayId) -> &Play {
        &self.plays[id.0]
    }
    pub fn step(&self, id: StepId) -> &Step {
        &self.steps[id.0]
    }
    /// Variables joined by a step, in play order.
    pub fn step_variables(&self, id: StepId) -> Vec<VariableId> {
        self.steps[id.0].plays().map(|p| self.plays[p.0].variable).collect()
    }
}

struct QueryBuilder<'c, 'v> {
    context: &'c mut CompilationContext<'v>,
    query: Query,
    variable_by_binding: HashMap<BindingId, VariableId, OtherHasher>,
    /// Variables named by existential clauses, which need no step.
    results: Vec<VariableId>,
}

impl<'c, 'v> QueryBuilder<'c, 'v> {
    fn variable_for(&self, reference: ReferenceId) -> Result<VariableId> {
        self.context
            .effective_binding(reference)
            .and_then(|b| self.variable_by_binding.get(&b).copied())
            .ok_or_else(|| ClausalError::UnusedVariable(self.context.describe_reference(reference)))
    }

    fn add_variables(&mut self, clauses: &[Clause]) {
        for r in self.context.all_refs(clauses) {
            let Some(binding) = self.context.effective_binding(r).and_then(|b| self.context.binding(b)) else {
                continue;
            };
            if self.variable_by_binding.contains_key(&binding.id()) {
                continue;
            }
            let id = VariableId(self.query.variables.len());
            self.query.variables.push(Variable {
                object_type: binding.player(),
                role_name: binding.role_name().cloned(),
                value: binding.literal().cloned(),
                objectification_step: None,
                plays: Vec::new(),
            });
            self.variable_by_binding.insert(binding.id(), id);
        }
    }

    fn add_step(
        &mut self,
        fact_type: FactTypeId,
        reading: Option<ReadingId>,
        mut plays: Vec<(VariableId, RoleId)>,
        certainty: Certainty,
    ) -> StepId {
        let step = StepId(self.query.steps.len());
        // a unary step plays its only variable twice
        if plays.len() == 1 {
            plays.push(plays[0]);
        }
        let mut ids = Vec::with_capacity(plays.len());
        for (variable, role) in plays {
            let play = PlayId(self.query.plays.len());
            self.query.plays.push(Play { variable, role, step });
            self.query.variables[variable.0].plays.push(play);
            ids.push(play);
        }
        let incidental_plays = ids.split_off(2.min(ids.len()));
        self.query.steps.push(Step {
            fact_type,
            reading,
            input_play: ids[0],
            output_play: ids[ids.len() - 1],
            incidental_plays,
            is_disallowed: certainty == Certainty::Negated,
            is_optional: certainty == Certainty::Maybe,
            objectification_variable: None,
        });
        step
    }

    // Builds the step of one clause after those of its nested clauses. Existential
    // clauses make no step of their own.
    fn add_clause(&mut self, clause: &Clause) -> Result<Option<StepId>> {
        for r in clause.refs() {
            let nested = self.context.reference(r).nested_clauses.clone();
            if nested.is_empty() {
                continue;
            }
            let outer = self.variable_for(r)?;
            for inner in &nested {
                let Some(inner_step) = self.add_clause(inner)? else {
                    continue;
                };
                self.query.steps[inner_step.0].objectification_variable = Some(outer);
                self.query.variables[outer.0].objectification_step = Some(inner_step);
                let first = self.query.play(self.query.steps[inner_step.0].input_play).clone();
                let vocabulary = self.context.vocabulary_mut();
                let link = vocabulary.link_fact_type(self.query.variables[outer.0].object_type, first.role);
                let link_roles = vocabulary[link].roles().to_vec();
                let link_reading = vocabulary[link].readings().first().copied();
                self.add_step(
                    link,
                    link_reading,
                    vec![(outer, link_roles[0]), (first.variable, link_roles[1])],
                    Certainty::Definite,
                );
            }
        }
        let Some(fact_type) = clause.fact_type else {
            return Ok(None);
        };
        let mut plays = Vec::new();
        for r in clause.refs() {
            let variable = self.variable_for(r)?;
            let reference = self.context.reference(r);
            let Some(role) = reference.role else {
                return Err(ClausalError::NoFactTypeMatch(self.context.describe_clause(clause)));
            };
            let vocabulary = self.context.vocabulary();
            let player = self.query.variables[variable.0].object_type;
            let role_player = vocabulary[role].object_type();
            if player != role_player && vocabulary.common_supertype(player, role_player).is_none() {
                return Err(ClausalError::IncompatiblePlayer {
                    player: vocabulary[player].name().to_string(),
                    role_player: vocabulary[role_player].name().to_string(),
                    reading: self.context.describe_clause(clause),
                });
            }
            plays.push((variable, role));
        }
        Ok(Some(self.add_step(fact_type, clause.reading, plays, clause.certainty)))
    }

    fn describe_step(&self, step: StepId) -> String {
        let vocabulary = self.context.vocabulary();
        let step = &self.query.steps[step.0];
        match step.reading {
            Some(reading) => vocabulary.expand_reading(reading),
            None => vocabulary.describe_fact_type(step.fact_type),
        }
    }

    fn describe_variable(&self, variable: VariableId) -> String {
        let variable = &self.query.variables[variable.0];
        let mut name = self.context.vocabulary()[variable.object_type].name().to_string();
        if let Some(role_name) = &variable.role_name {
            name.push_str(&format!(" {role_name}"));
        }
        name
    }

    // Every variable must play some role or be a result, and all variables must form
    // one connected graph.
    fn validate(&self) -> Result<()> {
        let query = &self.query;
        if let Some(unused) = (0..query.variables.len())
            .map(VariableId)
            .find(|v| query.variables[v.0].plays.is_empty() && !self.results.contains(v))
        {
            return Err(ClausalError::UnusedVariable(self.describe_variable(unused)));
        }
        let mut unvisited: RoaringBitmap = (0..query.variables.len() as u32).collect();
        let mut groups: Vec<Vec<String>> = Vec::new();
        while let Some(start) = unvisited.min() {
            unvisited.remove(start);
            let mut frontier = vec![start];
            let mut steps: Vec<StepId> = Vec::new();
            while let Some(v) = frontier.pop() {
                for &play in &query.variables[v as usize].plays {
                    let step = query.plays[play.0].step;
                    if steps.contains(&step) {
                        continue;
                    }
                    steps.push(step);
                    for other in query.step_variables(step) {
                        if unvisited.remove(other.0 as u32) {
                            frontier.push(other.0 as u32);
                        }
                    }
                }
            }
            steps.sort();
            groups.push(if steps.is_empty() {
                vec![self.describe_variable(VariableId(start as usize))]
            } else {
                steps.iter().map(|&s| self.describe_step(s)).collect()
            });
        }
        if groups.len() > 1 {
            return Err(ClausalError::DisconnectedQuery { groups });
        }
        Ok(())
    }
}

/// Builds and validates the join graph of matched clauses sharing bindings.
pub fn build_query(context: &mut CompilationContext, clauses: &[Clause]) -> Result<Query> {
    build_projected_query(context, clauses, &[])
}

/// Like [`build_query`], also projecting the given references (the roles of a derived
/// reading) onto the variables of the join.
pub fn build_projected_query(
    context: &mut CompilationContext,
    clauses: &[Clause],
    projection: &[ReferenceId],
) -> Result<Query> {
    let mut builder = QueryBuilder {
        context,
        query: Query::default(),
        variable_by_binding: HashMap::default(),
        results: Vec::new(),
    };
    builder.add_variables(clauses);
    for clause in clauses {
        if builder.add_clause(clause)?.is_some() {
            continue;
        }
        if let [r] = clause.refs().as_slice() {
            let variable = builder.variable_for(*r)?;
            if !builder.results.contains(&variable) {
                builder.results.push(variable);
            }
        }
    }
    builder.validate()?;
    for &r in projection {
        let variable = builder.variable_for(r)?;
        builder.query.projection.push(variable);
    }
    // without a derived reading, the existential clauses name what the query returns
    if projection.is_empty() {
        builder.query.projection = builder.results.clone();
    }
    debug!(
        variables = builder.query.variables.len(),
        steps = builder.query.steps.len(),
        "join graph built"
    );
    Ok(builder.query)
}
