// Side effects record what a successful word-walk would do to a clause. They are
// computed without touching the clause and applied only once a match is selected.

use serde::Serialize;
use tracing::trace;

use crate::binding::CompilationContext;
use crate::clause::{Certainty, Clause, ReferenceId, adjective_of};
use crate::error::Result;
use crate::vocabulary::{FactTypeId, ObjectTypeId, ReadingId, RoleId, RoleSequenceId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MatchSideEffect {
    pub reference: ReferenceId,
    pub role: RoleId,
    /// Position of the role in the reading's role sequence.
    pub role_ref: usize,
    /// Phrase positions of plain words taken as leading adjective.
    pub absorbed_precursors: Vec<usize>,
    /// Phrase positions of plain words taken as trailing adjective.
    pub absorbed_followers: Vec<usize>,
    pub common_supertype: Option<ObjectTypeId>,
    /// Explicit adjective words the reading's role does not account for. These are
    /// all the reference keeps once the match is applied.
    pub residual_leading: Option<String>,
    pub residual_trailing: Option<String>,
}
impl MatchSideEffect {
    pub fn has_residual_adjectives(&self) -> bool {
        self.residual_leading.is_some() || self.residual_trailing.is_some()
    }
    pub fn cost(&self) -> usize {
        self.absorbed_precursors.len() + self.absorbed_followers.len() + usize::from(self.common_supertype.is_some())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MatchSideEffects {
    pub fact_type: FactTypeId,
    pub reading: ReadingId,
    pub role_sequence: RoleSequenceId,
    /// One per reference, in clause order.
    pub effects: Vec<MatchSideEffect>,
    /// Phrase position of a `not` the reading did not contain.
    pub negation: Option<usize>,
}
impl MatchSideEffects {
    pub fn has_residual_adjectives(&self) -> bool {
        self.effects.iter().any(MatchSideEffect::has_residual_adjectives)
    }
    pub fn cost(&self) -> usize {
        self.effects.iter().map(MatchSideEffect::cost).sum::<usize>()
            + usize::from(self.has_residual_adjectives())
            + if self.negation.is_some() { 2 } else { 0 }
    }
    pub fn subtype_steps(&self) -> usize {
        self.effects.iter().filter(|e| e.common_supertype.is_some()).count()
    }
    pub fn describe(&self, context: &CompilationContext) -> String {
        let vocabulary = context.vocabulary();
        let mut parts: Vec<String> = self
            .effects
            .iter()
            .filter(|e| e.cost() > 0 || e.has_residual_adjectives())
            .map(|e| {
                let mut part = context.reference(e.reference).term.clone();
                if !e.absorbed_precursors.is_empty() {
                    part.push_str(&format!(" absorbs {} precursor(s)", e.absorbed_precursors.len()));
                }
                if !e.absorbed_followers.is_empty() {
                    part.push_str(&format!(" absorbs {} follower(s)", e.absorbed_followers.len()));
                }
                if let Some(supertype) = e.common_supertype {
                    part.push_str(&format!(" steps via {}", vocabulary[supertype].name()));
                }
                if e.has_residual_adjectives() {
                    part.push_str(" keeps residual adjectives");
                }
                part
            })
            .collect();
        if self.negation.is_some() {
            parts.push("implicitly negated".to_string());
        }
        parts.join(", ")
    }
}

/// Applies the side effects of a selected match to the clause, in reverse role order.
/// References are stripped of the adjectives the reading accounts for, absorbed words
/// are spliced out, and every reference whose binding key changes is rebound.
pub fn apply_side_effects(
    context: &mut CompilationContext,
    clause: &mut Clause,
    side_effects: MatchSideEffects,
) -> Result<()> {
    let mut spliced: Vec<usize> = Vec::new();
    for effect in side_effects.effects.iter().rev() {
        let before = context.binding_key(effect.reference);
        let reference = context.reference_mut(effect.reference);
        reference.role = Some(effect.role);
        reference.role_ref = Some((side_effects.role_sequence, effect.role_ref));
        // the role ref carries the matched adjectives from here on
        reference.leading_adjective = effect.residual_leading.clone();
        reference.trailing_adjective = effect.residual_trailing.clone();
        reference.residual_leading = effect.residual_leading.clone();
        reference.residual_trailing = effect.residual_trailing.clone();
        if context.binding_key(effect.reference) != before {
            context.rebind(effect.reference)?;
        }
        spliced.extend(effect.absorbed_precursors.iter().chain(&effect.absorbed_followers));
    }
    spliced.extend(side_effects.negation);
    spliced.sort_unstable();
    for index in spliced.into_iter().rev() {
        clause.phrases.remove(index);
    }
    if side_effects.negation.is_some() {
        clause.certainty = match clause.certainty {
            Certainty::Negated => Certainty::Definite,
            _ => Certainty::Negated,
        };
    }
    trace!(
        reading = side_effects.reading.0,
        cost = side_effects.cost(),
        "side effects applied"
    );
    clause.fact_type = Some(side_effects.fact_type);
    clause.reading = Some(side_effects.reading);
    clause.role_sequence = Some(side_effects.role_sequence);
    clause.side_effects = Some(side_effects);
    Ok(())
}

/// Joins the words of two adjective parts, leaving `None` when both are empty.
pub fn join_adjective(first: &[String], second: &[String]) -> Option<String> {
    let words: Vec<String> = first.iter().chain(second).cloned().collect();
    adjective_of(&words)
}
