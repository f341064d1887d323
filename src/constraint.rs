// The bridge from quantifiers and qualifiers written in a fact type declaration to
// the presence and ring constraints they imply.

use tracing::{debug, warn};

use crate::binding::CompilationContext;
use crate::clause::Clause;
use crate::error::{ClausalError, Result};
use crate::vocabulary::{PresenceConstraintId, RingConstraintId, RingKind, RoleId, RoleRef};

/// A quantifier on one reference constrains how often each combination of the other
/// players may occur: "Person has at most one Name" limits every Person to one Name.
/// Unary clauses have no other roles and are skipped.
pub fn embed_presence_constraints(context: &mut CompilationContext, clause: &Clause) -> Result<Vec<PresenceConstraintId>> {
    let mut embedded = Vec::new();
    let refs = clause.refs();
    let Some(role_sequence) = clause.role_sequence else {
        return Ok(embedded);
    };
    if refs.len() < 2 {
        return Ok(embedded);
    }
    let clause_role_refs: Vec<RoleRef> = context.vocabulary()[role_sequence].role_refs().to_vec();
    for r in refs {
        let reference = context.reference(r);
        let (Some(quantifier), Some(role)) = (reference.quantifier.clone(), reference.role) else {
            continue;
        };
        if quantifier.is_unconstrained() {
            continue;
        }
        let others: Vec<RoleRef> = clause_role_refs.iter().filter(|rr| rr.role != role).cloned().collect();
        let roles: Vec<RoleId> = others.iter().map(|rr| rr.role).collect();
        let vocabulary = context.vocabulary_mut();
        let constraint = match vocabulary.presence_constraint_over(&roles) {
            Some(existing) => {
                vocabulary.restrict_presence_constraint(existing, quantifier.min, quantifier.max)?;
                existing
            }
            None => {
                let spanning = vocabulary.add_role_sequence(others);
                vocabulary.add_presence_constraint(spanning, quantifier.min, quantifier.max, quantifier.enforcement)
            }
        };
        debug!(
            roles = %context.vocabulary().describe_role_sequence(context.vocabulary()[constraint].role_sequence()),
            min = ?quantifier.min,
            max = ?quantifier.max,
            "embedded presence constraint"
        );
        context.reference_mut(r).embedded_presence_constraint = Some(constraint);
        embedded.push(constraint);
    }
    Ok(embedded)
}

/// Qualifiers such as `[acyclic, intransitive]` make one ring constraint over the first
/// two roles of the clause whose players share a supertype. An existing ring constraint
/// over those roles is returned instead of adding another.
pub fn ring_constraint_from_qualifiers(context: &mut CompilationContext, clause: &Clause) -> Result<Option<RingConstraintId>> {
    if clause.qualifiers.is_empty() {
        return Ok(None);
    }
    let kinds = clause
        .qualifiers
        .iter()
        .map(|q| q.parse::<RingKind>())
        .collect::<Result<Vec<_>>>()?;
    let Some(role_sequence) = clause.role_sequence else {
        return Ok(None);
    };
    let vocabulary = context.vocabulary();
    let roles = vocabulary[role_sequence].roles();
    let mut pair = None;
    'search: for (i, &role) in roles.iter().enumerate() {
        for &other in &roles[i + 1..] {
            let shared = vocabulary.common_supertype(vocabulary[role].object_type(), vocabulary[other].object_type());
            if shared.is_some() {
                pair = Some((role, other));
                break 'search;
            }
        }
    }
    let Some((role, other)) = pair else {
        return Err(ClausalError::InvalidQualifier(format!(
            "{} needs two roles of compatible players in '{}'",
            clause.qualifiers.join(", "),
            context.describe_clause(clause)
        )));
    };
    if let Some(existing) = vocabulary.ring_constraint_over(role, other) {
        warn!(clause = %context.describe_clause(clause), "ring constraint already exists");
        return Ok(Some(existing));
    }
    Ok(Some(context.vocabulary_mut().add_ring_constraint(role, other, kinds)))
}
