// Making new fact types and readings out of clauses that matched nothing, and
// recording how matched clauses differ from the reading they invoked.

use tracing::debug;

use crate::binding::CompilationContext;
use crate::clause::{Certainty, Clause, Phrase, ReferenceId, RoleName};
use crate::error::{ClausalError, Result};
use crate::vocabulary::{FactTypeId, FactTypeKind, ReadingId, RoleId, RoleRef};

/// A new fact type with one role per reference of the clause, in clause order.
pub fn make_fact_type(context: &mut CompilationContext, clause: &mut Clause) -> Result<FactTypeId> {
    let refs = clause.refs();
    let fact_type = context.vocabulary_mut().new_fact_type(FactTypeKind::Plain);
    for r in refs {
        let reference = context.reference(r);
        let player = reference
            .player
            .ok_or_else(|| ClausalError::UnrecognisedObjectType(reference.term.clone()))?;
        let role_name = match &reference.role_name {
            Some(RoleName::Named(name)) => Some(name.clone()),
            _ => None,
        };
        let role = context.vocabulary_mut().add_role(fact_type, player, role_name);
        context.reference_mut(r).role = Some(role);
    }
    clause.fact_type = Some(fact_type);
    Ok(fact_type)
}

// The role of `fact_type` a reference stands for: its own, else the role of another
// mention of the same binding, else a role some reading already gives the same player
// and adjectives. Roles already taken by the clause are skipped.
fn role_for(context: &CompilationContext, r: ReferenceId, fact_type: FactTypeId, taken: &[RoleId]) -> Option<RoleId> {
    let vocabulary = context.vocabulary();
    let in_fact_type = |role: RoleId| vocabulary[role].fact_type() == fact_type && !taken.contains(&role);
    let reference = context.reference(r);
    if let Some(role) = reference.role.filter(|&role| in_fact_type(role)) {
        return Some(role);
    }
    let by_binding = reference.binding.and_then(|b| context.binding(b)).and_then(|binding| {
        binding
            .refs()
            .iter()
            .filter_map(|&sibling| context.reference(sibling).role)
            .find(|&role| in_fact_type(role))
    });
    if by_binding.is_some() {
        return by_binding;
    }
    // a matched mention was stripped of these adjectives and rebound elsewhere
    vocabulary[fact_type]
        .readings()
        .iter()
        .flat_map(|&reading| vocabulary[vocabulary[reading].role_sequence()].role_refs())
        .find(|rr| {
            in_fact_type(rr.role)
                && Some(vocabulary[rr.role].object_type()) == reference.player
                && rr.leading_adjective == reference.leading_adjective
                && rr.trailing_adjective == reference.trailing_adjective
        })
        .map(|rr| rr.role)
}

/// Adds the clause as a new reading of `fact_type`. Every reference must share a
/// binding with some role player of the fact type.
pub fn make_reading(context: &mut CompilationContext, clause: &mut Clause, fact_type: FactTypeId) -> Result<ReadingId> {
    let mut role_refs: Vec<RoleRef> = Vec::new();
    let mut text: Vec<String> = Vec::new();
    for phrase in &clause.phrases {
        match phrase {
            Phrase::Word(word) => text.push(word.clone()),
            Phrase::Reference(r) => {
                let taken: Vec<RoleId> = role_refs.iter().map(|rr| rr.role).collect();
                let Some(role) = role_for(context, *r, fact_type, &taken) else {
                    return Err(ClausalError::UnmatchedRolePlayer {
                        term: context.describe_reference(*r),
                        fact_type: context.vocabulary().describe_fact_type(fact_type),
                    });
                };
                let reference = context.reference(*r);
                text.push(format!("{{{}}}", role_refs.len()));
                role_refs.push(RoleRef::with_adjectives(
                    role,
                    reference.leading_adjective.clone(),
                    reference.trailing_adjective.clone(),
                ));
            }
            Phrase::Comparison { .. } => {
                return Err(ClausalError::NoFactTypeMatch(context.describe_clause(clause)));
            }
        }
    }
    let refs = clause.refs();
    let vocabulary = context.vocabulary_mut();
    let role_sequence = vocabulary.add_role_sequence(role_refs.clone());
    let reading = vocabulary.add_reading(
        fact_type,
        role_sequence,
        text.join(" "),
        clause.certainty == Certainty::Negated,
    )?;
    for (ordinal, (r, role_ref)) in refs.into_iter().zip(role_refs).enumerate() {
        let reference = context.reference_mut(r);
        reference.role = Some(role_ref.role);
        reference.role_ref = Some((role_sequence, ordinal));
    }
    debug!(reading = %context.vocabulary().expand_reading(reading), "new reading");
    clause.fact_type = Some(fact_type);
    clause.reading = Some(reading);
    clause.role_sequence = Some(role_sequence);
    Ok(reading)
}

/// After a match, gives the clause its own role sequence when it keeps residual
/// adjectives or lists the roles in another order than the reading, and records
/// role names the clause declares on the matched roles.
pub fn adjust_for_match(context: &mut CompilationContext, clause: &mut Clause) -> Result<()> {
    let Some(role_sequence) = clause.role_sequence else {
        return Ok(());
    };
    let refs = clause.refs();
    for &r in &refs {
        let reference = context.reference(r);
        if let (Some(role), Some(RoleName::Named(name))) = (reference.role, reference.role_name.clone()) {
            context.vocabulary_mut().name_role(role, &name)?;
        }
    }
    let clause_roles: Vec<Option<RoleId>> = refs.iter().map(|&r| context.reference(r).role).collect();
    let reading_roles: Vec<Option<RoleId>> = context.vocabulary()[role_sequence]
        .roles()
        .into_iter()
        .map(Some)
        .collect();
    let residual = refs.iter().any(|&r| {
        let reference = context.reference(r);
        reference.residual_leading.is_some() || reference.residual_trailing.is_some()
    });
    if !residual && clause_roles == reading_roles {
        return Ok(());
    }
    let mut role_refs = Vec::with_capacity(refs.len());
    for &r in &refs {
        let reference = context.reference(r);
        let Some(role) = reference.role else {
            return Err(ClausalError::UnmatchedRolePlayer {
                term: context.describe_reference(r),
                fact_type: context.describe_clause(clause),
            });
        };
        role_refs.push(RoleRef::with_adjectives(
            role,
            reference.residual_leading.clone(),
            reference.residual_trailing.clone(),
        ));
    }
    let adjusted = context.vocabulary_mut().add_role_sequence(role_refs);
    for (ordinal, r) in refs.into_iter().enumerate() {
        context.reference_mut(r).role_ref = Some((adjusted, ordinal));
    }
    clause.role_sequence = Some(adjusted);
    Ok(())
}
