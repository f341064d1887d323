// Contraction lets a clause leave out a player it shares with the clause before
// it, as in "Person(1) is parent of Person(2) and is happy". When such a clause
// fails to match, a copy of a neighbouring reference is put back in and the
// clause is matched again.

use serde::Serialize;
use tracing::debug;

use crate::binding::CompilationContext;
use crate::clause::{Clause, Conjunction, Phrase, Reference, ReferenceId};
use crate::error::{ClausalError, Result};
use crate::matching::{MatchOptions, match_clause};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Contraction {
    /// The previous clause's last reference was prepended.
    Left,
    /// The previous clause's first reference was appended.
    Right,
}

/// Whether `current` carries the previous clause's sentence on. `that` and `who`
/// always do, `and` or no conjunction at all do too, anything else only when it
/// repeats the previous clause's conjunction.
pub fn is_continuing(previous: Option<Conjunction>, current: Option<Conjunction>) -> bool {
    match current {
        None | Some(Conjunction::And) | Some(Conjunction::That) => true,
        Some(conjunction) => previous == Some(conjunction),
    }
}

// A fresh reference that binds to the same binding as `source`.
fn copy_reference(context: &mut CompilationContext, source: ReferenceId) -> Result<ReferenceId> {
    let original = context.reference(source);
    let mut copy = Reference::new(&original.term);
    copy.leading_adjective = original.leading_adjective.clone();
    copy.trailing_adjective = original.trailing_adjective.clone();
    copy.role_name = original.role_name.clone();
    copy.literal = original.literal.clone();
    copy.player = original.player;
    copy.player_by_role_name = original.player_by_role_name;
    let copy = context.add_reference(copy);
    context.bind(copy)?;
    Ok(copy)
}

/// Retries matching `clauses[index]` with a borrowed player, first on the left, then on
/// the right. The clause is left unchanged when neither side matches.
pub fn contract(
    context: &mut CompilationContext,
    clauses: &mut [Clause],
    index: usize,
    options: MatchOptions,
) -> Result<Contraction> {
    let (before, rest) = clauses.split_at_mut(index);
    let (Some(previous), Some(clause)) = (before.last(), rest.first_mut()) else {
        return Err(ClausalError::NoFactTypeMatch(String::new()));
    };
    if !is_continuing(previous.conjunction, clause.conjunction) {
        return Err(ClausalError::NoFactTypeMatch(context.describe_clause(clause)));
    }
    let previous_refs = previous.refs();
    for side in [Contraction::Left, Contraction::Right] {
        let source = match side {
            Contraction::Left => previous_refs.last(),
            Contraction::Right => previous_refs.first(),
        };
        let Some(&source) = source else {
            continue;
        };
        let copy = copy_reference(context, source)?;
        match side {
            Contraction::Left => clause.phrases.insert(0, Phrase::Reference(copy)),
            Contraction::Right => clause.phrases.push(Phrase::Reference(copy)),
        }
        if match_clause(context, clause, options)? {
            debug!(clause = %context.describe_clause(clause), ?side, "contracted");
            clause.contracted = Some(side);
            return Ok(side);
        }
        clause.phrases.retain(|p| *p != Phrase::Reference(copy));
        context.unbind(copy);
    }
    Err(ClausalError::NoFactTypeMatch(context.describe_clause(clause)))
}
