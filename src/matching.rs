// Matching a clause against the readings already in the vocabulary.
//
// Ranking is pure: it walks every candidate reading against the clause and
// returns what would happen if that reading were chosen, cheapest first.
// Selection then picks one (or reports an ambiguity) and only the chosen
// match gets its side effects applied.

use tracing::{debug, trace};

use crate::binding::CompilationContext;
use crate::clause::{Certainty, Clause, Phrase, ReferenceId, words_of};
use crate::error::{ClausalError, Result};
use crate::side_effects::{MatchSideEffect, MatchSideEffects, apply_side_effects, join_adjective};
use crate::vocabulary::{
    FactTypeId, FactTypeKind, ObjectTypeId, ReadingId, RoleRef, TemplateToken, Vocabulary,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Refuse subtype steps, so every player must be exactly the role's player.
    pub exact_types: bool,
}

/// Why a reading did not match. None of these is an error by itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mismatch {
    Word { expected: String, found: Option<String> },
    Player { reference: ReferenceId },
    Adjective { reference: ReferenceId },
    Residual { reference: ReferenceId },
    ExtraWords { at: usize },
    MissingPlayer,
    TooManySubtypeSteps,
    SubtypeDirection,
    Certainty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankedMatch {
    pub reading: ReadingId,
    pub fact_type: FactTypeId,
    pub cost: usize,
    pub side_effects: MatchSideEffects,
}

#[derive(Clone, Debug, Default)]
pub struct Ranking {
    /// Successful walks, cheapest first, ties in candidate order.
    pub matches: Vec<RankedMatch>,
    /// Type inheritance readings that only failed on the direction or count of subtype steps.
    pub direction_conflicts: Vec<ReadingId>,
}

// ------------- Candidates -------------
fn related_or_exact(vocabulary: &Vocabulary, object_type: ObjectTypeId, exact: bool) -> Vec<ObjectTypeId> {
    if exact { vec![object_type] } else { vocabulary.related_types(object_type) }
}

// Finds a distinct role for every player, each player related to its role's player.
fn assignable(related: &[Vec<ObjectTypeId>], role_related: &[Vec<ObjectTypeId>], used: &mut [bool], i: usize) -> bool {
    if i == related.len() {
        return true;
    }
    for j in 0..role_related.len() {
        if !used[j] && related[i].iter().any(|t| role_related[j].contains(t)) {
            used[j] = true;
            if assignable(related, role_related, used, i + 1) {
                return true;
            }
            used[j] = false;
        }
    }
    false
}

/// Fact types of the right arity, reached through the roles the first player (or a
/// type related to it) plays, whose roles can all be filled by the clause's players.
pub fn candidate_fact_types(context: &CompilationContext, refs: &[ReferenceId], options: MatchOptions) -> Vec<FactTypeId> {
    let vocabulary = context.vocabulary();
    let Some(players) = refs
        .iter()
        .map(|&r| context.reference(r).player)
        .collect::<Option<Vec<_>>>()
    else {
        return Vec::new();
    };
    let Some(&first) = players.first() else {
        return Vec::new();
    };
    let first_is_objectified = !context.reference(refs[0]).nested_clauses.is_empty();
    let related: Vec<Vec<ObjectTypeId>> = players
        .iter()
        .map(|&p| related_or_exact(vocabulary, p, options.exact_types))
        .collect();
    let mut candidates: Vec<FactTypeId> = Vec::new();
    let mut rejected: Vec<FactTypeId> = Vec::new();
    for object_type in related_or_exact(vocabulary, first, options.exact_types || first_is_objectified) {
        for &role in vocabulary.roles_played_by(object_type) {
            let fact_type = vocabulary[role].fact_type();
            if candidates.contains(&fact_type) || rejected.contains(&fact_type) {
                continue;
            }
            let ft = &vocabulary[fact_type];
            let eligible = matches!(ft.kind(), FactTypeKind::Plain | FactTypeKind::TypeInheritance { .. })
                && ft.arity() == players.len()
                && {
                    let role_related: Vec<Vec<ObjectTypeId>> = ft
                        .roles()
                        .iter()
                        .map(|&r| related_or_exact(vocabulary, vocabulary[r].object_type(), options.exact_types))
                        .collect();
                    let mut used = vec![false; role_related.len()];
                    assignable(&related, &role_related, &mut used, 0)
                };
            if eligible {
                candidates.push(fact_type);
            } else {
                rejected.push(fact_type);
            }
        }
    }
    candidates
}

// ------------- Word walk -------------
fn is_prefix(prefix: &[String], of: &[String]) -> bool {
    prefix.len() <= of.len() && prefix.iter().zip(of).all(|(a, b)| a == b)
}

fn split_hyphens(words: &[String]) -> Vec<String> {
    words
        .iter()
        .flat_map(|w| w.split('-').filter(|s| !s.is_empty()).map(str::to_string))
        .collect()
}

fn word_at(phrases: &[Phrase], at: usize) -> Option<&str> {
    match phrases.get(at) {
        Some(Phrase::Word(word)) => Some(word.as_str()),
        _ => None,
    }
}

struct RoleWalk<'a> {
    reference: ReferenceId,
    role_ref: &'a RoleRef,
    ordinal: usize,
    /// Phrase positions of the words between the previous token and the reference.
    intervening: std::ops::Range<usize>,
    position: usize,
}

// Matches one placeholder, returning its side effect and the phrase position after
// any trailing words it absorbed.
fn walk_role(
    context: &CompilationContext,
    phrases: &[Phrase],
    walk: RoleWalk,
    options: MatchOptions,
) -> std::result::Result<(MatchSideEffect, usize), Mismatch> {
    let vocabulary = context.vocabulary();
    let reference = context.reference(walk.reference);
    let player = reference.player.ok_or(Mismatch::MissingPlayer)?;
    let role_player = vocabulary[walk.role_ref.role].object_type();
    let common_supertype = if player == role_player {
        None
    } else if options.exact_types || !reference.nested_clauses.is_empty() {
        return Err(Mismatch::Player { reference: walk.reference });
    } else {
        Some(
            vocabulary
                .common_supertype(player, role_player)
                .ok_or(Mismatch::Player { reference: walk.reference })?,
        )
    };

    // leading adjective: words in front of the reference come first, then the explicit adjective
    let reading_leading = words_of(walk.role_ref.leading_adjective.as_deref());
    let explicit_leading = reference.leading_words();
    let intervening: Vec<String> = walk
        .intervening
        .clone()
        .filter_map(|i| word_at(phrases, i).map(str::to_string))
        .collect();
    let (residual_leading, absorbed_precursors) = if intervening.is_empty() {
        if !explicit_leading.ends_with(&reading_leading) {
            return Err(Mismatch::Adjective { reference: walk.reference });
        }
        let residual = &explicit_leading[..explicit_leading.len() - reading_leading.len()];
        (join_adjective(residual, &[]), Vec::new())
    } else {
        let absorbed = if is_prefix(&intervening, &reading_leading) {
            intervening
        } else {
            let split = split_hyphens(&intervening);
            if !is_prefix(&split, &reading_leading) {
                return Err(Mismatch::Adjective { reference: walk.reference });
            }
            split
        };
        if explicit_leading[..] != reading_leading[absorbed.len()..] {
            return Err(Mismatch::Adjective { reference: walk.reference });
        }
        (None, walk.intervening.clone().collect())
    };

    // trailing adjective: the explicit adjective comes first, then words after the reference
    let reading_trailing = words_of(walk.role_ref.trailing_adjective.as_deref());
    let explicit_trailing = reference.trailing_words();
    let mut position = walk.position + 1;
    let mut absorbed_followers = Vec::new();
    let residual_trailing = if explicit_trailing.len() >= reading_trailing.len() {
        if !explicit_trailing.starts_with(&reading_trailing) {
            return Err(Mismatch::Adjective { reference: walk.reference });
        }
        let residual = &explicit_trailing[reading_trailing.len()..];
        join_adjective(residual, &[])
    } else {
        if !reading_trailing.starts_with(&explicit_trailing) {
            return Err(Mismatch::Adjective { reference: walk.reference });
        }
        for wanted in &reading_trailing[explicit_trailing.len()..] {
            if word_at(phrases, position) != Some(wanted.as_str()) {
                return Err(Mismatch::Adjective { reference: walk.reference });
            }
            absorbed_followers.push(position);
            position += 1;
        }
        None
    };

    let effect = MatchSideEffect {
        reference: walk.reference,
        role: walk.role_ref.role,
        role_ref: walk.ordinal,
        absorbed_precursors,
        absorbed_followers,
        common_supertype,
        residual_leading,
        residual_trailing,
    };
    // a residual adjective must distinguish this binding from some other mention
    if effect.has_residual_adjectives() {
        let mentions = reference
            .binding
            .and_then(|b| context.binding(b))
            .map_or(0, |b| b.refs().len());
        if mentions <= 1 {
            return Err(Mismatch::Residual { reference: walk.reference });
        }
    }
    Ok((effect, position))
}

/// Walks one reading's template against the clause.
pub fn word_walk(
    context: &CompilationContext,
    clause: &Clause,
    reading: ReadingId,
    options: MatchOptions,
) -> std::result::Result<MatchSideEffects, Mismatch> {
    let vocabulary = context.vocabulary();
    let reading = &vocabulary[reading];
    let role_refs = vocabulary[reading.role_sequence()].role_refs();
    // a negative reading only serves clauses that are themselves negated
    if reading.is_negative() && clause.certainty != Certainty::Negated {
        return Err(Mismatch::Certainty);
    }
    let phrases = &clause.phrases;
    let mut position = 0;
    let mut effects: Vec<MatchSideEffect> = Vec::new();
    let mut negation = None;
    for token in reading.tokens() {
        match token {
            TemplateToken::Word(expected) => loop {
                match phrases.get(position) {
                    Some(Phrase::Word(word)) if word == expected => {
                        position += 1;
                        break;
                    }
                    Some(Phrase::Word(word)) if word == "not" && negation.is_none() && !reading.is_negative() => {
                        negation = Some(position);
                        position += 1;
                    }
                    found => {
                        return Err(Mismatch::Word {
                            expected: expected.clone(),
                            found: match found {
                                Some(Phrase::Word(word)) => Some(word.clone()),
                                Some(_) => Some("a role player".to_string()),
                                None => None,
                            },
                        });
                    }
                }
            },
            TemplateToken::Role(ordinal) => {
                let role_ref = role_refs.get(*ordinal).ok_or(Mismatch::MissingPlayer)?;
                let start = position;
                while word_at(phrases, position).is_some() {
                    position += 1;
                }
                let Some(Phrase::Reference(reference)) = phrases.get(position) else {
                    return Err(Mismatch::MissingPlayer);
                };
                let walk = RoleWalk {
                    reference: *reference,
                    role_ref,
                    ordinal: *ordinal,
                    intervening: start..position,
                    position,
                };
                let (effect, next) = walk_role(context, phrases, walk, options)?;
                effects.push(effect);
                position = next;
            }
        }
    }
    if position != phrases.len() {
        return Err(Mismatch::ExtraWords { at: position });
    }

    let fact_type = &vocabulary[reading.fact_type()];
    if fact_type.is_type_inheritance() {
        let steps: Vec<&MatchSideEffect> = effects.iter().filter(|e| e.common_supertype.is_some()).collect();
        if steps.len() > 1 {
            return Err(Mismatch::TooManySubtypeSteps);
        }
        for step in steps {
            let role = &vocabulary[step.role];
            let Some(player) = context.reference(step.reference).player else {
                return Err(Mismatch::MissingPlayer);
            };
            // role 0 is played by the subtype, role 1 by the supertype
            let allowed = if role.ordinal() == 0 {
                vocabulary.is_subtype_of(player, role.object_type())
            } else {
                vocabulary.is_subtype_of(role.object_type(), player)
            };
            if !allowed {
                return Err(Mismatch::SubtypeDirection);
            }
        }
    }

    Ok(MatchSideEffects {
        fact_type: reading.fact_type(),
        reading: reading.id(),
        role_sequence: reading.role_sequence(),
        effects,
        negation,
    })
}

// ------------- Ranking and selection -------------
/// Every reading the clause could invoke, cheapest first. Leaves the clause untouched.
pub fn rank_matches(context: &CompilationContext, clause: &Clause, options: MatchOptions) -> Ranking {
    let mut ranking = Ranking::default();
    let refs = clause.refs();
    if refs.is_empty() || clause.comparison().is_some() {
        return ranking;
    }
    let vocabulary = context.vocabulary();
    for fact_type in candidate_fact_types(context, &refs, options) {
        for &reading in vocabulary[fact_type].readings() {
            match word_walk(context, clause, reading, options) {
                Ok(side_effects) => ranking.matches.push(RankedMatch {
                    reading,
                    fact_type,
                    cost: side_effects.cost(),
                    side_effects,
                }),
                Err(Mismatch::SubtypeDirection | Mismatch::TooManySubtypeSteps) => {
                    ranking.direction_conflicts.push(reading);
                }
                Err(mismatch) => {
                    trace!(reading = %vocabulary.expand_reading(reading), ?mismatch, "no match");
                }
            }
        }
    }
    ranking.matches.sort_by_key(|m| m.cost);
    ranking
}

/// Picks the cheapest match. Equal cost across different fact types is ambiguous,
/// unless every tied fact type is a type inheritance, where the first one wins.
pub fn select_match(context: &CompilationContext, clause: &Clause, ranking: Ranking) -> Result<Option<RankedMatch>> {
    let vocabulary = context.vocabulary();
    let Some(cheapest) = ranking.matches.first().map(|m| m.cost) else {
        if let Some(&reading) = ranking.direction_conflicts.first() {
            return Err(ClausalError::SubtypeStepDirectionConflict {
                clause: context.describe_clause(clause),
                fact_type: vocabulary.describe_fact_type(vocabulary[reading].fact_type()),
            });
        }
        return Ok(None);
    };
    let tied: Vec<&RankedMatch> = ranking.matches.iter().take_while(|m| m.cost == cheapest).collect();
    let mut fact_types: Vec<FactTypeId> = tied.iter().map(|m| m.fact_type).collect();
    fact_types.dedup();
    let all_inheritance = fact_types.iter().all(|&ft| vocabulary[ft].is_type_inheritance());
    if fact_types.len() > 1 && !all_inheritance {
        return Err(ClausalError::AmbiguousMatch {
            clause: context.describe_clause(clause),
            candidates: tied
                .iter()
                .map(|m| (vocabulary.expand_reading(m.reading), m.cost))
                .collect(),
        });
    }
    Ok(ranking.matches.into_iter().next())
}

// ------------- Matching a clause -------------
fn is_existential(context: &CompilationContext, clause: &Clause) -> bool {
    match clause.phrases.as_slice() {
        [Phrase::Reference(r)] => context.reference(*r).literal.is_none(),
        _ => false,
    }
}

// Nested clauses must match, and the reference they hang off must objectify what they match.
fn match_nested(
    context: &mut CompilationContext,
    reference: ReferenceId,
    nested: &mut [Clause],
    options: MatchOptions,
) -> Result<()> {
    for clause in nested.iter_mut() {
        if !clause.is_matched() && !match_clause(context, clause, options)? {
            return Err(ClausalError::NoFactTypeMatch(context.describe_clause(clause)));
        }
        let Some(fact_type) = clause.fact_type else {
            continue;
        };
        let vocabulary = context.vocabulary();
        let objectified = context
            .reference(reference)
            .player
            .and_then(|p| vocabulary[p].fact_type());
        if objectified != Some(fact_type) {
            return Err(ClausalError::ObjectificationMismatch {
                term: context.reference(reference).term.clone(),
                fact_type: vocabulary.describe_fact_type(fact_type),
            });
        }
    }
    Ok(())
}

fn player_of(context: &CompilationContext, reference: ReferenceId) -> Result<ObjectTypeId> {
    let reference = context.reference(reference);
    reference
        .player
        .ok_or_else(|| ClausalError::UnrecognisedObjectType(reference.term.clone()))
}

fn match_comparison(context: &mut CompilationContext, clause: &mut Clause) -> Result<()> {
    let Some((operator, lhs, rhs)) = clause.comparison().map(|(o, l, r)| (o.to_string(), l, r)) else {
        return Ok(());
    };
    let (left, right) = (player_of(context, lhs)?, player_of(context, rhs)?);
    let vocabulary = context.vocabulary_mut();
    let fact_type = vocabulary.comparison_fact_type(&operator, left, right);
    let reading = vocabulary[fact_type].readings()[0];
    let role_sequence = vocabulary[reading].role_sequence();
    let roles = vocabulary[role_sequence].roles();
    for (ordinal, (r, role)) in [lhs, rhs].into_iter().zip(roles).enumerate() {
        let reference = context.reference_mut(r);
        reference.role = Some(role);
        reference.role_ref = Some((role_sequence, ordinal));
    }
    clause.fact_type = Some(fact_type);
    clause.reading = Some(reading);
    clause.role_sequence = Some(role_sequence);
    Ok(())
}

/// Matches the clause against existing readings, applying the chosen match's side
/// effects. Returns false when nothing matched; the clause is then left as it was.
pub fn match_clause(context: &mut CompilationContext, clause: &mut Clause, options: MatchOptions) -> Result<bool> {
    for r in clause.refs() {
        let mut nested = std::mem::take(&mut context.reference_mut(r).nested_clauses);
        let matched = match_nested(context, r, &mut nested, options);
        context.reference_mut(r).nested_clauses = nested;
        matched?;
    }
    if clause.comparison().is_some() {
        match_comparison(context, clause)?;
        return Ok(true);
    }
    if is_existential(context, clause) {
        trace!(clause = %context.describe_clause(clause), "existential clause");
        return Ok(true);
    }
    let ranking = rank_matches(context, clause, options);
    let Some(selected) = select_match(context, clause, ranking)? else {
        debug!(clause = %context.describe_clause(clause), "no existing reading");
        return Ok(false);
    };
    debug!(
        clause = %context.describe_clause(clause),
        reading = %context.vocabulary().expand_reading(selected.reading),
        cost = selected.cost,
        effects = %selected.side_effects.describe(context),
        "matched"
    );
    apply_side_effects(context, clause, selected.side_effects)?;
    Ok(true)
}
