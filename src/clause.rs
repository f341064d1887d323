use std::fmt;

use serde::Serialize;

use crate::binding::BindingId;
use crate::contraction::Contraction;
use crate::side_effects::MatchSideEffects;
use crate::vocabulary::{
    Enforcement, FactTypeId, ObjectTypeId, PresenceConstraintId, ReadingId, RoleId, RoleSequenceId,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ReferenceId(pub usize);

// ------------- Role names and literals -------------
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum RoleName {
    Named(String),
    Subscript(u32),
}
impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RoleName::Named(name) => write!(f, "(as {name})"),
            RoleName::Subscript(n) => write!(f, "({n})"),
        }
    }
}

/// Numbers keep their written form so literals can take part in binding keys.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Literal {
    Number(String),
    Text(String),
}
impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{n}"),
            Literal::Text(t) => write!(f, "'{t}'"),
        }
    }
}

// ------------- Quantifier -------------
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Quantifier {
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub enforcement: Option<Enforcement>,
}
impl Quantifier {
    pub fn new(min: Option<u32>, max: Option<u32>) -> Self {
        Self {
            min,
            max,
            enforcement: None,
        }
    }
    /// `each` and `some` say nothing about frequency.
    pub fn is_unconstrained(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

// ------------- Reference -------------
/// One mention of a role player in a clause. Everything after `nested_clauses`
/// is filled in while the declaration compiles.
#[derive(Clone, Debug, Serialize)]
pub struct Reference {
    pub term: String,
    pub leading_adjective: Option<String>,
    pub trailing_adjective: Option<String>,
    pub role_name: Option<RoleName>,
    pub quantifier: Option<Quantifier>,
    pub literal: Option<Literal>,
    pub nested_clauses: Vec<Clause>,
    pub player: Option<ObjectTypeId>,
    /// The term is a role name declared elsewhere in the declaration.
    pub player_by_role_name: bool,
    pub binding: Option<BindingId>,
    pub role: Option<RoleId>,
    pub role_ref: Option<(RoleSequenceId, usize)>,
    pub residual_leading: Option<String>,
    pub residual_trailing: Option<String>,
    pub embedded_presence_constraint: Option<PresenceConstraintId>,
}
impl Reference {
    pub fn new(term: &str) -> Self {
        Self {
            term: term.to_string(),
            leading_adjective: None,
            trailing_adjective: None,
            role_name: None,
            quantifier: None,
            literal: None,
            nested_clauses: Vec::new(),
            player: None,
            player_by_role_name: false,
            binding: None,
            role: None,
            role_ref: None,
            residual_leading: None,
            residual_trailing: None,
            embedded_presence_constraint: None,
        }
    }
    pub fn has_adjectives(&self) -> bool {
        self.leading_adjective.is_some() || self.trailing_adjective.is_some()
    }
    pub fn declares_role_name(&self) -> bool {
        matches!(self.role_name, Some(RoleName::Named(_)))
    }
    pub fn leading_words(&self) -> Vec<String> {
        words_of(self.leading_adjective.as_deref())
    }
    pub fn trailing_words(&self) -> Vec<String> {
        words_of(self.trailing_adjective.as_deref())
    }
}

pub fn words_of(adjective: Option<&str>) -> Vec<String> {
    adjective
        .map(|a| a.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn adjective_of(words: &[String]) -> Option<String> {
    if words.is_empty() { None } else { Some(words.join(" ")) }
}

// ------------- Clause -------------
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Phrase {
    Word(String),
    Reference(ReferenceId),
    Comparison {
        operator: String,
        lhs: ReferenceId,
        rhs: ReferenceId,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Certainty {
    Definite,
    Negated,
    Maybe,
}

/// How a clause is joined to the one before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Conjunction {
    And,
    Or,
    Comma,
    Where,
    That,
}

#[derive(Clone, Debug, Serialize)]
pub struct Clause {
    pub phrases: Vec<Phrase>,
    pub qualifiers: Vec<String>,
    pub certainty: Certainty,
    pub conjunction: Option<Conjunction>,
    pub fact_type: Option<FactTypeId>,
    pub reading: Option<ReadingId>,
    pub role_sequence: Option<RoleSequenceId>,
    pub side_effects: Option<MatchSideEffects>,
    pub contracted: Option<Contraction>,
}
impl Clause {
    pub fn new(phrases: Vec<Phrase>) -> Self {
        Self {
            phrases,
            qualifiers: Vec::new(),
            certainty: Certainty::Definite,
            conjunction: None,
            fact_type: None,
            reading: None,
            role_sequence: None,
            side_effects: None,
            contracted: None,
        }
    }
    /// References in phrase order, comparison operands included.
    pub fn refs(&self) -> Vec<ReferenceId> {
        let mut refs = Vec::new();
        for phrase in &self.phrases {
            match phrase {
                Phrase::Word(_) => (),
                Phrase::Reference(r) => refs.push(*r),
                Phrase::Comparison { lhs, rhs, .. } => {
                    refs.push(*lhs);
                    refs.push(*rhs);
                }
            }
        }
        refs
    }
    pub fn comparison(&self) -> Option<(&str, ReferenceId, ReferenceId)> {
        match self.phrases.as_slice() {
            [Phrase::Comparison { operator, lhs, rhs }] => Some((operator.as_str(), *lhs, *rhs)),
            _ => None,
        }
    }
    pub fn is_matched(&self) -> bool {
        self.fact_type.is_some()
    }
}
