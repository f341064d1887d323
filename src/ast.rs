//! Syntax trees produced by the notation parser. The compiler adopts these into a
//! [`CompilationContext`](crate::binding::CompilationContext) before any binding or
//! matching happens, so nothing here knows about the vocabulary.

use crate::clause::{Certainty, Conjunction, Literal, Quantifier, RoleName};

#[derive(Clone, Debug, PartialEq)]
pub enum Declaration {
    EntityType(String),
    ValueType(String),
    Subtype { subtype: String, supertypes: Vec<String> },
    /// One or more readings of one fact type, possibly derived (`... where ...`).
    FactType(Vec<Clause>),
    Objectification { term: String, clauses: Vec<Clause> },
    Query(Vec<Clause>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Clause {
    pub phrases: Vec<Phrase>,
    pub qualifiers: Vec<String>,
    pub certainty: Certainty,
    pub conjunction: Option<Conjunction>,
}
impl Clause {
    pub fn new(phrases: Vec<Phrase>) -> Self {
        Self {
            phrases,
            qualifiers: Vec::new(),
            certainty: Certainty::Definite,
            conjunction: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Phrase {
    Word(String),
    Mention(Mention),
    Comparison { operator: String, lhs: Operand, rhs: Operand },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Mention(Mention),
    Literal(Literal),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mention {
    pub term: String,
    pub leading_adjective: Option<String>,
    pub trailing_adjective: Option<String>,
    pub role_name: Option<RoleName>,
    pub quantifier: Option<Quantifier>,
    pub literal: Option<Literal>,
    pub nested: Vec<Clause>,
}
impl Mention {
    pub fn new(term: &str) -> Self {
        Self {
            term: term.to_string(),
            leading_adjective: None,
            trailing_adjective: None,
            role_name: None,
            quantifier: None,
            literal: None,
            nested: Vec::new(),
        }
    }
}
