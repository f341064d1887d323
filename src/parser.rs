use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::ast::{Clause, Declaration, Mention, Operand, Phrase};
use crate::clause::{Certainty, Conjunction, Literal, Quantifier, RoleName};
use crate::error::{ClausalError, Result};
use crate::vocabulary::Enforcement;

#[derive(Parser)]
#[grammar = "clausal.pest"]
pub struct ClausalParser;

fn malformed(pair: &Pair<Rule>, expected: &str) -> ClausalError {
    let (line, col) = pair.as_span().start_pos().line_col();
    ClausalError::Parse {
        message: format!("expected {expected} in '{}'", pair.as_str()),
        line: Some(line),
        col: Some(col),
    }
}

fn term_of(pair: Pair<Rule>) -> Result<String> {
    let context = pair.clone();
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::term)
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| malformed(&context, "a term"))
}

/// Parses a script into declarations, in source order.
pub fn parse(source: &str) -> Result<Vec<Declaration>> {
    let mut declarations = Vec::new();
    let Some(file) = ClausalParser::parse(Rule::file, source)?.next() else {
        return Ok(declarations);
    };
    for pair in file.into_inner() {
        let declaration = match pair.as_rule() {
            Rule::entity_type => Declaration::EntityType(term_of(pair)?),
            Rule::value_type => Declaration::ValueType(term_of(pair)?),
            Rule::subtype => {
                let mut terms = pair.into_inner().map(|p| p.as_str().to_string());
                let subtype = terms.next().unwrap_or_default();
                Declaration::Subtype {
                    subtype,
                    supertypes: terms.collect(),
                }
            }
            Rule::objectification => {
                let context = pair.clone();
                let mut inner = pair.into_inner();
                let (Some(term), Some(clauses)) = (inner.next(), inner.next()) else {
                    return Err(malformed(&context, "a term and clauses"));
                };
                Declaration::Objectification {
                    term: term.as_str().to_string(),
                    clauses: clause_list(clauses)?,
                }
            }
            Rule::query => Declaration::Query(first_clause_list(pair)?),
            Rule::fact_type => Declaration::FactType(first_clause_list(pair)?),
            _ => continue,
        };
        declarations.push(declaration);
    }
    Ok(declarations)
}

fn first_clause_list(pair: Pair<Rule>) -> Result<Vec<Clause>> {
    let context = pair.clone();
    match pair.into_inner().next() {
        Some(list) => clause_list(list),
        None => Err(malformed(&context, "clauses")),
    }
}

fn clause_list(pair: Pair<Rule>) -> Result<Vec<Clause>> {
    let mut clauses = Vec::new();
    let mut pending = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::clause => {
                let mut parsed = clause(p)?;
                parsed.conjunction = pending.take();
                clauses.push(parsed);
            }
            Rule::conj_and => pending = Some(Conjunction::And),
            Rule::conj_or => pending = Some(Conjunction::Or),
            Rule::conj_where => pending = Some(Conjunction::Where),
            Rule::conj_that => pending = Some(Conjunction::That),
            Rule::conj_comma => pending = Some(Conjunction::Comma),
            _ => (),
        }
    }
    Ok(clauses)
}

fn clause(pair: Pair<Rule>) -> Result<Clause> {
    let mut parsed = Clause::new(Vec::new());
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::maybe => parsed.certainty = Certainty::Maybe,
            Rule::negation => parsed.certainty = Certainty::Negated,
            Rule::comparison => parsed.phrases.push(comparison(p)?),
            Rule::phrases => {
                for phrase in p.into_inner() {
                    match phrase.as_rule() {
                        Rule::reference => parsed.phrases.push(Phrase::Mention(mention(phrase)?)),
                        _ => parsed.phrases.push(Phrase::Word(phrase.as_str().to_string())),
                    }
                }
            }
            Rule::qualifiers => parsed
                .qualifiers
                .extend(p.into_inner().map(|q| q.as_str().to_lowercase())),
            _ => (),
        }
    }
    Ok(parsed)
}

fn literal(pair: Pair<Rule>) -> Option<Literal> {
    match pair.as_rule() {
        Rule::string => Some(Literal::Text(
            pair.into_inner().next().map(|p| p.as_str().to_string()).unwrap_or_default(),
        )),
        Rule::number => Some(Literal::Number(pair.as_str().to_string())),
        _ => None,
    }
}

fn comparison(pair: Pair<Rule>) -> Result<Phrase> {
    let context = pair.clone();
    let mut inner = pair.into_inner();
    let (Some(lhs), Some(operator), Some(rhs)) = (inner.next(), inner.next(), inner.next()) else {
        return Err(malformed(&context, "two operands and a comparator"));
    };
    let operand = |p: Pair<Rule>| -> Result<Operand> {
        if p.as_rule() == Rule::reference {
            return Ok(Operand::Mention(mention(p)?));
        }
        let context = p.clone();
        literal(p).map(Operand::Literal).ok_or_else(|| malformed(&context, "an operand"))
    };
    Ok(Phrase::Comparison {
        operator: operator.as_str().to_string(),
        lhs: operand(lhs)?,
        rhs: operand(rhs)?,
    })
}

// the hyphen marks where an adjective meets its term; it is not part of the adjective
fn adjective(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .map(|p| p.as_str().trim_matches('-').to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn mention(pair: Pair<Rule>) -> Result<Mention> {
    let mut parsed = Mention::new("");
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::quantifier => parsed.quantifier = Some(quantifier(p)?),
            Rule::leading_adjective => parsed.leading_adjective = Some(adjective(p)),
            Rule::trailing_adjective => parsed.trailing_adjective = Some(adjective(p)),
            Rule::term => parsed.term = p.as_str().to_string(),
            Rule::role_spec => parsed.role_name = Some(role_name(p)?),
            Rule::string | Rule::number => parsed.literal = literal(p),
            Rule::nested => {
                for list in p.into_inner() {
                    parsed.nested.extend(clause_list(list)?);
                }
            }
            _ => (),
        }
    }
    Ok(parsed)
}

fn role_name(pair: Pair<Rule>) -> Result<RoleName> {
    let context = pair.clone();
    let Some(inner) = pair.into_inner().next() else {
        return Err(malformed(&context, "a role name or subscript"));
    };
    match inner.as_rule() {
        Rule::subscript => inner
            .as_str()
            .parse::<u32>()
            .map(RoleName::Subscript)
            .map_err(|_| malformed(&inner, "a subscript")),
        _ => Ok(RoleName::Named(term_of(inner)?)),
    }
}

fn count(pair: Option<Pair<Rule>>, context: &Pair<Rule>) -> Result<u32> {
    let Some(pair) = pair else {
        return Err(malformed(context, "a count"));
    };
    match pair.as_str() {
        "one" => Ok(1),
        digits => digits.parse::<u32>().map_err(|_| malformed(&pair, "a count")),
    }
}

fn quantifier(pair: Pair<Rule>) -> Result<Quantifier> {
    let mut parsed = Quantifier::new(None, None);
    for p in pair.into_inner() {
        let context = p.clone();
        match p.as_rule() {
            Rule::q_exactly => {
                let n = count(p.into_inner().next(), &context)?;
                parsed.min = Some(n);
                parsed.max = Some(n);
            }
            Rule::q_at_most => parsed.max = Some(count(p.into_inner().next(), &context)?),
            Rule::q_at_least => parsed.min = Some(count(p.into_inner().next(), &context)?),
            Rule::q_range => {
                let mut counts = p.into_inner();
                parsed.min = Some(count(counts.next(), &context)?);
                parsed.max = Some(count(counts.next(), &context)?);
            }
            Rule::q_one => {
                parsed.min = Some(1);
                parsed.max = Some(1);
            }
            Rule::q_no => parsed.max = Some(0),
            Rule::enforcement => {
                let mut inner = p.into_inner();
                let action = inner.next().map(|a| a.as_str().to_string()).unwrap_or_default();
                let agent = inner.next().map(|a| a.as_str().to_string());
                parsed.enforcement = Some(Enforcement { action, agent });
            }
            _ => (),
        }
    }
    Ok(parsed)
}
