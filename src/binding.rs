// A CompilationContext lives for exactly one declaration. It owns the references
// of every clause in that declaration and the bindings that tie them together,
// and it is the only thing allowed to extend the vocabulary while the declaration
// compiles.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, trace};

use crate::ast;
use crate::clause::{Clause, Literal, Phrase, Reference, ReferenceId, RoleName};
use crate::error::{ClausalError, Result};
use crate::vocabulary::{ObjectTypeId, OtherHasher, Vocabulary, adjectival};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BindingId(pub usize);

// ------------- Binding -------------
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BindingKey {
    Role {
        term: String,
        role_name: RoleName,
        literal: Option<Literal>,
    },
    Adjectival {
        leading: Option<String>,
        term: String,
        trailing: Option<String>,
        literal: Option<Literal>,
    },
}

#[derive(Clone, Debug)]
pub struct Binding {
    id: BindingId,
    key: BindingKey,
    player: ObjectTypeId,
    role_name: Option<RoleName>,
    literal: Option<Literal>,
    refs: Vec<ReferenceId>,
    rebound_to: Option<BindingId>,
}
impl Binding {
    pub fn id(&self) -> BindingId {
        self.id
    }
    pub fn key(&self) -> &BindingKey {
        &self.key
    }
    pub fn player(&self) -> ObjectTypeId {
        self.player
    }
    pub fn role_name(&self) -> Option<&RoleName> {
        self.role_name.as_ref()
    }
    pub fn literal(&self) -> Option<&Literal> {
        self.literal.as_ref()
    }
    pub fn refs(&self) -> &[ReferenceId] {
        &self.refs
    }
    /// Set when loose binding merged this binding into another.
    pub fn rebound_to(&self) -> Option<BindingId> {
        self.rebound_to
    }
}

// ------------- Compilation Context -------------
pub struct CompilationContext<'v> {
    vocabulary: &'v mut Vocabulary,
    references: Vec<Reference>,
    bindings: Vec<Option<Binding>>,
    binding_by_key: HashMap<BindingKey, BindingId, OtherHasher>,
    player_by_role_name: HashMap<String, ObjectTypeId, OtherHasher>,
    allowed_forward_terms: Vec<String>,
}

impl<'v> CompilationContext<'v> {
    pub fn new(vocabulary: &'v mut Vocabulary) -> Self {
        Self {
            vocabulary,
            references: Vec::new(),
            bindings: Vec::new(),
            binding_by_key: HashMap::default(),
            player_by_role_name: HashMap::default(),
            allowed_forward_terms: Vec::new(),
        }
    }
    pub fn with_forward_terms(mut self, terms: &[String]) -> Self {
        self.allowed_forward_terms = terms.to_vec();
        self
    }
    pub fn vocabulary(&self) -> &Vocabulary {
        &*self.vocabulary
    }
    pub fn vocabulary_mut(&mut self) -> &mut Vocabulary {
        &mut *self.vocabulary
    }

    // functions managing the reference arena
    pub fn add_reference(&mut self, reference: Reference) -> ReferenceId {
        let id = ReferenceId(self.references.len());
        self.references.push(reference);
        id
    }
    pub fn reference(&self, id: ReferenceId) -> &Reference {
        &self.references[id.0]
    }
    pub fn reference_mut(&mut self, id: ReferenceId) -> &mut Reference {
        &mut self.references[id.0]
    }
    /// Moves a parsed clause into the arena, returning the clause the core works on.
    pub fn adopt(&mut self, clause: ast::Clause) -> Clause {
        let mut phrases = Vec::with_capacity(clause.phrases.len());
        for phrase in clause.phrases {
            match phrase {
                ast::Phrase::Word(word) => phrases.push(Phrase::Word(word)),
                ast::Phrase::Mention(mention) => {
                    let id = self.adopt_mention(mention);
                    phrases.push(Phrase::Reference(id));
                }
                ast::Phrase::Comparison { operator, lhs, rhs } => {
                    let (lhs, rhs) = self.adopt_operands(lhs, rhs);
                    phrases.push(Phrase::Comparison { operator, lhs, rhs });
                }
            }
        }
        let mut adopted = Clause::new(phrases);
        adopted.qualifiers = clause.qualifiers;
        adopted.certainty = clause.certainty;
        adopted.conjunction = clause.conjunction;
        adopted
    }
    fn adopt_mention(&mut self, mention: ast::Mention) -> ReferenceId {
        let nested_clauses = mention.nested.into_iter().map(|c| self.adopt(c)).collect();
        let mut reference = Reference::new(&mention.term);
        reference.leading_adjective = mention.leading_adjective;
        reference.trailing_adjective = mention.trailing_adjective;
        reference.role_name = mention.role_name;
        reference.quantifier = mention.quantifier;
        reference.literal = mention.literal;
        reference.nested_clauses = nested_clauses;
        self.add_reference(reference)
    }
    // A bare literal operand stands for a value of the other operand's player.
    fn adopt_operands(&mut self, lhs: ast::Operand, rhs: ast::Operand) -> (ReferenceId, ReferenceId) {
        match (lhs, rhs) {
            (ast::Operand::Mention(l), ast::Operand::Literal(value)) => {
                let mut literal = ast::Mention::new(&l.term);
                literal.literal = Some(value);
                (self.adopt_mention(l), self.adopt_mention(literal))
            }
            (ast::Operand::Literal(value), ast::Operand::Mention(r)) => {
                let mut literal = ast::Mention::new(&r.term);
                literal.literal = Some(value);
                (self.adopt_mention(literal), self.adopt_mention(r))
            }
            (ast::Operand::Mention(l), ast::Operand::Mention(r)) => (self.adopt_mention(l), self.adopt_mention(r)),
            (ast::Operand::Literal(l), ast::Operand::Literal(r)) => {
                // nothing to type the literals by, they stay unresolvable terms
                let mut left = ast::Mention::new(&l.to_string());
                left.literal = Some(l);
                let mut right = ast::Mention::new(&r.to_string());
                right.literal = Some(r);
                (self.adopt_mention(left), self.adopt_mention(right))
            }
        }
    }
    /// All references of the clauses, nested clauses included, in phrase order.
    pub fn all_refs(&self, clauses: &[Clause]) -> Vec<ReferenceId> {
        let mut refs = Vec::new();
        for clause in clauses {
            self.collect_refs(clause, &mut refs);
        }
        refs
    }
    fn collect_refs(&self, clause: &Clause, refs: &mut Vec<ReferenceId>) {
        for r in clause.refs() {
            refs.push(r);
            for nested in &self.references[r.0].nested_clauses {
                self.collect_refs(nested, refs);
            }
        }
    }

    // functions resolving players
    /// Finds the player for a term: the vocabulary first, then role names declared
    /// in this declaration, then an allowed forward reference.
    pub fn resolve_player(&mut self, name: &str) -> Result<(ObjectTypeId, bool)> {
        if let Some(object_type) = self.vocabulary.object_type(name) {
            return Ok((object_type, false));
        }
        if let Some(&object_type) = self.player_by_role_name.get(name) {
            return Ok((object_type, true));
        }
        if self.allowed_forward_terms.iter().any(|t| t == name) {
            let stub = self.vocabulary.add_forward_entity_type(name)?;
            debug!(term = name, "forward reference");
            return Ok((stub, false));
        }
        Err(ClausalError::UnrecognisedObjectType(name.to_string()))
    }
    /// Resolves every reference's player. References that declare a role name go
    /// first, so that other references may use those names as terms.
    pub fn identify_players(&mut self, clauses: &[Clause]) -> Result<()> {
        let refs = self.all_refs(clauses);
        let (declaring, rest): (Vec<_>, Vec<_>) = refs
            .into_iter()
            .partition(|&r| self.references[r.0].declares_role_name());
        for r in declaring {
            let reference = &self.references[r.0];
            let Some(RoleName::Named(role_name)) = reference.role_name.clone() else {
                continue;
            };
            let term = reference.term.clone();
            if reference.has_adjectives() {
                return Err(ClausalError::AdjectiveWithRoleName { term, role_name });
            }
            let (player, _) = self.resolve_player(&term)?;
            self.player_by_role_name.insert(role_name, player);
            self.references[r.0].player = Some(player);
        }
        for r in rest {
            let term = self.references[r.0].term.clone();
            let (player, by_role_name) = self.resolve_player(&term)?;
            let reference = &mut self.references[r.0];
            reference.player = Some(player);
            reference.player_by_role_name = by_role_name;
        }
        Ok(())
    }

    // functions managing bindings
    pub fn binding_key(&self, reference: ReferenceId) -> BindingKey {
        let r = &self.references[reference.0];
        let literal = r.literal.clone();
        match (&r.role_name, r.player_by_role_name, r.player) {
            (_, true, Some(player)) => BindingKey::Role {
                term: self.vocabulary[player].name().to_string(),
                role_name: RoleName::Named(r.term.clone()),
                literal,
            },
            (Some(role_name), _, _) => BindingKey::Role {
                term: r.term.clone(),
                role_name: role_name.clone(),
                literal,
            },
            _ => BindingKey::Adjectival {
                leading: r.leading_adjective.clone(),
                term: r.term.clone(),
                trailing: r.trailing_adjective.clone(),
                literal,
            },
        }
    }
    pub fn bind(&mut self, reference: ReferenceId) -> Result<BindingId> {
        let key = self.binding_key(reference);
        let r = &self.references[reference.0];
        let player = r.player.ok_or_else(|| ClausalError::UnrecognisedObjectType(r.term.clone()))?;
        let id = match self.binding_by_key.get(&key) {
            Some(&existing) => existing,
            None => {
                let id = BindingId(self.bindings.len());
                let role_name = match &key {
                    BindingKey::Role { role_name, .. } => Some(role_name.clone()),
                    BindingKey::Adjectival { .. } => None,
                };
                self.bindings.push(Some(Binding {
                    id,
                    key: key.clone(),
                    player,
                    role_name,
                    literal: r.literal.clone(),
                    refs: Vec::new(),
                    rebound_to: None,
                }));
                self.binding_by_key.insert(key, id);
                id
            }
        };
        if let Some(binding) = self.bindings[id.0].as_mut() {
            if !binding.refs.contains(&reference) {
                binding.refs.push(reference);
            }
        }
        self.references[reference.0].binding = Some(id);
        trace!(reference = %self.describe_reference(reference), binding = id.0, "bound");
        Ok(id)
    }
    /// Removes the reference from its binding, dropping the binding once no reference is left.
    pub fn unbind(&mut self, reference: ReferenceId) {
        let Some(id) = self.references[reference.0].binding.take() else {
            return;
        };
        let emptied = match self.bindings[id.0].as_mut() {
            Some(binding) => {
                binding.refs.retain(|&r| r != reference);
                binding.refs.is_empty()
            }
            None => false,
        };
        if emptied {
            if let Some(binding) = self.bindings[id.0].take() {
                self.binding_by_key.remove(&binding.key);
            }
        }
    }
    pub fn rebind(&mut self, reference: ReferenceId) -> Result<BindingId> {
        self.unbind(reference);
        self.bind(reference)
    }
    /// Binds every reference of the clauses, refusing a role name used twice in one clause.
    pub fn bind_clauses(&mut self, clauses: &[Clause]) -> Result<()> {
        for clause in clauses {
            self.bind_clause(clause)?;
        }
        Ok(())
    }
    fn bind_clause(&mut self, clause: &Clause) -> Result<()> {
        let mut seen: Vec<&RoleName> = Vec::new();
        for r in clause.refs() {
            if let Some(role_name) = &self.references[r.0].role_name {
                if seen.contains(&role_name) {
                    return Err(match role_name {
                        RoleName::Named(name) => ClausalError::DuplicateRoleName {
                            name: name.clone(),
                            subscript: false,
                        },
                        RoleName::Subscript(n) => ClausalError::DuplicateRoleName {
                            name: n.to_string(),
                            subscript: true,
                        },
                    });
                }
                seen.push(role_name);
            }
        }
        for r in clause.refs() {
            self.bind(r)?;
            let nested = std::mem::take(&mut self.references[r.0].nested_clauses);
            let bound = nested.iter().try_for_each(|c| self.bind_clause(c));
            self.references[r.0].nested_clauses = nested;
            bound?;
        }
        Ok(())
    }
    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.0).and_then(Option::as_ref)
    }
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter().flatten()
    }
    /// Follows loose-binding merges to the binding that stands for the reference.
    pub fn effective_binding(&self, reference: ReferenceId) -> Option<BindingId> {
        let mut id = self.references[reference.0].binding?;
        while let Some(next) = self.binding(id).and_then(|b| b.rebound_to) {
            id = next;
        }
        Some(id)
    }
    /// Merges each binding referenced only once, and without a role name, into the
    /// single other binding of the same player that has no role name either.
    pub fn loose_binding(&mut self) {
        let loose: Vec<BindingId> = self
            .bindings()
            .filter(|b| b.refs.len() == 1 && b.role_name.is_none() && b.literal.is_none())
            .map(|b| b.id)
            .collect();
        for id in loose {
            let Some(player) = self.binding(id).map(|b| b.player) else {
                continue;
            };
            let others: Vec<BindingId> = self
                .bindings()
                .filter(|b| {
                    b.id != id
                        && b.player == player
                        && b.role_name.is_none()
                        && b.literal.is_none()
                        && b.rebound_to != Some(id)
                })
                .map(|b| b.id)
                .collect();
            if let [other] = others.as_slice() {
                if let Some(binding) = self.bindings[id.0].as_mut() {
                    binding.rebound_to = Some(*other);
                }
                debug!(binding = id.0, rebound_to = other.0, "loose binding");
            }
        }
    }

    // functions rendering clauses for diagnostics
    pub fn describe_reference(&self, reference: ReferenceId) -> String {
        let r = &self.references[reference.0];
        let mut text = adjectival(r.leading_adjective.as_deref(), &r.term, r.trailing_adjective.as_deref());
        if let Some(role_name) = &r.role_name {
            text.push_str(&format!(" {role_name}"));
        }
        if let Some(literal) = &r.literal {
            text.push_str(&format!(" {literal}"));
        }
        text
    }
    pub fn describe_clause(&self, clause: &Clause) -> String {
        clause
            .phrases
            .iter()
            .map(|phrase| match phrase {
                Phrase::Word(word) => word.clone(),
                Phrase::Reference(r) => self.describe_reference(*r),
                Phrase::Comparison { operator, lhs, rhs } => format!(
                    "{} {operator} {}",
                    self.describe_reference(*lhs),
                    self.describe_reference(*rhs)
                ),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
