// The vocabulary owns every metamodel construct the compiler produces or consults:
// object types, fact types with their roles and readings, role sequences and the
// constraints and queries built over them.
//
// Constructs are kept in append-only vectors and referred to by small copyable ids,
// so a reading never holds a pointer into another construct. New constructs are only
// ever pushed, which is what lets successive declarations extend the vocabulary
// without disturbing what earlier declarations already bound to.

use core::hash::BuildHasherDefault;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::Hash;
use std::ops::Index;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use seahash::SeaHasher;
use serde::Serialize;
use tracing::debug;

use crate::error::{ClausalError, Result};
use crate::query::Query;

pub type OtherHasher = BuildHasherDefault<SeaHasher>;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"^\{(\d+)\}$").unwrap();
}

macro_rules! construct_id {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
            pub struct $name(pub usize);
            impl $name {
                pub fn index(self) -> usize {
                    self.0
                }
            }
            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    write!(f, "#{}", self.0)
                }
            }
        )*
    };
}

construct_id!(
    ObjectTypeId,
    FactTypeId,
    RoleId,
    RoleSequenceId,
    ReadingId,
    PresenceConstraintId,
    RingConstraintId,
    QueryId,
);

// ------------- Lookups -------------
// Ordered one-to-many index. Values keep their insertion order so that anything
// iterating a lookup sees the same sequence on every run.
#[derive(Clone, Debug)]
pub struct Lookup<K, V> {
    index: HashMap<K, Vec<V>, OtherHasher>,
}
impl<K: Eq + Hash, V: PartialEq + Copy> Lookup<K, V> {
    pub fn new() -> Self {
        Self {
            index: HashMap::default(),
        }
    }
    pub fn insert(&mut self, key: K, value: V) {
        let values = self.index.entry(key).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
    }
    pub fn lookup(&self, key: &K) -> &[V] {
        self.index.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}
impl<K: Eq + Hash, V: PartialEq + Copy> Default for Lookup<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// ------------- Object Type -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ObjectTypeKind {
    Entity,
    Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct ObjectType {
    id: ObjectTypeId,
    name: String,
    kind: ObjectTypeKind,
    supertypes: Vec<ObjectTypeId>,
    fact_type: Option<FactTypeId>,
    forward: bool,
}
impl ObjectType {
    pub fn id(&self) -> ObjectTypeId {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> ObjectTypeKind {
        self.kind
    }
    /// Direct supertypes, in the order they were declared.
    pub fn supertypes(&self) -> &[ObjectTypeId] {
        &self.supertypes
    }
    /// The fact type this entity type objectifies, if any.
    pub fn fact_type(&self) -> Option<FactTypeId> {
        self.fact_type
    }
    /// True for an entity type stub made for a forward reference.
    pub fn is_forward(&self) -> bool {
        self.forward
    }
}

// ------------- Fact Type -------------
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum FactTypeKind {
    Plain,
    TypeInheritance { subtype: ObjectTypeId, supertype: ObjectTypeId },
    Link { objectification: ObjectTypeId, mirrored: RoleId },
    Comparison { operator: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct FactType {
    id: FactTypeId,
    kind: FactTypeKind,
    roles: Vec<RoleId>,
    readings: Vec<ReadingId>,
    entity_type: Option<ObjectTypeId>,
    derivation: Option<QueryId>,
}
impl FactType {
    pub fn id(&self) -> FactTypeId {
        self.id
    }
    pub fn kind(&self) -> &FactTypeKind {
        &self.kind
    }
    pub fn roles(&self) -> &[RoleId] {
        &self.roles
    }
    pub fn readings(&self) -> &[ReadingId] {
        &self.readings
    }
    /// The entity type objectifying this fact type, if any.
    pub fn entity_type(&self) -> Option<ObjectTypeId> {
        self.entity_type
    }
    pub fn derivation(&self) -> Option<QueryId> {
        self.derivation
    }
    pub fn arity(&self) -> usize {
        self.roles.len()
    }
    pub fn is_type_inheritance(&self) -> bool {
        matches!(self.kind, FactTypeKind::TypeInheritance { .. })
    }
}

// ------------- Role -------------
#[derive(Clone, Debug, Serialize)]
pub struct Role {
    id: RoleId,
    fact_type: FactTypeId,
    ordinal: usize,
    object_type: ObjectTypeId,
    role_name: Option<String>,
}
impl Role {
    pub fn id(&self) -> RoleId {
        self.id
    }
    pub fn fact_type(&self) -> FactTypeId {
        self.fact_type
    }
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
    pub fn object_type(&self) -> ObjectTypeId {
        self.object_type
    }
    pub fn role_name(&self) -> Option<&str> {
        self.role_name.as_deref()
    }
}

// ------------- Role Sequence -------------
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoleRef {
    pub role: RoleId,
    pub leading_adjective: Option<String>,
    pub trailing_adjective: Option<String>,
}
impl RoleRef {
    pub fn new(role: RoleId) -> Self {
        Self {
            role,
            leading_adjective: None,
            trailing_adjective: None,
        }
    }
    pub fn with_adjectives(role: RoleId, leading: Option<String>, trailing: Option<String>) -> Self {
        Self {
            role,
            leading_adjective: leading,
            trailing_adjective: trailing,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RoleSequence {
    id: RoleSequenceId,
    role_refs: Vec<RoleRef>,
}
impl RoleSequence {
    pub fn id(&self) -> RoleSequenceId {
        self.id
    }
    pub fn role_refs(&self) -> &[RoleRef] {
        &self.role_refs
    }
    pub fn roles(&self) -> Vec<RoleId> {
        self.role_refs.iter().map(|rr| rr.role).collect()
    }
}

// ------------- Reading -------------
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateToken {
    Word(String),
    Role(usize),
}

#[derive(Clone, Debug, Serialize)]
pub struct Reading {
    id: ReadingId,
    fact_type: FactTypeId,
    ordinal: usize,
    role_sequence: RoleSequenceId,
    text: String,
    is_negative: bool,
    #[serde(skip)]
    tokens: Vec<TemplateToken>,
}
impl Reading {
    pub fn id(&self) -> ReadingId {
        self.id
    }
    pub fn fact_type(&self) -> FactTypeId {
        self.fact_type
    }
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
    pub fn role_sequence(&self) -> RoleSequenceId {
        self.role_sequence
    }
    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn is_negative(&self) -> bool {
        self.is_negative
    }
    /// The template split into plain words and `{n}` role placeholders.
    pub fn tokens(&self) -> &[TemplateToken] {
        &self.tokens
    }
}

pub fn template_tokens(text: &str) -> Vec<TemplateToken> {
    text.split_whitespace()
        .map(|part| match PLACEHOLDER.captures(part).and_then(|c| c[1].parse::<usize>().ok()) {
            Some(ordinal) => TemplateToken::Role(ordinal),
            None => TemplateToken::Word(part.to_string()),
        })
        .collect()
}

// ------------- Constraints -------------
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Enforcement {
    pub action: String,
    pub agent: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PresenceConstraint {
    id: PresenceConstraintId,
    role_sequence: RoleSequenceId,
    min_frequency: Option<u32>,
    max_frequency: Option<u32>,
    is_mandatory: bool,
    enforcement: Option<Enforcement>,
}
impl PresenceConstraint {
    pub fn id(&self) -> PresenceConstraintId {
        self.id
    }
    pub fn role_sequence(&self) -> RoleSequenceId {
        self.role_sequence
    }
    pub fn min_frequency(&self) -> Option<u32> {
        self.min_frequency
    }
    pub fn max_frequency(&self) -> Option<u32> {
        self.max_frequency
    }
    pub fn is_mandatory(&self) -> bool {
        self.is_mandatory
    }
    pub fn enforcement(&self) -> Option<&Enforcement> {
        self.enforcement.as_ref()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RingKind {
    Irreflexive,
    Asymmetric,
    Antisymmetric,
    Symmetric,
    Intransitive,
    StronglyIntransitive,
    Transitive,
    Acyclic,
    Reflexive,
}
impl FromStr for RingKind {
    type Err = ClausalError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "irreflexive" => Ok(RingKind::Irreflexive),
            "asymmetric" => Ok(RingKind::Asymmetric),
            "antisymmetric" => Ok(RingKind::Antisymmetric),
            "symmetric" => Ok(RingKind::Symmetric),
            "intransitive" => Ok(RingKind::Intransitive),
            "stronglyintransitive" => Ok(RingKind::StronglyIntransitive),
            "transitive" => Ok(RingKind::Transitive),
            "acyclic" => Ok(RingKind::Acyclic),
            "reflexive" => Ok(RingKind::Reflexive),
            _ => Err(ClausalError::InvalidQualifier(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RingConstraint {
    id: RingConstraintId,
    role: RoleId,
    other_role: RoleId,
    kinds: Vec<RingKind>,
}
impl RingConstraint {
    pub fn id(&self) -> RingConstraintId {
        self.id
    }
    pub fn role(&self) -> RoleId {
        self.role
    }
    pub fn other_role(&self) -> RoleId {
        self.other_role
    }
    pub fn kinds(&self) -> &[RingKind] {
        &self.kinds
    }
}

// ------------- Vocabulary -------------
#[derive(Clone, Debug, Serialize)]
pub struct Vocabulary {
    name: String,
    object_types: Vec<ObjectType>,
    fact_types: Vec<FactType>,
    roles: Vec<Role>,
    role_sequences: Vec<RoleSequence>,
    readings: Vec<Reading>,
    presence_constraints: Vec<PresenceConstraint>,
    ring_constraints: Vec<RingConstraint>,
    queries: Vec<Query>,
    // lookups between constructs (similar to database indexes)
    #[serde(skip)]
    object_type_by_name: HashMap<String, ObjectTypeId, OtherHasher>,
    #[serde(skip)]
    subtypes: Lookup<ObjectTypeId, ObjectTypeId>,
    #[serde(skip)]
    roles_played: Lookup<ObjectTypeId, RoleId>,
    #[serde(skip)]
    link_fact_types: HashMap<(ObjectTypeId, RoleId), FactTypeId, OtherHasher>,
    #[serde(skip)]
    comparison_fact_types: HashMap<(String, ObjectTypeId, ObjectTypeId), FactTypeId, OtherHasher>,
}

impl Vocabulary {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            object_types: Vec::new(),
            fact_types: Vec::new(),
            roles: Vec::new(),
            role_sequences: Vec::new(),
            readings: Vec::new(),
            presence_constraints: Vec::new(),
            ring_constraints: Vec::new(),
            queries: Vec::new(),
            object_type_by_name: HashMap::default(),
            subtypes: Lookup::new(),
            roles_played: Lookup::new(),
            link_fact_types: HashMap::default(),
            comparison_fact_types: HashMap::default(),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn object_types(&self) -> &[ObjectType] {
        &self.object_types
    }
    pub fn fact_types(&self) -> &[FactType] {
        &self.fact_types
    }
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }
    pub fn presence_constraints(&self) -> &[PresenceConstraint] {
        &self.presence_constraints
    }
    pub fn ring_constraints(&self) -> &[RingConstraint] {
        &self.ring_constraints
    }
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    // functions to look up object types and walk the inheritance graph
    pub fn object_type(&self, name: &str) -> Option<ObjectTypeId> {
        self.object_type_by_name.get(name).copied()
    }
    /// The object type itself followed by all its supertypes, breadth first.
    pub fn supertypes_transitive(&self, object_type: ObjectTypeId) -> Vec<ObjectTypeId> {
        self.breadth_first(object_type, |id| self[id].supertypes())
    }
    /// The object type itself followed by all its subtypes, breadth first.
    pub fn subtypes_transitive(&self, object_type: ObjectTypeId) -> Vec<ObjectTypeId> {
        self.breadth_first(object_type, |id| self.subtypes.lookup(&id))
    }
    fn breadth_first<'a, F>(&'a self, start: ObjectTypeId, next: F) -> Vec<ObjectTypeId>
    where
        F: Fn(ObjectTypeId) -> &'a [ObjectTypeId],
    {
        let mut seen = vec![start];
        let mut i = 0;
        while i < seen.len() {
            for &n in next(seen[i]) {
                if !seen.contains(&n) {
                    seen.push(n);
                }
            }
            i += 1;
        }
        seen
    }
    /// Supertypes then subtypes, without repetition.
    pub fn related_types(&self, object_type: ObjectTypeId) -> Vec<ObjectTypeId> {
        let mut related = self.supertypes_transitive(object_type);
        for sub in self.subtypes_transitive(object_type) {
            if !related.contains(&sub) {
                related.push(sub);
            }
        }
        related
    }
    /// The nearest supertype shared by both object types (which may be either of them).
    pub fn common_supertype(&self, a: ObjectTypeId, b: ObjectTypeId) -> Option<ObjectTypeId> {
        let b_supertypes = self.supertypes_transitive(b);
        self.supertypes_transitive(a)
            .into_iter()
            .find(|s| b_supertypes.contains(s))
    }
    pub fn is_subtype_of(&self, subtype: ObjectTypeId, supertype: ObjectTypeId) -> bool {
        self.supertypes_transitive(subtype).contains(&supertype)
    }
    pub fn roles_played_by(&self, object_type: ObjectTypeId) -> &[RoleId] {
        self.roles_played.lookup(&object_type)
    }

    // functions to create object types
    fn keep_object_type(&mut self, name: &str, kind: ObjectTypeKind, forward: bool) -> Result<ObjectTypeId> {
        let id = ObjectTypeId(self.object_types.len());
        match self.object_type_by_name.entry(name.to_string()) {
            Entry::Occupied(e) => {
                let existing = *e.get();
                // a declaration may replace the stub made for a forward reference
                if self.object_types[existing.index()].forward && kind == ObjectTypeKind::Entity {
                    self.object_types[existing.index()].forward = forward;
                    return Ok(existing);
                }
                Err(ClausalError::DuplicateObjectType(name.to_string()))
            }
            Entry::Vacant(e) => {
                e.insert(id);
                self.object_types.push(ObjectType {
                    id,
                    name: name.to_string(),
                    kind,
                    supertypes: Vec::new(),
                    fact_type: None,
                    forward,
                });
                debug!(object_type = name, ?kind, forward, "kept object type");
                Ok(id)
            }
        }
    }
    pub fn add_entity_type(&mut self, name: &str) -> Result<ObjectTypeId> {
        self.keep_object_type(name, ObjectTypeKind::Entity, false)
    }
    pub fn add_value_type(&mut self, name: &str) -> Result<ObjectTypeId> {
        self.keep_object_type(name, ObjectTypeKind::Value, false)
    }
    /// Makes (or returns) an entity type stub for a name used before its declaration.
    pub fn add_forward_entity_type(&mut self, name: &str) -> Result<ObjectTypeId> {
        match self.object_type(name) {
            Some(existing) => Ok(existing),
            None => self.keep_object_type(name, ObjectTypeKind::Entity, true),
        }
    }
    /// Declares `subtype` a kind of `supertype`, making the type inheritance fact type.
    pub fn add_subtype(&mut self, subtype: ObjectTypeId, supertype: ObjectTypeId) -> Result<FactTypeId> {
        if let Some(existing) = self.fact_types.iter().find(|ft| {
            ft.kind == FactTypeKind::TypeInheritance { subtype, supertype }
        }) {
            return Ok(existing.id);
        }
        if subtype == supertype || self.is_subtype_of(supertype, subtype) {
            return Err(ClausalError::CircularSubtype(format!(
                "{} is a kind of {}",
                self[subtype].name, self[supertype].name
            )));
        }
        self.object_types[subtype.index()].supertypes.push(supertype);
        self.subtypes.insert(supertype, subtype);

        let fact_type = self.new_fact_type(FactTypeKind::TypeInheritance { subtype, supertype });
        let subtype_role = self.add_role(fact_type, subtype, None);
        let supertype_role = self.add_role(fact_type, supertype, None);
        let role_sequence = self.add_role_sequence(vec![RoleRef::new(subtype_role), RoleRef::new(supertype_role)]);
        for text in ["{0} is a kind of {1}", "{0} is a subtype of {1}", "{1} is a supertype of {0}"] {
            self.add_reading(fact_type, role_sequence, text.to_string(), false)?;
        }
        Ok(fact_type)
    }
    /// Makes `name` the entity type objectifying `fact_type`.
    pub fn objectify(&mut self, name: &str, fact_type: FactTypeId) -> Result<ObjectTypeId> {
        let entity_type = match self.object_type(name) {
            Some(existing) => {
                let object_type = &self.object_types[existing.index()];
                if object_type.kind != ObjectTypeKind::Entity || object_type.fact_type.is_some_and(|ft| ft != fact_type) {
                    return Err(ClausalError::DuplicateObjectType(name.to_string()));
                }
                existing
            }
            None => self.add_entity_type(name)?,
        };
        if let Some(other) = self.fact_types[fact_type.index()].entity_type.filter(|&e| e != entity_type) {
            return Err(ClausalError::ObjectificationMismatch {
                term: name.to_string(),
                fact_type: format!("{} (already objectified by {})", self.describe_fact_type(fact_type), self[other].name),
            });
        }
        self.object_types[entity_type.index()].fact_type = Some(fact_type);
        self.object_types[entity_type.index()].forward = false;
        self.fact_types[fact_type.index()].entity_type = Some(entity_type);
        Ok(entity_type)
    }

    // functions to create fact types and their parts
    pub fn new_fact_type(&mut self, kind: FactTypeKind) -> FactTypeId {
        let id = FactTypeId(self.fact_types.len());
        self.fact_types.push(FactType {
            id,
            kind,
            roles: Vec::new(),
            readings: Vec::new(),
            entity_type: None,
            derivation: None,
        });
        id
    }
    pub fn add_role(&mut self, fact_type: FactTypeId, player: ObjectTypeId, role_name: Option<String>) -> RoleId {
        let id = RoleId(self.roles.len());
        let ordinal = self.fact_types[fact_type.index()].roles.len();
        self.roles.push(Role {
            id,
            fact_type,
            ordinal,
            object_type: player,
            role_name,
        });
        self.fact_types[fact_type.index()].roles.push(id);
        self.roles_played.insert(player, id);
        id
    }
    /// Records a role name on a role that has none. A different existing name conflicts.
    pub fn name_role(&mut self, role: RoleId, role_name: &str) -> Result<()> {
        let player = self.object_types[self.roles[role.index()].object_type.index()].name.clone();
        let role = &mut self.roles[role.index()];
        match &role.role_name {
            Some(existing) if existing != role_name => Err(ClausalError::ConflictingRoleName {
                term: player,
                existing: existing.clone(),
                requested: role_name.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                role.role_name = Some(role_name.to_string());
                Ok(())
            }
        }
    }
    pub fn add_role_sequence(&mut self, role_refs: Vec<RoleRef>) -> RoleSequenceId {
        let id = RoleSequenceId(self.role_sequences.len());
        self.role_sequences.push(RoleSequence { id, role_refs });
        id
    }
    pub fn add_reading(
        &mut self,
        fact_type: FactTypeId,
        role_sequence: RoleSequenceId,
        text: String,
        is_negative: bool,
    ) -> Result<ReadingId> {
        let players = |rs: RoleSequenceId| -> Vec<(ObjectTypeId, Option<String>, Option<String>)> {
            self.role_sequences[rs.index()]
                .role_refs
                .iter()
                .map(|rr| (self.roles[rr.role.index()].object_type, rr.leading_adjective.clone(), rr.trailing_adjective.clone()))
                .collect()
        };
        let wanted = players(role_sequence);
        let duplicate = self.fact_types[fact_type.index()]
            .readings
            .iter()
            .map(|&r| &self.readings[r.index()])
            .find(|r| r.text == text && r.is_negative == is_negative && players(r.role_sequence) == wanted)
            .map(|r| r.id);
        if let Some(duplicate) = duplicate {
            return Err(ClausalError::DuplicateReading(self.expand_reading(duplicate)));
        }
        let id = ReadingId(self.readings.len());
        let ordinal = self.fact_types[fact_type.index()].readings.len();
        let tokens = template_tokens(&text);
        self.readings.push(Reading {
            id,
            fact_type,
            ordinal,
            role_sequence,
            text,
            is_negative,
            tokens,
        });
        self.fact_types[fact_type.index()].readings.push(id);
        debug!(reading = %self.expand_reading(id), "added reading");
        Ok(id)
    }
    pub fn set_derivation(&mut self, fact_type: FactTypeId, query: QueryId) {
        self.fact_types[fact_type.index()].derivation = Some(query);
    }
    pub fn add_query(&mut self, query: Query) -> QueryId {
        let id = QueryId(self.queries.len());
        self.queries.push(query);
        id
    }

    /// The binary fact type linking an objectifying entity type (phantom role) to
    /// the player of one role of the objectified fact type (mirror role).
    pub fn link_fact_type(&mut self, objectification: ObjectTypeId, mirrored: RoleId) -> FactTypeId {
        if let Some(&existing) = self.link_fact_types.get(&(objectification, mirrored)) {
            return existing;
        }
        let mirror_player = self.roles[mirrored.index()].object_type;
        let fact_type = self.new_fact_type(FactTypeKind::Link { objectification, mirrored });
        let phantom = self.add_role(fact_type, objectification, None);
        let mirror = self.add_role(fact_type, mirror_player, None);
        let role_sequence = self.add_role_sequence(vec![RoleRef::new(phantom), RoleRef::new(mirror)]);
        let id = ReadingId(self.readings.len());
        let text = "{0} involves {1}".to_string();
        self.readings.push(Reading {
            id,
            fact_type,
            ordinal: 0,
            role_sequence,
            tokens: template_tokens(&text),
            text,
            is_negative: false,
        });
        self.fact_types[fact_type.index()].readings.push(id);
        self.link_fact_types.insert((objectification, mirrored), fact_type);
        fact_type
    }

    /// The fact type of a comparison `{0} <operator> {1}` between two players.
    pub fn comparison_fact_type(&mut self, operator: &str, lhs: ObjectTypeId, rhs: ObjectTypeId) -> FactTypeId {
        let key = (operator.to_string(), lhs, rhs);
        if let Some(&existing) = self.comparison_fact_types.get(&key) {
            return existing;
        }
        let fact_type = self.new_fact_type(FactTypeKind::Comparison { operator: operator.to_string() });
        let left = self.add_role(fact_type, lhs, None);
        let right = self.add_role(fact_type, rhs, None);
        let role_sequence = self.add_role_sequence(vec![RoleRef::new(left), RoleRef::new(right)]);
        let id = ReadingId(self.readings.len());
        let text = format!("{{0}} {operator} {{1}}");
        self.readings.push(Reading {
            id,
            fact_type,
            ordinal: 0,
            role_sequence,
            tokens: template_tokens(&text),
            text,
            is_negative: false,
        });
        self.fact_types[fact_type.index()].readings.push(id);
        self.comparison_fact_types.insert(key, fact_type);
        fact_type
    }

    // functions to create constraints
    pub fn add_presence_constraint(
        &mut self,
        role_sequence: RoleSequenceId,
        min_frequency: Option<u32>,
        max_frequency: Option<u32>,
        enforcement: Option<Enforcement>,
    ) -> PresenceConstraintId {
        let id = PresenceConstraintId(self.presence_constraints.len());
        self.presence_constraints.push(PresenceConstraint {
            id,
            role_sequence,
            min_frequency,
            max_frequency,
            is_mandatory: min_frequency.is_some_and(|min| min > 0),
            enforcement,
        });
        id
    }
    /// Fills in frequencies an existing presence constraint left open.
    /// A frequency that is already set must agree with the one supplied.
    pub fn restrict_presence_constraint(
        &mut self,
        constraint: PresenceConstraintId,
        min_frequency: Option<u32>,
        max_frequency: Option<u32>,
    ) -> Result<()> {
        let roles = self.describe_role_sequence(self.presence_constraints[constraint.index()].role_sequence);
        let pc = &mut self.presence_constraints[constraint.index()];
        if let (Some(existing), Some(requested)) = (pc.max_frequency, max_frequency) {
            if existing != requested {
                return Err(ClausalError::ConflictingFrequency { bound: "maximum", roles });
            }
        }
        if let (Some(existing), Some(requested)) = (pc.min_frequency, min_frequency) {
            if existing != requested {
                return Err(ClausalError::ConflictingFrequency { bound: "minimum", roles });
            }
        }
        pc.max_frequency = pc.max_frequency.or(max_frequency);
        pc.min_frequency = pc.min_frequency.or(min_frequency);
        pc.is_mandatory = pc.min_frequency.is_some_and(|min| min > 0);
        Ok(())
    }
    /// A presence constraint spanning exactly these roles, in any order.
    pub fn presence_constraint_over(&self, roles: &[RoleId]) -> Option<PresenceConstraintId> {
        self.presence_constraints
            .iter()
            .find(|pc| same_roles(&self.role_sequences[pc.role_sequence.index()].roles(), roles))
            .map(|pc| pc.id)
    }
    pub fn add_ring_constraint(&mut self, role: RoleId, other_role: RoleId, kinds: Vec<RingKind>) -> RingConstraintId {
        let id = RingConstraintId(self.ring_constraints.len());
        self.ring_constraints.push(RingConstraint {
            id,
            role,
            other_role,
            kinds,
        });
        id
    }
    pub fn ring_constraint_over(&self, role: RoleId, other_role: RoleId) -> Option<RingConstraintId> {
        self.ring_constraints
            .iter()
            .find(|rc| same_roles(&[rc.role, rc.other_role], &[role, other_role]))
            .map(|rc| rc.id)
    }

    // functions rendering constructs in readable form
    pub fn expand_reading(&self, reading: ReadingId) -> String {
        let reading = &self[reading];
        let role_refs = self[reading.role_sequence].role_refs();
        reading
            .tokens
            .iter()
            .map(|token| match token {
                TemplateToken::Word(word) => word.clone(),
                TemplateToken::Role(n) => match role_refs.get(*n) {
                    Some(rr) => adjectival(
                        rr.leading_adjective.as_deref(),
                        self[self[rr.role].object_type].name(),
                        rr.trailing_adjective.as_deref(),
                    ),
                    None => format!("{{{n}}}"),
                },
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
    pub fn describe_fact_type(&self, fact_type: FactTypeId) -> String {
        let fact_type = &self[fact_type];
        match fact_type.readings.first() {
            Some(&reading) => self.expand_reading(reading),
            None => fact_type
                .roles
                .iter()
                .map(|&r| self[self[r].object_type].name().to_string())
                .collect::<Vec<_>>()
                .join(" / "),
        }
    }
    pub fn describe_role_sequence(&self, role_sequence: RoleSequenceId) -> String {
        self[role_sequence]
            .role_refs
            .iter()
            .map(|rr| {
                adjectival(
                    rr.leading_adjective.as_deref(),
                    self[self[rr.role].object_type].name(),
                    rr.trailing_adjective.as_deref(),
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn same_roles(a: &[RoleId], b: &[RoleId]) -> bool {
    a.len() == b.len() && a.iter().all(|r| b.contains(r))
}

/// Writes a term with its adjectives the way they are declared: the hyphen follows the
/// first leading adjective word and precedes the last trailing adjective word.
pub fn adjectival(leading: Option<&str>, term: &str, trailing: Option<&str>) -> String {
    let mut words: Vec<String> = Vec::new();
    if let Some(leading) = leading.filter(|l| !l.is_empty()) {
        let mut leading = leading.split_whitespace();
        if let Some(first) = leading.next() {
            words.push(format!("{first}-"));
        }
        words.extend(leading.map(str::to_string));
    }
    words.push(term.to_string());
    if let Some(trailing) = trailing.filter(|t| !t.is_empty()) {
        let trailing: Vec<&str> = trailing.split_whitespace().collect();
        if let Some((last, rest)) = trailing.split_last() {
            words.extend(rest.iter().map(|w| w.to_string()));
            words.push(format!("-{last}"));
        }
    }
    words.join(" ")
}

macro_rules! index_by_id {
    ($($id:ident => $field:ident : $construct:ty),* $(,)?) => {
        $(
            impl Index<$id> for Vocabulary {
                type Output = $construct;
                fn index(&self, id: $id) -> &$construct {
                    &self.$field[id.index()]
                }
            }
        )*
    };
}

index_by_id!(
    ObjectTypeId => object_types: ObjectType,
    FactTypeId => fact_types: FactType,
    RoleId => roles: Role,
    RoleSequenceId => role_sequences: RoleSequence,
    ReadingId => readings: Reading,
    PresenceConstraintId => presence_constraints: PresenceConstraint,
    RingConstraintId => ring_constraints: RingConstraint,
    QueryId => queries: Query,
);
