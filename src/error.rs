use thiserror::Error;

use crate::parser::Rule;

#[derive(Error, Debug)]
pub enum ClausalError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Cannot read {path}: {message}")]
    Io { path: String, message: String },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("Reference to undefined object type '{0}'")]
    UnrecognisedObjectType(String),
    #[error("Duplicate role {} '{name}' in clause", role_kind(.subscript))]
    DuplicateRoleName { name: String, subscript: bool },
    #[error("'{term}' may not have adjectives and also define the role name '{role_name}'")]
    AdjectiveWithRoleName { term: String, role_name: String },
    #[error("No fact type matches '{0}'")]
    NoFactTypeMatch(String),
    #[error("'{clause}' has more than one possible match: {}", describe_candidates(.candidates))]
    AmbiguousMatch { clause: String, candidates: Vec<(String, usize)> },
    #[error("'{clause}' needs a subtype step on '{fact_type}' that runs against the inheritance")]
    SubtypeStepDirectionConflict { clause: String, fact_type: String },
    #[error("Query is disconnected between {}", describe_groups(.groups))]
    DisconnectedQuery { groups: Vec<Vec<String>> },
    #[error("'{term}' does not objectify '{fact_type}'")]
    ObjectificationMismatch { term: String, fact_type: String },
    #[error("'{term}' plays no role in '{fact_type}'")]
    UnmatchedRolePlayer { term: String, fact_type: String },
    #[error("Reading '{0}' already exists")]
    DuplicateReading(String),
    #[error("Clauses match different existing fact types: {}", join_names(.0))]
    ConflictingFactTypes(Vec<String>),
    #[error("Conflicting {bound} frequency for the constraint over {roles}")]
    ConflictingFrequency { bound: &'static str, roles: String },
    #[error("Conflicting role names '{existing}' and '{requested}' for {term}")]
    ConflictingRoleName { term: String, existing: String, requested: String },
    #[error("Invalid qualifier: {0}")]
    InvalidQualifier(String),
    #[error("Object type '{0}' is already defined")]
    DuplicateObjectType(String),
    #[error("Circular type inheritance: {0}")]
    CircularSubtype(String),
    #[error("Query variable for {0} is not used in any step")]
    UnusedVariable(String),
    #[error("A {role_player} cannot satisfy {player} in '{reading}'")]
    IncompatiblePlayer { player: String, role_player: String, reading: String },
}

pub type Result<T> = std::result::Result<T, ClausalError>;

fn role_kind(subscript: &bool) -> &'static str {
    if *subscript { "subscript" } else { "name" }
}

fn join_names(names: &[String]) -> String {
    names.join(", ")
}

fn describe_candidates(candidates: &[(String, usize)]) -> String {
    candidates
        .iter()
        .map(|(reading, cost)| format!("'{reading}' (cost {cost})"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_groups(groups: &[Vec<String>]) -> String {
    groups
        .iter()
        .map(|group| format!("[{}]", group.join(", ")))
        .collect::<Vec<_>>()
        .join(" and ")
}

// Helper conversions
impl From<::config::ConfigError> for ClausalError {
    fn from(e: ::config::ConfigError) -> Self { Self::Config(e.to_string()) }
}

impl From<pest::error::Error<Rule>> for ClausalError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        let (line, col) = match e.line_col {
            pest::error::LineColLocation::Pos((line, col)) => (line, col),
            pest::error::LineColLocation::Span((line, col), _) => (line, col),
        };
        Self::Parse { message: e.variant.message().to_string(), line: Some(line), col: Some(col) }
    }
}
