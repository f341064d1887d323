use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Compiler settings, read from `clausal.toml` (or a file given explicitly) and
/// overridden by `CLAUSAL_*` environment variables.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Name given to the vocabulary being compiled.
    pub vocabulary: String,
    /// Terms that may be used before they are declared; they become entity types.
    pub allowed_forward_terms: Vec<String>,
    /// Whether unmatched query clauses may borrow a player from the clause before.
    pub contraction: bool,
    pub log_filter: String,
    pub pretty: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vocabulary: "default".to_string(),
            allowed_forward_terms: Vec::new(),
            contraction: true,
            log_filter: "info".to_string(),
            pretty: false,
        }
    }
}

impl Settings {
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = match path {
            Some(path) => File::with_name(path),
            None => File::with_name("clausal").required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("CLAUSAL")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_forward_terms"),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}
