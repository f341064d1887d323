//! Clausal – the clause compiler at the heart of a fact-oriented modeling language.
//!
//! A model is written as natural-language *clauses* such as
//! `Person has at most one given- Name` or `Person(1) is parent of Person(2)`.
//! Each clause mentions object types (capitalised terms, possibly adorned with
//! adjectives, role names, subscripts, literals or quantifiers) joined by plain
//! words. Compiling a clause means deciding which *reading* of which *fact type*
//! it invokes, or making a new one when none matches:
//! * A [`vocabulary::Vocabulary`] keeps object types, fact types, roles, role
//!   sequences, readings, presence and ring constraints and stored queries.
//! * A [`binding::CompilationContext`] lives for one declaration, resolving the
//!   player of every [`clause::Reference`] and grouping references that denote the
//!   same thing into [`binding::Binding`]s.
//! * The [`matching`] module ranks candidate readings by the cost of the
//!   [`side_effects`] needed to make a clause fit, and picks one or reports an
//!   ambiguity.
//! * [`contraction`] retries clauses that leave out a player shared with the clause
//!   before them, and [`synthesis`] makes fact types and readings for clauses that
//!   matched nothing.
//! * [`constraint`] turns quantifiers and qualifiers into presence and ring
//!   constraints, and [`query`] joins matched clauses into a graph of variables,
//!   plays and steps.
//!
//! ## Notation
//! The [`parser`] reads a small declaration notation (grammar in `clausal.pest`)
//! into the syntax trees of [`ast`], and the [`compiler::Compiler`] drives each
//! declaration through the core, restoring the vocabulary if it fails.
//!
//! ## Quick Start
//! ```
//! use clausal::compiler::Compiler;
//! let mut compiler = Compiler::new();
//! compiler
//!     .compile("entity type Person; entity type Company; Person directs Company; Person directs Company?")
//!     .expect("compile ok");
//! assert_eq!(compiler.vocabulary().queries().len(), 1);
//! ```
//!
//! ## Configuration
//! [`config::Settings`] are read from `clausal.toml` and `CLAUSAL_*` environment
//! variables by the `clausal` binary, which compiles the files it is given and
//! prints the resulting vocabulary as JSON.

pub mod ast;
pub mod binding;
pub mod clause;
pub mod compiler;
pub mod config;
pub mod constraint;
pub mod contraction;
pub mod error;
pub mod matching;
pub mod parser;
pub mod query;
pub mod side_effects;
pub mod synthesis;
pub mod vocabulary;
