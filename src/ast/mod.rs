//! The AST schema and validator.
//!
//! The external parser hands back a JSON document; this module defines
//! the shape every node kind must have, validates incoming documents
//! against that shape, and builds the typed [`schema::Node`] tree the
//! rest of the core (walkers, resolver) operates on.

pub mod build;
pub mod schema;
pub mod validate;

pub use schema::{Node, NodeKind, ParseError};
pub use validate::{validate, ValidationError, ValidationOutcome};

/// Recursion bound shared by the validator and all AST walkers.
pub const MAX_DEPTH: u32 = 50;
