//! tcl-lsp-core: a language server core for Tcl and Apache Rivet templates.
//!
//! The crate defines the AST schema, a namespace-aware visitor shared by
//! four extractors, a concurrent symbol/reference index, a background
//! indexer that keeps it current, and a scope-aware resolver — with an
//! external process as the only parser, and LSP transport as a thin
//! adapter over the same core.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │           LSP transport (tower-lsp)           │
//! │        JSON-RPC over stdin/stdout             │
//! └─────────────────┬──────────────────────────────┘
//!                   │
//! ┌─────────────────▼──────────────────────────────┐
//! │              lsp::backend                       │
//! │   textDocument/* handlers, position conversion   │
//! └───────┬─────────────────────┬────────────────────┘
//!         │                     │
//!   ┌─────▼──────┐       ┌──────▼───────┐
//!   │  indexer    │       │   resolver   │
//!   │   (tokio)   │       │              │
//!   └─────┬───────┘       └──────┬───────┘
//!         │                      │
//!   ┌─────▼──────┐         ┌─────▼──────┐
//!   │   walk      │         │   index    │
//!   │  (visitor)  │◄───────┤   (DashMap) │
//!   └─────┬───────┘         └────────────┘
//!         │
//!   ┌─────▼──────┐     ┌─────────────┐
//!   │ ast::build  │◄────┤    parser    │
//!   │ ast::validate│     │ tokio::process│
//!   └─────────────┘     └─────────────┘
//! ```

pub mod ast;
pub mod builtins;
pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod lsp;
pub mod parser;
pub mod resolver;
pub mod rvt;
pub mod security;
pub mod types;
pub mod walk;
pub mod workspace;

pub use error::{CoreError, Result};
pub use index::Index;
pub use types::{Diagnostic, Position, QName, Range, Reference, Symbol};
