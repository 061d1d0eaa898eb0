//! LSP transport adapter: `tower_lsp` wiring, wire-boundary
//! conversions, and the diagnostics façade. Nothing outside this module
//! knows about `lsp_types` or JSON-RPC.

pub mod backend;
pub mod convert;
pub mod diagnostics;

pub use backend::Backend;
pub use diagnostics::DiagnosticsStore;
