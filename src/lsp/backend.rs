//! The LSP adapter. The only component touching JSON-RPC —
//! every handler converts at the wire boundary via [`super::convert`] and
//! then defers to `indexer`/`resolver`/`walk`, never holding core logic
//! itself.

use super::convert::{decode_semantic_tokens, encode_semantic_tokens, lsp_position_to_core, path_to_uri, uri_to_path, word_at};
use super::diagnostics::DiagnosticsStore;
use crate::ast::build::{node_from_value, shift_positions};
use crate::ast::schema::Node;
use crate::index::Index;
use crate::indexer::Indexer;
use crate::parser::ParseClient;
use crate::resolver::{self, Definition};
use crate::rvt::{extract_blocks, BlockKind};
use crate::security;
use crate::types::{Param, Symbol, SymbolKind};
use crate::walk::folding::extract_folds;
use crate::walk::semantic_tokens::{extract_semantic_tokens, LEGEND};
use crate::walk::symbols::extract_symbols;
use crate::workspace;
use dashmap::DashMap;
use lsp_types::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tower_lsp::jsonrpc::Result as RpcResult;
use tower_lsp::{Client, LanguageServer};

struct Document {
    text: String,
    ast: Node,
}

/// Implements `tower_lsp::LanguageServer` over the core. Generic in the
/// parser client so tests can wire a `FakeParserClient` instead of
/// spawning a real process.
pub struct Backend<P> {
    client: Client,
    index: Arc<Index>,
    diagnostics: Arc<DiagnosticsStore>,
    indexer: Arc<Indexer<P>>,
    parser: Arc<P>,
    documents: DashMap<PathBuf, Document>,
    root: RwLock<Option<PathBuf>>,
}

impl<P: ParseClient + 'static> Backend<P> {
    #[must_use]
    pub fn new(client: Client, index: Arc<Index>, diagnostics: Arc<DiagnosticsStore>, indexer: Arc<Indexer<P>>, parser: Arc<P>) -> Self {
        Self {
            client,
            index,
            diagnostics,
            indexer,
            parser,
            documents: DashMap::new(),
            root: RwLock::new(None),
        }
    }

    /// Rejects any path the client hands us that doesn't stay within the
    /// workspace root (set during `initialize`). Returns the path
    /// unchanged when no root has been established yet — handlers fired
    /// before `initialize` shouldn't happen under a conformant client.
    fn check_in_workspace(&self, path: PathBuf) -> Option<PathBuf> {
        let root = self.root.read().unwrap_or_else(|e| e.into_inner()).clone()?;
        match security::validate_workspace_path(&root, &path) {
            Ok(validated) => Some(validated),
            Err(e) => {
                tracing::warn!(error = %e, "rejected out-of-workspace path");
                None
            }
        }
    }

    /// Parses `text` the same way the indexer does for this file's
    /// extension (whole file for `.tcl`, first code block for `.rvt`),
    /// purely to keep a fresh AST for position-based queries — the
    /// index's own copy lives behind [`Indexer::reindex_file`].
    async fn parse_document(&self, path: &Path, text: &str) -> Option<Node> {
        let is_rvt = path.extension().and_then(|e| e.to_str()) == Some("rvt");
        let (source, line_offset, col_offset) = if is_rvt {
            match extract_blocks(text).into_iter().find(|b| b.kind == BlockKind::Code) {
                Some(block) => (block.code, block.start_line - 1, block.start_col - 1),
                None => (String::new(), 0, 0),
            }
        } else {
            (text.to_string(), 0, 0)
        };
        let raw = self.parser.parse_source(path, &source).await.ok()?;
        let mut ast = node_from_value(&raw);
        shift_positions(&mut ast, line_offset, col_offset);
        Some(ast)
    }

    async fn reindex_and_cache(&self, path: &PathBuf) {
        self.indexer.reindex_file(path).await;
        if let Ok(text) = tokio::fs::read_to_string(path).await {
            if let Some(ast) = self.parse_document(path, &text).await {
                self.documents.insert(path.clone(), Document { text, ast });
            }
        }
        self.publish_diagnostics(path).await;
    }

    async fn publish_diagnostics(&self, path: &PathBuf) {
        let Some(uri) = path_to_uri(path) else { return };
        let diags = self
            .diagnostics
            .get(path)
            .into_iter()
            .map(|d| Diagnostic {
                range: d.range.to_lsp(),
                severity: Some(d.severity.into()),
                message: d.message,
                ..Diagnostic::default()
            })
            .collect();
        self.client.publish_diagnostics(uri, diags, None).await;
    }

    fn token_at(&self, path: &PathBuf, pos: lsp_types::Position) -> Option<String> {
        let doc = self.documents.get(path)?;
        let line = doc.text.lines().nth(pos.line as usize)?;
        word_at(line, pos.character as usize).map(str::to_string)
    }
}

#[tower_lsp::async_trait]
impl<P: ParseClient + 'static> LanguageServer for Backend<P> {
    async fn initialize(&self, params: InitializeParams) -> RpcResult<InitializeResult> {
        let start = params
            .root_uri
            .as_ref()
            .and_then(uri_to_path)
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
        let root = workspace::find_root(&start);
        *self.root.write().unwrap_or_else(|e| e.into_inner()) = Some(root.clone());

        let index = Arc::clone(&self.index);
        let indexer = Arc::clone(&self.indexer);
        let client = self.client.clone();
        tokio::spawn(async move {
            match indexer.start(&root).await {
                Ok(n) => {
                    client
                        .show_message(MessageType::INFO, format!("TCL index ready: {n} files"))
                        .await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "workspace scan failed");
                }
            }
            let _ = index.symbol_count();
        });

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                rename_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                folding_range_provider: Some(FoldingRangeProviderCapability::Simple(true)),
                workspace_symbol_provider: Some(OneOf::Left(true)),
                semantic_tokens_provider: Some(SemanticTokensServerCapabilities::SemanticTokensOptions(SemanticTokensOptions {
                    legend: SemanticTokensLegend {
                        token_types: LEGEND.iter().map(|t| SemanticTokenType::new(t)).collect(),
                        token_modifiers: vec![],
                    },
                    full: Some(SemanticTokensFullOptions::Bool(true)),
                    range: Some(true),
                    ..SemanticTokensOptions::default()
                })),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: "tcl-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        tracing::info!("client initialized");
    }

    async fn shutdown(&self) -> RpcResult<()> {
        self.indexer.cleanup();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let Some(path) = uri_to_path(&params.text_document.uri).and_then(|p| self.check_in_workspace(p)) else {
            return;
        };
        self.reindex_and_cache(&path).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(path) = uri_to_path(&params.text_document.uri).and_then(|p| self.check_in_workspace(p)) else {
            return;
        };
        // Full sync only: the editor's last content change carries the
        // entire document. We write it to disk since the parser (and the
        // indexer's `remove_file → parse` path) only reads real files —
        // there is no in-memory buffer layer — this is simplified to
        // "the file on disk is the source of truth".
        if let Some(change) = params.content_changes.into_iter().last() {
            if tokio::fs::write(&path, &change.text).await.is_ok() {
                self.reindex_and_cache(&path).await;
            }
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let Some(path) = uri_to_path(&params.text_document.uri).and_then(|p| self.check_in_workspace(p)) else {
            return;
        };
        self.reindex_and_cache(&path).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        if let Some(path) = uri_to_path(&params.text_document.uri) {
            self.documents.remove(&path);
        }
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> RpcResult<Option<GotoDefinitionResponse>> {
        let doc_pos = params.text_document_position_params;
        let Some(path) = uri_to_path(&doc_pos.text_document.uri) else { return Ok(None) };
        let Some(token) = self.token_at(&path, doc_pos.position) else { return Ok(None) };
        let Some(doc) = self.documents.get(&path) else { return Ok(None) };

        let pos = lsp_position_to_core(doc_pos.position);
        let Some(definition) = resolver::resolve_definition(&self.index, &doc.ast, &path, pos, &token) else {
            return Ok(None);
        };

        let (file, range) = match definition {
            Definition::SameFile { file, range } => (file, range),
            Definition::Symbol(symbol) => (symbol.file, symbol.range),
        };
        let Some(uri) = path_to_uri(&file) else { return Ok(None) };
        Ok(Some(GotoDefinitionResponse::Scalar(Location::new(uri, range.to_lsp()))))
    }

    async fn references(&self, params: ReferenceParams) -> RpcResult<Option<Vec<Location>>> {
        let doc_pos = params.text_document_position;
        let Some(path) = uri_to_path(&doc_pos.text_document.uri) else { return Ok(None) };
        let Some(token) = self.token_at(&path, doc_pos.position) else { return Ok(None) };
        let Some(doc) = self.documents.get(&path) else { return Ok(None) };

        let pos = lsp_position_to_core(doc_pos.position);
        let qualified_name = match resolver::resolve_definition(&self.index, &doc.ast, &path, pos, &token) {
            Some(Definition::Symbol(symbol)) => symbol.qualified_name,
            _ => return Ok(Some(vec![])),
        };

        let locations = resolver::find_references(&self.index, &qualified_name)
            .into_iter()
            .filter_map(|found| path_to_uri(&found.file).map(|uri| Location::new(uri, found.range.to_lsp())))
            .collect();
        Ok(Some(locations))
    }

    async fn hover(&self, params: HoverParams) -> RpcResult<Option<Hover>> {
        let doc_pos = params.text_document_position_params;
        let Some(path) = uri_to_path(&doc_pos.text_document.uri) else { return Ok(None) };
        let Some(token) = self.token_at(&path, doc_pos.position) else { return Ok(None) };
        let Some(doc) = self.documents.get(&path) else { return Ok(None) };

        let pos = lsp_position_to_core(doc_pos.position);
        let Some(Definition::Symbol(symbol)) = resolver::resolve_definition(&self.index, &doc.ast, &path, pos, &token) else {
            return Ok(None);
        };

        Ok(Some(Hover {
            contents: HoverContents::Scalar(MarkedString::String(format_signature(&symbol))),
            range: None,
        }))
    }

    async fn rename(&self, params: RenameParams) -> RpcResult<Option<WorkspaceEdit>> {
        let doc_pos = params.text_document_position;
        let Some(path) = uri_to_path(&doc_pos.text_document.uri) else { return Ok(None) };
        let Some(token) = self.token_at(&path, doc_pos.position) else { return Ok(None) };
        let Some(doc) = self.documents.get(&path) else { return Ok(None) };

        let pos = lsp_position_to_core(doc_pos.position);
        let qualified_name = match resolver::resolve_definition(&self.index, &doc.ast, &path, pos, &token) {
            Some(Definition::Symbol(symbol)) => symbol.qualified_name,
            _ => return Ok(None),
        };

        let mut changes: std::collections::HashMap<Url, Vec<TextEdit>> = std::collections::HashMap::new();
        for found in resolver::find_references(&self.index, &qualified_name) {
            let Some(uri) = path_to_uri(&found.file) else { continue };
            changes.entry(uri).or_default().push(TextEdit {
                range: found.range.to_lsp(),
                new_text: params.new_name.clone(),
            });
        }
        Ok(Some(WorkspaceEdit {
            changes: Some(changes),
            ..WorkspaceEdit::default()
        }))
    }

    async fn document_symbol(&self, params: DocumentSymbolParams) -> RpcResult<Option<DocumentSymbolResponse>> {
        let Some(path) = uri_to_path(&params.text_document.uri) else { return Ok(None) };
        let Some(doc) = self.documents.get(&path) else { return Ok(None) };

        #[allow(deprecated)]
        let symbols = extract_symbols(&doc.ast, &path)
            .into_iter()
            .map(|s| SymbolInformation {
                name: s.name,
                kind: symbol_kind_to_lsp(s.kind),
                tags: None,
                deprecated: None,
                location: Location::new(params.text_document.uri.clone(), s.range.to_lsp()),
                container_name: Some(s.scope.into_string()),
            })
            .collect();
        Ok(Some(DocumentSymbolResponse::Flat(symbols)))
    }

    async fn folding_range(&self, params: FoldingRangeParams) -> RpcResult<Option<Vec<FoldingRange>>> {
        let Some(path) = uri_to_path(&params.text_document.uri) else { return Ok(None) };
        let Some(doc) = self.documents.get(&path) else { return Ok(None) };

        let folds = extract_folds(&doc.ast, &path)
            .into_iter()
            .map(|f| FoldingRange {
                start_line: f.start_line,
                start_character: None,
                end_line: f.end_line,
                end_character: None,
                kind: Some(FoldingRangeKind::Region),
                collapsed_text: None,
            })
            .collect();
        Ok(Some(folds))
    }

    async fn semantic_tokens_full(&self, params: SemanticTokensParams) -> RpcResult<Option<SemanticTokensResult>> {
        let Some(path) = uri_to_path(&params.text_document.uri) else { return Ok(None) };
        let Some(doc) = self.documents.get(&path) else { return Ok(None) };

        let data = encode_lsp_tokens(&extract_semantic_tokens(&doc.ast, &path));
        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens { result_id: None, data })))
    }

    async fn semantic_tokens_range(&self, params: SemanticTokensRangeParams) -> RpcResult<Option<SemanticTokensRangeResult>> {
        let Some(path) = uri_to_path(&params.text_document.uri) else { return Ok(None) };
        let Some(doc) = self.documents.get(&path) else { return Ok(None) };

        let raw = extract_semantic_tokens(&doc.ast, &path);
        let absolute = decode_semantic_tokens(&raw);
        let start = params.range.start.line;
        let end = params.range.end.line;
        let filtered: Vec<_> = absolute.into_iter().filter(|(line, ..)| *line >= start && *line <= end).collect();
        let data = encode_lsp_tokens(&encode_semantic_tokens(&filtered));
        Ok(Some(SemanticTokensRangeResult::Tokens(SemanticTokens { result_id: None, data })))
    }

    async fn symbol(&self, params: WorkspaceSymbolParams) -> RpcResult<Option<Vec<SymbolInformation>>> {
        let query = params.query.to_lowercase();
        #[allow(deprecated)]
        let matches = self
            .index
            .all_symbols()
            .into_iter()
            .filter(|s| query.is_empty() || s.name.to_lowercase().contains(&query))
            .filter_map(|s| {
                path_to_uri(&s.file).map(|uri| SymbolInformation {
                    name: s.name,
                    kind: symbol_kind_to_lsp(s.kind),
                    tags: None,
                    deprecated: None,
                    location: Location::new(uri, s.range.to_lsp()),
                    container_name: Some(s.scope.into_string()),
                })
            })
            .collect();
        Ok(Some(matches))
    }
}

fn symbol_kind_to_lsp(kind: SymbolKind) -> lsp_types::SymbolKind {
    match kind {
        SymbolKind::Proc => lsp_types::SymbolKind::FUNCTION,
        SymbolKind::Variable => lsp_types::SymbolKind::VARIABLE,
        SymbolKind::Namespace => lsp_types::SymbolKind::NAMESPACE,
    }
}

fn format_signature(symbol: &Symbol) -> String {
    match symbol.kind {
        SymbolKind::Proc => {
            let params = symbol.params.iter().map(format_param).collect::<Vec<_>>().join(" ");
            format!("proc {} {{{params}}}", symbol.qualified_name)
        }
        SymbolKind::Variable => format!("variable {}", symbol.qualified_name),
        SymbolKind::Namespace => format!("namespace {}", symbol.qualified_name),
    }
}

fn format_param(param: &Param) -> String {
    if param.is_varargs {
        "args".to_string()
    } else if let Some(default) = &param.default {
        format!("{{{} {default}}}", param.name)
    } else {
        param.name.clone()
    }
}

/// `SemanticTokens::data` expects `u32` flattened into `lsp_types`'
/// `SemanticToken` structs, not a bare `Vec<u32>`.
fn encode_lsp_tokens(flat: &[u32]) -> Vec<SemanticToken> {
    flat.chunks_exact(5)
        .map(|c| SemanticToken {
            delta_line: c[0],
            delta_start: c[1],
            length: c[2],
            token_type: c[3],
            token_modifiers_bitset: c[4],
        })
        .collect()
}