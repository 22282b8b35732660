//! Symbol index: built-in symbols plus one entry per scanned document.
//!
//! The index is owned by its caller and has an explicit lifecycle:
//! [`SymbolIndex::initialize`] loads the built-in definitions once,
//! [`SymbolIndex::invalidate`] forgets them, and [`SymbolIndex::rescan`]
//! rebuilds one document's entry and swaps it in whole.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::builder::{self, BuildOptions};
use crate::config::Config;
use crate::document::{Document, DocumentSource};
use crate::includes::{self, IncludeFailure, IncludeScan};
use crate::types::{OutlineNode, Symbol};

/// Everything known about one document after a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentSymbols {
    /// Included documents that exist but could not be read.
    pub failures: Vec<IncludeFailure>,
    /// The document's own include directives.
    pub includes: IncludeScan,
    /// Outline of the document's own declarations.
    pub outline: Vec<OutlineNode>,
    /// The document's own symbols, then those of its includes in traversal order.
    pub symbols: Vec<Symbol>,
}

/// Built-in and per-document symbol collections.
#[derive(Debug, Clone)]
pub struct SymbolIndex {
    /// Built-in documents that could not be read on the last load.
    builtin_failures: Vec<IncludeFailure>,
    /// Built-in symbols, `None` until loaded.
    builtins: Option<Vec<Symbol>>,
    /// Options the index was created with.
    config: Config,
    /// Per-document entries keyed by lower-cased normalized path.
    documents: HashMap<String, DocumentSymbols>,
}

impl SymbolIndex {
    /// Empty index; nothing is loaded until [`SymbolIndex::initialize`] or
    /// [`SymbolIndex::rescan`] is called.
    pub fn new(config: Config) -> Self {
        return Self {
            builtin_failures: Vec::new(),
            builtins: None,
            config,
            documents: HashMap::new(),
        };
    }

    /// Built-in documents that failed to load.
    pub fn builtin_failures(&self) -> &[IncludeFailure] {
        return &self.builtin_failures;
    }

    /// Built-in symbols, empty before initialization.
    pub fn builtins(&self) -> &[Symbol] {
        return self.builtins.as_deref().unwrap_or_default();
    }

    /// Configuration in use.
    pub const fn config(&self) -> &Config {
        return &self.config;
    }

    /// The last scan of `path`, if any.
    pub fn document(&self, path: &Path) -> Option<&DocumentSymbols> {
        return self.documents.get(&includes::path_key(path));
    }

    /// Load the configured built-in definitions documents. Does nothing when
    /// they are already loaded; call [`SymbolIndex::invalidate`] first to reload.
    pub fn initialize(&mut self, source: &dyn DocumentSource) {
        if self.builtins.is_some() {
            return;
        }

        let options = BuildOptions::from_config(&self.config, true);
        let mut symbols = Vec::new();
        let mut failures = Vec::new();
        for path in &self.config.builtin_includes {
            match source.open(path) {
                Ok(document) => {
                    builder::build(&document, &options, &mut symbols);
                },
                Err(e) => {
                    tracing::warn!("cannot read built-in definitions {}: {e}", path.display());
                    failures.push(IncludeFailure {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                },
            }
        }

        tracing::debug!("loaded {} built-in symbol(s)", symbols.len());
        self.builtins = Some(symbols);
        self.builtin_failures = failures;
        return;
    }

    /// Forget the built-in symbols so the next [`SymbolIndex::initialize`] reloads them.
    pub fn invalidate(&mut self) {
        self.builtins = None;
        self.builtin_failures.clear();
        return;
    }

    /// First symbol visible from `path` named `name` under `parent`.
    /// Document symbols win over built-ins.
    pub fn lookup(&self, path: &Path, name: &str, parent: Option<&str>) -> Option<&Symbol> {
        return lookup_symbol(self.symbols_for(path), name, parent);
    }

    /// Drop the entry of a closed or deleted document.
    pub fn remove(&mut self, path: &Path) -> Option<DocumentSymbols> {
        return self.documents.remove(&includes::path_key(path));
    }

    /// Rebuild the entry of `document`, including its transitive includes,
    /// and replace the previous entry in one step.
    pub fn rescan(&mut self, document: &Document, source: &dyn DocumentSource) -> &DocumentSymbols {
        let entry = scan_document(document, &self.config, source);
        let key = includes::path_key(document.path());
        self.documents.insert(key.clone(), entry);
        return self.documents.entry(key).or_default();
    }

    /// Every symbol visible from `path`: its own and included symbols first,
    /// then built-ins. Unknown documents see only built-ins.
    pub fn symbols_for(&self, path: &Path) -> impl Iterator<Item = &Symbol> {
        let own = self.document(path).map(|d| return d.symbols.as_slice()).unwrap_or_default();
        return own.iter().chain(self.builtins());
    }
}

/// First symbol named `name` (case-insensitive) whose parent is `parent`.
///
/// `parent: None` matches only symbols without a parent: an unqualified
/// lookup never lands on a class member or a local.
pub fn lookup_symbol<'a>(
    symbols: impl IntoIterator<Item = &'a Symbol>,
    name: &str,
    parent: Option<&str>,
) -> Option<&'a Symbol> {
    return symbols.into_iter().find(|s| return s.is_named(name) && s.has_parent(parent));
}

/// Scan one document and everything it includes into a fresh entry.
pub fn scan_document(
    document: &Document,
    config: &Config,
    source: &dyn DocumentSource,
) -> DocumentSymbols {
    let options = BuildOptions::from_config(config, false);
    let mut symbols = Vec::new();
    let outline = builder::build(document, &options, &mut symbols);
    let includes = includes::resolve_includes(document, config, source);
    let failures =
        includes::collect_included_symbols(document, config, source, &options, &mut symbols);
    return DocumentSymbols {
        failures,
        includes,
        outline,
        symbols,
    };
}
