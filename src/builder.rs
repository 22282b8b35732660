//! Symbol table builder: one linear pass over a document's code regions.
//!
//! Lines outside every region are skipped. A line touched by several
//! regions is read once per region with everything else masked, and each
//! `:`-separated statement runs through the recognizer set. A local scope
//! stack assigns parents: a declaration made while a
//! `Class`/`Function`/`Sub`/`Property` block is open belongs to that block.

use std::collections::HashSet;

use crate::config::Config;
use crate::docs;
use crate::document::Document;
use crate::grammar::{self, Declaration, VariableStatement};
use crate::scanner::{code_segments, scan_regions};
use crate::types::{Origin, OutlineNode, Range, Symbol, SymbolKind};

/// What a build emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools, reason = "independent switches")]
pub struct BuildOptions {
    /// Mark every symbol as coming from a built-in definitions document.
    pub built_in: bool,
    /// Expand function parameter lists into `Parameter` symbols.
    pub show_parameter_symbols: bool,
    /// Emit variable, constant, array and object declarations.
    pub show_variable_symbols: bool,
}

impl BuildOptions {
    /// Options for a user document (`built_in = false`) or a built-in one.
    pub const fn from_config(config: &Config, built_in: bool) -> Self {
        return Self {
            built_in,
            show_parameter_symbols: config.show_parameter_symbols,
            show_variable_symbols: config.show_variable_symbols,
        };
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        return Self {
            built_in: false,
            show_parameter_symbols: false,
            show_variable_symbols: true,
        };
    }
}

/// Mutable state of a single build. Never shared between builds.
struct Scan<'a> {
    /// Document being scanned.
    document: &'a Document,
    /// Emission switches.
    options: &'a BuildOptions,
    /// Provenance stamped on every symbol.
    origin: Origin,
    /// Closed top-level declarations, in source order.
    result: Vec<OutlineNode>,
    /// Lower-cased variable names registered so far in this document.
    seen: HashSet<String>,
    /// Open blocks, innermost last.
    stack: Vec<OutlineNode>,
}

impl<'a> Scan<'a> {
    /// Start a scan of `document`.
    fn new(document: &'a Document, options: &'a BuildOptions) -> Self {
        return Self {
            document,
            options,
            origin: Origin {
                built_in: options.built_in,
                file_name: document.file_name(),
                path: document.path().to_path_buf(),
            },
            result: Vec::new(),
            seen: HashSet::new(),
            stack: Vec::new(),
        };
    }

    /// Put a finished node under the innermost open block, or at top level.
    fn attach(&mut self, node: OutlineNode) {
        match self.stack.last_mut() {
            Some(frame) => frame.children.push(node),
            None => self.result.push(node),
        }
        return;
    }

    /// Close the innermost block. Unbalanced `End` statements are ignored.
    fn close(&mut self, line: usize) {
        let Some(frame) = self.stack.pop() else {
            tracing::debug!(
                "{}:{}: End without an open block",
                self.document.file_name(),
                line.saturating_add(1)
            );
            return;
        };
        self.attach(frame);
        return;
    }

    /// Register a class, procedure or property and open its block.
    fn declare(
        &mut self,
        line: usize,
        range: Range,
        declaration: Declaration,
        out: &mut Vec<Symbol>,
    ) {
        let symbol = Symbol {
            declaration: range,
            definition: declaration.definition,
            documentation: docs::extract_above(self.document, line),
            kind: declaration.kind,
            name: declaration.name,
            origin: self.origin.clone(),
            parent: self.parent(),
        };
        out.push(symbol.clone());

        let mut children = Vec::new();
        if self.options.show_parameter_symbols {
            for parameter in symbol.parameters() {
                let parameter = self.parameter_symbol(range, &symbol.name, parameter);
                out.push(parameter.clone());
                children.push(OutlineNode {
                    children: Vec::new(),
                    symbol: parameter,
                });
            }
        }

        tracing::debug!(
            "{}: {} {} opens a scope",
            self.origin.file_name,
            symbol.kind.label(),
            symbol.name
        );
        self.stack.push(OutlineNode { children, symbol });
        return;
    }

    /// Register the names of a variable statement.
    ///
    /// A name is registered when it has not been seen in this document yet,
    /// or when the keyword is anything but `Set`: `Dim a` then `Set a = x`
    /// yields one symbol, while a lone `Set b = x` declares `b`.
    fn declare_variables(
        &mut self,
        line: usize,
        range: Range,
        statement: VariableStatement,
        out: &mut Vec<Symbol>,
    ) {
        for variable in statement.names {
            let key = variable.name.to_ascii_lowercase();
            if statement.is_set && self.seen.contains(&key) {
                continue;
            }
            self.seen.insert(key);

            let symbol = Symbol {
                declaration: range,
                definition: statement.definition.clone(),
                documentation: docs::extract_above(self.document, line),
                kind: SymbolKind::Variable { storage: variable.storage },
                name: variable.name,
                origin: self.origin.clone(),
                parent: self.parent(),
            };
            out.push(symbol.clone());
            self.attach(OutlineNode {
                children: Vec::new(),
                symbol,
            });
        }
        return;
    }

    /// Flush blocks still open at end of document and return the outline.
    fn finish(mut self) -> Vec<OutlineNode> {
        if !self.stack.is_empty() {
            tracing::debug!("{}: {} block(s) left open", self.origin.file_name, self.stack.len());
        }
        while let Some(frame) = self.stack.pop() {
            self.attach(frame);
        }
        return self.result;
    }

    /// A parameter of `owner`, declared on the owner's line.
    fn parameter_symbol(&self, range: Range, owner: &str, name: &str) -> Symbol {
        return Symbol {
            declaration: range,
            definition: format!("{name} ' parameter of {owner}"),
            documentation: None,
            kind: SymbolKind::Parameter,
            name: name.to_string(),
            origin: self.origin.clone(),
            parent: Some(owner.to_string()),
        };
    }

    /// Name of the innermost open block.
    fn parent(&self) -> Option<String> {
        return self.stack.last().map(|frame| return frame.symbol.name.clone());
    }

    /// Run one statement through the recognizers in priority order.
    fn statement(&mut self, line: usize, range: Range, statement: &str, out: &mut Vec<Symbol>) {
        if let Some(declaration) = grammar::declaration(statement) {
            self.declare(line, range, declaration, out);
        } else if self.options.show_variable_symbols
            && let Some(variables) = grammar::variables(statement)
        {
            self.declare_variables(line, range, variables, out);
        }

        if grammar::block_end(statement).is_some() {
            self.close(line);
        }
        return;
    }
}

/// Build the symbols of one document.
///
/// Every symbol, nested or not, is appended to `out` in source order. The
/// return value is the outline: top-level declarations with their nested
/// declarations as children. Documents without code regions yield nothing.
pub fn build(
    document: &Document,
    options: &BuildOptions,
    out: &mut Vec<Symbol>,
) -> Vec<OutlineNode> {
    let regions = scan_regions(document);
    if regions.is_empty() {
        return Vec::new();
    }

    let before = out.len();
    let mut scan = Scan::new(document, options);
    for (index, text) in document.lines() {
        if text.trim().is_empty() {
            continue;
        }
        let Some(range) = document.line_range(index) else {
            continue;
        };
        for code in code_segments(document, &regions, index) {
            if grammar::is_comment(&code) {
                continue;
            }
            for statement in grammar::split_statements(grammar::strip_comment(&code)) {
                scan.statement(index, range, statement, out);
            }
        }
    }

    let outline = scan.finish();
    tracing::debug!(
        "{}: {} region(s), {} symbol(s)",
        document.file_name(),
        regions.len(),
        out.len().saturating_sub(before)
    );
    return outline;
}

/// Depth-first walk of an outline, parents before children.
pub fn flatten(outline: &[OutlineNode]) -> Vec<&Symbol> {
    let mut symbols = Vec::new();
    let mut pending: Vec<&OutlineNode> = outline.iter().rev().collect();
    while let Some(node) = pending.pop() {
        symbols.push(&node.symbol);
        pending.extend(node.children.iter().rev());
    }
    return symbols;
}
