/// Core domain types for aspref: positions, code regions, symbols and includes.
use std::cmp::Ordering;
use std::path::PathBuf;

use serde::Serialize;

/// Zero-based line/column coordinate. Columns count Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Position {
    /// Zero-based column within the line.
    pub character: usize,
    /// Zero-based line index.
    pub line: usize,
}

impl Position {
    /// Create a position from a line and column.
    pub const fn new(line: usize, character: usize) -> Self {
        return Self { character, line };
    }
}

impl Ord for Position {
    /// Order by line first, then column.
    fn cmp(&self, other: &Self) -> Ordering {
        return (self.line, self.character).cmp(&(other.line, other.character));
    }
}

impl PartialOrd for Position {
    /// Delegate to `Ord` implementation.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

/// A `start..end` span between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    /// End position.
    pub end: Position,
    /// Start position.
    pub start: Position,
}

impl Range {
    /// Create a range, swapping the ends if they arrive reversed.
    pub fn new(start: Position, end: Position) -> Self {
        if end < start {
            return Self { end: start, start: end };
        }
        return Self { end, start };
    }

    /// Cursor containment: both ends inclusive, the way editors treat a caret
    /// sitting right before a closing delimiter as still inside.
    pub fn contains(&self, position: Position) -> bool {
        return self.start <= position && position <= self.end;
    }

    /// Character containment: the character starting at `position` lies in
    /// the half-open span `start..end`.
    pub fn covers_character(&self, position: Position) -> bool {
        return self.start <= position && position < self.end;
    }

    /// Whether `other` lies entirely within this range.
    pub fn contains_range(&self, other: &Self) -> bool {
        return self.start <= other.start && other.end <= self.end;
    }

    /// Whether the two ranges share at least one position.
    pub fn overlaps(&self, other: &Self) -> bool {
        return self.start <= other.end && other.start <= self.end;
    }
}

/// One embedded code island: the opening delimiter, the code between the
/// delimiters, and the closing delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CodeRegion {
    /// Range of the closing `%>` delimiter.
    pub close_delimiter: Range,
    /// Range of the code between the delimiters.
    pub code: Range,
    /// Range of the opening `<%`, `<%=` or `<%@` delimiter.
    pub open_delimiter: Range,
}

/// Accessor keyword of a `Property` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Accessor {
    /// `Property Get`.
    Get,
    /// `Property Let`.
    Let,
    /// `Property Set`.
    Set,
}

/// Keyword that introduced a procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Procedure {
    /// `Sub Class_Initialize` or `Sub Class_Terminate`.
    Constructor,
    /// `Function`.
    Function,
    /// `Sub`.
    Sub,
}

/// How a variable-like declaration stores its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Storage {
    /// `Dim a(5)` or `Dim a()`.
    Array,
    /// `Const`, `Public Const`, `Private Const`.
    Constant,
    /// First-seen `Set x = ...` without a prior `Dim`.
    Object,
    /// Plain `Dim`, `Public`, `Private`.
    Variable,
}

/// What kind of declaration a symbol is. Each variant carries exactly the
/// fields meaningful to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolKind {
    /// `Class Name`.
    Class,
    /// `Function Name(...)` or `Sub Name(...)`.
    Function {
        /// Parameter names in declaration order, stripped of `ByVal`/`ByRef`.
        parameters: Vec<String>,
        /// Keyword that introduced the procedure.
        procedure: Procedure,
    },
    /// A parameter of the function named by the symbol's parent.
    Parameter,
    /// `Property Get|Let|Set Name`.
    Property {
        /// Accessor keyword.
        accessor: Accessor,
    },
    /// `Dim`, `Const`, `Public`, `Private` or first-seen `Set`.
    Variable {
        /// Storage classification.
        storage: Storage,
    },
}

impl SymbolKind {
    /// Short lower-case label used in listings and completion de-duplication.
    pub const fn label(&self) -> &'static str {
        return match self {
            SymbolKind::Class => "class",
            SymbolKind::Function { procedure: Procedure::Constructor, .. } => "constructor",
            SymbolKind::Function { procedure: Procedure::Function, .. } => "function",
            SymbolKind::Function { procedure: Procedure::Sub, .. } => "sub",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Property { .. } => "property",
            SymbolKind::Variable { storage: Storage::Array } => "array",
            SymbolKind::Variable { storage: Storage::Constant } => "constant",
            SymbolKind::Variable { storage: Storage::Object } => "object",
            SymbolKind::Variable { storage: Storage::Variable } => "variable",
        };
    }

    /// Whether declaring this kind opens a scope frame closed by `End ...`.
    pub const fn opens_scope(&self) -> bool {
        return matches!(
            self,
            SymbolKind::Class | SymbolKind::Function { .. } | SymbolKind::Property { .. }
        );
    }
}

/// One `<param name="x">...</param>` entry of a documentation block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamDoc {
    /// Parameter name as written in the tag.
    pub name: String,
    /// Text between the tags, trimmed.
    pub summary: String,
}

/// Contiguous comment block found directly above a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Documentation {
    /// `<param>` entries in order of appearance.
    pub parameters: Vec<ParamDoc>,
    /// Comment text with markers stripped, one line per comment line.
    pub raw: String,
    /// Text of the first `<summary>` tag, trimmed.
    pub summary: Option<String>,
}

impl Documentation {
    /// Documentation for a named parameter, compared case-insensitively.
    pub fn parameter(&self, name: &str) -> Option<&ParamDoc> {
        return self.parameters.iter().find(|p| return p.name.eq_ignore_ascii_case(name));
    }
}

/// Where a symbol was declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    /// True when sourced from a configured built-in definitions document.
    pub built_in: bool,
    /// File name without directories, for display.
    pub file_name: String,
    /// Physical path of the declaring document.
    pub path: PathBuf,
}

/// One declaration site.
///
/// Lookup identity is the lower-cased `name` together with the lower-cased
/// `parent`: two symbols with the same name under different parents are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    /// Line span of the declaration.
    pub declaration: Range,
    /// Literal declaration text, e.g. `Public Function Add(a, b)`.
    pub definition: String,
    /// Comment block directly above the declaration.
    pub documentation: Option<Documentation>,
    /// Declaration kind with its kind-specific data.
    #[serde(flatten)]
    pub kind: SymbolKind,
    /// Declared name, original casing, brackets removed.
    pub name: String,
    /// Declaring document.
    pub origin: Origin,
    /// Enclosing class, procedure or property; the owning function for parameters.
    pub parent: Option<String>,
}

impl Symbol {
    /// Whether the symbol was declared outside any open block.
    pub const fn is_top_level(&self) -> bool {
        return self.parent.is_none();
    }

    /// Case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        return self.name.eq_ignore_ascii_case(name);
    }

    /// Case-insensitive parent comparison; `None` matches only top-level symbols.
    pub fn has_parent(&self, parent: Option<&str>) -> bool {
        return match (self.parent.as_deref(), parent) {
            (None, None) => true,
            (Some(own), Some(wanted)) => own.eq_ignore_ascii_case(wanted),
            _ => false,
        };
    }

    /// Parameter names of a function, empty for every other kind.
    pub fn parameters(&self) -> &[String] {
        return match &self.kind {
            SymbolKind::Function { parameters, .. } => parameters,
            _ => &[],
        };
    }
}

/// A symbol with the declarations nested inside its block, for outline display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineNode {
    /// Declarations nested inside this symbol's block.
    pub children: Vec<OutlineNode>,
    /// The declaration itself.
    pub symbol: Symbol,
}

/// Which directive form introduced an include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeKind {
    /// `<!-- #include file="relative/path" -->`.
    File,
    /// `<!-- #include virtual="/site/path" -->`.
    Virtual,
}

/// A resolved include reference from one document to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeEdge {
    /// Path exactly as written in the directive.
    pub directive: String,
    /// Directive form.
    pub kind: IncludeKind,
    /// Physical path that exists on disk.
    pub resolved: PathBuf,
}

impl IncludeEdge {
    /// Display label for the include.
    pub fn label(&self) -> String {
        return format!("Import Statement {}", self.directive);
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn positions_order_by_line_then_column() {
        assert!(Position::new(1, 0) > Position::new(0, 40));
        assert!(Position::new(2, 3) < Position::new(2, 4));
    }

    #[test]
    fn range_containment_is_inclusive_for_cursors_only() {
        let range = Range::new(Position::new(0, 2), Position::new(0, 5));
        assert!(range.contains(Position::new(0, 5)));
        assert!(!range.covers_character(Position::new(0, 5)));
        assert!(range.covers_character(Position::new(0, 2)));
    }

    #[test]
    fn reversed_range_is_normalized() {
        let range = Range::new(Position::new(3, 0), Position::new(1, 0));
        assert_eq!(range.start, Position::new(1, 0));
    }
}
