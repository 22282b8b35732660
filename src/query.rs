//! Interaction-time queries over a scanned document: the symbol under the
//! cursor, completion candidates, call signatures and doc-comment skeletons.
//!
//! Every query takes the [`SymbolIndex`] the document was scanned into and
//! answers "nothing" rather than failing when the index or the text is
//! incomplete.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::document::Document;
use crate::grammar;
use crate::index::SymbolIndex;
use crate::resolver::{resolve_enclosing_blocks, resolve_qualifier, word_at};
use crate::scanner::{code_segment_at, code_segments, scan_regions};
use crate::types::{Position, Symbol, SymbolKind};

/// A statement prefix that is still typing a declaration name.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static DECLARING: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(
        r"(?i)^[\t ]*(?:Dim|ReDim|(?:(?:Private|Public)[\t ]+)?(?:Const|Class|Function|Sub|Property[\t ]+[GLS]et)|Private|Public)[\t ]+[\w\t ,]*(?:\([^)]*)?$",
    )
    .expect("valid regex");
});

/// `object.` or `object.partial` at the end of a prefix.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static MEMBER_ACCESS: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"(\w+)\.\w*$").expect("valid regex"));

/// Closed string literal.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static STRING: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r#""[^"]*""#).expect("valid regex"));

/// String literal still open at the end of the prefix.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static OPEN_STRING: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r#""[^"]*$"#).expect("valid regex"));

/// A completed call `name(...)` with no nested parentheses.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static COMPLETED_CALL: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"\w+[\t ]*\([^()]*\)").expect("valid regex"));

/// A balanced parenthesis pair with no nested parentheses.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static PAREN_PAIR: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"\([^()]*\)").expect("valid regex"));

/// The call the cursor is inside of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallInfo {
    /// Zero-based index of the argument being typed.
    pub active_parameter: usize,
    /// Name of the function being called.
    pub function: String,
    /// Identifier before `.function`, if any.
    pub qualifier: Option<String>,
}

/// One completion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    /// Whether the candidate comes from a built-in definitions document.
    pub built_in: bool,
    /// Declaration text.
    pub definition: String,
    /// Kind label such as `function` or `variable`.
    pub kind: &'static str,
    /// Name to insert.
    pub name: String,
}

/// A parameter of a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterInfo {
    /// `<param>` documentation, if written.
    pub documentation: Option<String>,
    /// Parameter name.
    pub name: String,
}

/// A callable declaration matching a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    /// Declaration text.
    pub definition: String,
    /// `<summary>` documentation, if written.
    pub documentation: Option<String>,
    /// Parameters in order.
    pub parameters: Vec<ParameterInfo>,
    /// Owning class, if any.
    pub parent: Option<String>,
}

/// Signature candidates for the call at a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureHelp {
    /// Zero-based index of the argument being typed.
    pub active_parameter: usize,
    /// Name of the function being called.
    pub function: String,
    /// Every matching declaration, document symbols first.
    pub signatures: Vec<Signature>,
}

/// Blocks enclosing a position, innermost first.
#[derive(Debug)]
struct Scopes {
    /// Class that owns the position, directly or through a method.
    class: Option<String>,
    /// Innermost block: a procedure, property or class.
    innermost: Option<String>,
}

impl Scopes {
    /// Resolve the blocks around `position`.
    fn at(document: &Document, position: Position) -> Self {
        let blocks = resolve_enclosing_blocks(document, position);
        return Self {
            class: blocks.class,
            innermost: blocks.innermost,
        };
    }

    /// Whether `parent` names one of the enclosing blocks.
    fn contains(&self, parent: &str) -> bool {
        return [&self.innermost, &self.class]
            .into_iter()
            .flatten()
            .any(|scope| return scope.eq_ignore_ascii_case(parent));
    }

    /// Resolve `Me` to the enclosing class; other qualifiers stay as written.
    fn qualify(&self, qualifier: &str) -> Option<String> {
        if qualifier.eq_ignore_ascii_case("me") {
            return self.class.clone();
        }
        return Some(qualifier.to_string());
    }
}

/// Identify the call the cursor is inside of.
///
/// The line up to the cursor is reduced by deleting string literals
/// (including one left open), completed calls and balanced parentheses. The
/// function is the identifier before the last remaining `(` and the active
/// parameter is the number of commas after it. Calls without parentheses
/// are not recognized.
pub fn call_info(document: &Document, position: Position) -> Option<CallInfo> {
    let prefix = code_before(document, position)?;
    let reduced = reduce_call_prefix(&prefix);
    let open = reduced.rfind('(')?;
    let before = reduced.get(..open)?.trim_end();
    let function = trailing_identifier(before);
    if function.is_empty() {
        return None;
    }

    let rest = before.get(..before.len().saturating_sub(function.len()))?;
    let qualifier = rest
        .strip_suffix('.')
        .map(trailing_identifier)
        .filter(|q| return !q.is_empty())
        .map(str::to_string);
    let active_parameter = reduced.get(open..)?.matches(',').count();

    return Some(CallInfo {
        active_parameter,
        function: function.to_string(),
        qualifier,
    });
}

/// Completion candidates at `position`.
///
/// Empty outside code regions, on comment lines, inside an open string and
/// while a declaration name is being typed. After `object.` the members of
/// the class named `object` are offered, or every top-level symbol when no
/// such class exists. Otherwise top-level symbols and those of the enclosing
/// blocks are offered. Candidates are unique by name (ignoring case) and
/// kind, document symbols before built-ins.
pub fn completions(
    index: &SymbolIndex,
    document: &Document,
    position: Position,
) -> Vec<Completion> {
    let Some(prefix) = code_before(document, position) else {
        return Vec::new();
    };
    if prefix.matches('"').count() % 2 == 1 {
        return Vec::new();
    }
    let statement = grammar::split_statements(&prefix).last().copied().unwrap_or_default();
    if DECLARING.is_match(statement) {
        return Vec::new();
    }

    let path = document.path();
    let scopes = Scopes::at(document, position);
    let object = MEMBER_ACCESS
        .captures(statement)
        .and_then(|c| return c.get(1))
        .map(|m| return m.as_str());

    if let Some(object) = object {
        let class = scopes
            .qualify(object)
            .and_then(|name| return class_named(index, path, &name));
        if let Some(class) = class {
            let members = index
                .symbols_for(path)
                .filter(|s| return s.has_parent(Some(class.as_str())));
            return unique_completions(members);
        }
        return unique_completions(index.symbols_for(path).filter(|s| return s.is_top_level()));
    }

    let visible = index.symbols_for(path).filter(|s| {
        return match s.parent.as_deref() {
            None => true,
            Some(parent) => scopes.contains(parent),
        };
    });
    return unique_completions(visible);
}

/// A `''' <summary>` skeleton for the line after `line`, indented like it.
///
/// When that line declares a procedure, one `<param>` line per parameter
/// follows the summary. `None` only when `line` is the last line.
pub fn documentation_snippet(document: &Document, line: usize) -> Option<String> {
    let next = line.checked_add(1)?;
    let indent: String = document
        .line(next)?
        .chars()
        .take_while(|c| return *c == ' ' || *c == '\t')
        .collect();
    let mut snippet = format!("{indent}''' <summary></summary>");

    let regions = scan_regions(document);
    let declaration = code_segments(document, &regions, next).first().and_then(|code| {
        let statement = grammar::split_statements(grammar::strip_comment(code)).first().copied()?;
        return grammar::procedure(statement);
    });
    if let Some(SymbolKind::Function { parameters, .. }) = declaration.map(|d| return d.kind) {
        for parameter in parameters {
            snippet.push_str(&format!("\n{indent}''' <param name=\"{parameter}\"></param>"));
        }
    }
    return Some(snippet);
}

/// Function signatures for the call at `position`.
///
/// Matching follows lookup rules: a qualified call matches members of the
/// qualifier (`Me` is the enclosing class), an unqualified call matches
/// top-level functions, then methods of the enclosing class.
pub fn signatures(
    index: &SymbolIndex,
    document: &Document,
    position: Position,
) -> Option<SignatureHelp> {
    let call = call_info(document, position)?;
    let path = document.path();
    let scopes = Scopes::at(document, position);

    let signatures = match &call.qualifier {
        Some(qualifier) => {
            let parent = scopes.qualify(qualifier)?;
            function_signatures(index, path, &call.function, Some(parent.as_str()))
        },
        None => {
            let global = function_signatures(index, path, &call.function, None);
            match (&scopes.class, global.is_empty()) {
                (Some(class), true) => {
                    function_signatures(index, path, &call.function, Some(class.as_str()))
                },
                _ => global,
            }
        },
    };

    return Some(SignatureHelp {
        active_parameter: call.active_parameter,
        function: call.function,
        signatures,
    });
}

/// The declaration the identifier under the cursor refers to.
///
/// With a qualifier the symbol must be a member of it (`Me` means the
/// enclosing class); when the qualifier is not a known class, any class
/// member of that name is accepted. Without one the enclosing blocks are
/// searched innermost first, then global scope.
pub fn symbol_at_position<'a>(
    index: &'a SymbolIndex,
    document: &Document,
    position: Position,
) -> Option<&'a Symbol> {
    let word = word_at(document, position)?;
    let path = document.path();
    let scopes = Scopes::at(document, position);

    if let Some(qualifier) = resolve_qualifier(document, word.range.start) {
        let parent = scopes.qualify(&qualifier)?;
        return index.lookup(path, &word.text, Some(parent.as_str())).or_else(|| {
            return index.symbols_for(path).find(|s| {
                return s.is_named(&word.text)
                    && s.parent
                        .as_deref()
                        .is_some_and(|p| return class_named(index, path, p).is_some());
            });
        });
    }

    for scope in [&scopes.innermost, &scopes.class].into_iter().flatten() {
        if let Some(found) = index.lookup(path, &word.text, Some(scope.as_str())) {
            return Some(found);
        }
    }
    return index.lookup(path, &word.text, None);
}

/// Name of the class called `name` visible from `path`, as declared.
fn class_named(index: &SymbolIndex, path: &Path, name: &str) -> Option<String> {
    return index
        .symbols_for(path)
        .find(|s| return s.kind == SymbolKind::Class && s.is_named(name))
        .map(|s| return s.name.clone());
}

/// The masked code of the cursor's region on its line, up to the cursor.
/// `None` when the cursor is outside every region or on a comment line.
fn code_before(document: &Document, position: Position) -> Option<String> {
    let regions = scan_regions(document);
    let code = code_segment_at(document, &regions, position)?;
    if grammar::is_comment(&code) {
        return None;
    }
    return Some(code.chars().take(position.character).collect());
}

/// Every function named `name` under `parent`, as signatures.
fn function_signatures(
    index: &SymbolIndex,
    path: &Path,
    name: &str,
    parent: Option<&str>,
) -> Vec<Signature> {
    return index
        .symbols_for(path)
        .filter(|s| {
            return matches!(s.kind, SymbolKind::Function { .. })
                && s.is_named(name)
                && s.has_parent(parent);
        })
        .map(signature_of)
        .collect();
}

/// Strip strings, completed calls and balanced parentheses from a line prefix.
fn reduce_call_prefix(prefix: &str) -> String {
    let without_strings = STRING.replace_all(prefix, "");
    let mut code = OPEN_STRING.replace(&without_strings, "").into_owned();
    loop {
        let calls_removed = COMPLETED_CALL.replace_all(&code, "");
        let reduced = PAREN_PAIR.replace_all(&calls_removed, "").into_owned();
        if reduced == code {
            return code;
        }
        code = reduced;
    }
}

/// Signature view of a function symbol.
fn signature_of(symbol: &Symbol) -> Signature {
    let docs = symbol.documentation.as_ref();
    let parameters = symbol
        .parameters()
        .iter()
        .map(|name| {
            return ParameterInfo {
                documentation: docs
                    .and_then(|d| return d.parameter(name))
                    .map(|p| return p.summary.clone()),
                name: name.clone(),
            };
        })
        .collect();
    return Signature {
        definition: symbol.definition.clone(),
        documentation: docs.and_then(|d| return d.summary.clone()),
        parameters,
        parent: symbol.parent.clone(),
    };
}

/// Identifier characters at the end of `text`.
fn trailing_identifier(text: &str) -> &str {
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| return c.is_alphanumeric() || *c == '_')
        .last()
        .map_or(text.len(), |(i, _)| return i);
    return text.get(start..).unwrap_or_default();
}

/// Completions from symbols, first occurrence of each (name, kind) pair.
fn unique_completions<'a>(symbols: impl Iterator<Item = &'a Symbol>) -> Vec<Completion> {
    let mut seen = std::collections::HashSet::new();
    return symbols
        .filter(|s| return seen.insert((s.name.to_lowercase(), s.kind.label())))
        .map(|s| {
            return Completion {
                built_in: s.origin.built_in,
                definition: s.definition.clone(),
                kind: s.kind.label(),
                name: s.name.clone(),
            };
        })
        .collect();
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::Config;
    use crate::document::DocumentSource;
    use crate::testing::Memory;

    const PAGE: &str = "\
<%
' <summary>Adds two numbers</summary>
' <param name=\"a\">left</param>
Function Add(a, b)
  Dim total
  total = a + b
End Function

Class Cart
  Dim items
  Function Count()
    Count = Me.items
  End Function
End Class

Dim cart
Set cart = New Cart
x = Add(1, Len(\"a,b\"),
%>";

    fn setup() -> (SymbolIndex, Document) {
        let source = Memory::new(&[
            ("/site/page.asp", PAGE),
            ("/defs/functions.vbs", "Function Len(s)\nEnd Function\nFunction Add(x)\nEnd Function"),
        ]);
        let config = Config {
            builtin_includes: vec![PathBuf::from("/defs/functions.vbs")],
            ..Config::default()
        };
        let mut index = SymbolIndex::new(config);
        index.initialize(&source);
        let document = source.open(Path::new("/site/page.asp")).unwrap();
        index.rescan(&document, &source);
        return (index, document);
    }

    fn names(completions: &[Completion]) -> Vec<&str> {
        return completions.iter().map(|c| c.name.as_str()).collect();
    }

    #[test]
    fn hover_target_prefers_the_enclosing_scope() {
        let (index, doc) = setup();
        // `total` on line 5 is local to Add.
        let symbol = symbol_at_position(&index, &doc, Position::new(5, 3)).unwrap();
        assert_eq!(symbol.parent.as_deref(), Some("Add"));
        // `Add` on the call line is the document's, not the built-in.
        let symbol = symbol_at_position(&index, &doc, Position::new(17, 5)).unwrap();
        assert!(!symbol.origin.built_in);
    }

    #[test]
    fn me_qualifier_means_the_enclosing_class() {
        let (index, doc) = setup();
        let symbol = symbol_at_position(&index, &doc, Position::new(11, 15)).unwrap();
        assert_eq!(symbol.name, "items");
        assert_eq!(symbol.parent.as_deref(), Some("Cart"));
    }

    #[test]
    fn global_completions_exclude_other_scopes() {
        let (index, doc) = setup();
        let items = completions(&index, &doc, Position::new(17, 0));
        let names = names(&items);
        assert!(names.contains(&"cart"));
        assert!(names.contains(&"Cart"));
        assert!(names.contains(&"Len"));
        assert!(!names.contains(&"total"));
        assert!(!names.contains(&"items"));
        // The document's Add shadows the built-in of the same kind.
        assert_eq!(names.iter().filter(|n| **n == "Add").count(), 1);
        assert!(items.iter().find(|c| c.name == "Add").is_some_and(|c| !c.built_in));
    }

    #[test]
    fn locals_complete_inside_their_function() {
        let (index, doc) = setup();
        let names_inside = completions(&index, &doc, Position::new(5, 2));
        assert!(names(&names_inside).contains(&"total"));
    }

    #[test]
    fn completions_are_suppressed_where_they_make_no_sense() {
        let (index, doc) = setup();
        assert!(completions(&index, &doc, Position::new(1, 5)).is_empty(), "comment line");
        assert!(completions(&index, &doc, Position::new(4, 9)).is_empty(), "typing a Dim name");
        assert!(completions(&index, &doc, Position::new(17, 17)).is_empty(), "inside a string");

        let outside = Document::new(
            "/site/plain.asp",
            "<p>hello</p>",
            crate::document::DocumentKind::Markup,
        );
        assert!(completions(&index, &outside, Position::new(0, 3)).is_empty());
    }

    #[test]
    fn member_access_offers_class_members() {
        let source = Memory::new(&[(
            "/site/m.asp",
            "<%\nClass Cart\n  Dim items\n  Sub Clear()\n  End Sub\nEnd Class\nx = Cart.\ny = nothing.\n%>",
        )]);
        let mut index = SymbolIndex::new(Config::default());
        let doc = source.open(Path::new("/site/m.asp")).unwrap();
        index.rescan(&doc, &source);

        let members = completions(&index, &doc, Position::new(6, 9));
        assert_eq!(names(&members), vec!["items", "Clear"]);
        let fallback = completions(&index, &doc, Position::new(7, 12));
        assert_eq!(names(&fallback), vec!["Cart"]);
    }

    #[test]
    fn call_info_skips_strings_and_completed_calls() {
        let (_, doc) = setup();
        let call = call_info(&doc, Position::new(17, 22)).unwrap();
        assert_eq!(call.function, "Add");
        assert_eq!(call.active_parameter, 2);
        assert_eq!(call.qualifier, None);
    }

    #[test]
    fn call_info_reports_the_qualifier() {
        let doc = Document::new("a.vbs", "rs.Open(sql, ", crate::document::DocumentKind::Script);
        let call = call_info(&doc, Position::new(0, 13)).unwrap();
        assert_eq!(call.function, "Open");
        assert_eq!(call.qualifier.as_deref(), Some("rs"));
        assert_eq!(call.active_parameter, 1);
        assert_eq!(call_info(&doc, Position::new(0, 2)), None);
    }

    #[test]
    fn signatures_carry_parameter_docs() {
        let (index, doc) = setup();
        let help = signatures(&index, &doc, Position::new(17, 22)).unwrap();
        // The document's Add comes first, the built-in one after it.
        assert_eq!(help.signatures.len(), 2);
        assert!(help.signatures[1].parameters.len() == 1);
        let signature = &help.signatures[0];
        assert_eq!(signature.documentation.as_deref(), Some("Adds two numbers"));
        assert_eq!(signature.parameters[0].documentation.as_deref(), Some("left"));
        assert_eq!(signature.parameters[1].documentation, None);
    }

    #[test]
    fn snippet_lists_parameters_of_the_next_line() {
        let doc = Document::new(
            "a.vbs",
            "\n  Function Mul(ByVal x, y)\nEnd Function",
            crate::document::DocumentKind::Script,
        );
        assert_eq!(
            documentation_snippet(&doc, 0).as_deref(),
            Some("  ''' <summary></summary>\n  ''' <param name=\"x\"></param>\n  ''' <param name=\"y\"></param>")
        );
        assert_eq!(documentation_snippet(&doc, 1).as_deref(), Some("''' <summary></summary>"));
        assert_eq!(documentation_snippet(&doc, 2), None);
    }

    #[test]
    fn me_resolves_to_the_class_around_the_method() {
        let source = Memory::new(&[(
            "/site/two.asp",
            "<%\nClass A\n  Dim alpha\n  Sub Class_Initialize()\n  End Sub\nEnd Class\n\
             Class B\n  Dim beta\n  Sub Class_Initialize()\n    x = Me.\n    Me.Reset(\n  End Sub\n\
             \x20 Sub Reset(all)\n  End Sub\nEnd Class\n%>",
        )]);
        let mut index = SymbolIndex::new(Config::default());
        let doc = source.open(Path::new("/site/two.asp")).unwrap();
        index.rescan(&doc, &source);

        let members = completions(&index, &doc, Position::new(9, 11));
        assert_eq!(names(&members), vec!["beta", "Class_Initialize", "Reset"]);
        let help = signatures(&index, &doc, Position::new(10, 13)).unwrap();
        assert_eq!(help.signatures.len(), 1);
        assert_eq!(help.signatures[0].parent.as_deref(), Some("B"));
    }

    #[test]
    fn parameters_resolve_on_their_declaration_line() {
        let source = Memory::new(&[(
            "/site/p.vbs",
            "Class Cart\n  Public Sub Add(item)\n  End Sub\nEnd Class",
        )]);

        let config = Config {
            show_parameter_symbols: true,
            ..Config::default()
        };
        let mut index = SymbolIndex::new(config);
        let doc = source.open(Path::new("/site/p.vbs")).unwrap();
        index.rescan(&doc, &source);

        let symbol = symbol_at_position(&index, &doc, Position::new(1, 18)).unwrap();
        assert_eq!(symbol.kind, SymbolKind::Parameter);
        assert_eq!(symbol.parent.as_deref(), Some("Add"));
    }

    #[test]
    fn prefix_reduction() {
        assert_eq!(reduce_call_prefix("a(b(c), \"x(\", d(e, f("), "a(, , d(e, f(");
        assert_eq!(trailing_identifier("x = obj.Method"), "Method");
        assert_eq!(trailing_identifier("x = "), "");
    }
}
