//! Recognizer set: stateless matchers over one statement of masked code.
//!
//! Each recognizer takes a single statement (comment already stripped, no
//! `:` separators) and returns what it found, or `None`. The builder decides
//! priority and scoping; nothing here keeps state between calls.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Accessor, Procedure, Storage, SymbolKind};

/// `[Public|Private] Class Name`.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static CLASS: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"(?i)^[\t ]*((?:(?:Public|Private)[\t ]+)?Class[\t ]+(\[?[a-z]\w*\]?))")
        .expect("valid regex");
});

/// `[Public|Private] [Default] Function|Sub Name[(params)]`.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static PROCEDURE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(
        r"(?i)^[\t ]*((?:(?:Public|Private)[\t ]+)?(?:Default[\t ]+)?(Function|Sub)[\t ]+(\[?[a-z]\w*\]?)[\t ]*(?:\((.*)\))?)",
    )
    .expect("valid regex");
});

/// `[Public [Default]|Private] Property Get|Let|Set Name[(params)]`.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(
        r"(?i)^[\t ]*((?:Public[\t ]+(?:Default[\t ]+)?|Private[\t ]+)?Property[\t ]+(Get|Let|Set)[\t ]+(\[?[a-z]\w*\]?)(?:[\t ]*\(.*\))?)",
    )
    .expect("valid regex");
});

/// Keyword followed by a comma-separated name list, each name with an
/// optional array suffix.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static VARIABLES: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(
        r"(?i)^[\t ]*(Dim|Set|Const|Private[\t ]+Const|Public[\t ]+Const|Private|Public)[\t ]+([a-z0-9_]+(?:[\t ]*\([\d\t ,]*\))?(?:[\t ]*,[\t ]*[a-z0-9_]+(?:[\t ]*\([\d\t ,]*\))?)*)",
    )
    .expect("valid regex");
});

/// One name of a variable list with its optional array suffix.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static VARIABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"(?i)([a-z0-9_]+)(?:[\t ]*(\([\d\t ,]*\)))?").expect("valid regex");
});

/// `End Sub|Class|Function|Property`.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"(?i)^[\t ]*End[\t ]+(Sub|Class|Function|Property)\b").expect("valid regex");
});

/// Words that follow a declaration keyword without being a variable name.
const RESERVED_AFTER_KEYWORD: &[&str] = &["class", "default", "function", "property", "sub"];

/// A scope-opening declaration: class, procedure or property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Declaration text from the first keyword to the end of the signature.
    pub definition: String,
    /// Kind with its kind-specific data.
    pub kind: SymbolKind,
    /// Declared name without brackets.
    pub name: String,
}

/// One name introduced by a variable statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableName {
    /// Name without array suffix.
    pub name: String,
    /// Storage classification.
    pub storage: Storage,
}

/// A `Dim`/`Const`/`Public`/`Private`/`Set` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableStatement {
    /// Statement text, trimmed.
    pub definition: String,
    /// Whether the keyword was `Set`, which only declares unseen names.
    pub is_set: bool,
    /// Names in declaration order.
    pub names: Vec<VariableName>,
}

/// Which block an `End ...` statement closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEnd {
    /// `End Class`.
    Class,
    /// `End Function`.
    Function,
    /// `End Property`.
    Property,
    /// `End Sub`.
    Sub,
}

/// Match a block terminator.
pub fn block_end(statement: &str) -> Option<BlockEnd> {
    let caps = BLOCK_END.captures(statement)?;
    let word = caps.get(1)?.as_str().to_ascii_lowercase();
    return match word.as_str() {
        "class" => Some(BlockEnd::Class),
        "function" => Some(BlockEnd::Function),
        "property" => Some(BlockEnd::Property),
        "sub" => Some(BlockEnd::Sub),
        _ => None,
    };
}

/// Match a `Class` declaration.
pub fn class(statement: &str) -> Option<Declaration> {
    let caps = CLASS.captures(statement)?;
    return Some(Declaration {
        definition: caps.get(1)?.as_str().trim().to_string(),
        kind: SymbolKind::Class,
        name: strip_brackets(caps.get(2)?.as_str()).to_string(),
    });
}

/// Run the scope-opening recognizers in priority order: class, procedure, property.
pub fn declaration(statement: &str) -> Option<Declaration> {
    return class(statement)
        .or_else(|| return procedure(statement))
        .or_else(|| return property(statement));
}

/// Whether a raw line is a comment line: first non-blank character is `'`.
pub fn is_comment(line: &str) -> bool {
    return line.trim_start().starts_with('\'');
}

/// Match a `Function` or `Sub` declaration. `Sub Class_Initialize` and
/// `Sub Class_Terminate` are constructors.
pub fn procedure(statement: &str) -> Option<Declaration> {
    let caps = PROCEDURE.captures(statement)?;
    let name = strip_brackets(caps.get(3)?.as_str()).to_string();
    let is_sub = caps.get(2)?.as_str().eq_ignore_ascii_case("sub");
    let procedure = match is_sub {
        true if is_constructor_name(&name) => Procedure::Constructor,
        true => Procedure::Sub,
        false => Procedure::Function,
    };
    let parameters = caps.get(4).map(|m| return split_parameters(m.as_str())).unwrap_or_default();

    return Some(Declaration {
        definition: caps.get(1)?.as_str().trim().to_string(),
        kind: SymbolKind::Function { parameters, procedure },
        name,
    });
}

/// Match a `Property Get|Let|Set` declaration.
pub fn property(statement: &str) -> Option<Declaration> {
    let caps = PROPERTY.captures(statement)?;
    let accessor = match caps.get(2)?.as_str().to_ascii_lowercase().as_str() {
        "get" => Accessor::Get,
        "let" => Accessor::Let,
        _ => Accessor::Set,
    };
    return Some(Declaration {
        definition: caps.get(1)?.as_str().trim().to_string(),
        kind: SymbolKind::Property { accessor },
        name: strip_brackets(caps.get(3)?.as_str()).to_string(),
    });
}

/// Split a line into `:`-separated statements. Separators inside string
/// literals do not count.
pub fn split_statements(line: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            ':' if !in_string => {
                statements.push(line.get(start..index).unwrap_or(""));
                start = index.saturating_add(1);
            },
            _ => {},
        }
    }
    statements.push(line.get(start..).unwrap_or(""));
    return statements;
}

/// Split a raw parameter list into names, dropping `ByVal`/`ByRef`, array
/// parentheses and brackets.
pub fn split_parameters(raw: &str) -> Vec<String> {
    return raw
        .split(',')
        .filter_map(|part| {
            let mut name = part.trim();
            for modifier in ["byval", "byref"] {
                let has_modifier = name
                    .get(..modifier.len())
                    .is_some_and(|head| return head.eq_ignore_ascii_case(modifier))
                    && name
                        .get(modifier.len()..)
                        .is_some_and(|rest| return rest.starts_with([' ', '\t']));
                if has_modifier {
                    name = name.get(modifier.len()..).unwrap_or("").trim_start();
                }
            }
            let name = name.split('(').next().unwrap_or("").trim();
            let name = strip_brackets(name);
            if name.is_empty() {
                return None;
            }
            return Some(name.to_string());
        })
        .collect();
}

/// Remove everything from the first `'` outside a string literal.
pub fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '\'' if !in_string => return line.get(..index).unwrap_or(line),
            _ => {},
        }
    }
    return line;
}

/// Remove the brackets of an escaped identifier such as `[my name]`.
pub fn strip_brackets(name: &str) -> &str {
    return name.trim_start_matches('[').trim_end_matches(']');
}

/// Match a variable statement. Keywords followed by `Class`, `Default`,
/// `Function`, `Property` or `Sub` are not variable statements. A `Set`
/// statement only counts when it assigns a plain name (`Set x = ...`), not a
/// member (`Set x.y = ...`).
pub fn variables(statement: &str) -> Option<VariableStatement> {
    let caps = VARIABLES.captures(statement)?;
    let keyword = caps.get(1)?.as_str().to_ascii_lowercase();
    let list = caps.get(2)?;

    let first_word: String = list
        .as_str()
        .chars()
        .take_while(|c| return c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if RESERVED_AFTER_KEYWORD.iter().any(|r| return first_word.eq_ignore_ascii_case(r)) {
        return None;
    }

    let is_set = keyword == "set";
    if is_set {
        let rest = statement.get(list.end()..).unwrap_or("").trim_start();
        if !rest.starts_with('=') {
            return None;
        }
    }

    let is_const = keyword.ends_with("const");
    let names = VARIABLE_NAME
        .captures_iter(list.as_str())
        .filter_map(|c| {
            let name = c.get(1)?.as_str().to_string();
            let storage = match (is_const, is_set, c.get(2).is_some()) {
                (true, _, _) => Storage::Constant,
                (_, true, _) => Storage::Object,
                (_, _, true) => Storage::Array,
                _ => Storage::Variable,
            };
            return Some(VariableName { name, storage });
        })
        .collect();

    return Some(VariableStatement {
        definition: statement.trim().to_string(),
        is_set,
        names,
    });
}

/// Whether a `Sub` name is one of the class lifecycle hooks.
fn is_constructor_name(name: &str) -> bool {
    return name.eq_ignore_ascii_case("class_initialize")
        || name.eq_ignore_ascii_case("class_terminate");
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn class_with_visibility_and_brackets() {
        let decl = class("  Public Class [Customer]").unwrap();
        assert_eq!(decl.name, "Customer");
        assert_eq!(decl.definition, "Public Class [Customer]");
        assert!(class("Class_Initialize").is_none());
    }

    #[test]
    fn procedure_names_exclude_parameter_list() {
        let decl = procedure("Private Function Add(ByVal a, ByRef b())").unwrap();
        assert_eq!(decl.name, "Add");
        assert_eq!(decl.definition, "Private Function Add(ByVal a, ByRef b())");
        assert_eq!(
            decl.kind,
            SymbolKind::Function {
                parameters: vec!["a".to_string(), "b".to_string()],
                procedure: Procedure::Function,
            }
        );
    }

    #[test]
    fn lifecycle_subs_are_constructors() {
        let decl = procedure("sub class_initialize()").unwrap();
        assert_eq!(decl.kind.label(), "constructor");
        let plain = procedure("Public Default Sub Run").unwrap();
        assert_eq!(plain.kind.label(), "sub");
        assert!(
            plain.kind
                == SymbolKind::Function {
                    parameters: Vec::new(),
                    procedure: Procedure::Sub,
                }
        );
    }

    #[test]
    fn block_terminators_do_not_open_procedures() {
        assert!(procedure("End Function").is_none());
        assert!(procedure("Exit Sub").is_none());
        assert_eq!(block_end("  end function"), Some(BlockEnd::Function));
        assert_eq!(block_end("End Property"), Some(BlockEnd::Property));
        assert_eq!(block_end("End If"), None);
    }

    #[test]
    fn property_accessors() {
        let decl = property("Public Default Property Get Item(index)").unwrap();
        assert_eq!(decl.name, "Item");
        assert_eq!(decl.kind, SymbolKind::Property { accessor: Accessor::Get });
        let decl = property("Property Set Connection(value)").unwrap();
        assert_eq!(decl.kind, SymbolKind::Property { accessor: Accessor::Set });
    }

    #[test]
    fn declaration_priority_prefers_procedures_over_variables() {
        let decl = declaration("Public Sub Go()").unwrap();
        assert_eq!(decl.name, "Go");
        assert!(variables("Public Sub Go()").is_none());
        assert!(variables("Private Property Get X").is_none());
    }

    #[test]
    fn variable_lists_classify_storage() {
        let stmt = variables("Dim a, items(10), grid(2, 3), b").unwrap();
        let names: Vec<(&str, Storage)> =
            stmt.names.iter().map(|n| (n.name.as_str(), n.storage)).collect();
        assert_eq!(
            names,
            vec![
                ("a", Storage::Variable),
                ("items", Storage::Array),
                ("grid", Storage::Array),
                ("b", Storage::Variable),
            ]
        );
        assert!(!stmt.is_set);
    }

    #[test]
    fn constants_and_objects() {
        let stmt = variables("Private Const MAX_ROWS = 50").unwrap();
        assert_eq!(
            stmt.names,
            vec![VariableName {
                name: "MAX_ROWS".to_string(),
                storage: Storage::Constant,
            }]
        );
        let stmt = variables("Set conn = Server.CreateObject(\"ADODB.Connection\")").unwrap();
        assert!(stmt.is_set);
        assert_eq!(
            stmt.names,
            vec![VariableName {
                name: "conn".to_string(),
                storage: Storage::Object,
            }]
        );

    }

    #[test]
    fn keywords_are_not_variable_names_but_prefixes_are() {
        assert!(variables("Private Function Foo").is_none());
        assert!(variables("Public Default Function Foo").is_none());
        let stmt = variables("Dim Subtotal").unwrap();
        assert_eq!(stmt.names.first().map(|n| n.name.as_str()), Some("Subtotal"));
    }

    #[test]
    fn member_assignment_is_not_a_declaration() {
        assert!(variables("Set rs.ActiveConnection = conn").is_none());
        assert!(variables("Setting = 1").is_none());
    }

    #[test]
    fn comments_respect_string_literals() {
        assert_eq!(strip_comment("x = \"it's\" ' note"), "x = \"it's\" ");
        assert_eq!(strip_comment("Dim a"), "Dim a");
        assert!(is_comment("   ' Dim a"));
        assert!(!is_comment("Dim a ' trailing"));
    }

    #[test]
    fn statements_split_outside_strings() {
        assert_eq!(split_statements("Dim a : Set a = x"), vec!["Dim a ", " Set a = x"]);
        assert_eq!(split_statements("s = \"a:b\""), vec!["s = \"a:b\""]);
    }
}
