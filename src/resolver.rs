//! Position resolver: what a cursor position means lexically.
//!
//! Answers three questions about a position: which identifier is under it,
//! which identifier qualifies it through a `.`, and which blocks enclose it.

use crate::document::Document;
use crate::grammar::{self, BlockEnd};
use crate::scanner::{code_segment_at, code_segments, scan_regions};
use crate::types::{CodeRegion, Position, Range};

/// Blocks lexically enclosing a position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnclosingBlocks {
    /// Class enclosing the position, directly or through one of its methods.
    pub class: Option<String>,
    /// Innermost block: a procedure, property or class.
    pub innermost: Option<String>,
}

/// An identifier and where it sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// Span of the identifier on its line.
    pub range: Range,
    /// Identifier text as written.
    pub text: String,
}

/// Whether `ch` can be part of an identifier.
const fn is_identifier_char(ch: char) -> bool {
    return ch.is_ascii_alphanumeric() || ch == '_';
}

/// Column where the identifier ending at `column` starts.
fn identifier_start(chars: &[char], column: usize) -> usize {
    let mut start = column.min(chars.len());
    while let Some(previous) = start.checked_sub(1) {
        if !chars.get(previous).copied().is_some_and(is_identifier_char) {
            break;
        }
        start = previous;
    }
    return start;
}

/// Name of the block that lexically encloses `position`.
///
/// Scans upward from the line above `position`, skipping blank lines,
/// comment lines and markup. Each `End Function`/`End Sub`/`End Property`
/// pairs with the next procedure or property declaration found above it.
/// The first unpaired procedure or property declaration wins, then the
/// first `Class` declaration. Meeting `End Class` first means the position
/// is at global scope. A cursor inside the parameter list of a declaration
/// on its own line is inside that declaration.
pub fn resolve_enclosing_scope(document: &Document, position: Position) -> Option<String> {
    return resolve_enclosing_blocks(document, position).innermost;
}

/// The innermost enclosing block and the class that owns it.
///
/// Same upward scan as [`resolve_enclosing_scope`], continued past the
/// innermost procedure until a `Class` line (its owner) or an `End Class`
/// line (no owner) is met.
pub fn resolve_enclosing_blocks(document: &Document, position: Position) -> EnclosingBlocks {
    let regions = scan_regions(document);
    let mut blocks = EnclosingBlocks {
        class: None,
        innermost: declaration_at_cursor(document, &regions, position),
    };
    let mut pending_ends = 0_usize;

    for line in (0..position.line).rev() {
        for code in code_segments(document, &regions, line).into_iter().rev() {
            if grammar::is_comment(&code) {
                continue;
            }
            let statements = grammar::split_statements(grammar::strip_comment(&code));
            for statement in statements.into_iter().rev() {
                match grammar::block_end(statement) {
                    Some(BlockEnd::Class) => return blocks,
                    Some(BlockEnd::Function | BlockEnd::Property | BlockEnd::Sub) => {
                        if blocks.innermost.is_none() {
                            pending_ends = pending_ends.saturating_add(1);
                        }
                        continue;
                    },
                    None => {},
                }

                if blocks.innermost.is_none()
                    && let Some(declaration) = procedure_or_property(statement)
                {
                    if pending_ends == 0 {
                        blocks.innermost = Some(declaration.name);
                    } else {
                        pending_ends = pending_ends.saturating_sub(1);
                    }
                    continue;
                }

                if let Some(class) = grammar::class(statement) {
                    blocks.innermost.get_or_insert_with(|| return class.name.clone());
                    blocks.class = Some(class.name);
                    return blocks;
                }
            }
        }
    }
    return blocks;
}

/// Name of the procedure or property whose parameter list is still open at
/// `position` on the declaration's own line.
fn declaration_at_cursor(
    document: &Document,
    regions: &[CodeRegion],
    position: Position,
) -> Option<String> {
    let code = code_segment_at(document, regions, position)?;
    let prefix: String = code.chars().take(position.character).collect();
    let statement = grammar::split_statements(grammar::strip_comment(&prefix)).last().copied()?;
    let declaration = procedure_or_property(statement)?;
    if statement.matches('(').count() <= statement.matches(')').count() {
        return None;
    }
    return Some(declaration.name);
}

/// Match a procedure, then a property declaration.
fn procedure_or_property(statement: &str) -> Option<grammar::Declaration> {
    return grammar::procedure(statement).or_else(|| return grammar::property(statement));
}

/// The identifier directly before a `.` that directly precedes the token at
/// `position`. `obj.|` and `obj.Na|me` both resolve to `obj`.
///
/// Returns `None` at column 0, when no `.` is adjacent to the token start,
/// or when nothing but the `.` precedes it.
pub fn resolve_qualifier(document: &Document, position: Position) -> Option<String> {
    let chars: Vec<char> = document.line(position.line)?.chars().collect();
    let token_start = identifier_start(&chars, position.character);
    let dot = token_start.checked_sub(1)?;
    if chars.get(dot) != Some(&'.') {
        return None;
    }
    let qualifier_start = identifier_start(&chars, dot);
    let qualifier: String = chars.get(qualifier_start..dot)?.iter().collect();
    if qualifier.is_empty() {
        return None;
    }
    return Some(qualifier);
}

/// The identifier containing `position`, or ending right at it.
pub fn word_at(document: &Document, position: Position) -> Option<Word> {
    let chars: Vec<char> = document.line(position.line)?.chars().collect();
    let start = identifier_start(&chars, position.character);
    let mut end = position.character.min(chars.len());
    while chars.get(end).copied().is_some_and(is_identifier_char) {
        end = end.saturating_add(1);
    }
    if start == end {
        return None;
    }
    let text: String = chars.get(start..end)?.iter().collect();
    return Some(Word {
        range: Range::new(Position::new(position.line, start), Position::new(position.line, end)),
        text,
    });
}
