//! Documentation comments directly above a declaration.
//!
//! A block is the run of `'` comment lines immediately preceding the
//! declaration line. Decorative separators (`'*****`, `' ----`) are dropped.
//! The remaining text may carry `<summary>` and `<param name="...">` tags.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::Document;
use crate::grammar::is_comment;
use crate::types::{Documentation, ParamDoc};

/// First `<summary>` tag; the closing tag is optional.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"(?i)<summary>\s*([^<]*)(?:</summary>)?").expect("valid regex");
});

/// Every `<param name="x">` tag; the closing tag is optional.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static PARAM: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"(?i)<param name=["'](\w+)["'][^>]*>\s*([^<]*)(?:</param>)?"#)
        .expect("valid regex");
});

/// Lines made only of comment markers, asterisks, dashes and whitespace.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"^['*\s-]+$").expect("valid regex"));

/// Collect the documentation block above `line`.
///
/// Returns `None` when `line` is itself a comment or when no comment lines
/// precede it. A block made only of separators yields an empty `raw`.
pub fn extract_above(document: &Document, line: usize) -> Option<Documentation> {
    if document.line(line).is_none_or(is_comment) {
        return None;
    }

    let mut collected: Vec<&str> = Vec::new();
    let mut found_comment = false;
    let mut cursor = line;
    while let Some(above) = cursor.checked_sub(1) {
        let Some(text) = document.line(above) else {
            break;
        };
        if !is_comment(text) {
            break;
        }
        found_comment = true;
        if !SEPARATOR.is_match(text) {
            collected.push(strip_marker(text));
        }
        cursor = above;
    }
    if !found_comment {
        return None;
    }

    collected.reverse();
    let raw: String = collected.iter().map(|l| return format!("{l}\n")).collect();
    return Some(parse(&raw));
}

/// Parse the tags out of an already-collected comment text.
pub fn parse(raw: &str) -> Documentation {
    let summary = SUMMARY
        .captures(raw)
        .and_then(|c| return c.get(1))
        .map(|m| return m.as_str().trim().to_string());
    let parameters = PARAM
        .captures_iter(raw)
        .filter_map(|c| {
            return Some(ParamDoc {
                name: c.get(1)?.as_str().to_string(),
                summary: c.get(2)?.as_str().trim().to_string(),
            });
        })
        .collect();

    return Documentation {
        parameters,
        raw: raw.to_string(),
        summary,
    };
}

/// Drop leading whitespace and every leading `'`.
fn strip_marker(line: &str) -> &str {
    return line.trim_start().trim_start_matches('\'');
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;
    use crate::document::DocumentKind;

    fn script(text: &str) -> Document {
        return Document::new("lib.vbs", text, DocumentKind::Script);
    }

    #[test]
    fn summary_and_params_round_trip() {
        let doc =
            script("' <summary>Does X</summary>\n' <param name=\"n\">count</param>\nFunction F(n)");

        let docs = extract_above(&doc, 2).unwrap();
        assert_eq!(docs.summary.as_deref(), Some("Does X"));
        assert_eq!(
            docs.parameters,
            vec![ParamDoc {
                name: "n".to_string(),
                summary: "count".to_string(),
            }]
        );
    }

    #[test]
    fn separators_are_dropped_and_order_is_kept() {
        let doc = script("x = 1\n'*********\n''' first\n  ' second\n' -----\nSub S");
        let docs = extract_above(&doc, 5).unwrap();
        assert_eq!(docs.raw, " first\n second\n");
        assert_eq!(docs.summary, None);
    }

    #[test]
    fn no_comment_lines_means_no_block() {
        let doc = script("Dim a\nFunction F()");
        assert_eq!(extract_above(&doc, 1), None);
        assert_eq!(extract_above(&doc, 0), None);
    }

    #[test]
    fn comment_line_has_no_documentation_of_its_own() {
        let doc = script("' above\n' Function F()");
        assert_eq!(extract_above(&doc, 1), None);
    }

    #[test]
    fn blank_line_breaks_the_block() {
        let doc = script("' unrelated\n\nFunction F()");
        assert_eq!(extract_above(&doc, 2), None);
    }

    #[test]
    fn unclosed_tags_and_single_quotes() {
        let docs = parse("<summary> Opens the db\n<param name='dsn'> connection string\n");
        assert_eq!(docs.summary.as_deref(), Some("Opens the db"));
        assert_eq!(docs.parameter("DSN").map(|p| p.summary.as_str()), Some("connection string"));
    }
}
