//! Region scanner: locates `<% ... %>` code islands inside template text.

use std::sync::LazyLock;

use regex::Regex;

use crate::document::{Document, DocumentKind};
use crate::types::{CodeRegion, Position, Range};

/// Open markers (`<%@` directive, `<%=` output, plain `<%`) and the close marker.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| return Regex::new(r"<%@|<%=|<%|%>").expect("valid regex"));

/// Find the code regions of a document.
///
/// Delimiters are paired strictly by position: occurrence `2i` opens region
/// `i` and occurrence `2i + 1` closes it, whatever their spelling. A trailing
/// unmatched occurrence is dropped. Nested or malformed delimiters therefore
/// give a best-effort region set.
///
/// Pure script documents are one region spanning the whole text; documents
/// of kind [`DocumentKind::Other`] have none.
pub fn scan_regions(document: &Document) -> Vec<CodeRegion> {
    return match document.kind() {
        DocumentKind::Markup => pair_delimiters(&find_delimiters(document)),
        DocumentKind::Other => Vec::new(),
        DocumentKind::Script => {
            let start = Position::new(0, 0);
            let end = document.end_position();
            vec![CodeRegion {
                close_delimiter: Range::new(end, end),
                code: Range::new(start, end),
                open_delimiter: Range::new(start, start),
            }]
        },
    };
}

/// Ranges of every delimiter occurrence, left to right.
fn find_delimiters(document: &Document) -> Vec<Range> {
    return DELIMITER
        .find_iter(document.text())
        .map(|m| return Range::new(document.position_at(m.start()), document.position_at(m.end())))
        .collect();
}

/// Pair consecutive delimiter occurrences into regions.
fn pair_delimiters(delimiters: &[Range]) -> Vec<CodeRegion> {
    return delimiters
        .chunks_exact(2)
        .filter_map(|pair| {
            let (open, close) = (pair.first()?, pair.get(1)?);
            return Some(CodeRegion {
                close_delimiter: *close,
                code: Range::new(open.end, close.start),
                open_delimiter: *open,
            });
        })
        .collect();
}

/// Whether a cursor position lies inside any region's code range.
pub fn is_inside(regions: &[CodeRegion], position: Position) -> bool {
    return regions.iter().any(|r| return r.code.contains(position));
}

/// Code ranges of the regions lying entirely inside `range`.
pub fn regions_inside(regions: &[CodeRegion], range: Range) -> Vec<Range> {
    return regions
        .iter()
        .filter(|r| return range.contains_range(&r.code))
        .map(|r| return r.code)
        .collect();
}

/// Code ranges of the regions touching `range`. Regions are ordered, so the
/// search starts at the first region that has not ended before `range`.
pub fn regions_overlapping(regions: &[CodeRegion], range: Range) -> Vec<Range> {
    let first = regions.partition_point(|r| return r.code.end < range.start);
    return regions
        .get(first..)
        .unwrap_or_default()
        .iter()
        .take_while(|r| return r.code.start <= range.end)
        .filter(|r| return r.code.overlaps(&range))
        .map(|r| return r.code)
        .collect();
}

/// Replace every character of line `line_index` that is not inside one of
/// `code` with a space. Column offsets are preserved: the result has exactly
/// as many characters as `text`.
pub fn mask_line(text: &str, line_index: usize, code: &[Range]) -> String {
    return text
        .chars()
        .enumerate()
        .map(|(column, ch)| {
            let position = Position::new(line_index, column);
            if code.iter().any(|r| return r.covers_character(position)) {
                return ch;
            }
            return ' ';
        })
        .collect();
}

/// The code of line `line_index`, one masked copy of the line per region
/// touching it, left to right. Each copy keeps only that region's characters,
/// so a `%>` still ends the statement before it. Empty when no region
/// touches the line.
pub fn code_segments(
    document: &Document,
    regions: &[CodeRegion],
    line_index: usize,
) -> Vec<String> {
    let (Some(text), Some(range)) = (document.line(line_index), document.line_range(line_index))
    else {
        return Vec::new();
    };
    return regions_overlapping(regions, range)
        .into_iter()
        .map(|code| return segment(text, line_index, range, code))
        .collect();
}

/// The masked code of the region containing `position`, over the whole of
/// the position's line. `None` when the position is outside every region.
pub fn code_segment_at(
    document: &Document,
    regions: &[CodeRegion],
    position: Position,
) -> Option<String> {
    let region = regions.iter().find(|r| return r.code.contains(position))?;
    let text = document.line(position.line)?;
    let range = document.line_range(position.line)?;
    return Some(segment(text, position.line, range, region.code));
}

/// Line `text` as seen through the single code range `code`.
fn segment(text: &str, line_index: usize, line: Range, code: Range) -> String {
    if code.contains_range(&line) {
        return text.to_string();
    }
    return mask_line(text, line_index, &[code]);
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    fn markup(text: &str) -> Document {
        return Document::new("page.asp", text, DocumentKind::Markup);
    }

    #[test]
    fn dangling_open_is_dropped() {
        let doc = markup("<% a %> text <% b");
        let regions = scan_regions(&doc);
        assert_eq!(regions.len(), 1);
        assert_eq!(doc.text_in(regions[0].code), Some(" a "));
    }

    #[test]
    fn open_markers_of_every_spelling_pair_with_close() {
        let doc = markup("<%@ Language=VBScript %>\n<p><%= x %></p>\n<%\nDim y\n%>");
        let regions = scan_regions(&doc);
        assert_eq!(regions.len(), 3);
        assert_eq!(doc.text_in(regions[1].code), Some(" x "));
        assert_eq!(regions[2].code.start, Position::new(2, 2));
        assert_eq!(regions[2].code.end, Position::new(4, 0));
        assert_eq!(regions[0].open_delimiter, Range::new(Position::new(0, 0), Position::new(0, 3)));
    }

    #[test]
    fn pairing_is_positional_not_nested() {
        // open, open, close, close: the inner open closes the first region.
        let doc = markup("<% a <% b %> c %>");
        let regions = scan_regions(&doc);
        assert_eq!(regions.len(), 2);
        assert_eq!(doc.text_in(regions[0].code), Some(" a "));
        assert_eq!(doc.text_in(regions[1].code), Some(" c "));
    }

    #[test]
    fn other_documents_have_no_regions_and_scripts_have_one() {
        assert!(scan_regions(&Document::new("a.txt", "<% x %>", DocumentKind::Other)).is_empty());
        let script = Document::new("f.vbs", "Dim a\nDim b", DocumentKind::Script);
        let regions = scan_regions(&script);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].code.end, Position::new(1, 5));
    }

    #[test]
    fn masking_preserves_length_and_columns() {
        let doc = markup("<b><% Dim x %></b> <%= y %>");
        let regions = scan_regions(&doc);
        let line = doc.line(0).unwrap();
        let code = regions_inside(&regions, doc.line_range(0).unwrap());
        assert_eq!(code.len(), 2);
        let masked = mask_line(line, 0, &code);
        assert_eq!(masked.chars().count(), line.chars().count());
        for (column, (original, blanked)) in line.chars().zip(masked.chars()).enumerate() {
            let inside = code.iter().any(|r| r.covers_character(Position::new(0, column)));
            assert_eq!(blanked, if inside { original } else { ' ' }, "column {column}");
        }
        assert_eq!(masked.trim(), format!("Dim x{}y", " ".repeat(12)));
    }

    #[test]
    fn masking_without_regions_blanks_everything() {
        let masked = mask_line("<p>hello</p>", 0, &[]);
        assert_eq!(masked, " ".repeat(12));
    }

    #[test]
    fn cursor_before_close_delimiter_is_inside() {
        let doc = markup("<p><% x %></p>");
        let regions = scan_regions(&doc);
        assert!(is_inside(&regions, Position::new(0, 8)));
        assert!(!is_inside(&regions, Position::new(0, 1)));
    }

    #[test]
    fn line_closing_a_region_mid_way_is_masked() {
        let doc = markup("<%\nDim a %><b>Dim html</b>");
        let regions = scan_regions(&doc);
        let segments = code_segments(&doc, &regions, 1);
        assert_eq!(segments.iter().map(|s| s.trim_end()).collect::<Vec<_>>(), vec!["Dim a"]);
        let opening = code_segments(&doc, &regions, 0);
        assert_eq!(opening.len(), 1);
        assert_eq!(opening[0].trim(), "");
    }

    #[test]
    fn lines_outside_regions_yield_nothing() {
        let doc = markup("<html>\n<% Dim a %>\n</html>");
        let regions = scan_regions(&doc);
        assert!(code_segments(&doc, &regions, 0).is_empty());
        assert!(code_segments(&doc, &regions, 2).is_empty());
        let segments = code_segments(&doc, &regions, 1);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].trim(), "Dim a");
    }

    #[test]
    fn adjacent_regions_are_separate_segments() {
        let doc = markup("<% Dim a %><% Dim b %>");
        let regions = scan_regions(&doc);
        let segments = code_segments(&doc, &regions, 0);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].trim(), "Dim a");
        assert_eq!(segments[1].trim(), "Dim b");
        assert_eq!(segments[1].chars().count(), doc.line(0).unwrap().chars().count());
    }

    #[test]
    fn segment_at_a_position_keeps_only_its_region() {
        let doc = markup("<% x = 1 %><p>y</p><% z = Len(");
        let regions = scan_regions(&doc);
        let first = code_segment_at(&doc, &regions, Position::new(0, 5));
        assert_eq!(first.as_deref().map(str::trim), Some("x = 1"));

        assert_eq!(code_segment_at(&doc, &regions, Position::new(0, 15)), None);
    }
}
