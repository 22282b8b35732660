//! Documents as the core sees them: text, a line table, and a kind that says
//! whether code islands need to be located.

use std::path::{Component, Path, PathBuf};

use crate::config::Config;
use crate::error::Error;
use crate::types::{Position, Range};

/// Maximum document size (16 MiB).
const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// How the code inside a document is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// HTML-like template with `<% ... %>` code islands.
    Markup,
    /// Not recognized as containing code.
    Other,
    /// Pure script: the whole document is code.
    Script,
}

impl DocumentKind {
    /// Classify a path by its extension against the configured extension lists.
    pub fn classify(path: &Path, config: &Config) -> Self {
        return Self::classify_with(path, &config.markup_extensions, &config.script_extensions);
    }

    /// Classify a path against explicit extension lists, compared case-insensitively.
    fn classify_with(path: &Path, markup: &[String], script: &[String]) -> Self {
        let Some(ext) = path.extension().and_then(|e| return e.to_str()) else {
            return DocumentKind::Other;
        };
        if markup.iter().any(|m| return m.eq_ignore_ascii_case(ext)) {
            return DocumentKind::Markup;
        }
        if script.iter().any(|s| return s.eq_ignore_ascii_case(ext)) {
            return DocumentKind::Script;
        }
        return DocumentKind::Other;
    }
}

/// Byte span of one line, terminator excluded.
#[derive(Debug, Clone, Copy)]
struct LineSpan {
    /// Byte offset one past the last content byte.
    end: usize,
    /// Byte offset of the first byte.
    start: usize,
}

/// An immutable snapshot of a document's text.
#[derive(Debug, Clone)]
pub struct Document {
    /// Code layout classification.
    kind: DocumentKind,
    /// Line table, one entry per line.
    lines: Vec<LineSpan>,
    /// Physical path of the document.
    path: PathBuf,
    /// Full text.
    text: String,
}

impl Document {
    /// Build a document from text, splitting lines on `\r\n`, `\n` or a lone `\r`.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>, kind: DocumentKind) -> Self {
        let text = text.into();
        let lines = split_lines(&text);
        return Self {
            kind,
            lines,
            path: path.into(),
            text,
        };
    }

    /// Directory containing the document, used to resolve relative includes.
    pub fn directory(&self) -> &Path {
        return self.path.parent().unwrap_or_else(|| return Path::new(""));
    }

    /// File name without directories.
    pub fn file_name(&self) -> String {
        return self
            .path
            .file_name()
            .map(|n| return n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    /// Code layout classification.
    pub const fn kind(&self) -> DocumentKind {
        return self.kind;
    }

    /// Text of line `index` without its terminator.
    pub fn line(&self, index: usize) -> Option<&str> {
        let span = self.lines.get(index)?;
        return self.text.get(span.start..span.end);
    }

    /// Number of lines. An empty document has one empty line.
    pub fn line_count(&self) -> usize {
        return self.lines.len();
    }

    /// Range covering the whole of line `index`.
    pub fn line_range(&self, index: usize) -> Option<Range> {
        let text = self.line(index)?;
        let width = text.chars().count();
        return Some(Range::new(Position::new(index, 0), Position::new(index, width)));
    }

    /// Position one past the last character of the document.
    pub fn end_position(&self) -> Position {
        let last = self.lines.len().saturating_sub(1);
        let width = self.line(last).map_or(0, |t| return t.chars().count());
        return Position::new(last, width);
    }

    /// Byte offset of a position. A column equal to the line width maps to
    /// the end of the line; anything further out is `None`.
    pub fn offset_at(&self, position: Position) -> Option<usize> {
        let span = self.lines.get(position.line)?;
        let line = self.text.get(span.start..span.end)?;
        let within = match line.char_indices().nth(position.character) {
            Some((index, _)) => index,
            None if line.chars().count() == position.character => line.len(),
            None => return None,
        };
        return span.start.checked_add(within);
    }

    /// Text between two positions.
    pub fn text_in(&self, range: Range) -> Option<&str> {
        let start = self.offset_at(range.start)?;
        let end = self.offset_at(range.end)?;
        return self.text.get(start..end);
    }

    /// Iterate `(index, text)` over every line.
    pub fn lines(&self) -> impl Iterator<Item = (usize, &str)> {
        return (0..self.lines.len()).filter_map(|i| return self.line(i).map(|t| return (i, t)));
    }

    /// Physical path of the document.
    pub fn path(&self) -> &Path {
        return &self.path;
    }

    /// Convert a byte offset into a line/column position. Offsets inside a
    /// line terminator clamp to the end of that line.
    pub fn position_at(&self, offset: usize) -> Position {
        let after = self.lines.partition_point(|span| return span.start <= offset);
        let index = after.saturating_sub(1);
        let Some(span) = self.lines.get(index) else {
            return Position::new(0, 0);
        };
        let end = offset.min(span.end);
        let column = self.text.get(span.start..end).map_or(0, |t| return t.chars().count());
        return Position::new(index, column);
    }

    /// Full text.
    pub fn text(&self) -> &str {
        return &self.text;
    }
}

/// Split text into line spans, treating `\r\n`, `\n` and lone `\r` as terminators.
fn split_lines(text: &str) -> Vec<LineSpan> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0_usize;
    let mut cursor = 0_usize;

    while let Some(&byte) = bytes.get(cursor) {
        let next = cursor.saturating_add(1);
        match byte {
            b'\n' => {
                lines.push(LineSpan { end: cursor, start });
                start = next;
            },
            b'\r' => {
                lines.push(LineSpan { end: cursor, start });
                start = if bytes.get(next) == Some(&b'\n') { next.saturating_add(1) } else { next };
                cursor = start;
                continue;
            },
            _ => {},
        }
        cursor = next;
    }

    lines.push(LineSpan { end: bytes.len(), start });
    return lines;
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    return components.iter().collect();
}

/// Handle a single path component during normalization.
/// Pops the last component for `..` when possible, preserves it otherwise.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => match components.last() {
            Some(Component::Normal(_)) => {
                components.pop();
            },
            // `..` above the filesystem root stays at the root.
            Some(Component::RootDir | Component::Prefix(_)) => {},
            _ => components.push(component),
        },
        other => components.push(other),
    }
    return;
}

/// Host document access. The core never touches the filesystem directly.
pub trait DocumentSource {
    /// Whether a document exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Open the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be read.
    fn open(&self, path: &Path) -> Result<Document, Error>;
}

/// Reads documents from disk, classifying them with the configured extensions.
#[derive(Debug, Clone)]
pub struct FileSystem {
    /// Extensions treated as markup templates.
    markup_extensions: Vec<String>,
    /// Extensions treated as pure script.
    script_extensions: Vec<String>,
}

impl FileSystem {
    /// Create a filesystem source using the extension lists from `config`.
    pub fn new(config: &Config) -> Self {
        return Self {
            markup_extensions: config.markup_extensions.clone(),
            script_extensions: config.script_extensions.clone(),
        };
    }

    /// Classify `path` with this source's extension lists.
    fn classify(&self, path: &Path) -> DocumentKind {
        return DocumentKind::classify_with(path, &self.markup_extensions, &self.script_extensions);
    }
}

impl DocumentSource for FileSystem {
    fn exists(&self, path: &Path) -> bool {
        return path.is_file();
    }

    /// Bytes that are not UTF-8 are decoded lossily.
    fn open(&self, path: &Path) -> Result<Document, Error> {
        let metadata = match std::fs::metadata(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(m) => m,
        };
        if metadata.len() > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge {
                file: path.to_path_buf(),
                max_bytes: MAX_FILE_SIZE,
                size_bytes: metadata.len(),
            });
        }

        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        return Ok(Document::new(path, text, self.classify(path)));
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn splits_every_line_ending_convention() {
        let doc = Document::new("a.asp", "one\r\ntwo\nthree\rfour", DocumentKind::Markup);
        let lines: Vec<&str> = doc.lines().map(|(_, t)| t).collect();
        assert_eq!(lines, vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn trailing_newline_leaves_an_empty_last_line() {
        let doc = Document::new("a.asp", "x\n", DocumentKind::Markup);
        assert_eq!(doc.line_count(), 2);
        assert_eq!(doc.line(1), Some(""));
    }

    #[test]
    fn offsets_map_to_character_columns() {
        let doc = Document::new("a.asp", "héllo\r\nwörld", DocumentKind::Markup);
        // "wö" spans three bytes after the seven-byte first line and CRLF.
        assert_eq!(doc.position_at(doc.text().find('r').unwrap()), Position::new(1, 2));
        // An offset inside the CRLF clamps to the end of line 0.
        assert_eq!(doc.position_at(7), Position::new(0, 5));
    }

    #[test]
    fn positions_round_trip_through_offsets() {
        let doc = Document::new("a.asp", "ab\ncdé", DocumentKind::Markup);
        assert_eq!(doc.offset_at(Position::new(1, 3)), Some(doc.text().len()));
        assert_eq!(doc.offset_at(Position::new(1, 4)), None);
        assert_eq!(
            doc.text_in(Range::new(Position::new(0, 1), Position::new(1, 2))),
            Some("b\ncd")
        );
        assert_eq!(doc.end_position(), Position::new(1, 3));
    }

    #[test]
    fn normalization_collapses_dot_segments() {
        assert_eq!(
            normalize_path(Path::new("site/./inc/../lib/db.inc")),
            PathBuf::from("site/lib/db.inc")
        );
        assert_eq!(normalize_path(Path::new("../shared/x.inc")), PathBuf::from("../shared/x.inc"));
        assert_eq!(normalize_path(Path::new("/../x.inc")), PathBuf::from("/x.inc"));
    }

    #[test]
    fn classification_follows_configured_extensions() {
        let config = Config::default();
        assert_eq!(DocumentKind::classify(Path::new("x/index.ASP"), &config), DocumentKind::Markup);
        assert_eq!(
            DocumentKind::classify(Path::new("defs/functions.vbs"), &config),
            DocumentKind::Script
        );

        assert_eq!(DocumentKind::classify(Path::new("readme.txt"), &config), DocumentKind::Other);
    }
}
