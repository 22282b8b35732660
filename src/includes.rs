//! Include resolver: `<!-- #include file="..." -->` and `virtual="..."` directives.
//!
//! Directives are found anywhere in the text, markup included. A target that
//! cannot be found is not an error; it is reported in
//! [`IncludeScan::unresolved`] and otherwise ignored.

use std::collections::{HashSet, VecDeque};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::builder::{self, BuildOptions};
use crate::config::Config;
use crate::document::{Document, DocumentSource, normalize_path};
use crate::types::{IncludeEdge, IncludeKind, Symbol};

/// Extension tried when a directive names a path that does not exist as written.
const FALLBACK_EXTENSION: &str = "vbs";

/// `<!-- #include file="relative/path" -->`.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static FILE_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"(?i)<!--\s*#include\s*file\s*=\s*"([^"]*)"\s*-->"#).expect("valid regex");
});

/// `<!-- #include virtual="/site/path" -->`.
#[allow(clippy::expect_used, reason = "hardcoded pattern, validated by tests")]
static VIRTUAL_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r#"(?i)<!--\s*#include\s*virtual\s*=\s*"([^"]*)"\s*-->"#)
        .expect("valid regex");
});

/// A dependency that was found on disk but could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeFailure {
    /// Physical path that failed to open.
    pub path: PathBuf,
    /// Rendered error.
    pub reason: String,
}

/// The include directives of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncludeScan {
    /// Directives whose target exists, file directives first, each target once.
    pub edges: Vec<IncludeEdge>,
    /// Directives whose target could not be found.
    pub unresolved: Vec<UnresolvedInclude>,
}

/// A directive that points nowhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedInclude {
    /// Path exactly as written in the directive.
    pub directive: String,
    /// Directive form.
    pub kind: IncludeKind,
    /// Zero-based line of the directive.
    pub line: usize,
}

/// Walk the include graph below `root` breadth-first, building every
/// reachable document into `out`.
///
/// Each physical path contributes symbols at most once, compared
/// case-insensitively, and `root` itself is never re-entered, so include
/// cycles terminate. Documents that exist but fail to open are returned as
/// failures; their siblings are still processed.
pub fn collect_included_symbols(
    root: &Document,
    config: &Config,
    source: &dyn DocumentSource,
    options: &BuildOptions,
    out: &mut Vec<Symbol>,
) -> Vec<IncludeFailure> {
    let mut visited: HashSet<String> = HashSet::from([path_key(root.path())]);
    let mut queue: VecDeque<PathBuf> = resolve_includes(root, config, source)
        .edges
        .into_iter()
        .map(|edge| return edge.resolved)
        .collect();
    let mut failures = Vec::new();

    while let Some(path) = queue.pop_front() {
        if !visited.insert(path_key(&path)) {
            continue;
        }
        let document = match source.open(&path) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("cannot read include {}: {e}", path.display());
                failures.push(IncludeFailure {
                    path,
                    reason: e.to_string(),
                });
                continue;
            },
        };
        builder::build(&document, options, out);
        queue.extend(
            resolve_includes(&document, config, source)
                .edges
                .into_iter()
                .map(|edge| return edge.resolved),
        );
    }

    tracing::debug!(
        "{}: {} document(s) reached through includes",
        root.file_name(),
        visited.len().saturating_sub(1)
    );
    return failures;
}

/// Identity of a document: its absolute, normalized, lower-cased path.
///
/// Relative paths are anchored at the working directory, so a document named
/// relatively and one named absolutely compare equal.
pub fn path_key(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| return path.to_path_buf());
    return normalize_path(&absolute).to_string_lossy().to_lowercase();
}

/// Find and resolve the include directives of `document`.
///
/// File directives resolve against the document's directory, virtual ones
/// through the configured virtual paths. Each candidate is tried as written,
/// then with `.vbs` appended. Repeated directives (ignoring case) and
/// directives that reach an already-listed target are skipped.
pub fn resolve_includes(
    document: &Document,
    config: &Config,
    source: &dyn DocumentSource,
) -> IncludeScan {
    let mut scan = IncludeScan::default();
    let mut seen_directives: HashSet<String> = HashSet::new();
    let mut seen_targets: HashSet<String> = HashSet::new();

    let patterns = [(IncludeKind::File, &*FILE_INCLUDE), (IncludeKind::Virtual, &*VIRTUAL_INCLUDE)];
    for (kind, pattern) in patterns {
        for caps in pattern.captures_iter(document.text()) {
            let (Some(whole), Some(directive)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let directive = directive.as_str();
            if !seen_directives.insert(format!("{kind:?}:{}", directive.to_lowercase())) {
                continue;
            }

            let candidate = match kind {
                IncludeKind::File => Some(normalize_path(&document.directory().join(directive))),
                IncludeKind::Virtual => config.resolve_virtual(directive),
            };
            let Some(resolved) = candidate.and_then(|c| return locate(&c, source)) else {
                tracing::debug!("{}: unresolved include {directive}", document.file_name());
                scan.unresolved.push(UnresolvedInclude {
                    directive: directive.to_string(),
                    kind,
                    line: document.position_at(whole.start()).line,
                });
                continue;
            };

            if seen_targets.insert(path_key(&resolved)) {
                scan.edges.push(IncludeEdge {
                    directive: directive.to_string(),
                    kind,
                    resolved,
                });
            }
        }
    }
    return scan;
}

/// The literal path if it exists, else the path with the fallback extension.
fn locate(candidate: &Path, source: &dyn DocumentSource) -> Option<PathBuf> {
    if source.exists(candidate) {
        return Some(candidate.to_path_buf());
    }
    let mut with_extension = OsString::from(candidate.as_os_str());
    with_extension.push(".");
    with_extension.push(FALLBACK_EXTENSION);
    let with_extension = PathBuf::from(with_extension);
    if source.exists(&with_extension) {
        return Some(with_extension);
    }
    return None;
}
