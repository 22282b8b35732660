//! File watcher: scans the named documents on startup, then re-scans on changes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use aspref::Error;
use aspref::config::Config;
use aspref::document::{DocumentSource as _, FileSystem, normalize_path};
use aspref::index::SymbolIndex;
use notify::{RecursiveMode, Watcher as _};

use crate::commands;
use crate::diagnostics;

/// Debounce delay between filesystem events and re-scan.
const DEBOUNCE_MS: u64 = 100;

/// Directories holding the watched documents, their resolved includes and
/// the built-in definitions.
fn collect_watch_dirs(files: &[PathBuf], index: &SymbolIndex) -> HashSet<PathBuf> {
    let mut dirs = HashSet::new();
    let mut add_parent = |path: &Path| {
        let parent = path
            .parent()
            .filter(|p| return !p.as_os_str().is_empty())
            .unwrap_or_else(|| return Path::new("."));
        dirs.insert(parent.to_path_buf());
    };

    for file in files {
        add_parent(file.as_path());
        if let Some(entry) = index.document(file) {
            for symbol in &entry.symbols {
                add_parent(symbol.origin.path.as_path());
            }
            for edge in &entry.includes.edges {
                add_parent(edge.resolved.as_path());
            }
        }
    }
    for path in &index.config().builtin_includes {
        add_parent(path.as_path());
    }
    return dirs;
}

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns `Error::WatchFailed` if the watcher cannot be created.
fn create_watcher(tx: crossbeam_channel::Sender<()>) -> Result<notify::RecommendedWatcher, Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_)
                    | notify::EventKind::Modify(_)
                    | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return Error::WatchFailed {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Reload built-ins, re-scan every document and print its outline.
/// Documents that fail to open are reported and dropped from the index.
fn rescan_all(files: &[PathBuf], index: &mut SymbolIndex, source: &FileSystem) {
    index.invalidate();
    index.initialize(source);

    for file in files {
        match source.open(file) {
            Ok(document) => {
                let entry = index.rescan(&document, source);
                println!("== {} ({} symbol(s))", file.display(), entry.symbols.len());
                commands::print_outline(&entry.outline, 1);
            },
            Err(e) => {
                index.remove(file);
                diagnostics::print_error(&e);
            },
        }
    }
}

/// Entry point for the watch command.
///
/// Scans the documents once, then watches their directories and re-scans
/// everything on changes.
///
/// # Errors
///
/// Returns errors from config loading or watcher setup.
pub fn run(files: &[String]) -> Result<ExitCode, Error> {
    let config = Config::load(Path::new("."))?;
    let source = FileSystem::new(&config);
    let files: Vec<PathBuf> = files.iter().map(|f| return normalize_path(Path::new(f))).collect();
    let mut index = SymbolIndex::new(config);

    eprintln!("watch: initial scan");
    rescan_all(&files, &mut index, &source);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;
    let watch_dirs = collect_watch_dirs(&files, &index);
    for dir in &watch_dirs {
        if dir.exists()
            && let Err(e) = watcher.watch(dir, RecursiveMode::NonRecursive)
        {
            tracing::warn!("cannot watch {}: {e}", dir.display());
        }
    }

    let dir_count = watch_dirs.len();
    eprintln!("watch: monitoring {dir_count} directories, press Ctrl+C to stop");

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        eprintln!("watch: change detected, re-scanning...");
        rescan_all(&files, &mut index, &source);
    }

    return Ok(ExitCode::SUCCESS);
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn watch_dirs_cover_includes_and_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("inc")).unwrap();
        std::fs::create_dir_all(root.join("defs")).unwrap();
        std::fs::write(
            root.join("page.asp"),
            "<!-- #include file=\"inc/db.inc\" -->\n<% Dim x %>",
        )
        .unwrap();

        std::fs::write(root.join("inc/db.inc"), "<% Dim conn %>").unwrap();
        std::fs::write(root.join("defs/functions.vbs"), "Function Len(s)\nEnd Function").unwrap();

        let config = Config {
            builtin_includes: vec![root.join("defs/functions.vbs")],
            ..Config::default()
        };
        let source = FileSystem::new(&config);
        let mut index = SymbolIndex::new(config);
        let files = vec![root.join("page.asp")];
        rescan_all(&files, &mut index, &source);

        let dirs = collect_watch_dirs(&files, &index);
        assert!(dirs.contains(root));
        assert!(dirs.contains(&root.join("inc")));
        assert!(dirs.contains(&root.join("defs")));
        assert_eq!(index.builtins().len(), 1);
    }

    #[test]
    fn unreadable_documents_leave_the_index() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("page.asp");
        std::fs::write(&page, "<% Dim x %>").unwrap();
        let source = FileSystem::new(&Config::default());
        let mut index = SymbolIndex::new(Config::default());
        let files = vec![page.clone()];

        rescan_all(&files, &mut index, &source);
        assert!(index.document(&page).is_some());
        std::fs::remove_file(&page).unwrap();
        rescan_all(&files, &mut index, &source);
        assert!(index.document(&page).is_none());
    }
}
