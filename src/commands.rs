use std::path::{Path, PathBuf};
use std::process::ExitCode;

use aspref::Error;
use aspref::builder;
use aspref::config::Config;
use aspref::document::{Document, DocumentKind, DocumentSource as _, FileSystem, normalize_path};
use aspref::includes;
use aspref::index::SymbolIndex;
use aspref::query;
use aspref::resolver;
use aspref::scanner;
use aspref::types::{IncludeKind, OutlineNode, Position, Range, Symbol};

use crate::diagnostics;

/// Largest edit distance for a name to be listed as similar.
const MAX_LISTED_DISTANCE: usize = 3;
/// Most similar names reported with an unknown symbol.
const MAX_SUGGESTIONS: usize = 10;

/// A document scanned into a fresh index, built-ins loaded.
struct Session {
    /// The document named on the command line.
    document: Document,
    /// Index holding the document's entry and the built-ins.
    index: SymbolIndex,
}

/// Report include directives whose target cannot be found, across every
/// markup document under `root`.
/// Exit code 0 when everything resolves, 1 otherwise.
///
/// # Errors
///
/// Returns errors from config loading.
pub fn check(root: &str) -> Result<ExitCode, Error> {
    let root = PathBuf::from(root);
    let config = Config::load(&root)?;
    let source = FileSystem::new(&config);

    let mut documents = 0_usize;
    let mut problems = 0_usize;
    for entry in walkdir::WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
    {
        let path = normalize_path(entry.path());
        if DocumentKind::classify(&path, &config) != DocumentKind::Markup {
            continue;
        }
        let document = match source.open(&path) {
            Ok(document) => document,
            Err(e) => {
                problems = problems.saturating_add(1);
                println!("UNREADABLE  {} ({e})", path.display());
                continue;
            },
        };
        documents = documents.saturating_add(1);

        for unresolved in includes::resolve_includes(&document, &config, &source).unresolved {
            problems = problems.saturating_add(1);
            println!(
                "MISSING  {}:{}  #include {}=\"{}\"",
                path.display(),
                unresolved.line.saturating_add(1),
                directive_keyword(unresolved.kind),
                unresolved.directive
            );
        }
    }

    if problems > 0 {
        println!();
        println!("{problems} unresolved include(s) in {documents} document(s)");
        return Ok(ExitCode::from(1));
    }
    println!("All includes resolve ({documents} document(s))");
    return Ok(ExitCode::SUCCESS);
}

/// Print completion candidates at a 1-based position, one per line.
///
/// # Errors
///
/// Returns errors from config loading, document reading, or an invalid position.
pub fn complete(file: &str, line: usize, column: usize) -> Result<(), Error> {
    let session = open_session(file)?;
    let position = position(&session.document, line, column)?;
    for candidate in query::completions(&session.index, &session.document, position) {
        let origin = if candidate.built_in { "  (built-in)" } else { "" };
        println!("{}\t{}{origin}", candidate.name, candidate.kind);
    }
    return Ok(());
}

/// Print where the symbol under a 1-based position is declared.
///
/// # Errors
///
/// Returns `Error::SymbolNotFound` when the identifier has no visible
/// declaration, or errors from loading and position checks.
pub fn definition(file: &str, line: usize, column: usize) -> Result<ExitCode, Error> {
    let session = open_session(file)?;
    let Some(symbol) = symbol_under_cursor(&session, line, column)? else {
        eprintln!("no identifier at {line}:{column}");
        return Ok(ExitCode::FAILURE);
    };
    println!(
        "{}:{}:{}  {}",
        symbol.origin.path.display(),
        symbol.declaration.start.line.saturating_add(1),
        symbol.declaration.start.character.saturating_add(1),
        symbol.definition.trim()
    );
    return Ok(ExitCode::SUCCESS);
}

/// Directive keyword as written in source.
const fn directive_keyword(kind: IncludeKind) -> &'static str {
    return match kind {
        IncludeKind::File => "file",
        IncludeKind::Virtual => "virtual",
    };
}

/// Print the definition and documentation of the symbol under a 1-based position.
///
/// # Errors
///
/// Returns `Error::SymbolNotFound` when the identifier has no visible
/// declaration, or errors from loading and position checks.
pub fn hover(file: &str, line: usize, column: usize) -> Result<ExitCode, Error> {
    let session = open_session(file)?;
    let Some(symbol) = symbol_under_cursor(&session, line, column)? else {
        eprintln!("no identifier at {line}:{column}");
        return Ok(ExitCode::FAILURE);
    };
    print_symbol(symbol);
    return Ok(ExitCode::SUCCESS);
}

/// Print the include directives of a document: resolved edges, then
/// missing targets, then targets that could not be read.
///
/// # Errors
///
/// Returns errors from config loading or document reading.
pub fn includes(file: &str) -> Result<(), Error> {
    let session = open_session(file)?;
    let Some(entry) = session.index.document(session.document.path()) else {
        return Ok(());
    };

    for edge in &entry.includes.edges {
        println!("{}  -> {}", edge.label(), edge.resolved.display());
    }
    for unresolved in &entry.includes.unresolved {
        println!(
            "MISSING  line {}  #include {}=\"{}\"",
            unresolved.line.saturating_add(1),
            directive_keyword(unresolved.kind),
            unresolved.directive
        );
    }
    for failure in &entry.failures {
        println!("UNREADABLE  {} ({})", failure.path.display(), failure.reason);
    }
    return Ok(());
}

/// 1-based `line:column` of a range start.
fn location(range: &Range) -> String {
    return format!(
        "{}:{}",
        range.start.line.saturating_add(1),
        range.start.character.saturating_add(1)
    );
}

/// Look up a name as seen from a document, optionally under a parent.
///
/// # Errors
///
/// Returns `Error::SymbolNotFound` with similar names when nothing matches,
/// or errors from config loading or document reading.
pub fn lookup(file: &str, name: &str, parent: Option<&str>) -> Result<(), Error> {
    let session = open_session(file)?;
    let path = session.document.path();
    let Some(symbol) = session.index.lookup(path, name, parent) else {
        return Err(Error::SymbolNotFound {
            file: path.to_path_buf(),
            suggestions: similar_names(&session.index, path, name),
            symbol: name.to_string(),
        });
    };
    print_symbol(symbol);
    return Ok(());
}

/// Load config from the working directory, read `file`, load built-ins and
/// scan the document with its includes.
///
/// # Errors
///
/// Returns errors from config loading or document reading.
fn open_session(file: &str) -> Result<Session, Error> {
    let config = Config::load(Path::new("."))?;
    let source = FileSystem::new(&config);
    let document = source.open(&normalize_path(Path::new(file)))?;

    let mut index = SymbolIndex::new(config);
    index.initialize(&source);
    index.rescan(&document, &source);
    return Ok(Session { document, index });
}

/// Convert a 1-based line and column into a position inside `document`.
/// The column may sit one past the last character of the line.
///
/// # Errors
///
/// Returns `Error::InvalidPosition` when the position is outside the document.
fn position(document: &Document, line: usize, column: usize) -> Result<Position, Error> {
    let invalid = || {
        return Error::InvalidPosition {
            character: column,
            line,
            path: document.path().to_path_buf(),
        };
    };
    let (Some(line_index), Some(character)) = (line.checked_sub(1), column.checked_sub(1)) else {
        return Err(invalid());
    };
    let Some(text) = document.line(line_index) else {
        return Err(invalid());
    };
    if character > text.chars().count() {
        return Err(invalid());
    }
    return Ok(Position::new(line_index, character));
}

/// Print an outline tree, children indented under their block.
pub fn print_outline(nodes: &[OutlineNode], depth: usize) {
    for node in nodes {
        let symbol = &node.symbol;
        println!(
            "{}{} {}  {}",
            "  ".repeat(depth),
            symbol.kind.label(),
            symbol.name,
            location(&symbol.declaration)
        );
        print_outline(&node.children, depth.saturating_add(1));
    }
}

/// Print a symbol's definition, provenance and documentation.
fn print_symbol(symbol: &Symbol) {
    println!("{}", symbol.definition.trim());
    let parent = symbol.parent.as_deref().map(|p| return format!(" of {p}")).unwrap_or_default();
    let built_in = if symbol.origin.built_in { ", built-in" } else { "" };
    println!(
        "{}{parent} in {}:{}{built_in}",
        symbol.kind.label(),
        symbol.origin.file_name,
        location(&symbol.declaration)
    );

    let Some(docs) = &symbol.documentation else {
        return;
    };
    println!();
    match &docs.summary {
        Some(summary) => println!("{summary}"),
        None => print!("{}", docs.raw),
    }
    for parameter in &docs.parameters {
        println!("  {}: {}", parameter.name, parameter.summary);
    }
}

/// Print the code regions of a document: each region's open delimiter,
/// code and close delimiter as 1-based ranges.
///
/// # Errors
///
/// Returns errors from config loading or document reading.
pub fn regions(file: &str) -> Result<(), Error> {
    let config = Config::load(Path::new("."))?;
    let source = FileSystem::new(&config);
    let document = source.open(&normalize_path(Path::new(file)))?;

    let regions = scanner::scan_regions(&document);
    for region in &regions {
        println!(
            "open {}  code {}-{}  close {}",
            location(&region.open_delimiter),
            location(&region.code),
            location(&Range::new(region.code.end, region.code.end)),
            location(&region.close_delimiter)
        );
    }
    println!("{} region(s)", regions.len());
    return Ok(());
}

/// Print the signatures of the call enclosing a 1-based position, the
/// active parameter marked with `>`.
///
/// # Errors
///
/// Returns `Error::SymbolNotFound` when the called function has no visible
/// declaration, or errors from loading and position checks.
pub fn signature(file: &str, line: usize, column: usize) -> Result<ExitCode, Error> {
    let session = open_session(file)?;
    let position = position(&session.document, line, column)?;
    let Some(help) = query::signatures(&session.index, &session.document, position) else {
        eprintln!("no call at {line}:{column}");
        return Ok(ExitCode::FAILURE);
    };
    if help.signatures.is_empty() {
        return Err(Error::SymbolNotFound {
            file: session.document.path().to_path_buf(),
            suggestions: similar_names(&session.index, session.document.path(), &help.function),
            symbol: help.function,
        });
    }

    for (i, signature) in help.signatures.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", signature.definition.trim());
        if let Some(summary) = &signature.documentation {
            println!("  {summary}");
        }
        for (p, parameter) in signature.parameters.iter().enumerate() {
            let marker = if p == help.active_parameter { ">" } else { " " };
            match &parameter.documentation {
                Some(doc) => println!("  {marker} {}: {doc}", parameter.name),
                None => println!("  {marker} {}", parameter.name),
            }
        }
    }
    return Ok(ExitCode::SUCCESS);
}

/// Names visible from `path` that look like `name`, closest first.
fn similar_names(index: &SymbolIndex, path: &Path, name: &str) -> Vec<String> {
    let wanted = name.to_lowercase();
    let mut names: Vec<String> = Vec::new();
    for symbol in index.symbols_for(path) {
        let close = diagnostics::edit_distance(name, &symbol.name) <= MAX_LISTED_DISTANCE
            || symbol.name.to_lowercase().starts_with(&wanted);
        if close && !names.iter().any(|n| return n.eq_ignore_ascii_case(&symbol.name)) {
            names.push(symbol.name.clone());
        }
    }
    names.sort_by_cached_key(|n| return diagnostics::edit_distance(name, n));
    names.truncate(MAX_SUGGESTIONS);
    return names;
}

/// Print a doc-comment skeleton for the line below a 1-based line, with
/// `<param>` lines when a procedure is declared there.
///
/// # Errors
///
/// Returns errors from config loading, document reading, or an invalid line.
pub fn snippet(file: &str, line: usize) -> Result<ExitCode, Error> {
    let config = Config::load(Path::new("."))?;
    let source = FileSystem::new(&config);
    let document = source.open(&normalize_path(Path::new(file)))?;
    let position = position(&document, line, 1)?;

    let Some(snippet) = query::documentation_snippet(&document, position.line) else {
        eprintln!("line {line} is the last line; nothing to document below it");
        return Ok(ExitCode::FAILURE);
    };
    println!("{snippet}");
    return Ok(ExitCode::SUCCESS);
}

/// The symbol the identifier under a 1-based position refers to.
/// `Ok(None)` when there is no identifier there at all.
///
/// # Errors
///
/// Returns `Error::InvalidPosition` for positions outside the document and
/// `Error::SymbolNotFound` for identifiers without a visible declaration.
fn symbol_under_cursor(
    session: &Session,
    line: usize,
    column: usize,
) -> Result<Option<&Symbol>, Error> {

    let position = position(&session.document, line, column)?;
    let Some(word) = resolver::word_at(&session.document, position) else {
        return Ok(None);
    };
    if let Some(symbol) = query::symbol_at_position(&session.index, &session.document, position) {
        return Ok(Some(symbol));
    }
    let path = session.document.path();
    return Err(Error::SymbolNotFound {
        file: path.to_path_buf(),
        suggestions: similar_names(&session.index, path, &word.text),
        symbol: word.text,
    });
}

/// Print the outline of a document and the top-level symbols its includes
/// contribute, or the whole scan as JSON.
///
/// # Errors
///
/// Returns errors from config loading, document reading, or JSON encoding.
pub fn symbols(file: &str, json: bool) -> Result<(), Error> {
    let session = open_session(file)?;
    let path = session.document.path();
    let Some(entry) = session.index.document(path) else {
        return Ok(());
    };

    if json {
        let out = serde_json::to_string_pretty(entry).map_err(std::io::Error::from)?;
        println!("{out}");
        return Ok(());
    }

    print_outline(&entry.outline, 0);
    println!("{} declaration(s)", builder::flatten(&entry.outline).len());
    let included: Vec<&Symbol> = entry
        .symbols
        .iter()
        .filter(|s| return s.is_top_level() && s.origin.path != path)
        .collect();
    if !included.is_empty() {
        println!();
        println!("from includes:");
        for symbol in included {
            println!("  {} {}  {}", symbol.kind.label(), symbol.name, symbol.origin.file_name);
        }
    }
    return Ok(());
}
