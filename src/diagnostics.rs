use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use aspref::Error;
use aspref::config::CONFIG_FILE;

/// Bold escape for markdown headings on a terminal.
const BOLD: &str = "\x1b[1m";
/// Largest edit distance still offered as a "did you mean".
const MAX_SUGGESTION_DISTANCE: usize = 2;
/// Reset escape.
const RESET: &str = "\x1b[0m";

/// Case-insensitive Levenshtein distance between two identifiers.
pub fn edit_distance(a: &str, b: &str) -> usize {
    return strsim::levenshtein(&a.to_lowercase(), &b.to_lowercase());
}

/// Find the closest suggestion within a small edit distance.
pub fn find_closest_suggestion(symbol: &str, suggestions: &[String]) -> Option<String> {
    return suggestions
        .iter()
        .map(|s| return (edit_distance(symbol, s), s))
        .filter(|(distance, _)| return *distance <= MAX_SUGGESTION_DISTANCE)
        .min_by_key(|(distance, _)| return *distance)
        .map(|(_, s)| return s.clone());
}

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is
/// one, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigCycle { chain } => render_config_cycle(chain),
        Error::ConfigNotFound { path } => format!(
            "\
# Error: Config Not Found

`{}` does not exist.

## Fix

Check the `extends` path in your `{CONFIG_FILE}`.
",
            path.display()
        ),
        Error::FileNotFound { path } => format!(
            "\
# Error: File Not Found

`{}` does not exist.
",
            path.display()
        ),
        Error::FileTooLarge { file, max_bytes, size_bytes } => format!(
            "\
# Error: File Too Large

`{}` is {size_bytes} bytes (max {max_bytes}).
",
            file.display()
        ),
        Error::InvalidPosition { character, line, path } => format!(
            "\
# Error: Invalid Position

Line {line}, column {character} is outside `{}`.

## Fix

Lines and columns are 1-based.
",
            path.display()
        ),
        Error::SymbolNotFound { file, suggestions, symbol } => {
            render_symbol_not_found(file, symbol, suggestions)
        },
        Error::UnknownVirtualPath { prefix } => render_unknown_virtual_path(prefix),
        Error::Io(_) | Error::TomlDe(_) | Error::TomlEdit { .. } | Error::WatchFailed { .. } => {
            render_generic(e)
        },

    };
}

/// Render the variants that need no more than their message.
fn render_generic(e: &Error) -> String {
    let heading = match e {
        Error::Io(_) => "I/O",
        Error::TomlDe(_) => "Invalid TOML",
        Error::TomlEdit { .. } => "Config Not Editable",
        Error::WatchFailed { .. } => "Watch Failed",
        _ => "Error",
    };
    return format!(
        "\
# Error: {heading}

{e}
"
    );
}

/// Render an `extends` cycle as its chain.
fn render_config_cycle(chain: &[PathBuf]) -> String {
    let chain_str = chain
        .iter()
        .map(|p| return p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ");

    return format!(
        "\
# Error: Config Cycle Detected

Circular `extends` chain: {chain_str}

## Fix

Remove the circular `extends` reference in one of the config files.
"
    );
}

/// Render a failed lookup with a "did you mean" or the nearby names.
fn render_symbol_not_found(file: &Path, symbol: &str, suggestions: &[String]) -> String {
    let mut out = format!(
        "\
# Error: Symbol Not Found

No declaration of `{symbol}` is visible from `{}`.
",
        file.display()
    );

    if let Some(suggestion) = find_closest_suggestion(symbol, suggestions) {
        let _ = write!(out, "\n## Did you mean `{suggestion}`?\n");
    } else if !suggestions.is_empty() {
        out.push_str("\n## Similar symbols\n\n");
        for s in suggestions {
            let _ = writeln!(out, "- `{s}`");
        }
    }
    return out;
}

/// Render a virtual prefix that is not configured.
fn render_unknown_virtual_path(prefix: &str) -> String {
    return format!(
        "\
# Error: Unknown Virtual Path

Virtual path `{prefix}` is not configured.

## Fix

Add it to `{CONFIG_FILE}`:

    [virtual_paths]
    \"{prefix}\" = \"path/to/directory\"

Or run:

    aspref virtual add {prefix} path/to/directory
"
    );
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn distance_ignores_case() {
        assert_eq!(edit_distance("GetUser", "getuser"), 0);
        assert_eq!(edit_distance("GetUser", "GetUsers"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn closest_suggestion_prefers_the_smallest_distance() {
        let names = vec!["FormatDate".to_string(), "FormatData".to_string(), "Trim".to_string()];
        assert_eq!(find_closest_suggestion("FormatDat", &names), Some("FormatDate".to_string()));
        assert_eq!(find_closest_suggestion("Unrelated", &names), None);
    }

    #[test]
    fn symbol_not_found_offers_a_fix() {
        let e = Error::SymbolNotFound {
            file: PathBuf::from("page.asp"),
            suggestions: vec!["Render".to_string()],
            symbol: "Rendr".to_string(),
        };
        let md = render_error(&e);
        assert!(md.starts_with("# Error: Symbol Not Found"));
        assert!(md.contains("Did you mean `Render`?"));
    }

    #[test]
    fn far_suggestions_are_listed_instead() {
        let e = Error::SymbolNotFound {
            file: PathBuf::from("page.asp"),
            suggestions: vec!["OpenConnection".to_string()],
            symbol: "Open".to_string(),
        };
        let md = render_error(&e);
        assert!(md.contains("## Similar symbols"));
        assert!(md.contains("- `OpenConnection`"));
    }

    #[test]
    fn unknown_virtual_path_shows_the_command() {
        let md = render_error(&Error::UnknownVirtualPath { prefix: "/shared".to_string() });
        assert!(md.contains("aspref virtual add /shared"));
    }
}
