/// Crate-level error types for aspref diagnostics.
use std::path::PathBuf;

/// All errors in aspref carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, symbol, or reason for failure.
///
/// Malformed source never produces an error: the scanner and builder degrade
/// to a best-effort result. Only host I/O and configuration surface here.
#[allow(clippy::error_impl_error, reason = "crate-level error type re-exported as aspref::Error")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Config files form an `extends` cycle.
    #[error("config cycle detected: {}", chain.iter().map(|p| return p.display().to_string()).collect::<Vec<_>>().join(" -> "))]
    ConfigCycle {
        /// Ordered chain of config file paths forming the cycle.
        chain: Vec<PathBuf>,
    },

    /// A config named by `extends` does not exist on disk.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// A document does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Document exceeds the size limit.
    #[error("file too large ({size_bytes} bytes, max {max_bytes}): {}", file.display())]
    FileTooLarge {
        /// File that exceeded the size limit.
        file: PathBuf,
        /// Maximum allowed file size in bytes.
        max_bytes: u64,
        /// Actual file size in bytes.
        size_bytes: u64,
    },

    /// A line/column pair given on the command line lies outside the document.
    #[error("position {line}:{character} is outside {}", path.display())]
    InvalidPosition {
        /// One-based column as given by the caller.
        character: usize,
        /// One-based line as given by the caller.
        line: usize,
        /// Document the position was resolved against.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// No declaration with this name is visible from the queried document.
    #[error("symbol not found: `{symbol}` in {}", file.display())]
    SymbolNotFound {
        /// Document the lookup ran against.
        file: PathBuf,
        /// Visible symbol names close to the query.
        suggestions: Vec<String>,
        /// Identifier that was looked up.
        symbol: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// The config file could not be parsed for in-place editing.
    #[error("cannot edit {}: {reason}", file.display())]
    TomlEdit {
        /// Config file being edited.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// No configured virtual path has this prefix.
    #[error("unknown virtual path: `{prefix}`")]
    UnknownVirtualPath {
        /// Virtual prefix that was not found.
        prefix: String,
    },

    /// The filesystem watcher could not be created or attached.
    #[error("watch failed: {reason}")]
    WatchFailed {
        /// Description of the watcher failure.
        reason: String,
    },
}
