use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::document::normalize_path;
use crate::error::Error;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = ".aspref.toml";

/// A virtual URL-style prefix mapped onto a physical directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPath {
    /// Directory the prefix maps to.
    pub physical: PathBuf,
    /// Site path prefix such as `/shared`, without a trailing slash.
    pub prefix: String,
}

/// Project configuration loaded from `.aspref.toml`.
/// Relative paths are already resolved against the declaring config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Built-in definitions documents, loaded once per index.
    pub builtin_includes: Vec<PathBuf>,
    /// Extensions of templates with `<% %>` code islands.
    pub markup_extensions: Vec<String>,
    /// Extensions of pure script documents.
    pub script_extensions: Vec<String>,
    /// Emit function parameters as their own symbols.
    pub show_parameter_symbols: bool,
    /// Emit `Dim`/`Const`/`Public`/`Private`/`Set` declarations as symbols.
    pub show_variable_symbols: bool,
    /// Virtual include prefixes, sorted by prefix.
    pub virtual_paths: Vec<VirtualPath>,
}

/// Raw TOML structure for `.aspref.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct AsprefTomlConfig {
    /// Appended after the base config's list.
    #[serde(default)]
    builtin_includes: Vec<String>,
    /// Base config path, relative to this file.
    extends: Option<String>,
    /// Replaces the base list when present.
    markup_extensions: Option<Vec<String>>,
    /// Replaces the base list when present.
    script_extensions: Option<Vec<String>>,
    /// Overrides the base value when present.
    show_parameter_symbols: Option<bool>,
    /// Overrides the base value when present.
    show_variable_symbols: Option<bool>,
    /// Merged into the base mapping, same prefix wins here.
    #[serde(default)]
    virtual_paths: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            builtin_includes: Vec::new(),
            markup_extensions: vec!["asp".to_string(), "asa".to_string(), "inc".to_string()],
            script_extensions: vec!["vbs".to_string()],
            show_parameter_symbols: false,
            show_variable_symbols: true,
            virtual_paths: Vec::new(),
        };
    }
}

impl Config {
    /// Load config from `.aspref.toml` in the given root directory.
    /// Returns the defaults if the file doesn't exist. Returns an error if the
    /// file exists but is malformed; a written config never silently falls back.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed, `Error::ConfigNotFound` if an
    /// `extends` target is missing, or `Error::ConfigCycle` if `extends` loops.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = normalize_path(&root.join(CONFIG_FILE));
        if !path.is_file() {
            return Ok(Self::default());
        }
        let mut chain = Vec::new();
        return Self::load_chain(&path, &mut chain);
    }

    /// Load one config file, its `extends` base first.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    fn load_chain(path: &Path, chain: &mut Vec<PathBuf>) -> Result<Self, Error> {
        if chain.iter().any(|p| return p == path) {
            chain.push(path.to_path_buf());
            return Err(Error::ConfigCycle { chain: chain.clone() });
        }
        chain.push(path.to_path_buf());

        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        let raw: AsprefTomlConfig = toml::from_str(&content)?;
        let dir = path.parent().unwrap_or_else(|| return Path::new(""));

        let mut config = match &raw.extends {
            Some(base) => Self::load_chain(&normalize_path(&dir.join(base)), chain)?,
            None => Self::default(),
        };
        config.apply(raw, dir);
        return Ok(config);
    }

    /// Layer a raw config over this one. `dir` anchors relative paths.
    fn apply(&mut self, raw: AsprefTomlConfig, dir: &Path) {
        self.builtin_includes
            .extend(raw.builtin_includes.iter().map(|p| return normalize_path(&dir.join(p))));
        if let Some(markup) = raw.markup_extensions {
            self.markup_extensions = markup;
        }
        if let Some(script) = raw.script_extensions {
            self.script_extensions = script;
        }
        if let Some(show) = raw.show_parameter_symbols {
            self.show_parameter_symbols = show;
        }
        if let Some(show) = raw.show_variable_symbols {
            self.show_variable_symbols = show;
        }

        for (prefix, physical) in raw.virtual_paths {
            let prefix = normalize_virtual_prefix(&prefix);
            self.virtual_paths.retain(|v| return !v.prefix.eq_ignore_ascii_case(&prefix));
            self.virtual_paths.push(VirtualPath {
                physical: normalize_path(&dir.join(physical)),
                prefix,
            });
        }
        self.virtual_paths.sort_by(|a, b| return a.prefix.cmp(&b.prefix));
    }

    /// Map a virtual include path onto disk through the longest matching
    /// prefix. Prefixes compare case-insensitively and only match whole
    /// path segments. Returns `None` when no prefix applies.
    pub fn resolve_virtual(&self, virtual_path: &str) -> Option<PathBuf> {
        let wanted = virtual_path.replace('\\', "/");
        let best = self
            .virtual_paths
            .iter()
            .filter(|v| return virtual_prefix_matches(&wanted, &v.prefix))
            .max_by_key(|v| return v.prefix.len())?;

        let rest = wanted.get(best.prefix.len()..).unwrap_or("").trim_start_matches('/');
        if rest.is_empty() {
            return Some(best.physical.clone());
        }
        return Some(normalize_path(&best.physical.join(rest)));
    }
}

/// Canonical form of a virtual prefix: forward slashes, leading slash, no trailing slash.
pub fn normalize_virtual_prefix(prefix: &str) -> String {
    let slashed = prefix.replace('\\', "/");
    let trimmed = slashed.trim_end_matches('/');
    if trimmed.starts_with('/') {
        return trimmed.to_string();
    }
    return format!("/{trimmed}");
}

/// Whether `path` begins with `prefix` on a segment boundary, ignoring case.
fn virtual_prefix_matches(path: &str, prefix: &str) -> bool {
    if prefix == "/" || prefix.is_empty() {
        return path.starts_with('/');
    }
    let Some(head) = path.get(..prefix.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(prefix) {
        return false;
    }
    return path
        .get(prefix.len()..)
        .is_some_and(|rest| return rest.is_empty() || rest.starts_with('/'));
}
