use std::path::{Path, PathBuf};

use aspref::Error;
use aspref::config::{CONFIG_FILE, Config, normalize_virtual_prefix};

// ── CLI commands ──────────────────────────────────────────────────────

/// Add or replace a virtual path mapping in the config file.
///
/// # Errors
///
/// Returns errors from config parsing or writing.
pub fn cmd_add(prefix: &str, physical: &str) -> Result<(), Error> {
    let root = PathBuf::from(".");
    let prefix = add_to_config(&root, prefix, physical)?;
    println!("Added virtual path: {prefix} -> {physical}");
    return Ok(());
}

/// List the virtual path mappings in effect, `extends` bases included.
///
/// # Errors
///
/// Returns errors from config loading.
pub fn cmd_list() -> Result<(), Error> {
    let config = Config::load(Path::new("."))?;

    if config.virtual_paths.is_empty() {
        println!("No virtual paths configured.");
        return Ok(());
    }
    for mapping in &config.virtual_paths {
        println!("{} -> {}", mapping.prefix, mapping.physical.display());
    }
    return Ok(());
}

/// Remove a virtual path mapping from the config file.
///
/// # Errors
///
/// Returns `Error::UnknownVirtualPath` if the prefix isn't configured here.
pub fn cmd_remove(prefix: &str) -> Result<(), Error> {
    let root = PathBuf::from(".");
    let removed = remove_from_config(&root, prefix)?;
    println!("Removed virtual path: {removed}");
    return Ok(());
}

// ── Config file editing ───────────────────────────────────────────────

/// Add `prefix = physical` under `[virtual_paths]`, creating the table if
/// needed. Keys that name the same prefix in another spelling are replaced.
/// Returns the normalized prefix.
///
/// # Errors
///
/// Returns `Error::TomlEdit` if the config can't be parsed,
/// or `Error::Io` if writing fails.
fn add_to_config(root: &Path, prefix: &str, physical: &str) -> Result<String, Error> {
    let (config_path, mut doc) = read_config_doc(root)?;
    let prefix = normalize_virtual_prefix(prefix);

    if !doc.contains_key("virtual_paths") {
        doc["virtual_paths"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let Some(table) = doc.get_mut("virtual_paths").and_then(toml_edit::Item::as_table_mut) else {
        return Err(Error::TomlEdit {
            file: config_path,
            reason: "`virtual_paths` is not a table".to_string(),
        });
    };

    for key in matching_keys(table, &prefix) {
        table.remove(&key);
    }
    table.insert(&prefix, toml_edit::value(physical));

    std::fs::write(&config_path, doc.to_string())?;
    return Ok(prefix);
}

/// Keys of `table` that normalize to `prefix`, ignoring case.
fn matching_keys(table: &toml_edit::Table, prefix: &str) -> Vec<String> {
    return table
        .iter()
        .map(|(key, _)| return key.to_string())
        .filter(|key| return normalize_virtual_prefix(key).eq_ignore_ascii_case(prefix))
        .collect();
}

/// Parse the config file into a format-preserving document.
/// Returns an empty document if the file doesn't exist.
///
/// # Errors
///
/// Returns `Error::Io` on read failure or `Error::TomlEdit` on parse failure.
fn read_config_doc(root: &Path) -> Result<(PathBuf, toml_edit::DocumentMut), Error> {
    let config_path = root.join(CONFIG_FILE);
    let content = match std::fs::read_to_string(&config_path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(Error::Io(e)),
        Ok(c) => c,
    };

    let doc: toml_edit::DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| {
        return Error::TomlEdit {
            file: config_path.clone(),
            reason: e.to_string(),
        };
    })?;
    return Ok((config_path, doc));
}

/// Remove every key under `[virtual_paths]` naming `prefix`.
/// Returns the normalized prefix.
///
/// # Errors
///
/// Returns `Error::UnknownVirtualPath` if no key names the prefix.
fn remove_from_config(root: &Path, prefix: &str) -> Result<String, Error> {
    let (config_path, mut doc) = read_config_doc(root)?;
    let prefix = normalize_virtual_prefix(prefix);
    let unknown = || {
        return Error::UnknownVirtualPath { prefix: prefix.clone() };
    };

    let table = doc
        .get_mut("virtual_paths")
        .and_then(toml_edit::Item::as_table_mut)
        .ok_or_else(unknown)?;
    let keys = matching_keys(table, &prefix);
    if keys.is_empty() {
        return Err(unknown());
    }
    for key in keys {
        table.remove(&key);
    }

    std::fs::write(&config_path, doc.to_string())?;
    return Ok(prefix);
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    fn read(root: &Path) -> String {
        return std::fs::read_to_string(root.join(CONFIG_FILE)).unwrap();
    }

    #[test]
    fn add_creates_the_file_and_table() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = add_to_config(dir.path(), "shared/", "www/shared").unwrap();
        assert_eq!(prefix, "/shared");

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(
            config.resolve_virtual("/shared/a.inc"),
            Some(dir.path().join("www/shared/a.inc"))
        );
    }

    #[test]
    fn add_keeps_comments_and_replaces_other_spellings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "# site settings\nshow_parameter_symbols = true\n\n[virtual_paths]\n\"/Shared/\" = \"old\"\n",
        )
        .unwrap();
        add_to_config(dir.path(), "/shared", "new").unwrap();

        let text = read(dir.path());
        assert!(text.contains("# site settings"));
        assert!(!text.contains("old"));
        assert_eq!(Config::load(dir.path()).unwrap().virtual_paths.len(), 1);
    }

    #[test]
    fn remove_matches_ignoring_case_and_slashes() {
        let dir = tempfile::tempdir().unwrap();
        add_to_config(dir.path(), "/lib", "lib").unwrap();
        add_to_config(dir.path(), "/shared", "www/shared").unwrap();

        assert_eq!(remove_from_config(dir.path(), "LIB/").unwrap(), "/lib");
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.virtual_paths.len(), 1);
        assert_eq!(config.virtual_paths[0].prefix, "/shared");
    }

    #[test]
    fn removing_an_unknown_prefix_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            remove_from_config(dir.path(), "/nope"),
            Err(Error::UnknownVirtualPath { prefix }) if prefix == "/nope"
        ));
        add_to_config(dir.path(), "/lib", "lib").unwrap();
        assert!(matches!(
            remove_from_config(dir.path(), "/nope"),
            Err(Error::UnknownVirtualPath { .. })
        ));

    }

    #[test]
    fn unparsable_config_is_not_edited() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[virtual_paths\n").unwrap();
        assert!(matches!(add_to_config(dir.path(), "/x", "x"), Err(Error::TomlEdit { .. })));
        assert_eq!(read(dir.path()), "[virtual_paths\n");
    }
}
