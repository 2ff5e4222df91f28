//! Reading and writing YAML/JSON documents.
//!
//! Directory listing failures are fatal and returned as [`anyhow::Error`];
//! problems with a single file become a [`Diagnostic`] so callers can keep
//! going.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::Serialize;
use serde_yaml_ng::Value;
use std::fs;
use std::sync::LazyLock;

use super::diagnostics::{Diagnostic, SourceLocation};

/// Syntax of a document, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        match path.extension()?.to_ascii_lowercase().as_str() {
            "yml" | "yaml" => Some(DocumentFormat::Yaml),
            "json" => Some(DocumentFormat::Json),
            _ => None,
        }
    }
}

/// List the documents of the given formats directly inside `dir`, sorted by path.
///
/// # Errors
///
/// Fails if `dir` does not exist or cannot be read.
pub fn list_documents(dir: &Utf8Path, formats: &[DocumentFormat]) -> Result<Vec<Utf8PathBuf>> {
    let entries = dir
        .read_dir_utf8()
        .with_context(|| format!("Failed to read directory: {}", dir))?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in: {}", dir))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if DocumentFormat::from_path(path).is_some_and(|f| formats.contains(&f)) {
            paths.push(path.to_path_buf());
        }
    }

    paths.sort();
    tracing::debug!("Found {} document(s) in {}", paths.len(), dir);
    Ok(paths)
}

/// Parse document text. Empty YAML parses to [`Value::Null`].
pub fn parse_document(
    path: &Utf8Path,
    text: &str,
    format: DocumentFormat,
) -> Result<Value, Diagnostic> {
    match format {
        DocumentFormat::Yaml => serde_yaml_ng::from_str(text).map_err(|e| Diagnostic::Parse {
            path: path.to_path_buf(),
            location: e.location().map(|l| SourceLocation {
                line: l.line(),
                column: l.column(),
            }),
            message: strip_location_suffix(&e.to_string()),
        }),
        DocumentFormat::Json => serde_json::from_str(text).map_err(|e| Diagnostic::Parse {
            path: path.to_path_buf(),
            location: (e.line() > 0).then(|| SourceLocation {
                line: e.line(),
                column: e.column(),
            }),
            message: strip_location_suffix(&e.to_string()),
        }),
    }
}

/// Both parsers embed " at line X column Y" in their messages; the location
/// is reported separately.
fn strip_location_suffix(message: &str) -> String {
    static LOCATION: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r" at line \d+ column \d+").expect("Invalid location regex"));
    LOCATION.replace(message, "").into_owned()
}

/// Read and parse a document, picking the syntax from the extension.
pub fn load_document(path: &Utf8Path) -> Result<Value, Diagnostic> {
    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| Diagnostic::malformed(path, "unsupported file extension"))?;
    let text = fs::read_to_string(path).map_err(|e| Diagnostic::io(path, &e))?;
    parse_document(path, &text, format)
}

/// Serialize `value` as YAML and write it to `path`, replacing any existing file.
pub fn write_yaml<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), Diagnostic> {
    let yaml = serde_yaml_ng::to_string(value).map_err(|e| Diagnostic::Io {
        path: path.to_path_buf(),
        message: format!("failed to serialize YAML: {e}"),
    })?;
    fs::write(path, yaml).map_err(|e| Diagnostic::io(path, &e))?;
    tracing::debug!("Wrote {}", path);
    Ok(())
}

/// Like [`write_yaml`], but leaves the file alone when it already holds the
/// same text. Returns whether the file was written.
pub fn write_yaml_if_changed<T: Serialize>(path: &Utf8Path, value: &T) -> Result<bool, Diagnostic> {
    let yaml = serde_yaml_ng::to_string(value).map_err(|e| Diagnostic::Io {
        path: path.to_path_buf(),
        message: format!("failed to serialize YAML: {e}"),
    })?;
    if fs::read_to_string(path).is_ok_and(|existing| existing == yaml) {
        tracing::debug!("Unchanged {}", path);
        return Ok(false);
    }
    fs::write(path, yaml).map_err(|e| Diagnostic::io(path, &e))?;
    tracing::debug!("Wrote {}", path);
    Ok(true)
}

/// Create `dir` and its parents when missing.
///
/// # Errors
///
/// Fails if the directory cannot be created.
pub fn ensure_dir(dir: &Utf8Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {}", dir))?;
        tracing::info!("Created directory {}", dir);
    }
    Ok(())
}

/// Human name for a value's kind, used in shape messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_f64() => "a float",
        Value::Number(_) => "an integer",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_dir() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Utf8Path::new("a.yml")), Some(DocumentFormat::Yaml));
        assert_eq!(DocumentFormat::from_path(Utf8Path::new("a.YAML")), Some(DocumentFormat::Yaml));
        assert_eq!(DocumentFormat::from_path(Utf8Path::new("a.json")), Some(DocumentFormat::Json));
        assert_eq!(DocumentFormat::from_path(Utf8Path::new("README.md")), None);
        assert_eq!(DocumentFormat::from_path(Utf8Path::new("Makefile")), None);
    }

    #[test]
    fn test_list_documents_sorted_and_filtered() {
        let (_guard, dir) = temp_dir();
        fs::write(dir.join("b.yml"), "name: b").unwrap();
        fs::write(dir.join("a.yaml"), "name: a").unwrap();
        fs::write(dir.join("c.json"), "{}").unwrap();
        fs::write(dir.join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.join("nested.yml")).unwrap();

        let yaml_only = list_documents(&dir, &[DocumentFormat::Yaml]).unwrap();
        assert_eq!(yaml_only, vec![dir.join("a.yaml"), dir.join("b.yml")]);

        let all = list_documents(&dir, &[DocumentFormat::Yaml, DocumentFormat::Json]).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_list_missing_directory_is_fatal() {
        let (_guard, dir) = temp_dir();
        assert!(list_documents(&dir.join("missing"), &[DocumentFormat::Yaml]).is_err());
    }

    #[test]
    fn test_yaml_parse_error_has_location() {
        let err = parse_document(
            Utf8Path::new("bad.yml"),
            "name: x\nconditions: [\n  - a\n",
            DocumentFormat::Yaml,
        )
        .unwrap_err();
        match err {
            Diagnostic::Parse { path, location, .. } => {
                assert_eq!(path, "bad.yml");
                assert!(location.is_some());
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_json_parse_error_has_location() {
        let err = parse_document(Utf8Path::new("bad.json"), "{\n  \"name\": }", DocumentFormat::Json)
            .unwrap_err();
        match err {
            Diagnostic::Parse { location, message, .. } => {
                assert_eq!(location.map(|l| l.line), Some(2));
                assert!(!message.contains(" at line "));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_yaml_is_null() {
        let value = parse_document(Utf8Path::new("empty.yml"), "", DocumentFormat::Yaml).unwrap();
        assert!(value.is_null());
    }

    #[test]
    fn test_json_keeps_key_order() {
        let value = parse_document(
            Utf8Path::new("cf.json"),
            r#"{"zeta": 1, "alpha": 2, "mid": 3}"#,
            DocumentFormat::Json,
        )
        .unwrap();
        let yaml = serde_yaml_ng::to_string(&value).unwrap();
        assert_eq!(yaml, "zeta: 1\nalpha: 2\nmid: 3\n");
    }

    #[test]
    fn test_write_yaml_overwrites() {
        let (_guard, dir) = temp_dir();
        let path = dir.join("out.yml");
        fs::write(&path, "old: true\n").unwrap();
        write_yaml(&path, &serde_yaml_ng::from_str::<Value>("new: true").unwrap()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new: true\n");
    }

    #[test]
    fn test_write_if_changed_skips_identical() {
        let (_guard, dir) = temp_dir();
        let path = dir.join("out.yml");
        let value: Value = serde_yaml_ng::from_str("a: 1").unwrap();
        assert!(write_yaml_if_changed(&path, &value).unwrap());
        assert!(!write_yaml_if_changed(&path, &value).unwrap());
        let other: Value = serde_yaml_ng::from_str("a: 2").unwrap();
        assert!(write_yaml_if_changed(&path, &other).unwrap());
    }
}
