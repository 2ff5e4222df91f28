use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::models::FormatList;

/// Line/column of a syntax error, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

fn at(location: &Option<SourceLocation>) -> String {
    location.map(|l| format!(":{l}")).unwrap_or_default()
}

fn list_paths(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn hint(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (differs only by case from '{s}')"))
        .unwrap_or_default()
}

/// A single problem found in the data set.
///
/// Every variant names the file it concerns so the report can be read
/// without further context.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Document is not valid YAML/JSON.
    #[error("{path}{}: parse error: {message}", at(.location))]
    Parse {
        path: Utf8PathBuf,
        location: Option<SourceLocation>,
        message: String,
    },

    /// Document parsed but does not have the expected shape.
    #[error("{path}: {field}: {message}")]
    Shape {
        path: Utf8PathBuf,
        field: String,
        message: String,
    },

    /// More than one custom format file defines the same name.
    #[error("custom format name '{name}' is defined more than once: {}", list_paths(.paths))]
    NameCollision {
        name: String,
        paths: Vec<Utf8PathBuf>,
    },

    /// A profile names a custom format that does not exist.
    #[error("{path}: in {list}, custom format '{name}' is not defined{}", hint(.suggestion))]
    DanglingReference {
        path: Utf8PathBuf,
        list: FormatList,
        name: String,
        suggestion: Option<String>,
    },

    /// A converter source record cannot be converted.
    #[error("{path}: malformed input: {message}")]
    MalformedInput { path: Utf8PathBuf, message: String },

    /// A single file could not be read or written.
    #[error("{path}: {message}")]
    Io { path: Utf8PathBuf, message: String },
}

impl Diagnostic {
    pub fn shape(path: &Utf8Path, field: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic::Shape {
            path: path.to_path_buf(),
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn io(path: &Utf8Path, err: &std::io::Error) -> Self {
        Diagnostic::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn malformed(path: &Utf8Path, message: impl Into<String>) -> Self {
        Diagnostic::MalformedInput {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Short category label, matching the serialized `kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::Parse { .. } => "parse",
            Diagnostic::Shape { .. } => "shape",
            Diagnostic::NameCollision { .. } => "name_collision",
            Diagnostic::DanglingReference { .. } => "dangling_reference",
            Diagnostic::MalformedInput { .. } => "malformed_input",
            Diagnostic::Io { .. } => "io",
        }
    }

    /// The file the diagnostic is reported against (first file for collisions).
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            Diagnostic::Parse { path, .. }
            | Diagnostic::Shape { path, .. }
            | Diagnostic::DanglingReference { path, .. }
            | Diagnostic::MalformedInput { path, .. }
            | Diagnostic::Io { path, .. } => Some(path),
            Diagnostic::NameCollision { paths, .. } => paths.first().map(Utf8PathBuf::as_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_includes_location() {
        let diag = Diagnostic::Parse {
            path: "custom_formats/bad.yml".into(),
            location: Some(SourceLocation { line: 3, column: 7 }),
            message: "did not find expected key".into(),
        };
        assert_eq!(
            diag.to_string(),
            "custom_formats/bad.yml:3:7: parse error: did not find expected key"
        );
    }

    #[test]
    fn test_parse_message_without_location() {
        let diag = Diagnostic::Parse {
            path: "a.yml".into(),
            location: None,
            message: "boom".into(),
        };
        assert_eq!(diag.to_string(), "a.yml: parse error: boom");
    }

    #[test]
    fn test_collision_lists_every_file() {
        let diag = Diagnostic::NameCollision {
            name: "4.0 Sound".into(),
            paths: vec!["cf/a.yml".into(), "cf/b.yml".into()],
        };
        assert_eq!(
            diag.to_string(),
            "custom format name '4.0 Sound' is defined more than once: cf/a.yml, cf/b.yml"
        );
        assert_eq!(diag.path(), Some(Utf8Path::new("cf/a.yml")));
    }

    #[test]
    fn test_dangling_reference_with_case_hint() {
        let diag = Diagnostic::DanglingReference {
            path: "profiles/p.yml".into(),
            list: FormatList::CustomFormatsRadarr,
            name: "x265 (hd)".into(),
            suggestion: Some("x265 (HD)".into()),
        };
        assert_eq!(
            diag.to_string(),
            "profiles/p.yml: in custom_formats_radarr, custom format 'x265 (hd)' is not defined \
             (differs only by case from 'x265 (HD)')"
        );
    }

    #[test]
    fn test_serialized_kind_tag() {
        let diag = Diagnostic::shape(Utf8Path::new("a.yml"), "name", "missing");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["kind"], "shape");
        assert_eq!(json["field"], "name");
        assert_eq!(diag.kind(), "shape");
    }
}
