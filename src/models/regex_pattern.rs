use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;

/// A reusable regex record from `regex_patterns/*.yml`.
///
/// Profilarr resolves condition patterns against these records by exact
/// pattern text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexPattern {
    pub name: String,
    pub pattern: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub tests: Vec<Value>,
}

/// Prefix of descriptions written by the pattern generator.
pub const AUTO_GENERATED_PREFIX: &str = "Auto-generated from ";

impl RegexPattern {
    /// Record generated for a pattern first seen in custom format `source`.
    pub fn generated(
        name: impl Into<String>,
        pattern: impl Into<String>,
        source: &str,
        tags: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            description: format!("{AUTO_GENERATED_PREFIX}{source}"),
            tags,
            tests: Vec::new(),
        }
    }

    /// The custom format this record was generated from, if it was generated.
    pub fn generated_from(&self) -> Option<&str> {
        generated_source(&self.description)
    }
}

/// The custom format named by a generated record's `description`.
pub fn generated_source(description: &str) -> Option<&str> {
    description
        .strip_prefix(AUTO_GENERATED_PREFIX)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
