use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;
use std::fmt;
use std::str::FromStr;

/// A custom format record from `custom_formats/*.yml`.
///
/// `name` is the identity of the record and must be unique across the
/// collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFormat {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Test cases are carried through untouched.
    #[serde(default)]
    pub tests: Vec<Value>,
}

/// One matching rule of a custom format.
///
/// The value the rule matches on lives in a type-specific key: `pattern` for
/// text matches, `resolution` and `source` for the enumerated matches. Any
/// other keys are kept in `extra` so re-serialization is lossless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,

    #[serde(default)]
    pub negate: bool,

    #[serde(default)]
    pub required: bool,

    #[serde(rename = "type")]
    pub condition_type: ConditionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Condition {
    /// A condition of a text-matching type carrying `pattern`.
    pub fn with_pattern(
        name: impl Into<String>,
        condition_type: ConditionType,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            negate: false,
            required: false,
            condition_type,
            pattern: Some(pattern.into()),
            resolution: None,
            source: None,
            extra: IndexMap::new(),
        }
    }

    pub fn with_resolution(name: impl Into<String>, resolution: impl Into<String>) -> Self {
        Self {
            resolution: Some(resolution.into()),
            pattern: None,
            ..Self::with_pattern(name, ConditionType::Resolution, String::new())
        }
    }

    pub fn with_source(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            pattern: None,
            ..Self::with_pattern(name, ConditionType::Source, String::new())
        }
    }

    /// The value this condition matches on, whichever key holds it.
    pub fn value(&self) -> Option<&str> {
        match self.condition_type.value_field() {
            Some("resolution") => self.resolution.as_deref(),
            Some("source") => self.source.as_deref(),
            _ => self.pattern.as_deref(),
        }
    }
}

/// Condition types understood by Profilarr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    ReleaseTitle,
    ReleaseGroup,
    Edition,
    Resolution,
    Source,
    Language,
    IndexerFlag,
    QualityModifier,
    ReleaseType,
    Size,
    Year,
}

impl ConditionType {
    pub const ALL: [ConditionType; 11] = [
        ConditionType::ReleaseTitle,
        ConditionType::ReleaseGroup,
        ConditionType::Edition,
        ConditionType::Resolution,
        ConditionType::Source,
        ConditionType::Language,
        ConditionType::IndexerFlag,
        ConditionType::QualityModifier,
        ConditionType::ReleaseType,
        ConditionType::Size,
        ConditionType::Year,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConditionType::ReleaseTitle => "release_title",
            ConditionType::ReleaseGroup => "release_group",
            ConditionType::Edition => "edition",
            ConditionType::Resolution => "resolution",
            ConditionType::Source => "source",
            ConditionType::Language => "language",
            ConditionType::IndexerFlag => "indexer_flag",
            ConditionType::QualityModifier => "quality_modifier",
            ConditionType::ReleaseType => "release_type",
            ConditionType::Size => "size",
            ConditionType::Year => "year",
        }
    }

    /// Key that must hold a string value for this type, if the type has one
    /// we check.
    pub fn value_field(self) -> Option<&'static str> {
        match self {
            ConditionType::ReleaseTitle | ConditionType::ReleaseGroup | ConditionType::Edition => {
                Some("pattern")
            }
            ConditionType::Resolution => Some("resolution"),
            ConditionType::Source => Some("source"),
            _ => None,
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a `type` string is not a known condition type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown condition type '{0}'")]
pub struct UnknownConditionType(pub String);

impl FromStr for ConditionType {
    type Err = UnknownConditionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConditionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownConditionType(s.to_string()))
    }
}
