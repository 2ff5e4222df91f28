use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;
use std::fmt;

/// A quality profile from `profiles/*.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(rename = "upgradesAllowed", default)]
    pub upgrades_allowed: bool,

    #[serde(rename = "minCustomFormatScore", default)]
    pub min_custom_format_score: i64,

    #[serde(rename = "upgradeUntilScore", default)]
    pub upgrade_until_score: i64,

    #[serde(rename = "minScoreIncrement", default)]
    pub min_score_increment: i64,

    #[serde(default)]
    pub custom_formats: Vec<ScoredFormat>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_formats_radarr: Vec<ScoredFormat>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_formats_sonarr: Vec<ScoredFormat>,

    /// Quality ranking, highest first. Entries are single qualities or groups.
    #[serde(default)]
    pub qualities: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_until: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// A `{name, score}` entry referencing a custom format by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredFormat {
    pub name: String,
    pub score: i64,
}

/// The profile lists that reference custom formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatList {
    CustomFormats,
    CustomFormatsRadarr,
    CustomFormatsSonarr,
}

impl FormatList {
    pub const ALL: [FormatList; 3] = [
        FormatList::CustomFormats,
        FormatList::CustomFormatsRadarr,
        FormatList::CustomFormatsSonarr,
    ];

    /// Key of the list inside a profile document.
    pub fn key(self) -> &'static str {
        match self {
            FormatList::CustomFormats => "custom_formats",
            FormatList::CustomFormatsRadarr => "custom_formats_radarr",
            FormatList::CustomFormatsSonarr => "custom_formats_sonarr",
        }
    }
}

impl fmt::Display for FormatList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl QualityProfile {
    pub fn format_list(&self, list: FormatList) -> &[ScoredFormat] {
        match list {
            FormatList::CustomFormats => &self.custom_formats,
            FormatList::CustomFormatsRadarr => &self.custom_formats_radarr,
            FormatList::CustomFormatsSonarr => &self.custom_formats_sonarr,
        }
    }

    /// Every custom format name this profile references, in document order.
    pub fn references(&self) -> Vec<(FormatList, &str)> {
        FormatList::ALL
            .into_iter()
            .flat_map(|list| {
                self.format_list(list)
                    .iter()
                    .map(move |entry| (list, entry.name.as_str()))
            })
            .collect()
    }
}

/// Pull references out of a profile document that may not deserialize.
///
/// Entries that are not mappings with a string `name` are ignored; the shape
/// check reports those separately.
pub fn references_in_document(document: &Value) -> Vec<(FormatList, String)> {
    let mut references = Vec::new();
    for list in FormatList::ALL {
        let Some(Value::Sequence(entries)) = document.get(list.key()) else {
            continue;
        };
        for entry in entries {
            if let Some(name) = entry.get("name").and_then(Value::as_str) {
                references.push((list, name.to_string()));
            }
        }
    }
    references
}
