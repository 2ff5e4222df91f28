use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml_ng::Value;

use super::custom_format::Condition;

/// A custom format in the legacy TRaSH layout (Radarr/Sonarr API export).
///
/// `name` is optional here so a record without one can be reported as
/// malformed input instead of a decoding error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrashCustomFormat {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Option<Vec<String>>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub specifications: Vec<Specification>,

    #[serde(default)]
    pub tests: Vec<Value>,

    /// Keys outside the converted set (`trash_id`, `trash_scores`, ...).
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// A record that already lists `conditions` but may omit fields the target
/// layout defaults (`description`, `tags`, `negate`, `required`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialCustomFormat {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Option<Vec<String>>,

    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub tests: Vec<Value>,

    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub implementation: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub negate: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub required: bool,

    #[serde(default)]
    pub fields: Option<SpecificationFields>,
}

/// TRaSH files use a `{value: ...}` map; raw *arr exports use a list of
/// `{name, value}` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecificationFields {
    Map(IndexMap<String, Value>),
    List(Vec<FieldEntry>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub name: String,

    #[serde(default)]
    pub value: Value,
}

/// Exports write `null` for unset lists and flags.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Specification {
    /// The `value` field, if present and not null.
    pub fn value(&self) -> Option<&Value> {
        let value = match self.fields.as_ref()? {
            SpecificationFields::Map(map) => map.get("value")?,
            SpecificationFields::List(entries) => {
                &entries.iter().find(|entry| entry.name == "value")?.value
            }
        };
        (!value.is_null()).then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trash_json() {
        let json = r#"{
            "trash_id": "abc123",
            "name": "DTS-X",
            "includeCustomFormatWhenRenaming": false,
            "specifications": [
                {
                    "name": "DTS X",
                    "implementation": "ReleaseTitleSpecification",
                    "negate": false,
                    "required": true,
                    "fields": { "value": "\\bDTS[-. ]?X\\b" }
                }
            ]
        }"#;
        let cf: TrashCustomFormat = serde_json::from_str(json).unwrap();
        assert_eq!(cf.name.as_deref(), Some("DTS-X"));
        assert_eq!(cf.specifications.len(), 1);
        assert!(cf.specifications[0].required);
        assert_eq!(
            cf.specifications[0].value().and_then(Value::as_str),
            Some(r"\bDTS[-. ]?X\b")
        );
        assert!(cf.extra.contains_key("trash_id"));
        assert!(cf.extra.contains_key("includeCustomFormatWhenRenaming"));
    }

    #[test]
    fn test_field_list_layout() {
        let yaml = r#"
name: 2160p
implementation: ResolutionSpecification
fields:
  - name: value
    value: 2160
"#;
        let spec: Specification = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(spec.value().and_then(Value::as_i64), Some(2160));
    }

    #[test]
    fn test_partial_record_defaults_condition_flags() {
        let yaml = "name: X\nconditions:\n  - name: c1\n    type: release_title\n    pattern: foo\n";
        let cf: PartialCustomFormat = serde_yaml_ng::from_str(yaml).unwrap();
        assert!(cf.description.is_none());
        assert_eq!(cf.conditions.len(), 1);
        assert!(!cf.conditions[0].negate);
        assert!(!cf.conditions[0].required);
    }

    #[test]
    fn test_null_lists_and_flags_take_defaults() {
        let cf: TrashCustomFormat = serde_yaml_ng::from_str("name: X\nspecifications: ~\n").unwrap();
        assert!(cf.specifications.is_empty());

        let spec: Specification = serde_yaml_ng::from_str(
            "name: x\nimplementation: ReleaseTitleSpecification\nnegate: ~\nrequired: null\nfields:\n  value: x\n",
        )
        .unwrap();
        assert!(!spec.negate);
        assert!(!spec.required);

        let cf: TrashCustomFormat =
            serde_json::from_str(r#"{"name": "X", "specifications": null}"#).unwrap();
        assert!(cf.specifications.is_empty());
    }

    #[test]
    fn test_null_value_is_absent() {
        let spec: Specification =
            serde_yaml_ng::from_str("name: x\nimplementation: SizeSpecification\nfields:\n  value: ~\n").unwrap();
        assert!(spec.value().is_none());
    }
}
