//! Shape checks for parsed documents.
//!
//! Checks walk the raw [`Value`] instead of deserializing so that every
//! problem in a file is reported, not just the first one serde hits.

use camino::Utf8Path;
use serde_yaml_ng::{Mapping, Value};
use std::collections::HashSet;

use super::diagnostics::Diagnostic;
use super::documents::kind_of;
use crate::models::{ConditionType, FormatList};

/// Accumulates shape problems for one document.
struct ShapeChecker<'a> {
    path: &'a Utf8Path,
    problems: Vec<Diagnostic>,
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

impl<'a> ShapeChecker<'a> {
    fn new(path: &'a Utf8Path) -> Self {
        Self {
            path,
            problems: Vec::new(),
        }
    }

    fn report(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.problems.push(Diagnostic::shape(self.path, field, message));
    }

    fn wrong_type(&mut self, field: impl Into<String>, expected: &str, found: &Value) {
        self.report(field, format!("expected {expected}, found {}", kind_of(found)));
    }

    fn root<'v>(&mut self, document: &'v Value) -> Option<&'v Mapping> {
        match document {
            Value::Mapping(map) => Some(map),
            Value::Null => {
                self.report("(root)", "document is empty");
                None
            }
            other => {
                self.wrong_type("(root)", "a mapping", other);
                None
            }
        }
    }

    fn mapping<'v>(&mut self, map: &'v Mapping, key: &str, field: &str) -> Option<&'v Mapping> {
        match map.get(key) {
            None => {
                self.report(field, "is required");
                None
            }
            Some(Value::Mapping(inner)) => Some(inner),
            Some(other) => {
                self.wrong_type(field, "a mapping", other);
                None
            }
        }
    }

    fn required_string<'v>(&mut self, map: &'v Mapping, key: &str, field: &str) -> Option<&'v str> {
        match map.get(key) {
            None | Some(Value::Null) => {
                self.report(field, "is required");
                None
            }
            Some(Value::String(s)) if s.trim().is_empty() => {
                self.report(field, "must not be empty");
                None
            }
            Some(Value::String(s)) => Some(s.as_str()),
            Some(other) => {
                self.wrong_type(field, "a string", other);
                None
            }
        }
    }

    fn optional_string(&mut self, map: &Mapping, key: &str, field: &str) {
        match map.get(key) {
            None | Some(Value::String(_)) => {}
            Some(other) => self.wrong_type(field, "a string", other),
        }
    }

    fn optional_bool(&mut self, map: &Mapping, key: &str, field: &str) {
        match map.get(key) {
            None | Some(Value::Bool(_)) => {}
            Some(other) => self.wrong_type(field, "a boolean", other),
        }
    }

    fn optional_integer(&mut self, map: &Mapping, key: &str, field: &str) {
        match map.get(key) {
            None => {}
            Some(value) if value.as_i64().is_some() => {}
            Some(other) => self.wrong_type(field, "an integer", other),
        }
    }

    fn optional_sequence<'v>(&mut self, map: &'v Mapping, key: &str, field: &str) -> Option<&'v [Value]> {
        match map.get(key) {
            None => None,
            Some(Value::Sequence(items)) => Some(items.as_slice()),
            Some(other) => {
                self.wrong_type(field, "a list", other);
                None
            }
        }
    }

    /// A list of strings without repeats.
    fn tag_list(&mut self, map: &Mapping, key: &str) {
        let Some(items) = self.optional_sequence(map, key, key) else {
            return;
        };
        let mut seen = HashSet::new();
        for (i, item) in items.iter().enumerate() {
            let field = format!("{key}[{i}]");
            match item {
                Value::String(tag) if !seen.insert(tag.as_str()) => {
                    self.report(field, format!("duplicate tag '{tag}'"));
                }
                Value::String(_) => {}
                other => self.wrong_type(field, "a string", other),
            }
        }
    }

    fn finish(self) -> Vec<Diagnostic> {
        self.problems
    }
}

/// Check a custom format document. Returns the record's name when it has a
/// usable one, so the caller can index it even if other fields are broken.
pub fn check_custom_format(path: &Utf8Path, document: &Value) -> (Option<String>, Vec<Diagnostic>) {
    let mut checker = ShapeChecker::new(path);
    let Some(map) = checker.root(document) else {
        return (None, checker.finish());
    };

    let name = checker.required_string(map, "name", "name").map(str::to_string);
    checker.optional_string(map, "description", "description");
    checker.tag_list(map, "tags");
    checker.optional_sequence(map, "tests", "tests");

    if map.get("conditions").is_none() && map.get("specifications").is_some() {
        checker.report(
            "conditions",
            "record uses the legacy TRaSH layout (specifications); run `pcd convert`",
        );
        return (name, checker.finish());
    }

    match map.get("conditions") {
        None | Some(Value::Null) => checker.report("conditions", "is required"),
        Some(Value::Sequence(conditions)) if conditions.is_empty() => {
            checker.report("conditions", "must contain at least one condition");
        }
        Some(Value::Sequence(conditions)) => {
            for (i, condition) in conditions.iter().enumerate() {
                check_condition(&mut checker, &format!("conditions[{i}]"), condition);
            }
        }
        Some(other) => checker.wrong_type("conditions", "a list", other),
    }

    (name, checker.finish())
}

fn check_condition(checker: &mut ShapeChecker<'_>, prefix: &str, condition: &Value) {
    let Value::Mapping(map) = condition else {
        checker.wrong_type(prefix, "a mapping", condition);
        return;
    };

    checker.required_string(map, "name", &join(prefix, "name"));
    checker.optional_bool(map, "negate", &join(prefix, "negate"));
    checker.optional_bool(map, "required", &join(prefix, "required"));

    let type_field = join(prefix, "type");
    let Some(type_name) = checker.required_string(map, "type", &type_field) else {
        return;
    };
    match type_name.parse::<ConditionType>() {
        Ok(condition_type) => {
            if let Some(key) = condition_type.value_field() {
                checker.required_string(map, key, &join(prefix, key));
            }
        }
        Err(e) => checker.report(type_field, e.to_string()),
    }
}

/// Check a quality profile document.
pub fn check_profile(path: &Utf8Path, document: &Value) -> Vec<Diagnostic> {
    let mut checker = ShapeChecker::new(path);
    let Some(map) = checker.root(document) else {
        return checker.finish();
    };

    checker.required_string(map, "name", "name");
    checker.optional_string(map, "description", "description");
    checker.optional_string(map, "language", "language");
    checker.tag_list(map, "tags");
    checker.optional_bool(map, "upgradesAllowed", "upgradesAllowed");
    for key in ["minCustomFormatScore", "upgradeUntilScore", "minScoreIncrement"] {
        checker.optional_integer(map, key, key);
    }

    for list in FormatList::ALL {
        let key = list.key();
        let Some(entries) = checker.optional_sequence(map, key, key) else {
            continue;
        };
        let mut seen = HashSet::new();
        for (i, entry) in entries.iter().enumerate() {
            let prefix = format!("{key}[{i}]");
            let Value::Mapping(entry_map) = entry else {
                checker.wrong_type(prefix, "a mapping", entry);
                continue;
            };
            if let Some(name) = checker.required_string(entry_map, "name", &join(&prefix, "name")) {
                if !seen.insert(name) {
                    checker.report(join(&prefix, "name"), format!("'{name}' is listed more than once"));
                }
            }
            let score_field = join(&prefix, "score");
            if entry_map.get("score").is_none() {
                checker.report(score_field, "is required");
            } else {
                checker.optional_integer(entry_map, "score", &score_field);
            }
        }
    }

    if let Some(qualities) = checker.optional_sequence(map, "qualities", "qualities") {
        for (i, quality) in qualities.iter().enumerate() {
            check_quality_reference(&mut checker, &format!("qualities[{i}]"), quality);
        }
    }
    if let Some(upgrade_until) = map.get("upgrade_until") {
        check_quality_reference(&mut checker, "upgrade_until", upgrade_until);
    }

    checker.finish()
}

/// A quality is either its name or a mapping carrying `name`.
fn check_quality_reference(checker: &mut ShapeChecker<'_>, field: &str, quality: &Value) {
    match quality {
        Value::String(_) => {}
        Value::Mapping(map) => {
            checker.required_string(map, "name", &join(field, "name"));
        }
        other => checker.wrong_type(field, "a quality name or mapping", other),
    }
}

/// Check the `pcd.json` manifest.
pub fn check_manifest(path: &Utf8Path, document: &Value) -> Vec<Diagnostic> {
    let mut checker = ShapeChecker::new(path);
    let Some(map) = checker.root(document) else {
        return checker.finish();
    };

    checker.optional_string(map, "name", "name");
    checker.optional_string(map, "version", "version");

    if let Some(profilarr) = checker.mapping(map, "profilarr", "profilarr") {
        let field = "profilarr.minimum_version";
        if let Some(version) = checker.required_string(profilarr, "minimum_version", field) {
            if !is_dotted_version(version) {
                checker.report(field, format!("'{version}' is not a dotted numeric version"));
            }
        }
    }
    if let Some(dependencies) = checker.mapping(map, "dependencies", "dependencies") {
        checker.required_string(dependencies, "schema", "dependencies.schema");
    }

    checker.finish()
}

fn is_dotted_version(version: &str) -> bool {
    version
        .split('.')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml_ng::from_str(text).unwrap()
    }

    fn fields(problems: &[Diagnostic]) -> Vec<String> {
        problems
            .iter()
            .map(|d| match d {
                Diagnostic::Shape { field, .. } => field.clone(),
                other => panic!("unexpected diagnostic {other:?}"),
            })
            .collect()
    }

    const PATH: &str = "custom_formats/test.yml";

    #[test]
    fn test_valid_custom_format() {
        let doc = yaml(
            "name: DV\ndescription: Dolby Vision\ntags: [HDR]\nconditions:\n  - name: DV\n    type: release_title\n    pattern: '\\bDV\\b'\n    required: true\n",
        );
        let (name, problems) = check_custom_format(Utf8Path::new(PATH), &doc);
        assert_eq!(name.as_deref(), Some("DV"));
        assert!(problems.is_empty(), "{problems:?}");
    }

    #[test]
    fn test_custom_format_problems_accumulate() {
        let doc = yaml(
            r#"
name: Broken
tags: [A, A, 3]
conditions:
  - name: c1
    type: regex
    pattern: x
  - name: c2
    type: resolution
  - type: source
    source: webdl
    negate: "yes"
  - plain string
"#,
        );
        let (name, problems) = check_custom_format(Utf8Path::new(PATH), &doc);
        assert_eq!(name.as_deref(), Some("Broken"));
        assert_eq!(
            fields(&problems),
            vec![
                "tags[1]",
                "tags[2]",
                "conditions[0].type",
                "conditions[1].resolution",
                "conditions[2].name",
                "conditions[2].negate",
                "conditions[3]",
            ]
        );
    }

    #[test]
    fn test_empty_conditions_rejected() {
        let (_, problems) = check_custom_format(Utf8Path::new(PATH), &yaml("name: X\nconditions: []\n"));
        assert_eq!(fields(&problems), vec!["conditions"]);
    }

    #[test]
    fn test_missing_name_and_conditions() {
        let (name, problems) = check_custom_format(Utf8Path::new(PATH), &yaml("description: 3\n"));
        assert!(name.is_none());
        assert_eq!(fields(&problems), vec!["name", "description", "conditions"]);
    }

    #[test]
    fn test_legacy_record_gets_hint() {
        let (_, problems) = check_custom_format(
            Utf8Path::new(PATH),
            &yaml("name: X\nspecifications:\n  - name: a\n    implementation: ReleaseTitleSpecification\n"),
        );
        assert_eq!(problems.len(), 1);
        assert!(problems[0].to_string().contains("pcd convert"));
    }

    #[test]
    fn test_non_mapping_root() {
        let (_, problems) = check_custom_format(Utf8Path::new(PATH), &yaml("- a\n- b\n"));
        assert_eq!(fields(&problems), vec!["(root)"]);
        let (_, problems) = check_custom_format(Utf8Path::new(PATH), &Value::Null);
        assert!(problems[0].to_string().contains("document is empty"));
    }

    #[test]
    fn test_valid_profile() {
        let doc = yaml(
            r#"
name: 2160p Quality
upgradesAllowed: true
minCustomFormatScore: 0
upgradeUntilScore: 5000
minScoreIncrement: 1
custom_formats:
  - name: DV
    score: 100
qualities:
  - id: 1
    name: WEB-2160p
  - Bluray-2160p
upgrade_until:
  id: 1
  name: WEB-2160p
language: any
"#,
        );
        let problems = check_profile(Utf8Path::new("profiles/p.yml"), &doc);
        assert!(problems.is_empty(), "{problems:?}");
    }

    #[test]
    fn test_profile_problems_accumulate() {
        let doc = yaml(
            r#"
name: P
upgradesAllowed: "true"
minCustomFormatScore: 1.5
custom_formats:
  - name: A
    score: 1
  - name: A
    score: 2
  - name: B
  - name: C
    score: high
custom_formats_sonarr: nope
qualities:
  - 7
"#,
        );
        let problems = check_profile(Utf8Path::new("profiles/p.yml"), &doc);
        assert_eq!(
            fields(&problems),
            vec![
                "upgradesAllowed",
                "minCustomFormatScore",
                "custom_formats[1].name",
                "custom_formats[2].score",
                "custom_formats[3].score",
                "custom_formats_sonarr",
                "qualities[0]",
            ]
        );
    }

    #[test]
    fn test_valid_manifest() {
        let doc: Value = serde_json::from_str(
            r#"{"name": "db", "profilarr": {"minimum_version": "2.1.0"}, "dependencies": {"schema": "1.0.0"}}"#,
        )
        .unwrap();
        assert!(check_manifest(Utf8Path::new("pcd.json"), &doc).is_empty());
    }

    #[test]
    fn test_manifest_problems() {
        let doc: Value =
            serde_json::from_str(r#"{"profilarr": {"minimum_version": "v2"}, "dependencies": []}"#).unwrap();
        let problems = check_manifest(Utf8Path::new("pcd.json"), &doc);
        assert_eq!(fields(&problems), vec!["profilarr.minimum_version", "dependencies"]);
    }

    #[test]
    fn test_dotted_version() {
        assert!(is_dotted_version("2"));
        assert!(is_dotted_version("2.0.10"));
        assert!(!is_dotted_version("2..0"));
        assert!(!is_dotted_version("2.0-beta"));
        assert!(!is_dotted_version(""));
    }
}
