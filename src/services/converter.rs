//! Conversion of TRaSH-style custom formats into the Dictionarry layout.
//!
//! [`convert_document`] is a pure function of one record. [`Converter`] runs it
//! over a directory and writes one `<stem>.yml` per input.

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use serde_yaml_ng::Value;
use std::collections::HashSet;
use thiserror::Error;

use super::diagnostics::Diagnostic;
use super::documents::{
    DocumentFormat, ensure_dir, kind_of, list_documents, load_document, write_yaml_if_changed,
};
use crate::metrics::RunMetrics;
use crate::models::{
    Condition, ConditionType, CustomFormat, PartialCustomFormat, Specification, TrashCustomFormat,
};

/// Errors for a single source record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("expected a mapping, found {0}")]
    NotAMapping(&'static str),

    #[error("record has no name")]
    MissingName,

    #[error("record has neither specifications nor conditions")]
    NoConditions,

    #[error("record could not be decoded: {0}")]
    Undecodable(String),
}

/// A converted record plus what the conversion had to leave behind.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub format: CustomFormat,
    /// Top-level keys outside the converted set, dropped from the output.
    pub dropped_fields: Vec<String>,
    /// Specifications that were dropped or mapped loosely.
    pub warnings: Vec<String>,
}

/// Convert one source record.
///
/// Records with `specifications` are read as TRaSH custom formats. Records
/// that already have `conditions` are normalized: missing `description`,
/// `tags`, `negate` and `required` get their defaults.
pub fn convert_document(document: Value) -> Result<Conversion, ConvertError> {
    let (has_specifications, has_conditions) = match &document {
        Value::Mapping(map) => (
            map.contains_key("specifications"),
            map.contains_key("conditions"),
        ),
        other => return Err(ConvertError::NotAMapping(kind_of(other))),
    };

    if has_specifications {
        let source: TrashCustomFormat = serde_yaml_ng::from_value(document)
            .map_err(|e| ConvertError::Undecodable(e.to_string()))?;
        convert_record(source)
    } else if has_conditions {
        let source: PartialCustomFormat = serde_yaml_ng::from_value(document)
            .map_err(|e| ConvertError::Undecodable(e.to_string()))?;
        normalize_record(source)
    } else {
        Err(ConvertError::NoConditions)
    }
}

fn required_name(name: Option<String>) -> Result<String, ConvertError> {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or(ConvertError::MissingName)
}

fn default_description(name: &str) -> String {
    format!("Matches release criteria for {name}")
}

/// Convert a TRaSH record.
pub fn convert_record(source: TrashCustomFormat) -> Result<Conversion, ConvertError> {
    let name = required_name(source.name)?;

    let mut warnings = Vec::new();
    let conditions = source
        .specifications
        .iter()
        .enumerate()
        .filter_map(|(index, spec)| convert_specification(index, spec, &mut warnings))
        .collect();

    Ok(Conversion {
        format: CustomFormat {
            description: source
                .description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| default_description(&name)),
            name,
            tags: source.tags.unwrap_or_default(),
            conditions,
            tests: source.tests,
        },
        dropped_fields: source.extra.into_keys().collect(),
        warnings,
    })
}

/// Fill defaults into a record that already uses `conditions`.
pub fn normalize_record(source: PartialCustomFormat) -> Result<Conversion, ConvertError> {
    let name = required_name(source.name)?;
    Ok(Conversion {
        format: CustomFormat {
            description: source
                .description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| default_description(&name)),
            name,
            tags: source.tags.unwrap_or_default(),
            conditions: source.conditions,
            tests: source.tests,
        },
        dropped_fields: source.extra.into_keys().collect(),
        warnings: Vec::new(),
    })
}

fn convert_specification(
    index: usize,
    spec: &Specification,
    warnings: &mut Vec<String>,
) -> Option<Condition> {
    let Some(value) = spec.value() else {
        warnings.push(format!(
            "specification '{}' ({}) has no value and was dropped",
            spec.name, spec.implementation
        ));
        return None;
    };

    let name = condition_name(index, spec, warnings);
    let mut condition = match spec.implementation.as_str() {
        "ResolutionSpecification" => Condition::with_resolution(&name, resolution_label(value)),
        "SourceSpecification" => Condition::with_source(&name, source_label(value)),
        "ReleaseGroupSpecification" => {
            Condition::with_pattern(&name, ConditionType::ReleaseGroup, scalar_text(value))
        }
        "ReleaseTitleSpecification" => {
            Condition::with_pattern(&name, ConditionType::ReleaseTitle, scalar_text(value))
        }
        "EditionSpecification" => {
            Condition::with_pattern(&name, ConditionType::Edition, scalar_text(value))
        }
        other => {
            warnings.push(format!(
                "specification '{}' uses unsupported implementation '{}'; kept as a release title pattern",
                name, other
            ));
            Condition::with_pattern(&name, ConditionType::ReleaseTitle, scalar_text(value))
        }
    };
    condition.negate = spec.negate;
    condition.required = spec.required;
    Some(condition)
}

/// The specification's name, or one derived from its implementation
/// (`ReleaseTitleSpecification` gives `ReleaseTitle`) when it is blank.
fn condition_name(index: usize, spec: &Specification, warnings: &mut Vec<String>) -> String {
    if !spec.name.trim().is_empty() {
        return spec.name.clone();
    }
    let implementation = spec.implementation.trim();
    let base = implementation
        .strip_suffix("Specification")
        .unwrap_or(implementation)
        .trim();
    let name = if base.is_empty() {
        format!("Condition {}", index + 1)
    } else {
        base.to_string()
    };
    warnings.push(format!(
        "specification {} has no name; named '{}'",
        index + 1,
        name
    ));
    name
}

/// Radarr's resolution value (e.g. `1080`) as a Dictionarry label (`1080p`).
pub fn resolution_label(value: &Value) -> String {
    match value.as_i64() {
        Some(360) => "360p".to_string(),
        Some(480) => "480p".to_string(),
        Some(540) => "540p".to_string(),
        Some(576) => "576p".to_string(),
        Some(720) => "720p".to_string(),
        Some(1080) => "1080p".to_string(),
        Some(2160) => "2160p".to_string(),
        Some(other) => format!("{other}p"),
        None => scalar_text(value),
    }
}

/// Radarr's numeric source id as a Dictionarry source label.
pub fn source_label(value: &Value) -> String {
    match value.as_i64() {
        Some(1) => "cam",
        Some(2) => "telesync",
        Some(3) => "webdl",
        Some(4) => "webrip",
        Some(5) => "dvd",
        Some(6) => "hdtv",
        Some(7) => "bluray",
        Some(8) => "remux",
        Some(9) => "brdisk",
        Some(_) => "unknown",
        None => return scalar_text(value),
    }
    .to_string()
}

/// A record already in the target layout.
fn is_converted(document: &Value) -> bool {
    document.get("conditions").is_some() && document.get("specifications").is_none()
}

/// Convert `source` into `target` with a [`Converter`].
///
/// # Errors
///
/// See [`Converter::run`].
pub fn convert_directory(
    source: &Utf8Path,
    target: &Utf8Path,
    metrics: &RunMetrics,
) -> Result<ConversionSummary> {
    Converter::new(source, target).run(metrics)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Outcome of converting a directory.
#[derive(Debug, Default)]
pub struct ConversionSummary {
    /// Output files written.
    pub written: Vec<Utf8PathBuf>,
    /// Output files that already held the converted text.
    pub unchanged: Vec<Utf8PathBuf>,
    /// Inputs skipped because they were empty, or already converted when
    /// converting in place.
    pub skipped: Vec<Utf8PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Converts every TRaSH custom format in `source_dir` into `target_dir`.
///
/// The two directories may be the same, in which case `.yml` inputs are
/// rewritten in place and documents that already have `conditions` and no
/// `specifications` are left alone. With a separate target those documents
/// are normalized and written like any other record.
#[derive(Debug, Clone)]
pub struct Converter {
    source_dir: Utf8PathBuf,
    target_dir: Utf8PathBuf,
}

impl Converter {
    pub fn new(source_dir: impl Into<Utf8PathBuf>, target_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
        }
    }

    fn in_place(&self) -> bool {
        self.source_dir == self.target_dir
    }

    /// Convert every `*.json`, `*.yml` and `*.yaml` document in the source directory.
    ///
    /// # Errors
    ///
    /// Fails if the source directory cannot be listed or the target directory
    /// cannot be created.
    pub fn run(&self, metrics: &RunMetrics) -> Result<ConversionSummary> {
        let paths = list_documents(
            &self.source_dir,
            &[DocumentFormat::Json, DocumentFormat::Yaml],
        )?;
        ensure_dir(&self.target_dir)?;
        tracing::info!(
            "Converting {} document(s) from {} into {}",
            paths.len(),
            self.source_dir,
            self.target_dir
        );

        let mut summary = ConversionSummary::default();
        let mut targets = HashSet::new();
        for path in &paths {
            metrics.record_file_scanned();
            match self.convert_file(path, &mut targets) {
                Ok(Some((target, true))) => {
                    metrics.record_file_written();
                    summary.written.push(target);
                }
                Ok(Some((target, false))) => {
                    metrics.record_file_skipped();
                    summary.unchanged.push(target);
                }
                Ok(None) => {
                    metrics.record_file_skipped();
                    summary.skipped.push(path.clone());
                }
                Err(diagnostic) => {
                    tracing::warn!("{}", diagnostic);
                    summary.diagnostics.push(diagnostic);
                }
            }
        }

        metrics.record_errors(summary.diagnostics.len());
        tracing::info!(
            "Converted {} custom format(s) ({} unchanged, {} skipped, {} failed)",
            summary.written.len(),
            summary.unchanged.len(),
            summary.skipped.len(),
            summary.diagnostics.len()
        );
        Ok(summary)
    }

    /// Returns the target path and whether it was written, or `None` for an
    /// input that is empty or, in place, already converted.
    fn convert_file(
        &self,
        path: &Utf8Path,
        targets: &mut HashSet<Utf8PathBuf>,
    ) -> Result<Option<(Utf8PathBuf, bool)>, Diagnostic> {
        let document = load_document(path)?;
        if document.is_null() {
            tracing::debug!("Skipping empty document {}", path);
            return Ok(None);
        }
        if self.in_place() && is_converted(&document) {
            tracing::debug!("Skipping {}, already uses conditions", path);
            return Ok(None);
        }

        let conversion =
            convert_document(document).map_err(|e| Diagnostic::malformed(path, e.to_string()))?;
        for warning in &conversion.warnings {
            tracing::warn!("{}: {}", path, warning);
        }
        if !conversion.dropped_fields.is_empty() {
            tracing::debug!("{}: dropped fields {:?}", path, conversion.dropped_fields);
        }

        let stem = path
            .file_stem()
            .ok_or_else(|| Diagnostic::malformed(path, "file has no name"))?;
        let target = self.target_dir.join(format!("{stem}.yml"));
        if !targets.insert(target.clone()) {
            tracing::warn!("{} overwrites output of an earlier input: {}", path, target);
        }

        let written = write_yaml_if_changed(&target, &conversion.format)?;
        Ok(Some((target, written)))
    }
}
