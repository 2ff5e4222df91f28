//! Maintenance of the `regex_patterns/` collection.
//!
//! Profilarr looks regex patterns up by exact pattern text, so every
//! `pattern` used by a custom format condition needs a matching record.
//! [`PatternMaintainer::generate_missing_patterns`] writes the missing ones and
//! [`PatternMaintainer::normalize_pattern_names`] tidies the file names the
//! generator had to disambiguate.

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde_yaml_ng::Value;
use std::collections::HashSet;
use std::fs;

use super::diagnostics::Diagnostic;
use super::documents::{DocumentFormat, ensure_dir, list_documents, load_document, write_yaml};
use crate::metrics::RunMetrics;
use crate::models::{RegexPattern, generated_source};

const MAX_STEM_CHARS: usize = 100;

const AUDIO_KEYWORDS: &[&str] = &[
    "atmos", "dts", "truehd", "aac", "flac", "pcm", "dolby", "surround", "stereo", "mono",
    "sound", "audio",
];

const VIDEO_KEYWORDS: &[&str] = &[
    "hdr", "dv", "dolby vision", "hevc", "h265", "h264", "x264", "x265", "av1", "remux",
    "bluray", "webdl", "webrip",
];

const STREAMING_KEYWORDS: &[&str] = &[
    "netflix", "amazon", "amzn", "disney", "dsnp", "hbo", "hmax", "apple", "atvp", "hulu",
    "peacock", "paramount", "crunchyroll",
];

const ANIME_CONDITION_KEYWORDS: &[&str] = &["fansub", "dual audio", "uncensored", "raws"];

const RESOLUTION_KEYWORDS: &[&str] = &["1080", "2160", "720", "480", "4k"];

/// A pattern used by a custom format condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternUse {
    pub pattern: String,
    pub condition_name: String,
    pub custom_format: String,
}

/// Outcome of [`PatternMaintainer::generate_missing_patterns`].
#[derive(Debug, Default)]
pub struct GenerationSummary {
    pub created: Vec<Utf8PathBuf>,
    /// Patterns still without a record after generation.
    pub still_missing: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A pattern file moved to a new name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub from: Utf8PathBuf,
    pub to: Utf8PathBuf,
}

/// Outcome of [`PatternMaintainer::normalize_pattern_names`].
#[derive(Debug, Default)]
pub struct NormalizeSummary {
    pub renamed: Vec<Rename>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Generates and renames regex pattern records.
///
/// The regexes used for file naming are compiled once at construction.
pub struct PatternMaintainer {
    /// Characters that are not allowed in file names on common filesystems
    unsafe_chars: Regex,

    /// Runs of whitespace and underscores, collapsed to one space
    separator_runs: Regex,

    /// A disambiguation suffix such as "Name (2)", capturing the base name
    numbered_suffix: Regex,
}

impl Default for PatternMaintainer {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMaintainer {
    pub fn new() -> Self {
        Self {
            unsafe_chars: Regex::new(r#"[<>:"/\\|?*]"#).expect("Invalid unsafe character regex"),
            separator_runs: Regex::new(r"[\s_]+").expect("Invalid separator regex"),
            numbered_suffix: Regex::new(r"^(.+?)\s*\(\d+\)$").expect("Invalid suffix regex"),
        }
    }

    /// File stem for a generated record, derived from its condition name.
    pub fn sanitize_file_stem(&self, name: &str) -> String {
        let replaced = self.unsafe_chars.replace_all(name, "_");
        let collapsed = self.separator_runs.replace_all(&replaced, " ");
        let stem = truncate(collapsed.trim());
        if stem.is_empty() {
            "pattern".to_string()
        } else {
            stem
        }
    }

    /// File stem for a renamed record. A leading `#` becomes `Hash`.
    pub fn safe_file_stem(&self, name: &str) -> String {
        let name = match name.strip_prefix('#') {
            Some(rest) => format!("Hash{rest}"),
            None => name.to_string(),
        };
        truncate(self.unsafe_chars.replace_all(&name, "_").trim())
    }

    /// `"<base> (<custom format>)"` for a stem with a numeric suffix whose
    /// record was generated from a custom format. Other stems are returned
    /// unchanged.
    pub fn descriptive_stem(&self, stem: &str, description: &str) -> String {
        let Some(base) = self.numbered_suffix.captures(stem).and_then(|c| c.get(1)) else {
            return stem.to_string();
        };
        match generated_source(description) {
            Some(source) => self.safe_file_stem(&format!("{} ({})", base.as_str().trim(), source)),
            None => stem.to_string(),
        }
    }

    /// Write a record for every custom format pattern that has none.
    ///
    /// # Errors
    ///
    /// Fails if the custom format directory cannot be listed or the pattern
    /// directory cannot be created or listed.
    pub fn generate_missing_patterns(
        &self,
        custom_formats_dir: &Utf8Path,
        patterns_dir: &Utf8Path,
        metrics: &RunMetrics,
    ) -> Result<GenerationSummary> {
        let mut summary = GenerationSummary::default();

        let existing = load_existing_patterns(patterns_dir, &mut summary.diagnostics, metrics)?;
        tracing::info!("Found {} existing pattern record(s)", existing.len());

        let uses = extract_pattern_uses(custom_formats_dir, &mut summary.diagnostics, metrics)?;
        tracing::info!("Found {} pattern use(s) in custom formats", uses.len());

        let mut seen = HashSet::new();
        let missing: Vec<&PatternUse> = uses
            .iter()
            .filter(|u| !existing.contains_key(&u.pattern) && seen.insert(u.pattern.as_str()))
            .collect();

        if missing.is_empty() {
            tracing::info!("All patterns already have records");
            return Ok(summary);
        }

        ensure_dir(patterns_dir)?;
        let mut used_stems = existing_stems(patterns_dir)?;

        tracing::info!("Generating {} pattern record(s)", missing.len());
        for pattern_use in missing {
            let path = self.unique_path(patterns_dir, &pattern_use.condition_name, &mut used_stems);
            let record = RegexPattern::generated(
                pattern_use.condition_name.clone(),
                pattern_use.pattern.clone(),
                &pattern_use.custom_format,
                infer_tags(
                    &pattern_use.condition_name,
                    &pattern_use.pattern,
                    &pattern_use.custom_format,
                ),
            );
            match write_yaml(&path, &record) {
                Ok(()) => {
                    metrics.record_file_written();
                    summary.created.push(path);
                }
                Err(diagnostic) => {
                    tracing::warn!("{}", diagnostic);
                    summary.diagnostics.push(diagnostic);
                }
            }
        }

        let mut ignored = Vec::new();
        let covered = load_existing_patterns(patterns_dir, &mut ignored, &RunMetrics::new())?;
        summary.still_missing = uses
            .iter()
            .map(|u| u.pattern.clone())
            .filter(|p| !covered.contains_key(p))
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();

        if summary.still_missing.is_empty() {
            tracing::info!("Created {} pattern record(s); every pattern is covered", summary.created.len());
        } else {
            tracing::warn!(
                "Created {} pattern record(s); {} pattern(s) still missing",
                summary.created.len(),
                summary.still_missing.len()
            );
        }
        metrics.record_errors(summary.diagnostics.len());
        Ok(summary)
    }

    /// `<dir>/<stem>.yml` for a new record, with ` (<n>)` appended until the
    /// stem is unused. Stems are compared case-insensitively.
    fn unique_path(&self, dir: &Utf8Path, name: &str, used: &mut HashSet<String>) -> Utf8PathBuf {
        let base = self.sanitize_file_stem(name);
        let mut stem = base.clone();
        let mut counter = 1;
        while used.contains(&stem.to_lowercase()) || dir.join(format!("{stem}.yml")).exists() {
            stem = format!("{base} ({counter})");
            counter += 1;
        }
        used.insert(stem.to_lowercase());
        dir.join(format!("{stem}.yml"))
    }

    /// Rename generated records whose stems carry a numeric suffix or start
    /// with `#`. The record's `name` follows the new stem.
    ///
    /// # Errors
    ///
    /// Fails if the pattern directory cannot be listed.
    pub fn normalize_pattern_names(
        &self,
        patterns_dir: &Utf8Path,
        metrics: &RunMetrics,
    ) -> Result<NormalizeSummary> {
        let paths = list_documents(patterns_dir, &[DocumentFormat::Yaml])?;
        let mut summary = NormalizeSummary::default();
        let mut used: HashSet<String> = paths
            .iter()
            .filter(|p| p.extension() == Some("yml"))
            .filter_map(|p| p.file_stem())
            .map(str::to_lowercase)
            .collect();

        let mut planned = Vec::new();
        for path in paths.iter().filter(|p| p.extension() == Some("yml")) {
            metrics.record_file_scanned();
            let document = match load_document(path) {
                Ok(Value::Null) => continue,
                Ok(document) => document,
                Err(diagnostic) => {
                    tracing::warn!("{}", diagnostic);
                    summary.diagnostics.push(diagnostic);
                    continue;
                }
            };
            let Some(stem) = path.file_stem() else { continue };
            if let Some(new_stem) = self.planned_stem(stem, &document) {
                planned.push((path.clone(), new_stem, document));
            }
        }
        tracing::info!("Found {} pattern file(s) to rename", planned.len());

        for (old_path, new_stem, mut document) in planned {
            let old_stem = old_path.file_stem().unwrap_or_default().to_lowercase();
            let mut final_stem = new_stem.clone();
            let mut counter = 1;
            while used.contains(&final_stem.to_lowercase()) && final_stem.to_lowercase() != old_stem {
                final_stem = format!("{new_stem} {counter}");
                counter += 1;
            }
            if final_stem.to_lowercase() == old_stem {
                continue;
            }

            let new_path = patterns_dir.join(format!("{final_stem}.yml"));
            if let Value::Mapping(map) = &mut document {
                map.insert(Value::from("name"), Value::from(final_stem.as_str()));
            }
            if let Err(diagnostic) = write_yaml(&new_path, &document) {
                tracing::warn!("{}", diagnostic);
                summary.diagnostics.push(diagnostic);
                continue;
            }
            if let Err(e) = fs::remove_file(&old_path) {
                summary.diagnostics.push(Diagnostic::io(&old_path, &e));
            }

            used.remove(&old_stem);
            used.insert(final_stem.to_lowercase());
            metrics.record_file_written();
            tracing::info!("Renamed {} -> {}", old_path, new_path);
            summary.renamed.push(Rename {
                from: old_path,
                to: new_path,
            });
        }

        metrics.record_errors(summary.diagnostics.len());
        tracing::info!("Renamed {} pattern file(s)", summary.renamed.len());
        Ok(summary)
    }

    fn planned_stem(&self, stem: &str, document: &Value) -> Option<String> {
        let mut new_stem = None;
        if self.numbered_suffix.is_match(stem) {
            let description = document.get("description").and_then(Value::as_str).unwrap_or_default();
            new_stem = Some(self.descriptive_stem(stem, description));
        }
        if let Some(rest) = stem.strip_prefix('#') {
            new_stem = Some(format!("Hash{rest}"));
        }
        new_stem.filter(|s| s != stem)
    }
}

fn truncate(name: &str) -> String {
    name.chars().take(MAX_STEM_CHARS).collect()
}

/// Tags for a generated record, inferred from keywords in the condition name,
/// the pattern and the custom format name.
pub fn infer_tags(condition_name: &str, pattern: &str, custom_format: &str) -> Vec<String> {
    let name = condition_name.to_lowercase();
    let pattern_lower = pattern.to_lowercase();
    let custom_format = custom_format.to_lowercase();
    let mentions =
        |keywords: &[&str]| keywords.iter().any(|kw| name.contains(kw) || pattern_lower.contains(kw));

    let mut tags = Vec::new();
    if name.contains("release_group") || (pattern.starts_with("^(") && pattern.ends_with(")$")) {
        tags.push("Release Group");
    }
    if mentions(AUDIO_KEYWORDS) {
        tags.push("Audio");
    }
    if mentions(VIDEO_KEYWORDS) {
        tags.push("Video");
    }
    if mentions(STREAMING_KEYWORDS) {
        tags.push("Streaming");
    }
    if custom_format.contains("anime") || ANIME_CONDITION_KEYWORDS.iter().any(|kw| name.contains(kw)) {
        tags.push("Anime");
    }
    if RESOLUTION_KEYWORDS.iter().any(|kw| pattern_lower.contains(kw)) {
        tags.push("Resolution");
    }
    tags.into_iter().map(String::from).collect()
}

/// Pattern text → file stem for every `*.yml` record in `dir`. A missing
/// directory has no records.
fn load_existing_patterns(
    dir: &Utf8Path,
    diagnostics: &mut Vec<Diagnostic>,
    metrics: &RunMetrics,
) -> Result<IndexMap<String, String>> {
    let mut patterns = IndexMap::new();
    if !dir.is_dir() {
        return Ok(patterns);
    }
    for path in list_documents(dir, &[DocumentFormat::Yaml])? {
        if path.extension() != Some("yml") {
            continue;
        }
        metrics.record_file_scanned();
        match load_document(&path) {
            Ok(document) => {
                if let (Some(pattern), Some(stem)) =
                    (document.get("pattern").and_then(Value::as_str), path.file_stem())
                {
                    patterns.insert(pattern.to_string(), stem.to_string());
                }
            }
            Err(diagnostic) => {
                tracing::warn!("{}", diagnostic);
                diagnostics.push(diagnostic);
            }
        }
    }
    Ok(patterns)
}

fn existing_stems(dir: &Utf8Path) -> Result<HashSet<String>> {
    Ok(list_documents(dir, &[DocumentFormat::Yaml])?
        .iter()
        .filter(|p| p.extension() == Some("yml"))
        .filter_map(|p| p.file_stem())
        .map(str::to_lowercase)
        .collect())
}

/// Every `conditions[*].pattern` in the custom formats of `dir`, in file order.
fn extract_pattern_uses(
    dir: &Utf8Path,
    diagnostics: &mut Vec<Diagnostic>,
    metrics: &RunMetrics,
) -> Result<Vec<PatternUse>> {
    let mut uses = Vec::new();
    for path in list_documents(dir, &[DocumentFormat::Yaml])? {
        metrics.record_file_scanned();
        let document = match load_document(&path) {
            Ok(document) => document,
            Err(diagnostic) => {
                tracing::warn!("{}", diagnostic);
                diagnostics.push(diagnostic);
                continue;
            }
        };
        let Some(conditions) = document.get("conditions").and_then(Value::as_sequence) else {
            continue;
        };
        metrics.record_record_checked();

        let custom_format = document
            .get("name")
            .and_then(Value::as_str)
            .or(path.file_stem())
            .unwrap_or_default()
            .to_string();
        for condition in conditions {
            let Some(pattern) = condition.get("pattern").and_then(Value::as_str) else {
                continue;
            };
            uses.push(PatternUse {
                pattern: pattern.to_string(),
                condition_name: condition
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
                    .to_string(),
                custom_format: custom_format.clone(),
            });
        }
    }
    Ok(uses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_stem() {
        let m = PatternMaintainer::new();
        assert_eq!(m.sanitize_file_stem("DTS:X"), "DTS X");
        assert_eq!(m.sanitize_file_stem("  a__b   c  "), "a b c");
        assert_eq!(m.sanitize_file_stem("a/b|c?"), "a b c");
        assert_eq!(m.sanitize_file_stem("???"), "pattern");
        assert_eq!(m.sanitize_file_stem(""), "pattern");
        assert_eq!(m.sanitize_file_stem(&"x".repeat(150)).chars().count(), 100);
    }

    #[test]
    fn test_safe_file_stem() {
        let m = PatternMaintainer::new();
        assert_eq!(m.safe_file_stem("#1 Group"), "Hash1 Group");
        assert_eq!(m.safe_file_stem("a:b "), "a_b");
        assert_eq!(m.safe_file_stem("no change"), "no change");
    }

    #[test]
    fn test_descriptive_stem() {
        let m = PatternMaintainer::new();
        assert_eq!(m.descriptive_stem("DTS (1)", "Auto-generated from DTS-HD MA"), "DTS (DTS-HD MA)");
        assert_eq!(m.descriptive_stem("DTS (1)", "Hand written"), "DTS (1)");
        assert_eq!(m.descriptive_stem("DTS", "Auto-generated from DTS-HD MA"), "DTS");
        assert_eq!(m.descriptive_stem("x (2)", "Auto-generated from A/B"), "x (A_B)");
        assert_eq!(m.descriptive_stem("x (2)", "Copied. Auto-generated from A"), "x (2)");
    }

    #[test]
    fn test_infer_tags() {
        assert_eq!(infer_tags("FLUX", "^(FLUX)$", "WEB Tier 01"), vec!["Release Group"]);
        assert_eq!(infer_tags("Atmos", r"\batmos\b", "Atmos"), vec!["Audio"]);
        assert_eq!(infer_tags("x265", r"\bx265\b", "x265 (HD)"), vec!["Video"]);
        assert_eq!(infer_tags("AMZN", r"\bamzn\b", "AMZN"), vec!["Streaming"]);
        assert_eq!(infer_tags("Subs", "subs", "Anime Web Tier 01"), vec!["Anime"]);
        assert_eq!(infer_tags("UHD", r"\b2160p\b", "UHD"), vec!["Resolution"]);
        assert!(infer_tags("Plain", "plain", "Plain").is_empty());
    }

    #[test]
    fn test_planned_stem() {
        let m = PatternMaintainer::new();
        let generated: Value = serde_yaml_ng::from_str("description: Auto-generated from HDR10+").unwrap();
        assert_eq!(m.planned_stem("HDR (1)", &generated), Some("HDR (HDR10+)".to_string()));
        assert_eq!(m.planned_stem("#Group", &generated), Some("HashGroup".to_string()));
        assert_eq!(m.planned_stem("Plain", &generated), None);

        let manual: Value = serde_yaml_ng::from_str("description: manual").unwrap();
        assert_eq!(m.planned_stem("HDR (1)", &manual), None);
    }
}
