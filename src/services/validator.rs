use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde_yaml_ng::Value;
use std::collections::HashMap;

use super::diagnostics::Diagnostic;
use super::documents::{DocumentFormat, list_documents, load_document};
use super::report::{ValidationReport, ValidationSummary};
use super::shape::{check_custom_format, check_manifest, check_profile};
use crate::metrics::RunMetrics;
use crate::models::{FormatList, Manifest, QualityProfile, RepoLayout, references_in_document};

const DOCUMENT_FORMATS: [DocumentFormat; 2] = [DocumentFormat::Yaml, DocumentFormat::Json];

/// Custom format names and the files defining them, in first-seen order.
#[derive(Debug, Default)]
struct FormatIndex {
    definitions: IndexMap<String, Vec<Utf8PathBuf>>,
}

impl FormatIndex {
    fn insert(&mut self, name: String, path: &Utf8Path) {
        self.definitions.entry(name).or_default().push(path.to_path_buf());
    }

    fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    fn collisions(&self) -> impl Iterator<Item = Diagnostic> + '_ {
        self.definitions
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(name, paths)| Diagnostic::NameCollision {
                name: name.clone(),
                paths: paths.clone(),
            })
    }

    /// Lowercased name → defined name, for case-only mismatch hints.
    fn folded(&self) -> HashMap<String, &str> {
        let mut folded = HashMap::new();
        for name in self.definitions.keys() {
            folded.entry(name.to_lowercase()).or_insert(name.as_str());
        }
        folded
    }
}

/// Cross-file validator for a custom format database.
///
/// Checks syntax and shape of every custom format and profile, custom format
/// name uniqueness, profile references and the manifest. Per-file problems
/// are collected into a [`ValidationReport`]; only an unreadable data
/// directory aborts the run. Input files are never modified.
#[derive(Debug, Clone)]
pub struct Validator {
    layout: RepoLayout,
}

impl Validator {
    pub fn new(layout: RepoLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &RepoLayout {
        &self.layout
    }

    /// Run the full validation pass.
    ///
    /// # Errors
    ///
    /// Fails if the custom format or profile directory cannot be listed.
    pub fn validate(&self, metrics: &RunMetrics) -> Result<ValidationReport> {
        let mut diagnostics = Vec::new();
        let mut summary = ValidationSummary::default();

        let index = self.check_custom_formats(&mut diagnostics, &mut summary, metrics)?;
        diagnostics.extend(index.collisions());
        summary.custom_formats = index.definitions.len();

        self.check_profiles(&index, &mut diagnostics, &mut summary, metrics)?;
        self.check_manifest(&mut diagnostics, &mut summary, metrics);

        metrics.record_errors(diagnostics.len());
        tracing::info!(
            "Validation finished with {} problem(s) across {} custom format(s) and {} profile(s)",
            diagnostics.len(),
            summary.custom_format_files,
            summary.profile_files
        );
        Ok(ValidationReport {
            diagnostics,
            summary,
        })
    }

    /// Only check that every document parses.
    ///
    /// # Errors
    ///
    /// Fails if the custom format or profile directory cannot be listed.
    pub fn check_syntax(&self, metrics: &RunMetrics) -> Result<ValidationReport> {
        let mut diagnostics = Vec::new();
        let mut summary = ValidationSummary::default();

        let cf_paths = list_documents(&self.layout.custom_formats, &DOCUMENT_FORMATS)?;
        let profile_paths = list_documents(&self.layout.profiles, &DOCUMENT_FORMATS)?;
        summary.custom_format_files = cf_paths.len();
        summary.profile_files = profile_paths.len();

        let manifest = self.layout.manifest.is_file().then_some(&self.layout.manifest);
        summary.manifest_checked = manifest.is_some();

        for path in cf_paths.iter().chain(&profile_paths).chain(manifest) {
            metrics.record_file_scanned();
            if let Err(diagnostic) = load_document(path) {
                diagnostics.push(diagnostic);
            }
        }

        metrics.record_errors(diagnostics.len());
        Ok(ValidationReport {
            diagnostics,
            summary,
        })
    }

    fn check_custom_formats(
        &self,
        diagnostics: &mut Vec<Diagnostic>,
        summary: &mut ValidationSummary,
        metrics: &RunMetrics,
    ) -> Result<FormatIndex> {
        let paths = list_documents(&self.layout.custom_formats, &DOCUMENT_FORMATS)?;
        tracing::info!("Checking {} custom format file(s) in {}", paths.len(), self.layout.custom_formats);
        summary.custom_format_files = paths.len();

        let mut index = FormatIndex::default();
        for path in &paths {
            metrics.record_file_scanned();
            let document = match load_document(path) {
                Ok(document) => document,
                Err(diagnostic) => {
                    tracing::debug!("{}", diagnostic);
                    diagnostics.push(diagnostic);
                    continue;
                }
            };

            metrics.record_record_checked();
            let (name, problems) = check_custom_format(path, &document);
            diagnostics.extend(problems);
            if let Some(name) = name {
                index.insert(name, path);
            }
        }
        Ok(index)
    }

    fn check_profiles(
        &self,
        index: &FormatIndex,
        diagnostics: &mut Vec<Diagnostic>,
        summary: &mut ValidationSummary,
        metrics: &RunMetrics,
    ) -> Result<()> {
        let paths = list_documents(&self.layout.profiles, &DOCUMENT_FORMATS)?;
        tracing::info!("Checking {} profile file(s) in {}", paths.len(), self.layout.profiles);
        summary.profile_files = paths.len();

        let folded = index.folded();
        for path in &paths {
            metrics.record_file_scanned();
            let document = match load_document(path) {
                Ok(document) => document,
                Err(diagnostic) => {
                    tracing::debug!("{}", diagnostic);
                    diagnostics.push(diagnostic);
                    continue;
                }
            };

            metrics.record_record_checked();
            let problems = check_profile(path, &document);
            let shape_ok = problems.is_empty();
            diagnostics.extend(problems);

            let references = profile_references(path, &document, shape_ok, diagnostics);
            metrics.record_references_checked(references.len());
            summary.references_checked += references.len();

            for (list, name) in references {
                if index.contains(&name) {
                    continue;
                }
                let suggestion = folded.get(&name.to_lowercase()).map(|s| s.to_string());
                tracing::debug!("{}: unresolved reference '{}' in {}", path, name, list);
                diagnostics.push(Diagnostic::DanglingReference {
                    path: path.clone(),
                    list,
                    name,
                    suggestion,
                });
            }
        }
        Ok(())
    }

    fn check_manifest(
        &self,
        diagnostics: &mut Vec<Diagnostic>,
        summary: &mut ValidationSummary,
        metrics: &RunMetrics,
    ) {
        let path = &self.layout.manifest;
        if !path.is_file() {
            if self.layout.require_manifest {
                diagnostics.push(Diagnostic::shape(path, "(file)", "manifest is required but missing"));
            } else {
                tracing::debug!("No manifest at {}, skipping", path);
            }
            return;
        }

        metrics.record_file_scanned();
        summary.manifest_checked = true;
        let document = match load_document(path) {
            Ok(document) => document,
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                return;
            }
        };

        metrics.record_record_checked();
        let problems = check_manifest(path, &document);
        if !problems.is_empty() {
            diagnostics.extend(problems);
            return;
        }
        match serde_yaml_ng::from_value::<Manifest>(document) {
            Ok(manifest) => tracing::info!(
                "Manifest requires Profilarr {} (schema {})",
                manifest.profilarr.minimum_version,
                manifest.dependencies.schema
            ),
            Err(e) => diagnostics.push(Diagnostic::shape(path, "(record)", e.to_string())),
        }
    }
}

/// References of a profile. Shape-clean profiles are decoded into
/// [`QualityProfile`]; broken ones fall back to a lenient walk of the document
/// so their references are still checked.
fn profile_references(
    path: &Utf8Path,
    document: &Value,
    shape_ok: bool,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<(FormatList, String)> {
    if shape_ok {
        match serde_yaml_ng::from_value::<QualityProfile>(document.clone()) {
            Ok(profile) => {
                return profile
                    .references()
                    .into_iter()
                    .map(|(list, name)| (list, name.to_string()))
                    .collect();
            }
            Err(e) => diagnostics.push(Diagnostic::shape(path, "(record)", e.to_string())),
        }
    }
    references_in_document(document)
}
