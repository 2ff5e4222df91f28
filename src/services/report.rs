use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::diagnostics::Diagnostic;

/// Counts of what a validation pass looked at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub custom_format_files: usize,
    pub profile_files: usize,
    /// Distinct custom format names defined.
    pub custom_formats: usize,
    pub references_checked: usize,
    pub manifest_checked: bool,
}

/// Result of a validation pass: every diagnostic in report order plus a summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
    pub summary: ValidationSummary,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of diagnostics per kind, keyed by [`Diagnostic::kind`].
    pub fn counts_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for diagnostic in &self.diagnostics {
            *counts.entry(diagnostic.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn count(&self, kind: &str) -> usize {
        self.diagnostics.iter().filter(|d| d.kind() == kind).count()
    }

    /// Plain text rendering: one line per diagnostic followed by a summary line.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for diagnostic in &self.diagnostics {
            let _ = writeln!(out, "{diagnostic}");
        }

        let s = &self.summary;
        if self.is_clean() {
            let _ = writeln!(
                out,
                "OK: {} custom format file(s), {} profile file(s), {} reference(s) checked; no problems found.",
                s.custom_format_files, s.profile_files, s.references_checked
            );
        } else {
            let breakdown = self
                .counts_by_kind()
                .into_iter()
                .map(|(kind, n)| format!("{n} {kind}"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                out,
                "FAILED: {} problem(s) ({breakdown}) in {} custom format file(s) and {} profile file(s).",
                self.diagnostics.len(),
                s.custom_format_files,
                s.profile_files
            );
        }
        out
    }

    /// JSON rendering for tooling.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
