use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};

use super::diagnostics::Diagnostic;
use super::documents::{DocumentFormat, ensure_dir, list_documents, load_document, write_yaml};
use crate::metrics::RunMetrics;

/// Outcome of a raw JSON import.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub written: Vec<Utf8PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Copy every `*.json` document in `source` to `<target>/<stem>.yml` without
/// changing its content or key order.
///
/// # Errors
///
/// Fails if `source` cannot be listed or `target` cannot be created.
pub fn import_json(source: &Utf8Path, target: &Utf8Path, metrics: &RunMetrics) -> Result<ImportSummary> {
    let paths = list_documents(source, &[DocumentFormat::Json])?;
    ensure_dir(target)?;
    tracing::info!("Importing {} JSON document(s) from {} into {}", paths.len(), source, target);

    let mut summary = ImportSummary::default();
    for path in &paths {
        metrics.record_file_scanned();
        match import_file(path, target) {
            Ok(written) => {
                metrics.record_file_written();
                summary.written.push(written);
            }
            Err(diagnostic) => {
                tracing::warn!("{}", diagnostic);
                summary.diagnostics.push(diagnostic);
            }
        }
    }

    metrics.record_errors(summary.diagnostics.len());
    tracing::info!(
        "Imported {} document(s), {} failed",
        summary.written.len(),
        summary.diagnostics.len()
    );
    Ok(summary)
}

fn import_file(path: &Utf8Path, target: &Utf8Path) -> Result<Utf8PathBuf, Diagnostic> {
    let document = load_document(path)?;
    let stem = path
        .file_stem()
        .ok_or_else(|| Diagnostic::malformed(path, "file has no name"))?;
    let output = target.join(format!("{stem}.yml"));
    write_yaml(&output, &document)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_import_keeps_key_order() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        let source = root.join("ops");
        let target = root.join("out");
        fs::create_dir_all(&source).unwrap();
        fs::write(
            source.join("x265.json"),
            r#"{"trash_id": "abc", "name": "x265", "specifications": []}"#,
        )
        .unwrap();
        fs::write(source.join("notes.txt"), "ignored").unwrap();

        let metrics = RunMetrics::new();
        let summary = import_json(&source, &target, &metrics).unwrap();
        assert_eq!(summary.written, vec![target.join("x265.yml")]);
        assert!(summary.diagnostics.is_empty());

        let text = fs::read_to_string(target.join("x265.yml")).unwrap();
        let keys: Vec<&str> = text
            .lines()
            .filter_map(|line| line.split_once(':').map(|(k, _)| k))
            .collect();
        assert_eq!(keys, vec!["trash_id", "name", "specifications"]);
    }

    #[test]
    fn test_import_continues_after_bad_file() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::write(root.join("a.json"), "{ not json").unwrap();
        fs::write(root.join("b.json"), r#"{"name": "B"}"#).unwrap();
        let target = root.join("out");

        let summary = import_json(&root, &target, &RunMetrics::new()).unwrap();
        assert_eq!(summary.written.len(), 1);
        assert_eq!(summary.diagnostics.len(), 1);
        assert_eq!(summary.diagnostics[0].kind(), "parse");
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        assert!(import_json(&root.join("missing"), &root.join("out"), &RunMetrics::new()).is_err());
    }
}
