use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// Tool configuration from `.pcd-tools.yaml` and `PCD_*` environment variables.
///
/// Every directory is relative to the repository root handed to
/// [`ToolConfig::layout`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub custom_formats_dir: String,
    pub profiles_dir: String,
    pub regex_patterns_dir: String,

    /// Where raw TRaSH JSON exports are dropped before import.
    pub trash_source_dir: String,

    pub manifest_file: String,

    /// Report a missing manifest as an error instead of skipping the check.
    pub require_manifest: bool,

    pub logging: LoggingConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            custom_formats_dir: default_custom_formats_dir(),
            profiles_dir: default_profiles_dir(),
            regex_patterns_dir: default_regex_patterns_dir(),
            trash_source_dir: default_trash_source_dir(),
            manifest_file: default_manifest_file(),
            require_manifest: false,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `pcd_tools=debug`.
    pub level: String,

    /// Emit console logs as JSON lines.
    pub json: bool,

    /// Directory for daily rotating log files. No file logging when unset.
    pub file_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_dir: None,
        }
    }
}

fn default_custom_formats_dir() -> String {
    "custom_formats".to_string()
}

fn default_profiles_dir() -> String {
    "profiles".to_string()
}

fn default_regex_patterns_dir() -> String {
    "regex_patterns".to_string()
}

fn default_trash_source_dir() -> String {
    "ops/custom_formats".to_string()
}

fn default_manifest_file() -> String {
    "pcd.json".to_string()
}

/// Resolved locations of every data directory in a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    pub root: Utf8PathBuf,
    pub custom_formats: Utf8PathBuf,
    pub profiles: Utf8PathBuf,
    pub regex_patterns: Utf8PathBuf,
    pub trash_source: Utf8PathBuf,
    pub manifest: Utf8PathBuf,
    pub require_manifest: bool,
}

impl ToolConfig {
    /// Resolve the configured directories against a repository root.
    pub fn layout(&self, root: &Utf8Path) -> RepoLayout {
        RepoLayout {
            root: root.to_path_buf(),
            custom_formats: root.join(&self.custom_formats_dir),
            profiles: root.join(&self.profiles_dir),
            regex_patterns: root.join(&self.regex_patterns_dir),
            trash_source: root.join(&self.trash_source_dir),
            manifest: root.join(&self.manifest_file),
            require_manifest: self.require_manifest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_config_defaults() {
        let config = ToolConfig::default();
        assert_eq!(config.custom_formats_dir, "custom_formats");
        assert_eq!(config.profiles_dir, "profiles");
        assert_eq!(config.manifest_file, "pcd.json");
        assert!(!config.require_manifest);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file_dir.is_none());
    }

    #[test]
    fn test_layout_joins_root() {
        let layout = ToolConfig::default().layout(Utf8Path::new("/repo"));
        assert_eq!(layout.custom_formats, Utf8PathBuf::from("/repo/custom_formats"));
        assert_eq!(layout.trash_source, Utf8PathBuf::from("/repo/ops/custom_formats"));
        assert_eq!(layout.manifest, Utf8PathBuf::from("/repo/pcd.json"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: ToolConfig = serde_yaml_ng::from_str("profiles_dir: quality_profiles\n").unwrap();
        assert_eq!(config.profiles_dir, "quality_profiles");
        assert_eq!(config.custom_formats_dir, "custom_formats");
    }
}
