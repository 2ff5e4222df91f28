use crate::models::{RepoLayout, ToolConfig};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};

/// Name of the optional settings file at the repository root.
pub const CONFIG_FILE_NAME: &str = ".pcd-tools.yaml";

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "PCD";

/// Configuration manager for one repository.
///
/// Settings are layered, later sources winning:
/// - built-in defaults ([`ToolConfig::default`])
/// - `.pcd-tools.yaml` at the repository root, if present
/// - `PCD_*` environment variables, with `__` separating nested keys
///   (`PCD_LOGGING__LEVEL=debug`, `PCD_REQUIRE_MANIFEST=true`)
#[derive(Debug, Clone)]
pub struct ConfigManager {
    root: Utf8PathBuf,
    config_path: Utf8PathBuf,
    env_override: Option<config::Map<String, String>>,
}

impl ConfigManager {
    /// Create a ConfigManager for the repository at `root`.
    pub fn new<P: AsRef<Utf8Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            config_path: root.join(CONFIG_FILE_NAME),
            root,
            env_override: None,
        }
    }

    /// Read environment overrides from `vars` instead of the process environment.
    pub fn with_environment<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_override = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Load the effective configuration.
    ///
    /// # Errors
    ///
    /// Fails if the settings file cannot be parsed or a value has the wrong type.
    pub fn load(&self) -> Result<ToolConfig> {
        if self.config_path.is_file() {
            tracing::debug!("Reading settings from {}", self.config_path);
        } else {
            tracing::debug!("No settings file at {}, using defaults", self.config_path);
        }

        let environment = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(self.env_override.clone());

        let settings = Config::builder()
            .add_source(File::new(self.config_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to load settings for {}", self.root))?;

        let config: ToolConfig = settings
            .try_deserialize()
            .with_context(|| format!("Invalid settings in {} or {}_* variables", self.config_path, ENV_PREFIX))?;

        tracing::debug!("Effective settings: {:?}", config);
        Ok(config)
    }

    /// Load the configuration and resolve it against the repository root.
    ///
    /// # Errors
    ///
    /// Fails if [`ConfigManager::load`] fails.
    pub fn layout(&self) -> Result<(ToolConfig, RepoLayout)> {
        let config = self.load()?;
        let layout = config.layout(&self.root);
        Ok((config, layout))
    }

    /// The configuration as YAML, as printed by `pcd config`.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn render(config: &ToolConfig) -> Result<String> {
        serde_yaml_ng::to_string(config).context("Failed to serialize settings to YAML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn manager(temp: &TempDir) -> ConfigManager {
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        ConfigManager::new(root).with_environment(Vec::<(String, String)>::new())
    }

    #[test]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let config = manager(&temp).load().unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "profiles_dir: quality_profiles\nlogging:\n  json: true\n",
        )
        .unwrap();

        let config = manager(&temp).load().unwrap();
        assert_eq!(config.profiles_dir, "quality_profiles");
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.custom_formats_dir, "custom_formats");
    }

    #[test]
    fn test_render_round_trips() {
        let config = ToolConfig::default();
        let yaml = ConfigManager::render(&config).unwrap();
        let parsed: ToolConfig = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
