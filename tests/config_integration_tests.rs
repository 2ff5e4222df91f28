//! Integration tests for ConfigManager and settings layering
//!
//! These tests verify:
//! - Defaults apply when no settings file exists
//! - `.pcd-tools.yaml` overrides defaults
//! - `PCD_*` variables override the settings file
//! - Invalid settings are reported as errors

use camino::Utf8PathBuf;
use pcd_tools::ConfigManager;
use pcd_tools::config::CONFIG_FILE_NAME;
use std::fs;
use tempfile::TempDir;

fn create_test_root() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, root)
}

fn no_environment() -> Vec<(String, String)> {
    Vec::new()
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, root) = create_test_root();
    let manager = ConfigManager::new(&root);

    assert_eq!(manager.root(), root.as_path());
    assert_eq!(manager.config_path(), root.join(CONFIG_FILE_NAME).as_path());
}

#[test]
fn test_default_layout() {
    let (_temp_dir, root) = create_test_root();
    let (config, layout) = ConfigManager::new(&root)
        .with_environment(no_environment())
        .layout()
        .unwrap();

    assert_eq!(config.logging.level, "info");
    assert_eq!(layout.custom_formats, root.join("custom_formats"));
    assert_eq!(layout.profiles, root.join("profiles"));
    assert_eq!(layout.regex_patterns, root.join("regex_patterns"));
    assert_eq!(layout.trash_source, root.join("ops/custom_formats"));
    assert_eq!(layout.manifest, root.join("pcd.json"));
    assert!(!layout.require_manifest);
}

#[test]
fn test_settings_file_and_environment_layering() {
    let (_temp_dir, root) = create_test_root();
    fs::write(
        root.join(CONFIG_FILE_NAME),
        "custom_formats_dir: formats\nrequire_manifest: false\nlogging:\n  level: warn\n",
    )
    .unwrap();

    let manager = ConfigManager::new(&root).with_environment([
        ("PCD_REQUIRE_MANIFEST", "true"),
        ("PCD_LOGGING__LEVEL", "debug"),
        ("OTHER_VARIABLE", "ignored"),
    ]);
    let (config, layout) = manager.layout().unwrap();

    assert_eq!(layout.custom_formats, root.join("formats"));
    assert!(layout.require_manifest);
    assert_eq!(config.logging.level, "debug");
    assert!(!config.logging.json);
}

#[test]
fn test_invalid_settings_file() {
    let (_temp_dir, root) = create_test_root();
    fs::write(root.join(CONFIG_FILE_NAME), "require_manifest: [not, a, bool]\n").unwrap();

    let result = ConfigManager::new(&root)
        .with_environment(no_environment())
        .load();
    assert!(result.is_err());
}
