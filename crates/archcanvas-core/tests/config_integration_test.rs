use archcanvas_core::{ConfigManager, LogFormat, Settings};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_layered_sources_override_in_order() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("default.toml"),
        r#"
[server]
host = "0.0.0.0"
port = 9000

[canvas]
width = 1000
"#,
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("staging.toml"),
        r#"
[server]
host = "0.0.0.0"
port = 9100

[logging]
level = "debug"
format = "json"
"#,
    )
    .unwrap();

    let settings = ConfigManager::load_from_sources(temp_dir.path(), "staging").unwrap();
    assert_eq!(settings.server.port, 9100);
    assert_eq!(settings.canvas.width, 1000);
    assert_eq!(settings.canvas.height, 500);
    assert_eq!(settings.logging.level, "debug");
    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn test_local_overrides_environment_file() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("default.toml"),
        "[library]\nseed_defaults = true\n",
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("local.toml"),
        "[library]\nseed_defaults = false\n",
    )
    .unwrap();

    let settings = ConfigManager::load_from_sources(temp_dir.path(), "development").unwrap();
    assert!(!settings.library.seed_defaults);
}

#[test]
fn test_empty_directory_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let manager = ConfigManager::new(Some(temp_dir.path().to_path_buf())).unwrap();
    assert_eq!(manager.config_dir(), temp_dir.path());
    assert!(manager.settings().validate().is_ok());
    assert_eq!(manager.settings().canvas.top_offset, 60);
}

#[test]
fn test_invalid_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("default.toml"),
        "[canvas]\nwidth = 0\n",
    )
    .unwrap();
    assert!(ConfigManager::new(Some(temp_dir.path().to_path_buf())).is_err());
}

#[test]
fn test_settings_toml_serialization() {
    let settings = Settings::default();
    let toml = toml::to_string(&settings).unwrap();
    let back: Settings = toml::from_str(&toml).unwrap();
    assert_eq!(back.server.port, settings.server.port);
    assert_eq!(back.canvas.width, settings.canvas.width);
}
