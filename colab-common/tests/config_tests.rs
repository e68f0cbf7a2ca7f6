//! Integration tests for bootstrap configuration
//!
//! **Test Coverage:**
//! - TOML file loading (present, missing, malformed)
//! - Root folder priority: CLI > environment > TOML > default
//!
//! Tests touching `COLAB_ROOT_FOLDER` run serially.

use std::path::PathBuf;

use colab_common::config::{
    default_root_folder, load_toml_config, CliOverrides, RootFolderResolver, ServerConfig,
    TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).expect("Failed to write config");
    path
}

#[test]
fn test_load_config_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(
        &dir,
        r#"
root_folder = "/srv/colab"
port = 6100
session_ttl_hours = 12

[logging]
level = "debug"
"#,
    );

    let config = load_toml_config(&path).expect("Config should load");
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/colab")));
    assert_eq!(config.port, 6100);
    assert_eq!(config.session_ttl_hours, 12);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.event_bus_capacity, 256, "Unset fields keep defaults");
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = load_toml_config(&dir.path().join("absent.toml")).expect("Missing file is not fatal");
    assert_eq!(config.port, TomlConfig::default().port);
}

#[test]
fn test_malformed_config_file_is_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_config(&dir, "port = \"not a number\"");
    let err = load_toml_config(&path).unwrap_err();
    assert!(matches!(err, colab_common::Error::Config(_)), "got {:?}", err);
}

#[test]
#[serial]
fn test_root_folder_priority() {
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };
    let cli = PathBuf::from("/from/cli");

    std::env::set_var(ROOT_FOLDER_ENV, "/from/env");
    assert_eq!(
        RootFolderResolver::new(Some(cli.as_path()), Some(&toml)).resolve(),
        PathBuf::from("/from/cli")
    );
    assert_eq!(
        RootFolderResolver::new(None, Some(&toml)).resolve(),
        PathBuf::from("/from/env")
    );

    std::env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(
        RootFolderResolver::new(None, Some(&toml)).resolve(),
        PathBuf::from("/from/toml")
    );
    assert_eq!(RootFolderResolver::new(None, None).resolve(), default_root_folder());
}

#[test]
#[serial]
fn test_server_config_uses_env_root_for_database() {
    std::env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = ServerConfig::resolve(&CliOverrides::default(), &TomlConfig::default())
        .expect("Defaults should resolve");
    std::env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(config.root_folder, PathBuf::from("/from/env"));
    assert_eq!(config.database_path, PathBuf::from("/from/env/colab.db"));
    assert_eq!(config.port, 5780);
}
