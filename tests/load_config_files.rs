use std::fs;

use portal_sync::config::{keys, Config, ConfigError};
use portal_sync::load_config::{self, CONFIG_FILE, HOME_ENV};
use serde_json::json;
use serial_test::serial;
use tempfile::TempDir;

#[test]
fn missing_config_file_yields_an_empty_config() {
    let folder = TempDir::new().unwrap();
    let config = load_config::load_config_file(folder.path()).unwrap();
    assert!(config.is_empty());
}

#[test]
fn config_file_keys_load_case_insensitively() {
    let folder = TempDir::new().unwrap();
    fs::write(
        folder.path().join(CONFIG_FILE),
        r#"{"PortalServer": "https://example.com", "excludes": ["node_modules"]}"#,
    )
    .unwrap();

    let config = load_config::load_config_file(folder.path()).unwrap();
    assert_eq!(
        config.get_string(keys::PORTAL_SERVER).unwrap().as_deref(),
        Some("https://example.com")
    );
    assert_eq!(
        config.get_string_array(keys::EXCLUDES).unwrap(),
        Some(vec!["node_modules".to_string()])
    );
}

#[test]
fn malformed_config_file_is_a_parse_error() {
    let folder = TempDir::new().unwrap();
    fs::write(folder.path().join(CONFIG_FILE), "{not json").unwrap();

    let err = load_config::load_config_file(folder.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got {err:?}");
}

#[test]
fn top_level_non_object_is_a_parse_error() {
    let folder = TempDir::new().unwrap();
    fs::write(folder.path().join(CONFIG_FILE), "[1, 2, 3]").unwrap();

    let err = load_config::load_config_file(folder.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

/// Home folder < content root < command line, per key.
#[test]
#[serial]
fn resolve_applies_source_precedence() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    std::env::set_var(HOME_ENV, home.path());

    fs::write(
        home.path().join(CONFIG_FILE),
        r#"{"portalUser": "home-user", "connectTimeout": 1000, "laxSSL": true}"#,
    )
    .unwrap();
    fs::write(
        root.path().join(CONFIG_FILE),
        r#"{"portalUser": "root-user", "connectTimeout": 2000}"#,
    )
    .unwrap();

    let mut overlay = Config::new();
    overlay.set(keys::PORTAL_USER, json!("cli-user"));

    let merged = load_config::resolve(root.path(), overlay).unwrap();
    assert_eq!(
        merged.get_string(keys::PORTAL_USER).unwrap().as_deref(),
        Some("cli-user")
    );
    assert_eq!(merged.get_integer(keys::CONNECT_TIMEOUT).unwrap(), Some(2000));
    assert_eq!(merged.get_bool(keys::LAX_SSL).unwrap(), Some(true));

    std::env::remove_var(HOME_ENV);
}

#[test]
#[serial]
fn home_env_overrides_the_home_folder() {
    let home = TempDir::new().unwrap();
    std::env::set_var(HOME_ENV, home.path());
    assert_eq!(load_config::home_folder().unwrap(), home.path());
    std::env::remove_var(HOME_ENV);
}
