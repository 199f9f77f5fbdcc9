use std::fs::{self, File};
use std::io::Write;

use portal_sync::config::{keys, Config};
use portal_sync::push::PushCommand;
use serde_json::json;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn config_of(pairs: &[(&str, serde_json::Value)]) -> Config {
    let mut config = Config::new();
    for (key, value) in pairs {
        config.set(key, value.clone());
    }
    config
}

fn content_root_with(files: &[&str]) -> TempDir {
    let root = TempDir::new().unwrap();
    for file in files {
        let path = root.path().join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"content").unwrap();
    }
    root
}

/// Push without an explicit mainHtmlFile selects index.html when present.
#[test]
fn main_html_file_defaults_to_index_html() {
    let root = content_root_with(&["index.html", "app.js"]);
    let config = config_of(&[("contentId", json!("abc123"))]);

    let mut push = PushCommand::load(&config, root.path(), false).unwrap();
    push.validate().unwrap();
}

#[test]
fn index_htm_wins_over_index_html() {
    let root = content_root_with(&["index.htm", "index.html"]);
    let config = config_of(&[
        ("contentId", json!("abc123")),
        ("excludes", json!(["index\\.html"])),
    ]);

    // Selection succeeds; the excluded index.html is irrelevant because
    // index.htm is probed first.
    let mut push = PushCommand::load(&config, root.path(), false).unwrap();
    push.validate().unwrap();
}

#[test]
fn missing_main_html_fails_fast_when_non_interactive() {
    let root = content_root_with(&["app.js"]);
    let config = config_of(&[("contentId", json!("abc123"))]);

    let err = PushCommand::load(&config, root.path(), false).unwrap_err();
    assert!(err.to_string().contains("mainHtmlFile"), "got: {err:#}");
}

#[test]
fn explicit_main_html_must_exist_in_content_root() {
    let root = content_root_with(&["index.html"]);
    let config = config_of(&[
        ("contentId", json!("abc123")),
        ("mainHtmlFile", json!("start.html")),
    ]);

    let mut push = PushCommand::load(&config, root.path(), false).unwrap();
    let err = push.validate().unwrap_err();
    assert!(err.to_string().contains("start.html"));
}

#[test]
fn one_of_content_id_name_path_is_required() {
    let root = content_root_with(&["index.html"]);
    let config = Config::new();

    let mut push = PushCommand::load(&config, root.path(), false).unwrap();
    let err = push.validate().unwrap_err();
    assert!(err.to_string().contains(keys::CONTENT_ID), "got: {err:#}");
}

#[test]
fn content_id_and_content_path_conflict() {
    let root = content_root_with(&["index.html"]);
    let config = config_of(&[
        ("contentId", json!("abc123")),
        ("contentPath", json!("/web/apps/demo")),
    ]);

    let mut push = PushCommand::load(&config, root.path(), false).unwrap();
    let err = push.validate().unwrap_err();
    assert!(err.to_string().contains("mutually exclusive"));
}

#[test]
fn content_name_requires_site_area() {
    let root = content_root_with(&["index.html"]);
    let config = config_of(&[("contentName", json!("demo"))]);

    let mut push = PushCommand::load(&config, root.path(), false).unwrap();
    let err = push.validate().unwrap_err();
    assert!(err.to_string().contains(keys::SITE_AREA));
}

#[test]
fn site_area_and_name_join_with_exactly_one_slash() {
    let root = content_root_with(&["index.html"]);

    for (site_area, name) in [
        ("/web/areas", "demo"),
        ("/web/areas/", "demo"),
        ("/web/areas", "/demo"),
    ] {
        let config = config_of(&[
            ("contentName", json!(name)),
            ("siteArea", json!(site_area)),
        ]);
        let mut push = PushCommand::load(&config, root.path(), false).unwrap();
        push.validate().unwrap();
        assert_eq!(push.content_path(), Some("/web/areas/demo"));
    }
}

#[test]
fn prebuilt_zip_supplies_the_main_html_probe() {
    let dir = TempDir::new().unwrap();
    let zip_path = dir.path().join("bundle.zip");
    let mut writer = ZipWriter::new(File::create(&zip_path).unwrap());
    writer
        .start_file("index.htm", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"<html></html>").unwrap();
    writer.finish().unwrap();

    let config = config_of(&[
        ("contentId", json!("abc123")),
        ("prebuiltZip", json!(zip_path.to_str().unwrap())),
    ]);

    // The content root does not need to exist when pushing a prebuilt zip.
    let mut push = PushCommand::load(&config, dir.path().join("nowhere").as_path(), false).unwrap();
    push.validate().unwrap();
}

#[test]
fn prebuilt_zip_without_main_html_fails_validation() {
    let dir = TempDir::new().unwrap();
    let zip_path = dir.path().join("bundle.zip");
    let mut writer = ZipWriter::new(File::create(&zip_path).unwrap());
    writer
        .start_file("app.js", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"1;").unwrap();
    writer.finish().unwrap();

    let config = config_of(&[
        ("contentId", json!("abc123")),
        ("prebuiltZip", json!(zip_path.to_str().unwrap())),
        ("mainHtmlFile", json!("index.html")),
    ]);

    let mut push = PushCommand::load(&config, dir.path(), false).unwrap();
    let err = push.validate().unwrap_err();
    assert!(err.to_string().contains("index.html"));
}

#[test]
fn missing_prebuilt_zip_is_rejected_before_any_network_call() {
    let dir = TempDir::new().unwrap();
    let config = config_of(&[
        ("contentId", json!("abc123")),
        ("prebuiltZip", json!(dir.path().join("gone.zip").to_str().unwrap())),
    ]);

    assert!(PushCommand::load(&config, dir.path(), false).is_err());
}
