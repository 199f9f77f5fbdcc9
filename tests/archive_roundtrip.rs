use std::fs::{self, File};
use std::io::Write;

use portal_sync::archive;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

fn write_file(root: &std::path::Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Build an in-memory zip with only file entries (no directory entries).
fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(&mut cursor);
    for (name, contents) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap();
    cursor.into_inner()
}

#[test]
fn pack_excluded_files_are_never_added() {
    let root = TempDir::new().unwrap();
    write_file(root.path(), "index.html", b"<html></html>");
    write_file(root.path(), "css/app.css", b"body {}");
    write_file(root.path(), "node_modules/dep/index.js", b"module.exports = 1;");
    write_file(root.path(), "debug.log", b"noise");

    let excludes =
        archive::compile_excludes(&["^node_modules".to_string(), "\\.log$".to_string()]).unwrap();
    let (tmp, manifest) = archive::pack(root.path(), &excludes).unwrap();

    let names = manifest.names();
    assert!(names.contains(&"index.html"));
    assert!(names.contains(&"css/app.css"));
    assert!(!names.iter().any(|n| n.starts_with("node_modules")));
    assert!(!names.iter().any(|n| n.ends_with(".log")));

    // The archive on disk agrees with the manifest.
    let mut produced = ZipArchive::new(File::open(tmp.path()).unwrap()).unwrap();
    let produced_names: Vec<String> = (0..produced.len())
        .map(|i| produced.by_index(i).unwrap().name().to_string())
        .collect();
    assert!(!produced_names.iter().any(|n| n.contains("node_modules")));
    assert!(produced_names.contains(&"index.html".to_string()));
}

#[test]
fn pack_matched_directory_prunes_its_subtree() {
    let root = TempDir::new().unwrap();
    write_file(root.path(), "keep/a.txt", b"a");
    write_file(root.path(), "skip/deep/nested/b.txt", b"b");

    let excludes = archive::compile_excludes(&["^skip$".to_string()]).unwrap();
    let (_tmp, manifest) = archive::pack(root.path(), &excludes).unwrap();

    assert_eq!(manifest.names(), vec!["keep/a.txt"]);
}

#[test]
fn pack_rejects_invalid_exclude_patterns() {
    assert!(archive::compile_excludes(&["[broken".to_string()]).is_err());
}

/// Extracting a zip with only file entries recreates every file at the correct
/// relative path with matching byte length.
#[test]
fn unpack_recreates_files_without_directory_entries() {
    let body = zip_of(&[
        ("index.html", b"<html>home</html>" as &[u8]),
        ("js/app.js", b"console.log(1);"),
        ("img/deep/pixel.gif", &[0u8; 43]),
    ]);

    let root = TempDir::new().unwrap();
    let manifest = archive::unpack(&body, root.path()).unwrap();

    assert_eq!(manifest.entries.len(), 3);
    assert_eq!(manifest.total_bytes(), 17 + 15 + 43);
    assert_eq!(
        fs::read(root.path().join("index.html")).unwrap(),
        b"<html>home</html>"
    );
    assert_eq!(
        fs::metadata(root.path().join("js/app.js")).unwrap().len(),
        15
    );
    assert_eq!(
        fs::metadata(root.path().join("img/deep/pixel.gif"))
            .unwrap()
            .len(),
        43
    );
}

#[test]
fn unpack_skips_directory_entries() {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(&mut cursor);
    writer
        .add_directory("assets/", SimpleFileOptions::default())
        .unwrap();
    writer
        .start_file("assets/site.css", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"css").unwrap();
    writer.finish().unwrap();
    let body = cursor.into_inner();

    let root = TempDir::new().unwrap();
    let manifest = archive::unpack(&body, root.path()).unwrap();

    assert_eq!(manifest.names(), vec!["assets/site.css"]);
    assert!(root.path().join("assets/site.css").is_file());
}

#[test]
fn unpack_rejects_entries_escaping_the_content_root() {
    let body = zip_of(&[("../evil.txt", b"nope" as &[u8])]);
    let root = TempDir::new().unwrap();
    assert!(archive::unpack(&body, root.path()).is_err());
}

#[test]
fn unpack_rejects_garbage_bodies() {
    let root = TempDir::new().unwrap();
    assert!(archive::unpack(b"this is not a zip", root.path()).is_err());
}

#[test]
fn read_manifest_lists_files_and_skips_directories() {
    let root = TempDir::new().unwrap();
    let zip_path = root.path().join("prebuilt.zip");
    let mut writer = ZipWriter::new(File::create(&zip_path).unwrap());
    writer
        .add_directory("lib/", SimpleFileOptions::default())
        .unwrap();
    writer
        .start_file("index.htm", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"<html></html>").unwrap();
    writer.finish().unwrap();

    let manifest = archive::read_manifest(&zip_path).unwrap();
    assert_eq!(manifest.names(), vec!["index.htm"]);
    assert!(manifest.contains("index.htm"));
    assert!(!manifest.contains("lib/"));
}
