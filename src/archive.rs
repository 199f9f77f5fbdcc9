//! Zip packing and unpacking with exclusion filtering.
//!
//! Packing walks the content root in deterministic order, skips anything whose
//! root-relative slash-normalized path matches an exclude pattern (a matched
//! directory prunes its whole subtree), and writes the files into a temp zip.
//! Unpacking extracts every file entry onto the content root, skipping directory
//! entries and rejecting names that would escape the root. Pull extraction is
//! deliberately unfiltered.
//!
//! The [`ZipManifest`] produced by both directions exists purely for logging.

use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use regex::Regex;
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Ordered list of (entry name, size) pairs recorded during pack/unpack.
#[derive(Debug, Clone, Default)]
pub struct ZipManifest {
    pub entries: Vec<ZipEntry>,
}

#[derive(Debug, Clone)]
pub struct ZipEntry {
    pub name: String,
    pub size: u64,
}

impl ZipManifest {
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }
}

/// Compile exclusion patterns. Invalid patterns are configuration errors.
pub fn compile_excludes(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("invalid exclude pattern '{p}'")))
        .collect()
}

/// Whether an entry name matches any exclusion pattern.
pub fn is_excluded(name: &str, excludes: &[Regex]) -> bool {
    excludes.iter().any(|re| re.is_match(name))
}

/// Root-relative entry name with forward slashes.
fn entry_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Zip the content root into a temp file, honoring exclusion patterns.
///
/// Returns the temp file handle (the archive is deleted when it drops) and the
/// manifest of everything that was added.
pub fn pack(content_root: &Path, excludes: &[Regex]) -> Result<(NamedTempFile, ZipManifest)> {
    let tmp = tempfile::Builder::new()
        .prefix("portal-content-")
        .suffix(".zip")
        .tempfile()
        .context("failed to create temp zip file")?;

    let mut writer = ZipWriter::new(tmp.as_file());
    let options = SimpleFileOptions::default();
    let mut manifest = ZipManifest::default();

    let walker = WalkDir::new(content_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(&entry_name(content_root, e.path()), excludes));

    for entry in walker {
        let entry = entry.context("failed to walk content root")?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry_name(content_root, entry.path());
        writer
            .start_file(&name, options)
            .with_context(|| format!("failed to start zip entry '{name}'"))?;
        let mut file = File::open(entry.path())
            .with_context(|| format!("failed to open '{}'", entry.path().display()))?;
        let size = io::copy(&mut file, &mut writer)
            .with_context(|| format!("failed to write zip entry '{name}'"))?;
        manifest.entries.push(ZipEntry { name, size });
    }

    writer.finish().context("failed to finish zip archive")?;
    Ok((tmp, manifest))
}

/// Entry names and sizes of an existing (prebuilt) zip, directories skipped.
pub fn read_manifest(zip_path: &Path) -> Result<ZipManifest> {
    let file = File::open(zip_path)
        .with_context(|| format!("failed to open zip '{}'", zip_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("'{}' is not a valid zip archive", zip_path.display()))?;

    let mut manifest = ZipManifest::default();
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        manifest.entries.push(ZipEntry {
            name: entry.name().to_string(),
            size: entry.size(),
        });
    }
    Ok(manifest)
}

/// Extract a zip-encoded body onto the content root.
///
/// Directory entries are skipped (parents are created as needed for files);
/// entries whose names escape the content root are rejected.
pub fn unpack(body: &[u8], content_root: &Path) -> Result<ZipManifest> {
    let mut archive =
        ZipArchive::new(Cursor::new(body)).context("response body is not a valid zip archive")?;

    let mut manifest = ZipManifest::default();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let relative: PathBuf = match entry.enclosed_name() {
            Some(path) => path,
            None => bail!("zip entry '{name}' would escape the content root"),
        };

        let destination = content_root.join(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create '{}'", parent.display()))?;
        }
        let mut out = File::create(&destination)
            .with_context(|| format!("failed to create '{}'", destination.display()))?;
        let size = io::copy(&mut entry, &mut out)
            .with_context(|| format!("failed to extract '{name}'"))?;
        manifest.entries.push(ZipEntry { name, size });
    }
    Ok(manifest)
}
