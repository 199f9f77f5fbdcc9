//! Per-invocation log file setup and archive-manifest logging.
//!
//! When the content root exists, all tracing output goes to a `portal-sync.log`
//! file inside it (truncated by default, appended when `appendToLogFile` is set);
//! otherwise everything goes to stderr. The final user-visible message names the
//! log target so failures always point somewhere inspectable.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::archive::ZipManifest;

/// Log file name, created inside the content root.
pub const LOG_FILE: &str = "portal-sync.log";

/// Where this invocation's log output ends up.
#[derive(Debug, Clone)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

impl LogTarget {
    /// Human-readable description used in the final console message.
    pub fn describe(&self) -> String {
        match self {
            LogTarget::File(path) => path.display().to_string(),
            LogTarget::Stderr => "standard error".to_string(),
        }
    }
}

/// Install the global subscriber. Logs to `<content_root>/portal-sync.log` when the
/// content root is an existing directory, else to stderr. Safe to call more than
/// once within a process (later calls keep the first subscriber).
pub fn init(content_root: &Path, append: bool) -> LogTarget {
    let (writer, target) = if content_root.is_dir() {
        let path = content_root.join(LOG_FILE);
        match OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&path)
        {
            Ok(file) => {
                let file = Arc::new(file);
                (
                    BoxMakeWriter::new(move || Arc::clone(&file)),
                    LogTarget::File(path),
                )
            }
            Err(_) => (BoxMakeWriter::new(std::io::stderr), LogTarget::Stderr),
        }
    } else {
        (BoxMakeWriter::new(std::io::stderr), LogTarget::Stderr)
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .try_init();

    target
}

/// Log the manifest of a zip built (or reused) for push.
pub fn log_zip_manifest(zip_path: &Path, zip_size: u64, manifest: &ZipManifest) {
    let entry_list: Vec<&str> = manifest.entries.iter().map(|e| e.name.as_str()).collect();
    info!(
        zip_path = %zip_path.display(),
        zip_size,
        entries = manifest.entries.len(),
        entry_list = ?entry_list,
        "Zip archive contents"
    );
}

/// Log the manifest of a zip extracted during pull.
pub fn log_unzip_manifest(manifest: &ZipManifest) {
    for entry in &manifest.entries {
        info!(name = %entry.name, bytes = entry.size, "Extracted entry");
    }
    info!(
        bytes_written = manifest.total_bytes(),
        entries = manifest.entries.len(),
        "Extraction complete"
    );
}
