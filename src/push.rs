//! Push: zip the content root (or reuse a prebuilt zip) and POST it to the
//! portal's content handler as a multipart form.
//!
//! All filesystem validation happens before any network call: the content root
//! and main HTML file must exist (or, with a prebuilt zip, the zip must exist and
//! contain the main HTML file), and exactly one of content id/name/path must be
//! configured. Success is decided by the `results.status` field of the JSON
//! response body.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::archive::{self, ZipManifest};
use crate::client::PortalClient;
use crate::config::{keys, Config};
use crate::logger;

/// Default `uri` parameter prefix for push and pull.
pub const DEFAULT_PUSH_URI_PATH: &str = "scriptportlet:";

const INDEX_HTM: &str = "index.htm";
const INDEX_HTML: &str = "index.html";

// Multipart field names expected by the server-side content handler.
const FIELD_CONTENT_ID: &str = "wcmContentId";
const FIELD_CONTENT_PATH: &str = "wcmContentPath";
const FIELD_CONTENT_TITLE: &str = "wcmContentTitle";
const FIELD_MAIN_HTML_FILE: &str = "mainHtmlFile";
const FIELD_ZIPPED_CONTENT: &str = "zippedContent";

#[derive(Debug)]
pub struct PushCommand {
    content_root: PathBuf,
    excludes: Vec<Regex>,
    push_uri_path: String,
    push_post_parameters: Option<Map<String, Value>>,
    content_id: Option<String>,
    content_name: Option<String>,
    content_path: Option<String>,
    content_title: Option<String>,
    site_area: Option<String>,
    prebuilt_zip: Option<PathBuf>,
    prebuilt_manifest: Option<ZipManifest>,
    main_html_file: String,
}

impl PushCommand {
    pub fn load(config: &Config, content_root: &Path, interactive: bool) -> Result<Self> {
        let excludes =
            archive::compile_excludes(&config.get_string_array(keys::EXCLUDES)?.unwrap_or_default())?;
        let push_uri_path = config.get_string_or(keys::PUSH_URI_PATH, DEFAULT_PUSH_URI_PATH)?;
        let push_post_parameters = config.get_object(keys::PUSH_POST_PARAMETERS)?;

        let content_id = config.get_string(keys::CONTENT_ID)?;
        let content_name = config.get_string(keys::CONTENT_NAME)?;
        let content_path = config.get_string(keys::CONTENT_PATH)?;
        let content_title = config.get_string(keys::CONTENT_TITLE)?;
        let site_area = config.get_string(keys::SITE_AREA)?;

        let prebuilt_zip = config.get_string(keys::PREBUILT_ZIP)?.map(PathBuf::from);
        let prebuilt_manifest = match &prebuilt_zip {
            Some(path) => Some(archive::read_manifest(path)?),
            None => None,
        };

        let main_html_file = Self::resolve_main_html_file(
            config,
            content_root,
            prebuilt_manifest.as_ref(),
            interactive,
        )?;

        Ok(Self {
            content_root: content_root.to_path_buf(),
            excludes,
            push_uri_path,
            push_post_parameters,
            content_id,
            content_name,
            content_path,
            content_title,
            site_area,
            prebuilt_zip,
            prebuilt_manifest,
            main_html_file,
        })
    }

    /// Explicit config wins; otherwise probe for `index.htm` then `index.html`
    /// (in the prebuilt zip's entry list when one is used, else on disk); as a
    /// last resort, prompt.
    fn resolve_main_html_file(
        config: &Config,
        content_root: &Path,
        prebuilt: Option<&ZipManifest>,
        interactive: bool,
    ) -> Result<String> {
        if let Some(explicit) = config.get_string(keys::MAIN_HTML_FILE)? {
            if !explicit.is_empty() {
                return Ok(explicit);
            }
        }

        let detected = match prebuilt {
            Some(manifest) => [INDEX_HTM, INDEX_HTML]
                .into_iter()
                .find(|name| manifest.contains(name)),
            None => [INDEX_HTM, INDEX_HTML]
                .into_iter()
                .find(|name| content_root.join(name).exists()),
        };
        if let Some(name) = detected {
            info!(main_html_file = name, "Detected main HTML file");
            return Ok(name.to_string());
        }

        Ok(config.get_string_or_prompt(
            keys::MAIN_HTML_FILE,
            "Main HTML file",
            false,
            interactive,
        )?)
    }

    /// Validate before any network call. Derives the effective content path from
    /// the content name and site area when needed.
    pub fn validate(&mut self) -> Result<()> {
        match (&self.prebuilt_zip, &self.prebuilt_manifest) {
            (None, _) => {
                if !self.content_root.exists() {
                    anyhow::bail!(
                        "push requires an existing content root ({})",
                        self.content_root.display()
                    );
                }
                if !self.content_root.join(&self.main_html_file).exists() {
                    anyhow::bail!(
                        "main HTML file '{}' not found in the content root",
                        self.main_html_file
                    );
                }
            }
            (Some(zip_path), manifest) => {
                if !zip_path.exists() {
                    anyhow::bail!("prebuilt zip '{}' not found", zip_path.display());
                }
                let has_main = manifest
                    .as_ref()
                    .map(|m| m.contains(&self.main_html_file))
                    .unwrap_or(false);
                if !has_main {
                    anyhow::bail!(
                        "main HTML file '{}' not found in the prebuilt zip",
                        self.main_html_file
                    );
                }
            }
        }

        let set = [&self.content_id, &self.content_name, &self.content_path]
            .iter()
            .filter(|v| v.is_some())
            .count();
        if set == 0 {
            anyhow::bail!(
                "one of {}, {} or {} is required",
                keys::CONTENT_ID,
                keys::CONTENT_NAME,
                keys::CONTENT_PATH
            );
        }
        if set > 1 {
            anyhow::bail!(
                "{}, {} and {} are mutually exclusive",
                keys::CONTENT_ID,
                keys::CONTENT_NAME,
                keys::CONTENT_PATH
            );
        }

        if let Some(name) = &self.content_name {
            let site_area = self.site_area.as_deref().ok_or_else(|| {
                anyhow::anyhow!("{} requires {}", keys::CONTENT_NAME, keys::SITE_AREA)
            })?;
            let separator = if site_area.ends_with('/') || name.starts_with('/') {
                ""
            } else {
                "/"
            };
            self.content_path = Some(format!("{site_area}{separator}{name}"));
        }

        Ok(())
    }

    /// Effective content path after validation (derived for name + site area).
    pub fn content_path(&self) -> Option<&str> {
        self.content_path.as_deref()
    }

    pub async fn invoke(&self, client: &PortalClient) -> Result<bool> {
        info!("Begin content push to portal");

        client.prime().await?;

        let uri_parameter = format!(
            "{}{}",
            self.push_uri_path,
            self.content_id.as_deref().unwrap_or("null")
        );
        let url = client.endpoint(&uri_parameter)?;
        info!(
            url = %url,
            content_id = self.content_id.as_deref().unwrap_or_default(),
            content_path = self.content_path.as_deref().unwrap_or_default(),
            main_html_file = %self.main_html_file,
            "Pushing content"
        );

        // Build or reuse the archive. The temp handle keeps a freshly built zip
        // alive until the POST completes.
        let (zip_path, _tmp_guard, manifest) = match &self.prebuilt_zip {
            Some(path) => {
                let manifest = self
                    .prebuilt_manifest
                    .clone()
                    .unwrap_or_default();
                (path.clone(), None, manifest)
            }
            None => {
                let (tmp, manifest) = archive::pack(&self.content_root, &self.excludes)?;
                (tmp.path().to_path_buf(), Some(tmp), manifest)
            }
        };
        let zip_size = std::fs::metadata(&zip_path).map(|m| m.len()).unwrap_or(0);
        logger::log_zip_manifest(&zip_path, zip_size, &manifest);

        let form = self.build_form(&zip_path)?;
        let exchange = client.post_multipart(url, form).await?;

        if !exchange.ok() {
            error!(status = %exchange.status, "Content push failed");
            return Ok(false);
        }

        let body = match exchange.json() {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Push response body is not valid JSON");
                return Ok(false);
            }
        };
        let status = body
            .get("results")
            .and_then(|results| results.get("status"))
            .and_then(Value::as_str);
        match status {
            Some(s) if s.eq_ignore_ascii_case("success") => {
                info!("Content push was successful");
                info!("End content push to portal");
                Ok(true)
            }
            Some(_) => {
                error!("Server reported a failed push");
                Ok(false)
            }
            None => {
                error!("Push response did not carry a results.status field");
                Ok(false)
            }
        }
    }

    fn build_form(&self, zip_path: &Path) -> Result<Form> {
        let mut form = Form::new();
        if let Some(id) = &self.content_id {
            form = form.text(FIELD_CONTENT_ID, id.clone());
        }
        if let Some(path) = self.content_path.as_deref().filter(|p| !p.is_empty()) {
            form = form.text(FIELD_CONTENT_PATH, path.to_string());
        }
        if let Some(title) = self.content_title.as_deref().filter(|t| !t.is_empty()) {
            form = form.text(FIELD_CONTENT_TITLE, title.to_string());
        }
        form = form.text(FIELD_MAIN_HTML_FILE, self.main_html_file.clone());

        if let Some(extra) = &self.push_post_parameters {
            for (key, value) in extra {
                if value.is_null() {
                    continue;
                }
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                form = form.text(key.clone(), rendered);
            }
        }

        let zip_bytes = std::fs::read(zip_path)
            .with_context(|| format!("failed to read zip '{}'", zip_path.display()))?;
        let file_name = zip_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "content.zip".to_string());
        let part = Part::bytes(zip_bytes)
            .file_name(file_name)
            .mime_str("application/zip")?;
        Ok(form.part(FIELD_ZIPPED_CONTENT, part))
    }
}
