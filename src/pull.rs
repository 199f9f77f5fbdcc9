//! Pull: GET a zip-encoded content bundle and extract it onto the content root.
//!
//! No exclusion filtering is applied on pull; the server decides what the bundle
//! contains. Corrupt zip bodies are caught and reported as a failed command, not
//! a crash.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::Value;
use tracing::{error, info};

use crate::archive;
use crate::client::PortalClient;
use crate::config::{keys, Config};
use crate::logger;
use crate::push::DEFAULT_PUSH_URI_PATH;

pub struct PullCommand {
    content_root: PathBuf,
    pull_uri_path: String,
    pull_get_parameters: BTreeMap<String, String>,
    content_id: String,
}

impl PullCommand {
    pub fn load(config: &Config, content_root: &Path, interactive: bool) -> Result<Self> {
        let pull_uri_path = config.get_string_or(keys::PULL_URI_PATH, DEFAULT_PUSH_URI_PATH)?;
        let pull_get_parameters = config
            .get_object(keys::PULL_GET_PARAMETERS)?
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, rendered)
            })
            .collect();
        let content_id =
            config.get_string_or_prompt(keys::CONTENT_ID, "Content ID", false, interactive)?;

        Ok(Self {
            content_root: content_root.to_path_buf(),
            pull_uri_path,
            pull_get_parameters,
            content_id,
        })
    }

    pub async fn invoke(&self, client: &PortalClient) -> Result<bool> {
        info!("Begin content pull from portal");

        let url = client.endpoint(&format!("{}{}", self.pull_uri_path, self.content_id))?;
        info!(url = %url, content_id = %self.content_id, "Pulling content");

        let exchange = client.get(url, &self.pull_get_parameters).await?;
        if !exchange.ok() {
            error!(status = %exchange.status, "Content pull failed");
            return Ok(false);
        }
        if exchange.body.is_empty() {
            error!("Content pull failed, the response carried no body");
            return Ok(false);
        }

        let manifest = match archive::unpack(&exchange.body, &self.content_root) {
            Ok(manifest) => manifest,
            Err(e) => {
                error!(error = %e, "Failed to extract pulled archive");
                return Ok(false);
            }
        };
        logger::log_unzip_manifest(&manifest);

        info!("Content pull was successful");
        info!("End content pull from portal");
        Ok(true)
    }
}
