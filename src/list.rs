//! List: fetch remote objects (projects, virtual portals, site areas) and render
//! a two-column label/value table.
//!
//! Edge cases handled per the server's contract: `response.list` equal to the
//! empty string means an empty result (success, with an informative message), and
//! `response.list.entry` may be a single object instead of an array.

use anyhow::Result;
use clap::ValueEnum;
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use crate::client::PortalClient;

/// Default `uri` parameter prefix for list calls.
pub const DEFAULT_LIST_URI_PATH: &str = "scriptportletutil:";

/// The kinds of remote objects that can be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ObjectType {
    Projects,
    Vportals,
    Siteareas,
}

impl ObjectType {
    /// Value appended to the list `uri` parameter.
    pub fn api_value(&self) -> &'static str {
        match self {
            ObjectType::Projects => "project",
            ObjectType::Vportals => "vp",
            ObjectType::Siteareas => "sitearea",
        }
    }

    fn label_title(&self) -> &'static str {
        match self {
            ObjectType::Projects => "Project name",
            ObjectType::Vportals => "Virtual portal name",
            ObjectType::Siteareas => "Site area name",
        }
    }

    fn value_title(&self) -> &'static str {
        match self {
            ObjectType::Projects => "Project ID",
            ObjectType::Vportals => "Virtual portal context",
            ObjectType::Siteareas => "Site area path",
        }
    }

    fn empty_message(&self) -> &'static str {
        match self {
            ObjectType::Vportals => "No virtual portals were found on the server.",
            ObjectType::Projects => "No projects were found on the server.",
            ObjectType::Siteareas => "No site areas were found on the server.",
        }
    }
}

/// One label/value row of a list response.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ListEntry {
    pub label: String,
    pub value: String,
}

/// A successfully validated list response body.
#[derive(Debug, PartialEq, Eq)]
pub enum ListOutcome {
    Empty,
    Entries(Vec<ListEntry>),
}

/// Validate a list response body: `response.status` must be `success`
/// (case-insensitive); an empty-string `list` is an empty result; a single
/// entry object is normalized to a one-element list.
pub fn parse_list_response(body: &[u8]) -> Result<ListOutcome> {
    let body: Value = serde_json::from_slice(body).map_err(|e| {
        anyhow::anyhow!("list response body is not valid JSON: {e}")
    })?;

    let response = body
        .get("response")
        .ok_or_else(|| anyhow::anyhow!("list response did not carry a response object"))?;
    let status = response
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("list response did not carry a status field"))?;
    if !status.eq_ignore_ascii_case("success") {
        anyhow::bail!("server reported a failed list operation");
    }

    let list = response
        .get("list")
        .ok_or_else(|| anyhow::anyhow!("list response did not carry a list field"))?;
    if matches!(list, Value::String(s) if s.is_empty()) {
        return Ok(ListOutcome::Empty);
    }

    let entry = list
        .get("entry")
        .ok_or_else(|| anyhow::anyhow!("list response did not carry any entries"))?;
    let entries: Vec<ListEntry> = match entry {
        Value::Array(_) => serde_json::from_value(entry.clone())
            .map_err(|e| anyhow::anyhow!("malformed list entries: {e}"))?,
        Value::Object(_) => vec![serde_json::from_value(entry.clone())
            .map_err(|e| anyhow::anyhow!("malformed list entry: {e}"))?],
        _ => anyhow::bail!("list entries have an unexpected shape"),
    };
    Ok(ListOutcome::Entries(entries))
}

/// Render the two-column table, label column padded to the widest label.
pub fn render_table(object_type: ObjectType, entries: &[ListEntry]) -> String {
    let label_title = object_type.label_title();
    let value_title = object_type.value_title();

    let width = entries
        .iter()
        .map(|e| e.label.len())
        .chain(std::iter::once(label_title.len()))
        .max()
        .unwrap_or(0);

    let mut table = format!("{label_title:width$} : {value_title}\n");
    for entry in entries {
        table.push_str(&format!("{:width$} : {}\n", entry.label, entry.value));
    }
    table
}

pub struct ListCommand {
    object_type: ObjectType,
}

impl ListCommand {
    pub fn new(object_type: ObjectType) -> Self {
        Self { object_type }
    }

    pub async fn invoke(&self, client: &PortalClient) -> Result<bool> {
        info!(object_type = ?self.object_type, "Begin list operation");

        let url = client.endpoint(&format!(
            "{DEFAULT_LIST_URI_PATH}{}",
            self.object_type.api_value()
        ))?;
        info!(url = %url, "Listing remote objects");

        let exchange = client.get(url, &Default::default()).await?;
        if !exchange.ok() {
            error!(status = %exchange.status, "List operation failed");
            return Ok(false);
        }

        match parse_list_response(&exchange.body) {
            Ok(ListOutcome::Empty) => {
                println!();
                println!("{}", self.object_type.empty_message());
                info!("List operation returned no entries");
                Ok(true)
            }
            Ok(ListOutcome::Entries(entries)) => {
                println!();
                print!("{}", render_table(self.object_type, &entries));
                info!(entries = entries.len(), "List operation was successful");
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, "List operation failed");
                Ok(false)
            }
        }
    }
}
