//! Command-line interface and dispatcher.
//!
//! Defines the clap surface (`push`, `pull`, `list` plus options mapping 1:1 to
//! configuration keys) and the async [`run`] entrypoint shared by the binary and
//! the integration tests. Documented keys are first-class `--flags`; anything
//! else can be supplied with the repeatable `--set KEY=VALUE` escape hatch.
//!
//! Every failure funnels into the returned [`CommandOutcome`]: the message names
//! the log target, and `main` maps `success = false` to a non-zero exit code.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::client::PortalClient;
use crate::config::{keys, Config};
use crate::list::{ListCommand, ObjectType};
use crate::load_config;
use crate::logger::{self, LogTarget};
use crate::pull::PullCommand;
use crate::push::PushCommand;

/// CLI for portal-sync: push, pull and list web content on a portal server.
#[derive(Parser)]
#[clap(
    name = "portal-sync",
    version,
    about = "Synchronize local web-application content with a remote portal server"
)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonOpts,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Options shared by every command, each mapping to a configuration key.
#[derive(Args, Default)]
pub struct CommonOpts {
    /// Portal server URL, e.g. https://portal.example.com:10041
    #[clap(long, global = true)]
    pub server: Option<String>,

    /// Portal user name
    #[clap(long, global = true)]
    pub user: Option<String>,

    /// Portal password
    #[clap(long, global = true)]
    pub password: Option<String>,

    /// Local directory holding the web content (defaults to the current directory)
    #[clap(long, global = true)]
    pub content_root: Option<PathBuf>,

    /// Project context segment appended to the API path
    #[clap(long, global = true)]
    pub project_context: Option<String>,

    /// Virtual portal context segment appended to the API path
    #[clap(long, global = true)]
    pub virtual_portal_context: Option<String>,

    /// Content handler path on the server
    #[clap(long, global = true)]
    pub contenthandler_path: Option<String>,

    /// Connect timeout in milliseconds
    #[clap(long, global = true)]
    pub connect_timeout: Option<i64>,

    /// Socket (total request) timeout in milliseconds
    #[clap(long, global = true)]
    pub socket_timeout: Option<i64>,

    /// Skip TLS certificate verification
    #[clap(long, global = true)]
    pub lax_ssl: bool,

    /// Skip authentication entirely
    #[clap(long, global = true)]
    pub no_auth: bool,

    /// Authentication strategy: basic or auto
    #[clap(long, global = true)]
    pub auth_handler: Option<String>,

    /// Append to the log file instead of overwriting it
    #[clap(long, global = true)]
    pub append_log: bool,

    /// Never prompt; fail when a required value is missing
    #[clap(long, global = true)]
    pub non_interactive: bool,

    /// Set an arbitrary configuration key (repeatable); VALUE is parsed as JSON
    /// when possible, else kept as a string
    #[clap(long = "set", value_name = "KEY=VALUE", global = true)]
    pub set: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Zip the content root (or reuse a prebuilt zip) and push it to the server
    Push {
        /// Content ID of the target object
        #[clap(long)]
        content_id: Option<String>,

        /// Content name (requires --site-area)
        #[clap(long)]
        content_name: Option<String>,

        /// Full content path of the target object
        #[clap(long)]
        content_path: Option<String>,

        /// Title for the pushed content
        #[clap(long)]
        content_title: Option<String>,

        /// Site area the named content lives in
        #[clap(long)]
        site_area: Option<String>,

        /// Main HTML entry point (defaults to index.htm/index.html)
        #[clap(long)]
        main_html_file: Option<String>,

        /// Push an existing zip instead of archiving the content root
        #[clap(long)]
        prebuilt_zip: Option<PathBuf>,

        /// Comma-separated regex patterns excluded from the archive
        #[clap(long)]
        excludes: Option<String>,
    },

    /// Pull the server-side content bundle down onto the content root
    Pull {
        /// Content ID of the object to pull
        #[clap(long)]
        content_id: Option<String>,
    },

    /// List remote objects as a label/value table
    List {
        /// Kind of object to list
        #[clap(value_enum)]
        object_type: ObjectType,
    },
}

/// Final result of one invocation; `main` maps it to the process exit code.
#[derive(Debug)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
}

impl CommandOutcome {
    fn success(log: &LogTarget) -> Self {
        Self {
            success: true,
            message: format!(
                "The command completed successfully. The log was written to {}.",
                log.describe()
            ),
        }
    }

    fn failure(log: &LogTarget) -> Self {
        Self {
            success: false,
            message: format!(
                "The command did not complete successfully. See {} for details.",
                log.describe()
            ),
        }
    }
}

/// Fold CLI options into a config overlay, the highest-priority merge source.
fn command_line_overlay(cli: &Cli) -> Config {
    let mut overlay = Config::new();
    let common = &cli.common;

    let mut set_string = |key: &str, value: &Option<String>| {
        if let Some(value) = value {
            overlay.set(key, Value::String(value.clone()));
        }
    };
    set_string(keys::PORTAL_SERVER, &common.server);
    set_string(keys::PORTAL_USER, &common.user);
    set_string(keys::PORTAL_PASSWORD, &common.password);
    set_string(keys::PROJECT_CONTEXT, &common.project_context);
    set_string(keys::VIRTUAL_PORTAL_CONTEXT, &common.virtual_portal_context);
    set_string(keys::CONTENTHANDLER_PATH, &common.contenthandler_path);
    set_string(keys::AUTHENTICATION_HANDLER, &common.auth_handler);

    if let Some(root) = &common.content_root {
        overlay.set(
            keys::CONTENT_ROOT,
            Value::String(root.to_string_lossy().into_owned()),
        );
    }
    if let Some(ms) = common.connect_timeout {
        overlay.set(keys::CONNECT_TIMEOUT, Value::from(ms));
    }
    if let Some(ms) = common.socket_timeout {
        overlay.set(keys::SOCKET_TIMEOUT, Value::from(ms));
    }
    if common.lax_ssl {
        overlay.set(keys::LAX_SSL, Value::Bool(true));
    }
    if common.no_auth {
        overlay.set(keys::PERFORM_AUTH, Value::Bool(false));
    }
    if common.append_log {
        overlay.set(keys::APPEND_TO_LOG_FILE, Value::Bool(true));
    }

    match &cli.command {
        Commands::Push {
            content_id,
            content_name,
            content_path,
            content_title,
            site_area,
            main_html_file,
            prebuilt_zip,
            excludes,
        } => {
            let mut set_string = |key: &str, value: &Option<String>| {
                if let Some(value) = value {
                    overlay.set(key, Value::String(value.clone()));
                }
            };
            set_string(keys::CONTENT_ID, content_id);
            set_string(keys::CONTENT_NAME, content_name);
            set_string(keys::CONTENT_PATH, content_path);
            set_string(keys::CONTENT_TITLE, content_title);
            set_string(keys::SITE_AREA, site_area);
            set_string(keys::MAIN_HTML_FILE, main_html_file);
            set_string(keys::EXCLUDES, excludes);
            if let Some(zip) = prebuilt_zip {
                overlay.set(
                    keys::PREBUILT_ZIP,
                    Value::String(zip.to_string_lossy().into_owned()),
                );
            }
        }
        Commands::Pull { content_id } => {
            if let Some(id) = content_id {
                overlay.set(keys::CONTENT_ID, Value::String(id.clone()));
            }
        }
        Commands::List { .. } => {}
    }

    for pair in &common.set {
        match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                let parsed = serde_json::from_str(value)
                    .unwrap_or_else(|_| Value::String(value.to_string()));
                overlay.set(key, parsed);
            }
            _ => eprintln!("Ignoring malformed --set option '{pair}' (expected KEY=VALUE)"),
        }
    }

    overlay
}

/// Async entrypoint used by `main` and by integration tests.
pub async fn run(cli: Cli) -> CommandOutcome {
    let overlay = command_line_overlay(&cli);

    // Resolve the content root before loading config files, since one of them
    // lives inside it.
    let content_root = overlay
        .get_string(keys::CONTENT_ROOT)
        .ok()
        .flatten()
        .unwrap_or_else(|| ".".to_string());
    let content_root = std::path::absolute(&content_root)
        .unwrap_or_else(|_| PathBuf::from(&content_root));

    let mut config = match load_config::resolve(&content_root, overlay) {
        Ok(config) => config,
        Err(e) => {
            let message = format!("Error loading configuration: {e}");
            eprintln!("{message}");
            return CommandOutcome {
                success: false,
                message,
            };
        }
    };
    config.set(
        keys::CONTENT_ROOT,
        Value::String(content_root.to_string_lossy().into_owned()),
    );

    let append = config
        .get_bool_or(keys::APPEND_TO_LOG_FILE, false)
        .unwrap_or(false);
    let log = logger::init(&content_root, append);

    info!(version = env!("CARGO_PKG_VERSION"), "portal-sync starting");
    if let Some(home) = load_config::home_folder() {
        info!(home_folder = %home.display(), "Using home folder");
    }
    if !content_root.exists() {
        warn!(content_root = %content_root.display(), "Content root does not exist");
    }
    info!(configuration = %format!("\n{config}"), "Resolved configuration");

    let interactive = !cli.common.non_interactive && std::io::stdin().is_terminal();

    let result = dispatch(&cli.command, &config, &content_root, interactive).await;
    match result {
        Ok(true) => {
            let outcome = CommandOutcome::success(&log);
            info!("Command completed successfully");
            outcome
        }
        Ok(false) => CommandOutcome::failure(&log),
        Err(e) => {
            error!(error = %format!("{e:#}"), "Command failed");
            let mut outcome = CommandOutcome::failure(&log);
            outcome.message = format!("{e:#}. See {} for details.", log.describe());
            outcome
        }
    }
}

async fn dispatch(
    command: &Commands,
    config: &Config,
    content_root: &std::path::Path,
    interactive: bool,
) -> anyhow::Result<bool> {
    match command {
        Commands::Push { .. } => {
            let mut push = PushCommand::load(config, content_root, interactive)?;
            push.validate()?;
            let client = PortalClient::from_config(config, interactive).await?;
            push.invoke(&client).await
        }
        Commands::Pull { .. } => {
            let pull = PullCommand::load(config, content_root, interactive)?;
            let client = PortalClient::from_config(config, interactive).await?;
            pull.invoke(&client).await
        }
        Commands::List { object_type } => {
            let list = ListCommand::new(*object_type);
            let client = PortalClient::from_config(config, interactive).await?;
            list.invoke(&client).await
        }
    }
}
