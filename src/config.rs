//! Layered key/value configuration with typed getters.
//!
//! A [`Config`] is a case-insensitive overlay map built by merging, in increasing
//! priority: bundled defaults, the home-folder config file, the content-root config
//! file, and command-line flags. Last writer for a key wins; merges are per-key,
//! never partial.
//!
//! Typed getters coerce the underlying JSON values and raise a
//! [`ConfigError::Coerce`] when a value cannot be read as the requested type. The
//! `*_or_prompt` getters ask interactively for absent required values and fail with
//! [`ConfigError::Missing`] when no terminal is attached.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use dialoguer::{Input, Password};
use reqwest::Url;
use serde_json::{Map, Value};
use thiserror::Error;

/// Recognized configuration keys. Lookup is case-insensitive; these spellings are
/// used for display.
pub mod keys {
    pub const APPEND_TO_LOG_FILE: &str = "appendToLogFile";
    pub const CONNECT_TIMEOUT: &str = "connectTimeout";
    pub const CONTENT_ROOT: &str = "contentRoot";
    pub const CONTENTHANDLER_PATH: &str = "contenthandlerPath";
    pub const EXCLUDES: &str = "excludes";
    pub const LAX_SSL: &str = "laxSSL";
    pub const MAIN_HTML_FILE: &str = "mainHtmlFile";
    pub const PERFORM_AUTH: &str = "performAuth";
    pub const PORTAL_PASSWORD: &str = "portalPassword";
    pub const PORTAL_USER: &str = "portalUser";
    pub const PORTAL_SERVER: &str = "portalServer";
    pub const PREBUILT_ZIP: &str = "prebuiltZip";
    pub const PROJECT_CONTEXT: &str = "projectContext";
    pub const SOCKET_TIMEOUT: &str = "socketTimeout";
    pub const CONTENT_ID: &str = "contentId";
    pub const CONTENT_NAME: &str = "contentName";
    pub const CONTENT_PATH: &str = "contentPath";
    pub const CONTENT_TITLE: &str = "contentTitle";
    pub const SITE_AREA: &str = "siteArea";
    pub const VIRTUAL_PORTAL_CONTEXT: &str = "virtualPortalContext";

    // Escape hatches, undocumented but honored when present.
    pub const AUTHENTICATION_HANDLER: &str = "authenticationHandler";
    pub const AUTO_LOGIN_PATH: &str = "autoLoginPath";
    pub const PULL_GET_PARAMETERS: &str = "pullGetParameters";
    pub const PULL_URI_PATH: &str = "pullUriPath";
    pub const PUSH_POST_PARAMETERS: &str = "pushPostParameters";
    pub const PUSH_URI_PATH: &str = "pushUriPath";

    pub(super) const ALL: &[&str] = &[
        APPEND_TO_LOG_FILE,
        CONNECT_TIMEOUT,
        CONTENT_ROOT,
        CONTENTHANDLER_PATH,
        EXCLUDES,
        LAX_SSL,
        MAIN_HTML_FILE,
        PERFORM_AUTH,
        PORTAL_PASSWORD,
        PORTAL_USER,
        PORTAL_SERVER,
        PREBUILT_ZIP,
        PROJECT_CONTEXT,
        SOCKET_TIMEOUT,
        CONTENT_ID,
        CONTENT_NAME,
        CONTENT_PATH,
        CONTENT_TITLE,
        SITE_AREA,
        VIRTUAL_PORTAL_CONTEXT,
        AUTHENTICATION_HANDLER,
        AUTO_LOGIN_PATH,
        PULL_GET_PARAMETERS,
        PULL_URI_PATH,
        PUSH_POST_PARAMETERS,
        PUSH_URI_PATH,
    ];
}

/// Typed configuration failures, surfaced at the CLI boundary.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration value '{key}' is required but was not provided")]
    Missing { key: String },

    #[error("configuration value '{key}' cannot be read as {expected}")]
    Coerce { key: String, expected: &'static str },

    #[error("failed to read configuration file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration file {path} is not valid JSON")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to prompt for configuration value '{key}'")]
    Prompt {
        key: String,
        #[source]
        source: dialoguer::Error,
    },
}

/// The merged configuration overlay. Keys are stored lower-cased.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: BTreeMap<String, Value>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from a plain JSON object, lower-casing every key.
    pub fn from_object(object: Map<String, Value>) -> Self {
        let mut config = Self::new();
        for (key, value) in object {
            config.set(&key, value);
        }
        config
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_ascii_lowercase(), value);
    }

    /// Overlay `other` onto `self`; keys present in `other` win.
    pub fn merge(&mut self, other: Config) {
        for (key, value) in other.values {
            self.values.insert(key, value);
        }
    }

    pub fn raw(&self, key: &str) -> Option<&Value> {
        match self.values.get(&key.to_ascii_lowercase()) {
            Some(Value::Null) => None,
            other => other,
        }
    }

    pub fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.raw(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ConfigError::Coerce {
                key: key.to_string(),
                expected: "a string",
            }),
        }
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        Ok(self.get_string(key)?.unwrap_or_else(|| default.to_string()))
    }

    pub fn get_integer(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        let coerce = || ConfigError::Coerce {
            key: key.to_string(),
            expected: "an integer",
        };
        match self.raw(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(coerce),
            Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| coerce()),
            Some(_) => Err(coerce()),
        }
    }

    pub fn get_integer_or(&self, key: &str, default: i64) -> Result<i64, ConfigError> {
        Ok(self.get_integer(key)?.unwrap_or(default))
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.raw(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(_) => Err(ConfigError::Coerce {
                key: key.to_string(),
                expected: "a boolean",
            }),
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        Ok(self.get_bool(key)?.unwrap_or(default))
    }

    /// Reads either a JSON array of strings or a comma-separated string.
    pub fn get_string_array(&self, key: &str) -> Result<Option<Vec<String>>, ConfigError> {
        let coerce = || ConfigError::Coerce {
            key: key.to_string(),
            expected: "an array of strings",
        };
        match self.raw(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.split(',').map(str::to_string).collect())),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(coerce))
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(coerce()),
        }
    }

    pub fn get_object(&self, key: &str) -> Result<Option<Map<String, Value>>, ConfigError> {
        match self.raw(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(_) => Err(ConfigError::Coerce {
                key: key.to_string(),
                expected: "a JSON object",
            }),
        }
    }

    /// Resolve a required string, prompting when absent and a terminal is attached.
    pub fn get_string_or_prompt(
        &self,
        key: &str,
        prompt: &str,
        for_password: bool,
        interactive: bool,
    ) -> Result<String, ConfigError> {
        match self.get_string(key)? {
            Some(value) if !value.is_empty() => return Ok(value),
            _ => {}
        }

        if !interactive {
            return Err(ConfigError::Missing {
                key: key.to_string(),
            });
        }

        let wrap = |source| ConfigError::Prompt {
            key: key.to_string(),
            source,
        };
        if for_password {
            Password::new().with_prompt(prompt).interact().map_err(wrap)
        } else {
            Input::new()
                .with_prompt(prompt)
                .validate_with(|input: &String| -> Result<(), &str> {
                    if input.is_empty() {
                        Err("a value is required")
                    } else {
                        Ok(())
                    }
                })
                .interact_text()
                .map_err(wrap)
        }
    }

    /// Resolve a required URL, prompting when absent and a terminal is attached.
    pub fn get_url_or_prompt(
        &self,
        key: &str,
        prompt: &str,
        interactive: bool,
    ) -> Result<Url, ConfigError> {
        let raw = self.get_string_or_prompt(key, prompt, false, interactive)?;
        Url::parse(&raw).map_err(|_| ConfigError::Coerce {
            key: key.to_string(),
            expected: "a URL",
        })
    }
}

/// Renders every key with its recognized spelling, redacting the portal password.
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password_key = keys::PORTAL_PASSWORD.to_ascii_lowercase();
        for (key, value) in &self.values {
            let pretty = keys::ALL
                .iter()
                .find(|k| k.eq_ignore_ascii_case(key))
                .copied()
                .unwrap_or(key.as_str());
            let rendered = if *key == password_key {
                "********".to_string()
            } else {
                match value {
                    Value::String(s) => s.clone(),
                    Value::Array(items) => {
                        let parts: Vec<String> = items
                            .iter()
                            .map(|item| match item {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect();
                        format!("[{}]", parts.join(", "))
                    }
                    other => other.to_string(),
                }
            };
            writeln!(f, "\t{pretty} = {rendered}")?;
        }
        Ok(())
    }
}
