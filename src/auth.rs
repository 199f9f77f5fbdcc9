//! Pluggable authentication strategies.
//!
//! Two interchangeable handlers: [`BasicAuthHandler`] resolves credentials and has
//! them attached to every request as HTTP basic auth, while [`AutoAuthHandler`]
//! performs an upfront unauthenticated GET against the portal's auto-login path
//! with the credentials as query parameters; the session cookies picked up by the
//! client's cookie store then authenticate the real calls.
//!
//! Selection is by the `authenticationHandler` config key. Unrecognized names log
//! a warning and fall back to basic.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use tracing::{info, warn};

use crate::client::{normalize_slash, server_origin};
use crate::config::{keys, Config};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Default auto-login path on the portal server; overridable via `autoLoginPath`.
pub const DEFAULT_AUTO_LOGIN_PATH: &str =
    "/wps/portal/cxml/04_SD9ePMtCP1I800I_KydQvyHFUBADPmuQy";

/// Everything a handler needs to establish authentication.
pub struct AuthContext {
    pub http: reqwest::Client,
    pub server: Url,
    pub config: Config,
    pub interactive: bool,
}

/// Outcome of authentication configuration, applied by the client to requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Credentials attached to every request as HTTP basic auth.
    Basic { user: String, password: String },
    /// A server session was established up front; cookies carry it.
    Session,
    /// Authentication disabled (`performAuth = false`).
    Disabled,
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait AuthHandler: Send + Sync {
    /// Strategy name, used for logging.
    fn name(&self) -> &'static str;

    /// Resolve credentials (prompting if needed) and perform any upfront
    /// authentication calls.
    async fn configure(&self, ctx: &AuthContext) -> Result<AuthState>;
}

/// Attaches user/password as HTTP basic credentials to each request.
pub struct BasicAuthHandler;

#[async_trait]
impl AuthHandler for BasicAuthHandler {
    fn name(&self) -> &'static str {
        "basic"
    }

    async fn configure(&self, ctx: &AuthContext) -> Result<AuthState> {
        let user = ctx.config.get_string_or_prompt(
            keys::PORTAL_USER,
            "Portal user",
            false,
            ctx.interactive,
        )?;
        let password = ctx.config.get_string_or_prompt(
            keys::PORTAL_PASSWORD,
            "Portal password",
            true,
            ctx.interactive,
        )?;
        Ok(AuthState::Basic { user, password })
    }
}

/// Establishes a session via the portal's auto-login redirect flow.
pub struct AutoAuthHandler;

impl AutoAuthHandler {
    fn login_url(server: &Url, login_path: &str, user: &str, password: &str) -> Result<Url> {
        let origin = server_origin(server);
        let mut url = Url::parse(&format!("{origin}{}", normalize_slash(login_path)))
            .context("failed to build auto-login URL")?;
        url.query_pairs_mut()
            .append_pair("userid", user)
            .append_pair("password", password);
        Ok(url)
    }
}

#[async_trait]
impl AuthHandler for AutoAuthHandler {
    fn name(&self) -> &'static str {
        "auto"
    }

    async fn configure(&self, ctx: &AuthContext) -> Result<AuthState> {
        let user = ctx.config.get_string_or_prompt(
            keys::PORTAL_USER,
            "Portal user",
            false,
            ctx.interactive,
        )?;
        let password = ctx.config.get_string_or_prompt(
            keys::PORTAL_PASSWORD,
            "Portal password",
            true,
            ctx.interactive,
        )?;
        let login_path = ctx
            .config
            .get_string_or(keys::AUTO_LOGIN_PATH, DEFAULT_AUTO_LOGIN_PATH)?;

        let url = Self::login_url(&ctx.server, &login_path, &user, &password)?;
        let redacted = Self::login_url(&ctx.server, &login_path, &user, "********")?;
        info!(url = %redacted, "Performing auto-login");

        let response = ctx
            .http
            .get(url)
            .send()
            .await
            .context("auto-login request failed")?;

        // A failed login is logged but not fatal; the server may still accept
        // the session cookie on the real call.
        if response.status().as_u16() == 200 {
            info!("Auto-login succeeded");
        } else {
            warn!(status = %response.status(), "Auto-login returned a non-200 status");
        }
        Ok(AuthState::Session)
    }
}

/// Select the configured handler. Accepts short names and, for config-file
/// compatibility with older tooling, fully-qualified class names whose last
/// segment matches. Unrecognized names warn and fall back to basic.
pub fn select_handler(config: &Config) -> Result<Box<dyn AuthHandler>> {
    let configured = config.get_string_or(keys::AUTHENTICATION_HANDLER, "BasicAuthHandler")?;
    let short = configured.rsplit('.').next().unwrap_or(&configured);

    if short.eq_ignore_ascii_case("BasicAuthHandler") || short.eq_ignore_ascii_case("basic") {
        Ok(Box::new(BasicAuthHandler))
    } else if short.eq_ignore_ascii_case("AutoAuthHandler") || short.eq_ignore_ascii_case("auto") {
        Ok(Box::new(AutoAuthHandler))
    } else {
        warn!(
            handler = %configured,
            "Unrecognized authentication handler, falling back to basic"
        );
        Ok(Box::new(BasicAuthHandler))
    }
}
