//! HTTP plumbing shared by all commands.
//!
//! [`PortalClient`] owns the configured `reqwest` client (timeouts, cookie store,
//! optional lax TLS), the resolved server/context settings, and the authentication
//! state. It builds the content-handler endpoint URLs and executes requests,
//! logging request/response metadata the way every command expects.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::{select_handler, AuthContext, AuthState};
use crate::config::{keys, Config};

/// Default content-handler path on the portal server.
pub const DEFAULT_CONTENTHANDLER_PATH: &str = "/wps/mycontenthandler";

const DEFAULT_TIMEOUT_MS: i64 = 15_000;

/// Scheme + host + port of a URL, without any path.
pub fn server_origin(url: &Url) -> String {
    let mut origin = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        origin.push_str(&format!(":{port}"));
    }
    origin
}

/// Ensure exactly one leading slash and no trailing slash.
pub fn normalize_slash(uri_path: &str) -> String {
    let mut path = uri_path.to_string();
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    path
}

/// `Accept-Language` value derived from the environment locale, with an `en`
/// fallback.
fn accept_language() -> String {
    let locale = std::env::var("LC_ALL")
        .or_else(|_| std::env::var("LANG"))
        .unwrap_or_default();
    let locale = locale
        .split('.')
        .next()
        .unwrap_or_default()
        .replace('_', "-");
    if locale.is_empty() {
        return "en".to_string();
    }

    let mut langs = locale.clone();
    if let Some(lang) = locale.split('-').next() {
        if lang != locale {
            langs.push(',');
            langs.push_str(lang);
        }
        if lang != "en" {
            langs.push_str(",en");
        }
    }
    langs
}

/// One executed HTTP exchange: status, content type and raw body.
#[derive(Debug)]
pub struct HttpExchange {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpExchange {
    pub fn ok(&self) -> bool {
        self.status.as_u16() == 200
    }

    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).context("response body is not valid JSON")
    }
}

/// Shared HTTP settings and authentication state for one command invocation.
#[derive(Debug)]
pub struct PortalClient {
    http: reqwest::Client,
    server: Url,
    contenthandler_path: String,
    virtual_portal_context: Option<String>,
    project_context: Option<String>,
    auth: AuthState,
}

impl PortalClient {
    /// Build the client from merged configuration, resolving the server URL and
    /// performing any upfront authentication.
    pub async fn from_config(config: &Config, interactive: bool) -> Result<Self> {
        let connect_timeout = config.get_integer_or(keys::CONNECT_TIMEOUT, DEFAULT_TIMEOUT_MS)?;
        let socket_timeout = config.get_integer_or(keys::SOCKET_TIMEOUT, DEFAULT_TIMEOUT_MS)?;
        let lax_ssl = config.get_bool_or(keys::LAX_SSL, false)?;
        let perform_auth = config.get_bool_or(keys::PERFORM_AUTH, true)?;

        let contenthandler_path =
            config.get_string_or(keys::CONTENTHANDLER_PATH, DEFAULT_CONTENTHANDLER_PATH)?;
        let virtual_portal_context = config.get_string(keys::VIRTUAL_PORTAL_CONTEXT)?;
        let project_context = config.get_string(keys::PROJECT_CONTEXT)?;
        let server = config.get_url_or_prompt(keys::PORTAL_SERVER, "Portal server URL", interactive)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let langs = accept_language();
        if let Ok(value) = HeaderValue::from_str(&langs) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }
        debug!(accept_language = %langs, "Negotiating response language");

        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .connect_timeout(Duration::from_millis(connect_timeout.max(0) as u64))
            .timeout(Duration::from_millis(socket_timeout.max(0) as u64));
        if lax_ssl {
            warn!("laxSSL is enabled, server certificates will not be verified");
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build().context("failed to build HTTP client")?;

        let auth = if perform_auth {
            let handler = select_handler(config)?;
            info!(handler = handler.name(), "Configuring authentication");
            let ctx = AuthContext {
                http: http.clone(),
                server: server.clone(),
                config: config.clone(),
                interactive,
            };
            handler.configure(&ctx).await?
        } else {
            AuthState::Disabled
        };

        Ok(Self {
            http,
            server,
            contenthandler_path,
            virtual_portal_context,
            project_context,
            auth,
        })
    }

    /// The content-handler endpoint for the given `uri` query parameter, with
    /// virtual-portal and project segments appended when configured.
    pub fn endpoint(&self, uri_parameter: &str) -> Result<Url> {
        let mut path = normalize_slash(&self.contenthandler_path);
        if let Some(vp) = self
            .virtual_portal_context
            .as_deref()
            .filter(|vp| !vp.is_empty())
        {
            path.push_str(&normalize_slash(vp));
        }
        if let Some(project) = self.project_context.as_deref().filter(|p| !p.is_empty()) {
            path.push_str("/$project");
            path.push_str(&normalize_slash(project));
        }

        let mut url = Url::parse(&format!("{}{path}", server_origin(&self.server)))
            .context("failed to build endpoint URL")?;
        url.query_pairs_mut().append_pair("uri", uri_parameter);
        Ok(url)
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            AuthState::Basic { user, password } => request.basic_auth(user, Some(password)),
            AuthState::Session | AuthState::Disabled => request,
        }
    }

    /// GET the server origin once so session state is established before the
    /// real call.
    pub async fn prime(&self) -> Result<()> {
        let origin = server_origin(&self.server);
        let url = Url::parse(&origin).context("invalid server origin")?;
        let response = self.apply_auth(self.http.get(url)).send().await?;
        debug!(status = %response.status(), origin = %origin, "Primed server session");
        Ok(())
    }

    /// Execute a GET, with optional extra query parameters.
    pub async fn get(
        &self,
        mut url: Url,
        extra_query: &BTreeMap<String, String>,
    ) -> Result<HttpExchange> {
        for (key, value) in extra_query {
            url.query_pairs_mut().append_pair(key, value);
        }
        info!(method = "GET", url = %url, "Issuing request");
        let request = self.apply_auth(self.http.get(url));
        self.execute(request).await
    }

    /// Execute a multipart POST.
    pub async fn post_multipart(
        &self,
        url: Url,
        form: reqwest::multipart::Form,
    ) -> Result<HttpExchange> {
        info!(method = "POST", url = %url, "Issuing request");
        let request = self.apply_auth(self.http.post(url)).multipart(form);
        self.execute(request).await
    }

    async fn execute(&self, request: RequestBuilder) -> Result<HttpExchange> {
        let response = request.send().await.context("HTTP request failed")?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        info!(
            status = %status,
            content_type = content_type.as_deref().unwrap_or("<none>"),
            "Received response"
        );
        self.log_auth_outcome(status);

        let body = response
            .bytes()
            .await
            .context("failed to read response body")?
            .to_vec();
        Ok(HttpExchange {
            status,
            content_type,
            body,
        })
    }

    fn log_auth_outcome(&self, status: StatusCode) {
        if matches!(self.auth, AuthState::Disabled) {
            return;
        }
        let (state, scheme) = if status.as_u16() == 401 || status.as_u16() == 403 {
            ("FAILURE", "none")
        } else {
            match &self.auth {
                AuthState::Basic { .. } => ("SUCCESS", "BASIC"),
                AuthState::Session => ("UNCHALLENGED", "session"),
                AuthState::Disabled => unreachable!(),
            }
        };
        info!(auth_state = state, auth_scheme = scheme, "Authentication outcome");
    }
}
