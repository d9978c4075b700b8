//!
//! Backend client bootstrap
//! ------------------------
//! Turns the two environment-supplied strings (endpoint URL and API key) into either a
//! usable `BackendClient` or an explicit "not configured" state.
//!
//! Keys pasted into environment files arrive with stray whitespace, shell quoting, or a
//! known corruption where a `.` is prepended to `sb_publishable_` keys. `normalize_key`
//! repairs those shapes as a fixed sequence of named steps; anything else passes through
//! unchanged and will be rejected by the backend itself.

use once_cell::sync::OnceCell;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info, warn};

pub const ENV_URL: &str = "EXPENSIA_BACKEND_URL";
pub const ENV_KEY: &str = "EXPENSIA_BACKEND_KEY";
pub const ENV_URL_FALLBACK: &str = "SUPABASE_URL";
pub const ENV_KEY_FALLBACK: &str = "SUPABASE_ANON_KEY";

const MALFORMED_PUBLISHABLE_PREFIX: &str = ".sb_publishable_";
const PROFILES_TABLE: &str = "profiles";

static CLIENT_CONFIG: OnceCell<ClientConfig> = OnceCell::new();

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned HTTP {status} for {endpoint}")]
    Status { status: u16, endpoint: String },
    #[error("invalid backend url: {0}")]
    Url(String),
    #[error("invalid header value for {0}")]
    Header(&'static str),
    #[error("unexpected backend payload: {0}")]
    Decode(String),
}

impl BackendError {
    /// True when the backend rejected the caller's credentials rather than failing.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, BackendError::Status { status: 401 | 403, .. })
    }
}

// ---- Key normalization pipeline ----

pub fn trim_whitespace(s: &str) -> &str {
    s.trim()
}

/// Remove one matching pair of surrounding `'` or `"` quotes, if present.
pub fn strip_matching_quotes(s: &str) -> &str {
    for quote in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// `.sb_publishable_...` -> `sb_publishable_...`; every other shape is returned as-is.
pub fn repair_publishable_prefix(s: &str) -> &str {
    if s.starts_with(MALFORMED_PUBLISHABLE_PREFIX) {
        &s[1..]
    } else {
        s
    }
}

/// trim -> unquote -> de-prefix. Absent stays absent; the result may be empty.
pub fn normalize_key(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    let trimmed = trim_whitespace(raw);
    let unquoted = strip_matching_quotes(trimmed);
    Some(repair_publishable_prefix(unquoted).to_string())
}

pub fn normalize_url(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Immutable backend settings, computed once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub url: Option<String>,
    pub raw_key: Option<String>,
    pub normalized_key: Option<String>,
}

impl ClientConfig {
    pub fn from_values(url: Option<&str>, key: Option<&str>) -> Self {
        let normalized_key = normalize_key(key).filter(|k| !k.is_empty());
        Self {
            url: normalize_url(url),
            raw_key: key.map(str::to_string),
            normalized_key,
        }
    }

    /// Read the primary variables, falling back to the `SUPABASE_*` names.
    pub fn from_env() -> Self {
        let url = env_first(&[ENV_URL, ENV_URL_FALLBACK]);
        let key = env_first(&[ENV_KEY, ENV_KEY_FALLBACK]);
        Self::from_values(url.as_deref(), key.as_deref())
    }

    pub fn configured(&self) -> bool {
        self.url.is_some() && self.normalized_key.is_some()
    }

    /// Whether normalization had to change the supplied key.
    pub fn key_was_repaired(&self) -> bool {
        match (&self.raw_key, &self.normalized_key) {
            (Some(raw), Some(norm)) => raw != norm,
            _ => false,
        }
    }

    /// `None` when not configured or when the URL is not an absolute URL.
    pub fn build_client(&self) -> Option<BackendClient> {
        let (Some(url), Some(key)) = (self.url.as_deref(), self.normalized_key.as_deref()) else {
            debug!(target: "backend", "backend not configured; no client built");
            return None;
        };
        match BackendClient::new(url, key) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(target: "backend", "backend url rejected: {}", e);
                None
            }
        }
    }
}

fn env_first(names: &[&str]) -> Option<String> {
    // a blank primary name must not hide the fallback
    names.iter().find_map(|n| std::env::var(n).ok().filter(|v| !v.trim().is_empty()))
}

/// Install the process-wide config. Returns false if one was already installed.
pub fn init_client_config(cfg: ClientConfig) -> bool {
    let configured = cfg.configured();
    let repaired = cfg.key_was_repaired();
    let installed = CLIENT_CONFIG.set(cfg).is_ok();
    if installed {
        info!(target: "backend", configured, key_repaired = repaired, "backend client config installed");
    }
    installed
}

/// The process-wide config; read from the environment on first use if nothing was installed.
pub fn client_config() -> &'static ClientConfig {
    CLIENT_CONFIG.get_or_init(ClientConfig::from_env)
}

pub fn is_configured() -> bool {
    client_config().configured()
}

pub fn build_client() -> Option<BackendClient> {
    client_config().build_client()
}

/// Session behavior of the handle. Server-side use only: nothing is refreshed or stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub auto_refresh_token: bool,
    pub persist_session: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { auto_refresh_token: false, persist_session: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
    #[serde(default)]
    role: Option<String>,
}

/// Stateless handle to the persistence backend. Every call carries its own access token.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base: Url,
    key: String,
    options: SessionOptions,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(url: &str, key: &str) -> Result<Self, BackendError> {
        let base = Url::parse(url).map_err(|e| BackendError::Url(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(BackendError::Url(format!("{} cannot be a base url", url)));
        }
        let client = reqwest::Client::builder().build()?;
        Ok(Self { base, key: key.to_string(), options: SessionOptions::default(), client })
    }

    pub fn base_url(&self) -> &Url { &self.base }
    pub fn key(&self) -> &str { &self.key }
    pub fn options(&self) -> SessionOptions { self.options }

    pub fn auth_url(&self, path: &str) -> Result<Url, BackendError> {
        self.join(&format!("auth/v1/{}", path.trim_start_matches('/')))
    }

    pub fn rest_url(&self, table: &str) -> Result<Url, BackendError> {
        self.join(&format!("rest/v1/{}", table.trim_start_matches('/')))
    }

    fn join(&self, rel: &str) -> Result<Url, BackendError> {
        self.base.join(rel).map_err(|e| BackendError::Url(e.to_string()))
    }

    fn headers(&self, access_token: &str) -> Result<HeaderMap, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.key).map_err(|_| BackendError::Header("apikey"))?);
        let bearer = format!("Bearer {}", access_token);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&bearer).map_err(|_| BackendError::Header("authorization"))?);
        Ok(headers)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url, access_token: &str) -> Result<T, BackendError> {
        let endpoint = url.path().to_string();
        let resp = self.client.get(url).headers(self.headers(access_token)?).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Status { status: status.as_u16(), endpoint });
        }
        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
    }

    /// `GET auth/v1/user` for the owner of `access_token`.
    pub async fn fetch_user(&self, access_token: &str) -> Result<BackendUser, BackendError> {
        let url = self.auth_url("user")?;
        self.get_json(url, access_token).await
    }

    /// Role text from the `profiles` row of `user_id`; `None` when there is no row or no role.
    pub async fn fetch_profile_role(&self, user_id: &str, access_token: &str) -> Result<Option<String>, BackendError> {
        let mut url = self.rest_url(PROFILES_TABLE)?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{}", user_id))
            .append_pair("select", "role");
        let rows: Vec<ProfileRow> = self.get_json(url, access_token).await?;
        Ok(rows.into_iter().next().and_then(|r| r.role))
    }
}
