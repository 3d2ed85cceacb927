use pagevoice_core::{Error, Result};
use std::fmt;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const ENV_BASE_URL: &str = "PAGEVOICE_OPENAI_COMPAT_BASE_URL";
pub const ENV_API_KEY: &str = "PAGEVOICE_OPENAI_COMPAT_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "PAGEVOICE_OPENAI_COMPAT_MODEL";
pub const ENV_OFFLINE: &str = "PAGEVOICE_OFFLINE";
pub const ENV_TIMEOUT_MS: &str = "PAGEVOICE_LLM_TIMEOUT_MS";

/// Trimmed env var; empty counts as unset.
pub fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn parse_bool(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Remote summarizer settings.
#[derive(Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// Forced-offline: never touch the network.
    pub offline: bool,
    /// No timeout unless set; a hung endpoint only fails when the transport does.
    pub timeout_ms: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            offline: false,
            timeout_ms: None,
        }
    }
}

// Hand-written so the key never reaches logs.
impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("api_key_present", &self.api_key.is_some())
            .field("model", &self.model)
            .field("offline", &self.offline)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env)
    }

    /// Build from any key lookup (the process env in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| {
            lookup(k)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let timeout_ms = get(ENV_TIMEOUT_MS).and_then(|v| match v.parse::<u64>() {
            Ok(ms) if ms > 0 => Some(ms),
            _ => {
                tracing::warn!(value = %v, "ignoring invalid PAGEVOICE_LLM_TIMEOUT_MS");
                None
            }
        });
        Self {
            base_url: get(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: get(ENV_API_KEY).or_else(|| get(ENV_API_KEY_FALLBACK)),
            model: get(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            offline: get(ENV_OFFLINE).is_some_and(|v| parse_bool(&v)),
            timeout_ms,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// The base URL as an absolute http(s) URL.
    pub fn validated_base_url(&self) -> Result<url::Url> {
        let u = url::Url::parse(&self.base_url)
            .map_err(|e| Error::NotConfigured(format!("{ENV_BASE_URL}: {e}")))?;
        match u.scheme() {
            "http" | "https" => Ok(u),
            other => Err(Error::NotConfigured(format!(
                "{ENV_BASE_URL}: unsupported scheme {other:?}"
            ))),
        }
    }
}
