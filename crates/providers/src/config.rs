//! Backend connection settings loaded from the environment.

use std::time::Duration;

use crate::error::ProviderError;

/// Connection settings for one backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// API credential; adapters refuse to build without it.
    pub api_key: Option<String>,
    /// Base URL without a trailing slash, e.g. `https://api.anthropic.com`.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Upper bound for one request, connect to last body byte.
    pub timeout: Duration,
}

impl BackendConfig {
    /// The API key, or a configuration error naming `provider`.
    pub fn require_key(&self, provider: &str) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::Configuration(format!("{provider} API key is not set")))
    }

    /// Load one backend's settings from `{prefix}_*` variables.
    fn from_env(
        key_var: &str,
        prefix: &str,
        default_base_url: &str,
        default_model: &str,
        default_timeout_secs: u64,
    ) -> Self {
        let api_key = std::env::var(key_var).ok().filter(|k| !k.is_empty());

        let base_url = std::env::var(format!("{prefix}_BASE_URL"))
            .unwrap_or_else(|_| default_base_url.into())
            .trim_end_matches('/')
            .to_string();

        let model =
            std::env::var(format!("{prefix}_MODEL")).unwrap_or_else(|_| default_model.into());

        let timeout_var = format!("{prefix}_TIMEOUT_SECS");
        let timeout_secs: u64 = std::env::var(&timeout_var)
            .unwrap_or_else(|_| default_timeout_secs.to_string())
            .parse()
            .unwrap_or_else(|_| panic!("{timeout_var} must be a valid u64"));

        Self {
            api_key,
            base_url,
            model,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Settings for every backend a worker may call.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub anthropic: BackendConfig,
    pub gemini: BackendConfig,
    pub images: BackendConfig,
    /// Requested output size for image generation, e.g. `1024x1024`.
    pub image_size: String,
}

impl ProviderConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                                      |
    /// |--------------------------|----------------------------------------------|
    /// | `ANTHROPIC_API_KEY`      | unset                                        |
    /// | `ANTHROPIC_BASE_URL`     | `https://api.anthropic.com`                  |
    /// | `ANTHROPIC_MODEL`        | `claude-3-7-sonnet-20250219`                 |
    /// | `ANTHROPIC_TIMEOUT_SECS` | `300`                                        |
    /// | `GOOGLE_API_KEY`         | unset                                        |
    /// | `GEMINI_BASE_URL`        | `https://generativelanguage.googleapis.com`  |
    /// | `GEMINI_MODEL`           | `gemini-2.0-flash-exp`                       |
    /// | `GEMINI_TIMEOUT_SECS`    | `120`                                        |
    /// | `OPENAI_API_KEY`         | unset                                        |
    /// | `IMAGES_BASE_URL`        | `https://api.openai.com`                     |
    /// | `IMAGES_MODEL`           | `dall-e-3`                                   |
    /// | `IMAGES_TIMEOUT_SECS`    | `180`                                        |
    /// | `IMAGES_SIZE`            | `1024x1024`                                  |
    pub fn from_env() -> Self {
        Self {
            anthropic: BackendConfig::from_env(
                "ANTHROPIC_API_KEY",
                "ANTHROPIC",
                "https://api.anthropic.com",
                "claude-3-7-sonnet-20250219",
                300,
            ),
            gemini: BackendConfig::from_env(
                "GOOGLE_API_KEY",
                "GEMINI",
                "https://generativelanguage.googleapis.com",
                "gemini-2.0-flash-exp",
                120,
            ),
            images: BackendConfig::from_env(
                "OPENAI_API_KEY",
                "IMAGES",
                "https://api.openai.com",
                "dall-e-3",
                180,
            ),
            image_size: std::env::var("IMAGES_SIZE").unwrap_or_else(|_| "1024x1024".into()),
        }
    }

    /// Point every backend at one base URL with the same key. Used to run
    /// against a local mock or gateway.
    pub fn uniform(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        let backend = |model: &str| BackendConfig {
            api_key: Some(api_key.to_string()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        };
        Self {
            anthropic: backend("claude-3-7-sonnet-20250219"),
            gemini: backend("gemini-2.0-flash-exp"),
            images: backend("dall-e-3"),
            image_size: "1024x1024".into(),
        }
    }
}
