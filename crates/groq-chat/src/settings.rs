//! Startup settings read from the environment.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use groq_chat_core::config::GenerationConfig;

/// Path of the JSON secret store.
pub const SECRETS_PATH_VAR: &str = "GROQ_CHAT_SECRETS";
/// Initial model option, one of the
/// [`ModelChoice`](groq_chat_core::config::ModelChoice) ids.
pub const MODEL_VAR: &str = "GROQ_CHAT_MODEL";
/// Initial sampling temperature.
pub const TEMPERATURE_VAR: &str = "GROQ_CHAT_TEMPERATURE";
/// Initial response length cap.
pub const MAX_TOKENS_VAR: &str = "GROQ_CHAT_MAX_TOKENS";
/// Endpoint override.
pub const BASE_URL_VAR: &str = "GROQ_BASE_URL";
/// Connect timeout in whole seconds. Unset means no timeout.
pub const CONNECT_TIMEOUT_VAR: &str = "GROQ_CHAT_CONNECT_TIMEOUT_SECS";

/// Secret store used when [`SECRETS_PATH_VAR`] is not set.
pub const DEFAULT_SECRETS_PATH: &str = "secrets.json";

/// Settings of one shell run.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Parameters of the first request.
    pub generation: GenerationConfig,
    /// Endpoint override, the provider's default when `None`.
    pub base_url: Option<String>,
    /// Where the secret store is looked up.
    pub secrets_path: PathBuf,
    /// Bound on connection setup.
    pub connect_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            base_url: None,
            secrets_path: PathBuf::from(DEFAULT_SECRETS_PATH),
            connect_timeout: None,
        }
    }
}

impl Settings {
    /// Reads the settings from the process environment.
    ///
    /// See [`Settings::from_env_with`].
    pub fn from_env() -> (Self, Vec<String>) {
        Self::from_env_with(|name| env::var(name).ok())
    }

    /// Reads the settings through `lookup`.
    ///
    /// Invalid values never abort startup: the default is kept and a
    /// warning describing the value is returned alongside the settings.
    /// Empty values count as unset.
    pub fn from_env_with(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> (Self, Vec<String>) {
        let lookup = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let mut settings = Self::default();
        let mut warnings = vec![];
        let mut reject = |name: &str, value: &str, reason: &dyn Display| {
            let warning = format!("ignoring {name}=`{value}`: {reason}");
            warn!("{warning}");
            warnings.push(warning);
        };

        let mut generation = settings.generation;
        if let Some(value) = lookup(MODEL_VAR) {
            match value.parse() {
                Ok(model) => generation = generation.with_model(model),
                Err(err) => reject(MODEL_VAR, &value, &err),
            }
        }
        if let Some(value) = lookup(TEMPERATURE_VAR) {
            match parse(&value).and_then(|t| {
                generation.with_temperature(t).map_err(|e| e.to_string())
            }) {
                Ok(config) => generation = config,
                Err(err) => reject(TEMPERATURE_VAR, &value, &err),
            }
        }
        if let Some(value) = lookup(MAX_TOKENS_VAR) {
            match parse(&value).and_then(|n| {
                generation.with_max_tokens(n).map_err(|e| e.to_string())
            }) {
                Ok(config) => generation = config,
                Err(err) => reject(MAX_TOKENS_VAR, &value, &err),
            }
        }
        settings.generation = generation;

        settings.base_url = lookup(BASE_URL_VAR);
        if let Some(path) = lookup(SECRETS_PATH_VAR) {
            settings.secrets_path = PathBuf::from(path);
        }
        if let Some(value) = lookup(CONNECT_TIMEOUT_VAR) {
            match parse::<u64>(&value) {
                Ok(0) => {
                    reject(CONNECT_TIMEOUT_VAR, &value, &"must be positive")
                }
                Ok(secs) => {
                    settings.connect_timeout = Some(Duration::from_secs(secs))
                }
                Err(err) => reject(CONNECT_TIMEOUT_VAR, &value, &err),
            }
        }

        (settings, warnings)
    }
}

fn parse<T>(value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|err: T::Err| err.to_string())
}

/// Formats the generation parameters for display.
pub fn describe(config: &GenerationConfig) -> String {
    format!(
        "model: {} ({}), temperature: {:.1}, max tokens: {}",
        config.model().label(),
        config.model(),
        config.temperature(),
        config.max_tokens()
    )
}
