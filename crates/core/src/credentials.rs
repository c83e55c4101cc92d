//! API key resolution.

use std::collections::HashMap;
use std::fmt::{self, Debug, Display};
use std::io;
use std::path::Path;

use serde_json::Value;

use crate::Error;

/// Name of the credential, both in a secret store and in the environment.
pub const API_KEY_NAME: &str = "GROQ_API_KEY";

/// A deployment-provided store of secrets.
pub trait SecretStore {
    /// Returns the secret stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;
}

/// A secret store backed by a flat JSON object, e.g.
/// `{ "GROQ_API_KEY": "gsk_..." }`.
///
/// Non-string values are ignored.
#[derive(Clone, Default)]
pub struct JsonSecretStore {
    secrets: HashMap<String, String>,
}

impl JsonSecretStore {
    /// Parses the store from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let values: HashMap<String, Value> = serde_json::from_str(json)
            .map_err(|err| {
                Error::configuration()
                    .with_reason(format!("malformed secret store: {err}"))
            })?;
        let secrets = values
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                _ => None,
            })
            .collect();
        Ok(Self { secrets })
    }

    /// Loads the store from a file.
    ///
    /// A missing file means the deployment has no secret store, and is
    /// reported as `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, Error> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(None);
            }
            Err(err) => {
                return Err(Error::configuration().with_reason(format!(
                    "cannot read {}: {err}",
                    path.display()
                )));
            }
        };
        Self::from_json(&json).map(Some)
    }
}

impl SecretStore for JsonSecretStore {
    fn get(&self, key: &str) -> Option<String> {
        self.secrets.get(key).cloned()
    }
}

impl Debug for JsonSecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSecretStore")
            .field("keys", &self.secrets.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Where the API key was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialSource {
    /// The deployment's secret store.
    SecretStore,
    /// The process environment.
    Environment,
}

impl Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::SecretStore => write!(f, "secret store"),
            CredentialSource::Environment => write!(f, "environment variables"),
        }
    }
}

/// A resolved, non-empty API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    value: String,
    source: CredentialSource,
}

impl ApiKey {
    /// Returns the key itself.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Returns where the key was found.
    #[inline]
    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Resolves the API key from the secret store first, then from the
/// process environment.
pub fn resolve_api_key(
    store: Option<&dyn SecretStore>,
) -> Result<ApiKey, Error> {
    resolve_api_key_with(store, |name| std::env::var(name).ok())
}

/// Like [`resolve_api_key`], reading the environment through `env`.
///
/// Empty or whitespace-only values count as absent, so an empty entry in
/// the secret store falls through to the environment.
pub fn resolve_api_key_with(
    store: Option<&dyn SecretStore>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ApiKey, Error> {
    let non_empty = |value: Option<String>| {
        value
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    };

    if let Some(value) = non_empty(store.and_then(|s| s.get(API_KEY_NAME))) {
        debug!("using api key from the secret store");
        return Ok(ApiKey {
            value,
            source: CredentialSource::SecretStore,
        });
    }
    if let Some(value) = non_empty(env(API_KEY_NAME)) {
        debug!("using api key from the environment");
        return Ok(ApiKey {
            value,
            source: CredentialSource::Environment,
        });
    }

    Err(Error::configuration().with_reason(format!(
        "{API_KEY_NAME} not found, set it in the secret store or the \
         environment"
    )))
}
