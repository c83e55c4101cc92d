//! Provider setup.

use std::env;

use groq_chat_core::credentials::{
    API_KEY_NAME, CredentialSource, JsonSecretStore, SecretStore,
    resolve_api_key_with,
};
use groq_chat_core::{CompletionClient, Error};
use groq_chat_openai_model::{OpenAIConfigBuilder, OpenAIProvider};

use crate::settings::Settings;

/// Creates the completion client, resolving the API key from the secret
/// store and the process environment.
///
/// Returns where the key was found along with the client.
pub fn connect(
    settings: &Settings,
) -> Result<(CompletionClient, CredentialSource), Error> {
    let (provider, source) =
        provider_with(settings, |name| env::var(name).ok())?;
    Ok((CompletionClient::new(provider), source))
}

/// Creates the provider, reading the environment through `env`.
///
/// An unreadable or malformed secret store is logged and skipped, the
/// environment may still hold the key.
pub fn provider_with(
    settings: &Settings,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(OpenAIProvider, CredentialSource), Error> {
    let store = JsonSecretStore::load(&settings.secrets_path)
        .unwrap_or_else(|err| {
            warn!("skipping the secret store: {err}");
            None
        });
    let api_key = resolve_api_key_with(
        store.as_ref().map(|store| store as &dyn SecretStore),
        env,
    )?;
    info!("{API_KEY_NAME} loaded from the {}", api_key.source());

    let mut builder = OpenAIConfigBuilder::with_api_key(api_key.expose());
    if let Some(base_url) = &settings.base_url {
        builder = builder.with_base_url(base_url);
    }
    if let Some(timeout) = settings.connect_timeout {
        builder = builder.with_connect_timeout(timeout);
    }
    let config = builder.build();
    debug!("provider config: {config:?}");

    Ok((OpenAIProvider::new(config), api_key.source()))
}
