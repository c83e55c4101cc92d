use groq_chat_model::ModelProvider;

use super::{ErrorFn, Session, SessionState, TranscriptChangedFn};
use crate::Error;
use crate::completion::CompletionClient;
use crate::config::GenerationConfig;
use crate::transcript::Transcript;

/// [`Session`] builder.
pub struct SessionBuilder {
    client: Option<Result<CompletionClient, Error>>,
    config: GenerationConfig,
    on_transcript_changed: Option<TranscriptChangedFn>,
    on_error: Option<ErrorFn>,
}

impl SessionBuilder {
    /// Creates a builder without a completion client.
    #[inline]
    pub fn new() -> Self {
        Self {
            client: None,
            config: GenerationConfig::default(),
            on_transcript_changed: None,
            on_error: None,
        }
    }

    /// Creates a builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self::new().with_completion_client(Ok(CompletionClient::new(provider)))
    }

    /// Sets the completion client, or the configuration error that kept it
    /// from being created.
    ///
    /// A session built with an error rejects every submission.
    #[inline]
    pub fn with_completion_client(
        mut self,
        client: Result<CompletionClient, Error>,
    ) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the initial generation parameters.
    #[inline]
    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a callback to be invoked whenever the transcript changes.
    #[inline]
    pub fn on_transcript_changed(
        mut self,
        on_transcript_changed: impl Fn(&Transcript) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript_changed = Some(Box::new(on_transcript_changed));
        self
    }

    /// Attaches a callback to be invoked with every error the user should
    /// see: a configuration error once at build time, and the cause of
    /// every failed turn.
    #[inline]
    pub fn on_error(
        mut self,
        on_error: impl Fn(&Error) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// Builds the session.
    pub fn build(self) -> Session {
        let SessionBuilder {
            client,
            config,
            on_transcript_changed,
            on_error,
        } = self;

        let client = client.unwrap_or_else(|| {
            Err(Error::configuration().with_reason("no completion client"))
        });
        if let Err(err) = &client {
            error!("session has no completion client: {err}");
            if let Some(on_error) = &on_error {
                on_error(err);
            }
        }

        Session {
            client,
            transcript: Transcript::new(),
            config,
            state: SessionState::Idle,
            current_turn: None,
            next_turn_id: 1,
            on_transcript_changed,
            on_error,
        }
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
