//! A model provider for OpenAI-compatible chat completion APIs.
//!
//! The provider targets Groq by default, any endpoint that implements the
//! streaming `/chat/completions` protocol works as well.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use groq_chat_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};
use mime::Mime;
use reqwest::{Client, StatusCode, header};
use tracing::Instrument;

pub use config::{GROQ_BASE_URL, OpenAIConfig, OpenAIConfigBuilder};
use io::{Chunks, Sse};
use response::OpenAIResponse;

/// Error type for [`OpenAIProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// OpenAI-compatible model provider.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a new `OpenAIProvider` with the given configuration.
    pub fn new(config: OpenAIConfig) -> Self {
        let client = match config.connect_timeout {
            Some(timeout) => Client::builder()
                .connect_timeout(timeout)
                .build()
                .unwrap_or_else(|err| {
                    warn!("cannot apply connect timeout: {err}");
                    Client::new()
                }),
            None => Client::new(),
        };
        Self {
            client,
            config: Arc::new(config),
        }
    }

    /// Returns the configuration of this provider.
    #[inline]
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let openai_req = proto::create_request(req);
        let resp_fut = self
            .client
            .post(self.config.completions_url())
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "text/event-stream")
            .json(&openai_req)
            .send();

        async move {
            let resp = match resp_fut.await {
                Ok(resp) => resp,
                Err(err) => {
                    return Err(Error::new(
                        format!("{err}"),
                        ErrorKind::Unavailable,
                    ));
                }
            };

            let status = resp.status();
            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            if let Err(kind) = check_response(status, content_type.as_deref())
            {
                let message = if status.is_success() {
                    format!("Unexpected content type: {content_type:?}")
                } else {
                    // The body usually explains what went wrong (an invalid
                    // key, a decommissioned model), keep it for the user.
                    let body = resp.text().await.unwrap_or_default();
                    format!("HTTP status {status}: {}", body.trim())
                };
                return Err(Error::new(message, kind));
            }

            // Here we got a successful response.
            debug!("streaming response");
            let chunks = Chunks::from_response(resp);
            let sse = Sse::new(chunks);
            Ok(OpenAIResponse::from_sse(sse))
        }
        .instrument(debug_span!("chat completion", model = %req.model))
    }
}

/// Decides whether a response can be read as a completion stream.
///
/// Rate limiting is reported separately from other failed statuses. A
/// successful response must carry an event stream.
fn check_response(
    status: StatusCode,
    content_type: Option<&str>,
) -> Result<(), ErrorKind> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ErrorKind::RateLimitExceeded);
    }
    if !status.is_success() {
        return Err(ErrorKind::Unavailable);
    }
    let is_event_stream = content_type
        .and_then(|v| v.parse().ok())
        .is_some_and(|m: Mime| m.subtype().as_str() == "event-stream");
    if !is_event_stream {
        return Err(ErrorKind::Unavailable);
    }
    Ok(())
}
