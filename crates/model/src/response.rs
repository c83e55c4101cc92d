use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ModelProviderError;

/// The streamed body of an accepted completion request.
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Polls for the next piece of the streamed completion.
    ///
    /// Yields text deltas in the order the provider sent them, then a single
    /// [`ModelResponseEvent::Completed`], then `Ok(None)` forever after.
    /// `Poll::Pending` registers the task for wakeup like any stream.
    ///
    /// An `Err` means the stream broke off after it was established; no
    /// further events follow it.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// The reason why a model response has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model has finished generating text.
    Stop,
    /// The response hit the `max_tokens` limit.
    Length,
}

/// The event from a model response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// The response has been completed.
    Completed(ModelFinishReason),
    /// Received a message delta. The delta may be empty.
    MessageDelta(String),
}
