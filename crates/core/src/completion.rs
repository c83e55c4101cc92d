use std::fmt::{self, Debug};
use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use groq_chat_model::{
    ModelProvider, ModelProviderError, ModelRequest, ModelResponse,
    ModelResponseEvent,
};
use tracing::Instrument;

use crate::Error;
use crate::config::GenerationConfig;
use crate::transcript::Transcript;

type ErasedResult<T> = Result<T, Box<dyn ModelProviderError>>;
type BoxedResponse = Pin<Box<dyn ErasedResponse>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = ErasedResult<BoxedResponse>> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// Object-safe view of [`ModelResponse`].
trait ErasedResponse: Send {
    fn poll_erased(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<ErasedResult<Option<ModelResponseEvent>>>;
}

impl<R: ModelResponse> ErasedResponse for R {
    #[inline]
    fn poll_erased(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<ErasedResult<Option<ModelResponseEvent>>> {
        self.poll_next_event(cx)
            .map_err(|err| Box::new(err) as Box<dyn ModelProviderError>)
    }
}

/// A wrapper around a model provider that turns a transcript and a
/// [`GenerationConfig`] into a stream of text fragments.
///
/// The client is stateless between invocations and cheap to clone.
#[derive(Clone)]
pub struct CompletionClient {
    handler_fn: HandlerFn,
}

impl CompletionClient {
    /// Creates a client for the given provider.
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // Erase `P`, the session holds the client without a generic
        // parameter.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("sending request: {req:?}");
                    match fut.await {
                        Ok(resp) => Ok(Box::pin(resp) as BoxedResponse),
                        Err(err) => {
                            error!("request failed: {err}");
                            Err(Box::new(err) as Box<dyn ModelProviderError>)
                        }
                    }
                }
                .instrument(trace_span!("completion request")),
            )
        });
        Self { handler_fn }
    }

    /// Starts a completion for `transcript`.
    ///
    /// Nothing is sent until the returned [`Fragments`] is first polled.
    /// Input constraints are checked right away; a violation is returned
    /// as an `InvalidRequest` error and no request is issued.
    pub fn complete(
        &self,
        transcript: &Transcript,
        config: &GenerationConfig,
    ) -> Result<Fragments, Error> {
        if transcript.is_empty() {
            return Err(Error::invalid_request()
                .with_reason("cannot complete an empty transcript"));
        }
        // Re-validate, `GenerationConfig` upholds the ranges but this is
        // the last stop before the network.
        GenerationConfig::new(
            config.model(),
            config.temperature(),
            config.max_tokens(),
        )?;

        let req = ModelRequest {
            model: config.model().upstream_id().to_owned(),
            messages: transcript.to_model_messages(),
            params: config.sampling_params(),
        };
        debug!(
            "completing {} messages with {}",
            req.messages.len(),
            req.model
        );
        Ok(Fragments {
            stage: Stage::Pending(Arc::clone(&self.handler_fn), req),
        })
    }
}

impl Debug for CompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionClient").finish_non_exhaustive()
    }
}

enum Stage {
    Pending(HandlerFn, ModelRequest),
    Connecting(BoxedSendRequestFuture),
    Streaming(BoxedResponse),
    Failed(Error),
    #[cfg(test)]
    Preset(std::collections::VecDeque<Result<String, Error>>),
    Finished,
}

/// The text fragments of one completion.
///
/// A lazy, single-pass and finite sequence: the request is issued on the
/// first call to [`Fragments::next`], and the sequence ends when the
/// provider signals completion or after the first error. Dropping it
/// closes the underlying connection.
pub struct Fragments {
    stage: Stage,
}

impl Fragments {
    /// Pulls the next non-empty fragment.
    ///
    /// Returns `None` once the response is complete. An error is returned
    /// at most once and ends the sequence: `ProviderUnavailable` if the
    /// request could not be issued, `StreamInterrupted` if the stream
    /// broke off after it was established.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe.
    #[inline]
    pub async fn next(&mut self) -> Option<Result<String, Error>> {
        poll_fn(|cx| self.poll_next(cx)).await
    }

    /// Returns `true` if the sequence has ended.
    #[inline]
    pub fn is_finished(&self) -> bool {
        matches!(self.stage, Stage::Finished)
    }

    /// Creates a sequence that yields `error` and ends.
    #[inline]
    pub fn failed(error: Error) -> Self {
        Self {
            stage: Stage::Failed(error),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_preset(
        items: impl IntoIterator<Item = Result<String, Error>>,
    ) -> Self {
        Self {
            stage: Stage::Preset(items.into_iter().collect()),
        }
    }

    fn poll_next(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<String, Error>>> {
        loop {
            match &mut self.stage {
                Stage::Pending(handler_fn, req) => {
                    let fut = handler_fn(req.clone());
                    self.stage = Stage::Connecting(fut);
                }
                Stage::Connecting(fut) => match ready!(fut.as_mut().poll(cx)) {
                    Ok(resp) => {
                        trace!("response stream established");
                        self.stage = Stage::Streaming(resp);
                    }
                    Err(err) => {
                        self.stage = Stage::Finished;
                        return Poll::Ready(Some(Err(
                            Error::provider_unavailable()
                                .with_reason(format!("{err}")),
                        )));
                    }
                },
                Stage::Streaming(resp) => {
                    match ready!(resp.as_mut().poll_erased(cx)) {
                        Ok(Some(ModelResponseEvent::MessageDelta(delta))) => {
                            if delta.is_empty() {
                                continue;
                            }
                            return Poll::Ready(Some(Ok(delta)));
                        }
                        Ok(Some(ModelResponseEvent::Completed(reason))) => {
                            debug!("completion finished: {reason:?}");
                        }
                        Ok(None) => {
                            self.stage = Stage::Finished;
                            return Poll::Ready(None);
                        }
                        Err(err) => {
                            error!("stream interrupted: {err}");
                            self.stage = Stage::Finished;
                            return Poll::Ready(Some(Err(
                                Error::stream_interrupted()
                                    .with_reason(format!("{err}")),
                            )));
                        }
                    }
                }
                Stage::Failed(error) => {
                    let error = error.clone();
                    self.stage = Stage::Finished;
                    return Poll::Ready(Some(Err(error)));
                }
                #[cfg(test)]
                Stage::Preset(items) => {
                    let item = items.pop_front();
                    if item.as_ref().is_none_or(Result::is_err) {
                        self.stage = Stage::Finished;
                    }
                    return Poll::Ready(item);
                }
                Stage::Finished => return Poll::Ready(None),
            }
        }
    }
}

impl Debug for Fragments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.stage {
            Stage::Pending(..) => "pending",
            Stage::Connecting(_) => "connecting",
            Stage::Streaming(_) => "streaming",
            Stage::Failed(_) => "failed",
            #[cfg(test)]
            Stage::Preset(_) => "preset",
            Stage::Finished => "finished",
        };
        f.debug_struct("Fragments").field("stage", &stage).finish()
    }
}
