use std::pin::Pin;
use std::task::{Context, Poll, ready};

use groq_chat_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};
use pin_project_lite::pin_project;

use crate::Error;
use crate::io::{Sse, SseError};
use crate::proto::ChatCompletionChunk;

struct PartialState {
    sse: Sse,
    id: Option<String>,
    // Set when a chunk carries the finish reason, cleared after the
    // complete event is returned.
    pending_finish_reason: Option<ModelFinishReason>,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            pending_finish_reason: None,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, partial_state)) => {
                    trace!("response {:?} finished", partial_state.id);
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

#[inline]
fn interrupted(message: impl Into<String>) -> Error {
    Error::new(message, ErrorKind::Interrupted)
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    if let Some(finish_reason) = partial_state.pending_finish_reason.take() {
        return Ok((
            Some(ModelResponseEvent::Completed(finish_reason)),
            partial_state,
        ));
    }

    let sse = &mut partial_state.sse;
    loop {
        let sse_event = match sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(SseError::ChunksError(err)) => {
                return Err(interrupted(format!(
                    "connection closed mid-stream: {}",
                    err.0
                )));
            }
            Err(SseError::InvalidPayload) => {
                return Err(interrupted("malformed event stream"));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            break;
        }

        let mut chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| interrupted(format!("{err}")))?;
        if let Some(error) = chunk.error {
            return Err(interrupted(error.message));
        }
        if let Some(id) = chunk.id.take() {
            if partial_state.id.get_or_insert_with(|| id.clone()) != &id {
                return Err(interrupted("chunk id mismatch"));
            }
        }

        let Some(choice) = chunk.choices.pop() else {
            // Usage-only chunks carry no choices.
            continue;
        };

        let finish_reason = choice.finish_reason.map(|reason| {
            if reason == "length" {
                ModelFinishReason::Length
            } else {
                ModelFinishReason::Stop
            }
        });

        match choice.delta.content {
            Some(content) if !content.is_empty() => {
                // A chunk may carry both the last delta and the finish
                // reason, deliver the delta first.
                partial_state.pending_finish_reason = finish_reason;
                return Ok((
                    Some(ModelResponseEvent::MessageDelta(content)),
                    partial_state,
                ));
            }
            _ => {}
        }
        if let Some(finish_reason) = finish_reason {
            return Ok((
                Some(ModelResponseEvent::Completed(finish_reason)),
                partial_state,
            ));
        }
    }

    Ok((None, partial_state))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;
    use groq_chat_model::ModelProviderError;

    use super::*;
    use crate::io::Chunks;

    async fn collect(
        chunks: Chunks,
    ) -> (Vec<ModelResponseEvent>, Option<Error>) {
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks)));
        let mut events = vec![];
        loop {
            match poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await {
                Ok(Some(event)) => events.push(event),
                Ok(None) => return (events, None),
                Err(err) => return (events, Some(err)),
            }
        }
    }

    #[tokio::test]
    async fn test_recorded_response() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(include_bytes!(
                "../fixtures/groq_response.txt"
            ))]
            .into(),
        );
        let (events, err) = collect(chunks).await;
        assert!(err.is_none());
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Rust".to_owned()),
                ModelResponseEvent::MessageDelta(" is a".to_owned()),
                ModelResponseEvent::MessageDelta(
                    " systems language.".to_owned()
                ),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_delta_with_finish_reason() {
        let chunks = Chunks::from_vec_deque(VecDeque::from([
            Bytes::from_static(
                br#"data: {"id":"a","choices":[{"delta":{"content":"cut"},"finish_reason":"length"}]}

"#,
            ),
        ]));
        let (events, err) = collect(chunks).await;
        assert!(err.is_none());
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("cut".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Length),
            ]
        );
    }

    #[tokio::test]
    async fn test_interrupted_stream() {
        let chunks = Chunks::broken_after(VecDeque::from([
            Bytes::from_static(
                br#"data: {"id":"a","choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}

"#,
            ),
        ]));
        let (events, err) = collect(chunks).await;
        assert_eq!(
            events,
            vec![ModelResponseEvent::MessageDelta("Hel".to_owned())]
        );
        assert_eq!(err.unwrap().kind(), ErrorKind::Interrupted);
    }

    #[tokio::test]
    async fn test_error_event() {
        let chunks = Chunks::from_vec_deque(VecDeque::from([
            Bytes::from_static(
                b"data: {\"error\":{\"message\":\"overloaded\"}}\n\n",
            ),
        ]));
        let (events, err) = collect(chunks).await;
        assert!(events.is_empty());
        let err = err.unwrap();
        assert_eq!(err.kind(), ErrorKind::Interrupted);
        assert_eq!(err.message(), "overloaded");
    }
}
