mod builder;
#[cfg(test)]
mod tests;

use std::fmt::{self, Display};

use crate::completion::{CompletionClient, Fragments};
use crate::config::GenerationConfig;
use crate::render::{self, RenderError, RenderTarget};
use crate::transcript::{Message, Transcript};
use crate::{Error, ErrorKind};
pub use builder::SessionBuilder;

/// The assistant message recorded when a completion fails.
pub const FALLBACK_TEXT: &str =
    "Sorry, I encountered an error. Please try again.";

/// Where the session is in its request cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Ready for the next submission.
    #[default]
    Idle,
    /// A completion is in flight.
    AwaitingResponse,
}

/// Why the session refused an operation. The session is left untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejected {
    /// The input is empty or whitespace-only.
    EmptyInput,
    /// A completion is already in flight.
    Busy,
    /// The completion client could not be created.
    Unconfigured,
}

impl Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejected::EmptyInput => write!(f, "nothing to send"),
            Rejected::Busy => write!(f, "still waiting for the last response"),
            Rejected::Unconfigured => write!(f, "the chat is not configured"),
        }
    }
}

impl std::error::Error for Rejected {}

/// Identifies one submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TurnId(u64);

/// An accepted submission whose response is still to be consumed.
///
/// Feed [`Turn::fragments`] to [`render::render`] and hand the outcome back
/// to [`Session::finish`]. Dropping a turn without finishing it leaves the
/// session in [`SessionState::AwaitingResponse`] until [`Session::cancel`]
/// is called.
#[derive(Debug)]
pub struct Turn {
    id: TurnId,
    /// The response of this turn.
    pub fragments: Fragments,
}

impl Turn {
    /// Returns the identifier of this turn.
    #[inline]
    pub fn id(&self) -> TurnId {
        self.id
    }
}

/// How a turn ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The response was recorded.
    Completed(String),
    /// The fallback text was recorded instead of the response.
    Failed(Error),
}

type TranscriptChangedFn = Box<dyn Fn(&Transcript) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&Error) + Send + Sync>;

/// A chat session: the transcript, the generation parameters and the
/// request cycle driving them.
///
/// The session owns all conversation state; it lives as long as the chat
/// and nothing else mutates the transcript. Observers subscribe through
/// [`SessionBuilder::on_transcript_changed`] and
/// [`SessionBuilder::on_error`].
pub struct Session {
    client: Result<CompletionClient, Error>,
    transcript: Transcript,
    config: GenerationConfig,
    state: SessionState,
    current_turn: Option<TurnId>,
    next_turn_id: u64,

    on_transcript_changed: Option<TranscriptChangedFn>,
    on_error: Option<ErrorFn>,
}

impl Session {
    /// Returns a builder.
    #[inline]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Returns the transcript.
    #[inline]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the parameters used for the next request.
    #[inline]
    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Replaces the parameters; the next request picks them up.
    #[inline]
    pub fn set_config(&mut self, config: GenerationConfig) {
        self.config = config;
    }

    /// Returns the error that keeps the session from sending anything.
    #[inline]
    pub fn configuration_error(&self) -> Option<&Error> {
        self.client.as_ref().err()
    }

    /// Accepts a user message and starts its completion.
    ///
    /// The message is appended and the session moves to
    /// [`SessionState::AwaitingResponse`]. Rejected submissions leave the
    /// session untouched.
    pub fn submit(&mut self, text: &str) -> Result<Turn, Rejected> {
        if text.trim().is_empty() {
            return Err(Rejected::EmptyInput);
        }
        if self.state == SessionState::AwaitingResponse {
            return Err(Rejected::Busy);
        }
        let Ok(client) = &self.client else {
            return Err(Rejected::Unconfigured);
        };

        let id = TurnId(self.next_turn_id);
        self.next_turn_id += 1;
        debug!("turn {id:?} submitted");

        self.transcript.append(Message::user(text));
        let fragments = client
            .complete(&self.transcript, &self.config)
            .unwrap_or_else(Fragments::failed);
        self.state = SessionState::AwaitingResponse;
        self.current_turn = Some(id);
        self.notify_transcript_changed();

        Ok(Turn { id, fragments })
    }

    /// Records the outcome of a rendered turn and returns to
    /// [`SessionState::Idle`].
    ///
    /// Returns `None` if `turn` is not the one in flight (it was cancelled),
    /// in which case nothing is recorded.
    pub fn finish(
        &mut self,
        turn: TurnId,
        result: Result<String, RenderError>,
    ) -> Option<TurnOutcome> {
        if self.current_turn != Some(turn) {
            warn!("ignoring the outcome of stale turn {turn:?}");
            return None;
        }
        Some(self.record(result))
    }

    /// Submits `text`, streams the response into `target` and records it.
    pub async fn send(
        &mut self,
        text: &str,
        target: &mut dyn RenderTarget,
    ) -> Result<TurnOutcome, Rejected> {
        let mut turn = self.submit(text)?;
        let result = render::render(&mut turn.fragments, target).await;
        // `self` stays borrowed for the whole render, nothing can cancel
        // the turn in between.
        debug_assert_eq!(self.current_turn, Some(turn.id));
        Ok(self.record(result))
    }

    /// Abandons the turn in flight, if any.
    ///
    /// The user message stays in the transcript and no assistant message
    /// is recorded for it. The caller drops the turn's fragments, which
    /// closes the connection. Returns `true` if a turn was cancelled.
    pub fn cancel(&mut self) -> bool {
        let Some(turn) = self.current_turn.take() else {
            return false;
        };
        info!("turn {turn:?} cancelled");
        self.state = SessionState::Idle;
        true
    }

    /// Replaces the transcript with the seeded greeting.
    ///
    /// Only allowed while idle.
    pub fn reset(&mut self) -> Result<(), Rejected> {
        if self.state != SessionState::Idle {
            return Err(Rejected::Busy);
        }
        self.transcript.reset();
        debug!("transcript reset");
        self.notify_transcript_changed();
        Ok(())
    }

    /// Serializes the transcript, see [`Transcript::export`].
    #[inline]
    pub fn export(&self) -> String {
        self.transcript.export()
    }

    fn record(&mut self, result: Result<String, RenderError>) -> TurnOutcome {
        match result {
            Ok(text) => {
                self.stream_complete(text.clone());
                TurnOutcome::Completed(text)
            }
            Err(RenderError { error, partial }) => {
                self.stream_failed(&error, &partial);
                TurnOutcome::Failed(error)
            }
        }
    }

    fn stream_complete(&mut self, final_text: String) {
        self.end_turn(Message::assistant(final_text));
    }

    fn stream_failed(&mut self, error: &Error, partial: &str) {
        debug_assert!(matches!(
            error.kind(),
            ErrorKind::ProviderUnavailable
                | ErrorKind::StreamInterrupted
                | ErrorKind::InvalidRequest
        ));
        warn!(
            "turn failed after {} bytes, recording the fallback: {error}",
            partial.len()
        );
        self.end_turn(Message::assistant(FALLBACK_TEXT));
        if let Some(on_error) = &self.on_error {
            on_error(error);
        }
    }

    fn end_turn(&mut self, message: Message) {
        self.transcript.append(message);
        self.state = SessionState::Idle;
        self.current_turn = None;
        self.notify_transcript_changed();
    }

    fn notify_transcript_changed(&self) {
        if let Some(on_transcript_changed) = &self.on_transcript_changed {
            on_transcript_changed(&self.transcript);
        }
    }
}
