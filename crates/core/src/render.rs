//! Incremental rendering of a streamed response.

use std::borrow::Cow;
use std::fmt::{self, Display};

use crate::Error;
use crate::completion::Fragments;

/// Appended to the text while the response is still streaming.
pub const IN_PROGRESS_MARKER: &str = "▌";

/// One display update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frame<'a> {
    /// The request is issued, nothing arrived yet.
    Thinking,
    /// The text received so far; more is coming.
    Partial(&'a str),
    /// The complete response.
    Final(&'a str),
}

impl Frame<'_> {
    /// Returns the text to display for this frame, the in-progress marker
    /// included.
    pub fn display_text(&self) -> Cow<'_, str> {
        match self {
            Frame::Thinking => Cow::Borrowed("Thinking..."),
            Frame::Partial(text) => {
                Cow::Owned(format!("{text}{IN_PROGRESS_MARKER}"))
            }
            Frame::Final(text) => Cow::Borrowed(text),
        }
    }
}

/// Something that shows a response while it streams in.
pub trait RenderTarget {
    /// Replaces whatever is displayed for the current response.
    fn show(&mut self, frame: Frame<'_>);
}

/// A stream that failed while being rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderError {
    /// What went wrong.
    pub error: Error,
    /// The text accumulated before the failure.
    pub partial: String,
}

impl Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (after {} bytes of response)",
            self.error,
            self.partial.len()
        )
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Consumes `fragments`, pushing every intermediate state to `target`, and
/// returns the complete text.
///
/// Control goes back to the host event loop after every display update,
/// so the update can be drawn before the next fragment is requested. On an
/// error the consumption stops and the accumulated text is handed back in
/// the [`RenderError`].
pub async fn render(
    fragments: &mut Fragments,
    target: &mut dyn RenderTarget,
) -> Result<String, RenderError> {
    let mut buffer = String::new();
    target.show(Frame::Thinking);

    while let Some(item) = fragments.next().await {
        match item {
            Ok(fragment) => {
                buffer.push_str(&fragment);
                target.show(Frame::Partial(&buffer));
                tokio::task::yield_now().await;
            }
            Err(error) => {
                return Err(RenderError {
                    error,
                    partial: buffer,
                });
            }
        }
    }

    target.show(Frame::Final(&buffer));
    trace!("rendered {} bytes", buffer.len());
    Ok(buffer)
}
