//! Transcript-related types.

use std::fmt::{self, Display};

use groq_chat_model::ModelMessage;
use serde::{Deserialize, Serialize};

/// The assistant message every fresh or reset transcript starts with.
pub const SEEDED_GREETING: &str =
    "Hi! I'm your AI assistant. How can I help you today?";

/// File name offered for the exported transcript.
pub const EXPORT_FILE_NAME: &str = "ai_chat_history.txt";

/// MIME type of the exported transcript.
pub const EXPORT_MIME_TYPE: &str = "text/plain";

/// Who wrote a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person chatting.
    User,
    /// The model.
    Assistant,
}

impl Role {
    /// Returns the uppercased label used in exports and the shell.
    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the transcript. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    /// Creates a message written by the user.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a message written by the assistant.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Returns who wrote the message.
    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the message text.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    pub(crate) fn to_model_message(&self) -> ModelMessage {
        match self.role {
            Role::User => ModelMessage::User(self.content.clone()),
            Role::Assistant => ModelMessage::Assistant(self.content.clone()),
        }
    }
}

/// The ordered messages of one session.
///
/// A transcript is never empty: it starts with [`SEEDED_GREETING`] and
/// only grows by appending, until it is reset to the greeting again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// Creates a transcript holding only the seeded greeting.
    #[inline]
    pub fn new() -> Self {
        Self {
            messages: vec![Message::assistant(SEEDED_GREETING)],
        }
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }

    /// Returns all messages in insertion order.
    #[inline]
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages, the greeting included.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always `false`, kept for symmetry with [`Transcript::len`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the most recent message.
    #[inline]
    pub fn last(&self) -> &Message {
        // The seeded greeting can't be removed.
        &self.messages[self.messages.len() - 1]
    }

    /// Serializes the transcript into a flat text document.
    ///
    /// Every message becomes one `ROLE: content` block, blocks are
    /// separated by a blank line.
    pub fn export(&self) -> String {
        let blocks: Vec<_> = self
            .messages
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect();
        let mut document = blocks.join("\n\n");
        document.push('\n');
        document
    }

    pub(crate) fn to_model_messages(&self) -> Vec<ModelMessage> {
        self.messages.iter().map(Message::to_model_message).collect()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded() {
        let transcript = Transcript::new();
        assert_eq!(transcript.len(), 1);
        assert!(!transcript.is_empty());
        assert_eq!(transcript.last(), &Message::assistant(SEEDED_GREETING));
    }

    #[test]
    fn test_append_keeps_order() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("first"));
        transcript.append(Message::assistant("second"));
        transcript.append(Message::user("third"));
        let contents: Vec<_> =
            transcript.all().iter().map(Message::content).collect();
        assert_eq!(contents, [SEEDED_GREETING, "first", "second", "third"]);
    }

    #[test]
    fn test_reset() {
        let mut transcript = Transcript::new();
        for i in 0..5 {
            transcript.append(Message::user(format!("q{i}")));
            transcript.append(Message::assistant(format!("a{i}")));
        }
        transcript.reset();
        assert_eq!(transcript, Transcript::new());

        // Resetting a fresh transcript is a no-op.
        transcript.reset();
        assert_eq!(transcript.all(), [Message::assistant(SEEDED_GREETING)]);
    }

    #[test]
    fn test_export() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("What is Rust?"));
        transcript.append(Message::assistant("A systems language."));

        let document = transcript.export();
        assert_eq!(
            document,
            "ASSISTANT: Hi! I'm your AI assistant. How can I help you today?\n\
             \n\
             USER: What is Rust?\n\
             \n\
             ASSISTANT: A systems language.\n"
        );

        let blocks: Vec<_> = document.trim_end().split("\n\n").collect();
        assert_eq!(blocks.len(), transcript.len());
        for (block, message) in blocks.iter().zip(transcript.all()) {
            let label = message.role().label();
            assert!(block.starts_with(&format!("{label}: ")));
        }
    }

    #[test]
    fn test_model_messages() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("Hi"));
        assert_eq!(
            transcript.to_model_messages(),
            vec![
                ModelMessage::Assistant(SEEDED_GREETING.to_owned()),
                ModelMessage::User("Hi".to_owned()),
            ]
        );
    }
}
