//! Core logic of the chat: transcript, generation parameters, credentials,
//! streaming completions and the session driving them.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod completion;
pub mod config;
pub mod credentials;
mod error;
pub mod render;
mod session;
pub mod transcript;

pub use completion::{CompletionClient, Fragments};
pub use error::{Error, ErrorKind};
pub use session::{
    FALLBACK_TEXT, Rejected, Session, SessionBuilder, SessionState, Turn,
    TurnId, TurnOutcome,
};
