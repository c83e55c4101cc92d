//! A terminal chat with Groq-hosted models.
//!
//! The crate ships the `groq-chat` CLI. The pieces it is assembled from,
//! settings, shell commands, provider setup and terminal rendering, are
//! exposed for hosts that want a different front end.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod commands;
pub mod connect;
pub mod settings;
#[cfg(feature = "cli")]
pub mod terminal;

/// Re-exports of [`groq_chat_core`] crate.
pub mod core {
    pub use groq_chat_core::*;
}
