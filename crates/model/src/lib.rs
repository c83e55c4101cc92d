//! An abstraction layer for chat completion providers.
//!
//! This crate establishes an unified protocol for the chat session to
//! interact with a completion backend, so that the session logic never
//! depends on a concrete HTTP API. The production backend speaks the
//! OpenAI-compatible streaming protocol, while tests plug in a scripted
//! provider.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
