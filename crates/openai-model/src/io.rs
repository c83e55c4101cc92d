//! Byte-level plumbing between the HTTP body and the protocol types.

mod chunks;
mod sse;

pub use chunks::{Chunks, Error as ChunksError};
pub use sse::{Error as SseError, Sse};
