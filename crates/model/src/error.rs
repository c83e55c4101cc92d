use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request could not be issued, or the provider answered it with
    /// a non-success status.
    Unavailable,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// The response stream broke off before the provider signalled
    /// completion.
    Interrupted,
    /// Any other errors.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Unavailable => write!(f, "Provider unavailable"),
            ErrorKind::RateLimitExceeded => write!(f, "Rate limit exceeded"),
            ErrorKind::Interrupted => write!(f, "Stream interrupted"),
            ErrorKind::Other => write!(f, "Provider error"),
        }
    }
}
