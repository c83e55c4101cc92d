use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No usable credential was found. Fatal to the completion client.
    Configuration,
    /// The completion request could not be issued.
    ProviderUnavailable,
    /// The response stream failed after it was established.
    StreamInterrupted,
    /// The request violates the input constraints of the completion
    /// client.
    InvalidRequest,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "Configuration error"),
            ErrorKind::ProviderUnavailable => write!(f, "Provider unavailable"),
            ErrorKind::StreamInterrupted => write!(f, "Stream interrupted"),
            ErrorKind::InvalidRequest => write!(f, "Invalid request"),
        }
    }
}

/// Describes a chat error.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
}

impl Error {
    /// Creates a new error with the `Configuration` kind.
    #[inline]
    pub fn configuration() -> Self {
        Self::from_kind(ErrorKind::Configuration)
    }

    /// Creates a new error with the `ProviderUnavailable` kind.
    #[inline]
    pub fn provider_unavailable() -> Self {
        Self::from_kind(ErrorKind::ProviderUnavailable)
    }

    /// Creates a new error with the `StreamInterrupted` kind.
    #[inline]
    pub fn stream_interrupted() -> Self {
        Self::from_kind(ErrorKind::StreamInterrupted)
    }

    /// Creates a new error with the `InvalidRequest` kind.
    #[inline]
    pub fn invalid_request() -> Self {
        Self::from_kind(ErrorKind::InvalidRequest)
    }

    #[inline]
    fn from_kind(kind: ErrorKind) -> Self {
        Self { kind, reason: None }
    }

    /// Attaches a reason to the error.
    #[inline]
    pub fn with_reason<S: Into<String>>(self, reason: S) -> Self {
        Self {
            kind: self.kind,
            reason: Some(reason.into()),
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the reason for the error.
    #[inline]
    pub fn reason(&self) -> Cow<'_, str> {
        match self.reason.as_deref() {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(format!("{}", self.kind)),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {reason}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl StdError for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::provider_unavailable().to_string(),
            "Provider unavailable"
        );
        let err = Error::configuration().with_reason("GROQ_API_KEY is empty");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.reason(), "GROQ_API_KEY is empty");
        assert_eq!(
            err.to_string(),
            "Configuration error: GROQ_API_KEY is empty"
        );
    }
}
