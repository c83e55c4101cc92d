use serde::{Deserialize, Serialize};

/// How a preset response fails, if it does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetFailure {
    /// The request is refused before any fragment is produced.
    BeforeStream,
    /// The stream breaks off after all preset fragments were delivered.
    AfterFragments,
}

/// The preset response for an assistant turn.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Text deltas in this response, empty strings included.
    pub fragments: Vec<String>,
    /// If set, the response fails at the given point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<PresetFailure>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified fragments.
    #[inline]
    pub fn with_fragments<S: Into<String>>(
        fragments: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            failure: None,
        }
    }

    /// Creates a `PresetResponse` whose request is refused.
    #[inline]
    pub fn unavailable() -> Self {
        Self {
            fragments: vec![],
            failure: Some(PresetFailure::BeforeStream),
        }
    }

    /// Makes the stream break off after the fragments are delivered.
    #[inline]
    pub fn interrupted(mut self) -> Self {
        self.failure = Some(PresetFailure::AfterFragments);
        self
    }
}
