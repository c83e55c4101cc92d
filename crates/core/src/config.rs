//! Generation parameters chosen by the user.

use std::fmt::{self, Display};
use std::ops::RangeInclusive;
use std::str::FromStr;

use groq_chat_model::SamplingParams;

use crate::Error;

/// Allowed sampling temperatures.
pub const TEMPERATURE_RANGE: RangeInclusive<f32> = 0.0..=1.0;

/// Allowed response lengths, in tokens.
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 100..=2000;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default response length, in tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// The models a user can pick from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ModelChoice {
    /// Small and quick.
    #[default]
    Fast8B,
    /// The most capable option.
    Powerful70B,
    /// In between.
    Balanced3B,
}

impl ModelChoice {
    /// All options, in the order they are offered.
    pub const ALL: [ModelChoice; 3] = [
        ModelChoice::Fast8B,
        ModelChoice::Powerful70B,
        ModelChoice::Balanced3B,
    ];

    /// Returns the identifier accepted by [`ModelChoice::from_str`].
    #[inline]
    pub fn id(self) -> &'static str {
        match self {
            ModelChoice::Fast8B => "fast-8B",
            ModelChoice::Powerful70B => "powerful-70B",
            ModelChoice::Balanced3B => "balanced-3B",
        }
    }

    /// Returns the human readable label.
    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            ModelChoice::Fast8B => "🚀 Fast (8B)",
            ModelChoice::Powerful70B => "💪 Powerful (70B)",
            ModelChoice::Balanced3B => "🔬 Balanced (3B)",
        }
    }

    /// Returns the model identifier of the upstream provider.
    #[inline]
    pub fn upstream_id(self) -> &'static str {
        match self {
            ModelChoice::Fast8B => "llama-3.1-8b-instant",
            ModelChoice::Powerful70B => "llama-3.1-70b-versatile",
            ModelChoice::Balanced3B => "llama-3.2-3b-preview",
        }
    }
}

impl Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ModelChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelChoice::ALL
            .into_iter()
            .find(|choice| choice.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<_> =
                    ModelChoice::ALL.iter().map(|c| c.id()).collect();
                Error::invalid_request().with_reason(format!(
                    "unknown model `{s}`, expected one of {}",
                    known.join(", ")
                ))
            })
    }
}

/// Parameters for the next completion request.
///
/// Values are validated on construction, so a `GenerationConfig` is always
/// within the accepted ranges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationConfig {
    model: ModelChoice,
    temperature: f32,
    max_tokens: u32,
}

impl GenerationConfig {
    /// Creates a validated configuration.
    pub fn new(
        model: ModelChoice,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Self, Error> {
        Self::default()
            .with_model(model)
            .with_temperature(temperature)?
            .with_max_tokens(max_tokens)
    }

    /// Replaces the model.
    #[inline]
    pub fn with_model(mut self, model: ModelChoice) -> Self {
        self.model = model;
        self
    }

    /// Replaces the temperature if it is within [`TEMPERATURE_RANGE`].
    pub fn with_temperature(mut self, temperature: f32) -> Result<Self, Error> {
        if !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(Error::invalid_request().with_reason(format!(
                "temperature {temperature} is outside {}..={}",
                TEMPERATURE_RANGE.start(),
                TEMPERATURE_RANGE.end()
            )));
        }
        self.temperature = temperature;
        Ok(self)
    }

    /// Replaces the response length if it is within [`MAX_TOKENS_RANGE`].
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Result<Self, Error> {
        if !MAX_TOKENS_RANGE.contains(&max_tokens) {
            return Err(Error::invalid_request().with_reason(format!(
                "max tokens {max_tokens} is outside {}..={}",
                MAX_TOKENS_RANGE.start(),
                MAX_TOKENS_RANGE.end()
            )));
        }
        self.max_tokens = max_tokens;
        Ok(self)
    }

    /// Returns the selected model.
    #[inline]
    pub fn model(&self) -> ModelChoice {
        self.model
    }

    /// Returns the sampling temperature.
    #[inline]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Returns the response length limit.
    #[inline]
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub(crate) fn sampling_params(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: ModelChoice::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = GenerationConfig::default();
        assert_eq!(config.model(), ModelChoice::Fast8B);
        assert_eq!(config.temperature(), 0.7);
        assert_eq!(config.max_tokens(), 1024);
    }

    #[test]
    fn test_ranges() {
        let config = GenerationConfig::default();
        assert!(config.with_temperature(0.0).is_ok());
        assert!(config.with_temperature(1.0).is_ok());
        assert!(config.with_max_tokens(100).is_ok());
        assert!(config.with_max_tokens(2000).is_ok());

        for temperature in [-0.1, 1.01, f32::NAN] {
            let err = config.with_temperature(temperature).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        }
        for max_tokens in [0, 99, 2001] {
            let err = config.with_max_tokens(max_tokens).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        }

        // A rejected value leaves the previous selection in place.
        assert_eq!(config.temperature(), DEFAULT_TEMPERATURE);
    }

    #[test]
    fn test_model_choices() {
        assert_eq!(
            "powerful-70B".parse::<ModelChoice>().unwrap(),
            ModelChoice::Powerful70B
        );
        assert_eq!(
            " Balanced-3b ".parse::<ModelChoice>().unwrap(),
            ModelChoice::Balanced3B
        );
        assert!("gpt-4".parse::<ModelChoice>().is_err());
        assert_eq!(
            ModelChoice::Fast8B.upstream_id(),
            "llama-3.1-8b-instant"
        );
        for choice in ModelChoice::ALL {
            let parsed: ModelChoice = choice.to_string().parse().unwrap();
            assert_eq!(parsed, choice);
        }
    }
}
