//! Sampling configuration for generation attempts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownModelError;

/// The statically known set of supported model identifiers.
///
/// Anything outside this set fails at construction via [`FromStr`] -
/// never silently defaulted, never deferred to call time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelId {
    /// `gpt-4` chat model.
    Gpt4,
    /// `gpt-3.5-turbo` chat model.
    Gpt35Turbo,
    /// `text-davinci-003` completion model.
    TextDavinci003,
}

impl ModelId {
    /// The wire name used in API requests and the price table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gpt4 => "gpt-4",
            Self::Gpt35Turbo => "gpt-3.5-turbo",
            Self::TextDavinci003 => "text-davinci-003",
        }
    }

    /// The Azure deployment id serving this model, where one exists.
    ///
    /// Chat models map onto named deployments; the completion model has
    /// no Azure counterpart.
    #[must_use]
    pub const fn azure_deployment_id(self) -> Option<&'static str> {
        match self {
            Self::Gpt4 => Some("gpt-4"),
            Self::Gpt35Turbo => Some("gpt-35"),
            Self::TextDavinci003 => None,
        }
    }
}

impl FromStr for ModelId {
    type Err = UnknownModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gpt-4" => Ok(Self::Gpt4),
            "gpt-3.5-turbo" => Ok(Self::Gpt35Turbo),
            "text-davinci-003" => Ok(Self::TextDavinci003),
            other => Err(UnknownModelError(other.to_string())),
        }
    }
}

impl TryFrom<String> for ModelId {
    type Error = UnknownModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ModelId> for String {
    fn from(id: ModelId) -> Self {
        id.as_str().to_string()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable-per-attempt sampling parameters for one generation call.
///
/// Only the controller's escalation step mutates `temperature`, and only
/// between attempts; extractors never touch the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Which model to sample from.
    pub model: ModelId,
    /// Sampling temperature in `[0, 1]`.
    pub temperature: f32,
    /// Hard cap on generated tokens. Must be positive.
    pub max_output_tokens: u32,
    /// Nucleus sampling parameter.
    pub top_p: f32,
    /// Presence penalty.
    pub presence_penalty: f32,
    /// Frequency penalty.
    pub frequency_penalty: f32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            model: ModelId::Gpt4,
            temperature: 0.0,
            max_output_tokens: 500,
            top_p: 1.0,
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
        }
    }
}

impl SamplingConfig {
    /// Config for the given model with default sampling parameters.
    #[must_use]
    pub fn new(model: ModelId) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    /// Set the sampling temperature.
    ///
    /// A value outside `[0, 1]` is a programmer error, not a runtime
    /// condition: temperatures come from code, never from user input,
    /// and the escalation step caps out well inside the range.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&temperature),
            "temperature {temperature} outside [0, 1]"
        );
        self.temperature = temperature;
        self
    }

    /// Set the output token cap. Must be positive.
    #[must_use]
    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        debug_assert!(max > 0, "max_output_tokens must be positive");
        self.max_output_tokens = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_ids_parse() {
        assert_eq!("gpt-4".parse::<ModelId>().unwrap(), ModelId::Gpt4);
        assert_eq!(
            "gpt-3.5-turbo".parse::<ModelId>().unwrap(),
            ModelId::Gpt35Turbo
        );
        assert_eq!(
            "text-davinci-003".parse::<ModelId>().unwrap(),
            ModelId::TextDavinci003
        );
    }

    #[test]
    fn unknown_model_id_fails_fast() {
        let err = "gpt-5".parse::<ModelId>().unwrap_err();
        assert_eq!(err.0, "gpt-5");
    }

    #[test]
    fn azure_deployment_mapping() {
        assert_eq!(ModelId::Gpt35Turbo.azure_deployment_id(), Some("gpt-35"));
        assert_eq!(ModelId::TextDavinci003.azure_deployment_id(), None);
    }

    #[test]
    #[should_panic(expected = "temperature")]
    fn out_of_range_temperature_is_a_programmer_error() {
        let _ = SamplingConfig::default().with_temperature(7.0);
    }

    #[test]
    #[should_panic(expected = "max_output_tokens")]
    fn zero_token_cap_is_a_programmer_error() {
        let _ = SamplingConfig::default().with_max_output_tokens(0);
    }

    #[test]
    fn serde_rejects_unknown_model() {
        let ok: Result<ModelId, _> = serde_json::from_str("\"gpt-4\"");
        assert!(ok.is_ok());
        let bad: Result<ModelId, _> = serde_json::from_str("\"llama-7b\"");
        assert!(bad.is_err());
    }
}
