//! Error types shared across the core.

use thiserror::Error;

/// An extractor rejected a piece of model output.
///
/// This is the expected, recoverable failure mode of the grammars in
/// [`crate::extract`]: the controller catches it, escalates the sampling
/// temperature, and retries. It never carries anything but a description
/// of what did not conform.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(String);

impl ParseError {
    /// Creates a parse error with the given description.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The human-readable description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Errors surfaced by [`crate::GenerationController`].
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Every attempt produced unextractable output.
    ///
    /// Carries the last raw model output verbatim so a human or a
    /// higher-level fallback can inspect what the model actually said.
    #[error("failed to extract model output after {attempts} attempts: {last_error}")]
    Parsing {
        /// Number of attempts made before giving up.
        attempts: usize,
        /// The parse error from the final attempt.
        last_error: ParseError,
        /// Raw text of the final attempt, untruncated.
        last_output: String,
    },

    /// The generation callback itself failed (network, auth, rate limit).
    ///
    /// Propagated immediately - transport failures never count against
    /// parse retries and never trigger temperature escalation. Recover
    /// with an outer retry-with-backoff around the whole controller call.
    #[error("generation call failed: {0}")]
    Generation(String),
}

impl GenerationError {
    /// The raw output of the last attempt, if this is a parsing failure.
    #[must_use]
    pub fn last_output(&self) -> Option<&str> {
        match self {
            Self::Parsing { last_output, .. } => Some(last_output),
            Self::Generation(_) => None,
        }
    }
}

/// A model identifier outside the statically known set.
///
/// Raised at configuration parse time or at cost computation, never at
/// call time, and never silently defaulted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported model id: {0}")]
pub struct UnknownModelError(pub String);
