//! Public error types for the pipeline.

use thiserror::Error;

/// Errors from the chat transport.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No API key in the environment or configuration.
    #[error("no API key configured; set OPENAI_API_KEY or pass one explicitly")]
    MissingApiKey,

    /// HTTP-level failure (connection, timeout, non-2xx status).
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server replied 2xx but the payload had no usable choice.
    #[error("chat response carried no content")]
    EmptyResponse,
}

/// Errors surfaced by pipeline consumers.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input text failed validation before any model call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The reliability core gave up on an artifact.
    #[error(transparent)]
    Generation(#[from] redpen_core::GenerationError),

    /// A model id without a price table entry at cost summary time.
    #[error(transparent)]
    UnknownModel(#[from] redpen_core::UnknownModelError),
}
