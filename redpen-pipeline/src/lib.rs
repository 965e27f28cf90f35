//! # redpen-pipeline
//!
//! Consumers of the redpen reliability core: a chat transport boundary,
//! the correction / classification / explanation / quiz / native-rewrite
//! call sites, and the top-level review pipeline that strings them
//! together.
//!
//! ## Example
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use redpen_pipeline::client::OpenAiClient;
//! use redpen_pipeline::review::{ReviewOptions, ReviewPipeline};
//!
//! let client = OpenAiClient::from_env()?;
//! let pipeline = ReviewPipeline::new(&client);
//! let review = pipeline
//!     .review("I looked a movie with my friends.", &ReviewOptions::default())
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&review)?);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

/// Chat transport boundary: trait, HTTP client, outcome type.
pub mod client;

/// Mistake classification consumer.
pub mod classify;

/// Teacher comment consumer.
pub mod comment;

/// Essay correction consumer.
pub mod correction;

/// Sentence splitting and input validation.
pub mod essay;

/// Public error types.
pub mod errors;

/// Per-mistake explanation consumer.
pub mod explanation;

/// Native rewrite and expression-notes consumer.
pub mod native;

/// Quiz generation consumer.
pub mod quiz;

/// Top-level review pipeline.
pub mod review;

/// Essay scoring consumer.
pub mod score;
