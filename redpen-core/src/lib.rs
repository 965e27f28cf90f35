//! # redpen-core
//!
//! Reliability core for turning weakly-structured LLM output into typed
//! essay-correction records:
//!
//! - [`GenerationController`] - bounded generate/extract retry loop with
//!   temperature escalation on parse failure
//! - [`extract`] - the output grammars (sentence pairs, mistake tuples,
//!   quiz sections)
//! - [`UsageLedger`] - per-attempt token accounting and cost derivation
//! - [`SamplingConfig`] - validated per-attempt sampling parameters
//!
//! The crate performs no I/O itself: the model call is a caller-supplied
//! async callback, and every extractor is a pure function from text to a
//! typed result or a [`ParseError`].

#![deny(missing_docs)]

pub mod controller;
pub mod error;
pub mod extract;
pub mod sampling;
pub mod usage;

pub use controller::GenerationController;
pub use error::{GenerationError, ParseError, UnknownModelError};
pub use extract::ParseResult;
pub use sampling::{ModelId, SamplingConfig};
pub use usage::{PriceTable, UsageLedger, UsageRecord};
