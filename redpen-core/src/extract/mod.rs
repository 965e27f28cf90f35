//! Output grammars: typed extractors over raw model text.
//!
//! Each extractor is a pure, total function from one opaque text blob to
//! either a typed result or a [`ParseError`]. They define what
//! "well-formatted" means for the three recurring output shapes:
//!
//! - [`mistakes`] - arrow-annotated mistake tuples (`a -> b (Label)`)
//! - [`sentence_pairs`] - paired-line sentence corrections
//! - [`quiz_sections`] - `---`-delimited multi-field quiz blocks
//!
//! The leniency policy deliberately differs per grammar: an unknown
//! mistake label drops that match, an unknown quiz section type drops
//! that section, but a malformed body inside a recognized quiz section
//! fails the whole call - a structurally broken quiz is never worth
//! rendering, while one bad item in a batch is.

mod mistake;
mod quiz;
mod sentence;

pub use mistake::{mistakes, Mistake, MistakeCategory};
pub use quiz::{quiz_sections, FreeAnswerQuiz, MultipleChoiceQuiz, QuizSection};
pub use sentence::{sentence_pairs, PairFormat, SentencePair};

use crate::error::ParseError;

/// Result type shared by all extractors.
pub type ParseResult<T> = Result<T, ParseError>;

/// Blank marker substituted for the bracketed token in quiz questions.
pub const BLANK_MARKER: &str = "____";
