//! Sentence splitting and input validation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;

static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
    Regex::new(r"[^.!?]+[.!?]").unwrap()
});

/// An essay as an ordered list of sentences plus the joined paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Essay {
    /// The sentences in order.
    pub sentences: Vec<String>,
    /// The sentences joined with single spaces.
    pub paragraph: String,
}

impl Essay {
    /// Builds an essay from pre-split sentences.
    #[must_use]
    pub fn from_sentences(sentences: Vec<String>) -> Self {
        let paragraph = sentences.join(" ");
        Self {
            sentences,
            paragraph,
        }
    }

    /// Splits a paragraph into sentences on terminal punctuation.
    #[must_use]
    pub fn from_paragraph(paragraph: &str) -> Self {
        let sentences = split_into_sentences(paragraph);
        Self::from_sentences(sentences)
    }
}

/// Splits on `.`, `!` and `?`, trimming each sentence. Text after the
/// last terminator is dropped, matching the upstream correction prompt
/// which only ever sees complete sentences.
#[must_use]
pub fn split_into_sentences(paragraph: &str) -> Vec<String> {
    SENTENCE_RE
        .find_iter(paragraph)
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Word-count gate applied before any model call is spent on the text.
pub fn validate_text(text: &str, max_words: usize, min_words: usize) -> Result<(), PipelineError> {
    if text.is_empty() {
        return Err(PipelineError::InvalidInput("text is empty".to_string()));
    }
    let words = text.split_whitespace().count();
    if words >= max_words {
        return Err(PipelineError::InvalidInput(format!(
            "text has {words} words, the maximum is {max_words}"
        )));
    }
    if words <= min_words {
        return Err(PipelineError::InvalidInput(format!(
            "text has {words} words, the minimum is {min_words}"
        )));
    }
    Ok(())
}

/// Flattens line breaks so sentence splitting sees one paragraph.
#[must_use]
pub fn preprocess(text: &str) -> String {
    text.replace('\r', " ").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let sentences = split_into_sentences("I looked a movie. It was very fun! Was it?");
        assert_eq!(
            sentences,
            vec!["I looked a movie.", "It was very fun!", "Was it?"]
        );
    }

    #[test]
    fn paragraph_roundtrip() {
        let essay = Essay::from_paragraph("One. Two.");
        assert_eq!(essay.sentences.len(), 2);
        assert_eq!(essay.paragraph, "One. Two.");
    }

    #[test]
    fn validation_bounds() {
        assert!(validate_text("", 150, 5).is_err());
        assert!(validate_text("one two three", 150, 5).is_err());
        assert!(validate_text("a few more words than the minimum here", 150, 5).is_ok());
        let long = "word ".repeat(150);
        assert!(validate_text(&long, 150, 5).is_err());
    }

    #[test]
    fn preprocess_flattens_newlines() {
        assert_eq!(preprocess("a\r\nb\nc"), "a  b c");
    }
}
