//! Arrow-annotated mistake tuple extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Category of a classified mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MistakeCategory {
    /// A technically valid word that a native speaker would not pick.
    WordChoice,
    /// Phrasing that is grammatical but unidiomatic.
    UnnaturalExpression,
    /// Clause or word-order problems.
    SentenceStructure,
    /// Misspelling.
    Spelling,
    /// Grammatical error.
    Grammar,
}

impl MistakeCategory {
    /// Maps a completion label onto a category.
    ///
    /// Exact, case-sensitive match against the five labels the
    /// classification prompt asks for; anything else is `None`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Word Choice" => Some(Self::WordChoice),
            "Unnatural Expression" => Some(Self::UnnaturalExpression),
            "Sentence Structure" => Some(Self::SentenceStructure),
            "Spelling" => Some(Self::Spelling),
            "Grammar" => Some(Self::Grammar),
            _ => None,
        }
    }

    /// The label the prompt vocabulary uses for this category.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WordChoice => "Word Choice",
            Self::UnnaturalExpression => "Unnatural Expression",
            Self::SentenceStructure => "Sentence Structure",
            Self::Spelling => "Spelling",
            Self::Grammar => "Grammar",
        }
    }
}

/// One classified mistake: the offending span, its replacement, and the
/// category the model assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mistake {
    /// Span from the original sentence.
    pub original_span: String,
    /// Span from the corrected sentence.
    pub corrected_span: String,
    /// Assigned category.
    pub category: MistakeCategory,
}

impl Mistake {
    /// Renders the mistake as the `before -> after` form used in
    /// downstream prompts.
    #[must_use]
    pub fn change(&self) -> String {
        format!("{} -> {}", self.original_span, self.corrected_span)
    }
}

static MISTAKE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
    Regex::new(r"(?P<before>.+?)\s*->\s*(?P<after>.+?)\s*\((?P<label>.+?)\)").unwrap()
});

/// Scans raw classification output for `a -> b (Label)` tuples.
///
/// Matches are found anywhere in the text (`.` stops at line breaks, so a
/// tuple never spans lines); whitespace around the arrow and parentheses
/// is trimmed by the grammar itself. A match whose label is not one of
/// the five known categories is dropped silently - one malformed label
/// must not invalidate an otherwise good batch. This extractor is total:
/// zero matches is a valid empty result, not a failure.
#[must_use]
pub fn mistakes(text: &str) -> Vec<Mistake> {
    MISTAKE_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let label = &caps["label"];
            let Some(category) = MistakeCategory::from_label(label) else {
                tracing::debug!(label, "dropping mistake with unrecognized category label");
                return None;
            };
            Some(Mistake {
                original_span: caps["before"].trim().to_string(),
                corrected_span: caps["after"].trim().to_string(),
                category,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_tuple() {
        let found = mistakes("X -> Y (Grammar)");
        assert_eq!(
            found,
            vec![Mistake {
                original_span: "X".to_string(),
                corrected_span: "Y".to_string(),
                category: MistakeCategory::Grammar,
            }]
        );
    }

    #[test]
    fn unknown_label_is_dropped_not_fatal() {
        assert!(mistakes("X -> Y (Nonsense)").is_empty());
    }

    #[test]
    fn bad_label_does_not_poison_the_batch() {
        let text = "feels -> feel (Grammar)\ninformation -> knowledge (Knowledge Stuff)\nmoovie -> movie (Spelling)";
        let found = mistakes(text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].category, MistakeCategory::Grammar);
        assert_eq!(found[1].category, MistakeCategory::Spelling);
    }

    #[test]
    fn whitespace_around_arrow_and_parens_is_trimmed() {
        let found = mistakes("more fast   ->   faster   (Grammar)");
        assert_eq!(found[0].original_span, "more fast");
        assert_eq!(found[0].corrected_span, "faster");
    }

    #[test]
    fn multi_word_spans_and_labels() {
        let found = mistakes("went for a walk -> walked (Unnatural Expression)");
        assert_eq!(found[0].original_span, "went for a walk");
        assert_eq!(found[0].category, MistakeCategory::UnnaturalExpression);
    }

    #[test]
    fn labels_are_case_sensitive() {
        assert!(mistakes("X -> Y (grammar)").is_empty());
    }

    #[test]
    fn zero_matches_is_a_valid_empty_result() {
        assert!(mistakes("This sentence is perfect.").is_empty());
    }

    #[test]
    fn change_prompt_form() {
        let m = Mistake {
            original_span: "got".to_string(),
            corrected_span: "achieved".to_string(),
            category: MistakeCategory::WordChoice,
        };
        assert_eq!(m.change(), "got -> achieved");
    }
}
