//! Native rewrite consumer.
//!
//! Two passes over the corrected essay: a rewrite that makes it sound
//! like a fluent speaker wrote it, and an expression-notes pass that
//! picks the learning-worthy words out of the rewrite and explains each
//! of them. The rewrite is free text; the notes have a heading grammar
//! and run through the retry controller.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use redpen_core::error::ParseError;
use redpen_core::{
    GenerationController, GenerationError, ModelId, ParseResult, SamplingConfig, UsageLedger,
};

use crate::client::{chat_logging_usage, ChatClient, ChatMessage};
use crate::errors::PipelineError;
use crate::essay::Essay;

const REWRITE_PROMPT: &str = "\
Make the paragraph sound more natural. Use many words that are not in the \
original paragraph. Do not make it too complex, and keep the essay simple. \
The essay should be elementary school level.";

const NOTES_SYSTEM_PROMPT: &str = "\
Compare the essay the student wrote with the essay the teacher wrote. From \
the teacher's essay, pick only the words and short phrases that matter most \
for learning English, and explain each one in detail with example sentences. \
Do not explain words that already appear in the student's essay. Start each \
expression with a '# ' heading, follow it with '- ' example lines, then the \
explanation.";

const NOTES_EXAMPLE_INPUT: &str = "\
Original: It's the 8th day of 12 days of continuous work. I had a party with \
the old PTA members last night.
Edited: Today marks the eighth day of twelve days of consecutive work. Last \
night, I had a great time catching up with some of the old PTA members.";

const NOTES_EXAMPLE_OUTPUT: &str = "\
# Today marks
- Today marks the anniversary of our first date.
- Today marks one year since the shop opened.
A natural way to open an entry about a notable day; 'marks' treats the day \
itself as the milestone.

# catching up with
- It was great catching up with you after all these years.
- I enjoyed catching up with my old friends at the reunion.
A friendly phrase for meeting people again and exchanging news. 'Reconnect \
with' is a close alternative.";

/// One expression worth learning, with its examples and explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionNote {
    /// The word or short phrase being explained.
    pub expression: String,
    /// Example lines followed by the free-text explanation.
    pub explanation: String,
}

static NOTE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
    Regex::new(r"(?s)# (?P<expression>.+?)\n(?P<examples>(?:- [^\n]+\n)+)(?P<rest>[^#]*)")
        .unwrap()
});

/// Parses `# expression` sections out of the notes output.
///
/// Each section is a heading, one or more `- ` example lines, and the
/// prose up to the next heading; the examples stay part of the
/// explanation text. An output with no recognizable section is a parse
/// failure that drives a retry.
pub fn expression_notes(text: &str) -> ParseResult<Vec<ExpressionNote>> {
    // The grammar wants a newline after the last example line.
    let text = format!("{}\n", text.trim_end());

    let notes: Vec<ExpressionNote> = NOTE_RE
        .captures_iter(&text)
        .map(|caps| ExpressionNote {
            expression: caps["expression"].trim().to_string(),
            explanation: format!("{}{}", &caps["examples"], &caps["rest"])
                .trim()
                .to_string(),
        })
        .collect();

    if notes.is_empty() {
        return Err(ParseError::new("output has no '# expression' sections"));
    }
    Ok(notes)
}

/// Rewrites the corrected essay and annotates what changed.
#[derive(Debug, Clone)]
pub struct NativeGenerator {
    config: SamplingConfig,
}

impl Default for NativeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeGenerator {
    /// Generator with the default model and a notes-sized token cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_model(ModelId::Gpt4)
    }

    /// Generator with an explicit model.
    #[must_use]
    pub fn with_model(model: ModelId) -> Self {
        Self {
            config: SamplingConfig::new(model).with_max_output_tokens(1000),
        }
    }

    /// Rewrites the essay in a fluent register. Free text, single call.
    pub async fn rewrite(
        &self,
        client: &dyn ChatClient,
        ledger: &UsageLedger,
        essay: &Essay,
    ) -> Result<Essay, PipelineError> {
        let messages = [ChatMessage::user(format!(
            "{REWRITE_PROMPT}\n\n{}",
            essay.paragraph
        ))];

        let text = chat_logging_usage(client, &messages, ledger, self.config.clone())
            .await
            .map_err(GenerationError::Generation)?;
        Ok(Essay::from_paragraph(&text))
    }

    /// Explains the expressions the rewrite introduced.
    ///
    /// A rewrite identical to its input has nothing to teach, so no call
    /// is made and the result is empty.
    pub async fn notes(
        &self,
        client: &dyn ChatClient,
        ledger: &UsageLedger,
        corrected: &Essay,
        native: &Essay,
    ) -> Result<Vec<ExpressionNote>, PipelineError> {
        if corrected.paragraph == native.paragraph {
            return Ok(Vec::new());
        }

        let messages = [
            ChatMessage::system(NOTES_SYSTEM_PROMPT),
            ChatMessage::user(NOTES_EXAMPLE_INPUT),
            ChatMessage::assistant(NOTES_EXAMPLE_OUTPUT),
            ChatMessage::user(format!(
                "Original: {}\nEdited: {}",
                corrected.paragraph, native.paragraph
            )),
        ];

        let notes = GenerationController::new(self.config.clone())
            .run(
                |config| chat_logging_usage(client, &messages, ledger, config),
                expression_notes,
            )
            .await?;
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headed_sections() {
        let notes = expression_notes(NOTES_EXAMPLE_OUTPUT).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].expression, "Today marks");
        assert!(notes[0].explanation.starts_with("- Today marks the anniversary"));
        assert!(notes[0].explanation.contains("milestone"));
        assert_eq!(notes[1].expression, "catching up with");
    }

    #[test]
    fn output_without_headings_fails() {
        let err = expression_notes("Nice rewrite, nothing to explain.").unwrap_err();
        assert!(err.message().contains("no '# expression' sections"));
    }

    #[test]
    fn section_ending_at_text_end_still_parses() {
        let text = "# let off steam\n- He went for a run to let off steam.\nAn idiom for releasing stress.";
        let notes = expression_notes(text).unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].explanation.ends_with("releasing stress."));
    }

    #[test]
    fn heading_without_example_lines_is_not_a_section() {
        let text = "# bare heading\nNo examples under it.";
        assert!(expression_notes(text).is_err());
    }
}
