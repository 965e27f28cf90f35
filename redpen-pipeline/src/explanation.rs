//! Per-mistake explanation consumer.

use serde::{Deserialize, Serialize};

use redpen_core::extract::{Mistake, MistakeCategory};
use redpen_core::{GenerationError, ModelId, SamplingConfig, UsageLedger};

use crate::client::{chat_logging_usage, ChatClient, ChatMessage};
use crate::errors::PipelineError;

const SYSTEM_PROMPT: &str = "\
You are an English teacher. Compare the sentence the student wrote with the \
corrected sentence and explain the mistake indicated by the arrow in detail, \
using grammatical terms where they help. Even if the sentence contains \
several mistakes, explain only the one indicated by the arrow. Use \
comparisons and example sentences where appropriate.";

const EXAMPLE_INPUT: &str = "\
Original: I got a lot of results.
Edited: I achieved a lot of results.
got -> achieved";

const EXAMPLE_OUTPUT: &str = "\
Both 'get' and 'achieve' describe obtaining something, but they differ in \
nuance.

'Get' is the more general word and covers objects, information, and \
situations; no particular effort is implied. Examples:
- I got a new phone.
- She got the information she needed.

'Achieve' is reserved for goals and ambitions, usually ones that take effort \
and time, and the thing achieved is typically abstract. Examples:
- He achieved his goal of becoming a doctor.
- She achieved success in her career.

Since this sentence is about accomplishing results, 'achieved' is the more \
natural choice.";

/// An explanation of one classified mistake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistakeExplanation {
    /// Category of the explained mistake.
    pub category: MistakeCategory,
    /// Free-text explanation.
    pub text: String,
}

/// Explains classified mistakes, dispatching on their category.
///
/// Spelling mistakes are templated locally - the correction already says
/// everything a learner needs. Every other category goes through one
/// teaching-style chat call; free text has no grammar to fail, so there
/// is no extraction loop.
#[derive(Debug, Clone)]
pub struct ExplanationGenerator {
    config: SamplingConfig,
}

impl Default for ExplanationGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExplanationGenerator {
    /// Generator with the default model.
    #[must_use]
    pub fn new() -> Self {
        Self::with_model(ModelId::Gpt4)
    }

    /// Generator with an explicit model.
    #[must_use]
    pub fn with_model(model: ModelId) -> Self {
        Self {
            config: SamplingConfig::new(model),
        }
    }

    /// Explains one mistake against the sentence pair it came from.
    pub async fn explain(
        &self,
        client: &dyn ChatClient,
        ledger: &UsageLedger,
        original: &str,
        corrected: &str,
        mistake: &Mistake,
    ) -> Result<MistakeExplanation, PipelineError> {
        if mistake.category == MistakeCategory::Spelling {
            return Ok(MistakeExplanation {
                category: mistake.category,
                text: format!("There is a spelling mistake. {}", mistake.change()),
            });
        }

        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(EXAMPLE_INPUT),
            ChatMessage::assistant(EXAMPLE_OUTPUT),
            ChatMessage::user(format!(
                "Original: {original}\nEdited: {corrected}\n{}",
                mistake.change()
            )),
        ];

        let text = chat_logging_usage(client, &messages, ledger, self.config.clone())
            .await
            .map_err(GenerationError::Generation)?;

        Ok(MistakeExplanation {
            category: mistake.category,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::client::ChatOutcome;
    use crate::errors::ClientError;

    struct NoCallClient;

    #[async_trait]
    impl ChatClient for NoCallClient {
        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _config: &SamplingConfig,
        ) -> Result<ChatOutcome, ClientError> {
            panic!("no model call expected");
        }
    }

    #[tokio::test]
    async fn spelling_is_templated_without_a_model_call() {
        let ledger = UsageLedger::new();
        let mistake = Mistake {
            original_span: "moovie".to_string(),
            corrected_span: "movie".to_string(),
            category: MistakeCategory::Spelling,
        };

        let explanation = ExplanationGenerator::new()
            .explain(
                &NoCallClient,
                &ledger,
                "I looked a moovie.",
                "I watched a movie.",
                &mistake,
            )
            .await
            .unwrap();

        assert_eq!(explanation.category, MistakeCategory::Spelling);
        assert_eq!(
            explanation.text,
            "There is a spelling mistake. moovie -> movie"
        );
        assert!(ledger.is_empty());
    }
}
