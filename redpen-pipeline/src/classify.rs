//! Mistake classification consumer.

use serde::{Deserialize, Serialize};

use redpen_core::extract::{mistakes, Mistake};
use redpen_core::{ModelId, SamplingConfig, UsageLedger};

use crate::client::{ChatClient, ChatMessage};
use crate::errors::PipelineError;

const SYSTEM_PROMPT: &str = "\
You are an English teacher. Classify the student's mistakes. Try to split each \
mistake into chunks as small as possible, and detect all the mistakes.";

const FORMAT_PROMPT: &str = "\
Please classify the mistakes into the following categories:
Grammar, Word Choice, Spelling, Unnatural Expression, Sentence Structure
Strictly follow the format below.

Original: I feels I am acquiring information in English more fast.
Edited: I feel I am acquiring knowledge in English faster.
feels -> feel (Grammar)
information -> knowledge (Word Choice)
more fast -> faster (Grammar)

Original: I looked a moovie with my friends.
Edited: I watched a movie with my friends.
looked -> watched (Word Choice)
moovie -> movie (Spelling)

Original: Fun is English.
Edited: English is fun.
Fun is English -> English is fun (Sentence Structure)";

const EXAMPLE_INPUT: &str = "\
Original: This movie is knowing to everyone in Japan.
Edited: This movie is known to everyone in Japan.";

const EXAMPLE_OUTPUT: &str = "is knowing -> is known (Grammar)";

/// The mistakes of one sentence, annotated with the pair they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedSentence {
    /// The sentence as written.
    pub original: String,
    /// The corrected sentence.
    pub corrected: String,
    /// Extracted mistakes; empty means the sentence was clean.
    pub mistakes: Vec<Mistake>,
}

/// Classifies the edits between an original and a corrected sentence.
#[derive(Debug, Clone)]
pub struct Classifier {
    config: SamplingConfig,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    /// Classifier with the default model.
    #[must_use]
    pub fn new() -> Self {
        Self::with_model(ModelId::Gpt4)
    }

    /// Classifier with an explicit model.
    #[must_use]
    pub fn with_model(model: ModelId) -> Self {
        Self {
            config: SamplingConfig::new(model),
        }
    }

    /// Classifies one sentence pair.
    ///
    /// The mistake grammar is total - an output with no recognizable
    /// tuples is a valid empty classification, so there is no retry loop
    /// here: a single call either reaches the model or fails at the
    /// transport, and whatever usable tuples it contains are kept.
    pub async fn classify(
        &self,
        client: &dyn ChatClient,
        ledger: &UsageLedger,
        original: &str,
        corrected: &str,
    ) -> Result<ClassifiedSentence, PipelineError> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(FORMAT_PROMPT),
            ChatMessage::user(EXAMPLE_INPUT),
            ChatMessage::assistant(EXAMPLE_OUTPUT),
            ChatMessage::user(format!("Original: {original}\nEdited: {corrected}")),
        ];

        let text = crate::client::chat_logging_usage(
            client,
            &messages,
            ledger,
            self.config.clone(),
        )
        .await
        .map_err(redpen_core::GenerationError::Generation)?;

        let found = mistakes(&text);
        tracing::debug!(count = found.len(), original, "classified sentence");

        Ok(ClassifiedSentence {
            original: original.to_string(),
            corrected: corrected.to_string(),
            mistakes: found,
        })
    }
}
