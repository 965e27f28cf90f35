//! Quiz generation consumer.
//!
//! Mistakes are screened and turned into quizzes in small fixed-size
//! batches, sequentially - a batch's extraction outcome is resolved
//! before the next batch starts, and order across batches is preserved
//! in the merged output.

use serde::{Deserialize, Serialize};

use redpen_core::extract::{quiz_sections, QuizSection};
use redpen_core::{
    GenerationController, GenerationError, ModelId, SamplingConfig, UsageLedger,
};

use crate::client::{chat_logging_usage, ChatClient, ChatMessage};
use crate::errors::PipelineError;

/// How many mistakes one prompt may carry.
pub const MAX_MISTAKES_PER_PROMPT: usize = 3;

const SCREEN_SYSTEM_PROMPT: &str = "\
Compare the English sentences written by the student and the corrected English \
sentences. Determine whether the mistake can be generalized into a valid quiz. \
Answer Yes if a quiz should be created and No if it should not be.

For example,

That's amazing!
That's incredible!
amazing -> incredible

A quiz can not be created from this mistake because the two words are \
interchangeable. Mistakes related to articles are also difficult to turn into \
a quiz.";

const SCREEN_EXAMPLE_INPUT: &str = "\
1.
That's amazing!
That's incredible!
amazing -> incredible
2.
I speaked on my mother.
I spoke with my mother.
speaked -> spoke.
3.
This is a man I were looking for.
This is the man I was looking for.
a -> the";

const SCREEN_EXAMPLE_OUTPUT: &str = "1. No\n2. Yes\n3. No";

const GENERATE_SYSTEM_PROMPT: &str = "\
Create questions by generalizing the mistakes indicated by the arrow. The \
questions can be either multiple-choice questions or fill-in-the-blank \
questions. For each sentence there should be exactly one blank. For \
multiple-choice, the answer must be unambiguous and each choice should be used \
twice; only use multiple choice when comparing the usage of two words. \
Generalize the mistake and use words that were not present in the original \
sentence whenever possible. Separate questions with ---.";

const GENERATE_EXAMPLE_INPUT: &str = "\
Follow the format below

The price is rising because import restrictions.
The price have been rising because of import restrictions.
4 because -> because of

Dancing fairys.
Dancing fairies.
5 fairys -> fairies";

const GENERATE_EXAMPLE_OUTPUT: &str = "\
Type: multiple-choice
Title: because vs because of
Choices: 1 because, 2 because of
Questions:
1. He failed the test [1 because] he didn't study enough.
2. They won the game [2 because of] their excellent teamwork.
3. She couldn't attend the meeting [2 because of] her sickness.
4. She couldn't attend the meeting [1 because] she was sick.
---
Type: fill-in-the-blank
Title: plural forms of nouns ending in y
Questions:
1. The [fairies] were dancing in the moonlight. (fairy)
2. The [butterflies] were playing in the garden. (butterfly)
3. The [ladies] were singing in the choir. (lady)
4. The [berries] were growing in the field. (berry)";

/// One mistake with the sentence pair it was extracted from - the unit
/// of quiz generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSource {
    /// The sentence as written.
    pub original: String,
    /// The corrected sentence.
    pub corrected: String,
    /// The `before -> after` change prompt.
    pub change: String,
}

/// Generates quizzes from classified mistakes.
#[derive(Debug, Clone)]
pub struct QuizGenerator {
    config: SamplingConfig,
}

impl Default for QuizGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizGenerator {
    /// Generator with the default model and a quiz-sized token cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_model(ModelId::Gpt4)
    }

    /// Generator with an explicit model.
    #[must_use]
    pub fn with_model(model: ModelId) -> Self {
        Self {
            config: SamplingConfig::new(model).with_max_output_tokens(1500),
        }
    }

    /// Screens the sources, then generates quizzes batch by batch.
    ///
    /// A batch whose quiz extraction exhausts its retries is dropped with
    /// a warning - the run degrades to fewer quizzes rather than
    /// aborting. Transport failures still propagate.
    pub async fn generate(
        &self,
        client: &dyn ChatClient,
        ledger: &UsageLedger,
        sources: &[QuizSource],
    ) -> Result<Vec<QuizSection>, PipelineError> {
        let mut worthwhile = Vec::new();
        for batch in sources.chunks(MAX_MISTAKES_PER_PROMPT) {
            let keep = self.screen_batch(client, ledger, batch).await?;
            worthwhile.extend(
                batch
                    .iter()
                    .zip(keep)
                    .filter_map(|(source, keep)| keep.then(|| source.clone())),
            );
        }

        let mut quizzes = Vec::new();
        for batch in worthwhile.chunks(MAX_MISTAKES_PER_PROMPT) {
            match self.quizzes_from_batch(client, ledger, batch).await {
                Ok(mut sections) => quizzes.append(&mut sections),
                Err(PipelineError::Generation(GenerationError::Parsing {
                    attempts, ..
                })) => {
                    tracing::warn!(attempts, "dropping quiz batch that never parsed");
                }
                Err(other) => return Err(other),
            }
        }

        Ok(quizzes)
    }

    /// One screening call: Yes/No per source, in order.
    ///
    /// A reply whose Yes/No count does not match the batch degrades to
    /// all-No - a wrong screening only costs a quiz, it never corrupts
    /// one - so this pass needs no retry loop.
    async fn screen_batch(
        &self,
        client: &dyn ChatClient,
        ledger: &UsageLedger,
        batch: &[QuizSource],
    ) -> Result<Vec<bool>, PipelineError> {
        let mut prompt = String::new();
        for (index, source) in batch.iter().enumerate() {
            prompt.push_str(&format!(
                "{}.\n{}\n{}\n{}\n",
                index + 1,
                source.original,
                source.corrected,
                source.change
            ));
        }

        let messages = [
            ChatMessage::system(SCREEN_SYSTEM_PROMPT),
            ChatMessage::user(SCREEN_EXAMPLE_INPUT),
            ChatMessage::assistant(SCREEN_EXAMPLE_OUTPUT),
            ChatMessage::user(prompt),
        ];

        let text = chat_logging_usage(client, &messages, ledger, self.config.clone())
            .await
            .map_err(GenerationError::Generation)?;

        let verdicts = parse_screen_verdicts(&text);
        if verdicts.len() == batch.len() {
            Ok(verdicts)
        } else {
            tracing::warn!(
                expected = batch.len(),
                got = verdicts.len(),
                "screening verdict count mismatch, keeping no mistake from this batch"
            );
            Ok(vec![false; batch.len()])
        }
    }

    /// One generation call for a batch, retried through the controller.
    async fn quizzes_from_batch(
        &self,
        client: &dyn ChatClient,
        ledger: &UsageLedger,
        batch: &[QuizSource],
    ) -> Result<Vec<QuizSection>, PipelineError> {
        let mut prompt = String::new();
        for (index, source) in batch.iter().enumerate() {
            // Numbering continues after the few-shot examples.
            prompt.push_str(&format!(
                "{}\n{}\n{} {}\n\n",
                source.original,
                source.corrected,
                index + 4,
                source.change
            ));
        }

        let messages = [
            ChatMessage::system(GENERATE_SYSTEM_PROMPT),
            ChatMessage::user(GENERATE_EXAMPLE_INPUT),
            ChatMessage::assistant(GENERATE_EXAMPLE_OUTPUT),
            ChatMessage::user(prompt),
        ];

        let sections = GenerationController::new(self.config.clone())
            .run(
                |config| chat_logging_usage(client, &messages, ledger, config),
                quiz_sections,
            )
            .await?;
        Ok(sections)
    }
}

/// Scans reply lines for Yes/No verdicts, in order.
fn parse_screen_verdicts(text: &str) -> Vec<bool> {
    text.lines()
        .filter_map(|line| {
            if line.contains("Yes") {
                Some(true)
            } else if line.contains("No") {
                Some(false)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_lines_parse_in_order() {
        assert_eq!(
            parse_screen_verdicts("1. No\n2. Yes\n3. No"),
            vec![false, true, false]
        );
    }

    #[test]
    fn non_verdict_lines_are_ignored() {
        assert_eq!(parse_screen_verdicts("Sure, here you go:\n1. Yes"), vec![true]);
    }
}
