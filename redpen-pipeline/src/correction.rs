//! Essay correction consumer.

use redpen_core::extract::{sentence_pairs, PairFormat};
use redpen_core::{GenerationController, ModelId, SamplingConfig};

use crate::client::{chat_logging_usage, ChatClient, ChatMessage};
use crate::errors::PipelineError;
use crate::essay::Essay;

const SYSTEM_PROMPT: &str = "\
If a sentence, taken from the paragraph, sounds unnatural, correct it. If it \
sounds natural as it is, keep the original sentence. The sentence can be formal \
or casual; abbreviations, slang, and contractions do not have to be corrected. \
Correct one sentence at a time, and count. Strictly follow the examples below, \
as the output will be parsed programmatically.

Input: Recently the prices of Phosphorus is rising because import restrictions \
by China. Compost from sewage is expected to resolve situation.
Output: 1-a Recently the prices of Phosphorus is rising because import restrictions by China.
1-b Recently the price of Phosphorus has been rising because of import restrictions by China.

2-a Compost from sewage is expected to resolve situation.
2-b Compost from sewage is expected to resolve this situation.

Input: It's heavy snow in Niigata prefecture. Some people is remaining in their car due to heavy snow.
Output: 1-a It's heavy snow in Niigata prefecture.
1-b There is heavy snow in Niigata prefecture.

2-a Some people is remaining in their car due to heavy snow.
2-b Some people are remaining in their car due to the heavy snow.";

/// Asks the model to correct an essay sentence-by-sentence and parses
/// the labeled line pairs it returns.
#[derive(Debug, Clone)]
pub struct CorrectionGenerator {
    config: SamplingConfig,
}

impl Default for CorrectionGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrectionGenerator {
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

    /// Corrects the essay, returning `(original, corrected)` with equal
    /// sentence counts in input order.
    pub async fn correct(
        &self,
        client: &dyn ChatClient,
        ledger: &redpen_core::UsageLedger,
        essay_text: &str,
    ) -> Result<(Essay, Essay), PipelineError> {
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(essay_text),
        ];

        let pairs = GenerationController::new(self.config.clone())
            .run(
                |config| chat_logging_usage(client, &messages, ledger, config),
                |text| sentence_pairs(text, PairFormat::Labeled),
            )
            .await?;

        let (originals, corrected): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|pair| (pair.original, pair.corrected))
            .unzip();

        Ok((
            Essay::from_sentences(originals),
            Essay::from_sentences(corrected),
        ))
    }
}
