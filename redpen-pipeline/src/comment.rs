//! Teacher comment consumer.

use redpen_core::{GenerationError, ModelId, SamplingConfig, UsageLedger};

use crate::client::{chat_logging_usage, ChatClient, ChatMessage};
use crate::errors::PipelineError;

const SYSTEM_PROMPT: &str = "\
You are an English teacher. Write a short, friendly comment on the following \
student essay. Mention things that are done well in terms of English, and \
point out at most one thing to keep working on.";

/// Writes a free-text encouragement comment for the essay.
///
/// Comments sample at temperature 0.7 - variety is the point here, and
/// free text has no grammar to fail, so there is no extraction loop.
pub async fn create_comment(
    client: &dyn ChatClient,
    ledger: &UsageLedger,
    model: ModelId,
    essay_text: &str,
) -> Result<String, PipelineError> {
    let config = SamplingConfig::new(model).with_temperature(0.7);
    let messages = [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(essay_text),
    ];

    let text = chat_logging_usage(client, &messages, ledger, config)
        .await
        .map_err(GenerationError::Generation)?;
    Ok(text)
}
