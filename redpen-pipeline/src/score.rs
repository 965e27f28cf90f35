//! Essay scoring consumer.

use serde::{Deserialize, Serialize};

use redpen_core::error::ParseError;
use redpen_core::{GenerationController, ModelId, ParseResult, SamplingConfig, UsageLedger};

use crate::client::{chat_logging_usage, ChatClient, ChatMessage};
use crate::errors::PipelineError;

const PROMPT: &str = "\
Grade the student's essay on a 10-point scale, judging content and structure, \
vocabulary, and grammar. Comment on each aspect in one sentence. An essay with \
appropriate basic vocabulary and no grammatical problems deserves full marks. \
The output is parsed programmatically, so strictly follow this format:

Content and structure
{one sentence}
Vocabulary
{one sentence}
Grammar
{one sentence}
Score: {integer}";

/// A rubric score with the per-aspect comments that justify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssayScore {
    /// Score out of 10.
    pub score: u8,
    /// The per-aspect comments preceding the score line.
    pub comments: String,
}

/// Parses `...comments...\nScore: N` output.
///
/// Splits on the last `Score: ` marker so a comment that happens to
/// mention the word cannot shift the split; a missing marker or a
/// non-integer tail is a parse failure that drives a retry.
pub fn parse_score(text: &str) -> ParseResult<EssayScore> {
    let (comments, tail) = text
        .rsplit_once("Score: ")
        .ok_or_else(|| ParseError::new("output has no Score: line"))?;
    let score: u8 = tail
        .trim()
        .parse()
        .map_err(|_| ParseError::new(format!("score is not an integer: {:?}", tail.trim())))?;
    if score > 10 {
        return Err(ParseError::new(format!("score {score} is out of the 10-point scale")));
    }
    Ok(EssayScore {
        score,
        comments: comments.trim().to_string(),
    })
}

/// Scores the essay against the rubric.
pub async fn score_essay(
    client: &dyn ChatClient,
    ledger: &UsageLedger,
    model: ModelId,
    essay_text: &str,
) -> Result<EssayScore, PipelineError> {
    let config = SamplingConfig::new(model);
    let messages = [
        ChatMessage::user(format!("{PROMPT}\n\n{essay_text}")),
    ];

    let score = GenerationController::new(config)
        .run(
            |config| chat_logging_usage(client, &messages, ledger, config),
            parse_score,
        )
        .await?;
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comments_and_score() {
        let text = "Content and structure\nClear.\nVocabulary\nGood.\nGrammar\nFine.\nScore: 8";
        let parsed = parse_score(text).unwrap();
        assert_eq!(parsed.score, 8);
        assert!(parsed.comments.starts_with("Content and structure"));
    }

    #[test]
    fn missing_marker_fails() {
        assert!(parse_score("no marker here").is_err());
    }

    #[test]
    fn non_integer_score_fails() {
        assert!(parse_score("ok\nScore: eight").is_err());
    }

    #[test]
    fn out_of_scale_score_fails() {
        assert!(parse_score("ok\nScore: 42").is_err());
    }

    #[test]
    fn splits_on_the_last_marker() {
        let text = "The rubric says Score: matters.\nScore: 7";
        assert_eq!(parse_score(text).unwrap().score, 7);
    }
}
