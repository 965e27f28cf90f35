//! Paired-line sentence correction extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

use super::ParseResult;

/// One original/corrected sentence pair, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    /// The sentence as the student wrote it.
    pub original: String,
    /// The corrected sentence.
    pub corrected: String,
}

/// Which of the two supported line-pair shapes the caller asked the
/// model to produce. Selected by the call site, never auto-detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairFormat {
    /// Blocks of two bare lines: original, then corrected.
    Bare,
    /// The same blocks with `N-a ` / `N-b ` numeric label prefixes.
    Labeled,
}

static LABELED_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
    Regex::new(r"^(?P<label>\d+-[ab])\s(?P<sentence>.*)$").unwrap()
});

/// Splits correction output into ordered sentence pairs.
///
/// The text is split on blank lines into blocks; within each block the
/// first line is the original sentence and the second the corrected one.
/// A block with fewer than two lines, or (in [`PairFormat::Labeled`]) a
/// line whose label prefix does not match, is a [`ParseError`] - the
/// caller retries rather than risking misaligned pairs. The originals
/// and corrected sequences are equal-length by construction, and the
/// invariant is checked before returning so a violation can never pass
/// silently.
pub fn sentence_pairs(text: &str, format: PairFormat) -> ParseResult<Vec<SentencePair>> {
    let mut originals = Vec::new();
    let mut corrected = Vec::new();

    for (index, block) in split_blocks(text).enumerate() {
        let mut lines = block.lines().map(str::trim);
        let first = lines.next();
        let second = lines.next();
        let (Some(first), Some(second)) = (first, second) else {
            return Err(ParseError::new(format!(
                "block {} has fewer than 2 lines: {block:?}",
                index + 1
            )));
        };
        originals.push(strip_label(first, format)?);
        corrected.push(strip_label(second, format)?);
    }

    if originals.len() != corrected.len() {
        return Err(ParseError::new(format!(
            "{} original sentences but {} corrected ones",
            originals.len(),
            corrected.len()
        )));
    }

    Ok(originals
        .into_iter()
        .zip(corrected)
        .map(|(original, corrected)| SentencePair {
            original,
            corrected,
        })
        .collect())
}

fn split_blocks(text: &str) -> impl Iterator<Item = &str> {
    text.trim()
        .split("\n\n")
        .map(str::trim)
        .filter(|block| !block.is_empty())
}

fn strip_label(line: &str, format: PairFormat) -> ParseResult<String> {
    match format {
        PairFormat::Bare => Ok(line.to_string()),
        PairFormat::Labeled => LABELED_LINE_RE
            .captures(line)
            .map(|caps| caps["sentence"].trim().to_string())
            .ok_or_else(|| {
                ParseError::new(format!("line is missing its numeric label prefix: {line:?}"))
            }),
    }
}
