//! Delimited quiz section extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

use super::{ParseResult, BLANK_MARKER};

/// A multiple-choice quiz parsed from one section.
///
/// Invariant: every answer is a member of `choices` - guaranteed by
/// construction, since answers are resolved through the choice index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleChoiceQuiz {
    /// Section title.
    pub title: String,
    /// The shared answer choices.
    pub choices: Vec<String>,
    /// Questions, each containing exactly one blank marker.
    pub questions: Vec<String>,
    /// One answer per question, drawn from `choices`.
    pub answers: Vec<String>,
}

/// A fill-in-the-blank quiz parsed from one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeAnswerQuiz {
    /// Section title.
    pub title: String,
    /// Questions, each containing exactly one blank marker.
    pub questions: Vec<String>,
    /// One answer per question.
    pub answers: Vec<String>,
}

/// One self-contained quiz, tagged by the section's `Type:` field.
///
/// Constructed once per parsed section and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum QuizSection {
    /// `Type: multiple-choice`.
    MultipleChoice(MultipleChoiceQuiz),
    /// `Type: fill-in-the-blank`.
    FreeAnswer(FreeAnswerQuiz),
}

impl QuizSection {
    /// Section title.
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::MultipleChoice(quiz) => &quiz.title,
            Self::FreeAnswer(quiz) => &quiz.title,
        }
    }

    /// Questions with their blanks substituted.
    #[must_use]
    pub fn questions(&self) -> &[String] {
        match self {
            Self::MultipleChoice(quiz) => &quiz.questions,
            Self::FreeAnswer(quiz) => &quiz.questions,
        }
    }

    /// One answer per question.
    #[must_use]
    pub fn answers(&self) -> &[String] {
        match self {
            Self::MultipleChoice(quiz) => &quiz.answers,
            Self::FreeAnswer(quiz) => &quiz.answers,
        }
    }
}

static BRACKET_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
    Regex::new(r"\[(?P<token>[^\]]*)\]").unwrap()
});

static QUESTION_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^(?P<ordinal>\d+)[.)]\s*(?P<body>.+)$").unwrap()
});

/// Splits generated quiz text on the literal `---` delimiter and parses
/// each section independently.
///
/// A section that does not announce a known `Type:` (or has fewer than
/// two usable lines) is skipped - one malformed section must not discard
/// the batch. A section that *does* announce a known type but whose body
/// fails its sub-grammar is a hard failure for the whole call: a
/// partially parsed quiz is not safely renderable. Implementations must
/// keep exactly this asymmetry.
pub fn quiz_sections(text: &str) -> ParseResult<Vec<QuizSection>> {
    let mut sections = Vec::new();

    for raw_section in text.split("---") {
        let mut lines: Vec<&str> = raw_section
            .trim()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        // A stray ordinal header the model sometimes emits above a section.
        if lines
            .first()
            .is_some_and(|line| line.chars().all(|c| c.is_ascii_digit()))
        {
            lines.remove(0);
        }

        if lines.len() < 2 {
            tracing::debug!("skipping quiz section with fewer than 2 lines");
            continue;
        }

        let Some(quiz_type) = lines[0].strip_prefix("Type:").map(str::trim) else {
            tracing::debug!(line = lines[0], "skipping quiz section without a Type line");
            continue;
        };

        match quiz_type {
            "multiple-choice" => sections.push(parse_multiple_choice(&lines[1..])?),
            "fill-in-the-blank" => sections.push(parse_fill_in_the_blank(&lines[1..])?),
            other => {
                tracing::debug!(quiz_type = other, "skipping quiz section with unknown type");
            }
        }
    }

    Ok(sections)
}

fn parse_multiple_choice(body: &[&str]) -> ParseResult<QuizSection> {
    let mut title = None;
    let mut choices: Option<Vec<String>> = None;
    let mut questions = Vec::new();
    let mut answers = Vec::new();

    for line in body {
        if let Some(value) = line.strip_prefix("Title:") {
            title = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("Choices:") {
            choices = Some(parse_choices(value)?);
        } else if *line == "Questions:" {
            // Header before the question lines; nothing to record.
        } else if let Some(caps) = QUESTION_LINE_RE.captures(line) {
            let available = choices
                .as_deref()
                .ok_or_else(|| ParseError::new("question line appears before the Choices line"))?;
            let (question, answer) = resolve_choice_question(&caps["body"], available)?;
            questions.push(question);
            answers.push(answer);
        } else {
            return Err(ParseError::new(format!(
                "unexpected line in multiple-choice section: {line:?}"
            )));
        }
    }

    if questions.is_empty() {
        return Err(ParseError::new("multiple-choice section has no question lines"));
    }
    let title =
        title.ok_or_else(|| ParseError::new("multiple-choice section is missing its Title line"))?;
    let choices = choices
        .ok_or_else(|| ParseError::new("multiple-choice section is missing its Choices line"))?;

    Ok(QuizSection::MultipleChoice(MultipleChoiceQuiz {
        title,
        choices,
        questions,
        answers,
    }))
}

fn parse_fill_in_the_blank(body: &[&str]) -> ParseResult<QuizSection> {
    let mut title = None;
    let mut questions = Vec::new();
    let mut answers = Vec::new();

    for line in body {
        if let Some(value) = line.strip_prefix("Title:") {
            title = Some(value.trim().to_string());
        } else if *line == "Questions:" {
            // Header before the question lines.
        } else if let Some(caps) = QUESTION_LINE_RE.captures(line) {
            let body = &caps["body"];
            let token = single_bracket_token(body)?;
            answers.push(token.to_string());
            questions.push(BRACKET_RE.replace(body, BLANK_MARKER).into_owned());
        } else {
            return Err(ParseError::new(format!(
                "unexpected line in fill-in-the-blank section: {line:?}"
            )));
        }
    }

    if questions.is_empty() {
        return Err(ParseError::new(
            "fill-in-the-blank section has no question lines",
        ));
    }
    let title = title
        .ok_or_else(|| ParseError::new("fill-in-the-blank section is missing its Title line"))?;

    Ok(QuizSection::FreeAnswer(FreeAnswerQuiz {
        title,
        questions,
        answers,
    }))
}

/// Strips the 2-character ordinal marker from each comma-separated choice.
fn parse_choices(value: &str) -> ParseResult<Vec<String>> {
    value
        .trim()
        .split(", ")
        .map(|choice| {
            let mut chars = choice.char_indices();
            let marker_end = chars.nth(1).map(|(i, c)| i + c.len_utf8());
            match marker_end {
                Some(end) if end < choice.len() => Ok(choice[end..].trim().to_string()),
                _ => Err(ParseError::new(format!(
                    "choice is too short to carry an ordinal marker: {choice:?}"
                ))),
            }
        })
        .collect()
}

/// Resolves a `[<index> ...]` token against the choice list, returning
/// the blanked question text and the resolved answer.
fn resolve_choice_question(body: &str, choices: &[String]) -> ParseResult<(String, String)> {
    let token = single_bracket_token(body)?;
    let index_text = token.split_whitespace().next().unwrap_or_default();
    let index: usize = index_text.parse().map_err(|_| {
        ParseError::new(format!("bracket token does not start with a choice index: [{token}]"))
    })?;
    let answer = index
        .checked_sub(1)
        .and_then(|i| choices.get(i))
        .ok_or_else(|| {
            ParseError::new(format!(
                "choice index {index} out of range for {} choices",
                choices.len()
            ))
        })?
        .clone();
    let question = BRACKET_RE.replace(body, BLANK_MARKER).into_owned();
    Ok((question, answer))
}

/// The body must contain exactly one `[...]` token.
fn single_bracket_token(body: &str) -> ParseResult<&str> {
    let mut matches = BRACKET_RE.captures_iter(body);
    let first = matches
        .next()
        .ok_or_else(|| ParseError::new(format!("question line has no bracket token: {body:?}")))?;
    if matches.next().is_some() {
        return Err(ParseError::new(format!(
            "question line has more than one bracket token: {body:?}"
        )));
    }
    Ok(first.get(1).map_or("", |m| m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MC_SECTION: &str = "\
Type: multiple-choice
Title: because vs because of
Choices: 1 because, 2 because of
Questions:
1. He failed the test [1 because] he didn't study enough.
2. They won the game [2 because of] their excellent teamwork.";

    const FIB_SECTION: &str = "\
Type: fill-in-the-blank
Title: plural nouns ending in y
Questions:
1. The [fairies] were dancing in the moonlight. (fairy)
2. The [ladies] were singing in the choir. (lady)";

    #[test]
    fn multiple_choice_section() {
        let sections = quiz_sections(MC_SECTION).unwrap();
        assert_eq!(sections.len(), 1);
        let QuizSection::MultipleChoice(quiz) = &sections[0] else {
            panic!("expected a multiple-choice quiz");
        };
        assert_eq!(quiz.title, "because vs because of");
        assert_eq!(quiz.choices, vec!["because", "because of"]);
        assert_eq!(
            quiz.questions[0],
            "He failed the test ____ he didn't study enough."
        );
        assert_eq!(quiz.answers, vec!["because", "because of"]);
    }

    #[test]
    fn every_answer_is_a_member_of_choices() {
        let sections = quiz_sections(MC_SECTION).unwrap();
        let QuizSection::MultipleChoice(quiz) = &sections[0] else {
            panic!("expected a multiple-choice quiz");
        };
        for answer in &quiz.answers {
            assert!(quiz.choices.contains(answer));
        }
    }

    #[test]
    fn fill_in_the_blank_section() {
        let sections = quiz_sections(FIB_SECTION).unwrap();
        let QuizSection::FreeAnswer(quiz) = &sections[0] else {
            panic!("expected a fill-in-the-blank quiz");
        };
        assert_eq!(quiz.title, "plural nouns ending in y");
        assert_eq!(
            quiz.questions[0],
            "The ____ were dancing in the moonlight. (fairy)"
        );
        assert_eq!(quiz.answers, vec!["fairies", "ladies"]);
    }

    #[test]
    fn unknown_type_section_is_skipped_not_fatal() {
        let text = format!("{MC_SECTION}\n---\nType: unknown-type\nTitle: whatever\n1. A [1] question.");
        let sections = quiz_sections(&text).unwrap();
        assert_eq!(sections.len(), 1);
        assert!(matches!(sections[0], QuizSection::MultipleChoice(_)));
    }

    #[test]
    fn short_section_is_skipped_not_fatal() {
        let text = format!("Type: multiple-choice\n---\n{FIB_SECTION}");
        let sections = quiz_sections(&text).unwrap();
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn stray_ordinal_header_is_discarded() {
        let text = format!("2\n{FIB_SECTION}");
        let sections = quiz_sections(&text).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title(), "plural nouns ending in y");
    }

    #[test]
    fn out_of_range_index_fails_the_whole_call() {
        let text = format!(
            "{FIB_SECTION}\n---\n\
             Type: multiple-choice\n\
             Title: broken\n\
             Choices: 1 yes, 2 no\n\
             Questions:\n\
             1. Is this [9] fine?"
        );
        let err = quiz_sections(&text).unwrap_err();
        assert!(err.message().contains("out of range"));
    }

    #[test]
    fn non_numeric_index_fails() {
        let text = "Type: multiple-choice\nTitle: broken\nChoices: 1 a, 2 b\n1. Pick [first] one.";
        assert!(quiz_sections(text).is_err());
    }

    #[test]
    fn missing_bracket_token_fails() {
        let text = "Type: fill-in-the-blank\nTitle: broken\n1. No blank at all.";
        assert!(quiz_sections(text).is_err());
    }

    #[test]
    fn two_bracket_tokens_fail() {
        let text = "Type: fill-in-the-blank\nTitle: broken\n1. Two [a] blanks [b] here.";
        assert!(quiz_sections(text).is_err());
    }

    #[test]
    fn question_before_choices_fails() {
        let text = "Type: multiple-choice\nTitle: broken\n1. Early [1] question.\nChoices: 1 a, 2 b";
        assert!(quiz_sections(text).is_err());
    }

    #[test]
    fn missing_title_fails_for_recognized_type() {
        let text = "Type: fill-in-the-blank\n1. The [answer] is here.";
        assert!(quiz_sections(text).is_err());
    }

    #[test]
    fn empty_input_yields_no_sections() {
        assert!(quiz_sections("").unwrap().is_empty());
    }
}
