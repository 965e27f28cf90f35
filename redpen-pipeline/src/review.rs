//! Top-level review pipeline.

use serde::{Deserialize, Serialize};

use redpen_core::extract::{Mistake, QuizSection};
use redpen_core::{GenerationError, ModelId, PriceTable, UsageLedger};

use crate::classify::Classifier;
use crate::client::ChatClient;
use crate::comment::create_comment;
use crate::correction::CorrectionGenerator;
use crate::errors::PipelineError;
use crate::essay::{preprocess, validate_text, Essay};
use crate::explanation::ExplanationGenerator;
use crate::native::{ExpressionNote, NativeGenerator};
use crate::quiz::{QuizGenerator, QuizSource};
use crate::score::{score_essay, EssayScore};

/// Upper word bound accepted for one essay.
pub const MAX_WORDS: usize = 150;
/// Lower word bound accepted for one essay.
pub const MIN_WORDS: usize = 5;

/// Which optional artifacts a review run should produce.
#[derive(Debug, Clone, Copy)]
pub struct ReviewOptions {
    /// Generate quizzes from the classified mistakes.
    pub quiz: bool,
    /// Generate a free-text teacher comment.
    pub comment: bool,
    /// Score the essay against the rubric.
    pub score: bool,
    /// Rewrite the corrected essay in a fluent register and explain the
    /// expressions the rewrite introduced.
    pub native: bool,
}

impl Default for ReviewOptions {
    fn default() -> Self {
        Self {
            quiz: false,
            comment: true,
            score: false,
            native: true,
        }
    }
}

/// Usage totals for one review run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Number of generation calls that reported usage.
    pub calls: usize,
    /// Prompt tokens across the run.
    pub prompt_tokens: u64,
    /// Completion tokens across the run.
    pub completion_tokens: u64,
    /// Derived cost in USD.
    pub total_cost_usd: f64,
}

/// One classified mistake with its explanation, when one was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplainedMistake {
    /// The mistake as classified.
    pub mistake: Mistake,
    /// Teaching explanation; `None` means the mistake stayed unexplained.
    pub explanation: Option<String>,
}

/// One sentence pair with its explained mistakes, in essay order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceReview {
    /// The sentence as written.
    pub original: String,
    /// The corrected sentence.
    pub corrected: String,
    /// Explained mistakes; empty means the sentence was clean.
    pub mistakes: Vec<ExplainedMistake>,
}

/// Everything one review run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EssayReview {
    /// The essay as submitted, split into sentences.
    pub original: Essay,
    /// The corrected essay, sentence-aligned with the original.
    pub corrected: Essay,
    /// Per-sentence classification and explanations, in essay order.
    pub sentences: Vec<SentenceReview>,
    /// Quizzes generated from the mistakes (empty unless requested).
    pub quizzes: Vec<QuizSection>,
    /// Fluent rewrite of the corrected essay, when requested.
    pub native: Option<Essay>,
    /// Expression notes drawn from the rewrite (empty unless produced).
    pub expression_notes: Vec<ExpressionNote>,
    /// Teacher comment, when requested.
    pub comment: Option<String>,
    /// Rubric score, when requested and produced.
    pub score: Option<EssayScore>,
    /// Token and cost accounting for the whole run.
    pub usage: UsageSummary,
}

/// Strings the consumers together over one client and one ledger.
pub struct ReviewPipeline<'a> {
    client: &'a dyn ChatClient,
    prices: PriceTable,
    model: ModelId,
}

impl<'a> ReviewPipeline<'a> {
    /// Pipeline with the built-in price table and the default model.
    #[must_use]
    pub fn new(client: &'a dyn ChatClient) -> Self {
        Self {
            client,
            prices: PriceTable::default(),
            model: ModelId::Gpt4,
        }
    }

    /// Pipeline with a caller-supplied price table.
    #[must_use]
    pub fn with_prices(client: &'a dyn ChatClient, prices: PriceTable) -> Self {
        Self {
            prices,
            ..Self::new(client)
        }
    }

    /// Selects the model every consumer samples from.
    #[must_use]
    pub fn model(mut self, model: ModelId) -> Self {
        self.model = model;
        self
    }

    /// Runs one full review.
    ///
    /// Correction is load-bearing: if its output never parses, the run
    /// fails. The other artifacts degrade instead - a mistake whose
    /// explanation cannot be produced is left unexplained, quiz batches
    /// degrade inside the quiz generator, unextractable expression notes
    /// are omitted, and so is a score whose output never parses - so one
    /// stubborn artifact never throws away an otherwise reviewed essay.
    pub async fn review(
        &self,
        essay_text: &str,
        options: &ReviewOptions,
    ) -> Result<EssayReview, PipelineError> {
        validate_text(essay_text, MAX_WORDS, MIN_WORDS)?;
        let essay_text = preprocess(essay_text);

        // One ledger per run, owned here, shared with every callback.
        let ledger = UsageLedger::new();

        let (original, corrected) = CorrectionGenerator::with_model(self.model)
            .correct(self.client, &ledger, &essay_text)
            .await?;

        let classifier = Classifier::with_model(self.model);
        let mut classified = Vec::with_capacity(original.sentences.len());
        for (original_sentence, corrected_sentence) in
            original.sentences.iter().zip(&corrected.sentences)
        {
            classified.push(
                classifier
                    .classify(self.client, &ledger, original_sentence, corrected_sentence)
                    .await?,
            );
        }

        let explainer = ExplanationGenerator::with_model(self.model);
        let mut sentences = Vec::with_capacity(classified.len());
        for sentence in classified {
            let mut mistakes = Vec::with_capacity(sentence.mistakes.len());
            for mistake in &sentence.mistakes {
                let explanation = match explainer
                    .explain(
                        self.client,
                        &ledger,
                        &sentence.original,
                        &sentence.corrected,
                        mistake,
                    )
                    .await
                {
                    Ok(explanation) => Some(explanation.text),
                    Err(PipelineError::Generation(GenerationError::Parsing {
                        attempts, ..
                    })) => {
                        tracing::warn!(
                            attempts,
                            change = %mistake.change(),
                            "explanation never produced, leaving the mistake unexplained"
                        );
                        None
                    }
                    Err(other) => return Err(other),
                };
                mistakes.push(ExplainedMistake {
                    mistake: mistake.clone(),
                    explanation,
                });
            }
            sentences.push(SentenceReview {
                original: sentence.original,
                corrected: sentence.corrected,
                mistakes,
            });
        }

        let quizzes = if options.quiz {
            let sources: Vec<QuizSource> = sentences
                .iter()
                .flat_map(|sentence| {
                    sentence.mistakes.iter().map(|explained| QuizSource {
                        original: sentence.original.clone(),
                        corrected: sentence.corrected.clone(),
                        change: explained.mistake.change(),
                    })
                })
                .collect();
            QuizGenerator::with_model(self.model)
                .generate(self.client, &ledger, &sources)
                .await?
        } else {
            Vec::new()
        };

        let (native, expression_notes) = if options.native {
            let generator = NativeGenerator::with_model(self.model);
            let native = generator.rewrite(self.client, &ledger, &corrected).await?;
            let notes = match generator
                .notes(self.client, &ledger, &corrected, &native)
                .await
            {
                Ok(notes) => notes,
                Err(PipelineError::Generation(GenerationError::Parsing { attempts, .. })) => {
                    tracing::warn!(attempts, "expression notes never parsed, omitting them");
                    Vec::new()
                }
                Err(other) => return Err(other),
            };
            (Some(native), notes)
        } else {
            (None, Vec::new())
        };

        let comment = if options.comment {
            Some(create_comment(self.client, &ledger, self.model, &original.paragraph).await?)
        } else {
            None
        };

        let score = if options.score {
            match score_essay(self.client, &ledger, self.model, &original.paragraph).await {
                Ok(score) => Some(score),
                Err(PipelineError::Generation(GenerationError::Parsing { attempts, .. })) => {
                    tracing::warn!(attempts, "score output never parsed, omitting the score");
                    None
                }
                Err(other) => return Err(other),
            }
        } else {
            None
        };

        let usage = self.summarize(&ledger)?;
        tracing::info!(
            calls = usage.calls,
            cost_usd = usage.total_cost_usd,
            "review complete"
        );

        Ok(EssayReview {
            original,
            corrected,
            sentences,
            quizzes,
            native,
            expression_notes,
            comment,
            score,
            usage,
        })
    }

    fn summarize(&self, ledger: &UsageLedger) -> Result<UsageSummary, PipelineError> {
        let records = ledger.records();
        Ok(UsageSummary {
            calls: records.len(),
            prompt_tokens: records.iter().map(|r| u64::from(r.prompt_tokens)).sum(),
            completion_tokens: records
                .iter()
                .map(|r| u64::from(r.completion_tokens))
                .sum(),
            total_cost_usd: ledger.total_cost(&self.prices)?,
        })
    }
}
