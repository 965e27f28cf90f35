//! Bounded generate/extract retry loop with temperature escalation.

use std::future::Future;

use crate::error::{GenerationError, ParseError};
use crate::sampling::SamplingConfig;

/// Temperature added after each failed extraction.
pub const ESCALATION_STEP: f32 = 0.1;

/// Temperature is never escalated once it reaches this value.
///
/// Malformed output is often a degenerate low-temperature sample, so a
/// little extra diversity helps; past the ceiling further heat only
/// destabilizes output that was close to correct.
pub const ESCALATION_CEILING: f32 = 0.3;

/// Default number of attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 4;

/// Drives a bounded loop of generate-then-extract attempts.
///
/// Each attempt calls the supplied async generation callback with the
/// current [`SamplingConfig`], feeds the raw text to the extractor, and
/// returns the typed value on first success. An extraction failure bumps
/// the temperature by [`ESCALATION_STEP`] while strictly below
/// [`ESCALATION_CEILING`] and retries; exhaustion surfaces
/// [`GenerationError::Parsing`] carrying the last raw output verbatim.
///
/// Attempts are strictly sequential - attempt *n*'s temperature depends
/// on attempt *n-1*'s outcome, so there is nothing to parallelize.
/// Transport failures from the callback propagate immediately and never
/// count against parse retries; recover from those with an outer
/// retry-with-backoff around the whole call.
#[derive(Debug, Clone)]
pub struct GenerationController {
    config: SamplingConfig,
    max_attempts: usize,
}

impl GenerationController {
    /// Controller with the default attempt bound.
    #[must_use]
    pub const fn new(config: SamplingConfig) -> Self {
        Self {
            config,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Overrides the attempt bound (fluent builder pattern). Call sites
    /// with stricter schemas may want a higher bound.
    #[must_use]
    pub const fn max_attempts(mut self, max: usize) -> Self {
        self.max_attempts = max;
        self
    }

    /// Runs the retry loop.
    ///
    /// `generate` must report usage to the run's ledger as a side effect
    /// of every call it makes, whether or not extraction later succeeds;
    /// `extract` must be total - any failure it returns means "the output
    /// was unusable", never "the extractor is broken".
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Parsing`] after `max_attempts` failed
    /// extractions, and [`GenerationError::Generation`] as soon as the
    /// callback itself fails.
    pub async fn run<T, G, Fut, X>(&self, generate: G, extract: X) -> Result<T, GenerationError>
    where
        G: Fn(SamplingConfig) -> Fut,
        Fut: Future<Output = Result<String, String>>,
        X: Fn(&str) -> Result<T, ParseError>,
    {
        let mut config = self.config.clone();
        let mut last_output = String::new();
        let mut last_error = ParseError::new("no attempts were made");

        for attempt in 1..=self.max_attempts {
            tracing::debug!(
                attempt,
                max_attempts = self.max_attempts,
                temperature = config.temperature,
                "generation attempt"
            );

            let output = generate(config.clone())
                .await
                .map_err(GenerationError::Generation)?;

            match extract(&output) {
                Ok(value) => {
                    tracing::debug!(attempt, "extraction succeeded");
                    return Ok(value);
                }
                Err(error) => {
                    tracing::warn!(attempt, %error, "extraction failed");
                    if config.temperature < ESCALATION_CEILING {
                        config.temperature += ESCALATION_STEP;
                    }
                    last_output = output;
                    last_error = error;
                }
            }
        }

        Err(GenerationError::Parsing {
            attempts: self.max_attempts,
            last_error,
            last_output,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::sampling::ModelId;

    fn controller() -> GenerationController {
        GenerationController::new(SamplingConfig::new(ModelId::Gpt4))
    }

    fn parse_ok(text: &str) -> Result<String, ParseError> {
        if text.contains("ok") {
            Ok(text.to_string())
        } else {
            Err(ParseError::new("no ok marker"))
        }
    }

    #[tokio::test]
    async fn returns_on_first_success() {
        let calls = Mutex::new(0usize);
        let result = controller()
            .run(
                |_config| {
                    *calls.lock().unwrap() += 1;
                    async { Ok("ok output".to_string()) }
                },
                parse_ok,
            )
            .await
            .unwrap();
        assert_eq!(result, "ok output");
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt_with_exactly_three_calls() {
        let calls = Mutex::new(0usize);
        let result = controller()
            .run(
                |_config| {
                    let mut calls = calls.lock().unwrap();
                    *calls += 1;
                    let text = if *calls == 3 { "ok now" } else { "garbage" };
                    async move { Ok(text.to_string()) }
                },
                parse_ok,
            )
            .await
            .unwrap();
        assert_eq!(result, "ok now");
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn exhaustion_carries_the_last_raw_output() {
        let calls = Mutex::new(0usize);
        let err = controller()
            .run(
                |_config| {
                    let mut calls = calls.lock().unwrap();
                    *calls += 1;
                    let text = format!("garbage {}", *calls);
                    async move { Ok(text) }
                },
                parse_ok,
            )
            .await
            .unwrap_err();

        assert_eq!(*calls.lock().unwrap(), DEFAULT_MAX_ATTEMPTS);
        match err {
            GenerationError::Parsing {
                attempts,
                last_output,
                ..
            } => {
                assert_eq!(attempts, DEFAULT_MAX_ATTEMPTS);
                assert_eq!(last_output, "garbage 4");
            }
            GenerationError::Generation(_) => panic!("expected a parsing failure"),
        }
    }

    #[tokio::test]
    async fn temperature_escalates_to_the_ceiling_then_holds() {
        let temperatures = Mutex::new(Vec::new());
        let err = controller()
            .max_attempts(5)
            .run(
                |config| {
                    temperatures.lock().unwrap().push(config.temperature);
                    async { Ok("garbage".to_string()) }
                },
                parse_ok,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Parsing { .. }));

        let temperatures = temperatures.lock().unwrap();
        let expected = [0.0, 0.1, 0.2, 0.3, 0.3];
        assert_eq!(temperatures.len(), expected.len());
        for (seen, want) in temperatures.iter().zip(expected) {
            assert!((seen - want).abs() < 1e-6, "saw {seen}, wanted {want}");
        }
    }

    #[tokio::test]
    async fn transport_failure_propagates_without_retry() {
        let calls = Mutex::new(0usize);
        let err = controller()
            .run(
                |_config| {
                    *calls.lock().unwrap() += 1;
                    async { Err("connection reset".to_string()) }
                },
                parse_ok,
            )
            .await
            .unwrap_err();
        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(matches!(err, GenerationError::Generation(_)));
    }

    #[tokio::test]
    async fn extractor_error_details_survive_exhaustion() {
        let err = controller()
            .max_attempts(2)
            .run(
                |_config| async { Ok("garbage".to_string()) },
                |_text: &str| -> Result<(), ParseError> {
                    Err(ParseError::new("three sections, expected two"))
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("three sections"));
        assert_eq!(err.last_output(), Some("garbage"));
    }
}
