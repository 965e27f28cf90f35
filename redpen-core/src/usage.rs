//! Per-attempt token accounting and cost derivation.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::UnknownModelError;
use crate::sampling::ModelId;

/// Token usage reported by one generation call.
///
/// Created exactly once per attempt that reached the model, whether or
/// not extraction later succeeded - the caller is billed regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Model that served the call.
    pub model: ModelId,
}

/// Price of one model per 1000 tokens, in USD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    /// USD per 1000 prompt tokens.
    pub prompt_per_1k: f64,
    /// USD per 1000 completion tokens.
    pub completion_per_1k: f64,
}

/// Static mapping from model id to per-token prices.
///
/// Owned by configuration and read-only at runtime. [`Default`] carries
/// the built-in OpenAI list prices; `Deserialize` lets a deployment
/// reload the table from its own config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceTable {
    prices: HashMap<ModelId, ModelPrice>,
}

impl Default for PriceTable {
    fn default() -> Self {
        let prices = HashMap::from([
            (
                ModelId::Gpt4,
                ModelPrice {
                    prompt_per_1k: 0.03,
                    completion_per_1k: 0.06,
                },
            ),
            (
                ModelId::Gpt35Turbo,
                ModelPrice {
                    prompt_per_1k: 0.0015,
                    completion_per_1k: 0.002,
                },
            ),
            (
                ModelId::TextDavinci003,
                ModelPrice {
                    prompt_per_1k: 0.02,
                    completion_per_1k: 0.02,
                },
            ),
        ]);
        Self { prices }
    }
}

impl PriceTable {
    /// Price entry for a model, or an error for an id the table does not
    /// carry - failing loudly beats silently under-billing.
    pub fn price(&self, model: ModelId) -> Result<ModelPrice, UnknownModelError> {
        self.prices
            .get(&model)
            .copied()
            .ok_or_else(|| UnknownModelError(model.to_string()))
    }

    /// Cost of a single record in USD.
    pub fn cost_of(&self, record: &UsageRecord) -> Result<f64, UnknownModelError> {
        let price = self.price(record.model)?;
        Ok(
            f64::from(record.prompt_tokens) * price.prompt_per_1k / 1000.0
                + f64::from(record.completion_tokens) * price.completion_per_1k / 1000.0,
        )
    }
}

/// Append-only ledger of usage records for one top-level run.
///
/// Owned by the run and passed by shared reference into every generation
/// callback; the interior mutex makes each append atomic so the
/// one-record-per-attempt invariant survives even if a caller fans out.
/// Insertion order is call order. Never rolled back, even when the run
/// later fails.
#[derive(Debug, Default)]
pub struct UsageLedger {
    records: Mutex<Vec<UsageRecord>>,
}

impl UsageLedger {
    /// An empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one record. Called by the generation callback as a side
    /// channel, independent of whether extraction succeeds.
    pub fn append(&self, record: UsageRecord) {
        #[allow(clippy::unwrap_used)] // a poisoned ledger is a programmer error
        self.records.lock().unwrap().push(record);
    }

    /// Snapshot of all records in insertion order.
    #[must_use]
    pub fn records(&self) -> Vec<UsageRecord> {
        #[allow(clippy::unwrap_used)]
        self.records.lock().unwrap().clone()
    }

    /// Number of records appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        #[allow(clippy::unwrap_used)]
        self.records.lock().unwrap().len()
    }

    /// Whether no call has reported usage yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total cost of the run in USD, recomputed on demand from the given
    /// price table (not cached - the table may be reloaded between calls).
    pub fn total_cost(&self, prices: &PriceTable) -> Result<f64, UnknownModelError> {
        self.records()
            .iter()
            .try_fold(0.0, |acc, record| Ok(acc + prices.cost_of(record)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpt4_record(prompt: u32, completion: u32) -> UsageRecord {
        UsageRecord {
            prompt_tokens: prompt,
            completion_tokens: completion,
            model: ModelId::Gpt4,
        }
    }

    #[test]
    fn total_cost_sums_records() {
        let ledger = UsageLedger::new();
        ledger.append(gpt4_record(1000, 500));
        ledger.append(gpt4_record(1000, 500));

        // 2 x (1000 * 0.03/1k + 500 * 0.06/1k) = 2 x 0.06 = 0.12
        let cost = ledger.total_cost(&PriceTable::default()).unwrap();
        assert!((cost - 0.12).abs() < 1e-12);
    }

    #[test]
    fn empty_ledger_costs_nothing() {
        let ledger = UsageLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.total_cost(&PriceTable::default()).unwrap(), 0.0);
    }

    #[test]
    fn insertion_order_is_call_order() {
        let ledger = UsageLedger::new();
        ledger.append(gpt4_record(1, 0));
        ledger.append(gpt4_record(2, 0));
        ledger.append(gpt4_record(3, 0));
        let prompts: Vec<u32> = ledger.records().iter().map(|r| r.prompt_tokens).collect();
        assert_eq!(prompts, vec![1, 2, 3]);
    }

    #[test]
    fn missing_price_is_a_hard_error() {
        let table: PriceTable = serde_json::from_value(serde_json::json!({
            "prices": { "gpt-4": { "prompt_per_1k": 0.03, "completion_per_1k": 0.06 } }
        }))
        .unwrap();

        let ledger = UsageLedger::new();
        ledger.append(UsageRecord {
            prompt_tokens: 10,
            completion_tokens: 10,
            model: ModelId::Gpt35Turbo,
        });
        let err = ledger.total_cost(&table).unwrap_err();
        assert_eq!(err.0, "gpt-3.5-turbo");
    }
}
