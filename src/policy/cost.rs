//! Per-request cost estimation from reported token usage.
//!
//! Rates are per token. The table is walked in order and the first substring
//! match on the model identifier wins; a model matching no row gets the
//! conservative fallback rate. Estimation never fails: unknown models are a
//! pricing question, not an availability one.

use crate::providers::types::Usage;

/// One pricing row: (model substring, prompt rate, completion rate).
const RATE_TABLE: &[(&str, f64, f64)] = &[
    ("gpt-4", 0.000_15, 0.000_60),
    ("claude", 0.000_20, 0.001_00),
];

const FALLBACK_RATES: (f64, f64) = (0.000_05, 0.000_10);

#[derive(Debug, Clone, Copy, Default)]
pub struct CostEstimator;

impl CostEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Estimated USD cost of one call, from its normalized usage.
    pub fn estimate(&self, model: &str, usage: &Usage) -> f64 {
        let (prompt_rate, completion_rate) = rates_for(model);
        f64::from(usage.prompt_tokens) * prompt_rate
            + f64::from(usage.completion_tokens) * completion_rate
    }
}

fn rates_for(model: &str) -> (f64, f64) {
    for (needle, prompt_rate, completion_rate) in RATE_TABLE {
        if model.contains(needle) {
            return (*prompt_rate, *completion_rate);
        }
    }
    FALLBACK_RATES
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn usage(prompt: u32, completion: u32) -> Usage {
        Usage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }

    #[test]
    fn test_gpt4_rates() {
        let estimator = CostEstimator::new();
        let cost = estimator.estimate("gpt-4o-mini", &usage(1000, 1000));
        assert!((cost - (0.15 + 0.60)).abs() < 1e-9);
    }

    #[test]
    fn test_claude_rates() {
        let estimator = CostEstimator::new();
        let cost = estimator.estimate("claude-sonnet", &usage(1000, 500));
        assert!((cost - (0.20 + 0.50)).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_uses_fallback() {
        let estimator = CostEstimator::new();
        let cost = estimator.estimate("mistral-large", &usage(1000, 1000));
        assert!((cost - (0.05 + 0.10)).abs() < 1e-9);
    }

    #[test]
    fn test_first_match_wins() {
        // A model name matching both rows is priced by the earlier row.
        let estimator = CostEstimator::new();
        let both = estimator.estimate("gpt-4-claude-hybrid", &usage(1000, 1000));
        let gpt4 = estimator.estimate("gpt-4", &usage(1000, 1000));
        assert!((both - gpt4).abs() < 1e-12);
    }

    #[test]
    fn test_zero_usage_is_free() {
        let estimator = CostEstimator::new();
        assert_eq!(estimator.estimate("gpt-4", &usage(0, 0)), 0.0);
    }

    proptest! {
        #[test]
        fn prop_cost_non_negative(prompt in 0u32..100_000, completion in 0u32..100_000) {
            let estimator = CostEstimator::new();
            for model in ["gpt-4", "claude-haiku", "whatever"] {
                prop_assert!(estimator.estimate(model, &usage(prompt, completion)) >= 0.0);
            }
        }

        #[test]
        fn prop_cost_deterministic(prompt in 0u32..100_000, completion in 0u32..100_000) {
            let estimator = CostEstimator::new();
            let a = estimator.estimate("claude-haiku", &usage(prompt, completion));
            let b = estimator.estimate("claude-haiku", &usage(prompt, completion));
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_cost_monotonic_in_usage(prompt in 0u32..50_000, completion in 0u32..50_000) {
            let estimator = CostEstimator::new();
            let base = estimator.estimate("gpt-4", &usage(prompt, completion));
            let more = estimator.estimate("gpt-4", &usage(prompt + 1, completion + 1));
            prop_assert!(more > base);
        }
    }
}
