//! Token usage → priced cost breakdown.

use crate::registry::{PricingEntry, RegistrySnapshot, default_pricing};
use serde::{Deserialize, Serialize};

/// Which pricing table answered the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingSource {
    Embedding,
    Model,
    /// Unknown model; documented non-zero default applied.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostParams {
    /// Price prompt tokens at the cached-input rate when one exists.
    pub use_cached_input: bool,
    pub input_multiplier: f64,
    pub output_multiplier: f64,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            use_cached_input: false,
            input_multiplier: 1.0,
            output_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostResult {
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    /// The entry the costs were computed from.
    pub pricing: PricingEntry,
    pub source: PricingSource,
}

/// Round to 8 fractional decimal digits.
fn round8(v: f64) -> f64 {
    (v * 1e8).round() / 1e8
}

/// Price one turn's token usage.
///
/// Lookup order: embedding table, then model pricing, then the default
/// entry — an unknown model is never reported as free. The three cost
/// figures are each rounded independently so results stay reproducible;
/// the total is rounded from the unrounded sum, not re-summed.
#[tracing::instrument(level = "debug", skip(snapshot))]
pub fn compute_cost(
    snapshot: &RegistrySnapshot,
    model: &str,
    prompt_tokens: u64,
    completion_tokens: u64,
    params: &CostParams,
) -> CostResult {
    let folded = model.to_ascii_lowercase();

    let (pricing, source) = if let Some(p) = snapshot.embedding_pricing(&folded) {
        (p.clone(), PricingSource::Embedding)
    } else if let Some(p) = snapshot.model_pricing(&folded) {
        (p.clone(), PricingSource::Model)
    } else {
        tracing::warn!(model = %folded, "no pricing entry; using default pricing");
        (default_pricing(), PricingSource::Default)
    };

    let input_rate = if params.use_cached_input {
        pricing.cached_input.unwrap_or(pricing.input)
    } else {
        pricing.input
    };

    let input_cost =
        prompt_tokens as f64 * (input_rate / 1_000_000.0) * params.input_multiplier;
    let output_cost =
        completion_tokens as f64 * (pricing.output / 1_000_000.0) * params.output_multiplier;
    let total_cost = input_cost + output_cost;

    CostResult {
        input_cost: round8(input_cost),
        output_cost: round8(output_cost),
        total_cost: round8(total_cost),
        pricing,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> RegistrySnapshot {
        RegistrySnapshot::builtin()
    }

    #[test]
    fn unknown_model_is_never_free() {
        let result = compute_cost(&snapshot(), "unknown-model", 1000, 500, &CostParams::default());
        assert_eq!(result.source, PricingSource::Default);
        assert!(result.total_cost > 0.0);
    }

    #[test]
    fn one_million_prompt_tokens_cost_the_input_price() {
        let snapshot = snapshot();
        let result = compute_cost(&snapshot, "gpt-4o", 1_000_000, 0, &CostParams::default());
        let expected = snapshot.model_pricing("gpt-4o").unwrap().input;
        assert_eq!(result.input_cost, round8(expected));
        assert_eq!(result.total_cost, result.input_cost);
        assert_eq!(result.output_cost, 0.0);
        assert_eq!(result.source, PricingSource::Model);
    }

    #[test]
    fn embedding_table_wins_over_model_pricing() {
        let result = compute_cost(
            &snapshot(),
            "text-embedding-3-small",
            1_000_000,
            0,
            &CostParams::default(),
        );
        assert_eq!(result.source, PricingSource::Embedding);
        assert_eq!(result.input_cost, 0.02);
    }

    #[test]
    fn cached_input_rate_applies_when_requested() {
        let params = CostParams {
            use_cached_input: true,
            ..CostParams::default()
        };
        let snapshot = snapshot();
        let result = compute_cost(&snapshot, "gpt-4o", 1_000_000, 0, &params);
        let cached = snapshot.model_pricing("gpt-4o").unwrap().cached_input.unwrap();
        assert_eq!(result.input_cost, round8(cached));

        // Models without a cached rate fall back to the standard one.
        let result = compute_cost(&snapshot, "mistral-large-latest", 1_000_000, 0, &params);
        assert_eq!(
            result.input_cost,
            round8(snapshot.model_pricing("mistral-large-latest").unwrap().input)
        );
    }

    #[test]
    fn multipliers_scale_each_side_independently() {
        let params = CostParams {
            use_cached_input: false,
            input_multiplier: 2.0,
            output_multiplier: 0.5,
        };
        let base = compute_cost(&snapshot(), "gpt-4o", 1_000_000, 1_000_000, &CostParams::default());
        let scaled = compute_cost(&snapshot(), "gpt-4o", 1_000_000, 1_000_000, &params);
        assert_eq!(scaled.input_cost, round8(base.input_cost * 2.0));
        assert_eq!(scaled.output_cost, round8(base.output_cost * 0.5));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let a = compute_cost(&snapshot(), "GPT-4o", 1234, 567, &CostParams::default());
        let b = compute_cost(&snapshot(), "gpt-4o", 1234, 567, &CostParams::default());
        assert_eq!(a, b);
        assert_eq!(a.source, PricingSource::Model);
    }

    #[test]
    fn values_round_to_eight_decimals() {
        // 7 tokens at $0.15/M = 0.00000105 exactly; 1 token = 0.00000015.
        let result = compute_cost(&snapshot(), "gpt-4o-mini", 7, 0, &CostParams::default());
        assert_eq!(result.input_cost, 0.00000105);
        let result = compute_cost(&snapshot(), "gpt-4o-mini", 1, 1, &CostParams::default());
        assert_eq!(result.input_cost, 0.00000015);
        assert_eq!(result.output_cost, 0.0000006);
        assert_eq!(result.total_cost, 0.00000075);
    }
}
