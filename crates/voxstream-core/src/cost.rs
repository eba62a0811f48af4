//! Token usage and cost computation

use serde::{Deserialize, Serialize};

/// Server-reported token counts for a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounts {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
    pub total_tokens: u64,
}

/// Per-1K-token USD rates supplied with the session setup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingRates {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
    /// Defaults to 50% of the input rate when not separately supplied.
    pub cached_per_1k: Option<f64>,
}

impl PricingRates {
    pub fn new(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            input_per_1k,
            output_per_1k,
            cached_per_1k: None,
        }
    }

    pub fn with_cached_rate(mut self, cached_per_1k: f64) -> Self {
        self.cached_per_1k = Some(cached_per_1k);
        self
    }

    pub fn cached_rate(&self) -> f64 {
        self.cached_per_1k.unwrap_or(self.input_per_1k * 0.5)
    }
}

/// Usage metadata with per-bucket USD costs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostInfo {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_tokens: u64,
    pub input_cost: f64,
    pub cached_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

impl CostInfo {
    /// Compute costs from server-reported counts. Without rates the token
    /// counts are still carried and every cost bucket is zero.
    pub fn from_usage(usage: &UsageCounts, rates: Option<&PricingRates>) -> Self {
        let mut info = Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cached_tokens: usage.cached_tokens,
            ..Self::default()
        };

        if let Some(rates) = rates {
            let billable_input = usage.input_tokens.saturating_sub(usage.cached_tokens);
            info.input_cost = billable_input as f64 / 1000.0 * rates.input_per_1k;
            info.cached_cost = usage.cached_tokens as f64 / 1000.0 * rates.cached_rate();
            info.output_cost = usage.output_tokens as f64 / 1000.0 * rates.output_per_1k;
            info.total_cost = info.input_cost + info.cached_cost + info.output_cost;
        }

        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_formula() {
        let usage = UsageCounts {
            input_tokens: 3000,
            output_tokens: 1000,
            cached_tokens: 1000,
            total_tokens: 4000,
        };
        let rates = PricingRates::new(0.10, 0.40);

        let cost = CostInfo::from_usage(&usage, Some(&rates));
        // (3000 - 1000) / 1000 * 0.10
        assert!((cost.input_cost - 0.20).abs() < 1e-9);
        // cached defaults to half the input rate
        assert!((cost.cached_cost - 0.05).abs() < 1e-9);
        assert!((cost.output_cost - 0.40).abs() < 1e-9);
        assert!((cost.total_cost - 0.65).abs() < 1e-9);
    }

    #[test]
    fn explicit_cached_rate_wins() {
        let usage = UsageCounts {
            input_tokens: 1000,
            output_tokens: 0,
            cached_tokens: 1000,
            total_tokens: 1000,
        };
        let rates = PricingRates::new(0.10, 0.40).with_cached_rate(0.01);

        let cost = CostInfo::from_usage(&usage, Some(&rates));
        assert!((cost.input_cost - 0.0).abs() < 1e-9);
        assert!((cost.cached_cost - 0.01).abs() < 1e-9);
    }

    #[test]
    fn no_rates_keeps_counts_only() {
        let usage = UsageCounts {
            input_tokens: 10,
            output_tokens: 2,
            cached_tokens: 0,
            total_tokens: 12,
        };

        let cost = CostInfo::from_usage(&usage, None);
        assert_eq!(cost.input_tokens, 10);
        assert_eq!(cost.output_tokens, 2);
        assert_eq!(cost.total_cost, 0.0);
    }
}
