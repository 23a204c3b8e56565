//! Token estimation and dollar-cost accounting for LLM calls.
//!
//! Costs are computed from a static per-model table with distinct rates for
//! regular input, cached input, and output tokens. Totals accumulate for the
//! lifetime of the process and reset only on restart.

use std::sync::Mutex;

use tracing::info;

use crate::llm::LlmUsage;

/// USD per million tokens.
#[derive(Clone, Copy, Debug)]
pub struct ModelRates {
    pub input: f64,
    pub cached_input: f64,
    pub output: f64,
}

const PRICING_TABLE: &[(&str, ModelRates)] = &[
    (
        "gpt-4o",
        ModelRates {
            input: 2.50,
            cached_input: 1.25,
            output: 10.00,
        },
    ),
    (
        "gpt-4o-mini",
        ModelRates {
            input: 0.15,
            cached_input: 0.075,
            output: 0.60,
        },
    ),
    (
        "gpt-4.1",
        ModelRates {
            input: 2.00,
            cached_input: 0.50,
            output: 8.00,
        },
    ),
    (
        "gpt-4.1-mini",
        ModelRates {
            input: 0.40,
            cached_input: 0.10,
            output: 1.60,
        },
    ),
    (
        "o4-mini",
        ModelRates {
            input: 1.10,
            cached_input: 0.275,
            output: 4.40,
        },
    ),
];

pub fn rates_for_model(model: &str) -> Option<ModelRates> {
    PRICING_TABLE
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, rates)| *rates)
}

/// Rough pre-call estimate: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64 + 3) / 4
}

/// Dollar cost of a single request.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RequestCost {
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

pub fn cost_for_usage(model: &str, usage: &LlmUsage) -> Option<RequestCost> {
    let rates = rates_for_model(model)?;
    let per_tok = 1.0 / 1_000_000.0;

    let input_cost = usage.uncached_input_tokens() as f64 * rates.input * per_tok
        + usage.cached_input_tokens as f64 * rates.cached_input * per_tok;
    let output_cost = usage.output_tokens as f64 * rates.output * per_tok;

    Some(RequestCost {
        input_cost,
        output_cost,
        total_cost: input_cost + output_cost,
    })
}

#[derive(Clone, Copy, Debug, Default)]
struct CostTotals {
    input_cost: f64,
    output_cost: f64,
    total_cost: f64,
    request_count: u64,
}

/// Process-lifetime cost accumulator.
///
/// Cumulative totals are logged every [`LOG_EVERY_N_REQUESTS`] requests and
/// whenever the running total crosses a whole-dollar threshold.
#[derive(Debug, Default)]
pub struct CostTracker {
    totals: Mutex<CostTotals>,
}

const LOG_EVERY_N_REQUESTS: u64 = 10;

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request. `estimated_input_tokens` is the pre-call estimate;
    /// `usage` is the provider-reported actual, when the provider reports one.
    ///
    /// Returns the priced cost, or `None` when the provider reported no usage
    /// or the model has no pricing entry.
    pub fn record(
        &self,
        model: &str,
        estimated_input_tokens: u64,
        usage: Option<&LlmUsage>,
    ) -> Option<RequestCost> {
        let Some(usage) = usage else {
            info!(
                model,
                estimated_input_tokens, "llm call completed; provider reported no usage"
            );
            return None;
        };

        let delta = usage.input_tokens as i64 - estimated_input_tokens as i64;
        info!(
            model,
            estimated_input_tokens,
            actual_input_tokens = usage.input_tokens,
            cached_input_tokens = usage.cached_input_tokens,
            output_tokens = usage.output_tokens,
            estimate_delta = delta,
            "llm usage reported"
        );

        let cost = cost_for_usage(model, usage)?;

        let mut totals = self.totals.lock().expect("cost totals lock");
        let prev_whole_dollars = totals.total_cost.floor();

        totals.input_cost += cost.input_cost;
        totals.output_cost += cost.output_cost;
        totals.total_cost += cost.total_cost;
        totals.request_count += 1;

        let crossed_dollar = totals.total_cost.floor() > prev_whole_dollars;
        if totals.request_count % LOG_EVERY_N_REQUESTS == 0 || crossed_dollar {
            info!(
                requests = totals.request_count,
                input_cost = %format!("${:.4}", totals.input_cost),
                output_cost = %format!("${:.4}", totals.output_cost),
                total_cost = %format!("${:.4}", totals.total_cost),
                "cumulative llm spend"
            );
        }

        Some(cost)
    }

    pub fn request_count(&self) -> u64 {
        self.totals.lock().expect("cost totals lock").request_count
    }

    pub fn total_cost(&self) -> f64 {
        self.totals.lock().expect("cost totals lock").total_cost
    }
}
