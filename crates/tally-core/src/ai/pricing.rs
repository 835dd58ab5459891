//! Per-model token pricing
//!
//! Rates are USD per one million tokens.

use rust_decimal::Decimal;

/// Token rates for one model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPricing {
    pub input: Decimal,
    pub cached_input: Decimal,
    pub output: Decimal,
}

impl ModelPricing {
    /// Cost of a call in USD
    pub fn cost(&self, prompt_tokens: u32, completion_tokens: u32) -> Decimal {
        let per_token = Decimal::from(1_000_000u32);
        Decimal::from(prompt_tokens) * self.input / per_token
            + Decimal::from(completion_tokens) * self.output / per_token
    }
}

/// Look up rates for a model; `None` for unknown models
pub fn pricing_for(model: &str) -> Option<ModelPricing> {
    // Rates in thousandths of a dollar per 1M tokens
    let (input, cached_input, output) = match model {
        "gpt-5-2025-08-07" => (1_250, 125, 10_000),
        "gpt-5-mini-2025-08-07" => (250, 25, 2_000),
        "gpt-5-nano-2025-08-07" => (50, 5, 400),
        "gpt-4.1-2025-04-14" => (3_000, 750, 12_000),
        "gpt-4.1-mini-2025-04-14" => (800, 200, 3_200),
        "gpt-4.1-nano-2025-04-14" => (100, 25, 400),
        "o4-mini-2025-04-16" => (4_000, 1_000, 16_000),
        "gpt-oss-120b" | "gpt-oss-20b" => (0, 0, 0),
        _ => return None,
    };
    Some(ModelPricing {
        input: Decimal::new(input, 3),
        cached_input: Decimal::new(cached_input, 3),
        output: Decimal::new(output, 3),
    })
}

/// Cost of a call in USD; unknown models cost nothing
pub fn calculate_cost(model: &str, prompt_tokens: u32, completion_tokens: u32) -> Decimal {
    pricing_for(model)
        .map(|p| p.cost(prompt_tokens, completion_tokens))
        .unwrap_or(Decimal::ZERO)
}
