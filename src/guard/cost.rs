use serde::Deserialize;
use serde_json::Value;

/// USD per million input tokens.
pub const INPUT_PRICE_PER_MTOK: f64 = 3.0;
/// USD per million output tokens.
pub const OUTPUT_PRICE_PER_MTOK: f64 = 15.0;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl Usage {
    /// Reads the `usage` section of a provider response. Anything missing or
    /// malformed counts as zero.
    pub fn from_response(body: &Value) -> Self {
        let usage = body.get("usage");
        let tokens = |field: &str| {
            usage
                .and_then(|u| u.get(field))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        };
        Usage {
            input_tokens: tokens("input_tokens"),
            output_tokens: tokens("output_tokens"),
        }
    }

    pub fn estimated_cost(&self) -> f64 {
        (self.input_tokens as f64 / 1_000_000.0 * INPUT_PRICE_PER_MTOK)
            + (self.output_tokens as f64 / 1_000_000.0 * OUTPUT_PRICE_PER_MTOK)
    }
}
