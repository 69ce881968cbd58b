//! Usage policy for the upstream proxy.
//!
//! [`Guardrail`] owns all process-wide policy state: the per-client rate
//! window and the daily spend counter. Handlers reach it only through
//! [`Guardrail::admit`] and [`Guardrail::record_spend`].

mod budget;
mod clock;
mod cost;
mod rate_limit;
mod validate;

use std::sync::Arc;
use std::time::Duration;

pub use budget::{DailySpend, SpendSnapshot};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cost::{INPUT_PRICE_PER_MTOK, OUTPUT_PRICE_PER_MTOK, Usage};
pub use rate_limit::RateWindow;
pub use validate::{
    MAX_MESSAGES, MAX_TOKENS, SUPPORTED_MODEL, SanitizedEnvelope, clamp_max_tokens, validate,
};

use crate::config::Config;
use crate::error::ProxyError;

pub struct Guardrail {
    rate: RateWindow,
    spend: DailySpend,
    clock: Arc<dyn Clock>,
}

impl Guardrail {
    pub fn new(
        max_requests: usize,
        window: Duration,
        daily_budget: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rate: RateWindow::new(max_requests, window),
            spend: DailySpend::new(daily_budget, clock.today()),
            clock,
        }
    }

    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config.rate_limit_requests,
            config.rate_limit_window(),
            config.daily_budget,
            clock,
        )
    }

    /// Rate check and record, then the daily circuit breaker.
    pub fn admit(&self, client: &str) -> Result<(), ProxyError> {
        self.rate
            .check_and_record(client, self.clock.now_millis())
            .map_err(|reset_in_minutes| {
                tracing::warn!(client, reset_in_minutes, "Rate limit exceeded");
                ProxyError::RateLimited { reset_in_minutes }
            })?;

        if !self.spend.is_open(self.clock.today()) {
            tracing::warn!(
                client,
                daily_total = self.spend.snapshot().total,
                limit = self.spend.limit(),
                "Daily budget reached, refusing request"
            );
            return Err(ProxyError::BudgetExhausted);
        }

        Ok(())
    }

    /// Adds the estimated cost of `usage` to today's total. Returns the cost
    /// and the new total.
    pub fn record_spend(&self, usage: Usage) -> (f64, f64) {
        let cost = usage.estimated_cost();
        let total = self.spend.record(cost, self.clock.today());
        (cost, total)
    }

    pub fn sweep_idle_clients(&self) -> usize {
        self.rate.sweep(self.clock.now_millis())
    }

    pub fn spend(&self) -> SpendSnapshot {
        self.spend.snapshot()
    }

    pub fn requests_in_window(&self, client: &str) -> usize {
        self.rate.count(client, self.clock.now_millis())
    }

    pub fn tracked_clients(&self) -> usize {
        self.rate.tracked_clients()
    }
}
