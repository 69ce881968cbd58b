//! Daily spend circuit breaker.

use std::sync::Mutex;

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpendSnapshot {
    pub day: NaiveDate,
    pub total: f64,
}

#[derive(Debug)]
pub struct DailySpend {
    limit: f64,
    state: Mutex<SpendSnapshot>,
}

impl DailySpend {
    pub fn new(limit: f64, today: NaiveDate) -> Self {
        Self {
            limit,
            state: Mutex::new(SpendSnapshot {
                day: today,
                total: 0.0,
            }),
        }
    }

    /// Rolls the counter over if `today` is a new day, then reports whether
    /// the budget still has room.
    pub fn is_open(&self, today: NaiveDate) -> bool {
        let mut state = self.lock();
        roll_over(&mut state, today);
        state.total < self.limit
    }

    /// Adds `cost` to today's total and returns the new total.
    pub fn record(&self, cost: f64, today: NaiveDate) -> f64 {
        let mut state = self.lock();
        roll_over(&mut state, today);
        if cost.is_finite() && cost > 0.0 {
            state.total += cost;
        }
        state.total
    }

    pub fn snapshot(&self) -> SpendSnapshot {
        *self.lock()
    }

    pub fn limit(&self) -> f64 {
        self.limit
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SpendSnapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn roll_over(state: &mut SpendSnapshot, today: NaiveDate) {
    if state.day != today {
        tracing::info!(
            previous_day = %state.day,
            previous_total = state.total,
            "Resetting daily spend"
        );
        state.day = today;
        state.total = 0.0;
    }
}
