use std::fmt::Display;

use chrono::{DateTime, Utc};
use km_common::{Money, QUOTE_CURRENCY_CODE};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The rate applied when a top-up invoice is issued in the absence of an admin-set rate.
pub const DEFAULT_EXCHANGE_RATE: i64 = 25_000;

/// The singleton conversion rate between the quote currency and the local currency sellers
/// actually transfer. `rate` is the number of local currency units per whole quote unit.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub rate: i64,
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn new(rate: i64, updated_at: Option<DateTime<Utc>>) -> Self {
        let updated_at = updated_at.unwrap_or_else(Utc::now);
        Self { rate, updated_at }
    }

    /// Converts a quote amount to local currency units, rounding half-up on the sub-unit
    /// remainder. `Money` is held in cents, so a $10.00 amount at rate 25 000 yields 250 000.
    pub fn local_value(&self, amount: Money) -> i64 {
        (amount.value() * self.rate + 50) / 100
    }
}

impl Display for ExchangeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "1 {QUOTE_CURRENCY_CODE} => {}", self.rate)
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        Self { rate: DEFAULT_EXCHANGE_RATE, updated_at: Utc::now() }
    }
}
