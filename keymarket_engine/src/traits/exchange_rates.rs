use thiserror::Error;

use crate::api::exchange_objects::ExchangeRate;

/// Access to the singleton quote-to-local conversion rate. The backend creates a default rate
/// row on first read, so `fetch_or_default` never fails with a missing rate.
#[allow(async_fn_in_trait)]
pub trait ExchangeRates {
    async fn fetch_or_default(&self) -> Result<ExchangeRate, ExchangeRateError>;

    /// Replaces the rate. The new rate must be positive.
    async fn set_rate(&self, rate: i64) -> Result<ExchangeRate, ExchangeRateError>;
}

#[derive(Debug, Clone, Error)]
pub enum ExchangeRateError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("{0} is not a valid exchange rate")]
    InvalidRate(i64),
}

impl From<sqlx::Error> for ExchangeRateError {
    fn from(e: sqlx::Error) -> Self {
        ExchangeRateError::DatabaseError(e.to_string())
    }
}
