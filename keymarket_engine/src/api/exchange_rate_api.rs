//! The ExchangeRateApi manages the conversion rate between the quote currency and the local
//! currency that sellers actually transfer to the receiving bank account.

use std::fmt::Debug;

use log::info;

use crate::{
    api::exchange_objects::ExchangeRate,
    traits::{ExchangeRateError, ExchangeRates},
};

pub struct ExchangeRateApi<B> {
    db: B,
}

impl<B> Debug for ExchangeRateApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangeRateApi")
    }
}

impl<B> ExchangeRateApi<B>
where B: ExchangeRates
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// The current rate. A default rate row is created on first read, so this always succeeds
    /// on a healthy database.
    pub async fn fetch_or_default(&self) -> Result<ExchangeRate, ExchangeRateError> {
        self.db.fetch_or_default().await
    }

    /// Replaces the rate. Admin only; the rate must be positive.
    pub async fn set_rate(&self, rate: i64) -> Result<ExchangeRate, ExchangeRateError> {
        if rate <= 0 {
            return Err(ExchangeRateError::InvalidRate(rate));
        }
        let rate = self.db.set_rate(rate).await?;
        info!("💱️ Exchange rate updated: {rate}");
        Ok(rate)
    }
}
