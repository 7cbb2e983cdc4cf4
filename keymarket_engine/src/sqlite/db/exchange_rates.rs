use sqlx::SqliteConnection;

use crate::{
    api::exchange_objects::{ExchangeRate, DEFAULT_EXCHANGE_RATE},
    traits::ExchangeRateError,
};

/// Fetches the singleton rate, creating the default row on first read. The upsert keeps the
/// create-on-first-read free of find-then-insert races.
pub async fn fetch_or_default(conn: &mut SqliteConnection) -> Result<ExchangeRate, ExchangeRateError> {
    sqlx::query("INSERT INTO exchange_rate (id, rate) VALUES (1, $1) ON CONFLICT (id) DO NOTHING")
        .bind(DEFAULT_EXCHANGE_RATE)
        .execute(&mut *conn)
        .await?;
    let rate = sqlx::query_as("SELECT rate, updated_at FROM exchange_rate WHERE id = 1").fetch_one(conn).await?;
    Ok(rate)
}

pub async fn set_rate(rate: i64, conn: &mut SqliteConnection) -> Result<ExchangeRate, ExchangeRateError> {
    if rate <= 0 {
        return Err(ExchangeRateError::InvalidRate(rate));
    }
    let rate = sqlx::query_as(
        r#"
            INSERT INTO exchange_rate (id, rate) VALUES (1, $1)
            ON CONFLICT (id) DO UPDATE SET rate = excluded.rate, updated_at = CURRENT_TIMESTAMP
            RETURNING rate, updated_at;
        "#,
    )
    .bind(rate)
    .fetch_one(conn)
    .await?;
    Ok(rate)
}
