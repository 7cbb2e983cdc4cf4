use km_common::Money;
use sqlx::SqliteConnection;

use crate::{db_types::PriceOverride, traits::MarketGatewayError};

/// Creates or replaces the override for the pair. Idempotent thanks to the uniqueness
/// constraint on (seller_id, product_id).
pub async fn upsert(
    seller_id: i64,
    product_id: i64,
    price: Money,
    conn: &mut SqliteConnection,
) -> Result<PriceOverride, MarketGatewayError> {
    let over = sqlx::query_as(
        r#"
            INSERT INTO price_overrides (seller_id, product_id, price) VALUES ($1, $2, $3)
            ON CONFLICT (seller_id, product_id)
            DO UPDATE SET price = excluded.price, updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(seller_id)
    .bind(product_id)
    .bind(price)
    .fetch_one(conn)
    .await?;
    Ok(over)
}

pub async fn delete(
    seller_id: i64,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketGatewayError> {
    let result = sqlx::query("DELETE FROM price_overrides WHERE seller_id = $1 AND product_id = $2")
        .bind(seller_id)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch(
    seller_id: i64,
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<PriceOverride>, MarketGatewayError> {
    let over = sqlx::query_as("SELECT * FROM price_overrides WHERE seller_id = $1 AND product_id = $2")
        .bind(seller_id)
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(over)
}

/// The effective unit price for the pair: a positive override if present, else the product's
/// base price. A missing override is the normal case, not an error.
pub async fn resolve_price(
    seller_id: i64,
    product_id: i64,
    base_price: Money,
    conn: &mut SqliteConnection,
) -> Result<Money, MarketGatewayError> {
    let over = fetch(seller_id, product_id, conn).await?;
    let price = match over {
        Some(over) if over.price.is_positive() => over.price,
        _ => base_price,
    };
    Ok(price)
}
