use chrono::{DateTime, Duration, Utc};
use km_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::Payment,
    traits::{AccountApiError, MarketGatewayError, TOPUP_EXPIRY_SECS},
};

/// Inserts a new pending top-up invoice. The uniqueness constraint on `transfer_ref` backstops
/// the sequence-based allocator.
pub async fn insert_pending(
    seller_id: i64,
    amount: Money,
    local_amount: i64,
    transfer_ref: &str,
    bank_account_id: i64,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<Payment, MarketGatewayError> {
    let expires_at = Utc::now() + Duration::seconds(TOPUP_EXPIRY_SECS);
    let payment = sqlx::query_as(
        r#"
            INSERT INTO payments (seller_id, amount, local_amount, transfer_ref, bank_account_id, expires_at, note)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(seller_id)
    .bind(amount)
    .bind(local_amount)
    .bind(transfer_ref)
    .bind(bank_account_id)
    .bind(expires_at)
    .bind(note)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            MarketGatewayError::PaymentAlreadyExists(transfer_ref.to_string())
        },
        _ => MarketGatewayError::from(e),
    })?;
    Ok(payment)
}

/// Inserts an already-completed payment for the admin manual-credit path. The caller credits
/// the wallet in the same transaction.
pub async fn insert_completed(
    seller_id: i64,
    amount: Money,
    local_amount: i64,
    transfer_ref: &str,
    note: &str,
    conn: &mut SqliteConnection,
) -> Result<Payment, MarketGatewayError> {
    let payment = sqlx::query_as(
        r#"
            INSERT INTO payments
                (seller_id, amount, local_amount, transfer_ref, status, completed_at, expires_at, note)
            VALUES ($1, $2, $3, $4, 'Completed', CURRENT_TIMESTAMP, CURRENT_TIMESTAMP, $5)
            RETURNING *;
        "#,
    )
    .bind(seller_id)
    .bind(amount)
    .bind(local_amount)
    .bind(transfer_ref)
    .bind(note)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            MarketGatewayError::PaymentAlreadyExists(transfer_ref.to_string())
        },
        _ => MarketGatewayError::from(e),
    })?;
    Ok(payment)
}

pub async fn fetch_by_ref(
    transfer_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, AccountApiError> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE transfer_ref = $1")
        .bind(transfer_ref)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_for_seller(seller_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE seller_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(seller_id)
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

pub async fn pending_for_seller(
    seller_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as(
        "SELECT * FROM payments WHERE seller_id = $1 AND status = 'Pending' ORDER BY created_at ASC, id ASC",
    )
    .bind(seller_id)
    .fetch_all(conn)
    .await?;
    Ok(payments)
}

pub async fn all_pending(conn: &mut SqliteConnection) -> Result<Vec<Payment>, sqlx::Error> {
    let payments = sqlx::query_as("SELECT * FROM payments WHERE status = 'Pending' ORDER BY created_at ASC, id ASC")
        .fetch_all(conn)
        .await?;
    Ok(payments)
}

pub async fn count_pending_for_seller(seller_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM payments WHERE seller_id = $1 AND status = 'Pending'")
            .bind(seller_id)
            .fetch_one(conn)
            .await?;
    Ok(count)
}

/// When the seller last created a top-up that is still pending. The rate limiter compares this
/// against the request time.
pub async fn last_pending_created_at(
    seller_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
        "SELECT created_at FROM payments WHERE seller_id = $1 AND status = 'Pending' ORDER BY created_at DESC LIMIT 1",
    )
    .bind(seller_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|(at,)| at))
}

/// The check-and-set half of settlement: only a `Pending` payment transitions, and
/// `completed_at` is stamped in the same statement. Returns `None` when the payment is already
/// terminal (or unknown), in which case the caller must not credit anything.
pub async fn settle(transfer_ref: &str, conn: &mut SqliteConnection) -> Result<Option<Payment>, MarketGatewayError> {
    let payment = sqlx::query_as(
        r#"
            UPDATE payments SET status = 'Completed', completed_at = CURRENT_TIMESTAMP
            WHERE transfer_ref = $1 AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(transfer_ref)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Moves every lapsed pending payment to the terminal `Expired` state. Rows are retained for
/// audit.
pub async fn expire_stale(conn: &mut SqliteConnection) -> Result<Vec<Payment>, MarketGatewayError> {
    let expired = sqlx::query_as(
        r#"
            UPDATE payments SET status = 'Expired'
            WHERE status = 'Pending' AND unixepoch(expires_at) <= unixepoch(CURRENT_TIMESTAMP)
            RETURNING *;
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(expired)
}
