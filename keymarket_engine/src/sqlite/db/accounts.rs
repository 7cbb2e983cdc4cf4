use km_common::Money;
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewSellerAccount, SellerAccount},
    traits::{AccountApiError, MarketGatewayError},
};

pub async fn insert_account(
    account: NewSellerAccount,
    conn: &mut SqliteConnection,
) -> Result<SellerAccount, MarketGatewayError> {
    let account = sqlx::query_as(
        r#"
            INSERT INTO seller_accounts (name, role) VALUES ($1, $2)
            RETURNING *;
        "#,
    )
    .bind(account.name)
    .bind(account.role.to_string())
    .fetch_one(conn)
    .await?;
    Ok(account)
}

pub async fn fetch_account(
    account_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<SellerAccount>, AccountApiError> {
    let account = sqlx::query_as("SELECT * FROM seller_accounts WHERE id = $1")
        .bind(account_id)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

pub async fn set_lock(
    account_id: i64,
    locked: bool,
    conn: &mut SqliteConnection,
) -> Result<SellerAccount, MarketGatewayError> {
    let account = sqlx::query_as(
        "UPDATE seller_accounts SET locked = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(locked)
    .bind(account_id)
    .fetch_optional(conn)
    .await?
    .ok_or(MarketGatewayError::AccountNotFound(account_id))?;
    Ok(account)
}

/// Debits the wallet. The guard in the WHERE clause means a balance that cannot cover the
/// amount matches no row, which is reported as `InsufficientBalance`; a negative balance can
/// never be written.
pub async fn debit_balance(
    account_id: i64,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<Money, MarketGatewayError> {
    let row: Option<(Money,)> = sqlx::query_as(
        r#"
            UPDATE seller_accounts SET balance = balance - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND balance >= $1
            RETURNING balance;
        "#,
    )
    .bind(amount)
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;
    match row {
        Some((balance,)) => {
            trace!("🗃️ Account #{account_id} debited {amount}. Balance is now {balance}");
            Ok(balance)
        },
        None => {
            let account =
                fetch_account(account_id, conn).await?.ok_or(MarketGatewayError::AccountNotFound(account_id))?;
            Err(MarketGatewayError::InsufficientBalance { required: amount, available: account.balance })
        },
    }
}

/// Credits the wallet unconditionally. Callers are responsible for pairing this with the
/// check-and-set settlement of the source payment in the same transaction.
pub async fn credit_balance(
    account_id: i64,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<Money, MarketGatewayError> {
    let row: Option<(Money,)> = sqlx::query_as(
        r#"
            UPDATE seller_accounts SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING balance;
        "#,
    )
    .bind(amount)
    .bind(account_id)
    .fetch_optional(conn)
    .await?;
    let (balance,) = row.ok_or(MarketGatewayError::AccountNotFound(account_id))?;
    trace!("🗃️ Account #{account_id} credited {amount}. Balance is now {balance}");
    Ok(balance)
}
