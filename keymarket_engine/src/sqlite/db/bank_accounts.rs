use sqlx::SqliteConnection;

use crate::{
    db_types::{BankAccount, NewBankAccount},
    traits::MarketGatewayError,
};

pub async fn insert_bank_account(
    account: NewBankAccount,
    conn: &mut SqliteConnection,
) -> Result<BankAccount, MarketGatewayError> {
    let account = sqlx::query_as(
        r#"
            INSERT INTO bank_accounts (bank_name, account_name, account_number) VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(account.bank_name)
    .bind(account.account_name)
    .bind(account.account_number.reveal().as_str())
    .fetch_one(conn)
    .await?;
    Ok(account)
}

pub async fn set_active(
    account_id: i64,
    active: bool,
    conn: &mut SqliteConnection,
) -> Result<BankAccount, MarketGatewayError> {
    let account = sqlx::query_as(
        r#"
            UPDATE bank_accounts
            SET is_active = $1,
                activated_at = CASE WHEN $1 THEN CURRENT_TIMESTAMP ELSE activated_at END
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(active)
    .bind(account_id)
    .fetch_optional(conn)
    .await?
    .ok_or(MarketGatewayError::BankAccountNotFound(account_id))?;
    Ok(account)
}

pub async fn fetch_bank_account(
    account_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<BankAccount>, MarketGatewayError> {
    let account =
        sqlx::query_as("SELECT * FROM bank_accounts WHERE id = $1").bind(account_id).fetch_optional(conn).await?;
    Ok(account)
}

pub async fn fetch_all(conn: &mut SqliteConnection) -> Result<Vec<BankAccount>, MarketGatewayError> {
    let accounts = sqlx::query_as("SELECT * FROM bank_accounts ORDER BY id ASC").fetch_all(conn).await?;
    Ok(accounts)
}

/// The account new invoices are issued against. The `activated_at DESC` ordering is the
/// tie-break when an admin has left more than one account active.
pub async fn fetch_active(conn: &mut SqliteConnection) -> Result<Option<BankAccount>, MarketGatewayError> {
    let account = sqlx::query_as(
        "SELECT * FROM bank_accounts WHERE is_active = 1 ORDER BY activated_at DESC, id DESC LIMIT 1",
    )
    .fetch_optional(conn)
    .await?;
    Ok(account)
}
