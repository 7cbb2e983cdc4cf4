use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::BankAccount;

/// One transaction observed on a receiving bank account. `memo` is the free-text transfer
/// description the payer typed; the transfer reference is matched out of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankTransaction {
    /// The transferred amount, in local currency units.
    pub amount: i64,
    pub memo: String,
    pub posted_at: DateTime<Utc>,
}

impl BankTransaction {
    /// Whether this transaction settles a payment with the given reference and local amount.
    /// Both the reference and the amount must match before any wallet is credited.
    pub fn matches(&self, transfer_ref: &str, local_amount: i64) -> bool {
        self.amount == local_amount && self.memo.contains(transfer_ref)
    }
}

/// The external bank-transaction source polled by the reconciliation worker. Implementations
/// live outside this crate (a bank API client in production, a canned feed in tests).
#[allow(async_fn_in_trait)]
pub trait BankFeed {
    /// Recent transactions received on the given account. How far back "recent" reaches is the
    /// implementation's concern; it must cover at least one expiry window.
    async fn fetch_transactions(&self, account: &BankAccount) -> Result<Vec<BankTransaction>, BankFeedError>;
}

#[derive(Debug, Clone, Error)]
pub enum BankFeedError {
    #[error("Bank feed unreachable: {0}")]
    Unreachable(String),
    #[error("Bank feed returned a malformed response: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;

    #[test]
    fn matching_requires_reference_and_amount() {
        let tx = BankTransaction { amount: 250_000, memo: "chuyen tien KM-000000000191".to_string(), posted_at: Utc::now() };
        assert!(tx.matches("KM-000000000191", 250_000));
        // right reference, wrong amount
        assert!(!tx.matches("KM-000000000191", 250_001));
        // right amount, reference absent from the memo
        assert!(!tx.matches("KM-000000000272", 250_000));
    }
}
