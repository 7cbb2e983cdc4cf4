use std::fmt::Display;

use km_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// The outcome of a successful purchase: the immutable order record plus the wallet balance
/// after the debit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub order: Order,
    pub new_balance: Money,
}

/// Counters from one reconciliation pass, for observability.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Pending payments that were eligible for matching this pass.
    pub checked: usize,
    /// Payments settled and credited this pass.
    pub completed: usize,
    /// Stale payments moved to `Expired` this pass.
    pub expired: usize,
}

impl Display for ReconciliationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} checked, {} completed, {} expired", self.checked, self.completed, self.expired)
    }
}
