use km_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{Payment, PaymentStatus};

/// A seller's payment history with completed and pending totals broken out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsResult {
    pub seller_id: i64,
    pub total_completed: Money,
    pub total_pending: Money,
    pub payments: Vec<Payment>,
}

impl PaymentsResult {
    pub fn new(seller_id: i64, payments: Vec<Payment>) -> Self {
        let total_completed =
            payments.iter().filter(|p| p.status == PaymentStatus::Completed).map(|p| p.amount).sum();
        let total_pending = payments.iter().filter(|p| p.status == PaymentStatus::Pending).map(|p| p.amount).sum();
        Self { seller_id, total_completed, total_pending, payments }
    }
}
