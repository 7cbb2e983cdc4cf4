use km_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Payment};

/// Emitted after a purchase commits. Carries the immutable order and the seller's balance
/// after the debit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
    pub new_balance: Money,
}

impl OrderCreatedEvent {
    pub fn new(order: Order, new_balance: Money) -> Self {
        Self { order, new_balance }
    }
}

/// Emitted after a top-up settles and the wallet credit commits, whether via reconciliation or
/// the admin manual-credit path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopUpCompletedEvent {
    pub payment: Payment,
}

impl TopUpCompletedEvent {
    pub fn new(payment: Payment) -> Self {
        Self { payment }
    }
}
