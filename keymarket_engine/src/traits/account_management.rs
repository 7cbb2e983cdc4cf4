use thiserror::Error;

use crate::{
    api::order_objects::OrderQueryFilter,
    db_types::{InventoryUnit, Order, Payment, Product, SellerAccount},
};

/// Read-only queries over accounts, catalog, orders and payments. All mutation goes through
/// [`crate::traits::MarketGatewayDatabase`].
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Fetches the account with the given id, or `None` if it does not exist.
    async fn fetch_account(&self, account_id: i64) -> Result<Option<SellerAccount>, AccountApiError>;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, AccountApiError>;

    /// The product's remaining inventory units, oldest first.
    async fn fetch_inventory(&self, product_id: i64) -> Result<Vec<InventoryUnit>, AccountApiError>;

    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, AccountApiError>;

    /// Fetches orders according to the criteria in the filter, ordered by creation time.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError>;

    /// Every payment ever recorded for the seller, newest first.
    async fn fetch_payments_for_seller(&self, seller_id: i64) -> Result<Vec<Payment>, AccountApiError>;

    async fn fetch_payment_by_ref(&self, transfer_ref: &str) -> Result<Option<Payment>, AccountApiError>;

    /// The seller's unsettled top-up invoices, oldest first.
    async fn fetch_pending_topups_for_seller(&self, seller_id: i64) -> Result<Vec<Payment>, AccountApiError>;

    /// All unsettled top-up invoices across sellers, oldest first. The reconciliation worker's
    /// work list.
    async fn fetch_pending_topups(&self) -> Result<Vec<Payment>, AccountApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        AccountApiError::DatabaseError(e.to_string())
    }
}
