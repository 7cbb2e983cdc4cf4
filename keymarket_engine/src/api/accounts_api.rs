//! Unified API for accessing accounts and their histories.

use std::fmt::Debug;

use log::*;

use crate::{
    api::{order_objects::{OrderQueryFilter, OrderResult}, payment_objects::PaymentsResult},
    db_types::{NewSellerAccount, Order, Payment, Product, SellerAccount},
    traits::{AccountApiError, AccountManagement, MarketGatewayDatabase, MarketGatewayError},
};

/// The `AccountApi` provides a unified API for accessing accounts, order histories and payment
/// histories. The admin account operations (creation, lock/unlock) are available when the
/// backend supports writes.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Fetches the account for the given id. If no account exists, `None` is returned.
    pub async fn account_by_id(&self, account_id: i64) -> Result<Option<SellerAccount>, AccountApiError> {
        self.db.fetch_account(account_id).await
    }

    pub async fn product_by_id(&self, product_id: i64) -> Result<Option<Product>, AccountApiError> {
        self.db.fetch_product(product_id).await
    }

    pub async fn order_by_id(&self, order_id: i64) -> Result<Option<Order>, AccountApiError> {
        self.db.fetch_order_by_id(order_id).await
    }

    /// Fetches all orders for the given seller, wrapped in an [`OrderResult`] with the sum of
    /// the prices paid.
    pub async fn orders_for_seller(&self, seller_id: i64) -> Result<OrderResult, AccountApiError> {
        let query = OrderQueryFilter::default().with_seller_id(seller_id);
        let orders = self.db.search_orders(query).await?;
        let total_spent = orders.iter().map(|o| o.price).sum();
        Ok(OrderResult { seller_id, total_spent, orders })
    }

    /// Fetches all payments for the given seller, wrapped in a [`PaymentsResult`] with
    /// completed and pending totals.
    pub async fn payments_for_seller(&self, seller_id: i64) -> Result<PaymentsResult, AccountApiError> {
        let payments = self.db.fetch_payments_for_seller(seller_id).await?;
        trace!("Fetched {} payments for seller #{seller_id}", payments.len());
        Ok(PaymentsResult::new(seller_id, payments))
    }

    pub async fn pending_topups_for_seller(&self, seller_id: i64) -> Result<Vec<Payment>, AccountApiError> {
        self.db.fetch_pending_topups_for_seller(seller_id).await
    }

    pub async fn payment_by_ref(&self, transfer_ref: &str) -> Result<Option<Payment>, AccountApiError> {
        self.db.fetch_payment_by_ref(transfer_ref).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError> {
        self.db.search_orders(query).await
    }
}

impl<B> AccountApi<B>
where B: MarketGatewayDatabase
{
    /// Creates a new marketplace account with a zero wallet balance.
    pub async fn create_account(&self, account: NewSellerAccount) -> Result<SellerAccount, MarketGatewayError> {
        let account = self.db.create_account(account).await?;
        debug!("🧑️ Account #{} ({}) created as {}", account.id, account.name, account.role);
        Ok(account)
    }

    /// Locks or unlocks an account. Locked sellers can neither purchase nor request top-ups.
    pub async fn set_account_lock(
        &self,
        account_id: i64,
        locked: bool,
    ) -> Result<SellerAccount, MarketGatewayError> {
        let account = self.db.set_account_lock(account_id, locked).await?;
        info!("🧑️ Account #{account_id} is now {}", if account.locked { "locked" } else { "unlocked" });
        Ok(account)
    }
}
