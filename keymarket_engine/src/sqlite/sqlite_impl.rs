//! `SqliteDatabase` is a concrete implementation of a KeyMarket engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`crate::traits`] module. The correctness-critical flows (purchase, settlement, manual
//! credit) each run inside a single sqlx transaction, so every failure path rolls back cleanly.
use std::fmt::Debug;

use chrono::Utc;
use km_common::Money;
use log::*;
use sqlx::SqlitePool;

use super::db::{accounts, bank_accounts, db_url, exchange_rates, new_pool, orders, payments, price_overrides, products, refs};
use crate::{
    api::{exchange_objects::ExchangeRate, order_objects::OrderQueryFilter},
    db_types::{
        BankAccount,
        InventoryUnit,
        NewBankAccount,
        NewInventoryUnit,
        NewProduct,
        NewSellerAccount,
        NewTopUp,
        Order,
        Payment,
        PriceOverride,
        Product,
        SellerAccount,
    },
    traits::{
        AccountApiError,
        AccountManagement,
        BankAccountManagement,
        ExchangeRateError,
        ExchangeRates,
        MarketGatewayDatabase,
        MarketGatewayError,
        PricingManagement,
        PurchaseReceipt,
        MAX_PENDING_TOPUPS,
        TOPUP_RATE_LIMIT_SECS,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl MarketGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_account(&self, account: NewSellerAccount) -> Result<SellerAccount, MarketGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let account = accounts::insert_account(account, &mut conn).await?;
        debug!("🗃️ Account #{} ({}) has been saved in the DB", account.id, account.name);
        Ok(account)
    }

    async fn set_account_lock(&self, account_id: i64, locked: bool) -> Result<SellerAccount, MarketGatewayError> {
        let mut conn = self.pool.acquire().await?;
        accounts::set_lock(account_id, locked, &mut conn).await
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, MarketGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        debug!("🗃️ Product #{} ({}) has been saved in the DB", product.id, product.name);
        Ok(product)
    }

    async fn add_inventory(
        &self,
        product_id: i64,
        units: &[NewInventoryUnit],
    ) -> Result<Product, MarketGatewayError> {
        let mut tx = self.pool.begin().await?;
        products::fetch_product(product_id, &mut tx)
            .await?
            .ok_or(MarketGatewayError::ProductNotFound(product_id))?;
        let product = products::add_inventory(product_id, units, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// The purchase path. Every step shares one transaction; an early return on any check or
    /// failure rolls back whatever came before it, so a consumed unit with an untouched wallet
    /// (or the reverse) cannot be observed.
    async fn process_purchase(&self, seller_id: i64, product_id: i64) -> Result<PurchaseReceipt, MarketGatewayError> {
        let mut tx = self.pool.begin().await?;
        let seller = accounts::fetch_account(seller_id, &mut tx)
            .await?
            .ok_or(MarketGatewayError::AccountNotFound(seller_id))?;
        if seller.locked {
            return Err(MarketGatewayError::AccountLocked(seller_id));
        }
        if !seller.is_seller() {
            return Err(MarketGatewayError::NotASeller(seller_id));
        }
        let product = products::fetch_product(product_id, &mut tx)
            .await?
            .ok_or(MarketGatewayError::ProductNotFound(product_id))?;
        let price = price_overrides::resolve_price(seller_id, product_id, product.base_price, &mut tx).await?;
        if seller.balance < price {
            return Err(MarketGatewayError::InsufficientBalance { required: price, available: seller.balance });
        }
        let redeemed_value = products::allocate_unit(product_id, seller_id, &mut tx).await?;
        let new_balance = accounts::debit_balance(seller_id, price, &mut tx).await?;
        let order = orders::insert_order(seller_id, product_id, &product.name, &redeemed_value, price, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{} recorded: seller #{seller_id} paid {price} for product #{product_id}", order.id);
        Ok(PurchaseReceipt { order, new_balance })
    }

    /// Issues a pending top-up. All business-rule checks run inside the transaction that
    /// inserts the payment, so two racing requests cannot both slip under the pending cap.
    async fn issue_topup(&self, topup: NewTopUp) -> Result<Payment, MarketGatewayError> {
        if !topup.amount.is_positive() {
            return Err(MarketGatewayError::InvalidAmount(topup.amount));
        }
        let seller_id = topup.seller_id;
        let mut tx = self.pool.begin().await?;
        let seller = accounts::fetch_account(seller_id, &mut tx)
            .await?
            .ok_or(MarketGatewayError::AccountNotFound(seller_id))?;
        if seller.locked {
            return Err(MarketGatewayError::AccountLocked(seller_id));
        }
        if !seller.is_seller() {
            return Err(MarketGatewayError::NotASeller(seller_id));
        }
        let pending = payments::count_pending_for_seller(seller_id, &mut tx).await? as usize;
        if pending >= MAX_PENDING_TOPUPS {
            return Err(MarketGatewayError::TooManyPending(pending));
        }
        if let Some(last) = payments::last_pending_created_at(seller_id, &mut tx).await? {
            let elapsed = (Utc::now() - last).num_seconds();
            if elapsed < TOPUP_RATE_LIMIT_SECS {
                return Err(MarketGatewayError::RateLimited(TOPUP_RATE_LIMIT_SECS - elapsed));
            }
        }
        let bank_account =
            bank_accounts::fetch_active(&mut tx).await?.ok_or(MarketGatewayError::NoActiveBankAccount)?;
        let rate = exchange_rates::fetch_or_default(&mut tx).await?;
        let local_amount = rate.local_value(topup.amount);
        let transfer_ref = refs::next_reference(&mut tx).await?;
        let payment = payments::insert_pending(
            seller_id,
            topup.amount,
            local_amount,
            &transfer_ref,
            bank_account.id,
            topup.note.as_deref(),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        debug!("🗃️ Top-up [{transfer_ref}] saved for seller #{seller_id}, destination {bank_account}");
        Ok(payment)
    }

    async fn manual_credit(
        &self,
        seller_id: i64,
        amount: Money,
        reason: &str,
    ) -> Result<Payment, MarketGatewayError> {
        if !amount.is_positive() {
            return Err(MarketGatewayError::InvalidAmount(amount));
        }
        let mut tx = self.pool.begin().await?;
        accounts::fetch_account(seller_id, &mut tx)
            .await?
            .ok_or(MarketGatewayError::AccountNotFound(seller_id))?;
        let rate = exchange_rates::fetch_or_default(&mut tx).await?;
        let local_amount = rate.local_value(amount);
        let transfer_ref = refs::next_reference(&mut tx).await?;
        let payment =
            payments::insert_completed(seller_id, amount, local_amount, &transfer_ref, reason, &mut tx).await?;
        accounts::credit_balance(seller_id, amount, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Manual credit [{transfer_ref}] of {amount} saved for seller #{seller_id}");
        Ok(payment)
    }

    /// Settlement is a check-and-set on `Pending` plus the wallet credit, in one transaction.
    /// A payment that is already terminal leaves the wallet untouched and returns `None`.
    async fn settle_topup(&self, transfer_ref: &str) -> Result<Option<Payment>, MarketGatewayError> {
        let mut tx = self.pool.begin().await?;
        match payments::settle(transfer_ref, &mut tx).await? {
            Some(payment) => {
                accounts::credit_balance(payment.seller_id, payment.amount, &mut tx).await?;
                tx.commit().await?;
                debug!("🗃️ Payment [{transfer_ref}] is now Completed. Balances have been updated.");
                Ok(Some(payment))
            },
            None => match payments::fetch_by_ref(transfer_ref, &mut tx).await? {
                Some(payment) => {
                    trace!("🗃️ Payment [{transfer_ref}] is already {}. No action to take", payment.status);
                    Ok(None)
                },
                None => Err(MarketGatewayError::PaymentNotFound(transfer_ref.to_string())),
            },
        }
    }

    async fn expire_stale_topups(&self) -> Result<Vec<Payment>, MarketGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let expired = payments::expire_stale(&mut conn).await?;
        if !expired.is_empty() {
            debug!("🗃️ {} stale top-ups moved to Expired", expired.len());
        }
        Ok(expired)
    }

    async fn close(&mut self) -> Result<(), MarketGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_account(&self, account_id: i64) -> Result<Option<SellerAccount>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_account(account_id, &mut conn).await
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_product(product_id, &mut conn).await
    }

    async fn fetch_inventory(&self, product_id: i64) -> Result<Vec<InventoryUnit>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_inventory(product_id, &mut conn).await
    }

    async fn fetch_order_by_id(&self, order_id: i64) -> Result<Option<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        orders::search_orders(query, &mut conn).await
    }

    async fn fetch_payments_for_seller(&self, seller_id: i64) -> Result<Vec<Payment>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::fetch_for_seller(seller_id, &mut conn).await?;
        Ok(payments)
    }

    async fn fetch_payment_by_ref(&self, transfer_ref: &str) -> Result<Option<Payment>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_by_ref(transfer_ref, &mut conn).await
    }

    async fn fetch_pending_topups_for_seller(&self, seller_id: i64) -> Result<Vec<Payment>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::pending_for_seller(seller_id, &mut conn).await?;
        Ok(payments)
    }

    async fn fetch_pending_topups(&self) -> Result<Vec<Payment>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let payments = payments::all_pending(&mut conn).await?;
        Ok(payments)
    }
}

impl BankAccountManagement for SqliteDatabase {
    async fn add_bank_account(&self, account: NewBankAccount) -> Result<BankAccount, MarketGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let account = bank_accounts::insert_bank_account(account, &mut conn).await?;
        debug!("🗃️ Bank account #{} ({account}) has been saved in the DB", account.id);
        Ok(account)
    }

    async fn set_bank_account_active(
        &self,
        account_id: i64,
        active: bool,
    ) -> Result<BankAccount, MarketGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let account = bank_accounts::set_active(account_id, active, &mut conn).await?;
        debug!("🗃️ Bank account #{account_id} is now {}", if account.is_active { "active" } else { "inactive" });
        Ok(account)
    }

    async fn fetch_bank_account(&self, account_id: i64) -> Result<Option<BankAccount>, MarketGatewayError> {
        let mut conn = self.pool.acquire().await?;
        bank_accounts::fetch_bank_account(account_id, &mut conn).await
    }

    async fn fetch_bank_accounts(&self) -> Result<Vec<BankAccount>, MarketGatewayError> {
        let mut conn = self.pool.acquire().await?;
        bank_accounts::fetch_all(&mut conn).await
    }

    async fn fetch_active_bank_account(&self) -> Result<Option<BankAccount>, MarketGatewayError> {
        let mut conn = self.pool.acquire().await?;
        bank_accounts::fetch_active(&mut conn).await
    }
}

impl PricingManagement for SqliteDatabase {
    async fn set_price_override(
        &self,
        seller_id: i64,
        product_id: i64,
        price: Money,
    ) -> Result<PriceOverride, MarketGatewayError> {
        let mut tx = self.pool.begin().await?;
        accounts::fetch_account(seller_id, &mut tx)
            .await?
            .ok_or(MarketGatewayError::AccountNotFound(seller_id))?;
        products::fetch_product(product_id, &mut tx)
            .await?
            .ok_or(MarketGatewayError::ProductNotFound(product_id))?;
        let over = price_overrides::upsert(seller_id, product_id, price, &mut tx).await?;
        tx.commit().await?;
        Ok(over)
    }

    async fn remove_price_override(&self, seller_id: i64, product_id: i64) -> Result<bool, MarketGatewayError> {
        let mut conn = self.pool.acquire().await?;
        price_overrides::delete(seller_id, product_id, &mut conn).await
    }

    async fn fetch_price_override(
        &self,
        seller_id: i64,
        product_id: i64,
    ) -> Result<Option<PriceOverride>, MarketGatewayError> {
        let mut conn = self.pool.acquire().await?;
        price_overrides::fetch(seller_id, product_id, &mut conn).await
    }

    async fn resolve_price(&self, seller_id: i64, product_id: i64) -> Result<Money, MarketGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_id, &mut conn)
            .await?
            .ok_or(MarketGatewayError::ProductNotFound(product_id))?;
        price_overrides::resolve_price(seller_id, product_id, product.base_price, &mut conn).await
    }
}

impl ExchangeRates for SqliteDatabase {
    async fn fetch_or_default(&self) -> Result<ExchangeRate, ExchangeRateError> {
        let mut conn = self.pool.acquire().await.map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?;
        exchange_rates::fetch_or_default(&mut conn).await
    }

    async fn set_rate(&self, rate: i64) -> Result<ExchangeRate, ExchangeRateError> {
        let mut conn = self.pool.acquire().await.map_err(|e| ExchangeRateError::DatabaseError(e.to_string()))?;
        exchange_rates::set_rate(rate, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
