use km_common::Money;
use thiserror::Error;

use crate::{
    db_types::{NewInventoryUnit, NewProduct, NewSellerAccount, NewTopUp, Payment, Product, SellerAccount},
    traits::{AccountApiError, AccountManagement, ExchangeRateError, PurchaseReceipt},
};

/// A seller may hold at most this many unsettled top-up invoices at once.
pub const MAX_PENDING_TOPUPS: usize = 3;
/// Minimum gap between two top-up invoices from the same seller.
pub const TOPUP_RATE_LIMIT_SECS: i64 = 300;
/// How long a pending top-up stays matchable before the reaper expires it.
pub const TOPUP_EXPIRY_SECS: i64 = 900;

/// This trait defines the highest level of behaviour for backends supporting the KeyMarket engine.
///
/// This behaviour includes:
/// * The atomic purchase transaction (wallet debit + inventory allocation + order record).
/// * Top-up invoice issuance with its business-rule checks.
/// * The reconciliation state transitions (settle, expire) with their idempotency guarantees.
/// * Stocking inventory and the small set of account/catalog writes the core owns.
#[allow(async_fn_in_trait)]
pub trait MarketGatewayDatabase: Clone + AccountManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Creates a new marketplace account with a zero balance.
    async fn create_account(&self, account: NewSellerAccount) -> Result<SellerAccount, MarketGatewayError>;

    /// Locks or unlocks an account. Locked sellers can neither purchase nor request top-ups.
    async fn set_account_lock(&self, account_id: i64, locked: bool) -> Result<SellerAccount, MarketGatewayError>;

    /// Creates a new catalog product with no stock.
    async fn create_product(&self, product: NewProduct) -> Result<Product, MarketGatewayError>;

    /// Adds inventory units to a product and bumps the product's availability aggregate, in a
    /// single atomic transaction. Returns the updated product.
    async fn add_inventory(
        &self,
        product_id: i64,
        units: &[NewInventoryUnit],
    ) -> Result<Product, MarketGatewayError>;

    /// Executes a purchase as a single atomic transaction:
    /// * the seller and product are loaded fresh,
    /// * the seller must be an unlocked `Seller` account,
    /// * the effective unit price is resolved (override, else base price),
    /// * one inventory unit is allocated oldest-first (`OutOfStock` if none remain),
    /// * the wallet is debited (`InsufficientBalance` if it cannot cover the price),
    /// * an immutable order record snapshotting name, key and price is created.
    ///
    /// Any failure rolls the whole transaction back; there is no partial application.
    async fn process_purchase(&self, seller_id: i64, product_id: i64) -> Result<PurchaseReceipt, MarketGatewayError>;

    /// Issues a pending top-up invoice. In one atomic transaction this validates the amount,
    /// enforces the pending cap ([`MAX_PENDING_TOPUPS`]) and the rate limit
    /// ([`TOPUP_RATE_LIMIT_SECS`]), resolves the active bank account and the current exchange
    /// rate, allocates a fresh transfer reference and stores the payment in `Pending` state with
    /// `expires_at` set [`TOPUP_EXPIRY_SECS`] from now.
    async fn issue_topup(&self, topup: NewTopUp) -> Result<Payment, MarketGatewayError>;

    /// The admin shortcut that bypasses the bank entirely: stores an already-`Completed` payment
    /// (with a fresh transfer reference and no destination account) and credits the wallet, in
    /// one atomic transaction. The reason is recorded in the payment note.
    async fn manual_credit(&self, seller_id: i64, amount: Money, reason: &str)
        -> Result<Payment, MarketGatewayError>;

    /// Settles the pending payment with the given transfer reference: sets `Completed`,
    /// stamps `completed_at` and credits the seller's wallet by the quote amount, atomically.
    ///
    /// The status change is a check-and-set on `Pending`, so calling this twice for the same
    /// payment credits the wallet exactly once; the second call returns `None`. An unknown
    /// reference is reported as `PaymentNotFound`.
    async fn settle_topup(&self, transfer_ref: &str) -> Result<Option<Payment>, MarketGatewayError>;

    /// Transitions every pending payment whose `expires_at` has passed to the terminal
    /// `Expired` state. Expired payments are retained for audit, never deleted.
    /// Returns the newly expired payments.
    async fn expire_stale_topups(&self) -> Result<Vec<Payment>, MarketGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MarketGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum MarketGatewayError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("The requested account id {0} does not exist")]
    AccountNotFound(i64),
    #[error("Account #{0} is locked")]
    AccountLocked(i64),
    #[error("Account #{0} is not a seller account")]
    NotASeller(i64),
    #[error("The requested product id {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product #{0} has no inventory left")]
    OutOfStock(i64),
    #[error("Insufficient balance: {required} needed, {available} available")]
    InsufficientBalance { required: Money, available: Money },
    #[error("{0} is not a valid top-up amount")]
    InvalidAmount(Money),
    #[error("Too many unsettled top-ups: {0} already pending")]
    TooManyPending(usize),
    #[error("A top-up was requested too recently. Try again in {0}s")]
    RateLimited(i64),
    #[error("No active bank account is configured to receive transfers")]
    NoActiveBankAccount,
    #[error("Cannot insert payment, since it already exists with reference {0}")]
    PaymentAlreadyExists(String),
    #[error("The requested payment does not exist for reference {0}")]
    PaymentNotFound(String),
    #[error("The requested bank account id {0} does not exist")]
    BankAccountNotFound(i64),
    #[error("{0}")]
    AccountError(#[from] AccountApiError),
    #[error("{0}")]
    ExchangeRateError(#[from] ExchangeRateError),
}

impl From<sqlx::Error> for MarketGatewayError {
    fn from(e: sqlx::Error) -> Self {
        MarketGatewayError::DatabaseError(e.to_string())
    }
}
