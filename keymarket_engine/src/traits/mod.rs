//! #  Database management and control.
//!
//! This module defines the interface contracts that payment-engine database *backends* must
//! implement, plus the boundary trait for the external bank feed.
//!
//! ## Traits
//! * [`MarketGatewayDatabase`] defines the highest level of behaviour for backends: the atomic
//!   purchase transaction, top-up issuance, reconciliation transitions and inventory stocking.
//! * [`AccountManagement`] provides read-only queries over accounts, orders and payments.
//! * [`BankAccountManagement`] manages the set of receiving bank accounts.
//! * [`PricingManagement`] manages seller-specific price overrides.
//! * [`ExchangeRates`] reads and updates the quote-to-local conversion rate.
//! * [`BankFeed`] is the contract for the external bank-transaction source that the
//!   reconciliation worker polls. It is implemented outside this crate.
mod account_management;
mod bank_accounts;
mod bank_feed;
mod data_objects;
mod exchange_rates;
mod market_gateway_database;
mod pricing;

pub use account_management::{AccountApiError, AccountManagement};
pub use bank_accounts::BankAccountManagement;
pub use bank_feed::{BankFeed, BankFeedError, BankTransaction};
pub use data_objects::{PurchaseReceipt, ReconciliationReport};
pub use exchange_rates::{ExchangeRateError, ExchangeRates};
pub use market_gateway_database::{
    MarketGatewayDatabase,
    MarketGatewayError,
    MAX_PENDING_TOPUPS,
    TOPUP_EXPIRY_SECS,
    TOPUP_RATE_LIMIT_SECS,
};
pub use pricing::PricingManagement;
