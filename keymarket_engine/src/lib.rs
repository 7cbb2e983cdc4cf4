//! KeyMarket Engine
//!
//! The KeyMarket Engine is the monetary core of a digital-goods reseller marketplace: sellers
//! pre-fund a wallet, redeem single-use keys against it, and top the wallet up via bank
//! transfers that are reconciled in the background. This library contains that core logic and
//! is storefront-agnostic.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). You should never need to access the
//!    database directly; use the public API instead. The exception is the data types used in
//!    the database, which are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@api`]). This provides the public-facing functionality:
//!    purchases, top-up invoices, reconciliation, accounts, pricing and exchange rates.
//!    Backends implement the traits in [`mod@traits`] in order to serve these APIs.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted
//! when certain actions occur, e.g. an `OrderCreated` event after every successful purchase. A
//! simple actor framework lets you hook into these events and perform custom actions.
pub mod api;
pub mod db_types;
pub mod events;
pub mod helpers;
mod reconciliation_worker;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    accounts_api::AccountApi,
    exchange_rate_api::ExchangeRateApi,
    order_objects,
    payment_objects,
    pricing_api::PricingApi,
    purchase_api::PurchaseApi,
    topup_api::TopUpApi,
};
pub use reconciliation_worker::{run_reconciliation_worker, DEFAULT_RECONCILIATION_PERIOD};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AccountManagement,
    BankAccountManagement,
    BankFeed,
    ExchangeRates,
    MarketGatewayDatabase,
    MarketGatewayError,
    PricingManagement,
};
