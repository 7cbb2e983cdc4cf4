//! # KeyMarket engine public API
//!
//! The `api` module exposes the programmatic API for the KeyMarket engine. The API is modular,
//! so clients can pick and choose the functionality they need, or run different parts (e.g.
//! storefront purchases and back-office admin) on different machines.
//!
//! * [`purchase_api`] executes the atomic purchase flow and owns the inventory-stocking writes.
//! * [`topup_api`] issues top-up invoices, runs reconciliation passes against a bank feed, and
//!   carries the admin manual-credit path.
//! * [`accounts_api`] provides queries over accounts, orders and payment histories, and the
//!   account admin operations.
//! * [`pricing_api`] manages seller-specific price overrides.
//! * [`exchange_rate_api`] reads and updates the quote-to-local conversion rate.
//!
//! # API usage
//!
//! The pattern for all APIs is the same: an instance is created by supplying a database backend
//! that implements the traits the API needs.
//!
//! ```rust,ignore
//! use keymarket_engine::{AccountApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/km.db", 25).await?;
//! // SqliteDatabase implements AccountManagement
//! let api = AccountApi::new(db);
//! let account = api.account_by_id(42).await?;
//! ```

pub mod accounts_api;
pub mod exchange_objects;
pub mod exchange_rate_api;
pub mod order_objects;
pub mod payment_objects;
pub mod pricing_api;
pub mod purchase_api;
pub mod topup_api;
