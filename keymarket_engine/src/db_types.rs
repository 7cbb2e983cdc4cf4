use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use km_common::{Money, Secret};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

//--------------------------------------        Role        ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
pub enum Role {
    /// A reseller account with a prepaid wallet.
    Seller,
    /// An operator account. Admins manage catalog, pricing and wallet credits, but do not buy keys.
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Seller => write!(f, "Seller"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Seller" => Ok(Self::Seller),
            "Admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid role: {value}. But this conversion cannot fail. Defaulting to Seller");
            Role::Seller
        })
    }
}

//--------------------------------------    SellerAccount    ---------------------------------------------------------
/// A marketplace account. The wallet balance is only ever mutated through the purchase and
/// top-up flows, and is non-negative by construction.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SellerAccount {
    pub id: i64,
    pub name: String,
    pub role: Role,
    pub balance: Money,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SellerAccount {
    pub fn is_seller(&self) -> bool {
        matches!(self.role, Role::Seller)
    }
}

#[derive(Debug, Clone)]
pub struct NewSellerAccount {
    pub name: String,
    pub role: Role,
}

impl NewSellerAccount {
    pub fn seller<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), role: Role::Seller }
    }

    pub fn admin<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), role: Role::Admin }
    }
}

//--------------------------------------       Product       ---------------------------------------------------------
/// A catalog product. `total_available` is an aggregate that always equals the sum of
/// `qty_available` over the product's inventory units.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub base_price: Money,
    pub total_available: i64,
    pub total_sold: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub base_price: Money,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, base_price: Money) -> Self {
        Self { name: name.into(), category: String::new(), base_price }
    }

    pub fn with_category<S: Into<String>>(mut self, category: S) -> Self {
        self.category = category.into();
        self
    }
}

//--------------------------------------    InventoryUnit    ---------------------------------------------------------
/// One stocked key. `value` is the redeemable secret handed to the buyer. Units are consumed
/// oldest-first and the row is deleted once `qty_available` reaches zero.
#[derive(Debug, Clone)]
pub struct InventoryUnit {
    pub id: i64,
    pub product_id: i64,
    pub value: String,
    pub qty_available: i64,
    pub qty_sold: i64,
    pub buyers: Vec<i64>,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::sqlite::SqliteRow> for InventoryUnit {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        let buyers: String = row.try_get("buyers")?;
        let buyers = serde_json::from_str(&buyers).map_err(|e| sqlx::Error::ColumnDecode {
            index: "buyers".to_string(),
            source: Box::new(e),
        })?;
        Ok(Self {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            value: row.try_get("value")?,
            qty_available: row.try_get("qty_available")?,
            qty_sold: row.try_get("qty_sold")?,
            buyers,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewInventoryUnit {
    pub value: String,
    pub quantity: i64,
}

impl NewInventoryUnit {
    /// The common case: one key, redeemable once.
    pub fn single<S: Into<String>>(value: S) -> Self {
        Self { value: value.into(), quantity: 1 }
    }

    pub fn with_quantity<S: Into<String>>(value: S, quantity: i64) -> Self {
        Self { value: value.into(), quantity }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
/// An immutable record of a successful purchase. Product name, redeemed key and price are
/// snapshots taken at purchase time; later catalog edits never affect historical orders.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub seller_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub redeemed_value: String,
    pub price: Money,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    PaymentStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// The invoice has been issued and is waiting for a matching bank transfer.
    Pending,
    /// A matching bank transfer was found and the wallet has been credited. Terminal.
    Completed,
    /// The invoice lapsed without a matching transfer. Terminal.
    Expired,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Completed => write!(f, "Completed"),
            PaymentStatus::Expired => write!(f, "Expired"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Expired" => Ok(Self::Expired),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------
/// A wallet top-up invoice. `amount` is the quote-currency value credited to the wallet on
/// completion; `local_amount` is what the seller actually transfers to the bank account.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub seller_id: i64,
    pub amount: Money,
    pub local_amount: i64,
    pub transfer_ref: String,
    /// The destination bank account. `None` for manual credits, which never touch a bank.
    pub bank_account_id: Option<i64>,
    pub status: PaymentStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTopUp {
    pub seller_id: i64,
    pub amount: Money,
    pub note: Option<String>,
}

impl NewTopUp {
    pub fn new(seller_id: i64, amount: Money) -> Self {
        Self { seller_id, amount, note: None }
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }
}

//--------------------------------------     BankAccount     ---------------------------------------------------------
/// A receiving bank account for top-up transfers. Admin-managed; the issuer picks the most
/// recently activated account among those flagged active.
#[derive(Debug, Clone)]
pub struct BankAccount {
    pub id: i64,
    pub bank_name: String,
    pub account_name: String,
    pub account_number: Secret<String>,
    pub is_active: bool,
    pub activated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::sqlite::SqliteRow> for BankAccount {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        let account_number: String = row.try_get("account_number")?;
        Ok(Self {
            id: row.try_get("id")?,
            bank_name: row.try_get("bank_name")?,
            account_name: row.try_get("account_name")?,
            account_number: Secret::new(account_number),
            is_active: row.try_get("is_active")?,
            activated_at: row.try_get("activated_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl Display for BankAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {} ({})", self.bank_name, self.account_name, self.account_number.masked_tail())
    }
}

#[derive(Debug, Clone)]
pub struct NewBankAccount {
    pub bank_name: String,
    pub account_name: String,
    pub account_number: Secret<String>,
}

impl NewBankAccount {
    pub fn new<S1, S2, S3>(bank_name: S1, account_name: S2, account_number: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            bank_name: bank_name.into(),
            account_name: account_name.into(),
            account_number: Secret::new(account_number.into()),
        }
    }
}

//--------------------------------------    PriceOverride    ---------------------------------------------------------
/// A seller-specific price that supersedes the product's base price. Unique per (seller, product).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PriceOverride {
    pub id: i64,
    pub seller_id: i64,
    pub product_id: i64,
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
