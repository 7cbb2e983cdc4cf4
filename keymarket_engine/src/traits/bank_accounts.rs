use crate::{
    db_types::{BankAccount, NewBankAccount},
    traits::MarketGatewayError,
};

/// Management of the receiving bank accounts that top-up transfers are sent to.
#[allow(async_fn_in_trait)]
pub trait BankAccountManagement {
    async fn add_bank_account(&self, account: NewBankAccount) -> Result<BankAccount, MarketGatewayError>;

    /// Flags an account (in)active. Activation stamps `activated_at`, which the issuer uses as
    /// the tie-break when more than one account is active.
    async fn set_bank_account_active(&self, account_id: i64, active: bool)
        -> Result<BankAccount, MarketGatewayError>;

    async fn fetch_bank_account(&self, account_id: i64) -> Result<Option<BankAccount>, MarketGatewayError>;

    async fn fetch_bank_accounts(&self) -> Result<Vec<BankAccount>, MarketGatewayError>;

    /// The account new invoices are issued against: the most recently activated of the active
    /// accounts, or `None` when none are active.
    async fn fetch_active_bank_account(&self) -> Result<Option<BankAccount>, MarketGatewayError>;
}
