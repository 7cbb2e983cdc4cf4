//! Tests for top-up invoice issuance and the admin manual-credit path.

use chrono::{Duration, Utc};
use km_common::Money;
use keymarket_engine::{
    db_types::{NewBankAccount, NewSellerAccount, NewTopUp, PaymentStatus},
    events::EventProducers,
    helpers::is_valid_reference,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    AccountApi,
    BankAccountManagement,
    ExchangeRateApi,
    MarketGatewayError,
    SqliteDatabase,
    TopUpApi,
};

async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

async fn seed_seller(db: &SqliteDatabase, name: &str) -> i64 {
    AccountApi::new(db.clone()).create_account(NewSellerAccount::seller(name)).await.unwrap().id
}

async fn seed_active_bank_account(db: &SqliteDatabase) -> i64 {
    let account = db.add_bank_account(NewBankAccount::new("ACME Bank", "KeyMarket Ltd", "0011223344")).await.unwrap();
    db.set_bank_account_active(account.id, true).await.unwrap();
    account.id
}

/// Pushes a pending payment's creation time out of the rate-limit window.
async fn age_pending_payment(db: &SqliteDatabase, transfer_ref: &str, minutes: i64) {
    sqlx::query("UPDATE payments SET created_at = datetime('now', printf('-%d minutes', $1)) WHERE transfer_ref = $2")
        .bind(minutes)
        .bind(transfer_ref)
        .execute(db.pool())
        .await
        .unwrap();
}

#[tokio::test]
async fn issued_invoice_carries_local_amount_reference_and_expiry() {
    let db = new_test_db().await;
    let seller_id = seed_seller(&db, "reseller-1").await;
    let bank_id = seed_active_bank_account(&db).await;
    ExchangeRateApi::new(db.clone()).set_rate(25_000).await.unwrap();

    let api = TopUpApi::new(db.clone(), EventProducers::default());
    let payment = api.issue_topup(NewTopUp::new(seller_id, Money::from_dollars(10))).await.unwrap();

    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, Money::from_dollars(10));
    assert_eq!(payment.local_amount, 250_000);
    assert_eq!(payment.bank_account_id, Some(bank_id));
    assert!(payment.completed_at.is_none());
    assert!(is_valid_reference(&payment.transfer_ref));
    // expires 15 minutes after creation (the stored creation time is truncated to the second)
    let ttl = payment.expires_at - payment.created_at;
    assert!((899..=901).contains(&ttl.num_seconds()), "unexpected ttl: {ttl}");

    // the invoice shows up as the seller's only pending payment
    let pending = AccountApi::new(db).pending_topups_for_seller(seller_id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].transfer_ref, payment.transfer_ref);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let db = new_test_db().await;
    let seller_id = seed_seller(&db, "reseller-1").await;
    seed_active_bank_account(&db).await;

    let api = TopUpApi::new(db, EventProducers::default());
    for cents in [0, -500] {
        let err = api.issue_topup(NewTopUp::new(seller_id, Money::from(cents))).await.unwrap_err();
        assert!(matches!(err, MarketGatewayError::InvalidAmount(_)));
    }
}

#[tokio::test]
async fn issuance_requires_an_active_bank_account() {
    let db = new_test_db().await;
    let seller_id = seed_seller(&db, "reseller-1").await;

    let api = TopUpApi::new(db.clone(), EventProducers::default());
    let err = api.issue_topup(NewTopUp::new(seller_id, Money::from_dollars(10))).await.unwrap_err();
    assert!(matches!(err, MarketGatewayError::NoActiveBankAccount));

    // deactivated accounts don't count
    let account = db.add_bank_account(NewBankAccount::new("ACME Bank", "KeyMarket Ltd", "0011223344")).await.unwrap();
    let err = api.issue_topup(NewTopUp::new(seller_id, Money::from_dollars(10))).await.unwrap_err();
    assert!(matches!(err, MarketGatewayError::NoActiveBankAccount));

    db.set_bank_account_active(account.id, true).await.unwrap();
    api.issue_topup(NewTopUp::new(seller_id, Money::from_dollars(10))).await.unwrap();
}

#[tokio::test]
async fn the_most_recently_activated_account_receives_new_invoices() {
    let db = new_test_db().await;
    let seller_id = seed_seller(&db, "reseller-1").await;
    let first = db.add_bank_account(NewBankAccount::new("ACME Bank", "KeyMarket Ltd", "0011223344")).await.unwrap();
    let second = db.add_bank_account(NewBankAccount::new("Globex Bank", "KeyMarket Ltd", "9988776655")).await.unwrap();
    db.set_bank_account_active(first.id, true).await.unwrap();
    // make the activation timestamps distinguishable
    sqlx::query("UPDATE bank_accounts SET activated_at = datetime('now', '-1 hours') WHERE id = $1")
        .bind(first.id)
        .execute(db.pool())
        .await
        .unwrap();
    db.set_bank_account_active(second.id, true).await.unwrap();

    assert_eq!(db.fetch_active_bank_account().await.unwrap().unwrap().id, second.id);
    let api = TopUpApi::new(db.clone(), EventProducers::default());
    let payment = api.issue_topup(NewTopUp::new(seller_id, Money::from_dollars(10))).await.unwrap();
    assert_eq!(payment.bank_account_id, Some(second.id));
}

#[tokio::test]
async fn back_to_back_requests_are_rate_limited() {
    let db = new_test_db().await;
    let seller_id = seed_seller(&db, "reseller-1").await;
    seed_active_bank_account(&db).await;

    let api = TopUpApi::new(db.clone(), EventProducers::default());
    api.issue_topup(NewTopUp::new(seller_id, Money::from_dollars(10))).await.unwrap();
    let err = api.issue_topup(NewTopUp::new(seller_id, Money::from_dollars(10))).await.unwrap_err();
    match err {
        MarketGatewayError::RateLimited(wait) => assert!(wait > 0 && wait <= 300, "unexpected wait: {wait}"),
        e => panic!("expected RateLimited, got {e}"),
    }
}

#[tokio::test]
async fn a_fourth_pending_invoice_is_refused() {
    let db = new_test_db().await;
    let seller_id = seed_seller(&db, "reseller-1").await;
    seed_active_bank_account(&db).await;

    let api = TopUpApi::new(db.clone(), EventProducers::default());
    for i in 0..3 {
        let payment = api.issue_topup(NewTopUp::new(seller_id, Money::from_dollars(10 + i))).await.unwrap();
        // step out of the rate-limit window so only the pending cap is in play
        age_pending_payment(&db, &payment.transfer_ref, 10).await;
    }
    let err = api.issue_topup(NewTopUp::new(seller_id, Money::from_dollars(20))).await.unwrap_err();
    assert!(matches!(err, MarketGatewayError::TooManyPending(3)));

    // other sellers are unaffected by this seller's backlog
    let other = seed_seller(&db, "reseller-2").await;
    api.issue_topup(NewTopUp::new(other, Money::from_dollars(10))).await.unwrap();
}

#[tokio::test]
async fn locked_sellers_cannot_request_topups() {
    let db = new_test_db().await;
    let seller_id = seed_seller(&db, "reseller-1").await;
    seed_active_bank_account(&db).await;
    AccountApi::new(db.clone()).set_account_lock(seller_id, true).await.unwrap();

    let api = TopUpApi::new(db.clone(), EventProducers::default());
    let err = api.issue_topup(NewTopUp::new(seller_id, Money::from_dollars(10))).await.unwrap_err();
    assert!(matches!(err, MarketGatewayError::AccountLocked(id) if id == seller_id));
}

#[tokio::test]
async fn manual_credit_settles_immediately() {
    let db = new_test_db().await;
    let seller_id = seed_seller(&db, "reseller-1").await;

    let api = TopUpApi::new(db.clone(), EventProducers::default());
    let payment = api.manual_credit(seller_id, Money::from_dollars(25), "bank transfer received offline").await.unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert!(payment.completed_at.is_some());
    assert_eq!(payment.bank_account_id, None);
    assert_eq!(payment.note.as_deref(), Some("bank transfer received offline"));
    assert!(is_valid_reference(&payment.transfer_ref));

    let accounts = AccountApi::new(db.clone());
    let seller = accounts.account_by_id(seller_id).await.unwrap().unwrap();
    assert_eq!(seller.balance, Money::from_dollars(25));

    let history = accounts.payments_for_seller(seller_id).await.unwrap();
    assert_eq!(history.total_completed, Money::from_dollars(25));
    assert_eq!(history.total_pending, Money::from(0));
}

#[tokio::test]
async fn transfer_references_are_unique_across_all_payments() {
    let db = new_test_db().await;
    seed_active_bank_account(&db).await;
    let api = TopUpApi::new(db.clone(), EventProducers::default());

    let mut seen = std::collections::HashSet::new();
    for i in 0..5 {
        let seller_id = seed_seller(&db, &format!("reseller-{i}")).await;
        let issued = api.issue_topup(NewTopUp::new(seller_id, Money::from_dollars(10))).await.unwrap();
        let credited = api.manual_credit(seller_id, Money::from_dollars(1), "promo").await.unwrap();
        assert!(is_valid_reference(&issued.transfer_ref));
        assert!(is_valid_reference(&credited.transfer_ref));
        assert!(seen.insert(issued.transfer_ref), "duplicate reference issued");
        assert!(seen.insert(credited.transfer_ref), "duplicate reference issued");
    }
}

#[tokio::test]
async fn expiry_deadline_is_relative_to_issuance() {
    let db = new_test_db().await;
    let seller_id = seed_seller(&db, "reseller-1").await;
    seed_active_bank_account(&db).await;

    let api = TopUpApi::new(db.clone(), EventProducers::default());
    let before = Utc::now() - Duration::seconds(5);
    let payment = api.issue_topup(NewTopUp::new(seller_id, Money::from_dollars(10))).await.unwrap();
    let after = Utc::now() + Duration::seconds(5);
    assert!(payment.expires_at >= before + Duration::seconds(900));
    assert!(payment.expires_at <= after + Duration::seconds(900));
}
