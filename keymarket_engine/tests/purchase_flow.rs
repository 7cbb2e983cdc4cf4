//! End-to-end tests for the atomic purchase path.

use km_common::Money;
use keymarket_engine::{
    db_types::{NewInventoryUnit, NewProduct, NewSellerAccount},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    AccountApi,
    AccountManagement,
    MarketGatewayError,
    PricingApi,
    PurchaseApi,
    SqliteDatabase,
    TopUpApi,
};

async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// Sets up a funded seller and a stocked product, returning (seller_id, product_id).
async fn seed_seller_and_product(db: &SqliteDatabase, balance: Money, base_price: Money, keys: &[&str]) -> (i64, i64) {
    let accounts = AccountApi::new(db.clone());
    let purchases = PurchaseApi::new(db.clone(), EventProducers::default());
    let topups = TopUpApi::new(db.clone(), EventProducers::default());
    let seller = accounts.create_account(NewSellerAccount::seller("reseller-1")).await.unwrap();
    if balance.is_positive() {
        topups.manual_credit(seller.id, balance, "initial float").await.unwrap();
    }
    let product = purchases.create_product(NewProduct::new("Steam Gift Card", base_price)).await.unwrap();
    let units = keys.iter().map(|k| NewInventoryUnit::single(*k)).collect::<Vec<_>>();
    if !units.is_empty() {
        purchases.add_inventory(product.id, &units).await.unwrap();
    }
    (seller.id, product.id)
}

#[tokio::test]
async fn insufficient_balance_leaves_everything_untouched() {
    let db = new_test_db().await;
    let (seller_id, product_id) =
        seed_seller_and_product(&db, Money::from_dollars(5), Money::from_dollars(10), &["KEY-1"]).await;
    let api = PurchaseApi::new(db.clone(), EventProducers::default());

    let err = api.purchase(seller_id, product_id).await.unwrap_err();
    assert!(matches!(
        err,
        MarketGatewayError::InsufficientBalance { required, available }
            if required == Money::from_dollars(10) && available == Money::from_dollars(5)
    ));

    let accounts = AccountApi::new(db.clone());
    let seller = accounts.account_by_id(seller_id).await.unwrap().unwrap();
    assert_eq!(seller.balance, Money::from_dollars(5));
    let product = accounts.product_by_id(product_id).await.unwrap().unwrap();
    assert_eq!(product.total_available, 1);
    assert_eq!(product.total_sold, 0);
}

#[tokio::test]
async fn successful_purchase_snapshots_and_consumes_the_unit() {
    let db = new_test_db().await;
    let (seller_id, product_id) =
        seed_seller_and_product(&db, Money::from_dollars(10), Money::from_dollars(10), &["ABC-123"]).await;
    let api = PurchaseApi::new(db.clone(), EventProducers::default());

    let receipt = api.purchase(seller_id, product_id).await.unwrap();
    assert_eq!(receipt.order.redeemed_value, "ABC-123");
    assert_eq!(receipt.order.product_name, "Steam Gift Card");
    assert_eq!(receipt.order.price, Money::from_dollars(10));
    assert_eq!(receipt.new_balance, Money::from(0));

    let accounts = AccountApi::new(db.clone());
    let seller = accounts.account_by_id(seller_id).await.unwrap().unwrap();
    assert_eq!(seller.balance, Money::from(0));
    let product = accounts.product_by_id(product_id).await.unwrap().unwrap();
    assert_eq!(product.total_available, 0);
    assert_eq!(product.total_sold, 1);
    // The exhausted unit is gone from the product's list entirely
    assert!(db.fetch_inventory(product_id).await.unwrap().is_empty());

    // The order is on the books
    let history = accounts.orders_for_seller(seller_id).await.unwrap();
    assert_eq!(history.orders.len(), 1);
    assert_eq!(history.total_spent, Money::from_dollars(10));
}

#[tokio::test]
async fn units_are_allocated_oldest_first() {
    let db = new_test_db().await;
    let (seller_id, product_id) =
        seed_seller_and_product(&db, Money::from_dollars(20), Money::from_dollars(10), &["KEY-A", "KEY-B"]).await;
    let api = PurchaseApi::new(db.clone(), EventProducers::default());

    let first = api.purchase(seller_id, product_id).await.unwrap();
    let second = api.purchase(seller_id, product_id).await.unwrap();
    assert_eq!(first.order.redeemed_value, "KEY-A");
    assert_eq!(second.order.redeemed_value, "KEY-B");
}

#[tokio::test]
async fn empty_product_reports_out_of_stock() {
    let db = new_test_db().await;
    let (seller_id, product_id) =
        seed_seller_and_product(&db, Money::from_dollars(10), Money::from_dollars(10), &[]).await;
    let api = PurchaseApi::new(db.clone(), EventProducers::default());

    let err = api.purchase(seller_id, product_id).await.unwrap_err();
    assert!(matches!(err, MarketGatewayError::OutOfStock(id) if id == product_id));

    // The wallet was not debited
    let seller = AccountApi::new(db).account_by_id(seller_id).await.unwrap().unwrap();
    assert_eq!(seller.balance, Money::from_dollars(10));
}

#[tokio::test]
async fn locked_sellers_cannot_purchase() {
    let db = new_test_db().await;
    let (seller_id, product_id) =
        seed_seller_and_product(&db, Money::from_dollars(10), Money::from_dollars(10), &["KEY-1"]).await;
    let accounts = AccountApi::new(db.clone());
    accounts.set_account_lock(seller_id, true).await.unwrap();

    let api = PurchaseApi::new(db.clone(), EventProducers::default());
    let err = api.purchase(seller_id, product_id).await.unwrap_err();
    assert!(matches!(err, MarketGatewayError::AccountLocked(id) if id == seller_id));

    accounts.set_account_lock(seller_id, false).await.unwrap();
    api.purchase(seller_id, product_id).await.expect("unlocked seller should be able to buy");
}

#[tokio::test]
async fn admins_cannot_purchase() {
    let db = new_test_db().await;
    let (_, product_id) =
        seed_seller_and_product(&db, Money::from_dollars(10), Money::from_dollars(10), &["KEY-1"]).await;
    let accounts = AccountApi::new(db.clone());
    let admin = accounts.create_account(NewSellerAccount::admin("operator")).await.unwrap();

    let api = PurchaseApi::new(db.clone(), EventProducers::default());
    let err = api.purchase(admin.id, product_id).await.unwrap_err();
    assert!(matches!(err, MarketGatewayError::NotASeller(id) if id == admin.id));
}

#[tokio::test]
async fn price_overrides_supersede_the_base_price() {
    let db = new_test_db().await;
    let (seller_id, product_id) =
        seed_seller_and_product(&db, Money::from_dollars(7), Money::from_dollars(10), &["KEY-1", "KEY-2"]).await;
    let pricing = PricingApi::new(db.clone());
    pricing.set_override(seller_id, product_id, Money::from_dollars(7)).await.unwrap();
    assert_eq!(pricing.effective_price(seller_id, product_id).await.unwrap(), Money::from_dollars(7));

    let api = PurchaseApi::new(db.clone(), EventProducers::default());
    let receipt = api.purchase(seller_id, product_id).await.unwrap();
    assert_eq!(receipt.order.price, Money::from_dollars(7));
    assert_eq!(receipt.new_balance, Money::from(0));

    // Without the override the same seller pays the base price again
    pricing.remove_override(seller_id, product_id).await.unwrap();
    assert_eq!(pricing.effective_price(seller_id, product_id).await.unwrap(), Money::from_dollars(10));
    let topups = TopUpApi::new(db.clone(), EventProducers::default());
    topups.manual_credit(seller_id, Money::from_dollars(10), "re-float").await.unwrap();
    let receipt = api.purchase(seller_id, product_id).await.unwrap();
    assert_eq!(receipt.order.price, Money::from_dollars(10));
}

#[tokio::test]
async fn availability_aggregate_tracks_the_unit_sum() {
    let db = new_test_db().await;
    let (seller_id, product_id) =
        seed_seller_and_product(&db, Money::from_dollars(50), Money::from_dollars(10), &["K1", "K2"]).await;
    let purchases = PurchaseApi::new(db.clone(), EventProducers::default());
    let accounts = AccountApi::new(db.clone());

    let unit_sum = |db: SqliteDatabase| async move {
        db.fetch_inventory(product_id).await.unwrap().iter().map(|u| u.qty_available).sum::<i64>()
    };

    purchases.add_inventory(product_id, &[NewInventoryUnit::with_quantity("K3", 2)]).await.unwrap();
    let product = accounts.product_by_id(product_id).await.unwrap().unwrap();
    assert_eq!(product.total_available, 4);
    assert_eq!(product.total_available, unit_sum(db.clone()).await);

    for _ in 0..3 {
        purchases.purchase(seller_id, product_id).await.unwrap();
        let product = accounts.product_by_id(product_id).await.unwrap().unwrap();
        assert_eq!(product.total_available, unit_sum(db.clone()).await);
    }
    let product = accounts.product_by_id(product_id).await.unwrap().unwrap();
    assert_eq!(product.total_available, 1);
    assert_eq!(product.total_sold, 3);
}

#[tokio::test]
async fn multi_quantity_units_survive_until_exhausted() {
    let db = new_test_db().await;
    let (seller_id, product_id) =
        seed_seller_and_product(&db, Money::from_dollars(20), Money::from_dollars(10), &[]).await;
    let purchases = PurchaseApi::new(db.clone(), EventProducers::default());
    purchases.add_inventory(product_id, &[NewInventoryUnit::with_quantity("SHARED-KEY", 2)]).await.unwrap();

    purchases.purchase(seller_id, product_id).await.unwrap();
    let units = db.fetch_inventory(product_id).await.unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].qty_available, 1);
    assert_eq!(units[0].qty_sold, 1);
    assert_eq!(units[0].buyers, vec![seller_id]);

    purchases.purchase(seller_id, product_id).await.unwrap();
    assert!(db.fetch_inventory(product_id).await.unwrap().is_empty());
}
