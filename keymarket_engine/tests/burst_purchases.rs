//! Races on the two pieces of shared state the purchase path touches: a product's last
//! inventory unit, and a wallet that can only cover one of two purchases.

use futures_util::future::join_all;
use km_common::Money;
use keymarket_engine::{
    db_types::{NewInventoryUnit, NewProduct, NewSellerAccount},
    events::EventProducers,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    AccountApi,
    MarketGatewayError,
    PurchaseApi,
    SqliteDatabase,
    TopUpApi,
};
use log::*;
use tokio::runtime::Runtime;

const BUYERS: usize = 10;
const UNITS: usize = 3;

#[test]
fn last_units_go_to_exactly_as_many_buyers() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating database");
        let accounts = AccountApi::new(db.clone());
        let topups = TopUpApi::new(db.clone(), EventProducers::default());
        let api = PurchaseApi::new(db.clone(), EventProducers::default());

        let product = api.create_product(NewProduct::new("VPN voucher", Money::from_dollars(10))).await.unwrap();
        let units = (0..UNITS).map(|i| NewInventoryUnit::single(format!("KEY-{i}"))).collect::<Vec<_>>();
        api.add_inventory(product.id, &units).await.unwrap();

        let mut seller_ids = Vec::with_capacity(BUYERS);
        for i in 0..BUYERS {
            let seller = accounts.create_account(NewSellerAccount::seller(format!("reseller-{i}"))).await.unwrap();
            topups.manual_credit(seller.id, Money::from_dollars(10), "float").await.unwrap();
            seller_ids.push(seller.id);
        }

        info!("🚀️ {BUYERS} buyers racing for {UNITS} units");
        let outcomes = join_all(seller_ids.iter().map(|id| api.purchase(*id, product.id))).await;
        let successes = outcomes.iter().filter(|o| o.is_ok()).count();
        let out_of_stock = outcomes
            .iter()
            .filter(|o| matches!(o, Err(MarketGatewayError::OutOfStock(_))))
            .count();
        assert_eq!(successes, UNITS);
        assert_eq!(out_of_stock, BUYERS - UNITS);

        // every key went to exactly one buyer
        let mut keys = outcomes
            .into_iter()
            .filter_map(|o| o.ok())
            .map(|r| r.order.redeemed_value)
            .collect::<Vec<_>>();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), UNITS);

        let product = accounts.product_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(product.total_available, 0);
        assert_eq!(product.total_sold, UNITS as i64);
    });
    info!("🚀️ test complete");
}

#[test]
fn a_wallet_never_pays_for_more_than_it_holds() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating database");
        let accounts = AccountApi::new(db.clone());
        let topups = TopUpApi::new(db.clone(), EventProducers::default());
        let api = PurchaseApi::new(db.clone(), EventProducers::default());

        let product = api.create_product(NewProduct::new("VPN voucher", Money::from_dollars(10))).await.unwrap();
        let units = (0..4).map(|i| NewInventoryUnit::single(format!("KEY-{i}"))).collect::<Vec<_>>();
        api.add_inventory(product.id, &units).await.unwrap();

        // enough for exactly one purchase
        let seller = accounts.create_account(NewSellerAccount::seller("reseller-1")).await.unwrap();
        topups.manual_credit(seller.id, Money::from_dollars(10), "float").await.unwrap();

        let outcomes = join_all((0..2).map(|_| api.purchase(seller.id, product.id))).await;
        let successes = outcomes.iter().filter(|o| o.is_ok()).count();
        let refused = outcomes
            .iter()
            .filter(|o| matches!(o, Err(MarketGatewayError::InsufficientBalance { .. })))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(refused, 1);

        let seller = accounts.account_by_id(seller.id).await.unwrap().unwrap();
        assert_eq!(seller.balance, Money::from(0));
        // only the paid-for unit was consumed
        let product = accounts.product_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(product.total_available, 3);
        assert_eq!(product.total_sold, 1);
        assert_eq!(accounts.orders_for_seller(seller.id).await.unwrap().orders.len(), 1);
    });
}
