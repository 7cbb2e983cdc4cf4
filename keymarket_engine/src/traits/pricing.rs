use km_common::Money;

use crate::{db_types::PriceOverride, traits::MarketGatewayError};

/// Management of seller-specific price overrides, and resolution of the effective unit price.
#[allow(async_fn_in_trait)]
pub trait PricingManagement {
    /// Creates or updates the override for the (seller, product) pair.
    async fn set_price_override(
        &self,
        seller_id: i64,
        product_id: i64,
        price: Money,
    ) -> Result<PriceOverride, MarketGatewayError>;

    /// Removes the override for the pair. Returns `false` if there was none.
    async fn remove_price_override(&self, seller_id: i64, product_id: i64) -> Result<bool, MarketGatewayError>;

    async fn fetch_price_override(
        &self,
        seller_id: i64,
        product_id: i64,
    ) -> Result<Option<PriceOverride>, MarketGatewayError>;

    /// The price the seller would pay right now: a positive override if present, else the
    /// product's base price. A missing override is not an error.
    async fn resolve_price(&self, seller_id: i64, product_id: i64) -> Result<Money, MarketGatewayError>;
}
