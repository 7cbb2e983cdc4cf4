use std::fmt::Debug;

use km_common::Money;
use log::*;

use crate::{
    db_types::PriceOverride,
    traits::{MarketGatewayError, PricingManagement},
};

/// `PricingApi` manages seller-specific price overrides and resolves effective unit prices for
/// display. During a purchase the price is re-resolved inside the transaction, so this API is
/// never on the atomicity-critical path.
pub struct PricingApi<B> {
    db: B,
}

impl<B> Debug for PricingApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PricingApi")
    }
}

impl<B> PricingApi<B>
where B: PricingManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Creates or updates the override for the (seller, product) pair. The price must be
    /// positive.
    pub async fn set_override(
        &self,
        seller_id: i64,
        product_id: i64,
        price: Money,
    ) -> Result<PriceOverride, MarketGatewayError> {
        if !price.is_positive() {
            return Err(MarketGatewayError::InvalidAmount(price));
        }
        let over = self.db.set_price_override(seller_id, product_id, price).await?;
        debug!("🏷️ Price override for seller #{seller_id} on product #{product_id} set to {price}");
        Ok(over)
    }

    /// Removes the override for the pair. Returns `false` if there was none to remove.
    pub async fn remove_override(&self, seller_id: i64, product_id: i64) -> Result<bool, MarketGatewayError> {
        let removed = self.db.remove_price_override(seller_id, product_id).await?;
        if removed {
            debug!("🏷️ Price override for seller #{seller_id} on product #{product_id} removed");
        }
        Ok(removed)
    }

    pub async fn fetch_override(
        &self,
        seller_id: i64,
        product_id: i64,
    ) -> Result<Option<PriceOverride>, MarketGatewayError> {
        self.db.fetch_price_override(seller_id, product_id).await
    }

    /// The price the seller would currently pay for the product.
    pub async fn effective_price(&self, seller_id: i64, product_id: i64) -> Result<Money, MarketGatewayError> {
        self.db.resolve_price(seller_id, product_id).await
    }
}
