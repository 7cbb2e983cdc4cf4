use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewInventoryUnit, NewProduct, Product},
    events::{EventProducers, OrderCreatedEvent},
    traits::{MarketGatewayDatabase, MarketGatewayError, PurchaseReceipt},
};

/// `PurchaseApi` is the primary API for converting a seller's wallet balance into a consumed
/// inventory key and an immutable order record. It also owns the stocking side: creating
/// products and bulk-adding inventory units.
pub struct PurchaseApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PurchaseApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PurchaseApi")
    }
}

impl<B> PurchaseApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> PurchaseApi<B>
where B: MarketGatewayDatabase
{
    /// Executes a purchase for the given seller and product.
    ///
    /// The entire flow — price resolution, inventory allocation, wallet debit and order
    /// creation — runs as one atomic transaction in the backend. On success the new order and
    /// the post-debit balance are returned and an `OrderCreated` event is published.
    pub async fn purchase(&self, seller_id: i64, product_id: i64) -> Result<PurchaseReceipt, MarketGatewayError> {
        let receipt = self.db.process_purchase(seller_id, product_id).await?;
        debug!(
            "🛒️ Seller #{seller_id} bought product #{product_id} ({}) for {}. Balance is now {}",
            receipt.order.product_name, receipt.order.price, receipt.new_balance
        );
        self.call_order_created_hook(&receipt).await;
        Ok(receipt)
    }

    async fn call_order_created_hook(&self, receipt: &PurchaseReceipt) {
        for emitter in &self.producers.order_created_producer {
            trace!("🛒️ Notifying order created hook subscribers");
            let event = OrderCreatedEvent::new(receipt.order.clone(), receipt.new_balance);
            emitter.publish_event(event).await;
        }
    }

    /// Creates a new catalog product with no stock.
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, MarketGatewayError> {
        let product = self.db.create_product(product).await?;
        debug!("🛒️ Product #{} ({}) created at {}", product.id, product.name, product.base_price);
        Ok(product)
    }

    /// Stocks the product with the given keys. Returns the product with its updated
    /// availability aggregate.
    pub async fn add_inventory(
        &self,
        product_id: i64,
        units: &[NewInventoryUnit],
    ) -> Result<Product, MarketGatewayError> {
        let product = self.db.add_inventory(product_id, units).await?;
        debug!("🛒️ {} units added to product #{product_id}. {} now available", units.len(), product.total_available);
        Ok(product)
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
