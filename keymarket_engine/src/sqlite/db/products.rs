use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{InventoryUnit, NewInventoryUnit, NewProduct, Product},
    traits::{AccountApiError, MarketGatewayError},
};

pub async fn insert_product(
    product: NewProduct,
    conn: &mut SqliteConnection,
) -> Result<Product, MarketGatewayError> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (name, category, base_price) VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(product.name)
    .bind(product.category)
    .bind(product.base_price)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, AccountApiError> {
    let product =
        sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

/// Returns the product's remaining units, oldest first (allocation order).
pub async fn fetch_inventory(
    product_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<InventoryUnit>, AccountApiError> {
    let units = sqlx::query_as("SELECT * FROM inventory_units WHERE product_id = $1 ORDER BY id ASC")
        .bind(product_id)
        .fetch_all(conn)
        .await?;
    Ok(units)
}

/// Inserts the given units and bumps the product's availability aggregate to match. Not atomic
/// on its own; the caller wraps this in a transaction.
pub async fn add_inventory(
    product_id: i64,
    units: &[NewInventoryUnit],
    conn: &mut SqliteConnection,
) -> Result<Product, MarketGatewayError> {
    let mut added = 0i64;
    for unit in units {
        sqlx::query("INSERT INTO inventory_units (product_id, value, qty_available) VALUES ($1, $2, $3)")
            .bind(product_id)
            .bind(unit.value.as_str())
            .bind(unit.quantity)
            .execute(&mut *conn)
            .await?;
        added += unit.quantity;
    }
    let product: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products SET total_available = total_available + $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(added)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    let product = product.ok_or(MarketGatewayError::ProductNotFound(product_id))?;
    debug!("🗃️ {added} units stocked for product #{product_id}. {} now available", product.total_available);
    Ok(product)
}

/// Allocates one unit of the product for the buyer: the oldest unit with remaining quantity is
/// decremented, the buyer is recorded, the unit row is deleted once empty, and the product
/// aggregates are adjusted. Returns the redeemed key, or `OutOfStock`.
///
/// Must be called inside the purchase transaction so a failure later in the flow rolls the
/// allocation back.
pub async fn allocate_unit(
    product_id: i64,
    buyer_id: i64,
    conn: &mut SqliteConnection,
) -> Result<String, MarketGatewayError> {
    let unit: Option<InventoryUnit> = sqlx::query_as(
        r#"
            UPDATE inventory_units
            SET qty_available = qty_available - 1, qty_sold = qty_sold + 1
            WHERE id = (
                SELECT id FROM inventory_units
                WHERE product_id = $1 AND qty_available > 0
                ORDER BY id ASC LIMIT 1
            )
            RETURNING *;
        "#,
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    let mut unit = unit.ok_or(MarketGatewayError::OutOfStock(product_id))?;
    unit.buyers.push(buyer_id);
    if unit.qty_available == 0 {
        sqlx::query("DELETE FROM inventory_units WHERE id = $1").bind(unit.id).execute(&mut *conn).await?;
        trace!("🗃️ Unit #{} of product #{product_id} exhausted and removed", unit.id);
    } else {
        let buyers = serde_json::to_string(&unit.buyers)
            .map_err(|e| MarketGatewayError::DatabaseError(e.to_string()))?;
        sqlx::query("UPDATE inventory_units SET buyers = $1 WHERE id = $2")
            .bind(buyers)
            .bind(unit.id)
            .execute(&mut *conn)
            .await?;
    }
    sqlx::query(
        r#"
            UPDATE products
            SET total_available = MAX(total_available - 1, 0),
                total_sold = total_sold + 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1;
        "#,
    )
    .bind(product_id)
    .execute(conn)
    .await?;
    Ok(unit.value)
}
