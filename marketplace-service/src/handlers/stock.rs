use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use shared::RuleViolation;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::Product;
use crate::schema::products;

/// Quantity-on-hand adjustments.
///
/// These never open a transaction themselves; callers run them inside the
/// transaction that owns the whole multi-line change.
pub struct StockLedger;

impl StockLedger {
    /// Locks the given products in id order so concurrent checkouts and
    /// sweeps always acquire rows in the same sequence.
    pub async fn lock_products(
        conn: &mut AsyncPgConnection,
        ids: &[Uuid],
    ) -> AppResult<Vec<Product>> {
        let rows = products::table
            .filter(products::id.eq_any(ids))
            .order(products::id.asc())
            .select(Product::as_select())
            .for_update()
            .load(conn)
            .await?;
        Ok(rows)
    }

    pub async fn decrement(
        conn: &mut AsyncPgConnection,
        product: &Product,
        quantity: i32,
    ) -> AppResult<()> {
        let updated = diesel::update(
            products::table
                .filter(products::id.eq(product.id))
                .filter(products::stock_quantity.ge(quantity)),
        )
        .set(products::stock_quantity.eq(products::stock_quantity - quantity))
        .execute(conn)
        .await?;

        if updated == 0 {
            return Err(RuleViolation::InsufficientStock {
                product: product.name.clone(),
            }
            .into());
        }
        Ok(())
    }

    pub async fn increment(
        conn: &mut AsyncPgConnection,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<()> {
        let updated = diesel::update(products::table.filter(products::id.eq(product_id)))
            .set(products::stock_quantity.eq(products::stock_quantity + quantity))
            .execute(conn)
            .await?;

        if updated == 0 {
            warn!(%product_id, quantity, "restock skipped, product no longer exists");
        }
        Ok(())
    }
}
