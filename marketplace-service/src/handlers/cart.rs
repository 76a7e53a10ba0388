use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use shared::checkout::ensure_same_store;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{CartItem, CartLineView, Product};
use crate::schema::{cart_items, clients, products};

#[derive(Debug, Default)]
pub struct CartManager;

impl CartManager {
    /// Adds `quantity` units of a product, merging with an existing line.
    ///
    /// A cart only ever holds products of one store.
    pub async fn add_item(
        &self,
        conn: &mut AsyncPgConnection,
        client_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<CartItem> {
        if quantity <= 0 {
            return Err(AppError::validation("quantity must be greater than zero"));
        }

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                // Serializes concurrent adds for the same client across stores.
                clients::table
                    .find(client_id)
                    .select(clients::id)
                    .for_update()
                    .first::<Uuid>(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| AppError::not_found("client", client_id))?;

                let product = products::table
                    .find(product_id)
                    .select(Product::as_select())
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| AppError::not_found("product", product_id))?;

                let current_store = cart_items::table
                    .inner_join(products::table)
                    .filter(cart_items::client_id.eq(client_id))
                    .select(products::store_id)
                    .first::<Uuid>(conn)
                    .await
                    .optional()?;
                ensure_same_store(current_store, product.store_id)?;

                let line = CartItem {
                    id: Uuid::new_v4(),
                    client_id,
                    product_id,
                    quantity,
                };
                let saved = diesel::insert_into(cart_items::table)
                    .values(&line)
                    .on_conflict((cart_items::client_id, cart_items::product_id))
                    .do_update()
                    .set(
                        cart_items::quantity
                            .eq(cart_items::quantity + excluded(cart_items::quantity)),
                    )
                    .returning(CartItem::as_returning())
                    .get_result(conn)
                    .await?;

                info!(%client_id, %product_id, quantity = saved.quantity, "cart line saved");
                Ok(saved)
            }
            .scope_boxed()
        })
        .await
    }

    pub async fn remove_item(
        &self,
        conn: &mut AsyncPgConnection,
        client_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<()> {
        ensure_client(conn, client_id).await?;

        let removed = diesel::delete(
            cart_items::table
                .filter(cart_items::client_id.eq(client_id))
                .filter(cart_items::product_id.eq(product_id)),
        )
        .execute(conn)
        .await?;
        if removed == 0 {
            return Err(AppError::not_found("cart item", product_id));
        }

        info!(%client_id, %product_id, "cart line removed");
        Ok(())
    }

    pub async fn view(
        &self,
        conn: &mut AsyncPgConnection,
        client_id: Uuid,
    ) -> AppResult<Vec<CartLineView>> {
        ensure_client(conn, client_id).await?;

        let rows: Vec<(CartItem, Product)> = cart_items::table
            .inner_join(products::table)
            .filter(cart_items::client_id.eq(client_id))
            .order(products::name.asc())
            .select((CartItem::as_select(), Product::as_select()))
            .load(conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(item, product)| CartLineView {
                cart_item_id: item.id,
                product_id: product.id,
                product_name: product.name,
                quantity: item.quantity,
                subtotal: &product.price * BigDecimal::from(item.quantity),
                unit_price: product.price,
            })
            .collect())
    }
}

async fn ensure_client(conn: &mut AsyncPgConnection, client_id: Uuid) -> AppResult<()> {
    clients::table
        .find(client_id)
        .select(clients::id)
        .first::<Uuid>(conn)
        .await
        .optional()?
        .ok_or_else(|| AppError::not_found("client", client_id))?;
    Ok(())
}
