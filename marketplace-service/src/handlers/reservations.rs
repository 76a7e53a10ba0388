use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use shared::checkout::{self, CartLine};
use shared::reservation::{check_pickup, should_expire};
use shared::windows::ReservationWindow;
use shared::{Actor, ReservationStatus};
use std::collections::{BTreeMap, HashMap};
use tracing::info;
use uuid::Uuid;

use super::{SharedClock, StockLedger};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::schema::*;

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub reservation_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub pickup_deadline: DateTime<Utc>,
}

pub struct ReservationManager {
    clock: SharedClock,
}

impl ReservationManager {
    pub fn new(clock: SharedClock) -> Self {
        Self { clock }
    }

    /// Turns the client's cart into a reservation.
    ///
    /// Stock checks, decrements, the reservation insert and the cart purge
    /// share one transaction; any failure leaves stock and cart untouched.
    /// The client row is locked first, the same lock `add_item` takes, so a
    /// line added mid-checkout waits and survives in the cart.
    pub async fn checkout(
        &self,
        conn: &mut AsyncPgConnection,
        client_id: Uuid,
    ) -> AppResult<CheckoutReceipt> {
        let window = ReservationWindow::starting_at(self.clock.utc());

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                clients::table
                    .find(client_id)
                    .select(clients::id)
                    .for_update()
                    .first::<Uuid>(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| AppError::not_found("client", client_id))?;

                let items = cart_items::table
                    .filter(cart_items::client_id.eq(client_id))
                    .order(cart_items::product_id.asc())
                    .select(CartItem::as_select())
                    .for_update()
                    .load(conn)
                    .await?;

                let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
                let products: HashMap<Uuid, Product> =
                    StockLedger::lock_products(conn, &product_ids)
                        .await?
                        .into_iter()
                        .map(|product| (product.id, product))
                        .collect();

                let lines = items
                    .iter()
                    .map(|item| {
                        let product = products
                            .get(&item.product_id)
                            .ok_or_else(|| AppError::not_found("product", item.product_id))?;
                        Ok(CartLine {
                            product_id: product.id,
                            product_name: product.name.clone(),
                            store_id: product.store_id,
                            stock_quantity: product.stock_quantity,
                            unit_price: product.price.clone(),
                            quantity: item.quantity,
                        })
                    })
                    .collect::<AppResult<Vec<_>>>()?;

                let plan = checkout::plan_checkout(&lines)?;

                for line in &plan.lines {
                    if let Some(product) = products.get(&line.product_id) {
                        StockLedger::decrement(conn, product, line.quantity).await?;
                    }
                }

                let reservation = ProductReservation {
                    id: Uuid::new_v4(),
                    client_id,
                    store_id: plan.store_id,
                    status: ReservationStatus::Reserved.as_str().to_string(),
                    reserved_at: window.reserved_at,
                    expires_at: window.expires_at,
                    pickup_deadline: window.pickup_deadline,
                };
                diesel::insert_into(product_reservations::table)
                    .values(&reservation)
                    .execute(conn)
                    .await?;

                let reservation_lines: Vec<ReservationItem> = plan
                    .lines
                    .iter()
                    .map(|line| ReservationItem {
                        id: Uuid::new_v4(),
                        reservation_id: reservation.id,
                        product_id: line.product_id,
                        quantity: line.quantity,
                        unit_price: line.unit_price.clone(),
                    })
                    .collect();
                diesel::insert_into(reservation_items::table)
                    .values(&reservation_lines)
                    .execute(conn)
                    .await?;

                let checked_out: Vec<Uuid> = items.iter().map(|item| item.id).collect();
                diesel::delete(cart_items::table.filter(cart_items::id.eq_any(&checked_out)))
                    .execute(conn)
                    .await?;

                info!(
                    reservation_id = %reservation.id,
                    %client_id,
                    store_id = %reservation.store_id,
                    lines = reservation_lines.len(),
                    "cart checked out"
                );

                Ok(CheckoutReceipt {
                    reservation_id: reservation.id,
                    expires_at: reservation.expires_at,
                    pickup_deadline: reservation.pickup_deadline,
                })
            }
            .scope_boxed()
        })
        .await
    }

    pub async fn mark_picked_up(
        &self,
        conn: &mut AsyncPgConnection,
        reservation_id: Uuid,
        actor: Actor,
    ) -> AppResult<ReservationDetails> {
        let now = self.clock.utc();

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                let found = match actor {
                    Actor::Store(store_id) => {
                        product_reservations::table
                            .filter(product_reservations::id.eq(reservation_id))
                            .filter(product_reservations::store_id.eq(store_id))
                            .select(ProductReservation::as_select())
                            .for_update()
                            .first(conn)
                            .await
                    }
                    Actor::Client(client_id) => {
                        product_reservations::table
                            .filter(product_reservations::id.eq(reservation_id))
                            .filter(product_reservations::client_id.eq(client_id))
                            .select(ProductReservation::as_select())
                            .for_update()
                            .first(conn)
                            .await
                    }
                };
                let reservation = found
                    .optional()?
                    .ok_or_else(|| AppError::not_found("reservation", reservation_id))?;

                let next = check_pickup(reservation.status()?, &reservation.window(), actor, now)?;

                let updated = diesel::update(product_reservations::table.find(reservation.id))
                    .set(product_reservations::status.eq(next.as_str()))
                    .returning(ProductReservation::as_returning())
                    .get_result(conn)
                    .await?;

                info!(%reservation_id, ?actor, "reservation picked up");

                let items = load_items(conn, &[updated.id]).await?;
                ReservationDetails::new(updated, items.into_values().flatten().collect())
            }
            .scope_boxed()
        })
        .await
    }

    /// Cancels every live reservation of the store that is past either the
    /// hold or the pickup cutoff and puts its stock back.
    ///
    /// Already-canceled rows are never selected, so repeated sweeps do not
    /// restock twice. Returns the ids canceled by this run.
    pub async fn expire_sweep(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
    ) -> AppResult<Vec<Uuid>> {
        let now = self.clock.utc();

        conn.transaction::<_, AppError, _>(|conn| {
            async move {
                stores::table
                    .find(store_id)
                    .select(stores::id)
                    .first::<Uuid>(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| AppError::not_found("store", store_id))?;

                let stale = product_reservations::table
                    .filter(product_reservations::store_id.eq(store_id))
                    .filter(product_reservations::status.eq(ReservationStatus::Reserved.as_str()))
                    .filter(
                        product_reservations::expires_at
                            .lt(now)
                            .or(product_reservations::pickup_deadline.lt(now)),
                    )
                    .order(product_reservations::id.asc())
                    .select(ProductReservation::as_select())
                    .for_update()
                    .load(conn)
                    .await?;

                let mut expired = Vec::with_capacity(stale.len());
                for reservation in &stale {
                    if should_expire(reservation.status()?, &reservation.window(), now) {
                        expired.push(reservation.id);
                    }
                }
                if expired.is_empty() {
                    return Ok(expired);
                }

                // Aggregate per product so rows are touched once, in id order.
                let mut restock: BTreeMap<Uuid, i32> = BTreeMap::new();
                for item in load_items(conn, &expired).await?.into_values().flatten() {
                    *restock.entry(item.product_id).or_default() += item.quantity;
                }
                for (product_id, quantity) in restock {
                    StockLedger::increment(conn, product_id, quantity).await?;
                }

                let canceled = product_reservations::table
                    .filter(product_reservations::id.eq_any(&expired));
                diesel::update(canceled)
                    .set(product_reservations::status.eq(ReservationStatus::Canceled.as_str()))
                    .execute(conn)
                    .await?;

                info!(%store_id, canceled = expired.len(), "expired reservations canceled");
                Ok(expired)
            }
            .scope_boxed()
        })
        .await
    }

    /// One reservation with its lines, visible only to its client or store.
    pub async fn get(
        &self,
        conn: &mut AsyncPgConnection,
        reservation_id: Uuid,
        actor: Actor,
    ) -> AppResult<ReservationDetails> {
        let query = product_reservations::table
            .filter(product_reservations::id.eq(reservation_id))
            .select(ProductReservation::as_select())
            .into_boxed();
        let query = match actor {
            Actor::Store(store_id) => query.filter(product_reservations::store_id.eq(store_id)),
            Actor::Client(client_id) => query.filter(product_reservations::client_id.eq(client_id)),
        };
        let reservation = query
            .first(conn)
            .await
            .optional()?
            .ok_or_else(|| AppError::not_found("reservation", reservation_id))?;
        let mut details = with_items(conn, vec![reservation]).await?;
        details
            .pop()
            .ok_or_else(|| AppError::not_found("reservation", reservation_id))
    }

    pub async fn list_for_store(
        &self,
        conn: &mut AsyncPgConnection,
        store_id: Uuid,
    ) -> AppResult<Vec<ReservationDetails>> {
        stores::table
            .find(store_id)
            .select(stores::id)
            .first::<Uuid>(conn)
            .await
            .optional()?
            .ok_or_else(|| AppError::not_found("store", store_id))?;

        let reservations = product_reservations::table
            .filter(product_reservations::store_id.eq(store_id))
            .order(product_reservations::reserved_at.desc())
            .select(ProductReservation::as_select())
            .load(conn)
            .await?;
        with_items(conn, reservations).await
    }

    pub async fn list_for_client(
        &self,
        conn: &mut AsyncPgConnection,
        client_id: Uuid,
    ) -> AppResult<Vec<ReservationDetails>> {
        clients::table
            .find(client_id)
            .select(clients::id)
            .first::<Uuid>(conn)
            .await
            .optional()?
            .ok_or_else(|| AppError::not_found("client", client_id))?;

        let reservations = product_reservations::table
            .filter(product_reservations::client_id.eq(client_id))
            .order(product_reservations::reserved_at.desc())
            .select(ProductReservation::as_select())
            .load(conn)
            .await?;
        with_items(conn, reservations).await
    }
}

async fn load_items(
    conn: &mut AsyncPgConnection,
    reservation_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<ReservationItem>>> {
    let items = reservation_items::table
        .filter(reservation_items::reservation_id.eq_any(reservation_ids))
        .order(reservation_items::product_id.asc())
        .select(ReservationItem::as_select())
        .load(conn)
        .await?;

    let mut grouped: HashMap<Uuid, Vec<ReservationItem>> = HashMap::new();
    for item in items {
        grouped.entry(item.reservation_id).or_default().push(item);
    }
    Ok(grouped)
}

async fn with_items(
    conn: &mut AsyncPgConnection,
    reservations: Vec<ProductReservation>,
) -> AppResult<Vec<ReservationDetails>> {
    let ids: Vec<Uuid> = reservations.iter().map(|r| r.id).collect();
    let mut items = load_items(conn, &ids).await?;
    reservations
        .into_iter()
        .map(|reservation| {
            let lines = items.remove(&reservation.id).unwrap_or_default();
            ReservationDetails::new(reservation, lines)
        })
        .collect()
}
