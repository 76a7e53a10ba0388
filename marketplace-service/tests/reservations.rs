mod common;

use assert_matches::assert_matches;
use chrono::TimeDelta;
use diesel_async::RunQueryDsl;
use marketplace_service::error::AppError;
use marketplace_service::models::CartItem;
use marketplace_service::schema::cart_items;
use shared::{Actor, MarketplaceError, ReservationStatus, RuleViolation};
use std::time::Duration;
use uuid::Uuid;

use common::{context, fixed_now};

#[tokio::test]
async fn checkout_reserves_stock_and_empties_cart() {
    let Some(ctx) = context().await else { return };
    let store = ctx.store().await;
    let client = ctx.client().await;
    let soap = ctx.product(store, "Soap", 5).await;
    ctx.add_to_cart(client, soap, 3).await;

    let mut conn = ctx.conn().await;
    let receipt = ctx.reservations.checkout(&mut conn, client).await.unwrap();

    assert_eq!(receipt.expires_at, fixed_now() + TimeDelta::days(2));
    assert_eq!(receipt.pickup_deadline, fixed_now() + TimeDelta::days(4));
    assert_eq!(ctx.stock_of(soap).await, 2);

    let details = ctx
        .reservations
        .get(&mut conn, receipt.reservation_id, Actor::Client(client))
        .await
        .unwrap();
    assert_eq!(details.status, ReservationStatus::Reserved);
    assert_eq!(details.store_id, store);
    assert_eq!(details.items.len(), 1);
    assert_eq!(details.items[0].quantity, 3);

    assert!(ctx.cart.view(&mut conn, client).await.unwrap().is_empty());
}

#[tokio::test]
async fn store_pickup_is_final_and_sweep_leaves_it_alone() {
    let Some(ctx) = context().await else { return };
    let store = ctx.store().await;
    let client = ctx.client().await;
    let soap = ctx.product(store, "Soap", 5).await;
    ctx.add_to_cart(client, soap, 3).await;

    let mut conn = ctx.conn().await;
    let receipt = ctx.reservations.checkout(&mut conn, client).await.unwrap();

    // Stores may hand goods over after the client window has closed.
    ctx.clock.advance(TimeDelta::days(5));
    let picked = ctx
        .reservations
        .mark_picked_up(&mut conn, receipt.reservation_id, Actor::Store(store))
        .await
        .unwrap();
    assert_eq!(picked.status, ReservationStatus::PickedUp);

    let canceled = ctx.reservations.expire_sweep(&mut conn, store).await.unwrap();
    assert!(canceled.is_empty());
    assert_eq!(ctx.stock_of(soap).await, 2);

    let again = ctx
        .reservations
        .mark_picked_up(&mut conn, receipt.reservation_id, Actor::Store(store))
        .await;
    assert_matches!(
        again,
        Err(AppError::Domain(MarketplaceError::Rule(RuleViolation::InvalidReservationStatus { .. })))
    );
}

#[tokio::test]
async fn mixed_store_cart_is_rejected_when_adding() {
    let Some(ctx) = context().await else { return };
    let first = ctx.store().await;
    let second = ctx.store().await;
    let client = ctx.client().await;
    let soap = ctx.product(first, "Soap", 5).await;
    let towel = ctx.product(second, "Towel", 5).await;
    ctx.add_to_cart(client, soap, 1).await;

    let mut conn = ctx.conn().await;
    let result = ctx.cart.add_item(&mut conn, client, towel, 1).await;

    assert_matches!(
        result,
        Err(AppError::Domain(MarketplaceError::Rule(RuleViolation::MixedStoreCart)))
    );
    assert_eq!(ctx.stock_of(soap).await, 5);
    assert_eq!(ctx.stock_of(towel).await, 5);
}

#[tokio::test]
async fn insufficient_line_rolls_back_the_whole_checkout() {
    let Some(ctx) = context().await else { return };
    let store = ctx.store().await;
    let client = ctx.client().await;
    let soap = ctx.product(store, "Soap", 5).await;
    let towel = ctx.product(store, "Towel", 1).await;
    ctx.add_to_cart(client, soap, 2).await;
    ctx.add_to_cart(client, towel, 2).await;

    let mut conn = ctx.conn().await;
    let result = ctx.reservations.checkout(&mut conn, client).await;

    assert_matches!(
        result,
        Err(AppError::Domain(MarketplaceError::Rule(RuleViolation::InsufficientStock { product })))
            if product == "Towel"
    );
    assert_eq!(ctx.stock_of(soap).await, 5);
    assert_eq!(ctx.stock_of(towel).await, 1);
    assert_eq!(ctx.cart.view(&mut conn, client).await.unwrap().len(), 2);
}

#[tokio::test]
async fn empty_cart_cannot_be_checked_out() {
    let Some(ctx) = context().await else { return };
    let client = ctx.client().await;

    let mut conn = ctx.conn().await;
    let result = ctx.reservations.checkout(&mut conn, client).await;

    assert_matches!(
        result,
        Err(AppError::Domain(MarketplaceError::Rule(RuleViolation::EmptyCart)))
    );
}

#[tokio::test]
async fn sweep_restocks_once() {
    let Some(ctx) = context().await else { return };
    let store = ctx.store().await;
    let client = ctx.client().await;
    let soap = ctx.product(store, "Soap", 5).await;
    ctx.add_to_cart(client, soap, 3).await;

    let mut conn = ctx.conn().await;
    let receipt = ctx.reservations.checkout(&mut conn, client).await.unwrap();

    ctx.clock.advance(TimeDelta::days(1));
    assert!(ctx.reservations.expire_sweep(&mut conn, store).await.unwrap().is_empty());
    assert_eq!(ctx.stock_of(soap).await, 2);

    ctx.clock.advance(TimeDelta::days(1) + TimeDelta::seconds(1));
    let canceled = ctx.reservations.expire_sweep(&mut conn, store).await.unwrap();
    assert_eq!(canceled, vec![receipt.reservation_id]);
    assert_eq!(ctx.stock_of(soap).await, 5);

    let canceled = ctx.reservations.expire_sweep(&mut conn, store).await.unwrap();
    assert!(canceled.is_empty());
    assert_eq!(ctx.stock_of(soap).await, 5);

    let details = ctx
        .reservations
        .get(&mut conn, receipt.reservation_id, Actor::Client(client))
        .await
        .unwrap();
    assert_eq!(details.status, ReservationStatus::Canceled);
}

#[tokio::test]
async fn client_pickup_closes_with_the_window() {
    let Some(ctx) = context().await else { return };
    let store = ctx.store().await;
    let client = ctx.client().await;
    let soap = ctx.product(store, "Soap", 5).await;

    ctx.add_to_cart(client, soap, 1).await;
    let mut conn = ctx.conn().await;
    let on_time = ctx.reservations.checkout(&mut conn, client).await.unwrap();

    ctx.clock.advance(TimeDelta::days(1));
    let picked = ctx
        .reservations
        .mark_picked_up(&mut conn, on_time.reservation_id, Actor::Client(client))
        .await
        .unwrap();
    assert_eq!(picked.status, ReservationStatus::PickedUp);

    ctx.add_to_cart(client, soap, 1).await;
    let late = ctx.reservations.checkout(&mut conn, client).await.unwrap();
    ctx.clock.advance(TimeDelta::days(4) + TimeDelta::seconds(1));
    let result = ctx
        .reservations
        .mark_picked_up(&mut conn, late.reservation_id, Actor::Client(client))
        .await;
    assert_matches!(
        result,
        Err(AppError::Domain(MarketplaceError::Rule(RuleViolation::WindowExpired)))
    );
}

#[tokio::test]
async fn pickup_is_scoped_to_the_owner() {
    let Some(ctx) = context().await else { return };
    let store = ctx.store().await;
    let other_store = ctx.store().await;
    let client = ctx.client().await;
    let soap = ctx.product(store, "Soap", 5).await;
    ctx.add_to_cart(client, soap, 1).await;

    let mut conn = ctx.conn().await;
    let receipt = ctx.reservations.checkout(&mut conn, client).await.unwrap();

    let result = ctx
        .reservations
        .mark_picked_up(&mut conn, receipt.reservation_id, Actor::Store(other_store))
        .await;
    assert_matches!(
        result,
        Err(AppError::Domain(MarketplaceError::NotFound { entity: "reservation", .. }))
    );
    assert_matches!(
        ctx.reservations
            .get(&mut conn, receipt.reservation_id, Actor::Store(other_store))
            .await,
        Err(AppError::Domain(MarketplaceError::NotFound { entity: "reservation", .. }))
    );
    let visible = ctx
        .reservations
        .get(&mut conn, receipt.reservation_id, Actor::Store(store))
        .await
        .unwrap();
    assert_eq!(visible.items.len(), 1);
}

#[tokio::test]
async fn concurrent_checkouts_never_oversell() {
    let Some(ctx) = context().await else { return };
    let store = ctx.store().await;
    let first = ctx.client().await;
    let second = ctx.client().await;
    let soap = ctx.product(store, "Soap", 3).await;
    ctx.add_to_cart(first, soap, 2).await;
    ctx.add_to_cart(second, soap, 2).await;

    let mut conn_a = ctx.conn().await;
    let mut conn_b = ctx.conn().await;
    let (a, b) = futures::join!(
        ctx.reservations.checkout(&mut conn_a, first),
        ctx.reservations.checkout(&mut conn_b, second),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    assert_eq!(ctx.stock_of(soap).await, 1);
}

#[tokio::test]
async fn checkout_refuses_a_cart_spanning_two_stores() {
    let Some(ctx) = context().await else { return };
    let first = ctx.store().await;
    let second = ctx.store().await;
    let client = ctx.client().await;
    let soap = ctx.product(first, "Soap", 5).await;
    let towel = ctx.product(second, "Towel", 5).await;

    // Written straight to the table; `add_item` would refuse the second line.
    let mut conn = ctx.conn().await;
    let lines: Vec<CartItem> = [(soap, 2), (towel, 1)]
        .into_iter()
        .map(|(product_id, quantity)| CartItem {
            id: Uuid::new_v4(),
            client_id: client,
            product_id,
            quantity,
        })
        .collect();
    diesel::insert_into(cart_items::table)
        .values(&lines)
        .execute(&mut *conn)
        .await
        .unwrap();

    let result = ctx.reservations.checkout(&mut conn, client).await;

    assert_matches!(
        result,
        Err(AppError::Domain(MarketplaceError::Rule(RuleViolation::MixedStoreCart)))
    );
    assert_eq!(ctx.stock_of(soap).await, 5);
    assert_eq!(ctx.stock_of(towel).await, 5);
    assert_eq!(ctx.cart.view(&mut conn, client).await.unwrap().len(), 2);
    assert!(ctx.reservations.list_for_client(&mut conn, client).await.unwrap().is_empty());
}

#[tokio::test]
async fn line_added_during_checkout_stays_in_the_cart() {
    let Some(ctx) = context().await else { return };
    let store = ctx.store().await;
    let client = ctx.client().await;
    let soap = ctx.product(store, "Soap", 5).await;
    let towel = ctx.product(store, "Towel", 5).await;
    ctx.add_to_cart(client, soap, 1).await;

    // Hold soap's row so checkout stalls after it has read the cart.
    let mut blocker = ctx.conn().await;
    diesel::sql_query("BEGIN").execute(&mut *blocker).await.unwrap();
    diesel::sql_query(format!("SELECT id FROM products WHERE id = '{soap}' FOR UPDATE"))
        .execute(&mut *blocker)
        .await
        .unwrap();

    let mut checkout_conn = ctx.conn().await;
    let mut cart_conn = ctx.conn().await;
    let (receipt, added, ()) = futures::join!(
        ctx.reservations.checkout(&mut checkout_conn, client),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            ctx.cart.add_item(&mut cart_conn, client, towel, 2).await
        },
        async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            diesel::sql_query("COMMIT").execute(&mut *blocker).await.unwrap();
        },
    );
    let receipt = receipt.unwrap();
    added.unwrap();

    let mut conn = ctx.conn().await;
    let details = ctx
        .reservations
        .get(&mut conn, receipt.reservation_id, Actor::Client(client))
        .await
        .unwrap();
    assert_eq!(details.items.len(), 1);
    assert_eq!(details.items[0].product_id, soap);

    let cart = ctx.cart.view(&mut conn, client).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].product_id, towel);
    assert_eq!(cart[0].quantity, 2);
    assert_eq!(ctx.stock_of(towel).await, 5);
    assert_eq!(ctx.stock_of(soap).await, 4);
}
