//! Shared fixtures for the database-backed tests.
//!
//! These tests need a reachable Postgres. When `DATABASE_URL` is unset they
//! return early instead of failing.

#![allow(dead_code)]

use bigdecimal::BigDecimal;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use diesel::prelude::*;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use mockable::Clock;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use uuid::Uuid;

use marketplace_service::handlers::{
    AppointmentManager, CartManager, DbPool, ReservationManager, SharedClock, SlotManager,
};
use marketplace_service::models::{NewClient, NewProduct, NewService, NewStore};
use marketplace_service::schema::{clients, products, services, stores};
use marketplace_service::{build_pool, run_migrations};

pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock_clock() = now;
    }

    pub fn advance(&self, delta: TimeDelta) {
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 3, 10, 12, 0, 0).unwrap()
}

pub struct TestContext {
    pub pool: DbPool,
    pub clock: Arc<MutableClock>,
    pub reservations: ReservationManager,
    pub appointments: AppointmentManager,
    pub cart: CartManager,
    pub slots: SlotManager,
}

static MIGRATED: OnceLock<()> = OnceLock::new();

/// Builds a context against `DATABASE_URL`, or `None` when it is not set.
pub async fn context() -> Option<TestContext> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };
    MIGRATED.get_or_init(|| run_migrations(&url).expect("migrations"));

    let pool = build_pool(&url, 8).await.expect("pool");
    let clock = Arc::new(MutableClock::new(fixed_now()));
    let shared: SharedClock = clock.clone();

    Some(TestContext {
        pool,
        reservations: ReservationManager::new(shared.clone()),
        appointments: AppointmentManager::new(shared),
        cart: CartManager,
        slots: SlotManager,
        clock,
    })
}

impl TestContext {
    pub async fn conn(&self) -> PooledConnection<'_, AsyncPgConnection> {
        self.pool.get().await.expect("connection")
    }

    pub async fn store(&self) -> Uuid {
        let id = Uuid::new_v4();
        let mut conn = self.conn().await;
        diesel::insert_into(stores::table)
            .values(&NewStore {
                id,
                name: format!("Store {id}"),
                cnpj: id.to_string(),
                cep: "01001-000".into(),
                address: "Praca da Se".into(),
                complement: None,
                lot: None,
                password_hash: "unused".into(),
                latitude: None,
                longitude: None,
            })
            .execute(&mut *conn)
            .await
            .expect("insert store");
        id
    }

    pub async fn client(&self) -> Uuid {
        let id = Uuid::new_v4();
        let mut conn = self.conn().await;
        diesel::insert_into(clients::table)
            .values(&NewClient {
                id,
                name: "Ana".into(),
                age: 30,
                cpf: id.to_string(),
                password_hash: "unused".into(),
            })
            .execute(&mut *conn)
            .await
            .expect("insert client");
        id
    }

    pub async fn product(&self, store_id: Uuid, name: &str, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        let mut conn = self.conn().await;
        diesel::insert_into(products::table)
            .values(&NewProduct {
                id,
                store_id,
                name: name.into(),
                price: BigDecimal::from_str("9.90").unwrap(),
                stock_quantity: stock,
                image_path: None,
            })
            .execute(&mut *conn)
            .await
            .expect("insert product");
        id
    }

    pub async fn service(&self, store_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        let mut conn = self.conn().await;
        diesel::insert_into(services::table)
            .values(&NewService {
                id,
                store_id,
                name: "Haircut".into(),
                description: String::new(),
                price: BigDecimal::from(40),
            })
            .execute(&mut *conn)
            .await
            .expect("insert service");
        id
    }

    /// Creates one slot at `starts_at` and returns its id.
    pub async fn slot(&self, store_id: Uuid, service_id: Uuid, starts_at: DateTime<Utc>) -> Uuid {
        let mut conn = self.conn().await;
        let created = self
            .slots
            .create_slots(&mut conn, store_id, service_id, &[starts_at.to_rfc3339()])
            .await
            .expect("create slot");
        created.created[0].id
    }

    pub async fn stock_of(&self, product_id: Uuid) -> i32 {
        let mut conn = self.conn().await;
        products::table
            .find(product_id)
            .select(products::stock_quantity)
            .first(&mut *conn)
            .await
            .expect("stock")
    }

    pub async fn add_to_cart(&self, client_id: Uuid, product_id: Uuid, quantity: i32) {
        let mut conn = self.conn().await;
        self.cart
            .add_item(&mut conn, client_id, product_id, quantity)
            .await
            .expect("add to cart");
    }
}
