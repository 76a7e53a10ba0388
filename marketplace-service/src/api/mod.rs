mod browse;
mod clients;
mod form;
mod json;
mod stores;

use axum::routing::{delete, get, post, put};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::blob::BlobStore;
use crate::credentials::CredentialService;
use crate::handlers::{
    AccountManager, AppointmentManager, CartManager, CatalogManager, DbPool, ReservationManager,
    SharedClock, SlotManager,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub accounts: Arc<AccountManager>,
    pub catalog: Arc<CatalogManager>,
    pub cart: Arc<CartManager>,
    pub reservations: Arc<ReservationManager>,
    pub slots: Arc<SlotManager>,
    pub appointments: Arc<AppointmentManager>,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        clock: SharedClock,
        credentials: Arc<dyn CredentialService>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            pool,
            accounts: Arc::new(AccountManager::new(credentials, blobs.clone())),
            catalog: Arc::new(CatalogManager::new(blobs)),
            cart: Arc::new(CartManager),
            reservations: Arc::new(ReservationManager::new(clock.clone())),
            slots: Arc::new(SlotManager),
            appointments: Arc::new(AppointmentManager::new(clock)),
        }
    }
}

pub fn create_router(state: AppState, images_dir: &Path) -> Router {
    let client_routes = Router::new()
        .route("/", post(clients::register))
        .route("/login", post(clients::login))
        .route("/:client_id/profile", put(clients::update_profile))
        .route(
            "/:client_id/cart",
            get(clients::view_cart).post(clients::add_to_cart).delete(clients::remove_from_cart),
        )
        .route("/:client_id/cart/checkout", post(clients::checkout))
        .route("/:client_id/reservations", get(clients::reservations))
        .route("/:client_id/reservations/:reservation_id", get(clients::reservation))
        .route("/:client_id/reservations/:reservation_id/pickup", put(clients::pickup))
        .route("/:client_id/services/:service_id/appointments", post(clients::book))
        .route("/:client_id/appointments/:appointment_id/cancel", put(clients::cancel_appointment))
        .route("/:client_id/agenda", get(clients::agenda));

    let store_routes = Router::new()
        .route("/", get(stores::list).post(stores::register))
        .route("/login", post(stores::login))
        .route("/:store_id", get(stores::get_one))
        .route("/:store_id/profile", put(stores::update_profile))
        .route("/:store_id/products", get(stores::list_products).post(stores::create_product))
        .route("/:store_id/products/:product_id", delete(stores::delete_product))
        .route("/:store_id/reservations", get(stores::reservations))
        .route("/:store_id/reservations/expire", put(stores::expire_reservations))
        .route("/:store_id/reservations/:reservation_id", get(stores::reservation))
        .route("/:store_id/reservations/:reservation_id/pickup", put(stores::pickup))
        .route("/:store_id/services", get(stores::list_services).post(stores::create_service))
        .route("/:store_id/services/:service_id", delete(stores::delete_service))
        .route(
            "/:store_id/services/:service_id/slots",
            get(stores::list_slots).post(stores::create_slots),
        )
        .route("/:store_id/agenda", get(stores::agenda))
        .route("/:store_id/appointments/:appointment_id/accept", put(stores::accept_appointment))
        .route("/:store_id/appointments/:appointment_id/reject", put(stores::reject_appointment));

    Router::new()
        .route("/health", get(health_check))
        .route("/products", get(browse::search_products))
        .route("/services", get(browse::search_services))
        .route("/services/:service_id/slots/available", get(browse::available_slots))
        .nest("/clients", client_routes)
        .nest("/stores", store_routes)
        .nest_service("/images", ServeDir::new(images_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

pub async fn health_check() -> &'static str {
    "OK"
}
