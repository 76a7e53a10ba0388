//! Operations against the database.
//!
//! Every manager method takes the caller's checked-out connection and opens
//! its own transaction around any multi-row mutation, so a request either
//! applies completely or not at all.

pub mod accounts;
pub mod appointments;
pub mod cart;
pub mod catalog;
pub mod reservations;
pub mod slots;
pub mod stock;

use diesel_async::pooled_connection::bb8::Pool;
use diesel_async::AsyncPgConnection;
use mockable::Clock;
use std::sync::Arc;

pub type DbPool = Pool<AsyncPgConnection>;

/// The single UTC time source used by every time-window rule.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

pub use accounts::AccountManager;
pub use appointments::AppointmentManager;
pub use cart::CartManager;
pub use catalog::CatalogManager;
pub use reservations::ReservationManager;
pub use slots::SlotManager;
pub use stock::StockLedger;

pub(crate) fn require_text(
    value: Option<String>,
    field: &str,
) -> Result<String, crate::error::AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(crate::error::AppError::validation(format!("{field} is required"))),
    }
}
