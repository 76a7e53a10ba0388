//! Domain vocabulary and business rules for the marketplace.
//!
//! Everything here is pure: callers load rows, hand them to these checks and
//! persist whatever transition comes back.

pub mod appointment;
pub mod checkout;
pub mod error;
pub mod reservation;
pub mod slots;
pub mod status;
pub mod stock;
pub mod windows;

pub use error::{MarketplaceError, RuleViolation};
pub use status::{Actor, AppointmentStatus, ReservationStatus};
