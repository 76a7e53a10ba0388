use chrono::{DateTime, Utc};

use crate::error::RuleViolation;
use crate::status::{Actor, ReservationStatus};
use crate::windows::ReservationWindow;

/// Decides whether `actor` may mark a reservation as picked up at `now`.
///
/// Stores hand goods over physically and are only bound by status. Clients
/// confirming on their own are also bound by the four day cutoff.
pub fn check_pickup(
    status: ReservationStatus,
    window: &ReservationWindow,
    actor: Actor,
    now: DateTime<Utc>,
) -> Result<ReservationStatus, RuleViolation> {
    if status != ReservationStatus::Reserved {
        return Err(RuleViolation::InvalidReservationStatus {
            status: status.to_string(),
        });
    }

    if let Actor::Client(_) = actor {
        if window.past_pickup_cutoff(now) {
            return Err(RuleViolation::WindowExpired);
        }
    }

    Ok(ReservationStatus::PickedUp)
}

/// Only live reservations past either window are swept.
pub fn should_expire(
    status: ReservationStatus,
    window: &ReservationWindow,
    now: DateTime<Utc>,
) -> bool {
    status == ReservationStatus::Reserved && window.is_expired(now)
}
