//! Business time windows.
//!
//! Every comparison is done against a UTC instant supplied by the caller's
//! clock; nothing in here reads the system time.

use chrono::{DateTime, Duration, Utc};

/// How long a product reservation is held before the sweep may cancel it.
pub fn reservation_hold() -> Duration {
    Duration::days(2)
}

/// Hard cutoff after which neither the client nor the sweep keeps a reservation.
pub fn pickup_cutoff() -> Duration {
    Duration::days(4)
}

/// Minimum notice required to cancel an appointment.
pub fn cancel_notice() -> Duration {
    Duration::hours(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationWindow {
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub pickup_deadline: DateTime<Utc>,
}

impl ReservationWindow {
    pub fn starting_at(reserved_at: DateTime<Utc>) -> Self {
        Self {
            reserved_at,
            expires_at: reserved_at + reservation_hold(),
            pickup_deadline: reserved_at + pickup_cutoff(),
        }
    }

    /// The two expiry rules are a union: either one is enough.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at || now > self.pickup_deadline
    }

    pub fn past_pickup_cutoff(&self, now: DateTime<Utc>) -> bool {
        now > self.pickup_deadline
    }
}

pub fn within_cancel_notice(scheduled_for: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    scheduled_for - now < cancel_notice()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, hour, 0, 0).unwrap()
    }

    #[test]
    fn window_derives_expiry_and_deadline() {
        let window = ReservationWindow::starting_at(at(9));
        assert_eq!(window.expires_at, at(9) + Duration::days(2));
        assert_eq!(window.pickup_deadline, at(9) + Duration::days(4));
    }

    #[test]
    fn not_expired_exactly_at_boundary() {
        let window = ReservationWindow::starting_at(at(9));
        assert!(!window.is_expired(window.expires_at));
        assert!(window.is_expired(window.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn cutoff_alone_expires_even_with_late_stored_expiry() {
        // Rows whose stored expiry was pushed out still fall to the 4 day rule.
        let mut window = ReservationWindow::starting_at(at(9));
        window.expires_at = at(9) + Duration::days(10);
        assert!(!window.is_expired(at(9) + Duration::days(3)));
        assert!(window.is_expired(at(9) + Duration::days(4) + Duration::minutes(1)));
    }

    #[test]
    fn cancel_notice_is_one_hour() {
        let slot = at(15);
        assert!(within_cancel_notice(slot, slot - Duration::minutes(30)));
        assert!(within_cancel_notice(slot, slot - Duration::minutes(59)));
        assert!(!within_cancel_notice(slot, slot - Duration::hours(1)));
        assert!(!within_cancel_notice(slot, slot - Duration::hours(2)));
    }
}
