use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Reserved,
    PickedUp,
    Canceled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Reserved => "RESERVED",
            ReservationStatus::PickedUp => "PICKED_UP",
            ReservationStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESERVED" => Ok(ReservationStatus::Reserved),
            "PICKED_UP" => Ok(ReservationStatus::PickedUp),
            "CANCELED" => Ok(ReservationStatus::Canceled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Lifecycle of a service appointment.
///
/// `Pending` and `Accepted` hold the slot; `Rejected` and `Canceled` are sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Pending,
    Accepted,
    Rejected,
    Canceled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Accepted => "ACCEPTED",
            AppointmentStatus::Rejected => "REJECTED",
            AppointmentStatus::Canceled => "CANCELED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Rejected | AppointmentStatus::Canceled)
    }

    /// Statuses that still occupy the client's day.
    pub fn active() -> [AppointmentStatus; 2] {
        [AppointmentStatus::Pending, AppointmentStatus::Accepted]
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AppointmentStatus::Pending),
            "ACCEPTED" => Ok(AppointmentStatus::Accepted),
            "REJECTED" => Ok(AppointmentStatus::Rejected),
            "CANCELED" => Ok(AppointmentStatus::Canceled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status {0:?}")]
pub struct UnknownStatus(pub String);

/// Who is acting on a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Store(Uuid),
    Client(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_status_round_trips_through_column_text() {
        for status in [
            ReservationStatus::Reserved,
            ReservationStatus::PickedUp,
            ReservationStatus::Canceled,
        ] {
            assert_eq!(status.as_str().parse::<ReservationStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_eq!(
            "RETIRADO".parse::<ReservationStatus>(),
            Err(UnknownStatus("RETIRADO".to_string()))
        );
        assert!("accepted".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn terminal_appointment_statuses() {
        assert!(!AppointmentStatus::Pending.is_terminal());
        assert!(!AppointmentStatus::Accepted.is_terminal());
        assert!(AppointmentStatus::Rejected.is_terminal());
        assert!(AppointmentStatus::Canceled.is_terminal());
    }

    #[test]
    fn statuses_serialize_as_screaming_snake_case() {
        let json = serde_json::to_string(&ReservationStatus::PickedUp).unwrap();
        assert_eq!(json, "\"PICKED_UP\"");
    }
}
