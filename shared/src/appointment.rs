//! Transition rules for service appointments.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::RuleViolation;
use crate::status::AppointmentStatus;
use crate::windows;

/// The slot as seen at booking time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotView {
    pub service_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub is_available: bool,
}

pub fn check_slot(
    slot: Option<&SlotView>,
    service_id: Uuid,
) -> Result<DateTime<Utc>, RuleViolation> {
    match slot {
        Some(slot) if slot.service_id == service_id && slot.is_available => Ok(slot.starts_at),
        _ => Err(RuleViolation::SlotUnavailable),
    }
}

/// Calendar day (UTC) a booking falls on.
pub fn booking_day(starts_at: DateTime<Utc>) -> NaiveDate {
    starts_at.date_naive()
}

/// One live appointment per client per day; rejected and canceled ones free the day.
pub fn check_same_day(
    existing: &[(AppointmentStatus, DateTime<Utc>)],
    starts_at: DateTime<Utc>,
) -> Result<(), RuleViolation> {
    let date = booking_day(starts_at);
    let clash = existing
        .iter()
        .any(|(status, at)| !status.is_terminal() && booking_day(*at) == date);
    if clash {
        return Err(RuleViolation::DoubleBookingSameDay { date });
    }
    Ok(())
}

pub fn check_accept(status: AppointmentStatus) -> Result<AppointmentStatus, RuleViolation> {
    match status {
        AppointmentStatus::Pending => Ok(AppointmentStatus::Accepted),
        AppointmentStatus::Accepted => Err(RuleViolation::AlreadyAccepted),
        terminal => Err(RuleViolation::AlreadyTerminal {
            status: terminal.to_string(),
        }),
    }
}

pub fn check_reject(status: AppointmentStatus) -> Result<AppointmentStatus, RuleViolation> {
    match status {
        AppointmentStatus::Pending | AppointmentStatus::Accepted => Ok(AppointmentStatus::Rejected),
        AppointmentStatus::Rejected => Err(RuleViolation::AlreadyRejected),
        AppointmentStatus::Canceled => Err(RuleViolation::AlreadyTerminal {
            status: AppointmentStatus::Canceled.to_string(),
        }),
    }
}

pub fn check_cancel(
    status: AppointmentStatus,
    scheduled_for: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<AppointmentStatus, RuleViolation> {
    if status.is_terminal() {
        return Err(RuleViolation::AlreadyTerminal {
            status: status.to_string(),
        });
    }
    if windows::within_cancel_notice(scheduled_for, now) {
        return Err(RuleViolation::TooLateToCancel);
    }
    Ok(AppointmentStatus::Canceled)
}
