use chrono::NaiveDate;

/// Domain-level failures shared by every marketplace operation.
///
/// HTTP status mapping lives in the service crate; this type only carries
/// what went wrong.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarketplaceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Rule(#[from] RuleViolation),
}

impl MarketplaceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Business rules that reject an otherwise well-formed request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    #[error("insufficient stock for product {product}")]
    InsufficientStock { product: String },

    #[error("cart holds products from more than one store")]
    MixedStoreCart,

    #[error("cart is empty")]
    EmptyCart,

    #[error("slot is unavailable or does not belong to this service")]
    SlotUnavailable,

    #[error("client already has an appointment on {date}")]
    DoubleBookingSameDay { date: NaiveDate },

    #[error("appointment is already accepted")]
    AlreadyAccepted,

    #[error("appointment is already rejected")]
    AlreadyRejected,

    #[error("appointment is already {status}")]
    AlreadyTerminal { status: String },

    #[error("appointments cannot be canceled less than one hour before they start")]
    TooLateToCancel,

    #[error("pickup window has expired")]
    WindowExpired,

    #[error("content type {content_type} is not an image")]
    InvalidContentType { content_type: String },

    #[error("reservation cannot be picked up while {status}")]
    InvalidReservationStatus { status: String },
}

impl RuleViolation {
    /// Stable machine-readable code for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            RuleViolation::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            RuleViolation::MixedStoreCart => "MIXED_STORE_CART",
            RuleViolation::EmptyCart => "EMPTY_CART",
            RuleViolation::SlotUnavailable => "SLOT_UNAVAILABLE",
            RuleViolation::DoubleBookingSameDay { .. } => "DOUBLE_BOOKING_SAME_DAY",
            RuleViolation::AlreadyAccepted => "ALREADY_ACCEPTED",
            RuleViolation::AlreadyRejected => "ALREADY_REJECTED",
            RuleViolation::AlreadyTerminal { .. } => "ALREADY_TERMINAL",
            RuleViolation::TooLateToCancel => "TOO_LATE_TO_CANCEL",
            RuleViolation::WindowExpired => "WINDOW_EXPIRED",
            RuleViolation::InvalidContentType { .. } => "INVALID_CONTENT_TYPE",
            RuleViolation::InvalidReservationStatus { .. } => "INVALID_RESERVATION_STATUS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_violation_converts_into_marketplace_error() {
        let err: MarketplaceError = RuleViolation::MixedStoreCart.into();
        assert_eq!(err, MarketplaceError::Rule(RuleViolation::MixedStoreCart));
        assert_eq!(err.to_string(), "cart holds products from more than one store");
    }

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = MarketplaceError::not_found("product", 42);
        assert_eq!(err.to_string(), "product 42 not found");
    }
}
