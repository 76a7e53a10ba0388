use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::json;
use shared::{MarketplaceError, RuleViolation};

/// Error type for every manager operation and HTTP handler.
///
/// Domain failures travel as [`MarketplaceError`]; the other variants are
/// infrastructure problems and surface as a generic 500.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] MarketplaceError),

    #[error("database error: {0}")]
    Database(#[from] DieselError),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<RuleViolation> for AppError {
    fn from(rule: RuleViolation) -> Self {
        AppError::Domain(MarketplaceError::Rule(rule))
    }
}

impl From<bb8::RunError<diesel_async::pooled_connection::PoolError>> for AppError {
    fn from(err: bb8::RunError<diesel_async::pooled_connection::PoolError>) -> Self {
        AppError::Pool(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        MarketplaceError::not_found(entity, id).into()
    }

    pub fn validation(message: impl Into<String>) -> Self {
        MarketplaceError::validation(message).into()
    }

    /// Status, machine code and client-facing message.
    pub fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Domain(domain) => match domain {
                MarketplaceError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", domain.to_string())
                }
                MarketplaceError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                MarketplaceError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    domain.to_string(),
                ),
                MarketplaceError::Rule(rule) => {
                    (StatusCode::BAD_REQUEST, rule.code(), rule.to_string())
                }
            },
            AppError::Database(err) => classify_diesel_error(err),
            AppError::Pool(msg) | AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.classify();
        let body = json!({
            "error": message,
            "code": code,
        });
        (status, Json(body)).into_response()
    }
}

fn classify_diesel_error(err: &DieselError) -> (StatusCode, &'static str, String) {
    match err {
        DieselError::NotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => (
            StatusCode::BAD_REQUEST,
            "CONSTRAINT_VIOLATION",
            format!("Duplicate value: {}", info.constraint_name().unwrap_or("unknown")),
        ),
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => (
            StatusCode::BAD_REQUEST,
            "CONSTRAINT_VIOLATION",
            format!(
                "Record is still referenced: {}",
                info.constraint_name().unwrap_or("unknown")
            ),
        ),
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => (
            StatusCode::BAD_REQUEST,
            "CONSTRAINT_VIOLATION",
            format!("Check failed: {}", info.constraint_name().unwrap_or("unknown")),
        ),
        other => {
            tracing::error!(error = %other, "database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let (status, json) = error_to_response(AppError::not_found("store", "abc")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["error"], "store abc not found");
    }

    #[tokio::test]
    async fn rule_violations_map_to_400_with_their_code() {
        let (status, json) = error_to_response(RuleViolation::TooLateToCancel.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "TOO_LATE_TO_CANCEL");

        let (status, json) = error_to_response(
            RuleViolation::InsufficientStock {
                product: "soap".into(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INSUFFICIENT_STOCK");
        assert_eq!(json["error"], "insufficient stock for product soap");
    }

    #[tokio::test]
    async fn invalid_credentials_map_to_401() {
        let err: AppError = MarketplaceError::InvalidCredentials.into();
        let (status, json) = error_to_response(err).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn validation_maps_to_400() {
        let (status, json) = error_to_response(AppError::validation("name is required")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"], "name is required");
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let (status, json) = error_to_response(AppError::Internal("disk on fire".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "An internal error occurred");
    }

    #[tokio::test]
    async fn diesel_not_found_maps_to_404() {
        let (status, _) = error_to_response(DieselError::NotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
