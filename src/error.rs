//! Application error type shared by every layer.
//!
//! Each variant carries a human-readable message and a JSON `details` object
//! so that API clients receive a stable, machine-readable error payload.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

/// Constraint that guards one affiliate record per user account.
pub const AFFILIATE_USER_CONSTRAINT: &str = "affiliates_user_id_key";
pub const AFFILIATE_CODE_CONSTRAINT: &str = "affiliates_affiliate_code_key";
pub const LINK_SHORT_CODE_CONSTRAINT: &str = "affiliate_links_short_code_key";
pub const WITHDRAWAL_REFERENCE_CONSTRAINT: &str = "affiliate_withdrawals_reference_key";
/// Partial unique index allowing one PENDING/CONFIRMED referral per pair.
pub const OPEN_REFERRAL_CONSTRAINT: &str = "affiliate_referrals_open_pair_idx";

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

/// Serializable error payload used in API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, details: Value },

    #[error("{message}")]
    NotFound { message: String, details: Value },

    #[error("{message}")]
    InvalidState { message: String, details: Value },

    #[error("{message}")]
    InsufficientBalance { message: String, details: Value },

    #[error("{message}")]
    BelowMinimumPayout { message: String, details: Value },

    #[error("{message}")]
    AlreadyAffiliate { message: String, details: Value },

    #[error("{message}")]
    Conflict { message: String, details: Value },

    #[error("{message}")]
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }

    pub fn invalid_state(message: impl Into<String>, details: Value) -> Self {
        Self::InvalidState {
            message: message.into(),
            details,
        }
    }

    pub fn insufficient_balance(message: impl Into<String>, details: Value) -> Self {
        Self::InsufficientBalance {
            message: message.into(),
            details,
        }
    }

    pub fn below_minimum_payout(message: impl Into<String>, details: Value) -> Self {
        Self::BelowMinimumPayout {
            message: message.into(),
            details,
        }
    }

    pub fn already_affiliate(message: impl Into<String>, details: Value) -> Self {
        Self::AlreadyAffiliate {
            message: message.into(),
            details,
        }
    }

    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details,
        }
    }

    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }

    /// Returns true for store-level unique violations that a caller may retry
    /// with a freshly generated value.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns the name of the violated constraint, if this is a conflict.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            Self::Conflict { details, .. } => details.get("constraint").and_then(Value::as_str),
            _ => None,
        }
    }

    fn parts(&self) -> (StatusCode, &'static str, &String, &Value) {
        match self {
            AppError::Validation { message, details } => {
                (StatusCode::BAD_REQUEST, "validation_error", message, details)
            }
            AppError::NotFound { message, details } => {
                (StatusCode::NOT_FOUND, "not_found", message, details)
            }
            AppError::InvalidState { message, details } => {
                (StatusCode::CONFLICT, "invalid_state", message, details)
            }
            AppError::InsufficientBalance { message, details } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_balance",
                message,
                details,
            ),
            AppError::BelowMinimumPayout { message, details } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "below_minimum_payout",
                message,
                details,
            ),
            AppError::AlreadyAffiliate { message, details } => {
                (StatusCode::CONFLICT, "already_affiliate", message, details)
            }
            AppError::Conflict { message, details } => {
                (StatusCode::CONFLICT, "conflict", message, details)
            }
            AppError::Internal { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
                details,
            ),
        }
    }

    /// Converts the error into the payload embedded in API responses.
    pub fn to_error_info(&self) -> ErrorInfo {
        let (_, code, message, details) = self.parts();
        ErrorInfo {
            code,
            message: message.clone(),
            details: details.clone(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_error_info(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error()
            && db.is_unique_violation()
        {
            let constraint = db.constraint().map(str::to_string);
            if constraint.as_deref() == Some(AFFILIATE_USER_CONSTRAINT) {
                return AppError::already_affiliate(
                    "User is already registered as an affiliate",
                    json!({ "constraint": constraint }),
                );
            }
            return AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": constraint }),
            );
        }

        if let Some(db) = e.as_database_error()
            && db.is_check_violation()
        {
            return AppError::invalid_state(
                "Store constraint rejected the update",
                json!({ "constraint": db.constraint() }),
            );
        }

        tracing::error!("Database error: {}", e);
        AppError::internal("Database error", json!({}))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::bad_request("Request validation failed", json!(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::not_found("x", json!({})).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::insufficient_balance("x", json!({})).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::already_affiliate("x", json!({})).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_display_uses_message() {
        let err = AppError::invalid_state("Affiliate is not active", json!({ "id": 7 }));
        assert_eq!(err.to_string(), "Affiliate is not active");
    }

    #[test]
    fn test_constraint_on_conflict() {
        let err = AppError::conflict("dup", json!({ "constraint": "affiliate_links_short_code_key" }));
        assert!(err.is_conflict());
        assert_eq!(err.constraint(), Some("affiliate_links_short_code_key"));

        let other = AppError::internal("boom", json!({}));
        assert!(!other.is_conflict());
        assert_eq!(other.constraint(), None);
    }

    #[test]
    fn test_error_info_code() {
        let info = AppError::below_minimum_payout("too small", json!({ "minimum": "50" }))
            .to_error_info();
        assert_eq!(info.code, "below_minimum_payout");
        assert_eq!(info.message, "too small");
    }
}
