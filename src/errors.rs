use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::BookingStatus;

/// Every core operation surfaces one of these; callers never see an
/// unstructured failure. Store/transport problems are distinct from domain
/// rejections so availability can be reported as unknown rather than open.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("slot unavailable")]
    SlotUnavailable,

    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("booking already validated")]
    AlreadyValidated,

    #[error("booking not validatable from status {0:?}")]
    NotValidatable(BookingStatus),

    #[error("booking voided but ledger update pending: {0}")]
    PartialVoidFailure(String),

    #[error("void reason must not be empty")]
    MissingReason,

    #[error("payment failed: {0}")]
    PaymentFailed(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Store(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::SlotUnavailable => StatusCode::CONFLICT,
            AppError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::AlreadyValidated => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotValidatable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PartialVoidFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MissingReason => StatusCode::BAD_REQUEST,
            AppError::PaymentFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let AppError::PartialVoidFailure(detail) = &self {
            // Operators reconcile these by re-issuing the void; never retry blindly.
            tracing::error!(detail = %detail, "partial void failure, ledger pending");
        }

        let body = serde_json::json!({ "error": self.to_string(), "kind": self.kind() });
        (status, axum::Json(body)).into_response()
    }
}

impl AppError {
    /// Stable machine-readable discriminant for clients.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::SlotUnavailable => "slot_unavailable",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::AlreadyValidated => "already_validated",
            AppError::NotValidatable(_) => "not_validatable",
            AppError::PartialVoidFailure(_) => "partial_void_failure",
            AppError::MissingReason => "missing_reason",
            AppError::PaymentFailed(_) => "payment_failed",
            AppError::BadRequest(_) => "bad_request",
            AppError::NotFound(_) => "not_found",
            AppError::Store(_) => "store_unavailable",
        }
    }
}
