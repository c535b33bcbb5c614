//! Promotion Error Types
//!
//! Every rejection the redemption path can produce has its own variant and
//! its own machine-readable code, so callers can tell "sold out" from
//! "expired" from "retry later". Variants integrate with the unified
//! `kernel::error::AppError` system for rendering.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use std::time::Duration;
use thiserror::Error;

/// Promotion-specific result type alias
pub type PromotionResult<T> = Result<T, PromotionError>;

/// Promotion-specific error variants
#[derive(Debug, Error)]
pub enum PromotionError {
    /// Admission controller denied the request
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: Duration },

    #[error("Coupon not found")]
    CouponNotFound,

    #[error("Campaign not found")]
    CampaignNotFound,

    #[error("Promotion is not active")]
    Inactive,

    /// Outside the `[start, end)` validity window
    #[error("Promotion is not valid at this time")]
    Expired,

    #[error("Coupon usage limit reached")]
    LimitReached,

    #[error("Purchase amount does not meet the minimum of {required}")]
    MinPurchaseNotMet { required: f64 },

    #[error("Invalid campaign conditions: {0}")]
    InvalidConditions(String),

    #[error("Unknown promotion type: {0}")]
    UnknownPromotionType(String),

    /// Transient store failure; the only retryable kind
    #[error("Promotion store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Coupon code already exists")]
    CodeTaken,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PromotionError {
    /// An update would leave a limited coupon with more uses than its limit
    pub(crate) fn usage_limit_below_count(used_count: u32) -> Self {
        PromotionError::Validation(format!(
            "usage_limit cannot be lowered below the {used_count} redemptions already counted"
        ))
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            PromotionError::RateLimited { .. } => "RATE_LIMITED",
            PromotionError::CouponNotFound | PromotionError::CampaignNotFound => "NOT_FOUND",
            PromotionError::Inactive => "PROMOTION_INACTIVE",
            PromotionError::Expired => "PROMOTION_EXPIRED",
            PromotionError::LimitReached => "USAGE_LIMIT_REACHED",
            PromotionError::MinPurchaseNotMet { .. } => "MIN_PURCHASE_NOT_MET",
            PromotionError::InvalidConditions(_) => "INVALID_CONDITIONS",
            PromotionError::UnknownPromotionType(_) => "UNKNOWN_PROMOTION_TYPE",
            PromotionError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            PromotionError::CodeTaken => "CODE_TAKEN",
            PromotionError::Validation(_) => "VALIDATION_FAILED",
            PromotionError::Database(_) | PromotionError::Internal(_) => "INTERNAL",
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PromotionError::RateLimited { .. } => ErrorKind::TooManyRequests,
            PromotionError::CouponNotFound | PromotionError::CampaignNotFound => {
                ErrorKind::NotFound
            }
            PromotionError::Inactive
            | PromotionError::Expired
            | PromotionError::MinPurchaseNotMet { .. }
            | PromotionError::InvalidConditions(_)
            | PromotionError::UnknownPromotionType(_) => ErrorKind::UnprocessableEntity,
            PromotionError::LimitReached | PromotionError::CodeTaken => ErrorKind::Conflict,
            PromotionError::Validation(_) => ErrorKind::BadRequest,
            PromotionError::StoreUnavailable(_) => ErrorKind::ServiceUnavailable,
            PromotionError::Database(_) | PromotionError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Only a transient store failure may succeed on a plain retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, PromotionError::StoreUnavailable(_))
    }

    fn action(&self) -> Option<&'static str> {
        match self {
            PromotionError::RateLimited { .. } => Some("Slow down and retry after the indicated delay"),
            PromotionError::LimitReached => Some("This coupon has been fully redeemed"),
            PromotionError::Expired => Some("Use a promotion that is currently valid"),
            PromotionError::MinPurchaseNotMet { .. } => Some("Increase the purchase amount"),
            PromotionError::StoreUnavailable(_) => Some("Please retry later"),
            _ => None,
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        // Server-side details stay in the logs.
        let message = match self {
            PromotionError::Database(_) | PromotionError::Internal(_) => {
                "Internal error".to_string()
            }
            PromotionError::StoreUnavailable(_) => "Promotion store unavailable".to_string(),
            other => other.to_string(),
        };
        let err = AppError::new(self.kind(), message).with_code(self.code());
        match self.action() {
            Some(action) => err.with_action(action),
            None => err,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            PromotionError::Database(e) => {
                tracing::error!(error = %e, "Promotion database error");
            }
            PromotionError::Internal(msg) => {
                tracing::error!(message = %msg, "Promotion internal error");
            }
            PromotionError::StoreUnavailable(msg) => {
                tracing::warn!(message = %msg, "Promotion store unavailable");
            }
            PromotionError::RateLimited { retry_after } => {
                tracing::warn!(
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Promotion request rate limited"
                );
            }
            PromotionError::LimitReached => {
                tracing::warn!("Coupon redemption rejected: usage limit reached");
            }
            _ => {
                tracing::debug!(error = %self, code = self.code(), "Promotion request rejected");
            }
        }
    }
}

impl From<sqlx::Error> for PromotionError {
    fn from(err: sqlx::Error) -> Self {
        // Reuse the kernel's classification of transient database failures.
        let classified = AppError::from(err);
        if classified.kind() == ErrorKind::ServiceUnavailable {
            return PromotionError::StoreUnavailable(classified.message().to_string());
        }
        let message = classified.message().to_string();
        match classified
            .into_source()
            .and_then(|source| source.downcast::<sqlx::Error>().ok())
        {
            Some(err) => PromotionError::Database(*err),
            None => PromotionError::Internal(message),
        }
    }
}

impl From<PromotionError> for AppError {
    fn from(err: PromotionError) -> Self {
        err.to_app_error()
    }
}

impl IntoResponse for PromotionError {
    fn into_response(self) -> Response {
        self.log();
        let retry_after = match &self {
            PromotionError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        };

        let mut response = self.to_app_error().into_response();
        if let Some(delay) = retry_after {
            // Whole seconds, rounded up, never zero.
            let secs = delay.as_secs() + u64::from(delay.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
        }
        response
    }
}
