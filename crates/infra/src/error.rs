//! Service-level error taxonomy.
//!
//! Every service call fails with a [`ServiceError`], which carries a stable
//! machine-readable `code()` and an [`ErrorKind`] the HTTP layer maps to a
//! status. Store failures keep their detail for logs but never leak it through
//! `public_message()`.

use serde::Serialize;
use thiserror::Error;

use discoverly_auth::{AuthzError, TokenValidationError};
use discoverly_core::DomainError;

use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Validation,
    /// A moderation patch that would change nothing.
    NoOp,
    /// Retryable infrastructure failure.
    Transient,
    Fatal,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("submission limit reached: subscribe to add more products")]
    QuotaExceeded,

    #[error("already voted for this product")]
    AlreadyVoted,

    #[error("already reported this product")]
    DuplicateReport,

    #[error("coupon code already in use")]
    CouponCodeTaken,

    #[error("invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("payment has not been confirmed by the provider")]
    PaymentNotConfirmed,

    #[error("nothing to update")]
    NoOp,

    #[error("temporarily unavailable: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Fatal(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Unauthorized(_) => ErrorKind::Unauthorized,
            ServiceError::Forbidden(_) => ErrorKind::Forbidden,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::QuotaExceeded
            | ServiceError::AlreadyVoted
            | ServiceError::DuplicateReport
            | ServiceError::CouponCodeTaken
            | ServiceError::InvalidTransition(_) => ErrorKind::Conflict,
            ServiceError::Validation(_) | ServiceError::PaymentNotConfirmed => ErrorKind::Validation,
            ServiceError::NoOp => ErrorKind::NoOp,
            ServiceError::Transient(_) => ErrorKind::Transient,
            ServiceError::Fatal(_) => ErrorKind::Fatal,
        }
    }

    /// Stable error code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::QuotaExceeded => "quota_exceeded",
            ServiceError::AlreadyVoted => "already_voted",
            ServiceError::DuplicateReport => "already_reported",
            ServiceError::CouponCodeTaken => "coupon_code_taken",
            ServiceError::InvalidTransition(_) => "invalid_transition",
            ServiceError::Validation(_) => "validation_error",
            ServiceError::PaymentNotConfirmed => "payment_not_confirmed",
            ServiceError::NoOp => "no_change",
            ServiceError::Transient(_) => "unavailable",
            ServiceError::Fatal(_) => "internal_error",
        }
    }

    /// Message safe to return to callers.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Transient(_) => "service temporarily unavailable, retry later".to_string(),
            ServiceError::Fatal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvalidTransition(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout(_) | StoreError::Unavailable(_) => {
                ServiceError::Transient(err.to_string())
            }
            StoreError::Backend(_) | StoreError::Corrupt(_) => ServiceError::Fatal(err.to_string()),
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        ServiceError::Forbidden(err.to_string())
    }
}

impl From<TokenValidationError> for ServiceError {
    fn from(err: TokenValidationError) -> Self {
        ServiceError::Unauthorized(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
