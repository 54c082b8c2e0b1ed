use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use voltdesk_api::ApiError;
use voltdesk_core::{FieldErrors, SessionError, ValidationError};

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("validation failed: {0}")]
    Validation(#[from] FieldErrors),

    #[error("{0}")]
    Field(#[from] ValidationError),

    #[error("insufficient balance: {requested} requested, {available} available")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    #[error("OTP resend limit of {max} reached")]
    ResendLimitExceeded { max: u32 },

    #[error("status check not available for another {}s", .remaining.as_secs())]
    NotReady { remaining: Duration },

    #[error("not allowed while the flow is {0}")]
    InvalidStage(&'static str),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("confirmation polling was cancelled")]
    Cancelled,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
