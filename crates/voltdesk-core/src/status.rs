//! Backend status codes and the payment status derived from them.
//!
//! The billing API reports record state as a small integer (0-5). Every
//! consumer maps it through [`StatusCode`] rather than keeping its own
//! integer-to-label table.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown status code: {0}")]
pub struct UnknownStatusCode(pub u8);

/// Integer status code as sent by the billing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StatusCode {
    Pending,
    Successful,
    Failed,
    Reversed,
    Processing,
    Cancelled,
}

impl StatusCode {
    pub fn code(self) -> u8 {
        match self {
            StatusCode::Pending => 0,
            StatusCode::Successful => 1,
            StatusCode::Failed => 2,
            StatusCode::Reversed => 3,
            StatusCode::Processing => 4,
            StatusCode::Cancelled => 5,
        }
    }

    /// Human label shown next to a record.
    pub fn label(self) -> &'static str {
        match self {
            StatusCode::Pending => "Pending",
            StatusCode::Successful => "Successful",
            StatusCode::Failed => "Failed",
            StatusCode::Reversed => "Reversed",
            StatusCode::Processing => "Processing",
            StatusCode::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        PaymentStatus::from(self) != PaymentStatus::Pending
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = UnknownStatusCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StatusCode::Pending),
            1 => Ok(StatusCode::Successful),
            2 => Ok(StatusCode::Failed),
            3 => Ok(StatusCode::Reversed),
            4 => Ok(StatusCode::Processing),
            5 => Ok(StatusCode::Cancelled),
            other => Err(UnknownStatusCode(other)),
        }
    }
}

impl From<StatusCode> for u8 {
    fn from(status: StatusCode) -> Self {
        status.code()
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Three-state view of a payment used by the confirmation poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Failed,
}

impl From<StatusCode> for PaymentStatus {
    fn from(code: StatusCode) -> Self {
        match code {
            StatusCode::Pending | StatusCode::Processing => PaymentStatus::Pending,
            StatusCode::Successful => PaymentStatus::Confirmed,
            StatusCode::Failed | StatusCode::Reversed | StatusCode::Cancelled => {
                PaymentStatus::Failed
            }
        }
    }
}
