//! Funds transfer form, payloads, and OTP confirmation types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::{AssetBalance, ValidationError, parse_amount};

const RECIPIENT_ACCOUNT_LEN: usize = 10;
const NARRATION_MAX_CHARS: usize = 100;
const OTP_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransferField {
    Asset,
    Amount,
    RecipientAccount,
    Narration,
    Otp,
}

impl TransferField {
    pub fn label(self) -> &'static str {
        match self {
            TransferField::Asset => "Asset",
            TransferField::Amount => "Amount",
            TransferField::RecipientAccount => "Recipient account",
            TransferField::Narration => "Narration",
            TransferField::Otp => "OTP",
        }
    }
}

/// Per-field validation failures, ordered by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{} field(s) need attention", .0.len())]
pub struct FieldErrors(BTreeMap<TransferField, ValidationError>);

impl FieldErrors {
    pub fn insert(&mut self, field: TransferField, error: ValidationError) {
        self.0.insert(field, error);
    }

    pub fn get(&self, field: TransferField) -> Option<&ValidationError> {
        self.0.get(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// One line per failing field, for the summary list above the form.
    pub fn summary(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|(field, err)| format!("{}: {err}", field.label()))
            .collect()
    }
}

/// The transfer form as the user has filled it in so far.
#[derive(Debug, Clone, Default)]
pub struct TransferDraft {
    pub asset: Option<AssetBalance>,
    pub amount: String,
    pub recipient_account: String,
    pub narration: String,
}

impl TransferDraft {
    /// Check every field and build the request payload.
    ///
    /// All failing fields are reported together; the draft is not consumed,
    /// so the caller can correct it and resubmit.
    pub fn validate(&self) -> Result<TransferRequest, FieldErrors> {
        let mut errors = FieldErrors::default();

        if self.asset.is_none() {
            errors.insert(TransferField::Asset, ValidationError::Required("asset"));
        }

        let amount = parse_amount(&self.amount)
            .map_err(|e| errors.insert(TransferField::Amount, e))
            .ok();

        let recipient = self.recipient_account.trim();
        if recipient.is_empty() {
            errors.insert(
                TransferField::RecipientAccount,
                ValidationError::Required("recipient account"),
            );
        } else if recipient.len() != RECIPIENT_ACCOUNT_LEN
            || !recipient.chars().all(|c| c.is_ascii_digit())
        {
            errors.insert(
                TransferField::RecipientAccount,
                ValidationError::Invalid {
                    field: "recipient account",
                    reason: format!("must be {RECIPIENT_ACCOUNT_LEN} digits"),
                },
            );
        }

        let narration = self.narration.trim();
        if narration.chars().count() > NARRATION_MAX_CHARS {
            errors.insert(
                TransferField::Narration,
                ValidationError::Invalid {
                    field: "narration",
                    reason: format!("must be at most {NARRATION_MAX_CHARS} characters"),
                },
            );
        }

        match (&self.asset, amount) {
            (Some(asset), Some(amount)) if errors.is_empty() => Ok(TransferRequest {
                asset: asset.asset.clone(),
                amount,
                recipient_account: recipient.to_string(),
                narration: (!narration.is_empty()).then(|| narration.to_string()),
            }),
            _ => Err(errors),
        }
    }
}

/// Check an OTP before it is sent for confirmation.
pub fn validate_otp(raw: &str) -> Result<String, ValidationError> {
    let otp = raw.trim();
    if otp.is_empty() {
        return Err(ValidationError::Required("otp"));
    }
    if otp.len() != OTP_LEN || !otp.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::Invalid {
            field: "otp",
            reason: format!("must be {OTP_LEN} digits"),
        });
    }
    Ok(otp.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub asset: String,
    pub amount: Decimal,
    pub recipient_account: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatedTransfer {
    pub reference: String,
    pub requires_otp: bool,
}

/// What an OTP is being requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    TransferAuthorization,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub reference: String,
    pub amount: Decimal,
    pub recipient_account: String,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferDecision {
    Success { details: TransferReceipt },
    Failure { reason: String },
}
