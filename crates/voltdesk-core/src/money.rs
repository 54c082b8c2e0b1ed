//! Amount entry and balances.
//!
//! Amounts are typed into a free-text field. Each keystroke is filtered
//! through [`AmountInput::accept`]; the committed text is parsed with
//! [`parse_amount`] when the form is submitted.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static AMOUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d*\.?\d*$").expect("amount pattern is valid"));

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("enter a valid amount")]
    InvalidAmount,
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("{field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Strip thousands separators and whitespace from user-entered amount text.
fn strip_separators(raw: &str) -> String {
    raw.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect()
}

/// Keystroke filter for an amount field.
///
/// Holds the last accepted text. Text that does not match `^\d*\.?\d*$`
/// (after separators are stripped) is refused and the committed value is
/// left as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmountInput {
    committed: String,
}

impl AmountInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer new field text. Returns `true` if it was committed.
    pub fn accept(&mut self, raw: &str) -> bool {
        let stripped = strip_separators(raw);
        if !AMOUNT_PATTERN.is_match(&stripped) {
            return false;
        }
        self.committed = stripped;
        true
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn value(&self) -> Result<Decimal, ValidationError> {
        parse_amount(&self.committed)
    }
}

/// Parse a positive amount from field text such as `"1,234.50"`.
pub fn parse_amount(raw: &str) -> Result<Decimal, ValidationError> {
    let stripped = strip_separators(raw);
    if stripped.is_empty() {
        return Err(ValidationError::Required("amount"));
    }
    if !AMOUNT_PATTERN.is_match(&stripped) || stripped == "." {
        return Err(ValidationError::InvalidAmount);
    }
    // "10." and ".5" are valid mid-entry forms; give the parser whole digits on both sides.
    let mut normalised = stripped.trim_end_matches('.').to_string();
    if normalised.starts_with('.') {
        normalised.insert(0, '0');
    }
    let amount = Decimal::from_str(&normalised).map_err(|_| ValidationError::InvalidAmount)?;
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount);
    }
    Ok(amount)
}

/// A wallet or float the user can pay out of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    pub available: Decimal,
}

impl AssetBalance {
    pub fn new(asset: impl Into<String>, available: Decimal) -> Self {
        Self {
            asset: asset.into(),
            available,
        }
    }

    pub fn covers(&self, amount: Decimal) -> bool {
        amount <= self.available
    }
}
