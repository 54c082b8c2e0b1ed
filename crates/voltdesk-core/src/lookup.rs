//! Customer identity lookup types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Shortest identifier worth sending to the API.
pub const MIN_LOOKUP_LEN: usize = 3;

/// Which identifier the user is typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    AccountTag,
    MeterNumber,
    AccountReference,
}

impl LookupKind {
    /// Query-string value sent to the API.
    pub fn as_str(self) -> &'static str {
        match self {
            LookupKind::AccountTag => "account_tag",
            LookupKind::MeterNumber => "meter_number",
            LookupKind::AccountReference => "account_reference",
        }
    }
}

impl std::str::FromStr for LookupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "account_tag" | "tag" => Ok(LookupKind::AccountTag),
            "meter_number" | "meter" => Ok(LookupKind::MeterNumber),
            "account_reference" | "reference" | "ref" => Ok(LookupKind::AccountReference),
            other => Err(format!("unknown lookup kind: {other}")),
        }
    }
}

/// A user-entered identifier, trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupQuery {
    pub kind: LookupKind,
    pub value: String,
}

impl LookupQuery {
    pub fn new(kind: LookupKind, raw: &str) -> Self {
        Self {
            kind,
            value: raw.trim().to_string(),
        }
    }

    /// Whether the value is long enough to send to the API.
    ///
    /// Length is counted in characters, not bytes.
    pub fn is_ready(&self, min_len: usize) -> bool {
        self.value.chars().count() >= min_len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Prepaid,
    Postpaid,
}

/// A customer record returned by a successful lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerAccount {
    pub account_number: String,
    pub customer_name: String,
    pub meter_number: Option<String>,
    pub address: String,
    pub tariff_band: String,
    pub account_type: AccountType,
    #[serde(default)]
    pub outstanding_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    NotFound,
    Found(CustomerAccount),
    Error(String),
}

impl LookupResult {
    pub fn account(&self) -> Option<&CustomerAccount> {
        match self {
            LookupResult::Found(account) => Some(account),
            _ => None,
        }
    }
}
