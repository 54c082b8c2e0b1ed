//! Billing back-office API: the collaborator contract and its HTTP client.

use async_trait::async_trait;
use voltdesk_core::{
    CustomerAccount, InitiatedTransfer, LookupQuery, OtpPurpose, PaymentStatusReport,
    TransferDecision, TransferRequest,
};

mod error;
pub use error::ApiError;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpBillingApi;

/// The remote operations the console depends on.
///
/// Implementations must be shareable across tasks; flows hold them as
/// `Arc<dyn BillingApi>`.
#[async_trait]
pub trait BillingApi: Send + Sync {
    /// Look up a customer by identifier. `Ok(None)` means not found.
    async fn lookup_entity(&self, query: &LookupQuery)
    -> Result<Option<CustomerAccount>, ApiError>;

    async fn initiate_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<InitiatedTransfer, ApiError>;

    /// Ask the backend to send an OTP. Returns whether it reports one as sent.
    async fn request_otp(&self, purpose: OtpPurpose) -> Result<bool, ApiError>;

    async fn confirm_transfer(
        &self,
        reference: &str,
        otp: &str,
    ) -> Result<TransferDecision, ApiError>;

    async fn check_payment_status(&self, reference: &str)
    -> Result<PaymentStatusReport, ApiError>;
}
