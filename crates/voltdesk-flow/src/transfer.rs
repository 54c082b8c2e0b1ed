//! OTP-gated funds transfer.
//!
//! `Editing` → `AwaitingOtp` → `Completed`. Everything that can be checked
//! locally (field validation, balance) is checked before the first network
//! call. A rejected confirmation leaves the flow in `AwaitingOtp` so the user
//! can enter another code.

use tracing::{error, info};
use voltdesk_core::{
    OtpPurpose, TransferDecision, TransferDraft, TransferReceipt, TransferRequest, validate_otp,
};

use crate::{FlowContext, FlowError, OtpConfig, OtpResendGate};

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum TransferStage {
    Editing,
    AwaitingOtp {
        reference: String,
        request: TransferRequest,
    },
    Completed(TransferReceipt),
}

impl TransferStage {
    fn name(&self) -> &'static str {
        match self {
            TransferStage::Editing => "editing",
            TransferStage::AwaitingOtp { .. } => "awaiting OTP",
            TransferStage::Completed(_) => "completed",
        }
    }
}

pub struct TransferFlow {
    ctx: FlowContext,
    stage: TransferStage,
    resends: OtpResendGate,
}

impl TransferFlow {
    pub fn new(ctx: FlowContext, otp: &OtpConfig) -> Self {
        Self {
            ctx,
            stage: TransferStage::Editing,
            resends: OtpResendGate::new(otp),
        }
    }

    pub fn stage(&self) -> &TransferStage {
        &self.stage
    }

    pub fn resends_remaining(&self) -> u32 {
        self.resends.remaining()
    }

    /// Validate the draft and start the transfer.
    pub async fn submit(&mut self, draft: &TransferDraft) -> Result<&TransferStage, FlowError> {
        if self.stage != TransferStage::Editing {
            return Err(FlowError::InvalidStage(self.stage.name()));
        }

        let request = match draft.validate() {
            Ok(request) => request,
            Err(errors) => {
                self.ctx.notices.error(format!(
                    "Please correct the highlighted fields: {}",
                    errors.summary().join("; ")
                ));
                return Err(errors.into());
            }
        };

        if let Some(asset) = draft.asset.as_ref().filter(|a| !a.covers(request.amount)) {
            self.ctx.notices.error("Insufficient Balance");
            return Err(FlowError::InsufficientBalance {
                requested: request.amount,
                available: asset.available,
            });
        }

        let initiated = match self.ctx.api.initiate_transfer(&request).await {
            Ok(initiated) => initiated,
            Err(err) => return Err(self.generic_failure("initiate transfer", err.into())),
        };

        if !initiated.requires_otp {
            info!(reference = %initiated.reference, "transfer completed without OTP");
            self.ctx.notices.success("Transfer successful");
            self.stage = TransferStage::Completed(TransferReceipt {
                reference: initiated.reference,
                amount: request.amount,
                recipient_account: request.recipient_account,
                recipient_name: None,
                completed_at: None,
            });
            return Ok(&self.stage);
        }

        match self
            .ctx
            .api
            .request_otp(OtpPurpose::TransferAuthorization)
            .await
        {
            Ok(true) => self.ctx.notices.info("A code has been sent to your phone"),
            Ok(false) => self
                .ctx
                .notices
                .warning("The code could not be sent. Use resend to try again."),
            Err(err) => return Err(self.generic_failure("request OTP", err.into())),
        }

        self.resends.reset();
        self.stage = TransferStage::AwaitingOtp {
            reference: initiated.reference,
            request,
        };
        Ok(&self.stage)
    }

    /// Send a fresh OTP, subject to the resend cap.
    pub async fn resend_otp(&mut self) -> Result<bool, FlowError> {
        if !matches!(self.stage, TransferStage::AwaitingOtp { .. }) {
            return Err(FlowError::InvalidStage(self.stage.name()));
        }
        self.resends
            .resend(&self.ctx, OtpPurpose::TransferAuthorization)
            .await
    }

    /// Confirm the pending transfer with the code the user entered.
    pub async fn confirm(&mut self, otp: &str) -> Result<TransferReceipt, FlowError> {
        let TransferStage::AwaitingOtp { reference, .. } = &self.stage else {
            return Err(FlowError::InvalidStage(self.stage.name()));
        };
        let reference = reference.clone();

        let otp = match validate_otp(otp) {
            Ok(otp) => otp,
            Err(err) => {
                self.ctx.notices.error(err.to_string());
                return Err(err.into());
            }
        };

        let decision = match self.ctx.api.confirm_transfer(&reference, &otp).await {
            Ok(decision) => decision,
            Err(err) => return Err(self.generic_failure("confirm transfer", err.into())),
        };

        match decision {
            TransferDecision::Success { details } => {
                info!(reference = %details.reference, amount = %details.amount, "transfer confirmed");
                self.ctx.notices.success("Transfer successful");
                self.stage = TransferStage::Completed(details.clone());
                Ok(details)
            }
            TransferDecision::Failure { reason } => {
                self.ctx.notices.error(reason.clone());
                Err(FlowError::Rejected(reason))
            }
        }
    }

    /// Abandon any pending transfer and return to an empty form.
    pub fn reset(&mut self) {
        self.stage = TransferStage::Editing;
        self.resends.reset();
    }

    fn generic_failure(&self, action: &str, err: FlowError) -> FlowError {
        error!(action, error = %err, "transfer step failed");
        self.ctx.notices.error(GENERIC_FAILURE);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeApi;
    use crate::{Notice, NoticeLevel};
    use rust_decimal::Decimal;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;
    use tokio::sync::mpsc::UnboundedReceiver;
    use voltdesk_core::AssetBalance;

    fn draft(amount: &str, available: i64) -> TransferDraft {
        TransferDraft {
            asset: Some(AssetBalance::new("NGN", Decimal::from(available))),
            amount: amount.into(),
            recipient_account: "0123456789".into(),
            narration: String::new(),
        }
    }

    fn receipt(reference: &str) -> TransferReceipt {
        TransferReceipt {
            reference: reference.into(),
            amount: Decimal::new(123450, 2),
            recipient_account: "0123456789".into(),
            recipient_name: Some("Grid Vendors Ltd".into()),
            completed_at: None,
        }
    }

    fn flow(api: FakeApi) -> (TransferFlow, Arc<FakeApi>, UnboundedReceiver<Notice>) {
        let api = Arc::new(api);
        let (ctx, rx) = FlowContext::new(api.clone());
        (TransferFlow::new(ctx, &OtpConfig::default()), api, rx)
    }

    fn notices(rx: &mut UnboundedReceiver<Notice>) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    fn otp_api(decisions: Vec<TransferDecision>) -> FakeApi {
        FakeApi {
            requires_otp: true,
            decisions: Mutex::new(VecDeque::from(decisions)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insufficient_balance_blocks_before_network() {
        let (mut flow, api, mut rx) = flow(otp_api(vec![]));
        let err = flow.submit(&draft("5,000.01", 5000)).await.unwrap_err();
        assert!(matches!(err, FlowError::InsufficientBalance { .. }));
        assert_eq!(api.initiations.load(Ordering::SeqCst), 0);
        assert_eq!(notices(&mut rx)[0].message, "Insufficient Balance");
        assert_eq!(flow.stage(), &TransferStage::Editing);
    }

    #[tokio::test]
    async fn invalid_fields_block_before_network() {
        let (mut flow, api, mut rx) = flow(otp_api(vec![]));
        let mut bad = draft("12a3", 5000);
        bad.recipient_account.clear();
        let err = flow.submit(&bad).await.unwrap_err();
        match err {
            FlowError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(api.initiations.load(Ordering::SeqCst), 0);
        assert!(notices(&mut rx)[0].message.contains("Amount: enter a valid amount"));

        // The form is still editable after a failed submit.
        flow.submit(&draft("100", 5000)).await.unwrap();
    }

    #[tokio::test]
    async fn otp_confirmation_completes_transfer() {
        let (mut flow, api, _rx) = flow(otp_api(vec![TransferDecision::Success {
            details: receipt("TRF-1-0123456789"),
        }]));
        let stage = flow.submit(&draft("1,234.50", 5000)).await.unwrap();
        assert!(matches!(stage, TransferStage::AwaitingOtp { reference, .. } if reference == "TRF-1-0123456789"));
        assert_eq!(api.otp_requests.load(Ordering::SeqCst), 1);

        let done = flow.confirm("123456").await.unwrap();
        assert_eq!(done.recipient_name.as_deref(), Some("Grid Vendors Ltd"));
        assert!(matches!(flow.stage(), TransferStage::Completed(_)));
    }

    #[tokio::test]
    async fn rejected_otp_allows_retry() {
        let (mut flow, api, mut rx) = flow(otp_api(vec![
            TransferDecision::Failure {
                reason: "Invalid OTP".into(),
            },
            TransferDecision::Success {
                details: receipt("TRF-1-0123456789"),
            },
        ]));
        flow.submit(&draft("100", 5000)).await.unwrap();
        notices(&mut rx);

        let err = flow.confirm("000000").await.unwrap_err();
        assert!(matches!(err, FlowError::Rejected(ref r) if r == "Invalid OTP"));
        assert!(matches!(flow.stage(), TransferStage::AwaitingOtp { .. }));
        assert_eq!(notices(&mut rx)[0].message, "Invalid OTP");

        flow.confirm("123456").await.unwrap();
        assert_eq!(api.confirmations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn malformed_otp_is_not_sent() {
        let (mut flow, api, _rx) = flow(otp_api(vec![]));
        flow.submit(&draft("100", 5000)).await.unwrap();
        let err = flow.confirm("12ab").await.unwrap_err();
        assert!(matches!(err, FlowError::Field(_)));
        assert_eq!(api.confirmations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn resend_is_capped_at_three() {
        let (mut flow, api, mut rx) = flow(otp_api(vec![]));
        flow.submit(&draft("100", 5000)).await.unwrap();
        for _ in 0..3 {
            flow.resend_otp().await.unwrap();
        }
        let err = flow.resend_otp().await.unwrap_err();
        assert!(matches!(err, FlowError::ResendLimitExceeded { max: 3 }));
        // One initial send plus three resends.
        assert_eq!(api.otp_requests.load(Ordering::SeqCst), 4);
        let last = notices(&mut rx).pop().unwrap();
        assert_eq!(last.level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn no_otp_required_completes_immediately() {
        let (mut flow, api, _rx) = flow(FakeApi::default());
        let stage = flow.submit(&draft("100", 5000)).await.unwrap();
        assert!(matches!(stage, TransferStage::Completed(r) if r.amount == Decimal::from(100)));
        assert_eq!(api.otp_requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn confirm_backend_error_becomes_generic_notice() {
        // No decision scripted: the fake answers with a 500.
        let (mut flow, _api, mut rx) = flow(otp_api(vec![]));
        flow.submit(&draft("100", 5000)).await.unwrap();
        notices(&mut rx);
        let err = flow.confirm("123456").await.unwrap_err();
        assert!(matches!(err, FlowError::Api(_)));
        assert_eq!(notices(&mut rx)[0].message, GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn actions_out_of_order_are_refused() {
        let (mut flow, _api, _rx) = flow(otp_api(vec![]));
        assert!(matches!(
            flow.confirm("123456").await,
            Err(FlowError::InvalidStage("editing"))
        ));
        assert!(matches!(
            flow.resend_otp().await,
            Err(FlowError::InvalidStage("editing"))
        ));
        flow.submit(&draft("100", 5000)).await.unwrap();
        assert!(matches!(
            flow.submit(&draft("100", 5000)).await,
            Err(FlowError::InvalidStage("awaiting OTP"))
        ));
        flow.reset();
        assert_eq!(flow.stage(), &TransferStage::Editing);
    }
}
