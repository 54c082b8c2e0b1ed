//! Capped OTP resends.

use tracing::{info, warn};
use voltdesk_core::OtpPurpose;

use crate::{FlowContext, FlowError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpConfig {
    pub max_resends: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self { max_resends: 3 }
    }
}

/// Counts "Resend code" presses. The initial send is not counted.
#[derive(Debug, Clone)]
pub struct OtpResendGate {
    max_resends: u32,
    used: u32,
}

impl OtpResendGate {
    pub fn new(config: &OtpConfig) -> Self {
        Self {
            max_resends: config.max_resends,
            used: 0,
        }
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.max_resends.saturating_sub(self.used)
    }

    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Request a fresh code, unless the resend budget is spent.
    ///
    /// A resend whose request fails still counts against the budget.
    pub async fn resend(
        &mut self,
        ctx: &FlowContext,
        purpose: OtpPurpose,
    ) -> Result<bool, FlowError> {
        if self.used >= self.max_resends {
            ctx.notices
                .error("OTP resend limit exceeded. Please restart the transfer.");
            return Err(FlowError::ResendLimitExceeded {
                max: self.max_resends,
            });
        }
        self.used += 1;
        info!(attempt = self.used, max = self.max_resends, "resending OTP");
        let sent = match ctx.api.request_otp(purpose).await {
            Ok(sent) => sent,
            Err(err) => {
                warn!(attempt = self.used, error = %err, "OTP resend failed");
                ctx.notices
                    .error("Could not send a new code. Please try again.");
                return Err(err.into());
            }
        };
        if sent {
            ctx.notices.info("A new code has been sent");
        } else {
            ctx.notices.warning("The code could not be sent. Try again.");
        }
        Ok(sent)
    }
}
