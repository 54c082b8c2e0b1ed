//! Asynchronous payment confirmation: the session state machine.
//!
//! A [`ConfirmationSession`] tracks one reference from the moment the user
//! is shown the "awaiting confirmation" view until it is confirmed, fails,
//! or runs out of attempts. It performs no I/O; the poller in
//! `voltdesk-flow` feeds it one observation per tick.
//!
//! ```text
//! Idle ──start──▶ Polling ──▶ Confirmed | Failed | TimedOut
//!                   ▲   │
//!                   └───┘ pending / tolerated check error
//! ```
//!
//! Terminal states are absorbing: every mutating call on a terminal session
//! returns [`SessionError::Terminal`] and leaves it untouched.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{PaymentStatus, StatusCode};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("confirmation session has not been started")]
    NotStarted,
    #[error("confirmation session is already polling")]
    AlreadyStarted,
    #[error("confirmation session already finished as {0:?}")]
    Terminal(SessionStatus),
}

/// What to do when the status-check call itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckErrorPolicy {
    /// Count the attempt, report the failure, keep polling.
    #[default]
    KeepPolling,
    /// End the session as failed.
    FailSession,
}

/// Poll budget and cadence, fixed when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub interval: Duration,
    /// Time after the view opens before the first check is allowed.
    pub min_wait: Option<Duration>,
    pub on_check_error: CheckErrorPolicy,
}

impl PollSettings {
    /// Bank transfer confirmation: 12 checks, 10s apart, after a 60s wait.
    pub fn bank_transfer() -> Self {
        Self {
            max_attempts: 12,
            interval: Duration::from_secs(10),
            min_wait: Some(Duration::from_secs(60)),
            on_check_error: CheckErrorPolicy::KeepPolling,
        }
    }

    /// Card vend confirmation: 30 checks, 30s apart, no wait.
    pub fn card_vend() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(30),
            min_wait: None,
            on_check_error: CheckErrorPolicy::KeepPolling,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::bank_transfer()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Idle,
    Polling,
    Confirmed,
    Failed,
    TimedOut,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Confirmed | SessionStatus::Failed | SessionStatus::TimedOut
        )
    }
}

/// Result of the most recent check, kept apart so "still pending" and
/// "could not reach the server" are never shown as the same thing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LastCheck {
    #[default]
    None,
    Pending,
    Unreachable(String),
}

/// A prepaid token (or similar) issued once the payment is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedemptionArtifact {
    pub token: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Unit of `amount`, e.g. `kWh`.
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of a status-check response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatusReport {
    pub status: StatusCode,
    #[serde(default)]
    pub artifacts: Vec<RedemptionArtifact>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
}

impl PaymentStatusReport {
    pub fn payment_status(&self) -> PaymentStatus {
        self.status.into()
    }
}

/// What a recorded observation did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Continue,
    Confirmed,
    Failed,
    TimedOut,
}

/// Snapshot for the progress indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollProgress {
    pub attempt: u32,
    pub max_attempts: u32,
    pub estimated_remaining: Duration,
    pub status: SessionStatus,
    pub last_check: LastCheck,
}

#[derive(Debug, Clone)]
pub struct ConfirmationSession {
    reference: String,
    attempt_count: u32,
    max_attempts: u32,
    interval: Duration,
    on_check_error: CheckErrorPolicy,
    status: SessionStatus,
    last_checked_at: Option<DateTime<Utc>>,
    last_check: LastCheck,
    final_report: Option<PaymentStatusReport>,
    failure_reason: Option<String>,
}

impl ConfirmationSession {
    /// A budget of zero attempts is raised to one.
    pub fn new(reference: impl Into<String>, settings: &PollSettings) -> Self {
        Self {
            reference: reference.into(),
            attempt_count: 0,
            max_attempts: settings.max_attempts.max(1),
            interval: settings.interval,
            on_check_error: settings.on_check_error,
            status: SessionStatus::Idle,
            last_checked_at: None,
            last_check: LastCheck::None,
            final_report: None,
            failure_reason: None,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        self.last_checked_at
    }

    pub fn last_check(&self) -> &LastCheck {
        &self.last_check
    }

    /// The report that confirmed or failed the session.
    pub fn final_report(&self) -> Option<&PaymentStatusReport> {
        self.final_report.as_ref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Artifacts captured on confirmation; empty otherwise.
    pub fn artifacts(&self) -> &[RedemptionArtifact] {
        match (&self.status, &self.final_report) {
            (SessionStatus::Confirmed, Some(report)) => &report.artifacts,
            _ => &[],
        }
    }

    /// Saturates at `Duration::MAX` for absurd intervals.
    pub fn estimated_remaining(&self) -> Duration {
        self.interval
            .checked_mul(self.max_attempts.saturating_sub(self.attempt_count))
            .unwrap_or(Duration::MAX)
    }

    pub fn progress(&self) -> PollProgress {
        PollProgress {
            attempt: self.attempt_count,
            max_attempts: self.max_attempts,
            estimated_remaining: self.estimated_remaining(),
            status: self.status,
            last_check: self.last_check.clone(),
        }
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Idle => {
                self.status = SessionStatus::Polling;
                debug!(reference = %self.reference, "confirmation polling started");
                Ok(())
            }
            SessionStatus::Polling => Err(SessionError::AlreadyStarted),
            terminal => Err(SessionError::Terminal(terminal)),
        }
    }

    fn begin_attempt(&mut self, at: DateTime<Utc>) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Polling => {}
            SessionStatus::Idle => return Err(SessionError::NotStarted),
            terminal => return Err(SessionError::Terminal(terminal)),
        }
        self.attempt_count += 1;
        self.last_checked_at = Some(at);
        Ok(())
    }

    /// Record a successful status-check response.
    pub fn record_status(
        &mut self,
        report: PaymentStatusReport,
        at: DateTime<Utc>,
    ) -> Result<Transition, SessionError> {
        self.begin_attempt(at)?;
        let transition = match report.payment_status() {
            PaymentStatus::Confirmed => {
                self.status = SessionStatus::Confirmed;
                self.last_check = LastCheck::None;
                self.final_report = Some(report);
                Transition::Confirmed
            }
            PaymentStatus::Failed => {
                self.status = SessionStatus::Failed;
                self.last_check = LastCheck::None;
                self.failure_reason = Some(format!("payment {}", report.status.label()));
                self.final_report = Some(report);
                Transition::Failed
            }
            PaymentStatus::Pending => {
                self.last_check = LastCheck::Pending;
                self.exhausted_or_continue()
            }
        };
        debug!(
            reference = %self.reference,
            attempt = self.attempt_count,
            ?transition,
            "recorded payment status"
        );
        Ok(transition)
    }

    /// Record a status-check call that did not produce a response.
    pub fn record_check_error(
        &mut self,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<Transition, SessionError> {
        self.begin_attempt(at)?;
        let message = message.into();
        let transition = match self.on_check_error {
            CheckErrorPolicy::FailSession => {
                self.status = SessionStatus::Failed;
                self.failure_reason = Some(message.clone());
                Transition::Failed
            }
            CheckErrorPolicy::KeepPolling => self.exhausted_or_continue(),
        };
        self.last_check = LastCheck::Unreachable(message);
        Ok(transition)
    }

    fn exhausted_or_continue(&mut self) -> Transition {
        if self.attempt_count >= self.max_attempts {
            self.status = SessionStatus::TimedOut;
            Transition::TimedOut
        } else {
            Transition::Continue
        }
    }
}
