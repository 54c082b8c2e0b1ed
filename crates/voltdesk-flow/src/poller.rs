//! Short-polling driver for payment confirmation.
//!
//! The poller runs one sequential loop per session: an immediate first
//! check, then one check per interval tick. A check that outlasts the
//! interval delays the next tick rather than overlapping it, so at most one
//! status call is in flight per session.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};
use voltdesk_core::{ConfirmationSession, PollProgress, PollSettings, Transition};

use crate::{FlowContext, FlowError};

/// Longest wait a guard will honour; larger values are clamped.
const MAX_MIN_WAIT: Duration = Duration::from_secs(86400 * 365 * 30);

/// Countdown before the first status check is allowed.
#[derive(Debug, Clone, Copy)]
pub struct MinWaitGuard {
    ready_at: Instant,
}

impl MinWaitGuard {
    pub fn new(wait: Option<Duration>) -> Self {
        let wait = wait.unwrap_or_default().min(MAX_MIN_WAIT);
        Self {
            ready_at: Instant::now() + wait,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.ready_at.saturating_duration_since(Instant::now())
    }

    pub fn is_ready(&self) -> bool {
        self.remaining().is_zero()
    }
}

/// How polling was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTrigger {
    /// The user pressed "Check Payment"; refused until the guard has elapsed.
    UserAction,
    /// The view opened; polling waits out the guard, then begins.
    Mount,
}

/// A confirmation view: holds the poll settings and the wait guard that
/// started counting when the view was created.
pub struct ConfirmationPoller {
    ctx: FlowContext,
    settings: PollSettings,
    guard: MinWaitGuard,
}

impl ConfirmationPoller {
    pub fn mount(ctx: FlowContext, settings: PollSettings) -> Self {
        let guard = MinWaitGuard::new(settings.min_wait);
        Self {
            ctx,
            settings,
            guard,
        }
    }

    pub fn guard(&self) -> &MinWaitGuard {
        &self.guard
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Begin polling `reference` on a background task.
    pub fn start(
        &self,
        reference: impl Into<String>,
        trigger: PollTrigger,
    ) -> Result<PollHandle, FlowError> {
        let remaining = self.guard.remaining();
        if trigger == PollTrigger::UserAction && !remaining.is_zero() {
            let secs = remaining.as_secs_f64().ceil() as u64;
            self.ctx.notices.warning(format!(
                "Payment is not ready to check yet. Try again in {secs}s."
            ));
            return Err(FlowError::NotReady { remaining });
        }

        let mut session = ConfirmationSession::new(reference, &self.settings);
        session.start()?;
        info!(
            reference = session.reference(),
            max_attempts = session.max_attempts(),
            interval_ms = self.settings.interval.as_millis() as u64,
            "awaiting payment confirmation"
        );

        let (progress_tx, progress_rx) = watch::channel(session.progress());
        let join = tokio::spawn(drive(
            self.ctx.clone(),
            session,
            self.settings.interval,
            remaining,
            progress_tx,
        ));
        Ok(PollHandle {
            progress: progress_rx,
            join,
        })
    }
}

async fn drive(
    ctx: FlowContext,
    mut session: ConfirmationSession,
    interval: Duration,
    initial_delay: Duration,
    progress: watch::Sender<PollProgress>,
) -> ConfirmationSession {
    if !initial_delay.is_zero() {
        tokio::time::sleep(initial_delay).await;
    }

    // `interval` panics on a zero period.
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let recorded = loop {
        ticker.tick().await;
        let recorded = match ctx.api.check_payment_status(session.reference()).await {
            Ok(report) => session.record_status(report, Utc::now()),
            Err(err) => {
                warn!(reference = session.reference(), error = %err, "payment status check failed");
                ctx.notices
                    .warning(format!("Could not check payment status: {err}"));
                session.record_check_error(err.to_string(), Utc::now())
            }
        };
        progress.send_replace(session.progress());
        if !matches!(recorded, Ok(Transition::Continue)) {
            break recorded;
        }
    };

    match recorded {
        Ok(Transition::Confirmed) => {
            info!(
                reference = session.reference(),
                attempts = session.attempt_count(),
                "payment confirmed"
            );
            ctx.notices.success("Payment confirmed");
        }
        Ok(Transition::Failed) => {
            let reason = session.failure_reason().unwrap_or("unknown reason");
            ctx.notices.error(format!("Payment failed: {reason}"));
        }
        Ok(Transition::TimedOut) => {
            warn!(reference = session.reference(), "payment confirmation timed out");
            ctx.notices
                .warning("Payment has not been confirmed yet. Please check again later.");
        }
        Ok(Transition::Continue) => {}
        Err(err) => warn!(reference = session.reference(), error = %err, "poll loop stopped"),
    }
    session
}

/// Owns a running poll. Dropping it cancels the poll.
pub struct PollHandle {
    progress: watch::Receiver<PollProgress>,
    join: JoinHandle<ConfirmationSession>,
}

impl PollHandle {
    pub fn progress(&self) -> watch::Receiver<PollProgress> {
        self.progress.clone()
    }

    /// Wait for the session to reach a terminal state.
    pub async fn outcome(mut self) -> Result<ConfirmationSession, FlowError> {
        (&mut self.join).await.map_err(|_| FlowError::Cancelled)
    }

    pub fn cancel(self) {
        self.join.abort();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}
