//! Shared context handed to every flow, and the user-facing notice channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use voltdesk_api::BillingApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient message for the user (toast/banner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Sending half of the notice channel. Cheap to clone.
///
/// Notices are dropped silently once the receiver is gone.
#[derive(Debug, Clone)]
pub struct Notices {
    tx: mpsc::UnboundedSender<Notice>,
}

impl Notices {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn push(&self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Error => error!(notice = %message, "user notice"),
            NoticeLevel::Warning => warn!(notice = %message, "user notice"),
            NoticeLevel::Info | NoticeLevel::Success => info!(notice = %message, "user notice"),
        }
        let _ = self.tx.send(Notice { level, message });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message);
    }
}

/// Everything a flow needs from its surroundings.
#[derive(Clone)]
pub struct FlowContext {
    pub api: Arc<dyn BillingApi>,
    pub notices: Notices,
}

impl FlowContext {
    pub fn new(api: Arc<dyn BillingApi>) -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (notices, rx) = Notices::channel();
        (Self { api, notices }, rx)
    }
}
