//! Presentation of a confirmed payment: the issued tokens, or a plain
//! success message when nothing was issued (postpaid credit).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use voltdesk_core::{ConfirmationSession, RedemptionArtifact, SessionStatus};

#[derive(Debug, Error)]
#[error("clipboard unavailable: {0}")]
pub struct ClipboardError(pub String);

/// Destination for copy-to-clipboard. Writes are best effort.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Process-local clipboard.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut contents = self
            .contents
            .lock()
            .map_err(|e| ClipboardError(e.to_string()))?;
        *contents = Some(text.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenterConfig {
    /// How long the "copied" acknowledgment stays up.
    pub copied_reset: Duration,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            copied_reset: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresenterView {
    Tokens(Vec<RedemptionArtifact>),
    GenericSuccess {
        amount: Option<Decimal>,
        description: Option<String>,
    },
    NotConfirmed(SessionStatus),
}

pub struct TokenPresenter {
    view: PresenterView,
    clipboard: Arc<dyn Clipboard>,
    config: PresenterConfig,
    copied: Arc<watch::Sender<bool>>,
    reset: Option<JoinHandle<()>>,
}

impl TokenPresenter {
    pub fn new(view: PresenterView, clipboard: Arc<dyn Clipboard>, config: PresenterConfig) -> Self {
        let (copied, _) = watch::channel(false);
        Self {
            view,
            clipboard,
            config,
            copied: Arc::new(copied),
            reset: None,
        }
    }

    /// Build the view for a finished confirmation session.
    pub fn for_session(
        session: &ConfirmationSession,
        clipboard: Arc<dyn Clipboard>,
        config: PresenterConfig,
    ) -> Self {
        let view = match session.status() {
            SessionStatus::Confirmed if !session.artifacts().is_empty() => {
                PresenterView::Tokens(session.artifacts().to_vec())
            }
            SessionStatus::Confirmed => {
                let report = session.final_report();
                PresenterView::GenericSuccess {
                    amount: report.and_then(|r| r.amount),
                    description: report.and_then(|r| r.description.clone()),
                }
            }
            other => PresenterView::NotConfirmed(other),
        };
        Self::new(view, clipboard, config)
    }

    pub fn view(&self) -> &PresenterView {
        &self.view
    }

    pub fn is_copied(&self) -> bool {
        *self.copied.borrow()
    }

    pub fn subscribe_copied(&self) -> watch::Receiver<bool> {
        self.copied.subscribe()
    }

    /// Copy the token at `index`. Returns `false` if there is no such token.
    ///
    /// The acknowledgment resets `copied_reset` after the most recent call.
    /// Must be called within a tokio runtime.
    pub fn copy(&mut self, index: usize) -> bool {
        let PresenterView::Tokens(tokens) = &self.view else {
            return false;
        };
        let Some(artifact) = tokens.get(index) else {
            return false;
        };

        if let Err(err) = self.clipboard.write_text(&artifact.token) {
            warn!(error = %err, "clipboard write failed");
        }
        debug!(index, "token copied");

        if let Some(previous) = self.reset.take() {
            previous.abort();
        }
        self.copied.send_replace(true);
        let copied = self.copied.clone();
        let delay = self.config.copied_reset;
        self.reset = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            copied.send_replace(false);
        }));
        true
    }

    /// Dismiss the presenter; artifacts are discarded.
    pub fn close(self) {}
}

impl Drop for TokenPresenter {
    fn drop(&mut self) {
        if let Some(reset) = self.reset.take() {
            reset.abort();
        }
    }
}
