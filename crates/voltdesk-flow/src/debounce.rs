//! Search-as-you-type customer lookup.
//!
//! Every keystroke restarts a single timer; the lookup goes out only once
//! typing pauses for the debounce window and the value is long enough.
//! Results are published on a [`watch`] channel so any number of views can
//! follow the latest [`LookupState`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use voltdesk_core::{LookupKind, LookupQuery, LookupResult, MIN_LOOKUP_LEN};

use crate::FlowContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    pub debounce: Duration,
    pub min_len: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            min_len: MIN_LOOKUP_LEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupState {
    /// Nothing to show: no input yet, or input below the minimum length.
    Idle,
    Searching(LookupQuery),
    Settled {
        query: LookupQuery,
        result: LookupResult,
    },
}

pub struct Debouncer {
    ctx: FlowContext,
    kind: LookupKind,
    config: LookupConfig,
    state: Arc<watch::Sender<LookupState>>,
    /// Bumped on every input; a lookup only publishes if it is still current.
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(ctx: FlowContext, kind: LookupKind, config: LookupConfig) -> Self {
        let (state, _) = watch::channel(LookupState::Idle);
        Self {
            ctx,
            kind,
            config,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LookupState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> LookupState {
        self.state.borrow().clone()
    }

    /// Feed the current field text. Must be called within a tokio runtime.
    pub fn input(&mut self, raw: &str) {
        self.cancel_pending();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = LookupQuery::new(self.kind, raw);
        if !query.is_ready(self.config.min_len) {
            self.state.send_replace(LookupState::Idle);
            return;
        }

        let ctx = self.ctx.clone();
        let delay = self.config.debounce;
        let state = self.state.clone();
        let current = self.generation.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let publish = |next: LookupState| {
                state.send_if_modified(|s| {
                    if current.load(Ordering::SeqCst) != generation {
                        return false;
                    }
                    *s = next;
                    true
                });
            };

            debug!(kind = query.kind.as_str(), query = %query.value, "debounced lookup");
            publish(LookupState::Searching(query.clone()));
            let result = match ctx.api.lookup_entity(&query).await {
                Ok(Some(account)) => LookupResult::Found(account),
                Ok(None) => LookupResult::NotFound,
                Err(err) => {
                    ctx.notices.error(format!("Lookup failed: {err}"));
                    LookupResult::Error(err.to_string())
                }
            };
            publish(LookupState::Settled { query, result });
        }));
    }

    /// Whether a lookup is scheduled or in flight.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Cancel any pending lookup and clear the published state.
    pub fn teardown(mut self) {
        self.cancel_pending();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(LookupState::Idle);
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
