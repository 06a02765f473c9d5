//! Cancellation registry: one `CancellationToken` per in-flight request.
//!
//! The orchestrator registers a token at the start of each round and
//! releases it at the end. `Stop` (through a [`StopHandle`]) cancels and
//! removes it. The registry is cheap to clone; all clones share state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use super::types::RequestId;

#[derive(Debug, Default)]
struct Inner {
    active: HashMap<RequestId, CancellationToken>,
    /// Most recently registered id, cleared when that id leaves the map.
    latest: Option<RequestId>,
}

#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The map stays consistent even if a holder panicked mid-update
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a fresh token for `id` and make it the latest request.
    pub fn register(&self, id: &RequestId) -> CancellationToken {
        let token = CancellationToken::new();
        let mut inner = self.lock();
        inner.active.insert(id.clone(), token.clone());
        inner.latest = Some(id.clone());
        token
    }

    /// Signal and remove `id`. Unknown or already-cancelled ids are a no-op.
    ///
    /// Returns whether a live token was cancelled.
    pub fn cancel(&self, id: &RequestId) -> bool {
        let token = {
            let mut inner = self.lock();
            let token = inner.active.remove(id);
            if inner.latest.as_ref() == Some(id) {
                inner.latest = None;
            }
            token
        };

        match token {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                tracing::info!(request_id = %id, "request cancelled");
                true
            }
            _ => false,
        }
    }

    /// Remove `id` without signalling (normal completion).
    pub fn release(&self, id: &RequestId) {
        let mut inner = self.lock();
        inner.active.remove(id);
        if inner.latest.as_ref() == Some(id) {
            inner.latest = None;
        }
    }

    /// Cancel the most recently registered request, if it is still active.
    pub fn cancel_latest(&self) -> bool {
        let latest = self.lock().latest.clone();
        match latest {
            Some(id) => self.cancel(&id),
            None => false,
        }
    }

    pub fn latest(&self) -> Option<RequestId> {
        self.lock().latest.clone()
    }

    pub fn is_active(&self, id: &RequestId) -> bool {
        self.lock().active.contains_key(id)
    }

    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }
}

/// The user-facing stop affordance. Clone freely; hand one to the UI.
#[derive(Debug, Clone)]
pub struct StopHandle {
    registry: CancellationRegistry,
}

impl StopHandle {
    pub(crate) fn new(registry: CancellationRegistry) -> Self {
        Self { registry }
    }

    /// Stop a specific request. Idempotent.
    pub fn stop(&self, id: &RequestId) -> bool {
        self.registry.cancel(id)
    }

    /// Stop whatever request is currently running. Idempotent.
    pub fn stop_latest(&self) -> bool {
        self.registry.cancel_latest()
    }

    /// Id of the request a stop button should target.
    pub fn current_request(&self) -> Option<RequestId> {
        self.registry.latest()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
