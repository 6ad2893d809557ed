//! Reload guard: at most one forced reload per browsing session
//!
//! When an authenticated call discovers that the session is gone, the client
//! asks its host to re-bootstrap into a clean logged-out state (in a browser:
//! a full page reload). If the host comes back and the next call fails the
//! same way, reloading again would loop forever. The guard is a set-once
//! marker in session-scoped storage; once it is set, the failure surfaces as
//! [`ApiError::SessionExpired`](crate::ApiError::SessionExpired) instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use wecare_core::storage::{KeyValueStore, keys};

/// Host hook that re-bootstraps the application
pub trait ReloadHandler: Send + Sync {
    /// Perform the reload; must not block on network I/O
    fn reload(&self);
}

/// Handler for hosts without a page to reload
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyReload;

impl ReloadHandler for LogOnlyReload {
    fn reload(&self) {
        info!("Session reset requested; host has nothing to reload");
    }
}

/// Set-once reload marker
pub struct ReloadGuard {
    tripped: AtomicBool,
    store: Arc<dyn KeyValueStore>,
}

impl ReloadGuard {
    /// Create a guard backed by session-scoped storage
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let tripped = store.get(keys::RELOAD_ATTEMPTED).is_some();
        Self {
            tripped: AtomicBool::new(tripped),
            store,
        }
    }

    /// Whether a reload already happened in this browsing session
    #[must_use]
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst) || self.store.get(keys::RELOAD_ATTEMPTED).is_some()
    }

    /// Claim the single reload
    ///
    /// Returns `true` exactly once per session, to the caller that must
    /// perform the reload. Concurrent callers race on a compare-and-set.
    pub fn try_trip(&self) -> bool {
        if self.store.get(keys::RELOAD_ATTEMPTED).is_some() {
            self.tripped.store(true, Ordering::SeqCst);
            return false;
        }

        let won = self
            .tripped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if won {
            self.store.set(keys::RELOAD_ATTEMPTED, "1");
        } else {
            warn!("Reload already performed this session");
        }
        won
    }

    /// Start a new browsing session
    pub fn reset(&self) {
        self.store.remove(keys::RELOAD_ATTEMPTED);
        self.tripped.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for ReloadGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadGuard")
            .field("tripped", &self.is_tripped())
            .finish_non_exhaustive()
    }
}
