//! Cancellation tokens for superseded searches.
//!
//! Each search takes a new version from [`SearchVersionTracker`]. Starting
//! another search bumps the version, and the older search's token reports
//! cancelled the next time its merge is about to request a page. Requests
//! already in flight are not interrupted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Tracks the active search version for cancellation.
#[derive(Debug, Clone, Default)]
pub struct SearchVersionTracker {
    active_version: Arc<AtomicU64>,
}

impl SearchVersionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the active version and returns the new version number.
    ///
    /// Tokens for older versions report cancelled from now on.
    pub fn next_version(&self) -> u64 {
        self.active_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the current active version without incrementing.
    pub fn current_version(&self) -> u64 {
        self.active_version.load(Ordering::SeqCst)
    }

    /// Starts a new version and returns its token.
    pub fn begin(&self) -> CancellationToken {
        let version = self.next_version();
        self.token_for_version(version)
    }

    /// Cancels every outstanding token without starting a new search.
    pub fn cancel_all(&self) {
        self.next_version();
    }

    pub fn token_for_version(&self, version: u64) -> CancellationToken {
        CancellationToken {
            active_version: Some(Arc::clone(&self.active_version)),
            version,
        }
    }
}

/// A cancellation token for one search.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    /// `None` for a token that is never cancelled.
    active_version: Option<Arc<AtomicU64>>,
    version: u64,
}

impl CancellationToken {
    /// Creates a cancellation token that is never cancelled.
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Checks if this token is still active.
    ///
    /// Returns `Some(())` if still active, `None` if cancelled, so callers can
    /// bail out with `?`.
    #[inline]
    pub fn is_cancelled(&self) -> Option<()> {
        match &self.active_version {
            Some(active) if active.load(Ordering::Relaxed) != self.version => None,
            _ => Some(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_token_is_never_cancelled() {
        let token = CancellationToken::noop();
        assert!(token.is_cancelled().is_some());
    }

    #[test]
    fn default_is_noop() {
        let token = CancellationToken::default();
        assert!(token.is_cancelled().is_some());
    }

    #[test]
    fn newer_search_cancels_older_token() {
        let tracker = SearchVersionTracker::new();
        let first = tracker.begin();
        assert!(first.is_cancelled().is_some());

        let second = tracker.begin();
        assert!(first.is_cancelled().is_none());
        assert!(second.is_cancelled().is_some());
        assert_eq!(tracker.current_version(), second.version());
    }

    #[test]
    fn cancel_all_cancels_current_token() {
        let tracker = SearchVersionTracker::new();
        let token = tracker.begin();
        tracker.cancel_all();
        assert!(token.is_cancelled().is_none());
    }

    #[test]
    fn clones_share_the_version() {
        let tracker = SearchVersionTracker::new();
        let token = tracker.begin();
        tracker.clone().next_version();
        assert!(token.is_cancelled().is_none());
    }
}
