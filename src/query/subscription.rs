//! `QuerySubscription`: a live view of one fingerprint.

use super::cache::Inner;
use super::Snapshot;
use crate::shared::Fingerprint;

use std::sync::Weak;
use tokio::sync::watch;

/// Handle returned by [`QueryCache::watch`](super::QueryCache::watch).
///
/// Keeps the fingerprint's background refresh alive. Dropping the handle
/// releases it without affecting other subscribers of the same fingerprint.
pub struct QuerySubscription {
    inner: Weak<Inner>,
    fingerprint: Fingerprint,
    epoch: u64,
    rx: watch::Receiver<Snapshot>,
}

impl QuerySubscription {
    pub(crate) fn new(
        inner: Weak<Inner>,
        fingerprint: Fingerprint,
        epoch: u64,
        rx: watch::Receiver<Snapshot>,
    ) -> Self {
        Self {
            inner,
            fingerprint,
            epoch,
            rx,
        }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Current snapshot, with staleness evaluated now.
    pub fn snapshot(&self) -> Snapshot {
        self.inner
            .upgrade()
            .and_then(|inner| inner.snapshot_for(&self.fingerprint, self.epoch))
            .unwrap_or_else(|| self.rx.borrow().clone())
    }

    /// Wait for the entry to change and return the new snapshot.
    ///
    /// Returns `None` once the cache dropped the entry (shutdown or clear).
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

impl Clone for QuerySubscription {
    fn clone(&self) -> Self {
        if let Some(inner) = self.inner.upgrade() {
            inner.retain(&self.fingerprint, self.epoch);
        }
        Self {
            inner: self.inner.clone(),
            fingerprint: self.fingerprint.clone(),
            epoch: self.epoch,
            rx: self.rx.clone(),
        }
    }
}

impl Drop for QuerySubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.release(&self.fingerprint, self.epoch);
        }
    }
}

impl std::fmt::Debug for QuerySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySubscription")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}
