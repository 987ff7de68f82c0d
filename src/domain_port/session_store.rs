use crate::domain_model::{SessionKey, UserId};

/// The store is the single source of truth for "has this refresh token been
/// consumed". Every call is a remote round trip; there is no in-process cache.
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RenameOutcome {
    Renamed,
    /// The old key was already gone. A race between concurrent redemptions
    /// lands here for the loser; callers decide whether that is fatal.
    Missing,
}

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Create or overwrite a freshness record. Idempotent under retry.
    async fn put(
        &self,
        key: &SessionKey,
        device: &str,
        ttl_secs: u64,
    ) -> Result<(), SessionStoreError>;

    /// Existence check only; record contents are never inspected.
    async fn exists(&self, key: &SessionKey) -> Result<bool, SessionStoreError>;

    /// Atomic key rename, used for the fresh -> used transition. At most one
    /// of two concurrent callers observes `Renamed`. The record's TTL is
    /// preserved.
    async fn rename(
        &self,
        old: &SessionKey,
        new: &SessionKey,
    ) -> Result<RenameOutcome, SessionStoreError>;

    /// All fresh session keys of one user, for logout-all.
    async fn scan_user(&self, user_id: UserId) -> Result<Vec<SessionKey>, SessionStoreError>;
}
