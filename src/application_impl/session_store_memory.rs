use crate::domain_model::{SessionKey, SessionState, UserId};
use crate::domain_port::{RenameOutcome, SessionStore, SessionStoreError};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

struct MemoryRecord {
    #[allow(dead_code)]
    device: String,
    expires_at: DateTime<Utc>,
}

/// In-process stand-in for the Redis store, selectable as the `memory`
/// backend and used by tests. Rename is atomic under the map lock, matching
/// the atomicity the Redis RENAME gives the real backend.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, MemoryRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, MemoryRecord>>, SessionStoreError> {
        self.entries
            .lock()
            .map_err(|e| SessionStoreError::Unavailable(e.to_string()))
    }

    fn is_live(rec: &MemoryRecord) -> bool {
        rec.expires_at > Utc::now()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        key: &SessionKey,
        device: &str,
        ttl_secs: u64,
    ) -> Result<(), SessionStoreError> {
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            MemoryRecord {
                device: device.to_string(),
                expires_at: Utc::now() + Duration::seconds(ttl_secs as i64),
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &SessionKey) -> Result<bool, SessionStoreError> {
        let entries = self.lock()?;
        Ok(entries.get(&key.to_string()).is_some_and(Self::is_live))
    }

    async fn rename(
        &self,
        old: &SessionKey,
        new: &SessionKey,
    ) -> Result<RenameOutcome, SessionStoreError> {
        let mut entries = self.lock()?;
        match entries.remove(&old.to_string()) {
            Some(rec) if Self::is_live(&rec) => {
                entries.insert(new.to_string(), rec);
                Ok(RenameOutcome::Renamed)
            }
            _ => Ok(RenameOutcome::Missing),
        }
    }

    async fn scan_user(&self, user_id: UserId) -> Result<Vec<SessionKey>, SessionStoreError> {
        let suffix = format!(":{}", user_id);
        let prefix = format!("{}:", SessionState::Fresh);

        let entries = self.lock()?;
        let mut keys = Vec::new();
        for (key, rec) in entries.iter() {
            if key.starts_with(&prefix) && key.ends_with(&suffix) && Self::is_live(rec) {
                keys.push(
                    key.parse::<SessionKey>()
                        .map_err(SessionStoreError::Unavailable)?,
                );
            }
        }
        Ok(keys)
    }
}
