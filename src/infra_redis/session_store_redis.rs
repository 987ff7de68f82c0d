use crate::domain_model::{SessionKey, UserId};
use crate::domain_port::{RenameOutcome, SessionStore, SessionStoreError};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ErrorKind, RedisError};

/// Redis-backed freshness registry. One key per issued refresh token,
/// `"<prefix>:<state>:<jti>:<userId>"`, value = device tag, expiry = token
/// expiry. RENAME preserves the TTL and is atomic, which is what makes the
/// fresh -> used transition race-safe.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, session_key: &SessionKey) -> String {
        format!("{}:{}", self.prefix, session_key)
    }

    fn parse_key(&self, raw: &str) -> Result<SessionKey, SessionStoreError> {
        let stripped = raw
            .strip_prefix(&self.prefix)
            .and_then(|s| s.strip_prefix(':'))
            .unwrap_or(raw);
        stripped
            .parse::<SessionKey>()
            .map_err(SessionStoreError::Unavailable)
    }

    fn store_err(e: RedisError) -> SessionStoreError {
        SessionStoreError::Unavailable(e.to_string())
    }

    fn is_missing_key(e: &RedisError) -> bool {
        e.kind() == ErrorKind::ResponseError
            && e.detail().is_some_and(|d| d.contains("no such key"))
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(
        &self,
        key: &SessionKey,
        device: &str,
        ttl_secs: u64,
    ) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(self.key(key), device, ttl_secs)
            .await
            .map_err(Self::store_err)?;
        Ok(())
    }

    async fn exists(&self, key: &SessionKey) -> Result<bool, SessionStoreError> {
        let mut conn = self.conn.clone();
        conn.exists(self.key(key)).await.map_err(Self::store_err)
    }

    async fn rename(
        &self,
        old: &SessionKey,
        new: &SessionKey,
    ) -> Result<RenameOutcome, SessionStoreError> {
        let mut conn = self.conn.clone();
        match conn
            .rename::<_, _, ()>(self.key(old), self.key(new))
            .await
        {
            Ok(()) => Ok(RenameOutcome::Renamed),
            Err(e) if Self::is_missing_key(&e) => Ok(RenameOutcome::Missing),
            Err(e) => Err(Self::store_err(e)),
        }
    }

    async fn scan_user(&self, user_id: UserId) -> Result<Vec<SessionKey>, SessionStoreError> {
        let pattern = format!("{}:{}", self.prefix, SessionKey::fresh_scan_pattern(user_id));

        let mut conn = self.conn.clone();
        let mut iter = conn
            .scan_match::<_, String>(pattern)
            .await
            .map_err(Self::store_err)?;

        let mut raw_keys = Vec::new();
        while let Some(key) = iter.next_item().await {
            raw_keys.push(key);
        }
        drop(iter);

        raw_keys.iter().map(|raw| self.parse_key(raw)).collect()
    }
}
