//! In-memory collaborators for service-level tests.

use crate::application_port::{AuthError, TokenTransport};
use crate::domain_model::{
    AccessToken, AuthTokens, LoginEvent, RefreshToken, SessionKey, UserId,
};
use crate::domain_port::{
    AuthCredentialsRecord, AuthRepo, HistoryRepo, RenameOutcome, SessionStore, SessionStoreError,
    StorageTx, TxManager, UserRepo,
};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct NoopTxManager;

#[async_trait::async_trait]
impl TxManager for NoopTxManager {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>> {
        Ok(Box::new(NoopTx))
    }
}

pub struct NoopTx;

#[async_trait::async_trait]
impl<'t> StorageTx<'t> for NoopTx {
    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// One map-backed database standing in for the user, credential and history
/// tables.
#[derive(Default)]
pub struct MemoryDb {
    users: Mutex<HashMap<UserId, String>>,
    credentials: Mutex<HashMap<UserId, AuthCredentialsRecord>>,
    history: Mutex<Vec<LoginEvent>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl UserRepo for MemoryDb {
    async fn create_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        username: &str,
    ) -> Result<(), AuthError> {
        self.users
            .lock()
            .unwrap()
            .insert(user_id, username.to_string());
        Ok(())
    }

    async fn update_username_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        new_username: &str,
    ) -> Result<(), AuthError> {
        self.users
            .lock()
            .unwrap()
            .insert(user_id, new_username.to_string());
        Ok(())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        Ok(self.users.lock().unwrap().values().any(|u| u == username))
    }

    async fn id_exists(&self, user_id: UserId) -> Result<bool, AuthError> {
        Ok(self.users.lock().unwrap().contains_key(&user_id))
    }
}

#[async_trait::async_trait]
impl AuthRepo for MemoryDb {
    async fn create_credentials_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<(), AuthError> {
        self.credentials.lock().unwrap().insert(
            user_id,
            AuthCredentialsRecord {
                user_id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                role: role.to_string(),
                is_active: true,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AuthCredentialsRecord>, AuthError> {
        Ok(self
            .credentials
            .lock()
            .unwrap()
            .values()
            .find(|rec| rec.username == username)
            .cloned())
    }

    async fn get_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<AuthCredentialsRecord>, AuthError> {
        Ok(self.credentials.lock().unwrap().get(&user_id).cloned())
    }

    async fn update_username_in_tx<'t>(
        &self,
        _tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        new_username: &str,
    ) -> Result<(), AuthError> {
        if let Some(rec) = self.credentials.lock().unwrap().get_mut(&user_id) {
            rec.username = new_username.to_string();
        }
        Ok(())
    }

    async fn update_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), AuthError> {
        if let Some(rec) = self.credentials.lock().unwrap().get_mut(&user_id) {
            rec.password_hash = password_hash.to_string();
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl HistoryRepo for MemoryDb {
    async fn record(&self, user_id: UserId, device: &str) -> Result<(), AuthError> {
        self.history.lock().unwrap().push(LoginEvent {
            user_id,
            device: device.to_string(),
            login_at: Utc::now(),
        });
        Ok(())
    }

    async fn count_for_user(&self, user_id: UserId) -> Result<u64, AuthError> {
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .count() as u64)
    }

    async fn list_page(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LoginEvent>, AuthError> {
        let mut events: Vec<LoginEvent> = self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.login_at.cmp(&a.login_at));
        Ok(events
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

/// Transport fake that records what the service delivered or cleared.
#[derive(Default)]
pub struct CapturingTransport {
    inbound_access: Option<String>,
    inbound_refresh: Option<String>,
    delivered: Mutex<Option<AuthTokens>>,
    cleared: Mutex<bool>,
}

impl CapturingTransport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_refresh(token: impl Into<String>) -> Self {
        CapturingTransport {
            inbound_refresh: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn with_access(token: impl Into<String>) -> Self {
        CapturingTransport {
            inbound_access: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn delivered_tokens(&self) -> Option<AuthTokens> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn was_cleared(&self) -> bool {
        *self.cleared.lock().unwrap()
    }
}

impl TokenTransport for CapturingTransport {
    fn set_credentials(&self, tokens: &AuthTokens) {
        *self.delivered.lock().unwrap() = Some(tokens.clone());
    }

    fn clear_credentials(&self) {
        *self.cleared.lock().unwrap() = true;
    }

    fn current_access_token(&self) -> Option<AccessToken> {
        self.inbound_access.clone().map(AccessToken)
    }

    fn current_refresh_token(&self) -> Option<RefreshToken> {
        self.inbound_refresh.clone().map(RefreshToken)
    }
}

/// Store whose every call fails, for fail-closed tests.
pub struct UnreachableSessionStore;

#[async_trait::async_trait]
impl SessionStore for UnreachableSessionStore {
    async fn put(
        &self,
        _key: &SessionKey,
        _device: &str,
        _ttl_secs: u64,
    ) -> Result<(), SessionStoreError> {
        Err(SessionStoreError::Unavailable("store offline".to_string()))
    }

    async fn exists(&self, _key: &SessionKey) -> Result<bool, SessionStoreError> {
        Err(SessionStoreError::Unavailable("store offline".to_string()))
    }

    async fn rename(
        &self,
        _old: &SessionKey,
        _new: &SessionKey,
    ) -> Result<RenameOutcome, SessionStoreError> {
        Err(SessionStoreError::Unavailable("store offline".to_string()))
    }

    async fn scan_user(&self, _user_id: UserId) -> Result<Vec<SessionKey>, SessionStoreError> {
        Err(SessionStoreError::Unavailable("store offline".to_string()))
    }
}
