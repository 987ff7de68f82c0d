use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::repo_tx::StorageTx;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct AuthCredentialsRecord {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait AuthRepo: Send + Sync {
    /// Insert a credentials row. The `user_id` row must already exist (FK).
    async fn create_credentials_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<(), AuthError>;

    /// Fetch credentials by username (for login).
    async fn get_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AuthCredentialsRecord>, AuthError>;

    /// Fetch credentials by user id (for account changes).
    async fn get_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<AuthCredentialsRecord>, AuthError>;

    async fn update_username_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        new_username: &str,
    ) -> Result<(), AuthError>;

    async fn update_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), AuthError>;
}
