use super::auth_service_impl::password_is_safe;
use crate::application_port::{AccountService, AuthError, CredentialHasher};
use crate::domain_model::UserId;
use crate::domain_port::{AuthRepo, TxManager, UserRepo};
use std::sync::Arc;

pub struct RealAccountService {
    auth_repo: Arc<dyn AuthRepo>,
    user_repo: Arc<dyn UserRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    tx_manager: Arc<dyn TxManager>,
    min_username_len: usize,
}

impl RealAccountService {
    pub fn new(
        auth_repo: Arc<dyn AuthRepo>,
        user_repo: Arc<dyn UserRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            auth_repo,
            user_repo,
            credential_hasher,
            tx_manager,
            min_username_len: 4,
        }
    }
}

#[async_trait::async_trait]
impl AccountService for RealAccountService {
    async fn change_username(
        &self,
        user_id: UserId,
        new_username: &str,
    ) -> Result<(), AuthError> {
        if new_username.len() < self.min_username_len {
            return Err(AuthError::InvalidAccountData(format!(
                "username length must be >= {}",
                self.min_username_len
            )));
        }

        let rec = self
            .auth_repo
            .get_by_user_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if rec.username == new_username {
            return Err(AuthError::InvalidAccountData(
                "new username must be different".to_string(),
            ));
        }
        if self.user_repo.username_exists(new_username).await? {
            return Err(AuthError::UserExists);
        }

        // The username lives on both the user and credential rows; change
        // them together or not at all.
        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        self.user_repo
            .update_username_in_tx(tx.as_mut(), user_id, new_username)
            .await?;
        self.auth_repo
            .update_username_in_tx(tx.as_mut(), user_id, new_username)
            .await?;

        tx.commit()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(())
    }

    async fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let rec = self
            .auth_repo
            .get_by_user_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let ok = self
            .credential_hasher
            .verify_password(old_password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }
        if !password_is_safe(new_password) {
            return Err(AuthError::InvalidAccountData(
                "password is too weak".to_string(),
            ));
        }
        if old_password == new_password {
            return Err(AuthError::InvalidAccountData(
                "new password must be different".to_string(),
            ));
        }
        if new_password == rec.username {
            return Err(AuthError::InvalidAccountData(
                "password cannot be same as username".to_string(),
            ));
        }

        let password_hash = self.credential_hasher.hash_password(new_password).await?;
        self.auth_repo
            .update_password_hash(user_id, &password_hash)
            .await?;

        Ok(())
    }
}
