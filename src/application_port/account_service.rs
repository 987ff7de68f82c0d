use crate::application_port::AuthError;
use crate::domain_model::UserId;

#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    async fn change_username(&self, user_id: UserId, new_username: &str)
    -> Result<(), AuthError>;

    async fn change_password(
        &self,
        user_id: UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}
