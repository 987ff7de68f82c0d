use crate::application_port::AuthError;
use crate::domain_model::{LoginEvent, UserId};

#[async_trait::async_trait]
pub trait HistoryRepo: Send + Sync {
    /// Append one login event.
    async fn record(&self, user_id: UserId, device: &str) -> Result<(), AuthError>;

    async fn count_for_user(&self, user_id: UserId) -> Result<u64, AuthError>;

    /// Newest-first slice of the user's login events.
    async fn list_page(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LoginEvent>, AuthError>;
}
