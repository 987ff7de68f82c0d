use crate::application_port::AuthError;
use crate::domain_model::{LoginEvent, Page, PageParams, UserId};

#[async_trait::async_trait]
pub trait HistoryService: Send + Sync {
    /// Newest-first page of the user's login events.
    async fn list(
        &self,
        user_id: UserId,
        params: PageParams,
    ) -> Result<Page<LoginEvent>, AuthError>;
}
