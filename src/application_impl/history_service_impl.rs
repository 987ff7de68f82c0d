use crate::application_port::{AuthError, HistoryService};
use crate::domain_model::{LoginEvent, Page, PageParams, UserId};
use crate::domain_port::HistoryRepo;
use std::sync::Arc;

pub struct RealHistoryService {
    history_repo: Arc<dyn HistoryRepo>,
}

impl RealHistoryService {
    pub fn new(history_repo: Arc<dyn HistoryRepo>) -> Self {
        Self { history_repo }
    }

    fn pages_total(count: u64, size: u32) -> u32 {
        if count == 0 {
            return 1;
        }
        ((count - 1) / size as u64 + 1) as u32
    }
}

#[async_trait::async_trait]
impl HistoryService for RealHistoryService {
    async fn list(
        &self,
        user_id: UserId,
        params: PageParams,
    ) -> Result<Page<LoginEvent>, AuthError> {
        if params.page == 0 || params.size == 0 {
            return Err(AuthError::InvalidAccountData(
                "page and size must be positive".to_string(),
            ));
        }

        let count = self.history_repo.count_for_user(user_id).await?;
        let pages_total = Self::pages_total(count, params.size);

        if params.page > pages_total {
            return Err(AuthError::InvalidAccountData(format!(
                "page number is greater than total count ({} > {})",
                params.page, pages_total
            )));
        }

        let offset = (params.page - 1) * params.size;
        let items = self
            .history_repo
            .list_page(user_id, params.size, offset)
            .await?;

        Ok(Page {
            page: params.page,
            size: params.size,
            pages_total,
            items,
        })
    }
}
