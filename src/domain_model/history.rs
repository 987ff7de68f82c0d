use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One successful login, append-only.
#[derive(Debug, Clone, Serialize)]
pub struct LoginEvent {
    pub user_id: UserId,
    pub device: String,
    pub login_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    20
}

impl Default for PageParams {
    fn default() -> Self {
        PageParams { page: 1, size: 20 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub page: u32,
    pub size: u32,
    pub pages_total: u32,
    pub items: Vec<T>,
}
