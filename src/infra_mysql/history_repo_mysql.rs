use crate::application_port::AuthError;
use crate::domain_model::{LoginEvent, UserId};
use crate::domain_port::HistoryRepo;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

pub struct MySqlHistoryRepo {
    pool: MySqlPool,
}

impl MySqlHistoryRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlHistoryRepo { pool }
    }
}

#[async_trait::async_trait]
impl HistoryRepo for MySqlHistoryRepo {
    async fn record(&self, user_id: UserId, device: &str) -> Result<(), AuthError> {
        sqlx::query(
            r#"
INSERT INTO login_history (user_id, device, login_at)
VALUES (?, ?, NOW())
"#,
        )
        .bind(user_id.0.as_bytes() as &[u8])
        .bind(device)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(())
    }

    async fn count_for_user(&self, user_id: UserId) -> Result<u64, AuthError> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(*) FROM login_history WHERE user_id = ?"#)
                .bind(user_id.0.as_bytes() as &[u8])
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(count as u64)
    }

    async fn list_page(
        &self,
        user_id: UserId,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LoginEvent>, AuthError> {
        let rows = sqlx::query(
            r#"
SELECT user_id, device, login_at
FROM login_history
WHERE user_id = ?
ORDER BY login_at DESC
LIMIT ? OFFSET ?
"#,
        )
        .bind(user_id.0.as_bytes() as &[u8])
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let user_id_bytes: Vec<u8> = row
                    .try_get("user_id")
                    .map_err(|e| AuthError::Store(e.to_string()))?;
                let user_id = UserId(
                    Uuid::from_slice(&user_id_bytes)
                        .map_err(|e| AuthError::Store(e.to_string()))?,
                );
                let device: String = row
                    .try_get("device")
                    .map_err(|e| AuthError::Store(e.to_string()))?;
                let login_at: DateTime<Utc> = row
                    .try_get("login_at")
                    .map_err(|e| AuthError::Store(e.to_string()))?;

                Ok(LoginEvent {
                    user_id,
                    device,
                    login_at,
                })
            })
            .collect()
    }
}
