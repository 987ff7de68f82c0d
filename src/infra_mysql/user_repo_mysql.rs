use super::util::{downcast, is_dup_key};
use crate::application_port::AuthError;
use crate::domain_model::UserId;
use crate::domain_port::{StorageTx, UserRepo};
use sqlx::MySqlPool;

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        username: &str,
    ) -> Result<(), AuthError> {
        let tx = downcast(tx);

        sqlx::query(
            r#"
INSERT INTO user (user_id, username, is_active)
VALUES (?, ?, ?)
"#,
        )
        .bind(user_id.0.as_bytes() as &[u8])
        .bind(username)
        .bind(true)
        .execute(tx.conn())
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                AuthError::UserExists
            } else {
                AuthError::Store(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn update_username_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        user_id: UserId,
        new_username: &str,
    ) -> Result<(), AuthError> {
        let tx = downcast(tx);

        let result = sqlx::query("UPDATE user SET username = ? WHERE user_id = ?")
            .bind(new_username)
            .bind(user_id.0.as_bytes() as &[u8])
            .execute(tx.conn())
            .await
            .map_err(|e| {
                if is_dup_key(&e) {
                    AuthError::UserExists
                } else {
                    AuthError::Store(e.to_string())
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }

        Ok(())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AuthError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM user WHERE username = ?"#)
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(count > 0)
    }

    async fn id_exists(&self, user_id: UserId) -> Result<bool, AuthError> {
        let count: i64 =
            sqlx::query_scalar(r#"SELECT COUNT(1) FROM user WHERE user_id = ? AND is_active = 1"#)
                .bind(user_id.0.as_bytes() as &[u8])
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(count > 0)
    }
}
