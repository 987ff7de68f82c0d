use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub account_service: Arc<dyn AccountService>,
    pub history_service: Arc<dyn HistoryService>,
    pub cookie_secure: bool,
    pub cookie_csrf_protect: bool,
    pool: Pool<MySql>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let pool = Pool::<MySql>::connect(&settings.mysql.dsn).await?;
        let tx_manager: Arc<dyn TxManager> = Arc::new(MySqlTxManager::new(pool.clone()));

        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher {});

        // Signing key is loaded once at startup and immutable after.
        let key = std::env::var("JWT_SIGNING_KEY")
            .unwrap_or_else(|_| settings.auth.signing_key.clone())
            .into_bytes();
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.auth.issuer.clone(),
            audience: settings.auth.audience.clone(),
            access_ttl: Duration::from_secs(settings.auth.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.auth.refresh_ttl_secs),
            signing_key: key,
        }));

        let session_store: Arc<dyn SessionStore> = match settings.auth.session_backend.as_str() {
            "memory" => Arc::new(MemorySessionStore::new()),
            "redis" => {
                let redis_client = redis::Client::open(settings.redis.dsn.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisSessionStore::new(
                    redis_manager,
                    settings.redis.key_prefix.clone(),
                ))
            }
            other => return Err(anyhow::anyhow!("Unknown session backend: {}", other)),
        };

        let auth_repo: Arc<dyn AuthRepo> = Arc::new(MySqlAuthRepo::new(pool.clone()));
        let user_repo: Arc<dyn UserRepo> = Arc::new(MySqlUserRepo::new(pool.clone()));
        let history_repo: Arc<dyn HistoryRepo> = Arc::new(MySqlHistoryRepo::new(pool.clone()));

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            auth_repo.clone(),
            user_repo.clone(),
            history_repo.clone(),
            credential_hasher.clone(),
            token_codec,
            session_store,
            tx_manager.clone(),
        ));

        let account_service: Arc<dyn AccountService> = Arc::new(RealAccountService::new(
            auth_repo,
            user_repo,
            credential_hasher,
            tx_manager,
        ));

        let history_service: Arc<dyn HistoryService> =
            Arc::new(RealHistoryService::new(history_repo));

        info!("server started");

        Ok(Self {
            auth_service,
            account_service,
            history_service,
            cookie_secure: settings.auth.cookie_secure,
            cookie_csrf_protect: settings.auth.cookie_csrf_protect,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");
        self.pool.close().await;
    }
}
