use crate::application_port::{
    AuthError, AuthService, CredentialHasher, LoginInput, SignupInput, TokenCodec, TokenTransport,
};
use crate::domain_model::{
    AccessToken, AuthTokens, ExtraClaims, RefreshToken, SessionKey, TokenClaims, TokenKind, UserId,
};
use crate::domain_port::{AuthRepo, HistoryRepo, RenameOutcome, SessionStore, TxManager, UserRepo};
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct Argon2PasswordHasher;

#[async_trait::async_trait]
impl CredentialHasher for Argon2PasswordHasher {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash).map_err(|e| {
            AuthError::InternalError(format!("invalid PHC hash: {}", e.to_string()))
        })?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!(
                "verify error: {}",
                e.to_string()
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub signing_key: Vec<u8>,
}

/// Wire shape of both token kinds. `type` distinguishes access from refresh so
/// one can never be presented as the other.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    jti: String,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
    #[serde(rename = "type")]
    kind: TokenKind,
    #[serde(flatten)]
    claims: ExtraClaims,
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig) -> Self {
        JwtHs256Codec { cfg }
    }

    fn lifetime(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.cfg.access_ttl,
            TokenKind::Refresh => self.cfg.refresh_ttl,
        }
    }

    fn from_timestamp(secs: i64) -> Result<DateTime<Utc>, AuthError> {
        DateTime::<Utc>::from_timestamp(secs, 0).ok_or(AuthError::TokenMalformed)
    }
}

impl TokenCodec for JwtHs256Codec {
    fn issue(
        &self,
        user_id: UserId,
        kind: TokenKind,
        claims: &ExtraClaims,
    ) -> Result<(String, TokenClaims), AuthError> {
        let issued_at = Utc::now();
        let expires_at = issued_at + self.lifetime(kind);
        let jti = Uuid::new_v4().to_string();

        let wire = WireClaims {
            sub: user_id.to_string(),
            jti: jti.clone(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            iss: self.cfg.issuer.clone(),
            aud: self.cfg.audience.clone(),
            kind,
            claims: claims.clone(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &wire,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| AuthError::InternalError(e.to_string()))?;

        Ok((
            token,
            TokenClaims {
                user_id,
                jti,
                kind,
                issued_at,
                expires_at,
                claims: claims.clone(),
            },
        ))
    }

    fn decode(&self, token: &str, expected_kind: TokenKind) -> Result<TokenClaims, AuthError> {
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = true;
        v.set_audience(&[self.cfg.audience.clone()]);
        v.set_issuer(&[self.cfg.issuer.clone()]);

        let data = decode::<WireClaims>(
            token,
            &DecodingKey::from_secret(&self.cfg.signing_key),
            &v,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenMalformed,
        })?;

        let wire = data.claims;
        if wire.kind != expected_kind {
            return Err(AuthError::TokenMalformed);
        }
        let user_id = wire
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::TokenMalformed)?;

        Ok(TokenClaims {
            user_id,
            jti: wire.jti,
            kind: wire.kind,
            issued_at: Self::from_timestamp(wire.iat)?,
            expires_at: Self::from_timestamp(wire.exp)?,
            claims: wire.claims,
        })
    }
}

/// Password policy: at least 8 chars mixing upper case, lower case and digits.
pub(crate) fn password_is_safe(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

const DEFAULT_ROLE: &str = "user";

pub struct RealAuthService {
    auth_repo: Arc<dyn AuthRepo>,
    user_repo: Arc<dyn UserRepo>,
    history_repo: Arc<dyn HistoryRepo>,
    credential_hasher: Arc<dyn CredentialHasher>,
    token_codec: Arc<dyn TokenCodec>,
    session_store: Arc<dyn SessionStore>,
    tx_manager: Arc<dyn TxManager>,
    min_username_len: usize,
}

impl RealAuthService {
    pub fn new(
        auth_repo: Arc<dyn AuthRepo>,
        user_repo: Arc<dyn UserRepo>,
        history_repo: Arc<dyn HistoryRepo>,
        credential_hasher: Arc<dyn CredentialHasher>,
        token_codec: Arc<dyn TokenCodec>,
        session_store: Arc<dyn SessionStore>,
        tx_manager: Arc<dyn TxManager>,
    ) -> Self {
        Self {
            auth_repo,
            user_repo,
            history_repo,
            credential_hasher,
            token_codec,
            session_store,
            tx_manager,
            min_username_len: 4,
        }
    }

    fn validate_signup(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.len() < self.min_username_len {
            return Err(AuthError::InvalidAccountData(format!(
                "username length must be >= {}",
                self.min_username_len
            )));
        }
        if !password_is_safe(password) {
            return Err(AuthError::InvalidAccountData(
                "password is too weak".to_string(),
            ));
        }
        if password == username {
            return Err(AuthError::InvalidAccountData(
                "password cannot be same as username".to_string(),
            ));
        }
        Ok(())
    }

    fn ttl_secs(until: DateTime<Utc>) -> u64 {
        let now = Utc::now();
        let secs = (until - now).num_seconds();
        if secs <= 0 { 1 } else { secs as u64 }
    }

    /// Transition one session record to used, swallowing every failure.
    /// Losing a race on the *old* token must never block work on the new one.
    async fn invalidate_best_effort(&self, fresh: &SessionKey) {
        let used = fresh.clone().into_used();
        match self.session_store.rename(fresh, &used).await {
            Ok(RenameOutcome::Renamed) => debug!(key = %fresh, "session marked used"),
            Ok(RenameOutcome::Missing) => {
                debug!(key = %fresh, "session already consumed or expired")
            }
            Err(e) => warn!(key = %fresh, error = %e, "session invalidation failed"),
        }
    }

    /// Decode the refresh token currently on the transport without touching
    /// the store.
    fn decode_current_refresh(
        &self,
        transport: &dyn TokenTransport,
    ) -> Result<TokenClaims, AuthError> {
        let token = transport
            .current_refresh_token()
            .ok_or(AuthError::Unauthenticated)?;
        self.token_codec.decode(&token.0, TokenKind::Refresh)
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn signup(&self, request: SignupInput) -> Result<UserId, AuthError> {
        let SignupInput { username, password } = request;

        self.validate_signup(&username, &password)?;

        if self.user_repo.username_exists(&username).await? {
            return Err(AuthError::UserExists);
        }

        let mut tx = self
            .tx_manager
            .begin()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let user_id = UserId(Uuid::new_v4());

        self.user_repo
            .create_in_tx(tx.as_mut(), user_id, &username)
            .await?;

        let password_hash = self.credential_hasher.hash_password(&password).await?;
        self.auth_repo
            .create_credentials_in_tx(tx.as_mut(), user_id, &username, &password_hash, DEFAULT_ROLE)
            .await?;

        tx.commit()
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        Ok(user_id)
    }

    async fn login(
        &self,
        request: LoginInput,
        transport: &dyn TokenTransport,
    ) -> Result<UserId, AuthError> {
        let LoginInput {
            username,
            password,
            device,
        } = request;

        let rec = self
            .auth_repo
            .get_by_username(&username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !rec.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        let ok = self
            .credential_hasher
            .verify_password(&password, &rec.password_hash)
            .await?;
        if !ok {
            return Err(AuthError::InvalidCredentials);
        }

        if let Err(e) = self.history_repo.record(rec.user_id, &device).await {
            warn!(user_id = %rec.user_id, error = %e, "failed to record login history");
        }

        let claims = ExtraClaims::with_role_and_device(rec.role.clone(), device);
        self.new_token_pair(rec.user_id, claims, transport).await?;

        Ok(rec.user_id)
    }

    async fn new_token_pair(
        &self,
        user_id: UserId,
        claims: ExtraClaims,
        transport: &dyn TokenTransport,
    ) -> Result<(), AuthError> {
        // A refresh token still on the transport has either just been
        // redeemed or is being replaced; retire its record best-effort.
        if let Ok(old) = self.decode_current_refresh(transport) {
            self.invalidate_best_effort(&SessionKey::fresh(old.jti, old.user_id))
                .await;
        }

        let (access, access_claims) = self
            .token_codec
            .issue(user_id, TokenKind::Access, &claims)?;
        let (refresh, refresh_claims) = self
            .token_codec
            .issue(user_id, TokenKind::Refresh, &claims)?;

        let key = SessionKey::fresh(refresh_claims.jti.clone(), user_id);
        let ttl = Self::ttl_secs(refresh_claims.expires_at);
        self.session_store
            .put(&key, claims.device_tag(), ttl)
            .await?;

        transport.set_credentials(&AuthTokens {
            access_token: AccessToken(access),
            refresh_token: RefreshToken(refresh),
            access_token_expires_at: access_claims.expires_at,
            refresh_token_expires_at: refresh_claims.expires_at,
        });

        Ok(())
    }

    async fn refresh_token_required(
        &self,
        transport: &dyn TokenTransport,
    ) -> Result<TokenClaims, AuthError> {
        let claims = self.decode_current_refresh(transport)?;

        if !self.user_repo.id_exists(claims.user_id).await? {
            return Err(AuthError::Unauthenticated);
        }

        // Possession of a valid unexpired token is necessary but not
        // sufficient: the fresh record must still exist, and this call
        // consumes it. The atomic rename decides races between concurrent
        // redemptions.
        let fresh = SessionKey::fresh(claims.jti.clone(), claims.user_id);
        let used = fresh.clone().into_used();
        match self.session_store.rename(&fresh, &used).await? {
            RenameOutcome::Renamed => Ok(claims),
            RenameOutcome::Missing => {
                if self.session_store.exists(&used).await? {
                    warn!(
                        user_id = %claims.user_id,
                        jti = %claims.jti,
                        "refresh token replayed after redemption"
                    );
                } else {
                    warn!(
                        user_id = %claims.user_id,
                        jti = %claims.jti,
                        "refresh token has no session record"
                    );
                }
                Err(AuthError::Unauthenticated)
            }
        }
    }

    async fn jwt_required(&self, transport: &dyn TokenTransport) -> Result<TokenClaims, AuthError> {
        let token = transport
            .current_access_token()
            .ok_or(AuthError::Unauthenticated)?;
        let claims = self.token_codec.decode(&token.0, TokenKind::Access)?;

        if !self.user_repo.id_exists(claims.user_id).await? {
            return Err(AuthError::Unauthenticated);
        }

        Ok(claims)
    }

    async fn logout(&self, transport: &dyn TokenTransport) -> Result<(), AuthError> {
        let result = match self.decode_current_refresh(transport) {
            Ok(claims) => {
                self.invalidate_best_effort(&SessionKey::fresh(claims.jti, claims.user_id))
                    .await;
                Ok(())
            }
            Err(e) => Err(e),
        };

        // The client can always log out locally, whatever the server state.
        transport.clear_credentials();
        result
    }

    async fn logout_all(&self, transport: &dyn TokenTransport) -> Result<(), AuthError> {
        let result = async {
            // Strict variant: the caller must hold a currently-fresh refresh
            // token, which this consumes.
            let claims = self.refresh_token_required(transport).await?;

            let keys = self.session_store.scan_user(claims.user_id).await?;
            for key in &keys {
                self.invalidate_best_effort(key).await;
            }
            debug!(user_id = %claims.user_id, sessions = keys.len(), "logout all devices");
            Ok(())
        }
        .await;

        transport.clear_credentials();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_impl::MemorySessionStore;
    use crate::application_impl::test_support::*;
    use crate::domain_port::SessionStore;

    fn test_cfg() -> JwtConfig {
        JwtConfig {
            issuer: "gatehouse.auth".to_string(),
            audience: "gatehouse-client".to_string(),
            access_ttl: Duration::from_secs(300),
            refresh_ttl: Duration::from_secs(3600),
            signing_key: b"test-signing-key".to_vec(),
        }
    }

    fn harness_with_store(
        store: Arc<dyn SessionStore>,
    ) -> (Arc<RealAuthService>, Arc<MemoryDb>, Arc<JwtHs256Codec>) {
        let db = Arc::new(MemoryDb::new());
        let codec = Arc::new(JwtHs256Codec::new(test_cfg()));
        let service = Arc::new(RealAuthService::new(
            db.clone(),
            db.clone(),
            db.clone(),
            Arc::new(Argon2PasswordHasher),
            codec.clone(),
            store,
            Arc::new(NoopTxManager),
        ));
        (service, db, codec)
    }

    fn harness() -> (Arc<RealAuthService>, Arc<MemoryDb>, Arc<JwtHs256Codec>) {
        harness_with_store(Arc::new(MemorySessionStore::new()))
    }

    async fn signup_and_login(
        service: &RealAuthService,
        username: &str,
        device: &str,
    ) -> (UserId, AuthTokens) {
        let user_id = service
            .signup(SignupInput {
                username: username.to_string(),
                password: "Sup3rSecret".to_string(),
            })
            .await
            .unwrap();

        let transport = CapturingTransport::empty();
        service
            .login(
                LoginInput {
                    username: username.to_string(),
                    password: "Sup3rSecret".to_string(),
                    device: device.to_string(),
                },
                &transport,
            )
            .await
            .unwrap();

        (user_id, transport.delivered_tokens().unwrap())
    }

    #[tokio::test]
    async fn login_delivers_a_pair_for_the_subject_with_claims() {
        let (service, db, codec) = harness();
        let (user_id, tokens) = signup_and_login(&service, "alice01", "chrome").await;

        let access = codec
            .decode(&tokens.access_token.0, TokenKind::Access)
            .unwrap();
        let refresh = codec
            .decode(&tokens.refresh_token.0, TokenKind::Refresh)
            .unwrap();

        assert_eq!(access.user_id, user_id);
        assert_eq!(refresh.user_id, user_id);
        assert_eq!(access.claims.role.as_deref(), Some("user"));
        assert_eq!(access.claims.device.as_deref(), Some("chrome"));
        assert_eq!(refresh.claims.device.as_deref(), Some("chrome"));
        assert_ne!(access.jti, refresh.jti);
        assert_eq!(db.history_len(), 1);
    }

    #[tokio::test]
    async fn issued_tokens_carry_caller_claims_superset() {
        let (service, db, codec) = harness();
        let user_id = service
            .signup(SignupInput {
                username: "alice01".to_string(),
                password: "Sup3rSecret".to_string(),
            })
            .await
            .unwrap();
        let _ = db;

        let mut claims = ExtraClaims::with_role_and_device("admin", "tablet");
        claims
            .extra
            .insert("org".to_string(), serde_json::json!("acme"));

        let transport = CapturingTransport::empty();
        service
            .new_token_pair(user_id, claims, &transport)
            .await
            .unwrap();

        let tokens = transport.delivered_tokens().unwrap();
        let refresh = codec
            .decode(&tokens.refresh_token.0, TokenKind::Refresh)
            .unwrap();
        assert_eq!(refresh.claims.role.as_deref(), Some("admin"));
        assert_eq!(refresh.claims.device.as_deref(), Some("tablet"));
        assert_eq!(refresh.claims.extra["org"], serde_json::json!("acme"));
    }

    #[tokio::test]
    async fn redeemed_refresh_token_fails_the_gate_on_replay() {
        let (service, _, _) = harness();
        let (user_id, tokens) = signup_and_login(&service, "alice01", "chrome").await;
        let old_refresh = tokens.refresh_token.0;

        // Redeem: gate, then issue the replacement pair.
        let transport = CapturingTransport::with_refresh(old_refresh.clone());
        let claims = service.refresh_token_required(&transport).await.unwrap();
        assert_eq!(claims.user_id, user_id);
        service
            .new_token_pair(user_id, claims.claims, &transport)
            .await
            .unwrap();
        let new_refresh = transport.delivered_tokens().unwrap().refresh_token.0;

        // The old token decodes fine but its session is spent.
        let replay = CapturingTransport::with_refresh(old_refresh);
        assert!(matches!(
            service.refresh_token_required(&replay).await,
            Err(AuthError::Unauthenticated)
        ));

        // The replacement works.
        let next = CapturingTransport::with_refresh(new_refresh);
        assert!(service.refresh_token_required(&next).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_redemption_has_exactly_one_winner() {
        let (service, _, _) = harness();
        let (_, tokens) = signup_and_login(&service, "alice01", "chrome").await;

        let t1 = CapturingTransport::with_refresh(tokens.refresh_token.0.clone());
        let t2 = CapturingTransport::with_refresh(tokens.refresh_token.0.clone());

        let (r1, r2) = tokio::join!(
            service.refresh_token_required(&t1),
            service.refresh_token_required(&t2)
        );

        let wins = [&r1, &r2].iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        for r in [r1, r2] {
            if let Err(e) = r {
                assert!(matches!(e, AuthError::Unauthenticated));
            }
        }
    }

    #[tokio::test]
    async fn logout_consumes_the_session_and_always_clears() {
        let (service, _, _) = harness();
        let (_, tokens) = signup_and_login(&service, "alice01", "chrome").await;
        let refresh = tokens.refresh_token.0;

        let transport = CapturingTransport::with_refresh(refresh.clone());
        service.logout(&transport).await.unwrap();
        assert!(transport.was_cleared());

        let replay = CapturingTransport::with_refresh(refresh.clone());
        assert!(matches!(
            service.refresh_token_required(&replay).await,
            Err(AuthError::Unauthenticated)
        ));

        // Second logout with the spent token: invalidation is best-effort,
        // the client still ends up cleared.
        let again = CapturingTransport::with_refresh(refresh);
        service.logout(&again).await.unwrap();
        assert!(again.was_cleared());
    }

    #[tokio::test]
    async fn logout_without_a_token_still_clears_locally() {
        let (service, _, _) = harness();
        let transport = CapturingTransport::empty();
        assert!(matches!(
            service.logout(&transport).await,
            Err(AuthError::Unauthenticated)
        ));
        assert!(transport.was_cleared());
    }

    #[tokio::test]
    async fn logout_all_kills_every_session_of_that_user_only() {
        let (service, _, _) = harness();
        let (_, alice_first) = signup_and_login(&service, "alice01", "chrome").await;
        let (_, bob_tokens) = signup_and_login(&service, "bob0123", "safari").await;

        // A second alice login, giving her two live sessions.
        let transport = CapturingTransport::empty();
        service
            .login(
                LoginInput {
                    username: "alice01".to_string(),
                    password: "Sup3rSecret".to_string(),
                    device: "firefox".to_string(),
                },
                &transport,
            )
            .await
            .unwrap();
        let alice_second = transport.delivered_tokens().unwrap();

        let all = CapturingTransport::with_refresh(alice_second.refresh_token.0);
        service.logout_all(&all).await.unwrap();
        assert!(all.was_cleared());

        let first = CapturingTransport::with_refresh(alice_first.refresh_token.0);
        assert!(matches!(
            service.refresh_token_required(&first).await,
            Err(AuthError::Unauthenticated)
        ));

        let bob = CapturingTransport::with_refresh(bob_tokens.refresh_token.0);
        assert!(service.refresh_token_required(&bob).await.is_ok());
    }

    #[tokio::test]
    async fn logout_all_requires_a_fresh_token() {
        let (service, _, _) = harness();
        let (_, tokens) = signup_and_login(&service, "alice01", "chrome").await;
        let refresh = tokens.refresh_token.0;

        let transport = CapturingTransport::with_refresh(refresh.clone());
        service.logout(&transport).await.unwrap();

        let stale = CapturingTransport::with_refresh(refresh);
        assert!(matches!(
            service.logout_all(&stale).await,
            Err(AuthError::Unauthenticated)
        ));
        assert!(stale.was_cleared());
    }

    #[tokio::test]
    async fn expired_refresh_is_rejected_without_store_mutation() {
        // Keep a concrete store handle so the record can be inspected after.
        let store = Arc::new(MemorySessionStore::new());
        let (service, _, _) = harness_with_store(store.clone());
        let user_id = service
            .signup(SignupInput {
                username: "alice01".to_string(),
                password: "Sup3rSecret".to_string(),
            })
            .await
            .unwrap();

        // Hand-roll a token whose exp is well past the validation leeway.
        let cfg = test_cfg();
        let now = Utc::now();
        let wire = WireClaims {
            sub: user_id.to_string(),
            jti: "expired-jti".to_string(),
            exp: (now - chrono::Duration::seconds(3600)).timestamp(),
            iat: (now - chrono::Duration::seconds(7200)).timestamp(),
            iss: cfg.issuer.clone(),
            aud: cfg.audience.clone(),
            kind: TokenKind::Refresh,
            claims: ExtraClaims::default(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &wire,
            &EncodingKey::from_secret(&cfg.signing_key),
        )
        .unwrap();

        let key = SessionKey::fresh("expired-jti", user_id);
        store.put(&key, "chrome", 60).await.unwrap();

        let transport = CapturingTransport::with_refresh(token);
        assert!(matches!(
            service.refresh_token_required(&transport).await,
            Err(AuthError::TokenExpired)
        ));
        // Rejection left the record untouched.
        assert!(store.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_store_fails_closed() {
        let (service, _, codec) = harness_with_store(Arc::new(UnreachableSessionStore));
        let user_id = service
            .signup(SignupInput {
                username: "alice01".to_string(),
                password: "Sup3rSecret".to_string(),
            })
            .await
            .unwrap();

        let (refresh, _) = codec
            .issue(user_id, TokenKind::Refresh, &ExtraClaims::default())
            .unwrap();

        let gate = CapturingTransport::with_refresh(refresh);
        assert!(matches!(
            service.refresh_token_required(&gate).await,
            Err(AuthError::StoreUnavailable(_))
        ));

        // Issuance also fails closed; nothing reaches the client.
        let issue = CapturingTransport::empty();
        assert!(matches!(
            service
                .new_token_pair(user_id, ExtraClaims::default(), &issue)
                .await,
            Err(AuthError::StoreUnavailable(_))
        ));
        assert!(issue.delivered_tokens().is_none());
    }

    #[tokio::test]
    async fn access_gate_never_touches_the_session_store() {
        // An unreachable store must not matter for access tokens.
        let (service, _, codec) = harness_with_store(Arc::new(UnreachableSessionStore));
        let user_id = service
            .signup(SignupInput {
                username: "alice01".to_string(),
                password: "Sup3rSecret".to_string(),
            })
            .await
            .unwrap();

        let (access, _) = codec
            .issue(user_id, TokenKind::Access, &ExtraClaims::default())
            .unwrap();
        let transport = CapturingTransport::with_access(access);
        let claims = service.jwt_required(&transport).await.unwrap();
        assert_eq!(claims.user_id, user_id);
    }

    #[test]
    fn codec_rejects_wrong_kind_and_tampering() {
        let codec = JwtHs256Codec::new(test_cfg());
        let user_id = UserId(Uuid::new_v4());

        let (access, _) = codec
            .issue(user_id, TokenKind::Access, &ExtraClaims::default())
            .unwrap();
        assert!(matches!(
            codec.decode(&access, TokenKind::Refresh),
            Err(AuthError::TokenMalformed)
        ));

        let mut other_cfg = test_cfg();
        other_cfg.signing_key = b"other-signing-key".to_vec();
        let other = JwtHs256Codec::new(other_cfg);
        assert!(matches!(
            other.decode(&access, TokenKind::Access),
            Err(AuthError::TokenMalformed)
        ));

        assert!(matches!(
            codec.decode("not-a-token", TokenKind::Access),
            Err(AuthError::TokenMalformed)
        ));
    }

    #[test]
    fn password_policy() {
        assert!(password_is_safe("Sup3rSecret"));
        assert!(!password_is_safe("short1A"));
        assert!(!password_is_safe("alllowercase1"));
        assert!(!password_is_safe("ALLUPPERCASE1"));
        assert!(!password_is_safe("NoDigitsHere"));
    }
}
