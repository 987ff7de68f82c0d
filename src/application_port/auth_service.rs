use crate::application_port::TokenTransport;
use crate::domain_model::{ExtraClaims, TokenClaims, TokenKind, UserId};
use crate::domain_port::SessionStoreError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user already exists")]
    UserExists,
    #[error("user not found")]
    UserNotFound,
    #[error("{0}")]
    InvalidAccountData(String),
    #[error("token malformed")]
    TokenMalformed,
    #[error("token expired")]
    TokenExpired,
    #[error("authentication required")]
    Unauthenticated,
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

// The session store failing must read as "unavailable", never as "fresh".
impl From<SessionStoreError> for AuthError {
    fn from(error: SessionStoreError) -> Self {
        match error {
            SessionStoreError::Unavailable(e) => AuthError::StoreUnavailable(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignupInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
    pub device: String,
}

/// Creates and parses signed tokens. Stateless: decoding needs only the
/// verification key configured at startup.
pub trait TokenCodec: Send + Sync {
    /// Mint a token with a fresh random jti and `exp = now + lifetime(kind)`.
    /// Returns the signed form together with the claims it carries.
    fn issue(
        &self,
        user_id: UserId,
        kind: TokenKind,
        claims: &ExtraClaims,
    ) -> Result<(String, TokenClaims), AuthError>;

    /// Verify signature and expiry, and that the token was minted for
    /// `expected_kind`.
    fn decode(&self, token: &str, expected_kind: TokenKind) -> Result<TokenClaims, AuthError>;
}

#[async_trait::async_trait]
pub trait CredentialHasher: Send + Sync {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;
    async fn verify_password(&self, password: &str, password_hash: &str)
    -> Result<bool, AuthError>;
}

/// Orchestrates the refresh-token state machine. A refresh token is `fresh`
/// exactly once; redemption or logout moves it to `used`, terminally. No
/// other component may treat a refresh token as valid without going through
/// this service.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn signup(&self, request: SignupInput) -> Result<UserId, AuthError>;

    /// Verify credentials, record the login, and deliver a fresh token pair
    /// through the transport.
    async fn login(
        &self,
        request: LoginInput,
        transport: &dyn TokenTransport,
    ) -> Result<UserId, AuthError>;

    /// Issue a new access/refresh pair for `user_id`, persist the refresh
    /// session as fresh, and hand both tokens to the transport. Any refresh
    /// token still present on the transport is invalidated best-effort first.
    async fn new_token_pair(
        &self,
        user_id: UserId,
        claims: ExtraClaims,
        transport: &dyn TokenTransport,
    ) -> Result<(), AuthError>;

    /// The single-use gate: the inbound refresh token must decode, be
    /// unexpired, and have a fresh session record, which this call consumes
    /// atomically. Of two concurrent calls with the same token exactly one
    /// succeeds.
    async fn refresh_token_required(
        &self,
        transport: &dyn TokenTransport,
    ) -> Result<TokenClaims, AuthError>;

    /// Access-token gate. Never consults the session store.
    async fn jwt_required(&self, transport: &dyn TokenTransport) -> Result<TokenClaims, AuthError>;

    /// Consume the presented refresh token and clear client credentials.
    /// Clearing happens even when the server-side record was already gone.
    async fn logout(&self, transport: &dyn TokenTransport) -> Result<(), AuthError>;

    /// Consume the presented refresh token, then transition every remaining
    /// fresh session of the same user to used.
    async fn logout_all(&self, transport: &dyn TokenTransport) -> Result<(), AuthError>;
}
