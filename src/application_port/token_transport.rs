use crate::domain_model::{AccessToken, AuthTokens, RefreshToken};

/// Request-scoped carrier of client-visible credentials. The delivery medium
/// (cookies here) is an HTTP-layer concern; the auth service only needs these
/// three operations.
pub trait TokenTransport: Send + Sync {
    fn set_credentials(&self, tokens: &AuthTokens);

    fn clear_credentials(&self);

    fn current_access_token(&self) -> Option<AccessToken>;

    fn current_refresh_token(&self) -> Option<RefreshToken>;
}
