use crate::application_port::TokenTransport;
use crate::domain_model::{AccessToken, AuthTokens, RefreshToken};
use chrono::{DateTime, Utc};
use std::sync::Mutex;

pub const ACCESS_COOKIE: &str = "access_token_cookie";
pub const REFRESH_COOKIE: &str = "refresh_token_cookie";
/// Double-submit CSRF cookie, readable by the client so it can be echoed in
/// the `x-csrf-token` header.
pub const CSRF_COOKIE: &str = "csrf_token";

#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
    pub csrf_protect: bool,
}

/// Cookie-backed transport adapter: reads inbound tokens from request
/// cookies and accumulates outgoing `Set-Cookie` values for the handler to
/// attach to the reply. One instance per request.
pub struct CookieTransport {
    inbound_access: Option<String>,
    inbound_refresh: Option<String>,
    policy: CookiePolicy,
    outbound: Mutex<Vec<String>>,
}

impl CookieTransport {
    pub fn new(
        inbound_access: Option<String>,
        inbound_refresh: Option<String>,
        policy: CookiePolicy,
    ) -> Self {
        CookieTransport {
            inbound_access,
            inbound_refresh,
            policy,
            outbound: Mutex::new(Vec::new()),
        }
    }

    /// Drain the accumulated `Set-Cookie` header values.
    pub fn take_set_cookies(&self) -> Vec<String> {
        match self.outbound.lock() {
            Ok(mut out) => std::mem::take(&mut *out),
            Err(_) => Vec::new(),
        }
    }

    fn cookie(&self, name: &str, value: &str, max_age: i64, http_only: bool) -> String {
        let mut cookie = format!("{name}={value}; Path=/; SameSite=Lax; Max-Age={max_age}");
        if http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.policy.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn max_age(expires_at: DateTime<Utc>) -> i64 {
        (expires_at - Utc::now()).num_seconds().max(0)
    }

    fn push(&self, cookie: String) {
        if let Ok(mut out) = self.outbound.lock() {
            out.push(cookie);
        }
    }
}

impl TokenTransport for CookieTransport {
    fn set_credentials(&self, tokens: &AuthTokens) {
        let access_age = Self::max_age(tokens.access_token_expires_at);
        let refresh_age = Self::max_age(tokens.refresh_token_expires_at);

        self.push(self.cookie(ACCESS_COOKIE, &tokens.access_token.0, access_age, true));
        self.push(self.cookie(REFRESH_COOKIE, &tokens.refresh_token.0, refresh_age, true));
        if self.policy.csrf_protect {
            let csrf = uuid::Uuid::new_v4().simple().to_string();
            self.push(self.cookie(CSRF_COOKIE, &csrf, refresh_age, false));
        }
    }

    fn clear_credentials(&self) {
        self.push(self.cookie(ACCESS_COOKIE, "", 0, true));
        self.push(self.cookie(REFRESH_COOKIE, "", 0, true));
        if self.policy.csrf_protect {
            self.push(self.cookie(CSRF_COOKIE, "", 0, false));
        }
    }

    fn current_access_token(&self) -> Option<AccessToken> {
        self.inbound_access.clone().map(AccessToken)
    }

    fn current_refresh_token(&self) -> Option<RefreshToken> {
        self.inbound_refresh.clone().map(RefreshToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn policy(secure: bool, csrf_protect: bool) -> CookiePolicy {
        CookiePolicy {
            secure,
            csrf_protect,
        }
    }

    fn tokens() -> AuthTokens {
        AuthTokens {
            access_token: AccessToken("acc".to_string()),
            refresh_token: RefreshToken("ref".to_string()),
            access_token_expires_at: Utc::now() + Duration::seconds(300),
            refresh_token_expires_at: Utc::now() + Duration::seconds(3600),
        }
    }

    #[test]
    fn set_credentials_emits_http_only_cookies() {
        let transport = CookieTransport::new(None, None, policy(false, false));
        transport.set_credentials(&tokens());

        let cookies = transport.take_set_cookies();
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("access_token_cookie=acc;"));
        assert!(cookies[0].contains("HttpOnly"));
        assert!(!cookies[0].contains("Secure"));
        assert!(cookies[1].starts_with("refresh_token_cookie=ref;"));

        // Drained.
        assert!(transport.take_set_cookies().is_empty());
    }

    #[test]
    fn secure_and_csrf_flags_shape_the_cookies() {
        let transport = CookieTransport::new(None, None, policy(true, true));
        transport.set_credentials(&tokens());

        let cookies = transport.take_set_cookies();
        assert_eq!(cookies.len(), 3);
        assert!(cookies.iter().all(|c| c.contains("Secure")));
        let csrf = cookies
            .iter()
            .find(|c| c.starts_with("csrf_token="))
            .unwrap();
        assert!(!csrf.contains("HttpOnly"));
    }

    #[test]
    fn clear_expires_every_credential_cookie() {
        let transport = CookieTransport::new(
            Some("acc".to_string()),
            Some("ref".to_string()),
            policy(false, true),
        );
        transport.clear_credentials();

        let cookies = transport.take_set_cookies();
        assert_eq!(cookies.len(), 3);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    }

    #[test]
    fn inbound_cookies_surface_as_tokens() {
        let transport = CookieTransport::new(
            Some("acc".to_string()),
            Some("ref".to_string()),
            policy(false, false),
        );
        assert_eq!(transport.current_access_token().unwrap().0, "acc");
        assert_eq!(transport.current_refresh_token().unwrap().0, "ref");

        let empty = CookieTransport::new(None, None, policy(false, false));
        assert!(empty.current_access_token().is_none());
        assert!(empty.current_refresh_token().is_none());
    }
}
