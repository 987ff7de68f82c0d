use crate::domain_model::UserId;
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a refresh-token session record. `Fresh` means the token
/// has never been redeemed; `Used` is terminal.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum SessionState {
    Fresh,
    Used,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Fresh => write!(f, "fresh"),
            SessionState::Used => write!(f, "used"),
        }
    }
}

impl FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fresh" => Ok(SessionState::Fresh),
            "used" => Ok(SessionState::Used),
            other => Err(format!("unknown session state: {other}")),
        }
    }
}

/// Store key of one refresh-token session, rendered as
/// `"<state>:<jti>:<userId>"`. Redemption only flips the state prefix, so the
/// replay check is a plain existence test and "all live sessions of user X"
/// is a prefix scan.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct SessionKey {
    pub state: SessionState,
    pub jti: String,
    pub user_id: UserId,
}

impl SessionKey {
    pub fn fresh(jti: impl Into<String>, user_id: UserId) -> Self {
        SessionKey {
            state: SessionState::Fresh,
            jti: jti.into(),
            user_id,
        }
    }

    pub fn used(jti: impl Into<String>, user_id: UserId) -> Self {
        SessionKey {
            state: SessionState::Used,
            jti: jti.into(),
            user_id,
        }
    }

    pub fn into_used(self) -> Self {
        SessionKey {
            state: SessionState::Used,
            ..self
        }
    }

    /// Match pattern for every fresh session of one user.
    pub fn fresh_scan_pattern(user_id: UserId) -> String {
        format!("{}:*:{}", SessionState::Fresh, user_id)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.state, self.jti, self.user_id)
    }
}

impl FromStr for SessionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let state = parts.next().ok_or("missing state")?.parse()?;
        let jti = parts.next().ok_or("missing jti")?.to_string();
        let user_id = parts
            .next()
            .ok_or("missing user id")?
            .parse::<UserId>()
            .map_err(|e| e.to_string())?;
        Ok(SessionKey {
            state,
            jti,
            user_id,
        })
    }
}
