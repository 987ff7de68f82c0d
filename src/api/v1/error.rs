use crate::api::v1::handler::ApiResponse;
use crate::application_port::AuthError;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(err) = err.find::<ApiErrorCode>() {
        let json = warp::reply::json(&ApiResponse::<()>::err(err.clone(), err.to_string()));
        Ok(warp::reply::with_status(json, err.status()))
    } else if err.is_not_found() {
        let json = warp::reply::json(&ApiResponse::<()>::err(
            ApiErrorCode::NotFound,
            "Resource not found",
        ));
        Ok(warp::reply::with_status(json, StatusCode::NOT_FOUND))
    } else {
        let json = warp::reply::json(&ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(ApiError {
                code: ApiErrorCode::InternalError,
                message: format!("Unhandled error: {:?}", err),
            }),
        });
        Ok(warp::reply::with_status(
            json,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("User not found")]
    UserNotFound,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("CSRF token missing or mismatched")]
    CsrfMismatch,
    #[error("{0}")]
    InvalidAccountData(String),
    #[error("Resource not found")]
    NotFound,
    #[error("Service temporarily unavailable")]
    Unavailable,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::InvalidCredentials
            | ApiErrorCode::Unauthenticated
            | ApiErrorCode::TokenExpired
            | ApiErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiErrorCode::CsrfMismatch | ApiErrorCode::InvalidAccountData(_) => {
                StatusCode::FORBIDDEN
            }
            ApiErrorCode::UsernameTaken => StatusCode::CONFLICT,
            ApiErrorCode::UserNotFound | ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<AuthError> for ApiErrorCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials,
            AuthError::UserExists => ApiErrorCode::UsernameTaken,
            AuthError::UserNotFound => ApiErrorCode::UserNotFound,
            AuthError::InvalidAccountData(msg) => ApiErrorCode::InvalidAccountData(msg),
            AuthError::TokenMalformed => ApiErrorCode::InvalidToken,
            AuthError::TokenExpired => ApiErrorCode::TokenExpired,
            AuthError::Unauthenticated => ApiErrorCode::Unauthenticated,
            // Fail closed: a dead session store is a server problem, not an
            // authentication verdict.
            AuthError::StoreUnavailable(e) => {
                warn!("session store unavailable: {}", e);
                ApiErrorCode::Unavailable
            }
            AuthError::Store(e) => ApiErrorCode::internal(e),
            AuthError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}
