use super::error::*;
use super::transport::CookieTransport;
use crate::application_port::{
    AccountService, AuthError, AuthService, HistoryService, LoginInput, SignupInput,
};
use crate::domain_model::{PageParams, TokenClaims, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::http::header::{HeaderValue, SET_COOKIE};
use warp::{Reply, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub detail: &'static str,
}

/// Attach the transport's accumulated Set-Cookie values to a reply.
fn reply_with_cookies(reply: impl Reply, transport: &CookieTransport) -> warp::reply::Response {
    let mut response = reply.into_response();
    for cookie in transport.take_set_cookies() {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

/// Like `reply_with_cookies`, but never rejects: logout must deliver its
/// cookie-clearing headers even when the service reports a failure.
fn reply_result_with_cookies(
    result: Result<&'static str, AuthError>,
    transport: &CookieTransport,
) -> warp::reply::Response {
    let (json, status) = match result {
        Ok(detail) => (
            warp::reply::json(&ApiResponse::ok(DetailResponse { detail })),
            StatusCode::OK,
        ),
        Err(e) => {
            let code = ApiErrorCode::from(e);
            let status = code.status();
            (
                warp::reply::json(&ApiResponse::<()>::err(code.clone(), code.to_string())),
                status,
            )
        }
    };
    let mut response = reply_with_cookies(json, transport);
    *response.status_mut() = status;
    response
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: UserId,
}

pub async fn register(
    body: RegisterRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = auth_service
        .signup(SignupInput {
            username: body.username,
            password: body.password,
        })
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let json = warp::reply::json(&ApiResponse::ok(RegisterResponse { user_id }));
    Ok(warp::reply::with_status(json, StatusCode::CREATED))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: UserId,
}

pub async fn login(
    body: LoginRequest,
    user_agent: Option<String>,
    transport: Arc<CookieTransport>,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let user_id = auth_service
        .login(
            LoginInput {
                username: body.username,
                password: body.password,
                device: user_agent.unwrap_or_else(|| "unknown".to_string()),
            },
            &*transport,
        )
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let json = warp::reply::json(&ApiResponse::ok(LoginResponse { user_id }));
    Ok(reply_with_cookies(json, &transport))
}

pub async fn refresh(
    transport: Arc<CookieTransport>,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let claims = auth_service
        .refresh_token_required(&*transport)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    auth_service
        .new_token_pair(claims.user_id, claims.claims, &*transport)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let json = warp::reply::json(&ApiResponse::ok(DetailResponse {
        detail: "the token has been refreshed",
    }));
    Ok(reply_with_cookies(json, &transport))
}

pub async fn logout(
    transport: Arc<CookieTransport>,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = auth_service
        .logout(&*transport)
        .await
        .map(|()| "successfully logged out");
    Ok(reply_result_with_cookies(result, &transport))
}

pub async fn logout_all(
    transport: Arc<CookieTransport>,
    auth_service: Arc<dyn AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = auth_service
        .logout_all(&*transport)
        .await
        .map(|()| "logged out on all devices");
    Ok(reply_result_with_cookies(result, &transport))
}

pub async fn history(
    params: PageParams,
    claims: TokenClaims,
    history_service: Arc<dyn HistoryService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let page = history_service
        .list(claims.user_id, params)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(page)))
}

#[derive(Debug, Deserialize)]
pub struct ChangeUsernameRequest {
    pub new_username: String,
}

pub async fn change_username(
    body: ChangeUsernameRequest,
    claims: TokenClaims,
    account_service: Arc<dyn AccountService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    account_service
        .change_username(claims.user_id, &body.new_username)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(DetailResponse {
        detail: "username changed",
    })))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn change_password(
    body: ChangePasswordRequest,
    claims: TokenClaims,
    account_service: Arc<dyn AccountService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    account_service
        .change_password(claims.user_id, &body.old_password, &body.new_password)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(DetailResponse {
        detail: "password changed",
    })))
}
