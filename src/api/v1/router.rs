use super::error::*;
use super::handler;
use super::transport::{ACCESS_COOKIE, CSRF_COOKIE, CookiePolicy, CookieTransport, REFRESH_COOKIE};
use crate::application_port::AuthService;
use crate::domain_model::{PageParams, TokenClaims};
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, reject};

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let policy = CookiePolicy {
        secure: server.cookie_secure,
        csrf_protect: server.cookie_csrf_protect,
    };

    let register = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("register"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let login = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(warp::header::optional::<String>("user-agent"))
        .and(with_transport(policy))
        .and(with(server.auth_service.clone()))
        .and_then(handler::login);

    let refresh = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("refresh"))
        .and(warp::path::end())
        .and(csrf_guard(policy))
        .and(with_transport(policy))
        .and(with(server.auth_service.clone()))
        .and_then(handler::refresh);

    let logout = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(csrf_guard(policy))
        .and(with_transport(policy))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout);

    let logout_all = warp::post()
        .and(warp::path("auth"))
        .and(warp::path("logout_all"))
        .and(warp::path::end())
        .and(csrf_guard(policy))
        .and(with_transport(policy))
        .and(with(server.auth_service.clone()))
        .and_then(handler::logout_all);

    let history = warp::get()
        .and(warp::path("history"))
        .and(warp::path::end())
        .and(warp::query::<PageParams>())
        .and(with_access(server.auth_service.clone(), policy))
        .and(with(server.history_service.clone()))
        .and_then(handler::history);

    let change_username = warp::post()
        .and(warp::path("account"))
        .and(warp::path("change_username"))
        .and(warp::path::end())
        .and(csrf_guard(policy))
        .and(warp::body::json())
        .and(with_access(server.auth_service.clone(), policy))
        .and(with(server.account_service.clone()))
        .and_then(handler::change_username);

    let change_password = warp::post()
        .and(warp::path("account"))
        .and(warp::path("change_password"))
        .and(warp::path::end())
        .and(csrf_guard(policy))
        .and(warp::body::json())
        .and(with_access(server.auth_service.clone(), policy))
        .and(with(server.account_service.clone()))
        .and_then(handler::change_password);

    register
        .or(login)
        .or(refresh)
        .or(logout)
        .or(logout_all)
        .or(history)
        .or(change_username)
        .or(change_password)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

/// One request-scoped cookie transport per request.
fn with_transport(
    policy: CookiePolicy,
) -> impl Filter<Extract = (Arc<CookieTransport>,), Error = Infallible> + Clone {
    warp::cookie::optional::<String>(ACCESS_COOKIE)
        .and(warp::cookie::optional::<String>(REFRESH_COOKIE))
        .map(move |access: Option<String>, refresh: Option<String>| {
            Arc::new(CookieTransport::new(access, refresh, policy))
        })
}

/// Access-token gate: decode the cookie-borne access token and hand the
/// claims to the handler.
fn with_access(
    auth_service: Arc<dyn AuthService>,
    policy: CookiePolicy,
) -> impl Filter<Extract = (TokenClaims,), Error = warp::Rejection> + Clone {
    with_transport(policy).and_then(move |transport: Arc<CookieTransport>| {
        let auth_service = auth_service.clone();
        async move {
            auth_service
                .jwt_required(&*transport)
                .await
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)
        }
    })
}

/// Double-submit CSRF check for state-changing endpoints, active only when
/// enabled in settings.
fn csrf_guard(
    policy: CookiePolicy,
) -> impl Filter<Extract = (), Error = warp::Rejection> + Clone {
    warp::cookie::optional::<String>(CSRF_COOKIE)
        .and(warp::header::optional::<String>("x-csrf-token"))
        .and_then(move |cookie: Option<String>, header: Option<String>| async move {
            if !policy.csrf_protect {
                return Ok(());
            }
            match (cookie, header) {
                (Some(c), Some(h)) if c == h => Ok(()),
                _ => Err(reject::custom(ApiErrorCode::CsrfMismatch)),
            }
        })
        .untuple_one()
}
