/// Authentication Routes
///
/// Handles login, access token refresh, logout, and information about the
/// authenticated caller. The refresh secret only ever travels in an
/// HttpOnly cookie scoped to the refresh endpoint.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{http::header::USER_AGENT, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use uuid::Uuid;

use crate::auth::{AuthService, AuthenticatedUser};
use crate::error::{AppError, AuthError, DatabaseError, ErrorContext};
use crate::models::ClientInfo;
use crate::state::RefreshCookieSettings;
use crate::store::UserStore;
use crate::validators::{validate_password, validate_username};

pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Access token response. The refresh token is never part of the body.
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub username: String,
    pub nickname: String,
}

fn token_response(auth: &AuthService, access_token: String) -> TokenResponse {
    TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: auth.keys().access_token_lifetime().num_seconds(),
    }
}

fn refresh_cookie(settings: &RefreshCookieSettings, value: String) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, value)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path(settings.path.clone())
        .max_age(CookieDuration::seconds(settings.max_age_seconds))
        .finish()
}

/// User agent and client address of the request. Behind a proxy the
/// forwarded address wins; a bare peer address has its port stripped.
fn client_info(req: &HttpRequest) -> ClientInfo {
    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let ip_address = req.connection_info().realip_remote_addr().map(|addr| {
        addr.parse::<SocketAddr>()
            .map(|socket| socket.ip().to_string())
            .unwrap_or_else(|_| addr.to_string())
    });

    ClientInfo {
        user_agent,
        ip_address,
    }
}

/// POST /login
///
/// Authenticate with username and password. Returns an access token in the
/// body and sets the refresh token cookie. Any previous refresh tokens of
/// the user stop working.
///
/// # Errors
/// - 401: Unknown username, malformed username, or wrong password
///   (indistinguishable on the wire)
/// - 500: Token signing, randomness, or hashing failure
pub async fn login(
    req: HttpRequest,
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
    cookie_settings: web::Data<RefreshCookieSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let (username, password) = match (
        validate_username(&form.username),
        validate_password(&form.password),
    ) {
        (Ok(username), Ok(password)) => (username, password),
        _ => return Err(context.record(AuthError::InvalidCredentials.into())),
    };

    let issued = auth
        .login(&username, password, client_info(&req))
        .await
        .map_err(|e| context.record(e))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %issued.user_id,
        "Login succeeded"
    );

    Ok(HttpResponse::Ok()
        .cookie(refresh_cookie(&cookie_settings, issued.refresh_token))
        .json(token_response(&auth, issued.access_token)))
}

/// POST /auth/refresh
///
/// Exchange the refresh token cookie for a new access token. The refresh
/// token is single use; a new one is only issued by logging in again.
///
/// # Errors
/// - 401: Missing, unknown, revoked, or expired refresh token
pub async fn refresh(
    req: HttpRequest,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let presented = req
        .cookie(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| context.record(AuthError::InvalidRefreshToken.into()))?;

    let access_token = auth
        .refresh(&presented)
        .await
        .map_err(|e| context.record(e))?;

    Ok(HttpResponse::Ok().json(token_response(&auth, access_token)))
}

/// DELETE /auth/refresh
///
/// Revoke the presented refresh token and clear the cookie. Succeeds even
/// without a cookie or with an unknown token.
pub async fn logout(
    req: HttpRequest,
    auth: web::Data<AuthService>,
    cookie_settings: web::Data<RefreshCookieSettings>,
) -> Result<HttpResponse, AppError> {
    if let Some(cookie) = req.cookie(REFRESH_COOKIE) {
        auth.logout(cookie.value()).await?;
    }

    let mut removal = refresh_cookie(&cookie_settings, String::new());
    removal.make_removal();

    Ok(HttpResponse::NoContent().cookie(removal).finish())
}

/// GET /api/admin/user
///
/// Identity of the caller, taken from the verified access token.
///
/// # Errors
/// - 401: Missing or invalid token (handled by middleware)
/// - 404: The account no longer exists
pub async fn current_user(
    caller: web::ReqData<AuthenticatedUser>,
    users: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let user = users
        .find_by_id(caller.user_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("user {}", caller.user_id)))?;

    Ok(HttpResponse::Ok().json(UserResponse {
        user_id: user.id,
        username: user.username,
        nickname: user.nickname,
    }))
}

/// GET /api/admin/sessions
///
/// The caller's live refresh tokens. With login revoking older tokens
/// this is at most one entry unless logins race.
pub async fn sessions(
    caller: web::ReqData<AuthenticatedUser>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let sessions = auth.active_sessions(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(sessions))
}
