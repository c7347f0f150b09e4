//! Auth routes: registration, password login, session management.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

use crate::error::ApiError;
use crate::rate_limit::{RateLimitError, RateLimitScope};
use crate::services::access::Permission;
use crate::services::auth::{self as auth_svc, AuthError, Registration};
use crate::services::session::{self, SessionUser};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user, resolved from the session cookie (web admin) or an
/// `Authorization: Bearer` header (mobile app).
pub struct AuthUser {
    pub user: SessionUser,
    pub token: String,
}

impl AuthUser {
    /// # Errors
    ///
    /// 403 when the user lacks `permission`.
    pub fn require(&self, permission: Permission) -> Result<(), ApiError> {
        if self.user.can(permission) { Ok(()) } else { Err(ApiError::forbidden()) }
    }
}

/// Pull the session token from the cookie first, then the bearer header.
pub(crate) fn extract_token(headers: &axum::http::HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(COOKIE_NAME).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_owned());
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or_else(ApiError::unauthorized)?;

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, &token)
            .await?
            .ok_or_else(ApiError::unauthorized)?;

        Ok(Self { user, token })
    }
}

fn session_cookie(token: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: SessionUser,
}

/// Create a session and return it both as a cookie and in the body.
async fn start_session(state: &AppState, user_id: Uuid) -> Result<(CookieJar, Json<SessionResponse>), ApiError> {
    let ttl = state.config.session_ttl_hours;
    let token = session::create_session(&state.pool, user_id, ttl).await?;
    let user = session::validate_session(&state.pool, &token)
        .await?
        .ok_or_else(ApiError::unauthorized)?;
    let jar = CookieJar::new().add(session_cookie(token.clone(), state.config.cookie_secure, Duration::hours(ttl)));
    Ok((jar, Json(SessionResponse { token, user })))
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/auth/register`: Create an account and sign in.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Registration>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = auth_svc::register(&state.pool, &body).await.map_err(auth_error_to_api)?;
    let (jar, body) = start_session(&state, user_id).await?;
    Ok((StatusCode::CREATED, jar, body))
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

/// `POST /api/auth/login`: Password login, rate limited per email.
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> Result<impl IntoResponse, ApiError> {
    let key = auth_svc::normalize_email(&body.email).unwrap_or_else(|| body.email.trim().to_ascii_lowercase());
    state
        .rate_limiter
        .check_and_record(RateLimitScope::Login, &key)
        .map_err(|e| rate_limit_error_to_api(&e))?;

    let user_id = auth_svc::login(&state.pool, &body.email, &body.password)
        .await
        .map_err(auth_error_to_api)?;
    state.rate_limiter.reset(RateLimitScope::Login, &key);
    start_session(&state, user_id).await
}

/// `GET /api/auth/me`: Return current user.
pub async fn me(auth: AuthUser) -> Json<SessionUser> {
    Json(auth.user)
}

/// `POST /api/auth/logout`: Delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::warn!(error = %e, "session delete failed during logout");
    }
    let jar = CookieJar::new().add(session_cookie(String::new(), state.config.cookie_secure, Duration::ZERO));
    (jar, StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ChangePasswordBody {
    pub current_password: String,
    pub new_password: String,
}

/// `POST /api/auth/change-password`: Rotate the password and every session.
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ChangePasswordBody>,
) -> Result<impl IntoResponse, ApiError> {
    auth_svc::change_password(&state.pool, auth.user.id, &body.current_password, &body.new_password)
        .await
        .map_err(auth_error_to_api)?;
    session::delete_user_sessions(&state.pool, auth.user.id).await?;
    start_session(&state, auth.user.id).await
}

pub(crate) fn auth_error_to_api(err: AuthError) -> ApiError {
    let status = match &err {
        AuthError::InvalidEmail | AuthError::WeakPassword | AuthError::InvalidReferralCode => StatusCode::BAD_REQUEST,
        AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::Banned => StatusCode::FORBIDDEN,
        AuthError::CodeExhausted => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    ApiError::from_service(status, &err)
}

pub(crate) fn rate_limit_error_to_api(err: &RateLimitError) -> ApiError {
    ApiError::from_service(StatusCode::TOO_MANY_REQUESTS, err)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
