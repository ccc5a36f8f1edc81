//! Session accessor: who is calling, resolved per request from the access
//! token the client presents. Nothing about the session is stored server-side.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::warn;

use crate::auth::Authenticator;
use crate::errors::AppError;
use crate::models::User;
use crate::state::AppState;

/// Cookie carrying the access token for browser sessions.
pub const ACCESS_TOKEN_COOKIE: &str = "cvdesk-access-token";

/// Where unauthenticated page requests are sent.
pub const LOGIN_PATH: &str = "/login";

/// The bearer token, falling back to the session cookie.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from);

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(ACCESS_TOKEN_COOKIE)
            .map(|cookie| cookie.value().trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Resolves the current user. Any failure to resolve means "not signed in".
pub async fn current_user(headers: &HeaderMap, auth: &dyn Authenticator) -> Option<User> {
    let token = access_token(headers)?;
    match auth.get_user(&token).await {
        Ok(user) => user,
        Err(e) => {
            warn!("Could not resolve session: {e}");
            None
        }
    }
}

/// Session cookie for a freshly issued access token.
pub fn session_cookie(access_token: String) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, access_token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Handed to `CookieJar::remove`. Path must match [`session_cookie`].
pub fn session_cookie_removal() -> Cookie<'static> {
    Cookie::build(ACCESS_TOKEN_COOKIE).path("/").build()
}

/// The caller's session, possibly anonymous. Page composers decide what to do
/// with `user == None`.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = access_token(&parts.headers);
        let user = current_user(&parts.headers, state.auth.as_ref()).await;
        Ok(Session { user, token })
    }
}

/// An authenticated caller; rejects with 401 otherwise. Used by API routes.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        current_user(&parts.headers, state.auth.as_ref())
            .await
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}
