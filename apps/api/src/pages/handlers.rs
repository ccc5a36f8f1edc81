//! Axum handlers for the page routes and the login/logout/password-reset
//! entry points.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info, warn};
use url::form_urlencoded;

use crate::auth::session::{session_cookie, session_cookie_removal, Session, LOGIN_PATH};
use crate::auth::AuthError;
use crate::pages::{self, ApplicationPage, DashboardPage, Page, ProfilePage, SidebarData};
use crate::routes::extract::JsonOrForm;
use crate::state::AppState;

const DASHBOARD_PATH: &str = "/dashboard";
const FORGOT_PASSWORD_PATH: &str = "/forgot-password";
/// Appended to the caller's origin; the recovery email links here.
const RESET_CALLBACK_PATH: &str = "/auth/callback?redirect_to=/dashboard/reset-password";

/// GET /dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    session: Session,
) -> Page<DashboardPage> {
    pages::dashboard(session.user.as_ref(), &state.repos).await
}

/// GET /dashboard/sidebar
pub async fn handle_sidebar(State(state): State<AppState>, session: Session) -> Page<SidebarData> {
    pages::sidebar(session.user.as_ref(), &state.repos).await
}

/// GET /dashboard/profile
pub async fn handle_profile(State(state): State<AppState>, session: Session) -> Page<ProfilePage> {
    pages::profile(session.user.as_ref(), &state.repos).await
}

/// GET /dashboard/application/:id
pub async fn handle_application(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
) -> Page<ApplicationPage> {
    pages::application(session.user.as_ref(), &state.repos, id).await
}

/// Redirect to `path` carrying a one-off `error=` or `success=` message.
fn encoded_redirect(kind: &str, path: &str, message: &str) -> Redirect {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(kind, message)
        .finish();
    Redirect::to(&format!("{path}?{query}"))
}

/// Same-site absolute path; rejects `//host` and `/\host` forms.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// POST /login
///
/// Exchanges email/password (form or JSON) for an access token, stores it in
/// the session cookie and sends the browser to the dashboard.
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonOrForm(credentials): JsonOrForm<Credentials>,
) -> Response {
    match state
        .auth
        .sign_in_with_password(credentials.email.trim(), &credentials.password)
        .await
    {
        Ok(session) => {
            info!("User {} signed in", session.user.id);
            (
                jar.add(session_cookie(session.access_token)),
                Redirect::to(DASHBOARD_PATH),
            )
                .into_response()
        }
        Err(e) => {
            if !matches!(e, AuthError::InvalidCredentials) {
                error!("Sign-in failed: {e}");
            }
            encoded_redirect("error", LOGIN_PATH, "Could not authenticate user").into_response()
        }
    }
}

/// POST /logout
pub async fn handle_logout(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
) -> Response {
    if let Some(token) = session.token.as_deref() {
        if let Err(e) = state.auth.sign_out(token).await {
            warn!("Sign-out failed: {e}");
        }
    }
    (
        jar.remove(session_cookie_removal()),
        Redirect::to(LOGIN_PATH),
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PasswordReset {
    pub email: String,
    /// Where to go after a successful request instead of the confirmation.
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

/// POST /forgot-password
pub async fn handle_forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonOrForm(request): JsonOrForm<PasswordReset>,
) -> Redirect {
    let email = request.email.trim();
    if email.is_empty() {
        return encoded_redirect("error", FORGOT_PASSWORD_PATH, "Email is required");
    }

    let redirect_to = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(|origin| format!("{}{RESET_CALLBACK_PATH}", origin.trim_end_matches('/')));

    if let Err(e) = state
        .auth
        .reset_password_for_email(email, redirect_to.as_deref())
        .await
    {
        error!("Password reset failed: {e}");
        return encoded_redirect("error", FORGOT_PASSWORD_PATH, "Could not reset password");
    }
    info!("Password reset requested");

    match request.callback_url.as_deref().filter(|url| is_local_path(url)) {
        Some(callback) => Redirect::to(callback),
        None => encoded_redirect(
            "success",
            FORGOT_PASSWORD_PATH,
            "Check your email for a link to reset your password.",
        ),
    }
}
