//! Page composers: per-route entry points that authenticate, fetch the data a
//! page starts from, and hand it back as a [`Page`].
//!
//! Every composer takes the caller explicitly. `None` always yields a redirect
//! to the login page before anything is read.

pub mod handlers;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::auth::session::LOGIN_PATH;
use crate::errors::AppError;
use crate::models::application::ApplicationSummary;
use crate::models::{Application, Experience, Link, Profile, User};
use crate::repository::Repositories;

/// Outcome of composing a page.
#[derive(Debug)]
pub enum Page<T> {
    /// Not signed in.
    Redirect(&'static str),
    /// The entity the page is about does not exist for this user.
    NotFound(String),
    /// The store failed; carries the message shown in place of the page.
    Failed(String),
    Render(T),
}

impl<T> Page<T> {
    fn login() -> Self {
        Page::Redirect(LOGIN_PATH)
    }

    /// Converts a repository failure at the page boundary.
    fn from_error(err: AppError, loading: &str) -> Self {
        match err {
            AppError::NotFound(msg) => Page::NotFound(msg),
            other => {
                error!("Error loading {loading}: {other}");
                Page::Failed(format!("Error loading {loading}"))
            }
        }
    }
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        match self {
            Page::Redirect(path) => Redirect::to(path).into_response(),
            Page::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "status": "not_found", "message": message })),
            )
                .into_response(),
            Page::Failed(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": message })),
            )
                .into_response(),
            Page::Render(data) => Json(data).into_response(),
        }
    }
}

macro_rules! page_try {
    ($expr:expr, $loading:expr) => {
        match $expr {
            Ok(value) => value,
            Err(e) => return Page::from_error(e, $loading),
        }
    };
}

#[derive(Debug, Serialize)]
pub struct DashboardPage {
    pub applications: Vec<Application>,
}

#[derive(Debug, Serialize)]
pub struct SidebarData {
    pub user: User,
    pub applications: Vec<ApplicationSummary>,
}

#[derive(Debug, Serialize)]
pub struct ProfilePage {
    pub user: User,
    pub profile: Profile,
    pub experiences: Vec<Experience>,
    pub links: Vec<Link>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationPage {
    pub application: Application,
}

/// `/dashboard`: the caller's applications.
pub async fn dashboard(user: Option<&User>, repos: &Repositories) -> Page<DashboardPage> {
    let Some(user) = user else {
        return Page::login();
    };
    let applications = page_try!(repos.applications.list(user.id).await, "applications");
    Page::Render(DashboardPage { applications })
}

/// Dashboard layout sidebar: application ids and titles.
pub async fn sidebar(user: Option<&User>, repos: &Repositories) -> Page<SidebarData> {
    let Some(user) = user else {
        return Page::login();
    };
    let applications = page_try!(repos.applications.list(user.id).await, "applications");
    Page::Render(SidebarData {
        user: user.clone(),
        applications: applications.iter().map(ApplicationSummary::from).collect(),
    })
}

/// `/dashboard/profile`: profile plus its experiences and links.
pub async fn profile(user: Option<&User>, repos: &Repositories) -> Page<ProfilePage> {
    let Some(user) = user else {
        return Page::login();
    };
    let profile = match page_try!(repos.profile_of(user.id).await, "profile") {
        Some(profile) => profile,
        None => return Page::NotFound("Profile not found".to_string()),
    };
    let experiences = page_try!(repos.experiences.list(profile.id).await, "profile");
    let links = page_try!(repos.links.list(profile.id).await, "profile");

    Page::Render(ProfilePage {
        user: user.clone(),
        profile,
        experiences,
        links,
    })
}

/// `/dashboard/application/:id`: one of the caller's applications.
pub async fn application(
    user: Option<&User>,
    repos: &Repositories,
    id: i64,
) -> Page<ApplicationPage> {
    let Some(user) = user else {
        return Page::login();
    };
    let application = page_try!(repos.applications.get(user.id, id).await, "application");
    Page::Render(ApplicationPage { application })
}
