//! JSON CRUD endpoints behind the forms. The scope key is always derived
//! from the session: the user id, or the id of the user's own profile.
//! Owner or profile ids in request bodies are never read.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::session::CurrentUser;
use crate::errors::AppError;
use crate::forms::validation::{
    ApplicationDraft, Draft, ExperienceDraft, LinkDraft, ProfileDraft,
};
use crate::forms::Submission;
use crate::models::{Application, Entity, Experience, Link, Profile};
use crate::repository::Repository;
use crate::routes::extract::ApiJson;
use crate::state::AppState;

/// Validates `draft` and writes it: create when `id` is `None`, update otherwise.
async fn save<D: Draft>(
    repo: &dyn Repository<D::Entity>,
    scope: <D::Entity as Entity>::Scope,
    id: Option<i64>,
    draft: D,
) -> Result<D::Entity, AppError> {
    let fields = draft.validate()?;
    Submission { id, fields }.execute(repo, scope).await
}

// ────────────────────────────────────────────────────────────────────────────
// Profile
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/profile
pub async fn handle_create_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(draft): ApiJson<ProfileDraft>,
) -> Result<(StatusCode, Json<Profile>), AppError> {
    let profile = save(state.repos.profiles.as_ref(), user.id, None, draft).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// PUT /api/v1/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(draft): ApiJson<ProfileDraft>,
) -> Result<Json<Profile>, AppError> {
    let profile_id = state.repos.profile_scope(user.id).await?;
    let profile = save(
        state.repos.profiles.as_ref(),
        user.id,
        Some(profile_id.0),
        draft,
    )
    .await?;
    Ok(Json(profile))
}

// ────────────────────────────────────────────────────────────────────────────
// Experiences
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/experiences
pub async fn handle_list_experiences(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Experience>>, AppError> {
    let scope = state.repos.profile_scope(user.id).await?;
    Ok(Json(state.repos.experiences.list(scope).await?))
}

/// POST /api/v1/experiences
pub async fn handle_create_experience(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(draft): ApiJson<ExperienceDraft>,
) -> Result<(StatusCode, Json<Experience>), AppError> {
    let scope = state.repos.profile_scope(user.id).await?;
    let experience = save(state.repos.experiences.as_ref(), scope, None, draft).await?;
    Ok((StatusCode::CREATED, Json(experience)))
}

/// PUT /api/v1/experiences/:id
pub async fn handle_update_experience(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    ApiJson(draft): ApiJson<ExperienceDraft>,
) -> Result<Json<Experience>, AppError> {
    let scope = state.repos.profile_scope(user.id).await?;
    let experience = save(state.repos.experiences.as_ref(), scope, Some(id), draft).await?;
    Ok(Json(experience))
}

/// DELETE /api/v1/experiences/:id
pub async fn handle_delete_experience(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let scope = state.repos.profile_scope(user.id).await?;
    state.repos.experiences.delete(scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Links
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/links
pub async fn handle_list_links(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Link>>, AppError> {
    let scope = state.repos.profile_scope(user.id).await?;
    Ok(Json(state.repos.links.list(scope).await?))
}

/// POST /api/v1/links
pub async fn handle_create_link(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(draft): ApiJson<LinkDraft>,
) -> Result<(StatusCode, Json<Link>), AppError> {
    let scope = state.repos.profile_scope(user.id).await?;
    let link = save(state.repos.links.as_ref(), scope, None, draft).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

/// PUT /api/v1/links/:id
pub async fn handle_update_link(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    ApiJson(draft): ApiJson<LinkDraft>,
) -> Result<Json<Link>, AppError> {
    let scope = state.repos.profile_scope(user.id).await?;
    let link = save(state.repos.links.as_ref(), scope, Some(id), draft).await?;
    Ok(Json(link))
}

/// DELETE /api/v1/links/:id
pub async fn handle_delete_link(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let scope = state.repos.profile_scope(user.id).await?;
    state.repos.links.delete(scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// Applications
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Application>>, AppError> {
    Ok(Json(state.repos.applications.list(user.id).await?))
}

/// GET /api/v1/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Application>, AppError> {
    Ok(Json(state.repos.applications.get(user.id, id).await?))
}

/// POST /api/v1/applications
pub async fn handle_create_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(draft): ApiJson<ApplicationDraft>,
) -> Result<(StatusCode, Json<Application>), AppError> {
    let application = save(state.repos.applications.as_ref(), user.id, None, draft).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

/// PUT /api/v1/applications/:id
pub async fn handle_update_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    ApiJson(draft): ApiJson<ApplicationDraft>,
) -> Result<Json<Application>, AppError> {
    let application = save(state.repos.applications.as_ref(), user.id, Some(id), draft).await?;
    Ok(Json(application))
}

/// DELETE /api/v1/applications/:id
pub async fn handle_delete_application(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.repos.applications.delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
