pub mod api;
pub mod extract;
pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::pages::handlers as pages;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Session entry points
        .route("/login", post(pages::handle_login))
        .route("/logout", post(pages::handle_logout))
        .route("/forgot-password", post(pages::handle_forgot_password))
        // Pages
        .route("/dashboard", get(pages::handle_dashboard))
        .route("/dashboard/sidebar", get(pages::handle_sidebar))
        .route("/dashboard/profile", get(pages::handle_profile))
        .route("/dashboard/application/:id", get(pages::handle_application))
        // Profile API
        .route(
            "/api/v1/profile",
            post(api::handle_create_profile).put(api::handle_update_profile),
        )
        // Experience API
        .route(
            "/api/v1/experiences",
            get(api::handle_list_experiences).post(api::handle_create_experience),
        )
        .route(
            "/api/v1/experiences/:id",
            put(api::handle_update_experience).delete(api::handle_delete_experience),
        )
        // Link API
        .route(
            "/api/v1/links",
            get(api::handle_list_links).post(api::handle_create_link),
        )
        .route(
            "/api/v1/links/:id",
            put(api::handle_update_link).delete(api::handle_delete_link),
        )
        // Application API
        .route(
            "/api/v1/applications",
            get(api::handle_list_applications).post(api::handle_create_application),
        )
        .route(
            "/api/v1/applications/:id",
            get(api::handle_get_application)
                .put(api::handle_update_application)
                .delete(api::handle_delete_application),
        )
        .with_state(state)
}
