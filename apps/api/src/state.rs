use std::sync::Arc;

use crate::auth::Authenticator;
use crate::repository::Repositories;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    /// Hosted auth service in production; a static token table in tests.
    pub auth: Arc<dyn Authenticator>,
}
