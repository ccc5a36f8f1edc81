//! Ownership-scoped data access.
//!
//! Every operation takes the caller's scope key explicitly and every backend
//! filters on it, so a row outside the scope is indistinguishable from a row
//! that does not exist (`AppError::NotFound`).

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::{Application, Entity, Experience, Link, Profile, ProfileId, UserId};

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

/// CRUD over one entity type, always filtered by the owning key.
///
/// Carried in `AppState` as `Arc<dyn Repository<E>>`.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// All rows owned by `scope`, in the entity's listing order.
    async fn list(&self, scope: E::Scope) -> Result<Vec<E>, AppError>;

    async fn get(&self, scope: E::Scope, id: i64) -> Result<E, AppError>;

    /// Inserts a row under `scope`. The id and timestamps are assigned by the store.
    async fn create(&self, scope: E::Scope, fields: E::Fields) -> Result<E, AppError>;

    /// Partial update. Fails with `NotFound` when `id` is not inside `scope`.
    async fn update(&self, scope: E::Scope, id: i64, patch: E::Patch) -> Result<E, AppError>;

    async fn delete(&self, scope: E::Scope, id: i64) -> Result<(), AppError>;
}

/// One repository per entity, shared by handlers, page composers and forms.
#[derive(Clone)]
pub struct Repositories {
    pub profiles: Arc<dyn Repository<Profile>>,
    pub experiences: Arc<dyn Repository<Experience>>,
    pub links: Arc<dyn Repository<Link>>,
    pub applications: Arc<dyn Repository<Application>>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        let repo = Arc::new(PgRepository::new(pool));
        Repositories {
            profiles: repo.clone(),
            experiences: repo.clone(),
            links: repo.clone(),
            applications: repo,
        }
    }

    pub fn in_memory() -> Self {
        Repositories {
            profiles: Arc::new(MemoryRepository::<Profile>::new()),
            experiences: Arc::new(MemoryRepository::<Experience>::new()),
            links: Arc::new(MemoryRepository::<Link>::new()),
            applications: Arc::new(MemoryRepository::<Application>::new()),
        }
    }

    /// The caller's profile, if they have created one.
    pub async fn profile_of(&self, user: UserId) -> Result<Option<Profile>, AppError> {
        Ok(self.profiles.list(user).await?.into_iter().next())
    }

    /// Resolves the scope key for experiences and links from the caller's
    /// identity. Never taken from client input.
    pub async fn profile_scope(&self, user: UserId) -> Result<ProfileId, AppError> {
        self.profile_of(user)
            .await?
            .map(|p| p.id)
            .ok_or_else(|| AppError::not_found(Profile::NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileFields;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_profile_scope_requires_profile() {
        let repos = Repositories::in_memory();
        let user = UserId(Uuid::new_v4());

        assert!(matches!(
            repos.profile_scope(user).await,
            Err(AppError::NotFound(_))
        ));

        let profile = repos
            .profiles
            .create(
                user,
                ProfileFields {
                    firstname: "Ada".into(),
                    lastname: "Lovelace".into(),
                },
            )
            .await
            .unwrap();

        assert_eq!(repos.profile_scope(user).await.unwrap(), profile.id);
    }
}
