//! Domain entities and the ownership keys that scope them.
//!
//! Every entity is owned either directly by a user (`Profile`, `Application`)
//! or through the user's profile (`Experience`, `Link`). The owning key is the
//! entity's *scope*; repositories filter every read and write on it.

pub mod application;
pub mod experience;
pub mod link;
pub mod profile;
pub mod user;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use application::{Application, ApplicationFields, ApplicationPatch};
pub use experience::{Experience, ExperienceFields, ExperiencePatch};
pub use link::{Link, LinkFields, LinkPatch};
pub use profile::{Profile, ProfileFields, ProfilePatch};
pub use user::User;

/// Identifier of an authenticated user, as issued by the auth service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub Uuid);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Primary key of a profile; the scope key for experiences and links.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ProfileId(pub i64);

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A row type that lives under an owning scope.
///
/// `Fields` is the validated create payload, `Patch` a partial update where
/// `None` leaves the stored value untouched.
pub trait Entity: Clone + Send + Sync + fmt::Debug + 'static {
    type Scope: Copy + Eq + Send + Sync + fmt::Display + fmt::Debug + 'static;
    type Fields: Clone + Send + Sync + fmt::Debug + 'static;
    type Patch: Clone + Send + Sync + fmt::Debug + 'static;

    /// Lowercase singular name, used in logs and user-facing messages.
    const NAME: &'static str;

    /// At most one row per scope (enforced by a unique index in Postgres).
    const UNIQUE_PER_SCOPE: bool = false;

    fn id(&self) -> i64;

    fn scope(&self) -> Self::Scope;

    /// Materializes a freshly inserted row. Only stores call this.
    fn build(id: i64, scope: Self::Scope, fields: Self::Fields, now: DateTime<Utc>) -> Self;

    /// Writes every `Some` field of `patch` and stamps `updated_at`.
    fn apply(&mut self, patch: Self::Patch, now: DateTime<Utc>);

    /// A patch that overwrites every editable field.
    fn full_patch(fields: Self::Fields) -> Self::Patch;

    /// Listing order. Insertion order unless the entity says otherwise.
    fn sort_for_listing(items: &mut [Self]) {
        items.sort_by_key(|item| item.id());
    }
}
