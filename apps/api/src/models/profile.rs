use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{Entity, ProfileId, UserId};

/// One profile per user; the anchor for experiences and links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: ProfileId,
    pub owner: UserId,
    pub firstname: String,
    pub lastname: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileFields {
    pub firstname: String,
    pub lastname: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

impl Entity for Profile {
    type Scope = UserId;
    type Fields = ProfileFields;
    type Patch = ProfilePatch;

    const NAME: &'static str = "profile";
    const UNIQUE_PER_SCOPE: bool = true;

    fn id(&self) -> i64 {
        self.id.0
    }

    fn scope(&self) -> UserId {
        self.owner
    }

    fn build(id: i64, owner: UserId, fields: ProfileFields, now: DateTime<Utc>) -> Self {
        Profile {
            id: ProfileId(id),
            owner,
            firstname: fields.firstname,
            lastname: fields.lastname,
            created_at: now,
            updated_at: None,
        }
    }

    fn apply(&mut self, patch: ProfilePatch, now: DateTime<Utc>) {
        if let Some(firstname) = patch.firstname {
            self.firstname = firstname;
        }
        if let Some(lastname) = patch.lastname {
            self.lastname = lastname;
        }
        self.updated_at = Some(now);
    }

    fn full_patch(fields: ProfileFields) -> ProfilePatch {
        ProfilePatch {
            firstname: Some(fields.firstname),
            lastname: Some(fields.lastname),
        }
    }
}
