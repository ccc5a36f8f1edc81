use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{Entity, ProfileId};

/// An external link (portfolio, GitHub, LinkedIn, ...) shown on a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Link {
    pub id: i64,
    pub profile: ProfileId,
    pub url: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkFields {
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPatch {
    pub url: Option<String>,
    pub description: Option<String>,
}

impl Entity for Link {
    type Scope = ProfileId;
    type Fields = LinkFields;
    type Patch = LinkPatch;

    const NAME: &'static str = "link";

    fn id(&self) -> i64 {
        self.id
    }

    fn scope(&self) -> ProfileId {
        self.profile
    }

    fn build(id: i64, profile: ProfileId, fields: LinkFields, now: DateTime<Utc>) -> Self {
        Link {
            id,
            profile,
            url: fields.url,
            description: fields.description,
            created_at: now,
            updated_at: None,
        }
    }

    fn apply(&mut self, patch: LinkPatch, now: DateTime<Utc>) {
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        self.updated_at = Some(now);
    }

    fn full_patch(fields: LinkFields) -> LinkPatch {
        LinkPatch {
            url: Some(fields.url),
            description: Some(fields.description),
        }
    }
}
