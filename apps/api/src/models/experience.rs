use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{Entity, ProfileId};

/// A professional experience attached to a profile.
/// `end_date == None` means the position is ongoing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Experience {
    pub id: i64,
    pub profile: ProfileId,
    pub company: String,
    pub role: String,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceFields {
    pub company: String,
    pub role: String,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// `end_date: Some(None)` clears the end date (marks the experience ongoing).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperiencePatch {
    pub company: Option<String>,
    pub role: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<Option<NaiveDate>>,
}

impl Entity for Experience {
    type Scope = ProfileId;
    type Fields = ExperienceFields;
    type Patch = ExperiencePatch;

    const NAME: &'static str = "experience";

    fn id(&self) -> i64 {
        self.id
    }

    fn scope(&self) -> ProfileId {
        self.profile
    }

    fn build(id: i64, profile: ProfileId, fields: ExperienceFields, now: DateTime<Utc>) -> Self {
        Experience {
            id,
            profile,
            company: fields.company,
            role: fields.role,
            location: fields.location,
            start_date: fields.start_date,
            end_date: fields.end_date,
            created_at: now,
            updated_at: None,
        }
    }

    fn apply(&mut self, patch: ExperiencePatch, now: DateTime<Utc>) {
        if let Some(company) = patch.company {
            self.company = company;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(location) = patch.location {
            self.location = location;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        self.updated_at = Some(now);
    }

    fn full_patch(fields: ExperienceFields) -> ExperiencePatch {
        ExperiencePatch {
            company: Some(fields.company),
            role: Some(fields.role),
            location: Some(fields.location),
            start_date: Some(fields.start_date),
            end_date: Some(fields.end_date),
        }
    }

    /// Most recent first; ties broken by newest id.
    fn sort_for_listing(items: &mut [Self]) {
        items.sort_by_key(|e| Reverse((e.start_date, e.id)));
    }
}
