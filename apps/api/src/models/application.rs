use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{Entity, UserId};

/// A job application: the offer text plus the user's notes about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: i64,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    /// The job offer itself.
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Row shape for the dashboard sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub id: i64,
    pub title: String,
}

impl From<&Application> for ApplicationSummary {
    fn from(app: &Application) -> Self {
        ApplicationSummary {
            id: app.id,
            title: app.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationFields {
    pub title: String,
    pub description: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub text: Option<String>,
}

impl Entity for Application {
    type Scope = UserId;
    type Fields = ApplicationFields;
    type Patch = ApplicationPatch;

    const NAME: &'static str = "application";

    fn id(&self) -> i64 {
        self.id
    }

    fn scope(&self) -> UserId {
        self.owner
    }

    fn build(id: i64, owner: UserId, fields: ApplicationFields, now: DateTime<Utc>) -> Self {
        Application {
            id,
            owner,
            title: fields.title,
            description: fields.description,
            text: fields.text,
            created_at: now,
            updated_at: None,
        }
    }

    fn apply(&mut self, patch: ApplicationPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(text) = patch.text {
            self.text = text;
        }
        self.updated_at = Some(now);
    }

    fn full_patch(fields: ApplicationFields) -> ApplicationPatch {
        ApplicationPatch {
            title: Some(fields.title),
            description: Some(fields.description),
            text: Some(fields.text),
        }
    }
}
