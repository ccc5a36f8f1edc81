//! Drafts: the raw, not-yet-persisted form input for each entity, and the
//! shape checks that turn a draft into validated create fields.

use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{
    Application, ApplicationFields, Entity, Experience, ExperienceFields, Link, LinkFields,
    Profile, ProfileFields,
};

const MIN_NAME_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Field-level validation failures, in field order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// First message reported for `field`.
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// In-memory form state for one entity, new (`id() == None`) or existing.
pub trait Draft: Clone + Default + Send + Sync + fmt::Debug + 'static {
    type Entity: Entity;

    fn id(&self) -> Option<i64>;

    fn from_entity(entity: &Self::Entity) -> Self;

    fn validate(&self) -> Result<<Self::Entity as Entity>::Fields, ValidationErrors>;
}

fn required(errors: &mut ValidationErrors, field: &'static str, value: &str, message: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.push(field, message);
    }
    value.to_string()
}

fn min_chars(errors: &mut ValidationErrors, field: &'static str, value: &str, label: &str) -> String {
    let value = value.trim();
    if value.chars().count() < MIN_NAME_CHARS {
        errors.push(
            field,
            format!("{label} must be at least {MIN_NAME_CHARS} characters."),
        );
    }
    value.to_string()
}

/// Accepts `YYYY-MM-DD`, or an RFC 3339 timestamp (date pickers send those).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

/// Absolute http(s) URL with a host.
pub fn is_valid_url(value: &str) -> bool {
    match Url::parse(value.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Drafts
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileDraft {
    pub id: Option<i64>,
    pub firstname: String,
    pub lastname: String,
}

impl Draft for ProfileDraft {
    type Entity = Profile;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn from_entity(profile: &Profile) -> Self {
        ProfileDraft {
            id: Some(profile.id.0),
            firstname: profile.firstname.clone(),
            lastname: profile.lastname.clone(),
        }
    }

    fn validate(&self) -> Result<ProfileFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let firstname = min_chars(&mut errors, "firstname", &self.firstname, "Firstname");
        let lastname = min_chars(&mut errors, "lastname", &self.lastname, "Lastname");
        errors.finish(|| ProfileFields {
            firstname,
            lastname,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceDraft {
    pub id: Option<i64>,
    pub company: String,
    pub role: String,
    pub location: String,
    pub start_date: String,
    /// Empty or absent means the experience is ongoing.
    pub end_date: Option<String>,
}

impl Draft for ExperienceDraft {
    type Entity = Experience;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn from_entity(experience: &Experience) -> Self {
        ExperienceDraft {
            id: Some(experience.id),
            company: experience.company.clone(),
            role: experience.role.clone(),
            location: experience.location.clone(),
            start_date: experience.start_date.format("%Y-%m-%d").to_string(),
            end_date: experience
                .end_date
                .map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }

    fn validate(&self) -> Result<ExperienceFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let company = required(&mut errors, "company", &self.company, "Company is required");
        let role = required(&mut errors, "role", &self.role, "Role is required");
        let location = required(&mut errors, "location", &self.location, "Location is required");

        let start_date = if self.start_date.trim().is_empty() {
            errors.push("start_date", "Start date is required");
            None
        } else {
            let parsed = parse_date(&self.start_date);
            if parsed.is_none() {
                errors.push("start_date", "Start date must be a valid date");
            }
            parsed
        };

        let end_date = match self.end_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    errors.push("end_date", "End date must be a valid date");
                }
                parsed
            }
        };

        match start_date {
            Some(start_date) => errors.finish(|| ExperienceFields {
                company,
                role,
                location,
                start_date,
                end_date,
            }),
            None => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkDraft {
    pub id: Option<i64>,
    pub url: String,
    pub description: String,
}

impl Draft for LinkDraft {
    type Entity = Link;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn from_entity(link: &Link) -> Self {
        LinkDraft {
            id: Some(link.id),
            url: link.url.clone(),
            description: link.description.clone(),
        }
    }

    fn validate(&self) -> Result<LinkFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let url = self.url.trim().to_string();
        if !is_valid_url(&url) {
            errors.push("url", "Please enter a valid URL");
        }
        let description = required(
            &mut errors,
            "description",
            &self.description,
            "Description is required",
        );
        errors.finish(|| LinkFields { url, description })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationDraft {
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub text: String,
}

impl Draft for ApplicationDraft {
    type Entity = Application;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn from_entity(app: &Application) -> Self {
        ApplicationDraft {
            id: Some(app.id),
            title: app.title.clone(),
            description: app.description.clone(),
            text: app.text.clone(),
        }
    }

    fn validate(&self) -> Result<ApplicationFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let title = required(&mut errors, "title", &self.title, "Title is required");
        let description = required(
            &mut errors,
            "description",
            &self.description,
            "Description is required",
        );
        let text = required(&mut errors, "text", &self.text, "Job Offer is required");
        errors.finish(|| ApplicationFields {
            title,
            description,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_rejects_non_url() {
        let draft = LinkDraft {
            url: "not-a-url".into(),
            description: "Portfolio".into(),
            ..Default::default()
        };
        let errors = draft.validate().unwrap_err();
        assert_eq!(errors.message_for("url"), Some("Please enter a valid URL"));
        assert!(errors.message_for("description").is_none());
    }

    #[test]
    fn test_link_accepts_https_and_trims() {
        let fields = LinkDraft {
            url: "  https://example.com/me ".into(),
            description: " Site ".into(),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(fields.url, "https://example.com/me");
        assert_eq!(fields.description, "Site");
    }

    #[test]
    fn test_url_rules() {
        assert!(is_valid_url("http://localhost:3000"));
        assert!(is_valid_url("https://www.linkedin.com/in/ada"));
        assert!(!is_valid_url(""));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url("javascript:alert(1)"));
        assert!(!is_valid_url("mailto:ada@example.com"));
    }

    #[test]
    fn test_profile_names_need_two_chars() {
        let errors = ProfileDraft {
            firstname: "A".into(),
            lastname: " ".into(),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors.message_for("firstname"),
            Some("Firstname must be at least 2 characters.")
        );
        assert_eq!(
            errors.message_for("lastname"),
            Some("Lastname must be at least 2 characters.")
        );
    }

    #[test]
    fn test_application_requires_all_fields() {
        let errors = ApplicationDraft::default().validate().unwrap_err();
        assert_eq!(errors.fields().len(), 3);
        assert_eq!(errors.message_for("text"), Some("Job Offer is required"));
    }

    #[test]
    fn test_experience_requires_start_date() {
        let errors = ExperienceDraft {
            company: "Acme".into(),
            role: "Dev".into(),
            location: "Berlin".into(),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.message_for("start_date"), Some("Start date is required"));
        assert_eq!(errors.fields().len(), 1);
    }

    #[test]
    fn test_experience_bad_dates() {
        let errors = ExperienceDraft {
            company: "Acme".into(),
            role: "Dev".into(),
            location: "Berlin".into(),
            start_date: "yesterday".into(),
            end_date: Some("2021-13-01".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(errors.message_for("start_date").is_some());
        assert!(errors.message_for("end_date").is_some());
    }

    #[test]
    fn test_experience_empty_end_date_is_ongoing() {
        let fields = ExperienceDraft {
            company: "Acme".into(),
            role: "Dev".into(),
            location: "Berlin".into(),
            start_date: "2022-01-01".into(),
            end_date: Some("".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(fields.start_date, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert!(fields.end_date.is_none());
    }

    #[test]
    fn test_parse_date_accepts_timestamps() {
        assert_eq!(
            parse_date("2020-02-29T23:00:00Z"),
            NaiveDate::from_ymd_opt(2020, 2, 29)
        );
        assert!(parse_date("29/02/2020").is_none());
    }

    #[test]
    fn test_display_joins_messages() {
        let mut errors = ValidationErrors::single("title", "Title is required");
        errors.push("text", "Job Offer is required");
        assert_eq!(
            errors.to_string(),
            "title: Title is required; text: Job Offer is required"
        );
    }
}
