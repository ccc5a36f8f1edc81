//! Form controllers: hold one draft, validate it, write it through a
//! repository and report the outcome as an event plus a notification.
//!
//! State machine per form: `Idle → Editing → Submitting → (Idle | Editing)`.
//! The page-owned [`list::EntityList`] is the only copy of the list; forms
//! never mutate it directly, they emit [`FormEvent`]s that make it re-fetch.

pub mod list;
pub mod validation;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::{capitalize, AppError};
use crate::models::Entity;
use crate::repository::Repository;

use validation::{Draft, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormState {
    Idle,
    Editing,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient, user-visible message (a toast).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Notification {
            level: NotificationLevel::Success,
            title: "Success".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notification {
            level: NotificationLevel::Error,
            title: "Error".to_string(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NotificationLevel::Error
    }
}

/// Emitted after a successful write so list holders re-fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent<E> {
    Saved(E),
    Deleted(i64),
}

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    /// A submission for this form is still in flight.
    #[error("A submission is already in progress")]
    Busy,

    #[error("No form is open")]
    NotEditing,

    #[error("Invalid input: {0}")]
    Invalid(ValidationErrors),

    #[error("Item {0} is not in this list")]
    UnknownItem(i64),
}

/// A validated payload, ready to be written.
#[derive(Debug, Clone)]
pub struct Submission<E: Entity> {
    pub id: Option<i64>,
    pub fields: E::Fields,
}

impl<E: Entity> Submission<E> {
    /// Create when the draft had no id, full update otherwise.
    pub async fn execute(
        self,
        repo: &dyn Repository<E>,
        scope: E::Scope,
    ) -> Result<E, AppError> {
        match self.id {
            Some(id) => repo.update(scope, id, E::full_patch(self.fields)).await,
            None => repo.create(scope, self.fields).await,
        }
    }
}

/// What a finished submission produced.
#[derive(Debug, Clone)]
pub struct FormOutcome<E> {
    pub notification: Notification,
    /// `None` on failure: the list must not reload.
    pub event: Option<FormEvent<E>>,
}

pub(crate) fn saved_message(entity: &str, created: bool) -> String {
    let verb = if created { "added" } else { "updated" };
    format!("{} {verb}", capitalize(entity))
}

pub(crate) fn failed_message(action: &str, entity: &str) -> String {
    format!("Failed to {action} {entity}")
}

pub struct FormController<D: Draft> {
    repo: Arc<dyn Repository<D::Entity>>,
    scope: <D::Entity as Entity>::Scope,
    state: FormState,
    draft: D,
    errors: ValidationErrors,
}

impl<D: Draft> FormController<D> {
    pub fn new(
        repo: Arc<dyn Repository<D::Entity>>,
        scope: <D::Entity as Entity>::Scope,
    ) -> Self {
        FormController {
            repo,
            scope,
            state: FormState::Idle,
            draft: D::default(),
            errors: ValidationErrors::new(),
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    /// Field errors from the last rejected submit.
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Opens an empty draft for a new entity.
    pub fn open_new(&mut self) -> Result<(), FormError> {
        self.open(D::default())
    }

    /// Opens a draft prefilled from an existing entity.
    pub fn open_existing(&mut self, entity: &D::Entity) -> Result<(), FormError> {
        self.open(D::from_entity(entity))
    }

    fn open(&mut self, draft: D) -> Result<(), FormError> {
        if self.state == FormState::Submitting {
            return Err(FormError::Busy);
        }
        self.draft = draft;
        self.errors = ValidationErrors::new();
        self.state = FormState::Editing;
        Ok(())
    }

    /// Applies user input to the open draft.
    pub fn edit(&mut self, change: impl FnOnce(&mut D)) -> Result<(), FormError> {
        match self.state {
            FormState::Editing => {
                change(&mut self.draft);
                Ok(())
            }
            FormState::Submitting => Err(FormError::Busy),
            FormState::Idle => Err(FormError::NotEditing),
        }
    }

    /// Discards the draft without touching the repository.
    pub fn cancel(&mut self) -> Result<(), FormError> {
        if self.state == FormState::Submitting {
            return Err(FormError::Busy);
        }
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.draft = D::default();
        self.errors = ValidationErrors::new();
        self.state = FormState::Idle;
    }

    /// Validates the draft and moves to `Submitting`.
    ///
    /// Invalid drafts stay in `Editing` with their field errors recorded and
    /// never reach the repository.
    pub fn begin_submit(&mut self) -> Result<Submission<D::Entity>, FormError> {
        match self.state {
            FormState::Submitting => return Err(FormError::Busy),
            FormState::Idle => return Err(FormError::NotEditing),
            FormState::Editing => {}
        }

        match self.draft.validate() {
            Ok(fields) => {
                self.errors = ValidationErrors::new();
                self.state = FormState::Submitting;
                Ok(Submission {
                    id: self.draft.id(),
                    fields,
                })
            }
            Err(errors) => {
                debug!(
                    "Rejected {} draft: {errors}",
                    <D::Entity as Entity>::NAME
                );
                self.errors = errors.clone();
                Err(FormError::Invalid(errors))
            }
        }
    }

    /// Settles an in-flight submission. Success resets the draft and emits
    /// `Saved`; failure keeps the draft for a manual retry.
    pub fn finish_submit(
        &mut self,
        created: bool,
        result: Result<D::Entity, AppError>,
    ) -> FormOutcome<D::Entity> {
        let name = <D::Entity as Entity>::NAME;
        match result {
            Ok(entity) => {
                self.reset();
                FormOutcome {
                    notification: Notification::success(saved_message(name, created)),
                    event: Some(FormEvent::Saved(entity)),
                }
            }
            Err(e) => {
                if e.is_backend_failure() {
                    warn!("Saving {name} failed: {e}");
                } else {
                    debug!("Saving {name} rejected: {e}");
                }
                self.state = FormState::Editing;
                FormOutcome {
                    notification: Notification::error(failed_message("save", name)),
                    event: None,
                }
            }
        }
    }

    /// Validates and writes the draft: `create` without an id, `update` with one.
    pub async fn submit(&mut self) -> Result<FormOutcome<D::Entity>, FormError> {
        let submission = self.begin_submit()?;
        let created = submission.id.is_none();
        let result = submission.execute(self.repo.as_ref(), self.scope).await;
        Ok(self.finish_submit(created, result))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingRepository;
    use super::validation::{ApplicationDraft, LinkDraft};
    use super::*;
    use crate::models::{Application, Link, ProfileId, UserId};
    use uuid::Uuid;

    fn link_form() -> (Arc<RecordingRepository<Link>>, FormController<LinkDraft>) {
        let repo = RecordingRepository::<Link>::new();
        let form = FormController::<LinkDraft>::new(repo.clone(), ProfileId(1));
        (repo, form)
    }

    #[tokio::test]
    async fn test_invalid_url_never_reaches_repository() {
        let (repo, mut form) = link_form();
        form.open_new().unwrap();
        form.edit(|d| {
            d.url = "not-a-url".into();
            d.description = "Portfolio".into();
        })
        .unwrap();

        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, FormError::Invalid(_)));
        assert_eq!(repo.calls(), 0);
        assert_eq!(form.state(), FormState::Editing);
        assert_eq!(form.draft().url, "not-a-url");
        assert_eq!(form.errors().message_for("url"), Some("Please enter a valid URL"));
    }

    #[tokio::test]
    async fn test_successful_create_resets_and_emits_saved() {
        let (repo, mut form) = link_form();
        form.open_new().unwrap();
        form.edit(|d| {
            d.url = "https://ada.dev".into();
            d.description = "Blog".into();
        })
        .unwrap();

        let outcome = form.submit().await.unwrap();
        assert_eq!(outcome.notification, Notification::success("Link added"));
        match outcome.event {
            Some(FormEvent::Saved(link)) => assert_eq!(link.url, "https://ada.dev"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(form.state(), FormState::Idle);
        assert_eq!(form.draft(), &LinkDraft::default());
        assert_eq!(repo.calls(), 1);
    }

    #[tokio::test]
    async fn test_existing_draft_updates() {
        let repo = RecordingRepository::<Application>::new();
        let owner = UserId(Uuid::new_v4());
        let app = repo
            .create(
                owner,
                crate::models::ApplicationFields {
                    title: "Rust dev".into(),
                    description: "Remote".into(),
                    text: "Offer".into(),
                },
            )
            .await
            .unwrap();

        let mut form = FormController::<ApplicationDraft>::new(repo.clone(), owner);
        form.open_existing(&app).unwrap();
        form.edit(|d| d.title = "Staff Rust dev".into()).unwrap();
        let outcome = form.submit().await.unwrap();

        assert_eq!(outcome.notification.message, "Application updated");
        let stored = repo.get(owner, app.id).await.unwrap();
        assert_eq!(stored.title, "Staff Rust dev");
        assert_eq!(repo.list(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_draft() {
        let (repo, mut form) = link_form();
        repo.set_failing(true);
        form.open_new().unwrap();
        form.edit(|d| {
            d.url = "https://ada.dev".into();
            d.description = "Blog".into();
        })
        .unwrap();

        let outcome = form.submit().await.unwrap();
        assert!(outcome.notification.is_error());
        assert_eq!(outcome.notification.message, "Failed to save link");
        assert!(outcome.event.is_none());
        assert_eq!(form.state(), FormState::Editing);
        assert_eq!(form.draft().url, "https://ada.dev");

        repo.set_failing(false);
        let retry = form.submit().await.unwrap();
        assert!(!retry.notification.is_error());
    }

    #[test]
    fn test_second_submit_while_in_flight_is_busy() {
        let (_repo, mut form) = link_form();
        form.open_new().unwrap();
        form.edit(|d| {
            d.url = "https://ada.dev".into();
            d.description = "Blog".into();
        })
        .unwrap();

        let submission = form.begin_submit().unwrap();
        assert!(submission.id.is_none());
        assert_eq!(form.state(), FormState::Submitting);
        assert_eq!(form.begin_submit().unwrap_err(), FormError::Busy);
        assert_eq!(form.cancel().unwrap_err(), FormError::Busy);
        assert_eq!(form.edit(|d| d.url.clear()).unwrap_err(), FormError::Busy);

        let outcome = form.finish_submit(true, Err(AppError::not_found("profile")));
        assert!(outcome.event.is_none());
        assert_eq!(form.state(), FormState::Editing);
        assert!(form.begin_submit().is_ok());
    }

    #[tokio::test]
    async fn test_cancel_discards_without_repository_call() {
        let (repo, mut form) = link_form();
        form.open_new().unwrap();
        form.edit(|d| d.url = "https://ada.dev".into()).unwrap();
        form.cancel().unwrap();

        assert_eq!(form.state(), FormState::Idle);
        assert_eq!(form.draft(), &LinkDraft::default());
        assert_eq!(repo.calls(), 0);
    }

    #[test]
    fn test_idle_form_cannot_submit_or_edit() {
        let (_repo, mut form) = link_form();
        assert_eq!(form.begin_submit().unwrap_err(), FormError::NotEditing);
        assert_eq!(form.edit(|_| {}).unwrap_err(), FormError::NotEditing);
    }
}
