use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::errors::AppError;
use crate::forms::validation::Draft;
use crate::forms::{
    failed_message, FormController, FormError, FormEvent, FormState, Notification,
};
use crate::models::Entity;
use crate::repository::Repository;

/// The single source of truth for a displayed list. Reloaded from the
/// repository after every successful write.
pub struct EntityList<E: Entity> {
    repo: Arc<dyn Repository<E>>,
    scope: E::Scope,
    items: Vec<E>,
}

impl<E: Entity> EntityList<E> {
    pub async fn load(repo: Arc<dyn Repository<E>>, scope: E::Scope) -> Result<Self, AppError> {
        let items = repo.list(scope).await?;
        Ok(EntityList { repo, scope, items })
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn find(&self, id: i64) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub async fn reload(&mut self) -> Result<(), AppError> {
        self.items = self.repo.list(self.scope).await?;
        Ok(())
    }

    /// Any change event invalidates the list; it is re-fetched, never patched.
    pub async fn handle(&mut self, _event: &FormEvent<E>) -> Result<(), AppError> {
        self.reload().await
    }
}

/// Which form is open on a list. Adding and editing are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "id", rename_all = "snake_case")]
pub enum OpenForm {
    Adding,
    Editing(i64),
}

/// A managed list with at most one open add/edit form, e.g. the experience
/// and link sections of the profile page.
pub struct ListEditor<D: Draft> {
    list: EntityList<D::Entity>,
    form: FormController<D>,
    open: Option<OpenForm>,
}

impl<D: Draft> ListEditor<D> {
    pub async fn load(
        repo: Arc<dyn Repository<D::Entity>>,
        scope: <D::Entity as Entity>::Scope,
    ) -> Result<Self, AppError> {
        let list = EntityList::load(repo.clone(), scope).await?;
        Ok(ListEditor {
            list,
            form: FormController::new(repo, scope),
            open: None,
        })
    }

    pub fn items(&self) -> &[D::Entity] {
        self.list.items()
    }

    pub fn open_form(&self) -> Option<OpenForm> {
        self.open
    }

    pub fn form(&self) -> &FormController<D> {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormController<D> {
        &mut self.form
    }

    /// Opens the "add" form, closing any edit form first.
    pub fn start_add(&mut self) -> Result<(), FormError> {
        self.close()?;
        self.form.open_new()?;
        self.open = Some(OpenForm::Adding);
        Ok(())
    }

    /// Opens the edit form for `id`, closing the "add" form (or another edit) first.
    pub fn start_edit(&mut self, id: i64) -> Result<(), FormError> {
        let entity = self.list.find(id).cloned().ok_or(FormError::UnknownItem(id))?;
        self.close()?;
        self.form.open_existing(&entity)?;
        self.open = Some(OpenForm::Editing(id));
        Ok(())
    }

    /// Closes whichever form is open, discarding its draft.
    pub fn close(&mut self) -> Result<(), FormError> {
        self.form.cancel()?;
        self.open = None;
        Ok(())
    }

    /// Submits the open form. On success the form closes and the list is
    /// re-fetched; on failure the form stays open with its draft.
    pub async fn submit(&mut self) -> Result<Notification, FormError> {
        let outcome = self.form.submit().await?;
        if let Some(event) = &outcome.event {
            self.open = None;
            if let Some(failure) = self.reload_after(event).await {
                return Ok(failure);
            }
        }
        Ok(outcome.notification)
    }

    /// Deletes `id` immediately. Reloads and reports either way.
    pub async fn delete(&mut self, id: i64) -> Notification {
        let name = <D::Entity as Entity>::NAME;
        match self.list.repo.delete(self.list.scope, id).await {
            Ok(()) => {
                if self.open == Some(OpenForm::Editing(id))
                    && self.form.state() != FormState::Submitting
                {
                    self.form.cancel().ok();
                    self.open = None;
                }
                if let Some(failure) = self.reload_after(&FormEvent::Deleted(id)).await {
                    return failure;
                }
                Notification::success(format!("{} deleted", crate::errors::capitalize(name)))
            }
            Err(e) => {
                warn!("Deleting {name} {id} failed: {e}");
                Notification::error(failed_message("delete", name))
            }
        }
    }

    async fn reload_after(&mut self, event: &FormEvent<D::Entity>) -> Option<Notification> {
        let name = <D::Entity as Entity>::NAME;
        match self.list.handle(event).await {
            Ok(()) => None,
            Err(e) => {
                warn!("Reloading {name} list failed: {e}");
                Some(Notification::error(failed_message("load", &format!("{name}s"))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::testing::RecordingRepository;
    use crate::forms::validation::{ExperienceDraft, LinkDraft};
    use crate::models::{Experience, ExperienceFields, Link, LinkFields, ProfileId};

    const PROFILE: ProfileId = ProfileId(1);

    async fn seeded_links() -> (Arc<RecordingRepository<Link>>, ListEditor<LinkDraft>) {
        let repo = RecordingRepository::<Link>::new();
        for (url, description) in [("https://a.dev", "A"), ("https://b.dev", "B")] {
            repo.create(
                PROFILE,
                LinkFields {
                    url: url.into(),
                    description: description.into(),
                },
            )
            .await
            .unwrap();
        }
        let editor = ListEditor::<LinkDraft>::load(repo.clone(), PROFILE)
            .await
            .unwrap();
        (repo, editor)
    }

    #[tokio::test]
    async fn test_only_one_form_open_per_list() {
        let (_repo, mut editor) = seeded_links().await;
        let first = editor.items()[0].id;

        editor.start_add().unwrap();
        editor.form_mut().edit(|d| d.url = "https://c.dev".into()).unwrap();
        assert_eq!(editor.open_form(), Some(OpenForm::Adding));

        editor.start_edit(first).unwrap();
        assert_eq!(editor.open_form(), Some(OpenForm::Editing(first)));
        assert_eq!(editor.form().draft().id, Some(first));
        assert_eq!(editor.form().draft().url, "https://a.dev");

        editor.start_add().unwrap();
        assert_eq!(editor.open_form(), Some(OpenForm::Adding));
        assert_eq!(editor.form().draft(), &LinkDraft::default());
    }

    #[tokio::test]
    async fn test_start_edit_unknown_item() {
        let (_repo, mut editor) = seeded_links().await;
        assert_eq!(editor.start_edit(999).unwrap_err(), FormError::UnknownItem(999));
        assert_eq!(editor.open_form(), None);
    }

    #[tokio::test]
    async fn test_submit_reloads_list() {
        let (_repo, mut editor) = seeded_links().await;
        editor.start_add().unwrap();
        editor
            .form_mut()
            .edit(|d| {
                d.url = "https://c.dev".into();
                d.description = "C".into();
            })
            .unwrap();

        let note = editor.submit().await.unwrap();
        assert_eq!(note.message, "Link added");
        assert_eq!(editor.items().len(), 3);
        assert_eq!(editor.open_form(), None);
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_form_and_list() {
        let (repo, mut editor) = seeded_links().await;
        let first = editor.items()[0].id;
        editor.start_edit(first).unwrap();
        editor
            .form_mut()
            .edit(|d| d.description = "Renamed".into())
            .unwrap();

        repo.set_failing(true);
        let calls_before = repo.calls();
        let note = editor.submit().await.unwrap();
        assert!(note.is_error());
        assert_eq!(editor.open_form(), Some(OpenForm::Editing(first)));
        assert_eq!(editor.form().draft().description, "Renamed");
        assert_eq!(editor.items()[0].description, "A");
        // one failed update, no list reload
        assert_eq!(repo.calls(), calls_before + 1);
    }

    #[tokio::test]
    async fn test_delete_reloads_and_closes_edit_of_deleted_item() {
        let (_repo, mut editor) = seeded_links().await;
        let first = editor.items()[0].id;
        editor.start_edit(first).unwrap();

        let note = editor.delete(first).await;
        assert_eq!(note, Notification::success("Link deleted"));
        assert_eq!(editor.items().len(), 1);
        assert_eq!(editor.open_form(), None);
    }

    #[tokio::test]
    async fn test_delete_failure_reports_error() {
        let (repo, mut editor) = seeded_links().await;
        repo.set_failing(true);
        let first = editor.items()[0].id;

        let note = editor.delete(first).await;
        assert_eq!(note, Notification::error("Failed to delete link"));
        assert_eq!(editor.items().len(), 2);
    }

    #[tokio::test]
    async fn test_experience_list_stays_sorted_after_add() {
        let repo = RecordingRepository::<Experience>::new();
        repo.create(
            PROFILE,
            ExperienceFields {
                company: "Old".into(),
                role: "Dev".into(),
                location: "Nantes".into(),
                start_date: "2020-01-01".parse().unwrap(),
                end_date: Some("2021-06-30".parse().unwrap()),
            },
        )
        .await
        .unwrap();
        let mut editor = ListEditor::<ExperienceDraft>::load(repo.clone(), PROFILE)
            .await
            .unwrap();

        editor.start_add().unwrap();
        editor
            .form_mut()
            .edit(|d| {
                d.company = "New".into();
                d.role = "Lead".into();
                d.location = "Remote".into();
                d.start_date = "2022-01-01".into();
            })
            .unwrap();
        let note = editor.submit().await.unwrap();

        assert_eq!(note.message, "Experience added");
        assert_eq!(editor.items()[0].company, "New");
        assert!(editor.items()[0].end_date.is_none());
        assert_eq!(editor.items()[1].company, "Old");
    }
}
