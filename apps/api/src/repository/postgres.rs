use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::{
    Application, ApplicationFields, ApplicationPatch, Entity, Experience, ExperienceFields,
    ExperiencePatch, Link, LinkFields, LinkPatch, Profile, ProfileFields, ProfileId,
    ProfilePatch, UserId,
};
use crate::repository::Repository;

const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL-backed repository. One SQL statement per operation, each
/// filtered on the owning column.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        PgRepository { pool }
    }
}

fn found<E: Entity>(row: Option<E>) -> Result<E, AppError> {
    row.ok_or_else(|| AppError::not_found(E::NAME))
}

fn deleted<E: Entity>(rows_affected: u64) -> Result<(), AppError> {
    if rows_affected == 0 {
        return Err(AppError::not_found(E::NAME));
    }
    Ok(())
}

fn map_insert_error<E: Entity>(err: sqlx::Error, scope: E::Scope) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            AppError::Conflict(format!("A {} already exists for {scope}", E::NAME))
        }
        _ => AppError::Database(err),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// profiles (scope: owner)
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl Repository<Profile> for PgRepository {
    async fn list(&self, owner: UserId) -> Result<Vec<Profile>, AppError> {
        debug!("Listing profiles for {owner}");
        Ok(
            sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE owner = $1 ORDER BY id")
                .bind(owner)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn get(&self, owner: UserId, id: i64) -> Result<Profile, AppError> {
        found(
            sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1 AND owner = $2")
                .bind(id)
                .bind(owner)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create(&self, owner: UserId, fields: ProfileFields) -> Result<Profile, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            "INSERT INTO profiles (owner, firstname, lastname) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(owner)
        .bind(&fields.firstname)
        .bind(&fields.lastname)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error::<Profile>(e, owner))?;

        info!("Inserted profile {} for user {owner}", profile.id);
        Ok(profile)
    }

    async fn update(&self, owner: UserId, id: i64, patch: ProfilePatch) -> Result<Profile, AppError> {
        let profile = found(
            sqlx::query_as::<_, Profile>(
                r#"
                UPDATE profiles
                SET firstname = COALESCE($3, firstname),
                    lastname = COALESCE($4, lastname),
                    updated_at = now()
                WHERE id = $1 AND owner = $2
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(owner)
            .bind(patch.firstname)
            .bind(patch.lastname)
            .fetch_optional(&self.pool)
            .await?,
        )?;

        info!("Updated profile {id} for user {owner}");
        Ok(profile)
    }

    async fn delete(&self, owner: UserId, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        deleted::<Profile>(result.rows_affected())?;

        info!("Deleted profile {id} for user {owner}");
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// experiences (scope: profile)
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl Repository<Experience> for PgRepository {
    async fn list(&self, profile: ProfileId) -> Result<Vec<Experience>, AppError> {
        debug!("Listing experiences for profile {profile}");
        Ok(sqlx::query_as::<_, Experience>(
            "SELECT * FROM experiences WHERE profile = $1 ORDER BY start_date DESC, id DESC",
        )
        .bind(profile)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get(&self, profile: ProfileId, id: i64) -> Result<Experience, AppError> {
        found(
            sqlx::query_as::<_, Experience>(
                "SELECT * FROM experiences WHERE id = $1 AND profile = $2",
            )
            .bind(id)
            .bind(profile)
            .fetch_optional(&self.pool)
            .await?,
        )
    }

    async fn create(
        &self,
        profile: ProfileId,
        fields: ExperienceFields,
    ) -> Result<Experience, AppError> {
        let experience = sqlx::query_as::<_, Experience>(
            r#"
            INSERT INTO experiences (profile, company, role, location, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(profile)
        .bind(&fields.company)
        .bind(&fields.role)
        .bind(&fields.location)
        .bind(fields.start_date)
        .bind(fields.end_date)
        .fetch_one(&self.pool)
        .await?;

        info!("Inserted experience {} for profile {profile}", experience.id);
        Ok(experience)
    }

    async fn update(
        &self,
        profile: ProfileId,
        id: i64,
        patch: ExperiencePatch,
    ) -> Result<Experience, AppError> {
        // $7 says whether end_date is being written at all; $8 may be NULL (ongoing).
        let experience = found(
            sqlx::query_as::<_, Experience>(
                r#"
                UPDATE experiences
                SET company = COALESCE($3, company),
                    role = COALESCE($4, role),
                    location = COALESCE($5, location),
                    start_date = COALESCE($6, start_date),
                    end_date = CASE WHEN $7 THEN $8 ELSE end_date END,
                    updated_at = now()
                WHERE id = $1 AND profile = $2
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(profile)
            .bind(patch.company)
            .bind(patch.role)
            .bind(patch.location)
            .bind(patch.start_date)
            .bind(patch.end_date.is_some())
            .bind(patch.end_date.flatten())
            .fetch_optional(&self.pool)
            .await?,
        )?;

        info!("Updated experience {id} for profile {profile}");
        Ok(experience)
    }

    async fn delete(&self, profile: ProfileId, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM experiences WHERE id = $1 AND profile = $2")
            .bind(id)
            .bind(profile)
            .execute(&self.pool)
            .await?;
        deleted::<Experience>(result.rows_affected())?;

        info!("Deleted experience {id} for profile {profile}");
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// links (scope: profile)
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl Repository<Link> for PgRepository {
    async fn list(&self, profile: ProfileId) -> Result<Vec<Link>, AppError> {
        debug!("Listing links for profile {profile}");
        Ok(
            sqlx::query_as::<_, Link>("SELECT * FROM links WHERE profile = $1 ORDER BY id")
                .bind(profile)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn get(&self, profile: ProfileId, id: i64) -> Result<Link, AppError> {
        found(
            sqlx::query_as::<_, Link>("SELECT * FROM links WHERE id = $1 AND profile = $2")
                .bind(id)
                .bind(profile)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create(&self, profile: ProfileId, fields: LinkFields) -> Result<Link, AppError> {
        let link = sqlx::query_as::<_, Link>(
            "INSERT INTO links (profile, url, description) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(profile)
        .bind(&fields.url)
        .bind(&fields.description)
        .fetch_one(&self.pool)
        .await?;

        info!("Inserted link {} for profile {profile}", link.id);
        Ok(link)
    }

    async fn update(&self, profile: ProfileId, id: i64, patch: LinkPatch) -> Result<Link, AppError> {
        let link = found(
            sqlx::query_as::<_, Link>(
                r#"
                UPDATE links
                SET url = COALESCE($3, url),
                    description = COALESCE($4, description),
                    updated_at = now()
                WHERE id = $1 AND profile = $2
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(profile)
            .bind(patch.url)
            .bind(patch.description)
            .fetch_optional(&self.pool)
            .await?,
        )?;

        info!("Updated link {id} for profile {profile}");
        Ok(link)
    }

    async fn delete(&self, profile: ProfileId, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1 AND profile = $2")
            .bind(id)
            .bind(profile)
            .execute(&self.pool)
            .await?;
        deleted::<Link>(result.rows_affected())?;

        info!("Deleted link {id} for profile {profile}");
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// applications (scope: owner)
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl Repository<Application> for PgRepository {
    async fn list(&self, owner: UserId) -> Result<Vec<Application>, AppError> {
        debug!("Listing applications for {owner}");
        Ok(sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE owner = $1 ORDER BY id",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get(&self, owner: UserId, id: i64) -> Result<Application, AppError> {
        found(
            sqlx::query_as::<_, Application>(
                "SELECT * FROM applications WHERE id = $1 AND owner = $2",
            )
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?,
        )
    }

    async fn create(
        &self,
        owner: UserId,
        fields: ApplicationFields,
    ) -> Result<Application, AppError> {
        let application = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (owner, title, description, "text")
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.text)
        .fetch_one(&self.pool)
        .await?;

        info!("Inserted application {} for user {owner}", application.id);
        Ok(application)
    }

    async fn update(
        &self,
        owner: UserId,
        id: i64,
        patch: ApplicationPatch,
    ) -> Result<Application, AppError> {
        let application = found(
            sqlx::query_as::<_, Application>(
                r#"
                UPDATE applications
                SET title = COALESCE($3, title),
                    description = COALESCE($4, description),
                    "text" = COALESCE($5, "text"),
                    updated_at = now()
                WHERE id = $1 AND owner = $2
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(owner)
            .bind(patch.title)
            .bind(patch.description)
            .bind(patch.text)
            .fetch_optional(&self.pool)
            .await?,
        )?;

        info!("Updated application {id} for user {owner}");
        Ok(application)
    }

    async fn delete(&self, owner: UserId, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        deleted::<Application>(result.rows_affected())?;

        info!("Deleted application {id} for user {owner}");
        Ok(())
    }
}

// Run with `cargo test -- --ignored` and DATABASE_URL pointing at a scratch
// Postgres server; each test gets a fresh database with the migrations applied.
#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId(Uuid::new_v4())
    }

    async fn profile_for(repo: &PgRepository, owner: UserId) -> Profile {
        Repository::<Profile>::create(
            repo,
            owner,
            ProfileFields {
                firstname: "Ada".into(),
                lastname: "Lovelace".into(),
            },
        )
        .await
        .unwrap()
    }

    fn experience(company: &str, start: &str, end: Option<&str>) -> ExperienceFields {
        ExperienceFields {
            company: company.into(),
            role: "Engineer".into(),
            location: "Lyon".into(),
            start_date: start.parse().unwrap(),
            end_date: end.map(|d| d.parse().unwrap()),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_other_owner_sees_not_found(pool: PgPool) {
        let repo = PgRepository::new(pool);
        let (alice, bob) = (user(), user());
        let app = Repository::<Application>::create(
            &repo,
            alice,
            ApplicationFields {
                title: "Rust dev".into(),
                description: "Remote".into(),
                text: "Offer".into(),
            },
        )
        .await
        .unwrap();

        let get = Repository::<Application>::get(&repo, bob, app.id).await;
        assert!(matches!(get, Err(AppError::NotFound(_))));
        let patch = ApplicationPatch {
            title: Some("Mine now".into()),
            ..Default::default()
        };
        let update = Repository::<Application>::update(&repo, bob, app.id, patch).await;
        assert!(matches!(update, Err(AppError::NotFound(_))));
        let delete = Repository::<Application>::delete(&repo, bob, app.id).await;
        assert!(matches!(delete, Err(AppError::NotFound(_))));
        assert!(Repository::<Application>::list(&repo, bob).await.unwrap().is_empty());

        let stored = Repository::<Application>::get(&repo, alice, app.id).await.unwrap();
        assert_eq!(stored.title, "Rust dev");
        assert!(stored.updated_at.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_second_profile_conflicts(pool: PgPool) {
        let repo = PgRepository::new(pool);
        let owner = user();
        profile_for(&repo, owner).await;

        let again = Repository::<Profile>::create(
            &repo,
            owner,
            ProfileFields {
                firstname: "Again".into(),
                lastname: "Again".into(),
            },
        )
        .await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
        assert_eq!(Repository::<Profile>::list(&repo, owner).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_experience_end_date_patch_and_order(pool: PgPool) {
        let repo = PgRepository::new(pool);
        let profile = profile_for(&repo, user()).await.id;
        let old = Repository::<Experience>::create(
            &repo,
            profile,
            experience("Old", "2019-01-01", Some("2020-06-30")),
        )
        .await
        .unwrap();
        Repository::<Experience>::create(&repo, profile, experience("New", "2022-03-01", None))
            .await
            .unwrap();

        let listed = Repository::<Experience>::list(&repo, profile).await.unwrap();
        let companies: Vec<_> = listed.iter().map(|e| e.company.as_str()).collect();
        assert_eq!(companies, vec!["New", "Old"]);

        // end_date untouched when the patch leaves it out
        let renamed = Repository::<Experience>::update(
            &repo,
            profile,
            old.id,
            ExperiencePatch {
                role: Some("Lead".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.end_date, old.end_date);
        assert!(renamed.updated_at.is_some());

        let ongoing = Repository::<Experience>::update(
            &repo,
            profile,
            old.id,
            ExperiencePatch {
                end_date: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(ongoing.end_date.is_none());
        assert_eq!(ongoing.role, "Lead");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn test_links_scoped_to_profile(pool: PgPool) {
        let repo = PgRepository::new(pool);
        let mine = profile_for(&repo, user()).await.id;
        let theirs = profile_for(&repo, user()).await.id;
        let link = Repository::<Link>::create(
            &repo,
            mine,
            LinkFields {
                url: "https://ada.dev".into(),
                description: "Blog".into(),
            },
        )
        .await
        .unwrap();

        let stolen = Repository::<Link>::update(
            &repo,
            theirs,
            link.id,
            LinkPatch {
                url: Some("https://evil.example".into()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(stolen, Err(AppError::NotFound(_))));

        let patched = Repository::<Link>::update(
            &repo,
            mine,
            link.id,
            LinkPatch {
                url: Some("https://ada.blog".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(patched.url, "https://ada.blog");
        assert_eq!(patched.description, "Blog");

        Repository::<Link>::delete(&repo, mine, link.id).await.unwrap();
        assert!(Repository::<Link>::list(&repo, mine).await.unwrap().is_empty());
    }
}
