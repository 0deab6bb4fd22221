use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, ProfileUpdate, User};
use crate::error::StoreError;

/// Persistence boundary for user credentials.
///
/// Implementations own email uniqueness: `insert` must fail with
/// `StoreError::DuplicateEmail` when a row with the same lowercased email
/// already exists, atomically with respect to concurrent inserts.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Case-insensitive lookup. Returns soft-deleted rows too.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Returns soft-deleted rows too.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
    /// Marks the user deleted. Returns false if absent or already deleted.
    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError>;
    /// Applies a partial update to an active user.
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<Option<User>, StoreError>;
}

const USER_COLUMNS: &str = "id, email, password_hash, full_name, college_name, program, \
     year_of_study, locale, theme, is_verified, created_at, updated_at, deleted_at";

/// PostgreSQL-backed store over the `users` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let res = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, college_name, program, year_of_study)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.college_name)
        .bind(&user.program)
        .bind(user.year_of_study)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(u) => Ok(u),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET deleted_at = now(), updated_at = now()
             WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET full_name     = COALESCE($2, full_name),
                   college_name  = CASE WHEN $3 THEN $4 ELSE college_name END,
                   program       = CASE WHEN $5 THEN $6 ELSE program END,
                   year_of_study = CASE WHEN $7 THEN $8 ELSE year_of_study END,
                   locale        = COALESCE($9, locale),
                   theme         = COALESCE($10, theme),
                   updated_at    = now()
             WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.full_name)
        .bind(update.college_name.is_some())
        .bind(update.college_name.flatten())
        .bind(update.program.is_some())
        .bind(update.program.flatten())
        .bind(update.year_of_study.is_some())
        .bind(update.year_of_study.flatten())
        .bind(update.locale)
        .bind(update.theme)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

// Run with `DATABASE_URL=postgres://... cargo test -- --ignored`; each test gets
// a fresh database with `./migrations` applied.
#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            full_name: "Ada Lovelace".into(),
            college_name: Some("Analytical College".into()),
            program: Some("Mathematics".into()),
            year_of_study: Some(2),
        }
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn unique_violation_maps_to_duplicate_email(pool: PgPool) {
        let store = PgCredentialStore::new(pool);
        let user = store.insert(new_user("ada@example.com")).await.unwrap();

        let err = store.insert(new_user("ADA@Example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail), "{err:?}");

        let found = store.find_by_email("Ada@EXAMPLE.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn concurrent_inserts_yield_exactly_one_row(pool: PgPool) {
        let store = PgCredentialStore::new(pool.clone());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let email = if i % 2 == 0 { "race@example.com" } else { "Race@Example.com" };
                tokio::spawn(async move { store.insert(new_user(email)).await })
            })
            .collect();

        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(StoreError::DuplicateEmail) => {}
                Err(e) => panic!("unexpected error: {e:?}"),
            }
        }
        assert_eq!(ok, 1);

        let (rows,): (i64,) = sqlx::query_as("SELECT count(*) FROM users WHERE lower(email) = $1")
            .bind("race@example.com")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn update_profile_sets_clears_and_keeps(pool: PgPool) {
        let store = PgCredentialStore::new(pool);
        let user = store.insert(new_user("ada@example.com")).await.unwrap();

        let update = ProfileUpdate {
            college_name: Some(None),
            year_of_study: Some(Some(3)),
            theme: Some("dark".into()),
            ..Default::default()
        };
        let updated = store.update_profile(user.id, update).await.unwrap().unwrap();
        assert_eq!(updated.college_name, None);
        assert_eq!(updated.year_of_study, Some(3));
        assert_eq!(updated.program.as_deref(), Some("Mathematics"));
        assert_eq!(updated.theme, "dark");
        assert_eq!(updated.locale, "en");

        assert!(store.soft_delete(user.id).await.unwrap());
        assert!(!store.soft_delete(user.id).await.unwrap());
        let gone = store
            .update_profile(user.id, ProfileUpdate::default())
            .await
            .unwrap();
        assert!(gone.is_none());
    }
}
