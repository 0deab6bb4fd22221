use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::CredentialStore;
use crate::auth::repo_types::{NewUser, ProfileUpdate, User, DEFAULT_LOCALE, DEFAULT_THEME};
use crate::error::StoreError;

/// Process-local credential store for development and tests.
///
/// The uniqueness check and the insert happen under the same lock, which
/// gives the same guarantee as the unique index on the Postgres side.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub fn count_by_email(&self, email: &str) -> usize {
        let needle = email.to_lowercase();
        self.lock().values().filter(|u| u.email.to_lowercase() == needle).count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, User>> {
        // a poisoned map is still structurally valid
        self.users.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let needle = email.to_lowercase();
        Ok(self
            .lock()
            .values()
            .find(|u| u.email.to_lowercase() == needle)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn insert(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.lock();
        let needle = new.email.to_lowercase();
        if users.values().any(|u| u.email.to_lowercase() == needle) {
            return Err(StoreError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            full_name: new.full_name,
            college_name: new.college_name,
            program: new.program,
            year_of_study: new.year_of_study,
            locale: DEFAULT_LOCALE.into(),
            theme: DEFAULT_THEME.into(),
            is_verified: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.lock();
        match users.get_mut(&id) {
            Some(u) if u.deleted_at.is_none() => {
                let now = OffsetDateTime::now_utc();
                u.deleted_at = Some(now);
                u.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<Option<User>, StoreError> {
        let mut users = self.lock();
        let Some(u) = users.get_mut(&id).filter(|u| u.deleted_at.is_none()) else {
            return Ok(None);
        };
        if let Some(v) = update.full_name {
            u.full_name = v;
        }
        if let Some(v) = update.college_name {
            u.college_name = v;
        }
        if let Some(v) = update.program {
            u.program = v;
        }
        if let Some(v) = update.year_of_study {
            u.year_of_study = v;
        }
        if let Some(v) = update.locale {
            u.locale = v;
        }
        if let Some(v) = update.theme {
            u.theme = v;
        }
        u.updated_at = OffsetDateTime::now_utc();
        Ok(Some(u.clone()))
    }
}
