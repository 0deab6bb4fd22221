use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String, // stored lowercased
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
    pub full_name: String,
    pub college_name: Option<String>,
    pub program: Option<String>,
    pub year_of_study: Option<i32>,
    pub locale: String,
    pub theme: String,
    pub is_verified: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Row to insert on signup. The email must already be normalized.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub college_name: Option<String>,
    pub program: Option<String>,
    pub year_of_study: Option<i32>,
}

/// Partial profile update; `None` leaves the column untouched, `Some(None)`
/// sets a nullable column to NULL.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub college_name: Option<Option<String>>,
    pub program: Option<Option<String>>,
    pub year_of_study: Option<Option<i32>>,
    pub locale: Option<String>,
    pub theme: Option<String>,
}

pub const DEFAULT_LOCALE: &str = "en";
pub const DEFAULT_THEME: &str = "light";
pub const THEMES: [&str; 3] = ["light", "dark", "system"];
