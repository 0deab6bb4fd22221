use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub college_name: Option<String>,
    pub program: Option<String>,
    pub year_of_study: Option<i32>,
}

/// Response returned after signup.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Request body for `PATCH /auth/me`. Absent fields are left unchanged; an
/// explicit `null` clears the optional academic fields.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub college_name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub program: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub year_of_study: Option<Option<i32>>,
    pub locale: Option<String>,
    pub theme: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub college_name: Option<String>,
    pub program: Option<String>,
    pub year_of_study: Option<i32>,
    pub locale: String,
    pub theme: String,
    pub is_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            college_name: u.college_name,
            program: u.program,
            year_of_study: u.year_of_study,
            locale: u.locale,
            theme: u.theme,
            is_verified: u.is_verified,
            created_at: u.created_at,
        }
    }
}
