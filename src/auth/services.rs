use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, SignupRequest, UpdateProfileRequest},
        jwt::JwtKeys,
        password::PasswordHasher,
        repo::CredentialStore,
        repo_types::{NewUser, ProfileUpdate, User, THEMES},
    },
    error::AuthError,
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_YEAR_OF_STUDY: i32 = 10;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_valid_locale(locale: &str) -> bool {
    lazy_static! {
        static ref LOCALE_RE: Regex = Regex::new(r"^[A-Za-z]{2,3}([-_][A-Za-z0-9]{2,8})?$").unwrap();
    }
    LOCALE_RE.is_match(locale)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn check_year(year: Option<i32>) -> Result<(), AuthError> {
    match year {
        Some(y) if !(1..=MAX_YEAR_OF_STUDY).contains(&y) => Err(AuthError::Validation(format!(
            "year_of_study must be between 1 and {MAX_YEAR_OF_STUDY}"
        ))),
        _ => Ok(()),
    }
}

/// Outcome of a successful signup or login.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Signup, login and account lifecycle on top of a credential store.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    keys: Arc<JwtKeys>,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        AuthService::new(state.store.clone(), state.hasher.clone(), state.keys.clone())
    }
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher, keys: Arc<JwtKeys>) -> Self {
        Self { store, hasher, keys }
    }

    pub async fn signup(&self, req: SignupRequest) -> Result<Session, AuthError> {
        let email = normalize_email(&req.email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AuthError::Validation("Invalid email".into()));
        }
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            warn!("password too short");
            return Err(AuthError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let full_name = req.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(AuthError::Validation("full_name is required".into()));
        }
        check_year(req.year_of_study)?;

        // Fast path only; the store's unique constraint settles races.
        if self.store.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = self.hasher.hash_async(req.password).await?;
        let user = self
            .store
            .insert(NewUser {
                email,
                password_hash,
                full_name,
                college_name: non_blank(req.college_name),
                program: non_blank(req.program),
                year_of_study: req.year_of_study,
            })
            .await
            .map_err(|e| {
                let e = AuthError::from(e);
                if matches!(e, AuthError::DuplicateEmail) {
                    warn!("email registered concurrently");
                }
                e
            })?;

        let token = self.keys.issue(user.id)?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(Session { user, token })
    }

    /// Every failure path returns the same `InvalidCredentials` and costs one
    /// hash verification; the reason is only logged.
    pub async fn login(&self, req: LoginRequest) -> Result<Session, AuthError> {
        let email = normalize_email(&req.email);
        let user = self.store.find_by_email(&email).await?;

        let (user, stored_hash) = match user {
            Some(u) if u.is_active() => {
                let hash = u.password_hash.clone();
                (Some(u), Some(hash))
            }
            Some(u) => {
                warn!(user_id = %u.id, "login to deleted account");
                (None, None)
            }
            None => {
                warn!(email = %email, "login unknown email");
                (None, None)
            }
        };

        let ok = self.hasher.verify_async(req.password, stored_hash).await;
        let user = match user {
            Some(u) if ok => u,
            Some(u) => {
                warn!(user_id = %u.id, "login invalid password");
                return Err(AuthError::InvalidCredentials);
            }
            None => return Err(AuthError::InvalidCredentials),
        };

        let token = self.keys.issue(user.id)?;
        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok(Session { user, token })
    }

    pub async fn update_profile(&self, user: &User, req: UpdateProfileRequest) -> Result<User, AuthError> {
        let full_name = match req.full_name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(AuthError::Validation("full_name must not be empty".into()));
                }
                Some(name)
            }
            None => None,
        };
        check_year(req.year_of_study.flatten())?;
        if let Some(locale) = req.locale.as_deref() {
            if !is_valid_locale(locale) {
                return Err(AuthError::Validation("Invalid locale".into()));
            }
        }
        if let Some(theme) = req.theme.as_deref() {
            if !THEMES.contains(&theme) {
                return Err(AuthError::Validation(format!(
                    "theme must be one of: {}",
                    THEMES.join(", ")
                )));
            }
        }

        let update = ProfileUpdate {
            full_name,
            college_name: req.college_name.map(non_blank),
            program: req.program.map(non_blank),
            year_of_study: req.year_of_study,
            locale: req.locale,
            theme: req.theme,
        };
        let updated = self
            .store
            .update_profile(user.id, update)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        info!(user_id = %updated.id, "profile updated");
        Ok(updated)
    }

    pub async fn delete_account(&self, user: &User) -> Result<(), AuthError> {
        if !self.store.soft_delete(user.id).await? {
            return Err(AuthError::UserNotFound);
        }
        info!(user_id = %user.id, "account soft-deleted");
        Ok(())
    }
}
