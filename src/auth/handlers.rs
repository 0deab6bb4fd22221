use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, PublicUser, SignupRequest, SignupResponse,
            UpdateProfileRequest,
        },
        extractors::{require_auth, AppJson, CurrentUser},
        jwt::TokenValidator,
        services::AuthService,
    },
    error::AuthError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

pub fn me_routes(state: &AppState) -> Router<AppState> {
    let validator = TokenValidator::from_ref(state);
    Router::new()
        .route("/auth/me", get(get_me).patch(update_me).delete(delete_me))
        .route_layer(middleware::from_fn_with_state(validator, require_auth))
}

#[instrument(skip(svc, payload), fields(email = %payload.email))]
pub async fn signup(
    State(svc): State<AuthService>,
    AppJson(payload): AppJson<SignupRequest>,
) -> Result<Json<SignupResponse>, AuthError> {
    let session = svc.signup(payload).await?;
    Ok(Json(SignupResponse {
        id: session.user.id,
        email: session.user.email,
        token: session.token,
    }))
}

#[instrument(skip(svc, payload), fields(email = %payload.email))]
pub async fn login(
    State(svc): State<AuthService>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let session = svc.login(payload).await?;
    Ok(Json(LoginResponse {
        access_token: session.token,
        token_type: "bearer",
    }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_me(
    State(svc): State<AuthService>,
    CurrentUser(user): CurrentUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, AuthError> {
    let updated = svc.update_profile(&user, payload).await?;
    Ok(Json(updated.into()))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn delete_me(
    State(svc): State<AuthService>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, AuthError> {
    svc.delete_account(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}
