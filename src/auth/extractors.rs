use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use super::{jwt::TokenValidator, repo_types::User};
use crate::error::AuthError;

/// `axum::Json` whose rejection is rendered as a 400 `{detail}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AuthError))]
pub struct AppJson<T>(pub T);

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthorization)?
        .to_str()
        .map_err(|_| AuthError::MalformedToken)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MalformedToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedToken);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedToken);
    }
    Ok(token)
}

/// The authenticated, active user behind the request.
///
/// Reuses the user resolved by [`require_auth`] when the route is wrapped in
/// it, otherwise validates the bearer token itself.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    TokenValidator: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }
        let token = bearer_token(&parts.headers)?;
        let user = TokenValidator::from_ref(state).validate(token).await?;
        Ok(CurrentUser(user))
    }
}

/// Guard middleware: rejects the request unless it carries a valid token and
/// stores the resolved user in the request extensions.
///
/// ```ignore
/// router.route_layer(axum::middleware::from_fn_with_state(validator, require_auth))
/// ```
pub async fn require_auth(
    State(validator): State<TokenValidator>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers())?;
    let user = validator.validate(token).await?;
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
