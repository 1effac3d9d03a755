use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::app_state::AppState;
use crate::auth::jwt;
use crate::db::models::User;
use crate::db::repositories::UserRepository;
use crate::error::AppError;

/// Request-scoped identity. Rejects with 401 when the bearer token is
/// missing, invalid, expired, or points at a deleted account.
pub struct AuthUser(pub User);

/// Identity for endpoints that also accept anonymous callers; any failure
/// to authenticate degrades to `None`.
pub struct MaybeAuthUser(pub Option<User>);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn resolve_user(parts: &Parts, state: &AppState) -> Result<User, AppError> {
    let token = bearer_token(&parts.headers)
        .ok_or_else(|| AppError::Authentication("missing bearer token".to_string()))?;

    let claims = jwt::verify(token, &state.env.auth.jwt_secret)
        .map_err(|err| AppError::Authentication(format!("invalid token: {}", err)))?;

    UserRepository::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Authentication("unknown user".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_user(parts, state).await.map(AuthUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuthUser(resolve_user(parts, state).await.ok()))
    }
}
