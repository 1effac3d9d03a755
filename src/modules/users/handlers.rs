use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::extract::AuthUser;
use crate::db::models::{User, UserRole};
use crate::db::repositories::UserRepository;
use crate::error::{AppError, AppResult};
use crate::lifecycle;

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<String>,
}

/// Admin-only directory, used to pick assignment targets.
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<Json<Vec<User>>> {
    lifecycle::authorize(&actor, &[UserRole::Admin])?;

    let role = query
        .role
        .filter(|raw| !raw.is_empty())
        .map(|raw| raw.parse::<UserRole>().map_err(AppError::Validation))
        .transpose()?;

    let users = UserRepository::list(&state.db, role).await?;
    Ok(Json(users))
}
