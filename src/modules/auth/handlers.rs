use axum::{extract::State, Json};
use secrecy::ExposeSecret;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::extract::AuthUser;
use crate::auth::{jwt, password};
use crate::db::models::{NewUser, User, UserLogin, UserRole};
use crate::db::repositories::UserRepository;
use crate::db::DatabaseError;
use crate::error::{AppError, AppResult};

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: User,
}

fn token_response(state: &AppState, user: User) -> AppResult<Json<TokenResponse>> {
    let access_token = jwt::issue(
        &user,
        &state.env.auth.jwt_secret,
        state.env.auth.token_ttl_days,
    )
    .map_err(|err| AppError::InternalServerError(format!("failed to issue token: {}", err)))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        user,
    }))
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> AppResult<Json<TokenResponse>> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let password_hash = password::hash_password(payload.password.expose_secret())
        .map_err(|err| AppError::InternalServerError(format!("failed to hash password: {}", err)))?;

    let user = User {
        id: Uuid::new_v4(),
        name: payload.name,
        email: payload.email.to_lowercase(),
        password_hash,
        phone: payload.phone,
        role: payload.role.unwrap_or(UserRole::Citizen),
        created_at: OffsetDateTime::now_utc(),
    };

    UserRepository::insert(&state.db, &user)
        .await
        .map_err(|err| match err {
            DatabaseError::Duplicate => AppError::Conflict("email already registered".to_string()),
            other => AppError::Database(other),
        })?;

    info!(user_id = %user.id, role = %user.role.as_str(), "user signed up");
    token_response(&state, user)
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> AppResult<Json<TokenResponse>> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    // Same failure message whether the email or the password is wrong.
    let user = UserRepository::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| AppError::Authentication("invalid email or password".to_string()))?;

    if !password::verify_password(payload.password.expose_secret(), &user.password_hash) {
        return Err(AppError::Authentication(
            "invalid email or password".to_string(),
        ));
    }

    token_response(&state, user)
}

pub async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}
