use axum::{routing::get, Router};

use super::handlers::list_users;
use crate::app_state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/", get(list_users))
}
