use axum::{routing::get, Router};

use super::handlers::overview;
use crate::app_state::AppState;

pub fn analytics_routes() -> Router<AppState> {
    Router::new().route("/", get(overview))
}
