use axum::{
    extract::DefaultBodyLimit,
    routing::{get, put},
    Router,
};

use super::handlers::{
    add_comment, assign_report, create_report, get_report, list_comments, list_reports,
    update_status,
};
use crate::app_state::AppState;

// Body cap for multipart submissions; five phone photos fit comfortably.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reports).post(create_report))
        .route("/:id", get(get_report))
        .route("/:id/status", put(update_status))
        .route("/:id/assign", put(assign_report))
        .route("/:id/comments", get(list_comments).post(add_comment))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
