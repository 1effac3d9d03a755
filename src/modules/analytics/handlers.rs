use axum::{extract::State, Json};

use crate::app_state::AppState;
use crate::auth::extract::AuthUser;
use crate::db::repositories::ReportRepository;
use crate::error::AppResult;
use crate::lifecycle::{self, AnalyticsSummary};

/// Aggregate counts for the staff dashboard. Any authenticated identity may
/// read them.
pub async fn overview(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
) -> AppResult<Json<AnalyticsSummary>> {
    let reports = ReportRepository::all(&state.db).await?;
    Ok(Json(lifecycle::summarize(&reports)))
}
