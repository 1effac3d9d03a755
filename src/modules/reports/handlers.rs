use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::auth::extract::{AuthUser, MaybeAuthUser};
use crate::db::models::{
    AssignUpdate, Location, NewComment, NewReport, Report, ReportCategory, ReportComment,
    ReportPriority, ReportStatus, StatusUpdate,
};
use crate::db::repositories::{CommentRepository, ReportRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::lifecycle::{self, ReportFilter, MAX_REPORT_IMAGES};
use crate::uploads;

const DEFAULT_PAGE_SIZE: usize = 100;

pub async fn create_report(
    State(state): State<AppState>,
    MaybeAuthUser(actor): MaybeAuthUser,
    mut multipart: Multipart,
) -> AppResult<Json<Report>> {
    let mut title = None;
    let mut description = None;
    let mut category = None;
    let mut priority = None;
    let mut lat = None;
    let mut lng = None;
    let mut address = None;
    let mut attachments: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("malformed multipart body: {}", err)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = Some(field_text(field).await?),
            "description" => description = Some(field_text(field).await?),
            "category" => category = Some(field_text(field).await?),
            "priority" => priority = Some(field_text(field).await?),
            "lat" => lat = Some(field_text(field).await?),
            "lng" => lng = Some(field_text(field).await?),
            "address" => address = Some(field_text(field).await?),
            "images" => {
                let filename = field.file_name().unwrap_or("upload.bin").to_string();
                let data = field.bytes().await.map_err(|err| {
                    AppError::BadRequest(format!("failed to read image field: {}", err))
                })?;
                if !data.is_empty() {
                    attachments.push((filename, data.to_vec()));
                }
            }
            _ => {}
        }
    }

    if attachments.len() > MAX_REPORT_IMAGES {
        return Err(AppError::Validation(format!(
            "at most {} images are allowed",
            MAX_REPORT_IMAGES
        )));
    }

    let latitude = parse_coordinate(lat, "lat")?;
    let longitude = parse_coordinate(lng, "lng")?;

    let category = category
        .as_deref()
        .map(ReportCategory::parse_or_other)
        .unwrap_or(ReportCategory::Other);
    let priority = match priority.as_deref().filter(|value| !value.is_empty()) {
        Some(value) => value
            .parse::<ReportPriority>()
            .map_err(AppError::Validation)?,
        None => ReportPriority::default(),
    };

    // Image persistence is best effort per file: a failed write drops that
    // attachment, it never blocks report creation.
    let mut images = Vec::new();
    for (filename, data) in attachments {
        match uploads::store(&state.env.uploads.dir, &filename, &data).await {
            Ok(url) => images.push(url),
            Err(err) => warn!(filename = %filename, "skipping failed image upload: {:#}", err),
        }
    }

    let input = NewReport {
        title: title.unwrap_or_default(),
        description: description.filter(|text| !text.trim().is_empty()),
        category,
        priority,
        location: Location {
            latitude,
            longitude,
            address: address.filter(|text| !text.trim().is_empty()),
        },
        images,
    };

    let report = lifecycle::open_report(input, actor.as_ref())?;
    ReportRepository::insert(&state.db, &report).await?;

    info!(report_id = %report.id, category = %report.category.as_str(), "report created");
    Ok(Json(report))
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|err| AppError::BadRequest(format!("failed to read form field: {}", err)))
}

fn parse_coordinate(value: Option<String>, name: &str) -> AppResult<f64> {
    value
        .ok_or_else(|| AppError::Validation(format!("{} is required", name)))?
        .parse::<f64>()
        .map_err(|_| AppError::Validation(format!("{} must be a number", name)))
}

#[derive(Debug, Deserialize)]
pub struct ListReportsQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub created_by: Option<Uuid>,
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

pub async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ListReportsQuery>,
) -> AppResult<Json<Vec<Report>>> {
    let filter = ReportFilter {
        status: parse_filter::<ReportStatus>(query.status)?,
        category: parse_filter::<ReportCategory>(query.category)?,
        priority: parse_filter::<ReportPriority>(query.priority)?,
        created_by: query.created_by,
        search: query.search.filter(|text| !text.trim().is_empty()),
    };

    let reports = ReportRepository::list(
        &state.db,
        &filter,
        query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        query.skip.unwrap_or(0),
    )
    .await?;

    Ok(Json(reports))
}

fn parse_filter<T>(value: Option<String>) -> AppResult<Option<T>>
where
    T: FromStr<Err = String>,
{
    value
        .filter(|raw| !raw.is_empty())
        .map(|raw| raw.parse::<T>().map_err(AppError::Validation))
        .transpose()
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<Report>> {
    let report = ReportRepository::find(&state.db, report_id)
        .await?
        .ok_or_else(|| AppError::NotFound("report not found".to_string()))?;

    Ok(Json(report))
}

pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(report_id): Path<Uuid>,
    Json(payload): Json<StatusUpdate>,
) -> AppResult<Json<Value>> {
    let new_status = payload
        .status
        .parse::<ReportStatus>()
        .map_err(AppError::Validation)?;

    let mut report = ReportRepository::find(&state.db, report_id)
        .await?
        .ok_or_else(|| AppError::NotFound("report not found".to_string()))?;

    let entry = lifecycle::apply_status(&mut report, &actor, new_status, payload.comment)?;
    ReportRepository::append_status(&state.db, report_id, new_status, &entry).await?;

    info!(report_id = %report_id, status = %new_status, "report status updated");
    Ok(Json(json!({ "message": "Status updated successfully" })))
}

pub async fn assign_report(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(report_id): Path<Uuid>,
    Json(payload): Json<AssignUpdate>,
) -> AppResult<Json<Value>> {
    let mut report = ReportRepository::find(&state.db, report_id)
        .await?
        .ok_or_else(|| AppError::NotFound("report not found".to_string()))?;

    let target = UserRepository::find_by_id(&state.db, payload.assigned_to_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    lifecycle::assign_technician(&mut report, &actor, &target)?;
    ReportRepository::set_assignee(&state.db, report_id, target.id, &target.name).await?;

    info!(report_id = %report_id, assigned_to = %target.id, "report assigned");
    Ok(Json(json!({ "message": "Report assigned successfully" })))
}

pub async fn add_comment(
    State(state): State<AppState>,
    MaybeAuthUser(actor): MaybeAuthUser,
    Path(report_id): Path<Uuid>,
    Json(payload): Json<NewComment>,
) -> AppResult<Json<ReportComment>> {
    payload
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let report = ReportRepository::find(&state.db, report_id)
        .await?
        .ok_or_else(|| AppError::NotFound("report not found".to_string()))?;

    let comment = lifecycle::record_comment(&report, actor.as_ref(), &payload.text)?;
    CommentRepository::insert(&state.db, &comment).await?;

    Ok(Json(comment))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<Vec<ReportComment>>> {
    let comments = CommentRepository::list_for_report(&state.db, report_id).await?;
    Ok(Json(comments))
}
