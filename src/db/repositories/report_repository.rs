use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::models::{Report, ReportStatus, TimelineEntry};
use crate::db::DatabaseError;
use crate::lifecycle::ReportFilter;

const REPORT_COLUMNS: &str = "id, title, description, category, priority, status, \
     latitude, longitude, address, images, created_by, created_by_name, \
     assigned_to, assigned_to_name, timeline, created_at, updated_at";

pub struct ReportRepository;

impl ReportRepository {
    pub async fn insert(pool: &PgPool, report: &Report) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO reports (id, title, description, category, priority, status,
                latitude, longitude, address, images, created_by, created_by_name,
                assigned_to, assigned_to_name, timeline, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(report.id)
        .bind(&report.title)
        .bind(&report.description)
        .bind(report.category)
        .bind(report.priority)
        .bind(report.status)
        .bind(report.location.latitude)
        .bind(report.location.longitude)
        .bind(&report.location.address)
        .bind(&report.images)
        .bind(report.created_by)
        .bind(&report.created_by_name)
        .bind(report.assigned_to)
        .bind(&report.assigned_to_name)
        .bind(&report.timeline)
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(())
    }

    pub async fn find(pool: &PgPool, report_id: Uuid) -> Result<Option<Report>, DatabaseError> {
        let report = sqlx::query_as::<_, Report>(&format!(
            "SELECT {} FROM reports WHERE id = $1",
            REPORT_COLUMNS
        ))
        .bind(report_id)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(report)
    }

    /// Newest first. SQL narrows on the indexed columns;
    /// `ReportFilter::matches` remains the authority on filter semantics
    /// (it also applies the text search), then pagination is applied.
    pub async fn list(
        pool: &PgPool,
        filter: &ReportFilter,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<Report>, DatabaseError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM reports WHERE 1 = 1",
            REPORT_COLUMNS
        ));
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category);
        }
        if let Some(priority) = filter.priority {
            query.push(" AND priority = ").push_bind(priority);
        }
        if let Some(created_by) = filter.created_by {
            query.push(" AND created_by = ").push_bind(created_by);
        }
        query.push(" ORDER BY created_at DESC");

        let reports = query
            .build_query_as::<Report>()
            .fetch_all(pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        Ok(reports
            .into_iter()
            .filter(|report| filter.matches(report))
            .skip(skip)
            .take(limit)
            .collect())
    }

    pub async fn all(pool: &PgPool) -> Result<Vec<Report>, DatabaseError> {
        let reports = sqlx::query_as::<_, Report>(&format!(
            "SELECT {} FROM reports ORDER BY created_at DESC",
            REPORT_COLUMNS
        ))
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(reports)
    }

    /// Move the report and append the audit entry in one statement, so
    /// concurrent updates interleave as two ordered entries instead of one
    /// overwriting the other.
    pub async fn append_status(
        pool: &PgPool,
        report_id: Uuid,
        status: ReportStatus,
        entry: &TimelineEntry,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET status = $2, timeline = timeline || $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(report_id)
        .bind(status)
        .bind(Json(entry))
        .bind(entry.timestamp)
        .execute(pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }

    pub async fn set_assignee(
        pool: &PgPool,
        report_id: Uuid,
        assignee_id: Uuid,
        assignee_name: &str,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET assigned_to = $2, assigned_to_name = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(report_id)
        .bind(assignee_id)
        .bind(assignee_name)
        .execute(pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }
        Ok(())
    }
}
