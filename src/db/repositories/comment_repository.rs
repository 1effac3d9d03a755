use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::ReportComment;
use crate::db::DatabaseError;

pub struct CommentRepository;

impl CommentRepository {
    pub async fn insert(pool: &PgPool, comment: &ReportComment) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO report_comments (id, report_id, user_id, user_name, text, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(comment.id)
        .bind(comment.report_id)
        .bind(comment.user_id)
        .bind(&comment.user_name)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(())
    }

    pub async fn list_for_report(
        pool: &PgPool,
        report_id: Uuid,
    ) -> Result<Vec<ReportComment>, DatabaseError> {
        let comments = sqlx::query_as::<_, ReportComment>(
            r#"
            SELECT id, report_id, user_id, user_name, text, created_at
            FROM report_comments
            WHERE report_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(report_id)
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(comments)
    }
}
