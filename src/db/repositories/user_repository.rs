use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::models::{User, UserRole};
use crate::db::DatabaseError;

pub struct UserRepository;

impl UserRepository {
    /// Insert a new user. A taken email surfaces as `Duplicate`.
    pub async fn insert(pool: &PgPool, user: &User) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, phone, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone)
        .bind(user.role)
        .bind(user.created_at)
        .execute(pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(())
    }

    pub async fn find_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, phone, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(user)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, phone, role, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email.to_lowercase())
        .fetch_optional(pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(user)
    }

    pub async fn list(pool: &PgPool, role: Option<UserRole>) -> Result<Vec<User>, DatabaseError> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT id, name, email, password_hash, phone, role, created_at FROM users",
        );
        if let Some(role) = role {
            query.push(" WHERE role = ").push_bind(role);
        }
        query.push(" ORDER BY created_at DESC");

        let users = query
            .build_query_as::<User>()
            .fetch_all(pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        Ok(users)
    }
}
