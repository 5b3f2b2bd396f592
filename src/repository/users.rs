//! Users repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{conflict_on_unique, UserStore};
use crate::{
    error::AppResult,
    models::user::{DeletionSummary, User, UserChanges, UserQuery},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UsersRepository {
    async fn create(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Email already registered"))?;
        Ok(())
    }

    /// Get user by ID
    async fn get(&self, id: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Search users with pagination
    async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        let pattern = query
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q.to_lowercase()));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE $1::text IS NULL OR LOWER(name) LIKE $1 OR LOWER(email) LIKE $1
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE $1::text IS NULL OR LOWER(name) LIKE $1 OR LOWER(email) LIKE $1
            ORDER BY LOWER(name), id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(query.per_page())
        .bind(query.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((users, total))
    }

    async fn list_admins(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = 'ADMIN' ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn update(&self, id: &str, changes: &UserChanges) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                password_hash = COALESCE($5, password_hash)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(changes.role)
        .bind(&changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Email already registered"))?;
        Ok(user)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn delete_cascade(&self, id: &str, email: &str) -> AppResult<DeletionSummary> {
        let mut tx = self.pool.begin().await?;

        // Waits for in-flight checkouts of this user, and blocks new ones.
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let freed = sqlx::query(
            r#"
            UPDATE copies SET status = 'AVAILABLE'
            WHERE status = 'BORROWED' AND id IN (
                SELECT copy_id FROM loans WHERE user_id = $1 AND return_date IS NULL
            )
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let loans = sqlx::query("DELETE FROM loans WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let own = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let mut reset_requests = 0;
        if !email.is_empty() {
            reset_requests = sqlx::query(
                r#"
                DELETE FROM notifications
                WHERE type = 'PASSWORD_RESET_REQUEST' AND STRPOS(message, $1) > 0
                "#,
            )
            .bind(email)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(DeletionSummary {
            freed_copies: freed.rows_affected(),
            deleted_loans: loans.rows_affected(),
            deleted_notifications: own.rows_affected() + reset_requests,
        })
    }
}
