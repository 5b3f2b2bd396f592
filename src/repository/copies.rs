//! Copies repository for database operations

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{Availability, CopyStore};
use crate::{
    error::AppResult,
    models::copy::{BookCopy, CopyStatus},
};

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CopyStore for CopiesRepository {
    async fn create_many(&self, copies: &[BookCopy]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        for copy in copies {
            sqlx::query("INSERT INTO copies (id, book_id, status, created_at) VALUES ($1, $2, $3, $4)")
                .bind(&copy.id)
                .bind(&copy.book_id)
                .bind(copy.status)
                .bind(copy.created_at)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> AppResult<Option<BookCopy>> {
        let copy = sqlx::query_as::<_, BookCopy>("SELECT * FROM copies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(copy)
    }

    async fn list_by_book(&self, book_id: &str) -> AppResult<Vec<BookCopy>> {
        let copies = sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM copies WHERE book_id = $1 ORDER BY created_at, id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(copies)
    }

    async fn set_status(&self, id: &str, expected: CopyStatus, status: CopyStatus) -> AppResult<bool> {
        let result = sqlx::query("UPDATE copies SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(expected)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_unborrowed(&self, id: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM copies WHERE id = $1 AND status <> 'BORROWED'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn availability(&self, book_ids: &[String]) -> AppResult<HashMap<String, Availability>> {
        if book_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT book_id,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'AVAILABLE') AS available
            FROM copies
            WHERE book_id = ANY($1)
            GROUP BY book_id
            "#,
        )
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(book_id, total, available)| (book_id, Availability { total, available }))
            .collect())
    }

    async fn totals(&self) -> AppResult<Availability> {
        let (total, available): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'AVAILABLE')
            FROM copies
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(Availability { total, available })
    }
}
