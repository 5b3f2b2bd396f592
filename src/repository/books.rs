//! Books repository for database operations

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::BookStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookQuery},
        copy::BookCopy,
    },
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    /// Insert a book together with its initial copies
    async fn create(&self, book: &Book, copies: &[BookCopy]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO books (id, title, author, isbn, published_year, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.published_year)
        .bind(&book.description)
        .bind(book.created_at)
        .execute(&mut *tx)
        .await?;

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

    async fn get(&self, id: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// Search books by title or author with pagination
    async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let pattern = query
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q.to_lowercase()));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM books
            WHERE $1::text IS NULL OR LOWER(title) LIKE $1 OR LOWER(author) LIKE $1
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE $1::text IS NULL OR LOWER(title) LIKE $1 OR LOWER(author) LIKE $1
            ORDER BY LOWER(title), id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(query.per_page())
        .bind(query.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    async fn update(&self, book: &Book) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, author = $3, isbn = $4, published_year = $5, description = $6
            WHERE id = $1
            "#,
        )
        .bind(&book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.published_year)
        .bind(&book.description)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Lock the book's copies so a concurrent checkout cannot slip in
        let borrowed: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM (
                SELECT status FROM copies WHERE book_id = $1 FOR UPDATE
            ) c
            WHERE c.status = 'BORROWED'
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if borrowed > 0 {
            return Err(AppError::Conflict(format!(
                "Book has {} borrowed copies",
                borrowed
            )));
        }

        sqlx::query("DELETE FROM copies WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn titles(&self, ids: &[String]) -> AppResult<HashMap<String, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, title FROM books WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().collect())
    }
}
