//! Loans repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use super::LoanStore;
use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanStatus, NewLoan},
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn checkout(&self, request: &NewLoan) -> AppResult<Option<Loan>> {
        let mut tx = self.pool.begin().await?;

        // Holds off a concurrent user deletion until this loan is committed.
        let borrower: Option<String> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR SHARE")
                .bind(&request.user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if borrower.is_none() {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("User {} not found", request.user_id)));
        }

        // Reserve the oldest available copy; rows locked by a concurrent
        // checkout are skipped rather than waited on.
        let copy_id: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE copies SET status = 'BORROWED'
            WHERE status = 'AVAILABLE' AND id = (
                SELECT id FROM copies
                WHERE book_id = $1 AND status = 'AVAILABLE'
                ORDER BY created_at, id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id
            "#,
        )
        .bind(&request.book_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(copy_id) = copy_id else {
            tx.rollback().await?;
            return Ok(None);
        };

        let loan = Loan::open(request, &copy_id);

        sqlx::query(
            r#"
            INSERT INTO loans (id, user_id, book_id, copy_id, borrow_date, due_date,
                               return_date, status, reminder_count, last_reminder_at)
            VALUES ($1, $2, $3, $4, $5, $6, NULL, $7, 0, NULL)
            "#,
        )
        .bind(&loan.id)
        .bind(&loan.user_id)
        .bind(&loan.book_id)
        .bind(&loan.copy_id)
        .bind(loan.borrow_date)
        .bind(loan.due_date)
        .bind(loan.status)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(loan))
    }

    async fn get(&self, id: &str) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    async fn list_all(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>("SELECT * FROM loans ORDER BY borrow_date DESC, id DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(loans)
    }

    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE user_id = $1 ORDER BY borrow_date DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn list_open(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE return_date IS NULL ORDER BY due_date, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    async fn return_loan(&self, id: &str, returned_at: DateTime<Utc>) -> AppResult<Option<Loan>> {
        let mut tx = self.pool.begin().await?;

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET return_date = $2, status = $3
            WHERE id = $1 AND return_date IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(returned_at)
        .bind(LoanStatus::Returned)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(ref loan) = loan {
            sqlx::query("UPDATE copies SET status = 'AVAILABLE' WHERE id = $1 AND status = 'BORROWED'")
                .bind(&loan.copy_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(loan)
    }

    async fn record_reminder(
        &self,
        id: &str,
        status: LoanStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET reminder_count = reminder_count + 1, last_reminder_at = $2, status = $3
            WHERE id = $1 AND return_date IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }
}
