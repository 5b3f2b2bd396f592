//! Repository layer: store traits and their PostgreSQL / in-memory backends
//!
//! Each collection has its own store trait. Operations that must not leave
//! partial state behind (checkout, return, user deletion, book deletion) are
//! single store calls, executed in one transaction (PostgreSQL) or under one
//! write lock (memory).

pub mod books;
pub mod copies;
pub mod loans;
pub mod memory;
pub mod notifications;
pub mod users;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery},
        copy::{BookCopy, CopyStatus},
        loan::{Loan, LoanStatus, NewLoan},
        notification::Notification,
        user::{DeletionSummary, User, UserChanges, UserQuery},
    },
};

/// Total and available copy counts of one book
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Availability {
    pub total: i64,
    pub available: i64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn create(&self, book: &Book, copies: &[BookCopy]) -> AppResult<()>;
    async fn get(&self, id: &str) -> AppResult<Option<Book>>;
    async fn search(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)>;
    async fn update(&self, book: &Book) -> AppResult<bool>;
    /// Delete a book and its copies. Fails with `Conflict` while a copy is BORROWED.
    async fn delete(&self, id: &str) -> AppResult<bool>;
    async fn count(&self) -> AppResult<i64>;
    async fn titles(&self, ids: &[String]) -> AppResult<HashMap<String, String>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CopyStore: Send + Sync {
    async fn create_many(&self, copies: &[BookCopy]) -> AppResult<()>;
    async fn get(&self, id: &str) -> AppResult<Option<BookCopy>>;
    async fn list_by_book(&self, book_id: &str) -> AppResult<Vec<BookCopy>>;
    /// Conditional update: only applies while the copy is in `expected`
    async fn set_status(&self, id: &str, expected: CopyStatus, status: CopyStatus) -> AppResult<bool>;
    /// Deletes the copy unless it is BORROWED
    async fn delete_unborrowed(&self, id: &str) -> AppResult<bool>;
    async fn availability(&self, book_ids: &[String]) -> AppResult<HashMap<String, Availability>>;
    async fn totals(&self) -> AppResult<Availability>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Atomically flip one AVAILABLE copy of the book to BORROWED and insert
    /// the loan. `None` when no copy is available and `NotFound` when the
    /// borrower no longer exists; nothing is written in either case.
    async fn checkout(&self, request: &NewLoan) -> AppResult<Option<Loan>>;
    async fn get(&self, id: &str) -> AppResult<Option<Loan>>;
    async fn list_all(&self) -> AppResult<Vec<Loan>>;
    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Loan>>;
    async fn list_open(&self) -> AppResult<Vec<Loan>>;
    /// Mark an open loan RETURNED and free its copy. `None` if the loan is
    /// missing or already returned.
    async fn return_loan(&self, id: &str, returned_at: DateTime<Utc>) -> AppResult<Option<Loan>>;
    /// Bump the reminder counter of an open loan and persist `status`
    async fn record_reminder(
        &self,
        id: &str,
        status: LoanStatus,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Loan>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is taken
    async fn create(&self, user: &User) -> AppResult<()>;
    async fn get(&self, id: &str) -> AppResult<Option<User>>;
    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn search(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)>;
    async fn list_admins(&self) -> AppResult<Vec<User>>;
    async fn update(&self, id: &str, changes: &UserChanges) -> AppResult<Option<User>>;
    async fn count(&self) -> AppResult<i64>;
    /// Free the user's borrowed copies, delete their loans, their
    /// notifications and the password-reset requests mentioning `email`,
    /// then the user.
    async fn delete_cascade(&self, id: &str, email: &str) -> AppResult<DeletionSummary>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: &Notification) -> AppResult<()>;
    /// Newest first
    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Notification>>;
    async fn unread_count(&self, user_id: &str) -> AppResult<i64>;
    /// `None` when the notification does not exist or belongs to someone else
    async fn mark_read(&self, id: &str, user_id: &str) -> AppResult<Option<Notification>>;
    async fn mark_all_read(&self, user_id: &str) -> AppResult<u64>;
}

/// Main repository struct holding one handle per store
#[derive(Clone)]
pub struct Repository {
    pub pool: Option<Pool<Postgres>>,
    pub books: Arc<dyn BookStore>,
    pub copies: Arc<dyn CopyStore>,
    pub loans: Arc<dyn LoanStore>,
    pub users: Arc<dyn UserStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            copies: Arc::new(copies::CopiesRepository::new(pool.clone())),
            loans: Arc::new(loans::LoansRepository::new(pool.clone())),
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            notifications: Arc::new(notifications::NotificationsRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Repository backed by a fresh in-process store
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::new();
        Self {
            pool: None,
            books: Arc::new(store.clone()),
            copies: Arc::new(store.clone()),
            loans: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            notifications: Arc::new(store),
        }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}

/// Map a unique-constraint violation to `Conflict`, pass everything else through
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> crate::error::AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            crate::error::AppError::Conflict(message.to_string())
        }
        _ => crate::error::AppError::Database(err),
    }
}
