//! Loan management service
//!
//! Every loan leaving this service goes through [`LoanView::new`], so callers
//! always see the status derived from the dates, never the stored snapshot.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use super::notifications::NotificationsService;
use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        loan::{CreateLoan, Loan, LoanQuery, LoanView, NewLoan},
        notification::Notification,
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LoansConfig,
    notifications: NotificationsService,
}

impl LoansService {
    pub fn new(repository: Repository, config: LoansConfig, notifications: NotificationsService) -> Self {
        Self {
            repository,
            config,
            notifications,
        }
    }

    /// Loans visible to the caller: everything (optionally one user's) for
    /// administrators, only their own for everybody else
    pub async fn list_loans(&self, claims: &UserClaims, query: &LoanQuery) -> AppResult<Vec<LoanView>> {
        let loans = match (&query.user_id, claims.is_admin()) {
            (Some(user_id), _) => {
                claims.require_self_or_admin(user_id)?;
                self.repository.loans.list_for_user(user_id).await?
            }
            (None, true) => self.repository.loans.list_all().await?,
            (None, false) => self.repository.loans.list_for_user(&claims.user_id).await?,
        };

        let views = self.views(loans, Utc::now()).await?;
        Ok(match query.status {
            Some(status) => views.into_iter().filter(|v| v.loan.status == status).collect(),
            None => views,
        })
    }

    /// Get a loan by ID (administrators or the borrower)
    pub async fn get_loan(&self, claims: &UserClaims, id: &str) -> AppResult<LoanView> {
        let loan = self.find_loan(id).await?;
        claims.require_self_or_admin(&loan.user_id)?;

        let title = self.title_of(&loan.book_id).await?;
        Ok(LoanView::new(loan, title, Utc::now()))
    }

    /// Get loans for a user
    pub async fn get_user_loans(&self, claims: &UserClaims, user_id: &str) -> AppResult<Vec<LoanView>> {
        claims.require_self_or_admin(user_id)?;
        if self.repository.users.get(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        let loans = self.repository.loans.list_for_user(user_id).await?;
        self.views(loans, Utc::now()).await
    }

    /// Create a new loan (borrow a copy of a book)
    pub async fn create_loan(&self, claims: &UserClaims, request: CreateLoan) -> AppResult<LoanView> {
        let user_id = request.user_id.unwrap_or_else(|| claims.user_id.clone());
        if user_id != claims.user_id && !claims.is_admin() {
            return Err(AppError::Authorization(
                "You can only borrow books for yourself".to_string(),
            ));
        }

        if self.repository.users.get(&user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        let book = self
            .repository
            .books
            .get(&request.book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", request.book_id)))?;

        let now = Utc::now();
        let due_date = request
            .due_date
            .unwrap_or_else(|| now + Duration::days(self.config.default_duration_days));
        if due_date <= now {
            return Err(AppError::BadRequest("Due date must be in the future".to_string()));
        }

        let loan = self
            .repository
            .loans
            .checkout(&NewLoan {
                user_id,
                book_id: book.id.clone(),
                borrow_date: now,
                due_date,
            })
            .await?
            .ok_or_else(|| AppError::BusinessRule("No copies available".to_string()))?;

        tracing::info!(
            loan_id = %loan.id,
            user_id = %loan.user_id,
            copy_id = %loan.copy_id,
            due_date = %loan.due_date,
            "Loan created"
        );

        self.notifications
            .emit(Notification::loan_created(&loan.user_id, &book.title, loan.due_date))
            .await;

        Ok(LoanView::new(loan, Some(book.title), now))
    }

    /// Return a borrowed copy (administrators or the borrower)
    pub async fn return_loan(&self, claims: &UserClaims, id: &str) -> AppResult<LoanView> {
        let loan = self.find_loan(id).await?;
        claims.require_self_or_admin(&loan.user_id)?;
        if loan.is_returned() {
            return Err(AppError::BusinessRule("Loan already returned".to_string()));
        }

        let now = Utc::now();
        let loan = self
            .repository
            .loans
            .return_loan(id, now)
            .await?
            .ok_or_else(|| AppError::BusinessRule("Loan already returned".to_string()))?;

        tracing::info!(loan_id = %loan.id, copy_id = %loan.copy_id, "Loan returned");

        let title = self.title_of(&loan.book_id).await?;
        self.notifications
            .emit(Notification::loan_returned(
                &loan.user_id,
                title.as_deref().unwrap_or("your book"),
            ))
            .await;

        Ok(LoanView::new(loan, title, now))
    }

    /// Send a due-date reminder for an open loan and refresh its stored status
    pub async fn send_reminder(&self, claims: &UserClaims, id: &str) -> AppResult<LoanView> {
        claims.require_admin()?;

        let loan = self.find_loan(id).await?;
        if loan.is_returned() {
            return Err(AppError::BusinessRule("Loan already returned".to_string()));
        }

        let now = Utc::now();
        let loan = self
            .repository
            .loans
            .record_reminder(id, loan.effective_status(now), now)
            .await?
            .ok_or_else(|| AppError::BusinessRule("Loan already returned".to_string()))?;

        tracing::info!(
            loan_id = %loan.id,
            reminder_count = loan.reminder_count,
            status = %loan.status,
            "Reminder sent"
        );

        let title = self.title_of(&loan.book_id).await?;
        self.notifications
            .emit(Notification::reminder(
                &loan.user_id,
                title.as_deref().unwrap_or("your book"),
                loan.due_date,
                loan.is_overdue(now),
            ))
            .await;

        Ok(LoanView::new(loan, title, now))
    }

    async fn find_loan(&self, id: &str) -> AppResult<Loan> {
        self.repository
            .loans
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", id)))
    }

    async fn title_of(&self, book_id: &str) -> AppResult<Option<String>> {
        Ok(self.repository.books.get(book_id).await?.map(|b| b.title))
    }

    async fn views(&self, loans: Vec<Loan>, now: DateTime<Utc>) -> AppResult<Vec<LoanView>> {
        let book_ids: Vec<String> = loans
            .iter()
            .map(|l| l.book_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let titles: HashMap<String, String> = if book_ids.is_empty() {
            HashMap::new()
        } else {
            self.repository.books.titles(&book_ids).await?
        };

        Ok(loans
            .into_iter()
            .map(|loan| {
                let title = titles.get(&loan.book_id).cloned();
                LoanView::new(loan, title, now)
            })
            .collect())
    }
}
