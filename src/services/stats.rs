//! Statistics service

use chrono::Utc;

use crate::{
    error::AppResult,
    models::{stats::DashboardStats, user::UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }

    /// Dashboard counters. Loan counters cover every open loan for
    /// administrators and the caller's own loans otherwise; overdue is
    /// evaluated at request time.
    pub async fn dashboard(&self, claims: &UserClaims) -> AppResult<DashboardStats> {
        let open_loans = if claims.is_admin() {
            self.repository.loans.list_open().await?
        } else {
            let mut loans = self.repository.loans.list_for_user(&claims.user_id).await?;
            loans.retain(|l| !l.is_returned());
            loans
        };

        let now = Utc::now();
        let copies = self.repository.copies.totals().await?;

        Ok(DashboardStats {
            books: self.repository.books.count().await?,
            copies: copies.total,
            available_copies: copies.available,
            users: self.repository.users.count().await?,
            active_loans: open_loans.len() as i64,
            overdue_loans: open_loans.iter().filter(|l| l.is_overdue(now)).count() as i64,
            unread_notifications: self.repository.notifications.unread_count(&claims.user_id).await?,
        })
    }
}
