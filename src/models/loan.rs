//! Loan model and the read-time lifecycle evaluation
//!
//! A loan's persisted `status` is only a snapshot: it is written as BORROWED
//! on checkout, RETURNED on return, and refreshed when a reminder is sent.
//! Every read path replaces it with [`Loan::effective_status`], which derives
//! the status from the stored dates and the current time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

/// Loan status, either persisted or derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Borrowed,
    Overdue,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Borrowed => "BORROWED",
            LoanStatus::Overdue => "OVERDUE",
            LoanStatus::Returned => "RETURNED",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BORROWED" => Ok(LoanStatus::Borrowed),
            "OVERDUE" => Ok(LoanStatus::Overdue),
            "RETURNED" => Ok(LoanStatus::Returned),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

text_enum_sqlx!(LoanStatus);

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub copy_id: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub reminder_count: i32,
    pub last_reminder_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// A freshly checked-out loan on `copy_id`
    pub fn open(request: &NewLoan, copy_id: &str) -> Self {
        Self {
            id: super::ids::generate_id_at(request.borrow_date),
            user_id: request.user_id.clone(),
            book_id: request.book_id.clone(),
            copy_id: copy_id.to_string(),
            borrow_date: request.borrow_date,
            due_date: request.due_date,
            return_date: None,
            status: LoanStatus::Borrowed,
            reminder_count: 0,
            last_reminder_at: None,
        }
    }

    /// Status derived from the stored dates at `now`.
    ///
    /// A set `return_date` always wins; otherwise the loan is OVERDUE once
    /// `due_date` is strictly in the past.
    pub fn effective_status(&self, now: DateTime<Utc>) -> LoanStatus {
        if self.return_date.is_some() {
            LoanStatus::Returned
        } else if self.due_date < now {
            LoanStatus::Overdue
        } else {
            LoanStatus::Borrowed
        }
    }

    pub fn is_returned(&self) -> bool {
        self.return_date.is_some()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == LoanStatus::Overdue
    }

    /// Copy of this loan with `status` replaced by the effective status
    pub fn evaluated(mut self, now: DateTime<Utc>) -> Self {
        self.status = self.effective_status(now);
        self
    }
}

/// Checkout input handed to the loan store
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub user_id: String,
    pub book_id: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Loan as returned by the API: effective status plus display fields
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanView {
    #[serde(flatten)]
    pub loan: Loan,
    pub is_overdue: bool,
    pub book_title: Option<String>,
}

impl LoanView {
    pub fn new(loan: Loan, book_title: Option<String>, now: DateTime<Utc>) -> Self {
        let loan = loan.evaluated(now);
        Self {
            is_overdue: loan.status == LoanStatus::Overdue,
            loan,
            book_title,
        }
    }
}

/// Create loan request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLoan {
    pub book_id: String,
    /// Borrower; defaults to the caller. Only administrators may set another user.
    pub user_id: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`; defaults to the configured loan duration
    #[serde(default, deserialize_with = "super::deserialize_optional_datetime")]
    pub due_date: Option<DateTime<Utc>>,
}

/// Loan list filters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LoanQuery {
    /// Filter on effective status
    pub status: Option<LoanStatus>,
    /// Restrict to one borrower (administrators only)
    pub user_id: Option<String>,
}
