//! Dashboard counters

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Dashboard counters. Loan counters are global for administrators and
/// restricted to the caller's own loans otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub books: i64,
    pub copies: i64,
    pub available_copies: i64,
    pub users: i64,
    /// Unreturned loans
    pub active_loans: i64,
    /// Unreturned loans whose due date has passed at request time
    pub overdue_loans: i64,
    pub unread_notifications: i64,
}
