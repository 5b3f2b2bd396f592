//! In-app notifications
//!
//! Notifications are append-only; the only mutation is flipping `is_read`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    LoanCreated,
    LoanReturned,
    OverdueReminder,
    PasswordResetRequest,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::LoanCreated => "LOAN_CREATED",
            NotificationType::LoanReturned => "LOAN_RETURNED",
            NotificationType::OverdueReminder => "OVERDUE_REMINDER",
            NotificationType::PasswordResetRequest => "PASSWORD_RESET_REQUEST",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOAN_CREATED" => Ok(NotificationType::LoanCreated),
            "LOAN_RETURNED" => Ok(NotificationType::LoanReturned),
            "OVERDUE_REMINDER" => Ok(NotificationType::OverdueReminder),
            "PASSWORD_RESET_REQUEST" => Ok(NotificationType::PasswordResetRequest),
            _ => Err(format!("Invalid notification type: {}", s)),
        }
    }
}

text_enum_sqlx!(NotificationType);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: NotificationType,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: &str, kind: NotificationType, message: String) -> Self {
        let now = Utc::now();
        Self {
            id: super::ids::generate_id_at(now),
            user_id: user_id.to_string(),
            kind,
            message,
            is_read: false,
            created_at: now,
        }
    }

    pub fn loan_created(user_id: &str, book_title: &str, due_date: DateTime<Utc>) -> Self {
        Self::new(
            user_id,
            NotificationType::LoanCreated,
            format!(
                "You borrowed \"{}\". Please return it by {}.",
                book_title,
                due_date.format("%Y-%m-%d")
            ),
        )
    }

    pub fn loan_returned(user_id: &str, book_title: &str) -> Self {
        Self::new(
            user_id,
            NotificationType::LoanReturned,
            format!("Thank you for returning \"{}\".", book_title),
        )
    }

    pub fn reminder(user_id: &str, book_title: &str, due_date: DateTime<Utc>, overdue: bool) -> Self {
        let message = if overdue {
            format!(
                "\"{}\" was due on {} and is now overdue. Please return it as soon as possible.",
                book_title,
                due_date.format("%Y-%m-%d")
            )
        } else {
            format!(
                "Reminder: \"{}\" is due on {}.",
                book_title,
                due_date.format("%Y-%m-%d")
            )
        };
        Self::new(user_id, NotificationType::OverdueReminder, message)
    }

    /// Addressed to an administrator; the message embeds the requester's email,
    /// which the user-deletion cascade matches on.
    pub fn password_reset_request(admin_id: &str, email: &str) -> Self {
        Self::new(
            admin_id,
            NotificationType::PasswordResetRequest,
            format!("Password reset requested for {}", email),
        )
    }

    /// Whether this is a password-reset request mentioning `email`
    pub fn is_reset_request_for(&self, email: &str) -> bool {
        !email.is_empty()
            && self.kind == NotificationType::PasswordResetRequest
            && self.message.contains(email)
    }
}

/// Unread counter response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread: i64,
}
