//! In-app notification service

use crate::{
    error::{AppError, AppResult},
    models::notification::Notification,
    repository::Repository,
};

#[derive(Clone)]
pub struct NotificationsService {
    repository: Repository,
}

impl NotificationsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Notifications addressed to `user_id`, newest first
    pub async fn list(&self, user_id: &str) -> AppResult<Vec<Notification>> {
        self.repository.notifications.list_for_user(user_id).await
    }

    pub async fn unread_count(&self, user_id: &str) -> AppResult<i64> {
        self.repository.notifications.unread_count(user_id).await
    }

    /// Mark one of the caller's notifications as read
    pub async fn mark_read(&self, id: &str, user_id: &str) -> AppResult<Notification> {
        self.repository
            .notifications
            .mark_read(id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {} not found", id)))
    }

    pub async fn mark_all_read(&self, user_id: &str) -> AppResult<u64> {
        self.repository.notifications.mark_all_read(user_id).await
    }

    /// Append a notification. Failures are logged and swallowed: the state
    /// change that triggered the notification is already committed.
    pub async fn emit(&self, notification: Notification) {
        if let Err(e) = self.repository.notifications.insert(&notification).await {
            tracing::warn!(
                user_id = %notification.user_id,
                kind = notification.kind.as_str(),
                error = %e,
                "Failed to store notification"
            );
        }
    }
}
