//! Notification endpoints, always scoped to the caller

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::notification::{Notification, UnreadCount},
};

use super::AuthenticatedUser;

#[derive(Serialize, ToSchema)]
pub struct MarkedRead {
    /// Number of notifications flipped to read
    pub updated: u64,
}

/// List the caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Notifications", body = Vec<Notification>)
    )
)]
pub async fn list_notifications(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state.services.notifications.list(&claims.user_id).await?;
    Ok(Json(notifications))
}

#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Unread counter", body = UnreadCount)
    )
)]
pub async fn unread_count(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UnreadCount>> {
    let unread = state.services.notifications.unread_count(&claims.user_id).await?;
    Ok(Json(UnreadCount { unread }))
}

/// Mark one notification as read
#[utoipa::path(
    patch,
    path = "/notifications/{id}/read",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification updated", body = Notification),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_read(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Notification>> {
    let notification = state.services.notifications.mark_read(&id, &claims.user_id).await?;
    Ok(Json(notification))
}

#[utoipa::path(
    patch,
    path = "/notifications/read-all",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All notifications marked read", body = MarkedRead)
    )
)]
pub async fn mark_all_read(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<MarkedRead>> {
    let updated = state.services.notifications.mark_all_read(&claims.user_id).await?;
    Ok(Json(MarkedRead { updated }))
}
