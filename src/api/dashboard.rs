//! Dashboard endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, models::stats::DashboardStats};

use super::AuthenticatedUser;

/// Get dashboard counters
#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardStats),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DashboardStats>> {
    let stats = state.services.stats.dashboard(&claims).await?;
    Ok(Json(stats))
}
