//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::loan::{CreateLoan, LoanQuery, LoanView},
};

use super::AuthenticatedUser;

/// List loans visible to the caller
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "Loans with their effective status", body = Vec<LoanView>),
        (status = 403, description = "Filtering on another user")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<Vec<LoanView>>> {
    let loans = state.services.loans.list_loans(&claims, &query).await?;
    Ok(Json(loans))
}

/// Get a loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanView),
        (status = 403, description = "Not your loan"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<LoanView>> {
    let loan = state.services.loans.get_loan(&claims, &id).await?;
    Ok(Json(loan))
}

/// Get loans for a specific user
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User's loans", body = Vec<LoanView>),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<LoanView>>> {
    let loans = state.services.loans.get_user_loans(&claims, &user_id).await?;
    Ok(Json(loans))
}

/// Create a new loan (borrow a copy)
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanView),
        (status = 400, description = "No copies available or invalid due date"),
        (status = 403, description = "Borrowing for another user"),
        (status = 404, description = "User or book not found")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanView>)> {
    let loan = state.services.loans.create_loan(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed copy
#[utoipa::path(
    patch,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Copy returned", body = LoanView),
        (status = 400, description = "Loan already returned"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<LoanView>> {
    let loan = state.services.loans.return_loan(&claims, &id).await?;
    Ok(Json(loan))
}

/// Send a due-date reminder to the borrower
#[utoipa::path(
    post,
    path = "/loans/{id}/remind",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Reminder sent", body = LoanView),
        (status = 400, description = "Loan already returned"),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn send_reminder(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<LoanView>> {
    let loan = state.services.loans.send_reminder(&claims, &id).await?;
    Ok(Json(loan))
}
