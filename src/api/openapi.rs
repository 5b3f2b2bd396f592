//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, dashboard, health, loans, notifications, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Biblio API",
        version = "1.0.0",
        description = "Library lending REST API: catalog, copies, loans and notifications"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        auth::forgot_password,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::list_copies,
        books::add_copies,
        books::update_copy,
        books::delete_copy,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        // Loans
        loans::list_loans,
        loans::get_loan,
        loans::get_user_loans,
        loans::create_loan,
        loans::return_loan,
        loans::send_reminder,
        // Notifications
        notifications::list_notifications,
        notifications::unread_count,
        notifications::mark_read,
        notifications::mark_all_read,
        // Dashboard
        dashboard::get_dashboard,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::AuthResponse,
            auth::ForgotPasswordRequest,
            auth::MessageResponse,
            // Books
            books::BookPage,
            crate::models::book::Book,
            crate::models::book::BookWithAvailability,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::copy::BookCopy,
            crate::models::copy::CopyStatus,
            crate::models::copy::CreateCopies,
            crate::models::copy::UpdateCopy,
            // Users
            books::UserPage,
            crate::models::user::User,
            crate::models::user::Role,
            crate::models::user::RegisterUser,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::user::DeletionSummary,
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanStatus,
            crate::models::loan::LoanView,
            crate::models::loan::CreateLoan,
            // Notifications
            crate::models::notification::Notification,
            crate::models::notification::NotificationType,
            crate::models::notification::UnreadCount,
            notifications::MarkedRead,
            // Dashboard
            crate::models::stats::DashboardStats,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Catalog and copy management"),
        (name = "users", description = "User management"),
        (name = "loans", description = "Loan lifecycle"),
        (name = "notifications", description = "In-app notifications"),
        (name = "dashboard", description = "Dashboard counters")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
