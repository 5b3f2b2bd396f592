//! User management service

use validator::Validate;

use super::auth::hash_password;
use crate::{
    error::{AppError, AppResult},
    models::user::{
        normalize_email, CreateUser, DeletionSummary, Role, UpdateUser, User, UserChanges, UserQuery,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: &str) -> AppResult<User> {
        self.repository
            .users
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Search users
    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.search(query).await
    }

    /// Create a new user with any role
    pub async fn create_user(&self, request: CreateUser) -> AppResult<User> {
        request.validate()?;

        let user = User::new(
            &request.name,
            &request.email,
            request.role.unwrap_or(Role::User),
            hash_password(&request.password)?,
        );
        self.repository.users.create(&user).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Update an existing user
    pub async fn update_user(&self, id: &str, request: UpdateUser) -> AppResult<User> {
        request.validate()?;

        let changes = UserChanges {
            name: request.name.map(|n| n.trim().to_string()),
            email: request.email.as_deref().map(normalize_email),
            role: request.role,
            password_hash: request.password.as_deref().map(hash_password).transpose()?,
        };

        self.repository
            .users
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Delete a user with everything that references them
    pub async fn delete_user(&self, actor_id: &str, id: &str) -> AppResult<DeletionSummary> {
        if actor_id == id {
            return Err(AppError::BadRequest("You cannot delete your own account".to_string()));
        }

        let user = self.get_by_id(id).await?;
        let summary = self.repository.users.delete_cascade(&user.id, &user.email).await?;

        tracing::info!(
            user_id = %user.id,
            freed_copies = summary.freed_copies,
            deleted_loans = summary.deleted_loans,
            deleted_notifications = summary.deleted_notifications,
            "User deleted"
        );
        Ok(summary)
    }
}
