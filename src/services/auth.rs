//! Authentication service: registration, login and password-reset requests

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::Validate;

use super::notifications::NotificationsService;
use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        notification::Notification,
        user::{normalize_email, RegisterUser, Role, User, UserClaims},
    },
    repository::Repository,
};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
    notifications: NotificationsService,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig, notifications: NotificationsService) -> Self {
        Self {
            repository,
            config,
            notifications,
        }
    }

    /// Create a USER account and sign it in
    pub async fn register(&self, request: RegisterUser) -> AppResult<(String, User)> {
        request.validate()?;

        let user = User::new(
            &request.name,
            &request.email,
            Role::User,
            hash_password(&request.password)?,
        );
        self.repository.users.create(&user).await?;
        tracing::info!(user_id = %user.id, "User registered");

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    /// Authenticate by email and password and return a JWT token
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let invalid = || AppError::Authentication("Invalid email or password".to_string());

        let user = self
            .repository
            .users
            .get_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&user.password_hash, password)? {
            return Err(invalid());
        }

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    /// The account behind a token; fails once the account has been deleted
    pub async fn me(&self, user_id: &str) -> AppResult<User> {
        self.repository
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    /// Record a password-reset request for every administrator.
    /// Unknown emails are silently ignored so callers cannot probe accounts.
    pub async fn forgot_password(&self, email: &str) -> AppResult<()> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(());
        }

        let Some(user) = self.repository.users.get_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let admins = self.repository.users.list_admins().await?;
        for admin in &admins {
            self.notifications
                .emit(Notification::password_reset_request(&admin.id, &user.email))
                .await;
        }
        tracing::info!(user_id = %user.id, admins = admins.len(), "Password reset requested");
        Ok(())
    }

    fn create_token(&self, user: &User) -> AppResult<String> {
        UserClaims::for_user(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}
