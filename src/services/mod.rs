//! Business logic services

pub mod auth;
pub mod catalog;
pub mod loans;
pub mod notifications;
pub mod stats;
pub mod users;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub notifications: notifications::NotificationsService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let notifications = notifications::NotificationsService::new(repository.clone());
        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone(), notifications.clone()),
            users: users::UsersService::new(repository.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), config.loans.clone(), notifications.clone()),
            stats: stats::StatsService::new(repository),
            notifications,
        }
    }
}
