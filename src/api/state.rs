//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{Database, Persistence};
use crate::services::{IdentityManager, IdentityService, LogMailer};

/// Application state containing all services (DI container).
#[derive(Clone)]
pub struct AppState {
    /// Identity service
    pub identity_service: Arc<dyn IdentityService>,
    /// Database connection
    pub database: Arc<Database>,
}

impl AppState {
    /// Create application state from a database connection and config.
    ///
    /// Wires the identity service to the Unit of Work and the
    /// development mailer.
    pub fn from_config(database: Arc<Database>, config: Config) -> Self {
        let uow = Arc::new(Persistence::new(database.get_connection()));
        let identity_service = Arc::new(IdentityManager::new(uow, Arc::new(LogMailer), config));

        Self {
            identity_service,
            database,
        }
    }

    /// Create application state with manually injected services.
    pub fn new(identity_service: Arc<dyn IdentityService>, database: Arc<Database>) -> Self {
        Self {
            identity_service,
            database,
        }
    }
}
