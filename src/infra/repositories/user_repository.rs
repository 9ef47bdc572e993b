//! User repository - persistence operations for user accounts.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use crate::domain::User;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by email address
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Create a new unconfirmed user
    async fn create(&self, email: String, password_hash: String) -> AppResult<User>;

    /// Store the digest of a freshly issued email-confirmation code
    async fn store_confirmation_token(&self, id: Uuid, token_hash: String) -> AppResult<User>;

    /// Mark the email confirmed and clear the outstanding code
    async fn confirm_email(&self, id: Uuid) -> AppResult<User>;
}

/// SeaORM-backed user repository.
pub struct UserStore {
    db: Arc<DatabaseConnection>,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Load an active model or fail with NotFound
    async fn load(&self, id: Uuid) -> AppResult<user::Model> {
        UserEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(AppError::from)?
            .ok_or(AppError::NotFound)
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn create(&self, email: String, password_hash: String) -> AppResult<User> {
        let now = Utc::now();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(password_hash),
            security_stamp: Set(Uuid::new_v4().to_string()),
            concurrency_stamp: Set(Uuid::new_v4().to_string()),
            email_confirmed: Set(false),
            confirmation_token_hash: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model
            .insert(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(User::from(model))
    }

    async fn store_confirmation_token(&self, id: Uuid, token_hash: String) -> AppResult<User> {
        let mut active: ActiveModel = self.load(id).await?.into();

        active.confirmation_token_hash = Set(Some(token_hash));
        active.concurrency_stamp = Set(Uuid::new_v4().to_string());
        active.updated_at = Set(Utc::now());

        let model = active.update(&*self.db).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }

    async fn confirm_email(&self, id: Uuid) -> AppResult<User> {
        let mut active: ActiveModel = self.load(id).await?.into();

        active.email_confirmed = Set(true);
        active.confirmation_token_hash = Set(None);
        active.concurrency_stamp = Set(Uuid::new_v4().to_string());
        active.updated_at = Set(Utc::now());

        let model = active.update(&*self.db).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }
}
