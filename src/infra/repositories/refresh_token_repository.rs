//! Refresh token repository - persistence operations for refresh tokens.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use super::entities::refresh_token::{self, ActiveModel, Entity as RefreshTokenEntity};
use crate::domain::RefreshToken;
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Refresh token repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Persist a newly issued refresh token
    async fn insert(&self, token: RefreshToken) -> AppResult<RefreshToken>;

    /// Look up a token by the digest of its presented value
    async fn find_by_hash(&self, token_hash: &str) -> AppResult<Option<RefreshToken>>;

    /// Revoke every active token belonging to a user; returns count revoked
    async fn revoke_all_for_user(&self, user_id: Uuid) -> AppResult<u64>;
}

/// Build the active model for an insert (shared with the transactional path)
pub(crate) fn to_active_model(token: RefreshToken) -> ActiveModel {
    ActiveModel {
        id: Set(token.id),
        user_id: Set(token.user_id),
        token_hash: Set(token.token_hash),
        security_stamp: Set(token.security_stamp),
        expires_at: Set(token.expires_at),
        created_at: Set(token.created_at),
        revoked_at: Set(token.revoked_at),
    }
}

/// SeaORM-backed refresh token repository.
pub struct RefreshTokenStore {
    db: Arc<DatabaseConnection>,
}

impl RefreshTokenStore {
    /// Create new repository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RefreshTokenRepository for RefreshTokenStore {
    async fn insert(&self, token: RefreshToken) -> AppResult<RefreshToken> {
        let model = to_active_model(token)
            .insert(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(RefreshToken::from(model))
    }

    async fn find_by_hash(&self, token_hash: &str) -> AppResult<Option<RefreshToken>> {
        let result = RefreshTokenEntity::find()
            .filter(refresh_token::Column::TokenHash.eq(token_hash))
            .one(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(RefreshToken::from))
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        use sea_orm::sea_query::Expr;

        let result = RefreshTokenEntity::update_many()
            .col_expr(
                refresh_token::Column::RevokedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(refresh_token::Column::UserId.eq(user_id))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .exec(&*self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected)
    }
}

pub(crate) use to_active_model as refresh_token_active_model;
