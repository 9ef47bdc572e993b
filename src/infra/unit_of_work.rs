//! Unit of Work pattern implementation.
//!
//! The Unit of Work:
//! - Centralizes access to all repositories
//! - Manages database transactions (begin, commit, rollback)
//! - Ensures consistency across multiple repository operations
//!
//! Refresh-token rotation is the one multi-step write in this system:
//! revoking the presented token and inserting its replacement must land
//! together or not at all.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, AccessMode, ActiveModelTrait, ColumnTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, IsolationLevel, QueryFilter, TransactionTrait,
};
use std::sync::Arc;

use super::repositories::{
    refresh_token_active_model, RefreshTokenRepository, RefreshTokenStore, UserRepository,
    UserStore,
};
use crate::domain::RefreshToken;
use crate::errors::{AppError, AppResult};

/// Unit of Work trait for dependency injection.
///
/// Provides centralized access to all repositories and transaction management.
/// Note: This trait is not mockable directly due to generic methods.
/// For testing, mock at the repository level or use integration tests.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Get user repository
    fn users(&self) -> Arc<dyn UserRepository>;

    /// Get refresh token repository
    fn refresh_tokens(&self) -> Arc<dyn RefreshTokenRepository>;

    /// Execute a closure within a transaction.
    ///
    /// The transaction is automatically committed on success or rolled back
    /// on error. Uses ReadCommitted isolation level.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send;
}

/// Transaction context providing repository access within a transaction.
///
/// All repository operations performed through this context are part
/// of the same database transaction. The context borrows the transaction
/// to ensure proper lifetime management.
pub struct TransactionContext<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TransactionContext<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Get refresh token repository for this transaction
    pub fn refresh_tokens(&self) -> TxRefreshTokenRepository<'_> {
        TxRefreshTokenRepository::new(self.txn)
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: Arc<DatabaseConnection>,
    user_repo: Arc<UserStore>,
    refresh_token_repo: Arc<RefreshTokenStore>,
}

impl Persistence {
    /// Create new UnitOfWork instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        let user_repo = Arc::new(UserStore::new(db.clone()));
        let refresh_token_repo = Arc::new(RefreshTokenStore::new(db.clone()));
        Self {
            db,
            user_repo,
            refresh_token_repo,
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
    fn users(&self) -> Arc<dyn UserRepository> {
        self.user_repo.clone()
    }

    fn refresh_tokens(&self) -> Arc<dyn RefreshTokenRepository> {
        self.refresh_token_repo.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(
                Some(IsolationLevel::ReadCommitted),
                Some(AccessMode::ReadWrite),
            )
            .await
            .map_err(AppError::from)?;

        let ctx = TransactionContext::new(&txn);

        match f(ctx).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// Transaction-aware refresh token repository.
///
/// Executes all operations within the provided transaction.
/// Uses borrowed reference to ensure transaction outlives repository operations.
pub struct TxRefreshTokenRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxRefreshTokenRepository<'a> {
    fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Flip `revoked_at` if, and only if, the token is still live.
    ///
    /// The `revoked_at IS NULL` guard makes revocation first-wins: when
    /// two callers replay the same token, only one sees a row change.
    /// Returns whether this caller was the one that revoked it.
    pub async fn revoke_if_active(&self, id: uuid::Uuid) -> AppResult<bool> {
        use super::repositories::entities::refresh_token::{self, Entity as RefreshTokenEntity};

        let result = RefreshTokenEntity::update_many()
            .col_expr(
                refresh_token::Column::RevokedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(refresh_token::Column::Id.eq(id))
            .filter(refresh_token::Column::RevokedAt.is_null())
            .exec(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(result.rows_affected > 0)
    }

    /// Persist a newly issued token within the transaction
    pub async fn insert(&self, token: RefreshToken) -> AppResult<RefreshToken> {
        let model = refresh_token_active_model(token)
            .insert(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(RefreshToken::from(model))
    }
}
