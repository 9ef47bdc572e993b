//! Identity service - registration, login, token issuance and rotation.
//!
//! Owns the full credential lifecycle: user registration with email
//! confirmation, password login, bearer access tokens, and single-use
//! refresh tokens that rotate on every exchange.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{Config, IDENTITY_PATH_PREFIX, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER};
use crate::domain::{OpaqueToken, Password, RefreshToken, User};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;
use crate::services::{EmailMessage, Mailer};

/// JWT claims payload
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    /// Owner's security stamp at issuance
    pub stamp: String,
    pub exp: i64,
    pub iat: i64,
}

/// Token pair returned after successful authentication or refresh
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    /// JWT access token
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    /// Token type (always "Bearer")
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Access token expiration time in seconds
    #[schema(example = 3600)]
    pub expires_in: i64,
    /// Opaque refresh token; single-use, rotated on every refresh
    pub refresh_token: String,
}

/// Identity service trait for dependency injection.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Register a new user and dispatch a confirmation email
    async fn register(&self, email: String, password: String) -> AppResult<User>;

    /// Confirm a user's email address with the code they were sent
    async fn confirm_email(&self, user_id: Uuid, code: String) -> AppResult<()>;

    /// Reissue a confirmation email; silent for unknown or confirmed
    /// addresses to avoid account enumeration
    async fn resend_confirmation(&self, email: String) -> AppResult<()>;

    /// Login and return an access/refresh token pair
    async fn login(&self, email: String, password: String) -> AppResult<TokenPair>;

    /// Exchange a live refresh token for a new pair, revoking the old one
    async fn refresh(&self, refresh_token: String) -> AppResult<TokenPair>;

    /// Revoke every active refresh token belonging to the user
    async fn logout(&self, user_id: Uuid) -> AppResult<()>;

    /// Load the authenticated user's account
    async fn current_user(&self, user_id: Uuid) -> AppResult<User>;

    /// Verify an access token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;
}

/// Generate a signed access token for a user (shared helper)
fn generate_access_token(user: &User, config: &Config) -> AppResult<String> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.jwt_expiration_hours);

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        stamp: user.security_stamp.clone(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?)
}

/// Verify an access token and extract claims (shared helper)
fn verify_token_internal(token: &str, config: &Config) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

/// Concrete implementation of IdentityService using Unit of Work.
pub struct IdentityManager<U: UnitOfWork> {
    uow: Arc<U>,
    mailer: Arc<dyn Mailer>,
    config: Config,
}

impl<U: UnitOfWork> IdentityManager<U> {
    /// Create new identity service instance
    pub fn new(uow: Arc<U>, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        Self { uow, mailer, config }
    }

    /// Issue a confirmation code, persist its digest, and mail it out
    async fn issue_confirmation(&self, user: &User) -> AppResult<()> {
        let code = OpaqueToken::generate();
        self.uow
            .users()
            .store_confirmation_token(user.id, code.hash().to_string())
            .await?;

        let link = format!(
            "{}/confirmEmail?userId={}&code={}",
            IDENTITY_PATH_PREFIX,
            user.id,
            code.plain()
        );
        let message = EmailMessage::new(
            user.email.clone(),
            "Confirm your email",
            format!("Confirm your account by opening: {}", link),
        );
        self.mailer.send(message).await?;

        tracing::info!(user_id = %user.id, "Confirmation email dispatched");
        Ok(())
    }

    /// Mint an access token and a fresh, persisted refresh token
    async fn issue_token_pair(&self, user: &User) -> AppResult<TokenPair> {
        let access_token = generate_access_token(user, &self.config)?;

        let refresh = OpaqueToken::generate();
        let record = RefreshToken::new(
            user.id,
            refresh.hash().to_string(),
            user.security_stamp.clone(),
            self.config.refresh_token_ttl_days,
        );
        self.uow.refresh_tokens().insert(record).await?;

        Ok(TokenPair {
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.config.jwt_expiration_hours * SECONDS_PER_HOUR,
            refresh_token: refresh.plain().to_string(),
        })
    }
}

#[async_trait]
impl<U: UnitOfWork> IdentityService for IdentityManager<U> {
    async fn register(&self, email: String, password: String) -> AppResult<User> {
        // Email format is validated by the handler's ValidatedJson extractor
        if self.uow.users().find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("User"));
        }

        let password_hash = Password::new(&password)?.into_string();
        let user = self.uow.users().create(email, password_hash).await?;

        self.issue_confirmation(&user).await?;
        Ok(user)
    }

    async fn confirm_email(&self, user_id: Uuid, code: String) -> AppResult<()> {
        let user = self
            .uow
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::BadRequest("Invalid confirmation code".into()))?;

        if user.email_confirmed {
            return Ok(());
        }

        let stored = user
            .confirmation_token_hash
            .as_deref()
            .ok_or(AppError::BadRequest("Invalid confirmation code".into()))?;

        if stored != OpaqueToken::digest(&code) {
            return Err(AppError::BadRequest("Invalid confirmation code".into()));
        }

        self.uow.users().confirm_email(user_id).await?;
        tracing::info!(user_id = %user_id, "Email confirmed");
        Ok(())
    }

    async fn resend_confirmation(&self, email: String) -> AppResult<()> {
        // Respond identically whether or not the address exists
        match self.uow.users().find_by_email(&email).await? {
            Some(user) if !user.email_confirmed => self.issue_confirmation(&user).await,
            _ => Ok(()),
        }
    }

    async fn login(&self, email: String, password: String) -> AppResult<TokenPair> {
        let user_result = self.uow.users().find_by_email(&email).await?;

        // Perform password verification even if the user doesn't exist to
        // prevent timing attacks that could enumerate valid emails. The
        // dummy hash always fails verification.
        let dummy_hash = "$argon2id$v=19$m=19456,t=2,p=1$dummysalt123456$dummyhash1234567890123456789012";

        let (password_hash, user_exists) = match &user_result {
            Some(user) => (user.password_hash.as_str(), true),
            None => (dummy_hash, false),
        };

        let stored_password = Password::from_hash(password_hash.to_string());
        let password_valid = stored_password.verify(&password);

        if !user_exists || !password_valid {
            return Err(AppError::InvalidCredentials);
        }

        // Safe to unwrap since we verified user_exists is true
        let user = user_result.as_ref().unwrap();

        if !user.can_login(self.config.require_confirmed_email) {
            return Err(AppError::EmailNotConfirmed);
        }

        self.issue_token_pair(user).await
    }

    async fn refresh(&self, refresh_token: String) -> AppResult<TokenPair> {
        let presented_hash = OpaqueToken::digest(&refresh_token);

        let old = self
            .uow
            .refresh_tokens()
            .find_by_hash(&presented_hash)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let user = self
            .uow
            .users()
            .find_by_id(old.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !old.is_active_for(&user.security_stamp, Utc::now()) {
            return Err(AppError::Unauthorized);
        }

        let access_token = generate_access_token(&user, &self.config)?;

        let replacement = OpaqueToken::generate();
        let record = RefreshToken::new(
            user.id,
            replacement.hash().to_string(),
            user.security_stamp.clone(),
            self.config.refresh_token_ttl_days,
        );

        // Rotation: the revoke and the replacement insert must land
        // together. The revoke is conditional on the token still being
        // live, so concurrent replays of the same token race for one
        // revocation and every loser is turned away empty-handed.
        let old_id = old.id;
        self.uow
            .transaction(move |ctx| {
                Box::pin(async move {
                    if !ctx.refresh_tokens().revoke_if_active(old_id).await? {
                        return Err(AppError::Unauthorized);
                    }
                    ctx.refresh_tokens().insert(record).await
                })
            })
            .await?;

        Ok(TokenPair {
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.config.jwt_expiration_hours * SECONDS_PER_HOUR,
            refresh_token: replacement.plain().to_string(),
        })
    }

    async fn logout(&self, user_id: Uuid) -> AppResult<()> {
        let revoked = self.uow.refresh_tokens().revoke_all_for_user(user_id).await?;
        tracing::info!(user_id = %user_id, revoked = revoked, "Refresh tokens revoked");
        Ok(())
    }

    async fn current_user(&self, user_id: Uuid) -> AppResult<User> {
        self.uow
            .users()
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        verify_token_internal(token, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::*;
    use crate::errors::AppError;
    use crate::infra::repositories::entities::{refresh_token, user as user_entity};
    use crate::infra::{
        MockRefreshTokenRepository, MockUserRepository, Persistence, RefreshTokenRepository,
        TransactionContext, UserRepository,
    };
    use crate::services::LogMailer;

    /// Unit-of-work over mock repositories; transactions are not
    /// exercised by the paths these tests cover.
    struct MockUow {
        users: Arc<MockUserRepository>,
        tokens: Arc<MockRefreshTokenRepository>,
    }

    #[async_trait]
    impl UnitOfWork for MockUow {
        fn users(&self) -> Arc<dyn UserRepository> {
            self.users.clone()
        }

        fn refresh_tokens(&self) -> Arc<dyn RefreshTokenRepository> {
            self.tokens.clone()
        }

        async fn transaction<F, T>(&self, _f: F) -> AppResult<T>
        where
            F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                    Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
                > + Send,
            T: Send,
        {
            Err(AppError::internal("transactions not available in unit tests"))
        }
    }

    fn manager(
        users: MockUserRepository,
        tokens: MockRefreshTokenRepository,
    ) -> IdentityManager<MockUow> {
        let uow = Arc::new(MockUow {
            users: Arc::new(users),
            tokens: Arc::new(tokens),
        });
        IdentityManager::new(
            uow,
            Arc::new(LogMailer),
            Config::for_tests("test-secret-key-for-testing-only-32chars"),
        )
    }

    fn confirmed_user(email: &str, password: &str) -> User {
        let mut user = User::new(
            Uuid::new_v4(),
            email.to_string(),
            Password::new(password).unwrap().into_string(),
        );
        user.email_confirmed = true;
        user
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|email| Ok(Some(confirmed_user(email, "Password123!"))));

        let service = manager(users, MockRefreshTokenRepository::new());
        let result = service
            .register("taken@example.com".into(), "Password123!".into())
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn login_with_unknown_email_is_invalid_credentials() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));

        let service = manager(users, MockRefreshTokenRepository::new());
        let result = service
            .login("ghost@example.com".into(), "Password123!".into())
            .await;

        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn login_requires_confirmed_email() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|email| {
            let mut user = confirmed_user(email, "Password123!");
            user.email_confirmed = false;
            Ok(Some(user))
        });

        let service = manager(users, MockRefreshTokenRepository::new());
        let result = service
            .login("new@example.com".into(), "Password123!".into())
            .await;

        assert!(matches!(result, Err(AppError::EmailNotConfirmed)));
    }

    #[tokio::test]
    async fn login_issues_token_pair_and_persists_refresh_token() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|email| Ok(Some(confirmed_user(email, "Password123!"))));

        let mut tokens = MockRefreshTokenRepository::new();
        tokens.expect_insert().times(1).returning(|record| Ok(record));

        let service = manager(users, tokens);
        let pair = service
            .login("user@example.com".into(), "Password123!".into())
            .await
            .unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[tokio::test]
    async fn refresh_with_unknown_token_is_unauthorized() {
        let mut tokens = MockRefreshTokenRepository::new();
        tokens.expect_find_by_hash().returning(|_| Ok(None));

        let service = manager(MockUserRepository::new(), tokens);
        let result = service.refresh("bogus".into()).await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    // Rotation tests run the real unit of work over a mock database so
    // the transactional path itself is exercised.

    fn user_row(id: Uuid, stamp: &str) -> user_entity::Model {
        let now = Utc::now();
        user_entity::Model {
            id,
            email: "user@example.com".to_string(),
            password_hash: "hash".to_string(),
            security_stamp: stamp.to_string(),
            concurrency_stamp: Uuid::new_v4().to_string(),
            email_confirmed: true,
            confirmation_token_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn token_row(user_id: Uuid, token_hash: &str, stamp: &str) -> refresh_token::Model {
        let now = Utc::now();
        refresh_token::Model {
            id: Uuid::new_v4(),
            user_id,
            token_hash: token_hash.to_string(),
            security_stamp: stamp.to_string(),
            expires_at: now + Duration::days(14),
            created_at: now,
            revoked_at: None,
        }
    }

    fn db_manager(db: sea_orm::DatabaseConnection) -> IdentityManager<Persistence> {
        IdentityManager::new(
            Arc::new(Persistence::new(Arc::new(db))),
            Arc::new(LogMailer),
            Config::for_tests("test-secret-key-for-testing-only-32chars"),
        )
    }

    #[tokio::test]
    async fn refresh_rotates_the_presented_token() {
        let user_id = Uuid::new_v4();
        let stamp = "stamp-1";
        let presented = OpaqueToken::generate();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![token_row(user_id, presented.hash(), stamp)]])
            .append_query_results([vec![user_row(user_id, stamp)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .append_query_results([vec![token_row(user_id, "replacement-hash", stamp)]])
            .into_connection();

        let service = db_manager(db);
        let pair = service.refresh(presented.plain().to_string()).await.unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert!(!pair.access_token.is_empty());
        assert_ne!(pair.refresh_token, presented.plain());
    }

    #[tokio::test]
    async fn refresh_replay_that_lost_the_revocation_race_is_unauthorized() {
        let user_id = Uuid::new_v4();
        let stamp = "stamp-1";
        let presented = OpaqueToken::generate();

        // The conditional revoke touches no rows: a concurrent exchange
        // already flipped revoked_at after this caller's lookup.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![token_row(user_id, presented.hash(), stamp)]])
            .append_query_results([vec![user_row(user_id, stamp)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let service = db_manager(db);
        let result = service.refresh(presented.plain().to_string()).await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn refresh_rejects_token_issued_under_an_old_stamp() {
        let user_id = Uuid::new_v4();
        let presented = OpaqueToken::generate();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![token_row(user_id, presented.hash(), "stamp-1")]])
            .append_query_results([vec![user_row(user_id, "stamp-2")]])
            .into_connection();

        let service = db_manager(db);
        let result = service.refresh(presented.plain().to_string()).await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn confirm_email_rejects_wrong_code() {
        let real_code = OpaqueToken::generate();
        let stored_hash = real_code.hash().to_string();

        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(move |id| {
            let mut user = confirmed_user("a@example.com", "Password123!");
            user.id = id;
            user.email_confirmed = false;
            user.confirmation_token_hash = Some(stored_hash.clone());
            Ok(Some(user))
        });

        let service = manager(users, MockRefreshTokenRepository::new());
        let result = service
            .confirm_email(Uuid::new_v4(), "wrong-code".into())
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn access_token_round_trip() {
        let config = Config::for_tests("test-secret-key-for-testing-only-32chars");
        let user = confirmed_user("user@example.com", "Password123!");

        let token = generate_access_token(&user, &config).unwrap();
        let claims = verify_token_internal(&token, &config).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.stamp, user.security_stamp);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn access_token_rejected_with_different_secret() {
        let config = Config::for_tests("test-secret-key-for-testing-only-32chars");
        let other = Config::for_tests("another-secret-key-entirely-32chars!");
        let user = confirmed_user("user@example.com", "Password123!");

        let token = generate_access_token(&user, &config).unwrap();
        assert!(verify_token_internal(&token, &other).is_err());
    }
}
