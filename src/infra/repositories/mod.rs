//! Repository layer - Data access abstraction
//!
//! Repositories provide an abstraction over data persistence,
//! following the Repository pattern for clean separation of concerns.

pub(crate) mod entities;
mod refresh_token_repository;
mod user_repository;

pub use refresh_token_repository::{RefreshTokenRepository, RefreshTokenStore};
pub use user_repository::{UserRepository, UserStore};

pub(crate) use refresh_token_repository::refresh_token_active_model;

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use refresh_token_repository::MockRefreshTokenRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
