//! Domain layer - Core business entities and logic
//!
//! This module contains the core domain models that represent
//! identity concepts independent of infrastructure concerns.
//!
//! Contains: Entities, Value Objects, Domain Services.

pub mod password;
pub mod token;
pub mod user;

pub use password::Password;
pub use token::{OpaqueToken, RefreshToken};
pub use user::{User, UserResponse};
