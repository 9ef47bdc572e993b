//! Identity API - registration, login, and token management
//!
//! This crate implements an identity subsystem over a minimal web API:
//! user registration with email confirmation, password login, bearer
//! access tokens, single-use rotating refresh tokens, and a sample
//! protected resource endpoint, persisted through SeaORM with managed
//! migrations.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core identity entities and value objects
//! - **services**: Application use cases and business logic
//! - **infra**: Infrastructure concerns (database, migrations)
//! - **api**: HTTP handlers, middleware, and routes
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! cargo run -- serve
//!
//! # Run migrations
//! cargo run -- migrate up
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Password, User};
pub use errors::{AppError, AppResult};
