//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion, and use the Unit of Work pattern for
//! repository access and transaction management.

mod identity_service;
mod mailer;

pub use identity_service::{Claims, IdentityManager, IdentityService, TokenPair};
pub use mailer::{EmailMessage, LogMailer, Mailer};
