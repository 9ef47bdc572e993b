//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod refresh_token;
pub mod user;

// Re-exports for public API convenience
#[allow(unused_imports)]
pub use refresh_token::{
    ActiveModel as RefreshTokenActiveModel, Entity as RefreshTokenEntity,
    Model as RefreshTokenModel,
};
#[allow(unused_imports)]
pub use user::{ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel};
