//! HTTP request handlers.

pub mod forecast_handler;
pub mod identity_handler;

pub use forecast_handler::forecast_routes;
pub use identity_handler::{identity_manage_routes, identity_routes};
