//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing. The bearer
//! security scheme is purely descriptive; enforcement happens in the
//! authentication middleware.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{forecast_handler, identity_handler};
use crate::domain::UserResponse;
use crate::services::TokenPair;

/// OpenAPI documentation for the Identity API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Identity API",
        version = "0.1.0",
        description = "User registration, login, refresh tokens, and email confirmation over Axum and SeaORM",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
        contact(name = "API Support", email = "support@example.com")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Identity endpoints
        identity_handler::register,
        identity_handler::login,
        identity_handler::refresh,
        identity_handler::confirm_email,
        identity_handler::resend_confirmation_email,
        identity_handler::logout,
        identity_handler::manage_info,
        // Sample protected resource
        forecast_handler::get_forecast,
    ),
    components(
        schemas(
            // Domain types
            UserResponse,
            TokenPair,
            // Identity handler types
            identity_handler::RegisterRequest,
            identity_handler::LoginRequest,
            identity_handler::RefreshRequest,
            identity_handler::ResendConfirmationRequest,
            identity_handler::MessageResponse,
            // Sample types
            forecast_handler::WeatherForecast,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Identity", description = "User registration, login, and token management"),
        (name = "Sample", description = "Protected sample resource")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token obtained from /identity/login"))
                        .build(),
                ),
            );
        }
    }
}
