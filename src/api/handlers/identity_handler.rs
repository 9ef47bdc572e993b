//! Identity endpoint handlers.
//!
//! The full credential lifecycle lives under the `/identity` prefix:
//! registration, email confirmation, login, refresh, and logout.

use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::UserResponse;
use crate::errors::AppResult;
use crate::services::TokenPair;

/// User registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// User email address
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
    /// User password (minimum 8 characters)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "SecurePass123!", min_length = 8)]
    pub password: String,
}

/// User login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// User email address
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
    /// User password
    #[schema(example = "SecurePass123!")]
    pub password: String,
}

/// Refresh token exchange request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    /// Refresh token obtained from login or a previous refresh
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Confirmation email reissue request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResendConfirmationRequest {
    /// User email address
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
}

/// Query parameters carried by the emailed confirmation link
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmEmailParams {
    pub user_id: Uuid,
    pub code: String,
}

/// Message-only response body
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Confirmation email sent")]
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Create public identity routes (no authentication required)
pub fn identity_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/confirmEmail", get(confirm_email))
        .route("/resendConfirmationEmail", post(resend_confirmation_email))
}

/// Create identity routes that require an authenticated caller
pub fn identity_manage_routes() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/manage/info", get(manage_info))
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/identity/register",
    tag = "Identity",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered; confirmation email dispatched", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "User already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .identity_service
        .register(payload.email, payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Login and get an access/refresh token pair
#[utoipa::path(
    post,
    path = "/identity/login",
    tag = "Identity",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Invalid credentials or unconfirmed email")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    let pair = state
        .identity_service
        .login(payload.email, payload.password)
        .await?;

    Ok(Json(pair))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/identity/refresh",
    tag = "Identity",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair issued; the presented refresh token is revoked", body = TokenPair),
        (status = 401, description = "Unknown, expired, or revoked refresh token")
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RefreshRequest>,
) -> AppResult<Json<TokenPair>> {
    let pair = state.identity_service.refresh(payload.refresh_token).await?;

    Ok(Json(pair))
}

/// Confirm an email address via the emailed link
#[utoipa::path(
    get,
    path = "/identity/confirmEmail",
    tag = "Identity",
    params(
        ("userId" = Uuid, Query, description = "User identifier from the confirmation link"),
        ("code" = String, Query, description = "Confirmation code from the confirmation link")
    ),
    responses(
        (status = 200, description = "Email confirmed", body = MessageResponse),
        (status = 400, description = "Invalid confirmation code")
    )
)]
pub async fn confirm_email(
    State(state): State<AppState>,
    Query(params): Query<ConfirmEmailParams>,
) -> AppResult<Json<MessageResponse>> {
    state
        .identity_service
        .confirm_email(params.user_id, params.code)
        .await?;

    Ok(Json(MessageResponse::new("Email confirmed")))
}

/// Reissue the confirmation email
#[utoipa::path(
    post,
    path = "/identity/resendConfirmationEmail",
    tag = "Identity",
    request_body = ResendConfirmationRequest,
    responses(
        // Always 200: the response must not reveal whether the address exists
        (status = 200, description = "Confirmation email sent if the address is registered and unconfirmed", body = MessageResponse)
    )
)]
pub async fn resend_confirmation_email(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ResendConfirmationRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.identity_service.resend_confirmation(payload.email).await?;

    Ok(Json(MessageResponse::new("Confirmation email sent")))
}

/// Revoke all of the caller's refresh tokens
#[utoipa::path(
    post,
    path = "/identity/logout",
    tag = "Identity",
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "All refresh tokens revoked"),
        (status = 401, description = "Authentication required")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<StatusCode> {
    state.identity_service.logout(current_user.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Get the authenticated user's account info
#[utoipa::path(
    get,
    path = "/identity/manage/info",
    tag = "Identity",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Authentication required")
    )
)]
pub async fn manage_info(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> AppResult<Json<UserResponse>> {
    let user = state.identity_service.current_user(current_user.id).await?;

    Ok(Json(UserResponse::from(user)))
}
