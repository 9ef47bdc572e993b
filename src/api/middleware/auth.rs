//! JWT authentication middleware.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::config::BEARER_TOKEN_PREFIX;
use crate::errors::AppError;

/// Authenticated user extracted from the access token
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    /// Security stamp carried by the token
    pub stamp: String,
}

/// Bearer authentication middleware.
///
/// Extracts and validates the access token from the Authorization header,
/// confirms the embedded security stamp is still the account's current
/// one, then injects the CurrentUser into the request extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix(BEARER_TOKEN_PREFIX)
        .ok_or(AppError::Unauthorized)?;

    let claims = state.identity_service.verify_token(token)?;

    // A rotated stamp kills every token issued before the rotation
    let user = state.identity_service.current_user(claims.sub).await
        .map_err(|_| AppError::Unauthorized)?;
    if user.security_stamp != claims.stamp {
        return Err(AppError::Unauthorized);
    }

    let current_user = CurrentUser {
        id: claims.sub,
        email: claims.email,
        stamp: claims.stamp,
    };

    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{header, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::auth_middleware;
    use crate::api::AppState;
    use crate::domain::User;
    use crate::errors::{AppError, AppResult};
    use crate::infra::Database;
    use crate::services::{Claims, IdentityService, TokenPair};

    /// Stub whose issued tokens carry the stamp "issued-stamp" while the
    /// account currently holds `current_stamp`.
    struct StampedService {
        current_stamp: String,
    }

    #[async_trait]
    impl IdentityService for StampedService {
        async fn register(&self, _: String, _: String) -> AppResult<User> {
            Err(AppError::internal("not used"))
        }

        async fn confirm_email(&self, _: Uuid, _: String) -> AppResult<()> {
            Err(AppError::internal("not used"))
        }

        async fn resend_confirmation(&self, _: String) -> AppResult<()> {
            Err(AppError::internal("not used"))
        }

        async fn login(&self, _: String, _: String) -> AppResult<TokenPair> {
            Err(AppError::internal("not used"))
        }

        async fn refresh(&self, _: String) -> AppResult<TokenPair> {
            Err(AppError::internal("not used"))
        }

        async fn logout(&self, _: Uuid) -> AppResult<()> {
            Err(AppError::internal("not used"))
        }

        async fn current_user(&self, user_id: Uuid) -> AppResult<User> {
            let mut user = User::new(user_id, "user@example.com".into(), "hash".into());
            user.security_stamp = self.current_stamp.clone();
            Ok(user)
        }

        fn verify_token(&self, token: &str) -> AppResult<Claims> {
            if token != "issued-token" {
                return Err(AppError::Unauthorized);
            }
            Ok(Claims {
                sub: Uuid::new_v4(),
                email: "user@example.com".into(),
                stamp: "issued-stamp".into(),
                exp: Utc::now().timestamp() + 3600,
                iat: Utc::now().timestamp(),
            })
        }
    }

    fn app(current_stamp: &str) -> Router {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let state = AppState::new(
            Arc::new(StampedService {
                current_stamp: current_stamp.to_string(),
            }),
            Arc::new(Database::from_connection(db)),
        );
        Router::new()
            .route("/protected", get(|| async { "ok" }))
            .route_layer(from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    async fn call(app: Router, auth: Option<&str>) -> StatusCode {
        let mut builder = axum::http::Request::builder().uri("/protected");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn passes_token_whose_stamp_is_current() {
        let status = call(app("issued-stamp"), Some("Bearer issued-token")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_token_after_stamp_rotation() {
        let status = call(app("rotated-stamp"), Some("Bearer issued-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_missing_authorization_header() {
        let status = call(app("issued-stamp"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_malformed_authorization_scheme() {
        let status = call(app("issued-stamp"), Some("Basic issued-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
