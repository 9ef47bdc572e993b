//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// User domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Rotated whenever credentials change; issued tokens carry a copy,
    /// so rotating it invalidates everything issued before.
    pub security_stamp: String,
    /// Rotated on every persisted update (optimistic concurrency token)
    pub concurrency_stamp: String,
    pub email_confirmed: bool,
    /// Hash of the pending email-confirmation code, if one is outstanding
    #[serde(skip_serializing)]
    pub confirmation_token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new unconfirmed user with fresh stamps
    pub fn new(id: Uuid, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            password_hash,
            security_stamp: Uuid::new_v4().to_string(),
            concurrency_stamp: Uuid::new_v4().to_string(),
            email_confirmed: false,
            confirmation_token_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the user may log in under a confirmed-email policy
    pub fn can_login(&self, require_confirmed_email: bool) -> bool {
        self.email_confirmed || !require_confirmed_email
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    /// Unique user identifier
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    /// User email address
    #[schema(example = "user@example.com")]
    pub email: String,
    /// Whether the email address has been confirmed
    #[schema(example = false)]
    pub email_confirmed: bool,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            email_confirmed: user.email_confirmed,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_starts_unconfirmed_with_distinct_stamps() {
        let user = User::new(Uuid::new_v4(), "a@example.com".into(), "hash".into());
        assert!(!user.email_confirmed);
        assert_ne!(user.security_stamp, user.concurrency_stamp);
    }

    #[test]
    fn unconfirmed_user_cannot_login_under_strict_policy() {
        let mut user = User::new(Uuid::new_v4(), "a@example.com".into(), "hash".into());
        assert!(!user.can_login(true));
        assert!(user.can_login(false));

        user.email_confirmed = true;
        assert!(user.can_login(true));
    }

    #[test]
    fn response_omits_credential_material() {
        let user = User::new(Uuid::new_v4(), "a@example.com".into(), "hash".into());
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("security_stamp").is_none());
    }
}
