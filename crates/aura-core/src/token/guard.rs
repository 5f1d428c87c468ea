//! Resolve a bearer token to the acting user.
//!
//! A token is accepted when:
//! - its HMAC verifies against the configured secret
//! - the user exists and is active
//! - its version equals the user's current `token_version`

use sqlx::PgPool;

use aura_db::models::User;
use aura_db::queries::users;

use super::{TokenConfig, TokenError, validate_token};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("unknown user")]
    UnknownUser,

    #[error("user is inactive")]
    Inactive,

    #[error("token has been revoked")]
    Revoked,

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Extract the token from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Check that `user` may act with a token carrying `version`.
pub fn check_user(user: &User, version: i32) -> Result<(), AuthError> {
    if !user.is_active {
        return Err(AuthError::Inactive);
    }
    if user.token_version != version {
        return Err(AuthError::Revoked);
    }
    Ok(())
}

/// Validate `token` and load the user it names.
pub async fn authenticate(
    pool: &PgPool,
    config: &TokenConfig,
    token: &str,
) -> Result<User, AuthError> {
    let claims = validate_token(config, token)?;
    let user = users::find_user_for_auth(pool, claims.user_id)
        .await?
        .ok_or(AuthError::UnknownUser)?;
    check_user(&user, claims.version)?;

    tracing::debug!(user_id = %user.id, school_id = %user.school_id, "authenticated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_db::models::Role;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(active: bool, version: i32) -> User {
        User {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            username: "ana".into(),
            email: "ana@example.com".into(),
            first_name: "Ana".into(),
            last_name: "Souza".into(),
            role: Role::Teacher,
            bio: String::new(),
            phone: String::new(),
            is_active: active,
            token_version: version,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn active_user_with_current_version_passes() {
        assert!(check_user(&user(true, 2), 2).is_ok());
    }

    #[test]
    fn stale_version_is_revoked() {
        assert!(matches!(check_user(&user(true, 3), 2), Err(AuthError::Revoked)));
    }

    #[test]
    fn inactive_user_is_rejected() {
        assert!(matches!(check_user(&user(false, 1), 1), Err(AuthError::Inactive)));
    }

    #[test]
    fn error_display_messages() {
        assert_eq!(
            AuthError::InvalidToken(TokenError::HmacMismatch).to_string(),
            "invalid token: token HMAC verification failed"
        );
        assert_eq!(AuthError::Revoked.to_string(), "token has been revoked");
    }
}
