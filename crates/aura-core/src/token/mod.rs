//! User bearer tokens.
//!
//! Tokens are HMAC-SHA256 based, scoped to a (user_id, version) pair.
//! Format: `aura_ut_<user_id>_<version>_<hmac_hex>`
//!
//! Bumping a user's `token_version` invalidates every token issued before.

pub mod guard;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Token prefix used to identify user tokens.
const TOKEN_PREFIX: &str = "aura_ut_";

/// Environment variable holding the hex-encoded secret.
pub const TOKEN_SECRET_ENV: &str = "AURA_TOKEN_SECRET";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    #[error("invalid user ID in token: {0}")]
    InvalidUserId(String),

    #[error("invalid version in token: {0}")]
    InvalidVersion(String),

    #[error("token HMAC verification failed")]
    HmacMismatch,

    #[error("missing token secret")]
    MissingSecret,
}

/// Keyed HMAC state shared by token generation and validation.
#[derive(Clone)]
pub struct TokenConfig {
    mac: HmacSha256,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig").finish_non_exhaustive()
    }
}

impl TokenConfig {
    /// Build a config from raw secret bytes. An empty secret is rejected.
    pub fn new(secret: &[u8]) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::MissingSecret)?;
        Ok(Self { mac })
    }

    /// Build a config from a hex-encoded secret, as stored in the config file.
    pub fn from_hex(secret_hex: &str) -> Result<Self, TokenError> {
        let secret = hex::decode(secret_hex.trim()).map_err(|e| {
            TokenError::InvalidFormat(format!("token secret is not valid hex: {e}"))
        })?;
        Self::new(&secret)
    }

    /// Build a config from `AURA_TOKEN_SECRET`.
    pub fn from_env() -> Result<Self, TokenError> {
        let secret_hex =
            std::env::var(TOKEN_SECRET_ENV).map_err(|_| TokenError::MissingSecret)?;
        Self::from_hex(&secret_hex)
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }

    fn verify(&self, message: &[u8], expected: &[u8]) -> Result<(), TokenError> {
        let mut mac = self.mac.clone();
        mac.update(message);
        mac.verify_slice(expected).map_err(|_| TokenError::HmacMismatch)
    }
}

/// Claims extracted from a validated token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub version: i32,
}

/// Generate a token for a user at the given token version.
///
/// The HMAC-SHA256 is computed over `<user_id>:<version>`.
pub fn generate_token(config: &TokenConfig, user_id: Uuid, version: i32) -> String {
    let message = format!("{user_id}:{version}");
    let hmac_hex = hex::encode(config.sign(message.as_bytes()));
    format!("{TOKEN_PREFIX}{user_id}_{version}_{hmac_hex}")
}

/// Parse a token and verify its HMAC in constant time.
///
/// This does not consult the database; see [`guard::authenticate`] for the
/// version and account checks.
pub fn validate_token(config: &TokenConfig, token: &str) -> Result<TokenClaims, TokenError> {
    let rest = token
        .strip_prefix(TOKEN_PREFIX)
        .ok_or_else(|| TokenError::InvalidFormat("token must start with 'aura_ut_'".to_string()))?;

    // UUIDs are 36 chars (8-4-4-4-12) and contain no underscores.
    if rest.len() < 36 || !rest.is_char_boundary(36) {
        return Err(TokenError::InvalidFormat(
            "token too short to contain a valid UUID".to_string(),
        ));
    }
    let (user_id_str, after_user_id) = rest.split_at(36);
    let user_id =
        Uuid::parse_str(user_id_str).map_err(|e| TokenError::InvalidUserId(e.to_string()))?;

    let after_underscore = after_user_id
        .strip_prefix('_')
        .ok_or_else(|| TokenError::InvalidFormat("expected underscore after user_id".to_string()))?;
    let (version_str, hmac_hex) = after_underscore.split_once('_').ok_or_else(|| {
        TokenError::InvalidFormat("expected underscore between version and hmac".to_string())
    })?;

    let version: i32 = version_str
        .parse()
        .map_err(|e: std::num::ParseIntError| TokenError::InvalidVersion(e.to_string()))?;

    let provided_mac = hex::decode(hmac_hex)
        .map_err(|e| TokenError::InvalidFormat(format!("invalid hex in hmac: {e}")))?;

    let message = format!("{user_id}:{version}");
    config.verify(message.as_bytes(), &provided_mac)?;

    Ok(TokenClaims { user_id, version })
}
