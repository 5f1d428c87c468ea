//! Configuration file management for aura.
//!
//! Provides a TOML-based config file at `~/.config/aura/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use aura_core::integration::client::DEFAULT_ASSISTANT_TIMEOUT;
use aura_core::integration::webhook::DEFAULT_WEBHOOK_TIMEOUT;
use aura_core::integration::{AssistantConfig, WebhookConfig};
use aura_core::token::{TOKEN_SECRET_ENV, TokenConfig};
use aura_db::config::DbConfig;

pub const DATABASE_URL_ENV: &str = "AURA_DATABASE_URL";
pub const ASSISTANT_URL_ENV: &str = "AURA_ASSISTANT_URL";
pub const ASSISTANT_API_KEY_ENV: &str = "AURA_ASSISTANT_API_KEY";
pub const WEBHOOK_URL_ENV: &str = "AURA_WEBHOOK_URL";
pub const WEBHOOK_SECRET_ENV: &str = "AURA_WEBHOOK_SECRET";

/// Used when neither the environment nor the config file names an assistant.
pub const DEFAULT_ASSISTANT_URL: &str = "http://localhost:8001/api/";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub auth: AuthSection,
    #[serde(default)]
    pub assistant: AssistantSection,
    #[serde(default)]
    pub webhook: WebhookSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthSection {
    /// Hex-encoded token secret (64 hex chars = 32 bytes).
    pub token_secret: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AssistantSection {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct WebhookSection {
    pub url: Option<String>,
    pub secret: Option<String>,
    pub timeout_secs: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the aura config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/aura` or `~/.config/aura`,
/// never the platform-specific `dirs::config_dir()`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("aura");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("aura")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// The file is readable by its owner only.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Generate a random token secret: 32 random bytes, hex-encoded (64 chars).
pub fn generate_token_secret() -> String {
    use rand::Rng;
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct AuraConfig {
    pub db_config: DbConfig,
    pub token_config: TokenConfig,
    pub assistant: AssistantConfig,
    pub webhook: WebhookConfig,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AuraConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `AURA_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Token secret: `AURA_TOKEN_SECRET` > `auth.token_secret` > error
    /// - Assistant: `AURA_ASSISTANT_URL`/`AURA_ASSISTANT_API_KEY` > `[assistant]` > local default
    /// - Webhook: `AURA_WEBHOOK_URL`/`AURA_WEBHOOK_SECRET` > `[webhook]` > disabled
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Some(url) = env_var(DATABASE_URL_ENV) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let db_config = DbConfig::new(db_url);

        let token_config = if let Some(secret_hex) = env_var(TOKEN_SECRET_ENV) {
            TokenConfig::from_hex(&secret_hex)
                .with_context(|| format!("{TOKEN_SECRET_ENV} env var is not a valid secret"))?
        } else if let Some(ref cfg) = file_config {
            TokenConfig::from_hex(&cfg.auth.token_secret)
                .context("invalid token_secret in config file")?
        } else {
            bail!(
                "token secret not found; set {TOKEN_SECRET_ENV} or run `aura init` to create a config file"
            );
        };

        let assistant_file = file_config.as_ref().map(|c| &c.assistant);
        let assistant = AssistantConfig {
            base_url: env_var(ASSISTANT_URL_ENV)
                .or_else(|| assistant_file.and_then(|a| a.url.clone()))
                .unwrap_or_else(|| DEFAULT_ASSISTANT_URL.to_string()),
            api_key: env_var(ASSISTANT_API_KEY_ENV)
                .or_else(|| assistant_file.and_then(|a| a.api_key.clone())),
            timeout: assistant_file
                .and_then(|a| a.timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_ASSISTANT_TIMEOUT),
        };

        let webhook_file = file_config.as_ref().map(|c| &c.webhook);
        let webhook = WebhookConfig {
            url: env_var(WEBHOOK_URL_ENV).or_else(|| webhook_file.and_then(|w| w.url.clone())),
            secret: env_var(WEBHOOK_SECRET_ENV)
                .or_else(|| webhook_file.and_then(|w| w.secret.clone())),
            timeout: webhook_file
                .and_then(|w| w.timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_WEBHOOK_TIMEOUT),
        };

        Ok(Self {
            db_config,
            token_config,
            assistant,
            webhook,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_util::{EnvGuard, lock_env};

    const SECRET: &str = "aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55aa55";

    /// Point the config lookup at an empty temp dir and clear every AURA_* var.
    fn isolated(tmp: &tempfile::TempDir) -> EnvGuard {
        let mut env = EnvGuard::default();
        env.set("XDG_CONFIG_HOME", tmp.path().to_str().unwrap());
        for name in [
            DATABASE_URL_ENV,
            TOKEN_SECRET_ENV,
            ASSISTANT_URL_ENV,
            ASSISTANT_API_KEY_ENV,
            WEBHOOK_URL_ENV,
            WEBHOOK_SECRET_ENV,
        ] {
            env.remove(name);
        }
        env
    }

    fn sample_file() -> ConfigFile {
        ConfigFile {
            database: DatabaseSection {
                url: "postgresql://filehost:5432/filedb".to_string(),
            },
            auth: AuthSection {
                token_secret: "bb".repeat(32),
            },
            assistant: AssistantSection {
                url: Some("http://ai.file/api/".to_string()),
                api_key: Some("file-key".to_string()),
                timeout_secs: Some(30),
            },
            webhook: WebhookSection {
                url: Some("http://hooks.file/plan".to_string()),
                secret: None,
                timeout_secs: None,
            },
        }
    }

    #[test]
    fn generate_token_secret_is_64_hex_chars() {
        let secret = generate_token_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(secret, generate_token_secret());
    }

    #[cfg(unix)]
    #[test]
    fn save_config_writes_owner_only_file() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _env = isolated(&tmp);

        save_config(&sample_file()).unwrap();

        let path = tmp.path().join("aura").join("config.toml");
        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);

        let loaded = load_config().unwrap();
        assert_eq!(loaded.database.url, "postgresql://filehost:5432/filedb");
        assert_eq!(loaded.assistant.timeout_secs, Some(30));
    }

    #[test]
    fn minimal_file_without_integration_sections_parses() {
        let parsed: ConfigFile = toml::from_str(
            "[database]\nurl = \"postgresql://x/y\"\n\n[auth]\ntoken_secret = \"abcd\"\n",
        )
        .unwrap();
        assert!(parsed.assistant.url.is_none());
        assert!(parsed.webhook.url.is_none());
    }

    #[test]
    fn cli_flag_overrides_env() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let mut env = isolated(&tmp);
        env.set(DATABASE_URL_ENV, "postgresql://env:5432/envdb");
        env.set(TOKEN_SECRET_ENV, SECRET);

        let config = AuraConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
    }

    #[test]
    fn env_overrides_config_file() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let mut env = isolated(&tmp);
        save_config(&sample_file()).unwrap();
        env.set(DATABASE_URL_ENV, "postgresql://env:5432/envdb");
        env.set(ASSISTANT_URL_ENV, "http://ai.env/api/");
        env.set(WEBHOOK_SECRET_ENV, "env-secret");

        let config = AuraConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");
        assert_eq!(config.assistant.base_url, "http://ai.env/api/");
        assert_eq!(config.assistant.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.assistant.timeout, Duration::from_secs(30));
        assert_eq!(config.webhook.url.as_deref(), Some("http://hooks.file/plan"));
        assert_eq!(config.webhook.secret.as_deref(), Some("env-secret"));
        assert_eq!(config.webhook.timeout, DEFAULT_WEBHOOK_TIMEOUT);
    }

    #[test]
    fn defaults_when_only_secret_is_set() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let mut env = isolated(&tmp);
        env.set(TOKEN_SECRET_ENV, SECRET);

        let config = AuraConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
        assert_eq!(config.assistant.base_url, DEFAULT_ASSISTANT_URL);
        assert_eq!(config.assistant.timeout, Duration::from_secs(60));
        assert!(config.webhook.url.is_none());
        assert_eq!(config.webhook.timeout, Duration::from_secs(5));
    }

    #[test]
    fn errors_when_no_token_secret() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _env = isolated(&tmp);

        let err = AuraConfig::resolve(Some("postgresql://localhost:5432/aura")).unwrap_err();
        assert!(
            err.to_string().contains("token secret not found"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn rejects_non_hex_secret() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let mut env = isolated(&tmp);
        env.set(TOKEN_SECRET_ENV, "not-hex");

        assert!(AuraConfig::resolve(None).is_err());
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        assert!(config_path().ends_with("aura/config.toml"));
    }
}
