use std::env;

/// Connection settings for the service database.
///
/// `AURA_DATABASE_URL` and `AURA_DB_MAX_CONNECTIONS` override the defaults.
/// The CLI layers its own config file on top of this (see `aura-cli`).
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL, possibly with credentials and query
    /// parameters.
    pub database_url: String,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

impl DbConfig {
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/aura";
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

    pub fn from_env() -> Self {
        let database_url =
            env::var("AURA_DATABASE_URL").unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        let max_connections = env::var("AURA_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(Self::DEFAULT_MAX_CONNECTIONS);
        Self {
            database_url,
            max_connections,
        }
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// The URL up to (not including) any `?query` suffix.
    fn base(&self) -> (&str, &str) {
        match self.database_url.find('?') {
            Some(pos) => self.database_url.split_at(pos),
            None => (self.database_url.as_str(), ""),
        }
    }

    /// Database name from the URL path, ignoring query parameters.
    pub fn database_name(&self) -> Option<&str> {
        let (base, _) = self.base();
        let (_, after_scheme) = base.split_once("://")?;
        let (_, name) = after_scheme.split_once('/')?;
        Some(name).filter(|s| !s.is_empty())
    }

    /// Same server, `postgres` maintenance database. Query parameters such as
    /// `sslmode` are preserved.
    pub fn maintenance_url(&self) -> String {
        let (base, query) = self.base();
        match base.rfind('/') {
            Some(pos) if base[..pos].contains("://") && !base[..pos].ends_with('/') => {
                format!("{}/postgres{query}", &base[..pos])
            }
            _ => self.database_url.clone(),
        }
    }

    /// The URL with any password replaced by `***`, for log output.
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.database_url.split_once("://") else {
            return self.database_url.clone();
        };
        let Some((userinfo, host)) = rest.split_once('@') else {
            return self.database_url.clone();
        };
        match userinfo.split_once(':') {
            Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
            None => self.database_url.clone(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
