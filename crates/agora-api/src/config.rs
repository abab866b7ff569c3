//! Server settings read from the environment.

use std::path::PathBuf;

use crate::error::AppError;

/// Runtime settings for the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// PostgreSQL URL. Without one the server keeps everything in memory.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// Redis URL. Without one events are only logged.
    pub redis_url: Option<String>,
    /// Directory uploaded images are written below.
    pub blob_root: PathBuf,
    /// Base URL images are served from.
    pub blob_public_url: String,
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Reads settings from the process environment. Call
    /// `dotenvy::dotenv()` first to pick up a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, treating empty values as unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a numeric variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_max_connections: u32 = match var("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::Config(format!("DATABASE_MAX_CONNECTIONS must be a positive integer: {e}"))
            })?,
            None => 10,
        };
        if database_max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_owned(),
            ));
        }
        let port: u16 = match var("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            database_max_connections,
            redis_url: var("REDIS_URL"),
            blob_root: var("BLOB_ROOT").map_or_else(|| PathBuf::from("./blobs"), PathBuf::from),
            blob_public_url: var("BLOB_PUBLIC_URL").unwrap_or_else(|| "/blobs".to_owned()),
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port,
        })
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let settings = settings_from(&[]).unwrap();

        assert_eq!(settings.database_url, None);
        assert_eq!(settings.database_max_connections, 10);
        assert_eq!(settings.redis_url, None);
        assert_eq!(settings.blob_root, PathBuf::from("./blobs"));
        assert_eq!(settings.blob_public_url, "/blobs");
        assert_eq!(settings.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_values_are_read_and_blank_ones_ignored() {
        let settings = settings_from(&[
            ("DATABASE_URL", "postgres://db/agora"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("REDIS_URL", "  "),
            ("PORT", "8080"),
        ])
        .unwrap();

        assert_eq!(settings.database_url.as_deref(), Some("postgres://db/agora"));
        assert_eq!(settings.database_max_connections, 4);
        assert_eq!(settings.redis_url, None);
        assert_eq!(settings.port, 8080);
    }

    #[test]
    fn test_invalid_numbers_are_config_errors() {
        assert!(matches!(
            settings_from(&[("PORT", "eighty")]),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            settings_from(&[("DATABASE_MAX_CONNECTIONS", "0")]),
            Err(AppError::Config(_))
        ));
    }
}
