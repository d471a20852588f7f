//! API configuration

use serde::{Deserialize, Serialize};

use infra_db::DatabaseConfig;

/// Where records and shares are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Storage backend
    pub store: StoreBackend,
    /// Database URL, used by the postgres backend
    pub database_url: String,
    /// Upper bound of the postgres connection pool
    pub database_max_connections: u32,
    /// Load the sample data set into an empty store at startup
    pub seed_sample_data: bool,
    /// Log level
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            store: StoreBackend::Memory,
            database_url: "postgres://localhost/dynamic_data".to_string(),
            database_max_connections: 10,
            seed_sample_data: true,
            log_level: "info".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables on top of the
    /// defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Pool settings for the postgres backend
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_url.clone()).max_connections(self.database_max_connections)
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_backend_names() {
        let backend: StoreBackend = serde_json::from_str("\"postgres\"").unwrap();
        assert_eq!(backend, StoreBackend::Postgres);
        assert_eq!(serde_json::to_string(&StoreBackend::Memory).unwrap(), "\"memory\"");
    }

    #[test]
    fn test_database_config_follows_api_config() {
        let config = ApiConfig {
            database_url: "postgres://db/data".to_string(),
            database_max_connections: 3,
            ..ApiConfig::default()
        };
        let database = config.database_config();
        assert_eq!(database.url, "postgres://db/data");
        assert_eq!(database.max_connections, 3);
    }
}
