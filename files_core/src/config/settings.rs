use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const MAX_TOKEN_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Environment variable honoured by earlier deployments for the blob directory.
const LEGACY_FOLDER_PATH_VAR: &str = "FOLDER_PATH";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub files: FileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Memory,
    Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token_ttl_seconds: u64,
    pub session_store: SessionBackend,
    pub session_purge_interval_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub storage_dir: PathBuf,
    pub page_size: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            files: FileConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:./files_manager.db?mode=rwc".to_string(),
            max_connections: 10,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_seconds: 24 * 60 * 60,
            session_store: SessionBackend::Memory,
            session_purge_interval_seconds: 60,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("/tmp/files_manager"),
            page_size: 20,
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }

    pub fn session_purge_interval(&self) -> Duration {
        Duration::from_secs(self.session_purge_interval_seconds)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Ok(folder_path) = std::env::var(LEGACY_FOLDER_PATH_VAR) {
            builder = builder.set_override("files.storage_dir", folder_path)?;
        }

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.database.url.is_empty() {
            return Err(ConfigError::Message(
                "Database URL cannot be empty".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message(
                "Database max connections must be greater than 0".to_string(),
            ));
        }

        if self.auth.token_ttl_seconds == 0 {
            return Err(ConfigError::Message(
                "Token TTL must be greater than 0".to_string(),
            ));
        }

        if self.auth.token_ttl_seconds > MAX_TOKEN_TTL_SECONDS {
            return Err(ConfigError::Message(format!(
                "Token TTL cannot exceed {} seconds",
                MAX_TOKEN_TTL_SECONDS
            )));
        }

        if self.auth.session_purge_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Session purge interval must be greater than 0".to_string(),
            ));
        }

        if self.files.page_size == 0 {
            return Err(ConfigError::Message(
                "Page size must be greater than 0".to_string(),
            ));
        }

        if self.files.storage_dir.as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "Storage directory cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
