//! Environment-provided application configuration.
//!
//! # Responsibility
//! - Read the repository selector, database settings, snapshot path and
//!   logging settings from the process environment.
//! - Reject unknown repository selectors at startup; an unknown environment
//!   name falls back to development with a warning.
//!
//! # Invariants
//! - Parsing is pure given a lookup function; `from_env` only binds it to
//!   `std::env`.

use log::warn;
use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_CONFIG_VAR: &str = "ENV_CONFIG";
pub const REPOSITORY_VAR: &str = "REPOSITORY";
pub const USE_DATABASE_VAR: &str = "USE_DATABASE";
pub const FILE_STORAGE_PATH_VAR: &str = "FILE_STORAGE_PATH";
pub const LOG_LEVEL_VAR: &str = "HBNB_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "HBNB_LOG_DIR";

pub const DEFAULT_REPOSITORY: RepositoryKind = RepositoryKind::Memory;
pub const DEFAULT_FILE_STORAGE_PATH: &str = "data.json";

/// Configuration errors; all of them are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownRepository(String),
    DatabaseDisabled,
    MissingDatabaseUrl(&'static str),
    UnsupportedDatabaseUrl(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownRepository(value) => write!(
                f,
                "unknown repository `{value}`; expected memory|file|db"
            ),
            Self::DatabaseDisabled => write!(
                f,
                "repository `db` selected but {USE_DATABASE_VAR} is not enabled"
            ),
            Self::MissingDatabaseUrl(var) => {
                write!(f, "repository `db` selected but {var} is not set")
            }
            Self::UnsupportedDatabaseUrl(url) => {
                write!(f, "unsupported database url `{url}`; only sqlite is available")
            }
        }
    }
}

impl Error for ConfigError {}

/// Backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    Memory,
    File,
    Db,
}

impl RepositoryKind {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "db" => Ok(Self::Db),
            _ => Err(ConfigError::UnknownRepository(value.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Db => "db",
        }
    }
}

impl Display for RepositoryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment profile; selects which database url variable is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl Environment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Some(Self::Development),
            "test" | "testing" => Some(Self::Testing),
            "prod" | "production" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "dev",
            Self::Testing => "test",
            Self::Production => "prod",
        }
    }

    /// Variable holding the database url and its default, if any.
    pub fn database_url_var(self) -> (&'static str, Option<&'static str>) {
        match self {
            Self::Development => ("DATABASE_URL", Some("sqlite:///hbnb_dev.db")),
            Self::Testing => ("TEST_DATABASE_URL", Some("sqlite:///:memory:")),
            Self::Production => ("PROD_DATABASE_URL", None),
        }
    }
}

/// Where the database backend keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    InMemory,
    Path(PathBuf),
}

impl DatabaseTarget {
    /// Parses `sqlite:///relative`, `sqlite:////absolute`,
    /// `sqlite:///:memory:`, `:memory:` or a bare path.
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let trimmed = url.trim();
        let location = match trimmed.strip_prefix("sqlite://") {
            Some(rest) => rest.strip_prefix('/').unwrap_or(rest),
            None if trimmed.contains("://") => {
                return Err(ConfigError::UnsupportedDatabaseUrl(trimmed.to_string()))
            }
            None => trimmed,
        };

        match location {
            "" => Err(ConfigError::UnsupportedDatabaseUrl(trimmed.to_string())),
            ":memory:" => Ok(Self::InMemory),
            path => Ok(Self::Path(PathBuf::from(path))),
        }
    }
}

/// Settings consumed by the repository manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub repository: RepositoryKind,
    pub use_database: bool,
    pub database_url: Option<String>,
    /// Variable the url came from, for error messages.
    pub database_url_var: &'static str,
    pub file_path: PathBuf,
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self {
            repository: RepositoryKind::Memory,
            use_database: false,
            database_url: None,
            database_url_var: "DATABASE_URL",
            file_path: PathBuf::from(DEFAULT_FILE_STORAGE_PATH),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            repository: RepositoryKind::File,
            file_path: path.into(),
            ..Self::memory()
        }
    }

    pub fn database(url: impl Into<String>) -> Self {
        Self {
            repository: RepositoryKind::Db,
            use_database: true,
            database_url: Some(url.into()),
            ..Self::memory()
        }
    }

    /// Resolves the database target, enforcing the availability toggle.
    pub fn database_target(&self) -> Result<DatabaseTarget, ConfigError> {
        if !self.use_database {
            return Err(ConfigError::DatabaseDisabled);
        }
        let url = self
            .database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl(self.database_url_var))?;
        DatabaseTarget::from_url(url)
    }
}

/// Full application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub environment: Environment,
    pub storage: StorageConfig,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let environment = match non_empty(ENV_CONFIG_VAR) {
            Some(value) => Environment::parse(&value).unwrap_or_else(|| {
                warn!(
                    "event=config_load module=config status=fallback key={ENV_CONFIG_VAR} value={} using={}",
                    value.trim(),
                    Environment::Development.as_str()
                );
                Environment::Development
            }),
            None => Environment::Development,
        };
        let repository = match non_empty(REPOSITORY_VAR) {
            Some(value) => RepositoryKind::parse(&value)?,
            None => DEFAULT_REPOSITORY,
        };
        let use_database = non_empty(USE_DATABASE_VAR)
            .map(|value| parse_flag(&value))
            .unwrap_or(false);

        let (url_var, url_default) = environment.database_url_var();
        let database_url = non_empty(url_var).or_else(|| url_default.map(str::to_string));

        let file_path = non_empty(FILE_STORAGE_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_STORAGE_PATH));

        Ok(Self {
            environment,
            storage: StorageConfig {
                repository,
                use_database,
                database_url,
                database_url_var: url_var,
                file_path,
            },
            log_level: non_empty(LOG_LEVEL_VAR),
            log_dir: non_empty(LOG_DIR_VAR).map(PathBuf::from),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "t"
    )
}
