//! Core of the lodging-booking backend.
//!
//! Entities are persisted through one `Repository` contract with three
//! interchangeable backends (memory, JSON snapshot file, SQLite), selected
//! at startup by `RepositoryManager`.

pub mod config;
pub mod db;
pub mod logging;
pub mod manager;
pub mod model;
pub mod repo;
pub mod seed;
pub mod service;

pub use config::{AppConfig, ConfigError, RepositoryKind, StorageConfig};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use manager::{ManagerError, RepositoryManager};
pub use model::city::{City, CityPatch, NewCity};
pub use model::country::{Country, CountryPatch, NewCountry};
pub use model::entity::{Entity, EntityKind, FieldValue, Record, RecordError};
pub use model::place::{NewPlace, Place, PlacePatch};
pub use model::user::{NewUser, User, UserPatch};
pub use repo::file_repo::FileRepository;
pub use repo::memory_repo::MemoryRepository;
pub use repo::sqlite_repo::SqliteRepository;
pub use repo::{RepoError, RepoResult, Repository};
pub use seed::populate_countries;
pub use service::city_service::CityService;
pub use service::country_service::CountryService;
pub use service::place_service::PlaceService;
pub use service::user_service::UserService;
pub use service::{ModelError, ModelResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
