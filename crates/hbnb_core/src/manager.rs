//! Repository manager: the single routing point between models and storage.
//!
//! # Responsibility
//! - Build exactly one backend from `StorageConfig`.
//! - Forward every repository operation to that backend.
//! - Serialize model-level check-then-write sequences through one guard.
//!
//! # Invariants
//! - The manager holds no entity data of its own.
//! - Re-initialization drops the previous backend before the next one is
//!   used, so no state leaks across a switch.

use crate::config::{ConfigError, DatabaseTarget, RepositoryKind, StorageConfig};
use crate::model::entity::{EntityKind, Record};
use crate::repo::file_repo::FileRepository;
use crate::repo::memory_repo::MemoryRepository;
use crate::repo::sqlite_repo::SqliteRepository;
use crate::repo::{RepoError, RepoResult, Repository};
use log::{error, info};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Mutex, MutexGuard};

/// Startup failure of the manager.
#[derive(Debug)]
pub enum ManagerError {
    Config(ConfigError),
    Repo(RepoError),
}

impl Display for ManagerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Repo(err) => write!(f, "storage initialization failed: {err}"),
        }
    }
}

impl Error for ManagerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ManagerError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<RepoError> for ManagerError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Owner of the active backend for the lifetime of the application.
pub struct RepositoryManager {
    kind: RepositoryKind,
    backend: Box<dyn Repository>,
    writes: Mutex<()>,
}

impl Debug for RepositoryManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryManager")
            .field("kind", &self.kind)
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

impl RepositoryManager {
    /// Builds the backend selected by `config`.
    ///
    /// # Errors
    /// - `ManagerError::Config` when the database backend is selected but
    ///   disabled or misconfigured.
    /// - `ManagerError::Repo` when the backend cannot open its storage.
    pub fn from_config(config: &StorageConfig) -> Result<Self, ManagerError> {
        let backend = build_backend(config)?;
        info!(
            "event=repo_select module=manager status=ok repository={}",
            config.repository
        );
        Ok(Self::with_backend(config.repository, backend))
    }

    /// Wraps an already-built backend.
    pub fn with_backend(kind: RepositoryKind, backend: Box<dyn Repository>) -> Self {
        Self {
            kind,
            backend,
            writes: Mutex::new(()),
        }
    }

    /// Replaces the active backend. On failure the current backend stays.
    pub fn init(&mut self, config: &StorageConfig) -> Result<(), ManagerError> {
        let backend = build_backend(config)?;
        info!(
            "event=repo_switch module=manager status=ok from={} to={}",
            self.kind, config.repository
        );
        self.backend = backend;
        self.kind = config.repository;
        Ok(())
    }

    pub fn kind(&self) -> RepositoryKind {
        self.kind
    }

    /// Exclusive guard held by services across a read-check-write sequence.
    /// Not reentrant: a holder must not call another guarded operation.
    pub fn write_guard(&self) -> RepoResult<MutexGuard<'_, ()>> {
        self.writes
            .lock()
            .map_err(|_| RepoError::LockPoisoned("manager"))
    }

    pub fn get_all(&self, kind: EntityKind) -> RepoResult<Vec<Record>> {
        self.backend.get_all(kind)
    }

    pub fn get(&self, kind: EntityKind, id: &str) -> RepoResult<Option<Record>> {
        self.backend.get(kind, id)
    }

    /// String-keyed `get_all`; unknown type names yield an empty list.
    pub fn get_all_by_name(&self, type_name: &str) -> RepoResult<Vec<Record>> {
        match EntityKind::parse(type_name) {
            Some(kind) => self.get_all(kind),
            None => Ok(Vec::new()),
        }
    }

    /// String-keyed `get`; unknown type names yield `None`.
    pub fn get_by_name(&self, type_name: &str, id: &str) -> RepoResult<Option<Record>> {
        match EntityKind::parse(type_name) {
            Some(kind) => self.get(kind, id),
            None => Ok(None),
        }
    }

    pub fn save(&self, record: &Record) -> RepoResult<Record> {
        self.backend.save(record)
    }

    pub fn update(&self, record: &Record) -> RepoResult<Record> {
        self.backend.update(record)
    }

    pub fn delete(&self, record: &Record) -> RepoResult<bool> {
        self.backend.delete(record)
    }

    pub fn reload(&self) -> RepoResult<()> {
        self.backend.reload()
    }
}

fn build_backend(config: &StorageConfig) -> Result<Box<dyn Repository>, ManagerError> {
    let result: Result<Box<dyn Repository>, ManagerError> = match config.repository {
        RepositoryKind::Memory => Ok(Box::new(MemoryRepository::new())),
        RepositoryKind::File => FileRepository::open(&config.file_path)
            .map(|repo| Box::new(repo) as Box<dyn Repository>)
            .map_err(Into::into),
        RepositoryKind::Db => config
            .database_target()
            .map_err(ManagerError::from)
            .and_then(|target| {
                let repo = match target {
                    DatabaseTarget::InMemory => SqliteRepository::open_in_memory()?,
                    DatabaseTarget::Path(path) => SqliteRepository::open(path)?,
                };
                Ok(Box::new(repo) as Box<dyn Repository>)
            }),
    };

    if let Err(err) = &result {
        error!(
            "event=repo_select module=manager status=error repository={} error={}",
            config.repository, err
        );
    }
    result
}
