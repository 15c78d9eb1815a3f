//! Repository contract and the interchangeable storage backends.
//!
//! # Responsibility
//! - Define the one interface every backend satisfies (`Repository`).
//! - Keep storage details (JSON snapshot, SQL) behind that interface.
//!
//! # Invariants
//! - `save` rejects an id already present in the collection.
//! - `update` never creates a row; it fails with `NotFound` instead.
//! - `delete` reports absence with `false`, never with an error.
//! - Storage owns `created_at`/`updated_at`; `updated_at >= created_at`.
//! - The in-memory backend is the reference: the others produce the same
//!   outcomes for the same operation sequence and only differ in durability.

use crate::db::DbError;
use crate::model::entity::{storage_now, EntityKind, FieldValue, Record, RecordError};
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod file_repo;
pub mod memory_repo;
pub mod sqlite_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for every backend.
#[derive(Debug)]
pub enum RepoError {
    /// An entity with the same id already exists in the collection.
    Conflict { kind: EntityKind, id: String },
    /// The targeted id is absent.
    NotFound { kind: EntityKind, id: String },
    /// The record does not match its kind's field registry.
    InvalidRecord(RecordError),
    /// Snapshot read/write failure.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Snapshot encode failure.
    Snapshot(serde_json::Error),
    Db(DbError),
    /// Stored data that cannot be mapped back to a record.
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// A writer panicked while holding the store lock.
    LockPoisoned(&'static str),
}

impl RepoError {
    /// True for failures of the durable layer rather than of the request.
    pub fn is_storage_failure(&self) -> bool {
        !matches!(
            self,
            Self::Conflict { .. } | Self::NotFound { .. } | Self::InvalidRecord(_)
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict { kind, id } => write!(f, "{kind} already exists: {id}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvalidRecord(err) => write!(f, "{err}"),
            Self::Io { path, source } => {
                write!(f, "snapshot io failed at `{}`: {source}", path.display())
            }
            Self::Snapshot(err) => write!(f, "snapshot encoding failed: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "database connection is not migrated: expected schema {expected_version}, found {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
            Self::LockPoisoned(backend) => write!(f, "{backend} store lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRecord(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Snapshot(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RecordError> for RepoError {
    fn from(value: RecordError) -> Self {
        Self::InvalidRecord(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage interface shared by the memory, file and database backends.
///
/// Implementations serialize their own writers; callers may share one
/// instance across threads.
pub trait Repository: Send + Sync {
    /// Short backend label used in logs (`memory`, `file`, `db`).
    fn backend_name(&self) -> &'static str;

    /// Returns every record of `kind`; empty when the collection is empty.
    fn get_all(&self, kind: EntityKind) -> RepoResult<Vec<Record>>;

    /// Returns the record, or `None` when the id is absent.
    fn get(&self, kind: EntityKind, id: &str) -> RepoResult<Option<Record>>;

    /// Inserts a new record and returns it as stored (timestamps stamped).
    fn save(&self, record: &Record) -> RepoResult<Record>;

    /// Replaces the stored fields of an existing record and returns it as
    /// stored, with `created_at` preserved and `updated_at` refreshed.
    fn update(&self, record: &Record) -> RepoResult<Record>;

    /// Removes the record; `false` when it was not present.
    fn delete(&self, record: &Record) -> RepoResult<bool>;

    /// Resynchronizes any working copy from durable storage.
    fn reload(&self) -> RepoResult<()>;
}

/// Stamps a record for first insertion.
pub(crate) fn stamp_new(record: &Record) -> Record {
    let now = storage_now();
    normalized(Record {
        created_at: now,
        updated_at: now,
        ..record.clone()
    })
}

/// Stamps a record for replacement of a row created at `created_at`.
pub(crate) fn stamp_update(record: &Record, created_at: DateTime<Utc>) -> Record {
    normalized(Record {
        created_at,
        updated_at: storage_now().max(created_at),
        ..record.clone()
    })
}

/// Absent nullable fields are stored as explicit nulls, matching what a
/// table row reads back as.
fn normalized(mut record: Record) -> Record {
    for spec in record.kind.fields().iter().filter(|spec| spec.nullable) {
        record
            .fields
            .entry(spec.name.to_string())
            .or_insert(FieldValue::Null);
    }
    record
}
