//! Model-facing use-case services.
//!
//! # Responsibility
//! - Expose `create/get/get_all/update/delete` per entity type.
//! - Enforce referential integrity and natural-key uniqueness before any
//!   storage call.
//!
//! # Invariants
//! - Services only talk to the `RepositoryManager`, never to a backend.
//! - A rejected request performs no storage write.
//! - Every create, update and delete runs under the manager's write guard,
//!   so uniqueness checks and partial updates never interleave.

use crate::manager::RepositoryManager;
use crate::model::entity::{Entity, RecordError};
use crate::repo::RepoError;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod city_service;
pub mod country_service;
pub mod place_service;
pub mod user_service;

pub type ModelResult<T> = Result<T, ModelError>;

/// Error surfaced by the model layer.
#[derive(Debug)]
pub enum ModelError {
    /// The entity targeted by the request does not exist.
    NotFound { kind: &'static str, id: String },
    /// The id or natural key is already taken.
    Conflict(String),
    /// Invalid input, including references to missing entities.
    Validation(String),
    /// Storage failure of the active backend.
    Storage(RepoError),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Validation(message) => write!(f, "validation failed: {message}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ModelError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Conflict { kind, id } => {
                Self::Conflict(format!("{kind} `{id}` already exists"))
            }
            RepoError::NotFound { kind, id } => Self::NotFound {
                kind: kind.as_str(),
                id,
            },
            RepoError::InvalidRecord(err) => Self::Validation(err.to_string()),
            other => Self::Storage(other),
        }
    }
}

impl From<RecordError> for ModelError {
    fn from(value: RecordError) -> Self {
        Self::Storage(RepoError::InvalidRecord(value))
    }
}

/// Parses a loose JSON object into a typed create/patch structure.
///
/// Unknown keys and mistyped values are validation errors.
pub fn parse_input<T: DeserializeOwned>(value: serde_json::Value) -> ModelResult<T> {
    if !value.is_object() {
        return Err(ModelError::Validation(
            "request body must be a JSON object".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|err| ModelError::Validation(err.to_string()))
}

pub(crate) fn find<E: Entity>(manager: &RepositoryManager, id: &str) -> ModelResult<Option<E>> {
    match manager.get(E::KIND, id)? {
        Some(record) => Ok(Some(E::from_record(&record)?)),
        None => Ok(None),
    }
}

pub(crate) fn find_all<E: Entity>(manager: &RepositoryManager) -> ModelResult<Vec<E>> {
    manager
        .get_all(E::KIND)?
        .iter()
        .map(|record| E::from_record(record).map_err(ModelError::from))
        .collect()
}

pub(crate) fn require<E: Entity>(manager: &RepositoryManager, id: &str) -> ModelResult<E> {
    find(manager, id)?.ok_or_else(|| ModelError::NotFound {
        kind: E::KIND.as_str(),
        id: id.to_string(),
    })
}

pub(crate) fn insert<E: Entity>(manager: &RepositoryManager, entity: &E) -> ModelResult<E> {
    let stored = manager.save(&entity.to_record())?;
    Ok(E::from_record(&stored)?)
}

pub(crate) fn replace<E: Entity>(manager: &RepositoryManager, entity: &E) -> ModelResult<E> {
    let stored = manager.update(&entity.to_record())?;
    Ok(E::from_record(&stored)?)
}

/// Looks the entity up, then deletes it; `false` when it does not exist.
pub(crate) fn remove<E: Entity>(manager: &RepositoryManager, id: &str) -> ModelResult<bool> {
    let _guard = manager.write_guard()?;
    match manager.get(E::KIND, id)? {
        Some(record) => Ok(manager.delete(&record)?),
        None => Ok(false),
    }
}

/// Trims `value` and rejects it when empty.
pub(crate) fn required_text(field: &str, value: &str) -> ModelResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ModelError::Validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}
