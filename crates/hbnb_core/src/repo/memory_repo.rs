//! Process-lifetime in-memory backend.
//!
//! # Responsibility
//! - Hold every collection in a map of maps guarded by one lock.
//! - Provide `MemoryStore`, the reference mutation rules the file backend
//!   reuses for its working copy.
//!
//! # Invariants
//! - Ids are unique within a collection; iteration order is by id.
//! - Data is lost when the process exits.

use crate::model::entity::{EntityKind, Record};
use crate::repo::{stamp_new, stamp_update, RepoError, RepoResult, Repository};
use log::debug;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Plain collection map with the repository mutation rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MemoryStore {
    collections: BTreeMap<EntityKind, BTreeMap<String, Record>>,
}

impl MemoryStore {
    pub(crate) fn all(&self, kind: EntityKind) -> Vec<Record> {
        self.collections
            .get(&kind)
            .map(|collection| collection.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn find(&self, kind: EntityKind, id: &str) -> Option<Record> {
        self.collections
            .get(&kind)
            .and_then(|collection| collection.get(id))
            .cloned()
    }

    pub(crate) fn insert(&mut self, record: &Record) -> RepoResult<Record> {
        record.validate_shape()?;
        let collection = self.collections.entry(record.kind).or_default();
        if collection.contains_key(&record.id) {
            return Err(RepoError::Conflict {
                kind: record.kind,
                id: record.id.clone(),
            });
        }

        let stored = stamp_new(record);
        collection.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    pub(crate) fn replace(&mut self, record: &Record) -> RepoResult<Record> {
        record.validate_shape()?;
        let existing = self
            .collections
            .get_mut(&record.kind)
            .and_then(|collection| collection.get_mut(&record.id))
            .ok_or_else(|| RepoError::NotFound {
                kind: record.kind,
                id: record.id.clone(),
            })?;

        let stored = stamp_update(record, existing.created_at);
        *existing = stored.clone();
        Ok(stored)
    }

    pub(crate) fn remove(&mut self, kind: EntityKind, id: &str) -> bool {
        self.collections
            .get_mut(&kind)
            .and_then(|collection| collection.remove(id))
            .is_some()
    }

    /// Inserts an already-stamped record as loaded from durable storage.
    pub(crate) fn restore(&mut self, record: Record) -> RepoResult<()> {
        record.validate_shape()?;
        let collection = self.collections.entry(record.kind).or_default();
        if collection.contains_key(&record.id) {
            return Err(RepoError::InvalidData(format!(
                "duplicate {} id `{}` in snapshot",
                record.kind, record.id
            )));
        }
        collection.insert(record.id.clone(), record);
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.collections.values().map(BTreeMap::len).sum()
    }
}

/// In-memory repository backend.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    store: RwLock<MemoryStore>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across all collections.
    pub fn len(&self) -> RepoResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> RepoResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, MemoryStore>> {
        self.store
            .read()
            .map_err(|_| RepoError::LockPoisoned("memory"))
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, MemoryStore>> {
        self.store
            .write()
            .map_err(|_| RepoError::LockPoisoned("memory"))
    }
}

impl Repository for MemoryRepository {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn get_all(&self, kind: EntityKind) -> RepoResult<Vec<Record>> {
        Ok(self.read()?.all(kind))
    }

    fn get(&self, kind: EntityKind, id: &str) -> RepoResult<Option<Record>> {
        Ok(self.read()?.find(kind, id))
    }

    fn save(&self, record: &Record) -> RepoResult<Record> {
        let stored = self.write()?.insert(record)?;
        debug!(
            "event=repo_save module=repo backend=memory kind={} status=ok",
            record.kind
        );
        Ok(stored)
    }

    fn update(&self, record: &Record) -> RepoResult<Record> {
        let stored = self.write()?.replace(record)?;
        debug!(
            "event=repo_update module=repo backend=memory kind={} status=ok",
            record.kind
        );
        Ok(stored)
    }

    fn delete(&self, record: &Record) -> RepoResult<bool> {
        let removed = self.write()?.remove(record.kind, &record.id);
        debug!(
            "event=repo_delete module=repo backend=memory kind={} removed={}",
            record.kind, removed
        );
        Ok(removed)
    }

    fn reload(&self) -> RepoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryRepository, MemoryStore};
    use crate::model::entity::{EntityKind, Record};
    use crate::repo::{RepoError, Repository};

    fn country(code: &str) -> Record {
        Record::new(EntityKind::Country, code).with_field("name", "Somewhere")
    }

    #[test]
    fn replace_preserves_created_at_and_moves_updated_at_forward() {
        let mut store = MemoryStore::default();
        let stored = store.insert(&country("US")).unwrap();

        let renamed = country("US").with_field("name", "United States");
        let updated = store.replace(&renamed).unwrap();

        assert_eq!(updated.created_at, stored.created_at);
        assert!(updated.updated_at >= updated.created_at);
        assert_eq!(store.find(EntityKind::Country, "US"), Some(updated));
    }

    #[test]
    fn restore_rejects_duplicate_ids() {
        let mut store = MemoryStore::default();
        store.restore(country("FR")).unwrap();
        let err = store.restore(country("FR")).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }

    #[test]
    fn remove_on_unknown_collection_is_false() {
        let mut store = MemoryStore::default();
        assert!(!store.remove(EntityKind::Place, "missing"));
    }

    #[test]
    fn repository_counts_records_across_collections() {
        let repo = MemoryRepository::new();
        assert!(repo.is_empty().unwrap());

        repo.save(&country("US")).unwrap();
        repo.save(
            &Record::new(EntityKind::City, "c-1")
                .with_field("name", "Austin")
                .with_field("country_code", "US"),
        )
        .unwrap();
        assert_eq!(repo.len().unwrap(), 2);

        assert!(repo.delete(&country("US")).unwrap());
        assert_eq!(repo.len().unwrap(), 1);
    }
}
