//! JSON snapshot file backend.
//!
//! # Responsibility
//! - Keep a working copy of every collection in memory.
//! - Rewrite the whole snapshot after each successful mutation.
//!
//! # Invariants
//! - Reads never touch disk.
//! - A mutation becomes visible only after its snapshot is durably renamed
//!   into place; a failed write leaves memory and disk unchanged.
//! - Writes go to `<path>.tmp` first and are renamed over `<path>`.
//! - A missing or unparsable snapshot opens as an empty store.
//! - Encoding is deterministic: decoding a snapshot and encoding it again
//!   yields the same bytes.

use crate::model::entity::{EntityKind, FieldValue, Record};
use crate::repo::memory_repo::MemoryStore;
use crate::repo::{RepoError, RepoResult, Repository};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

type Snapshot = BTreeMap<String, BTreeMap<String, SnapshotRow>>;

/// One entity as written in the snapshot document.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRow {
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(flatten)]
    fields: BTreeMap<String, FieldValue>,
}

/// Snapshot-file repository backend.
#[derive(Debug)]
pub struct FileRepository {
    path: PathBuf,
    store: Mutex<MemoryStore>,
}

impl FileRepository {
    /// Opens the snapshot at `path`, starting empty when it is missing or
    /// corrupt.
    ///
    /// # Errors
    /// - Returns `RepoError::Io` when an existing snapshot cannot be read.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let store = load_snapshot(&path)?;
        info!(
            "event=repo_open module=repo backend=file status=ok path={} records={}",
            path.display(),
            store.len()
        );
        Ok(Self {
            path,
            store: Mutex::new(store),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrites the snapshot from the current working copy.
    pub fn flush(&self) -> RepoResult<()> {
        let store = self.lock()?;
        write_snapshot(&self.path, &store)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, MemoryStore>> {
        self.store
            .lock()
            .map_err(|_| RepoError::LockPoisoned("file"))
    }

    /// Applies `op` to a copy of the working set, persists the copy, then
    /// commits it.
    fn mutate<T>(
        &self,
        event: &'static str,
        kind: EntityKind,
        op: impl FnOnce(&mut MemoryStore) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let mut store = self.lock()?;
        let mut next = store.clone();
        let output = op(&mut next)?;

        if let Err(err) = write_snapshot(&self.path, &next) {
            error!(
                "event={event} module=repo backend=file kind={kind} status=error error={err}"
            );
            return Err(err);
        }

        *store = next;
        debug!("event={event} module=repo backend=file kind={kind} status=ok");
        Ok(output)
    }
}

impl Repository for FileRepository {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn get_all(&self, kind: EntityKind) -> RepoResult<Vec<Record>> {
        Ok(self.lock()?.all(kind))
    }

    fn get(&self, kind: EntityKind, id: &str) -> RepoResult<Option<Record>> {
        Ok(self.lock()?.find(kind, id))
    }

    fn save(&self, record: &Record) -> RepoResult<Record> {
        self.mutate("repo_save", record.kind, |store| store.insert(record))
    }

    fn update(&self, record: &Record) -> RepoResult<Record> {
        self.mutate("repo_update", record.kind, |store| store.replace(record))
    }

    fn delete(&self, record: &Record) -> RepoResult<bool> {
        if self.lock()?.find(record.kind, &record.id).is_none() {
            return Ok(false);
        }
        self.mutate("repo_delete", record.kind, |store| {
            Ok(store.remove(record.kind, &record.id))
        })
    }

    fn reload(&self) -> RepoResult<()> {
        let mut store = self.lock()?;
        *store = load_snapshot(&self.path)?;
        info!(
            "event=repo_reload module=repo backend=file status=ok records={}",
            store.len()
        );
        Ok(())
    }
}

/// Encodes the store as a pretty-printed snapshot document.
fn encode_snapshot(store: &MemoryStore) -> RepoResult<String> {
    let snapshot: Snapshot = EntityKind::ALL
        .iter()
        .map(|kind| {
            let rows = store
                .all(*kind)
                .into_iter()
                .map(|record| {
                    let row = SnapshotRow {
                        id: record.id.clone(),
                        created_at: record.created_at,
                        updated_at: record.updated_at,
                        fields: record.fields,
                    };
                    (record.id, row)
                })
                .collect();
            (kind.as_str().to_string(), rows)
        })
        .collect();

    let mut body = serde_json::to_string_pretty(&snapshot).map_err(RepoError::Snapshot)?;
    body.push('\n');
    Ok(body)
}

fn decode_snapshot(body: &str) -> RepoResult<MemoryStore> {
    let snapshot: Snapshot = serde_json::from_str(body)
        .map_err(|err| RepoError::InvalidData(format!("snapshot is not valid JSON: {err}")))?;

    let mut store = MemoryStore::default();
    for (type_name, rows) in snapshot {
        let kind = EntityKind::parse(&type_name).ok_or_else(|| {
            RepoError::InvalidData(format!("unknown entity type `{type_name}` in snapshot"))
        })?;
        for (key, row) in rows {
            if key != row.id {
                return Err(RepoError::InvalidData(format!(
                    "{kind} snapshot key `{key}` does not match id `{}`",
                    row.id
                )));
            }
            store.restore(Record {
                kind,
                id: row.id,
                created_at: row.created_at,
                updated_at: row.updated_at,
                fields: row.fields,
            })?;
        }
    }
    Ok(store)
}

fn load_snapshot(path: &Path) -> RepoResult<MemoryStore> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(
                "event=snapshot_load module=repo backend=file status=missing path={}",
                path.display()
            );
            return Ok(MemoryStore::default());
        }
        Err(source) => return Err(io_failure(path, source)),
    };

    let decoded = String::from_utf8(bytes)
        .map_err(|err| RepoError::InvalidData(format!("snapshot is not UTF-8: {err}")))
        .and_then(|body| decode_snapshot(&body));
    match decoded {
        Ok(store) => Ok(store),
        Err(err) => {
            warn!(
                "event=snapshot_load module=repo backend=file status=corrupt path={} error={}",
                path.display(),
                err
            );
            Ok(MemoryStore::default())
        }
    }
}

fn write_snapshot(path: &Path, store: &MemoryStore) -> RepoResult<()> {
    let body = encode_snapshot(store)?;
    let tmp_path = temp_path_for(path);

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| io_failure(parent, source))?;
    }

    let written = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(body.as_bytes())?;
        file.sync_all()
    });
    if let Err(source) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_failure(&tmp_path, source));
    }

    fs::rename(&tmp_path, path).map_err(|source| {
        let _ = fs::remove_file(&tmp_path);
        io_failure(path, source)
    })
}

fn io_failure(path: &Path, source: std::io::Error) -> RepoError {
    RepoError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::{decode_snapshot, encode_snapshot, temp_path_for};
    use crate::model::entity::{EntityKind, Record};
    use crate::repo::memory_repo::MemoryStore;
    use std::path::Path;

    #[test]
    fn empty_store_encodes_every_collection() {
        let body = encode_snapshot(&MemoryStore::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        for kind in EntityKind::ALL {
            assert!(value[kind.as_str()].as_object().unwrap().is_empty());
        }
    }

    #[test]
    fn encode_decode_encode_is_byte_identical() {
        let mut store = MemoryStore::default();
        store
            .insert(&Record::new(EntityKind::Country, "US").with_field("name", "United States"))
            .unwrap();
        store
            .insert(
                &Record::new(EntityKind::City, "c-1")
                    .with_field("name", "Austin")
                    .with_field("country_code", "US"),
            )
            .unwrap();

        let first = encode_snapshot(&store).unwrap();
        let decoded = decode_snapshot(&first).unwrap();
        assert_eq!(decoded, store);
        assert_eq!(encode_snapshot(&decoded).unwrap(), first);
    }

    #[test]
    fn decode_rejects_key_id_mismatch_and_unknown_types() {
        let mismatched = r#"{"country": {"US": {"id": "FR", "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z", "name": "France"}}}"#;
        assert!(decode_snapshot(mismatched).is_err());

        let unknown = r#"{"amenity": {}}"#;
        assert!(decode_snapshot(unknown).is_err());
    }

    #[test]
    fn temp_path_appends_suffix() {
        assert_eq!(
            temp_path_for(Path::new("/data/store.json")),
            Path::new("/data/store.json.tmp")
        );
    }
}
