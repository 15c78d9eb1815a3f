//! SQLite-backed relational backend.
//!
//! # Responsibility
//! - Map each `EntityKind` to its table and each registry field to a column.
//! - Run every mutation inside its own transaction.
//!
//! # Invariants
//! - Reads always go to the tables; there is no cache to reload.
//! - `save`, `update` and `delete` take the write lock up front
//!   (`BEGIN IMMEDIATE`) and commit once; any error drops the transaction,
//!   which rolls it back.
//! - SQLite transactions are serializable, which covers the read-committed
//!   minimum for concurrent writers.
//! - Connections are validated against the field registry before use.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db, open_db_in_memory};
use crate::model::entity::{EntityKind, FieldSpec, FieldType, FieldValue, Record};
use crate::repo::{stamp_new, stamp_update, RepoError, RepoResult, Repository};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const KEY_COLUMNS: &[&str] = &["id", "created_at", "updated_at"];

/// Database repository over one SQLite connection.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Wraps a migrated connection after checking its schema.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version is behind.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the tables do
    ///   not cover the field registry.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens and migrates the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let repo = Self::try_new(open_db(path.as_ref())?)?;
        info!(
            "event=repo_open module=repo backend=db status=ok path={}",
            path.as_ref().display()
        );
        Ok(repo)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> RepoResult<Self> {
        let repo = Self::try_new(open_db_in_memory()?)?;
        info!("event=repo_open module=repo backend=db status=ok path=:memory:");
        Ok(repo)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned("db"))
    }
}

impl Repository for SqliteRepository {
    fn backend_name(&self) -> &'static str {
        "db"
    }

    fn get_all(&self, kind: EntityKind) -> RepoResult<Vec<Record>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY id ASC;", select_sql(kind)))?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_row(kind, row)?);
        }
        Ok(records)
    }

    fn get(&self, kind: EntityKind, id: &str) -> RepoResult<Option<Record>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1;", select_sql(kind)))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_row(kind, row)?)),
            None => Ok(None),
        }
    }

    fn save(&self, record: &Record) -> RepoResult<Record> {
        record.validate_shape()?;
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if stored_created_at(&tx, record.kind, &record.id)?.is_some() {
            return Err(RepoError::Conflict {
                kind: record.kind,
                id: record.id.clone(),
            });
        }

        let stored = stamp_new(record);
        tx.execute(&insert_sql(record.kind), params_from_iter(bind_row(&stored)))?;
        tx.commit()?;

        debug!(
            "event=repo_save module=repo backend=db kind={} status=ok",
            record.kind
        );
        Ok(stored)
    }

    fn update(&self, record: &Record) -> RepoResult<Record> {
        record.validate_shape()?;
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let created_at = stored_created_at(&tx, record.kind, &record.id)?.ok_or_else(|| {
            RepoError::NotFound {
                kind: record.kind,
                id: record.id.clone(),
            }
        })?;

        let stored = stamp_update(record, created_at);
        let mut values = bind_row(&stored);
        values.remove(1);
        tx.execute(&update_sql(record.kind), params_from_iter(values))?;
        tx.commit()?;

        debug!(
            "event=repo_update module=repo backend=db kind={} status=ok",
            record.kind
        );
        Ok(stored)
    }

    fn delete(&self, record: &Record) -> RepoResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", record.kind.table_name()),
            params![record.id],
        )?;
        tx.commit()?;

        debug!(
            "event=repo_delete module=repo backend=db kind={} removed={}",
            record.kind,
            changed > 0
        );
        Ok(changed > 0)
    }

    fn reload(&self) -> RepoResult<()> {
        Ok(())
    }
}

fn column_names(kind: EntityKind) -> Vec<&'static str> {
    KEY_COLUMNS
        .iter()
        .copied()
        .chain(kind.fields().iter().map(|spec| spec.name))
        .collect()
}

fn select_sql(kind: EntityKind) -> String {
    format!(
        "SELECT {} FROM {}",
        column_names(kind).join(", "),
        kind.table_name()
    )
}

/// Positional layout: `id, created_at, updated_at, <registry fields>`.
fn insert_sql(kind: EntityKind) -> String {
    let columns = column_names(kind);
    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>();
    format!(
        "INSERT INTO {} ({}) VALUES ({});",
        kind.table_name(),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Positional layout: `id, updated_at, <registry fields>`; the stored
/// `created_at` is never rewritten.
fn update_sql(kind: EntityKind) -> String {
    let assignments = column_names(kind)
        .into_iter()
        .filter(|column| !matches!(*column, "id" | "created_at"))
        .enumerate()
        .map(|(index, column)| format!("{column} = ?{}", index + 2))
        .collect::<Vec<_>>();
    format!(
        "UPDATE {} SET {} WHERE id = ?1;",
        kind.table_name(),
        assignments.join(", ")
    )
}

fn bind_row(record: &Record) -> Vec<Value> {
    let mut values = vec![
        Value::Text(record.id.clone()),
        Value::Text(format_timestamp(record.created_at)),
        Value::Text(format_timestamp(record.updated_at)),
    ];
    values.extend(record.kind.fields().iter().map(|spec| {
        match record.field(spec.name).unwrap_or(&FieldValue::Null) {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(value) => Value::Integer(i64::from(*value)),
            FieldValue::Int(value) => Value::Integer(*value),
            FieldValue::Float(value) => Value::Real(*value),
            FieldValue::Text(value) => Value::Text(value.clone()),
        }
    }));
    values
}

fn parse_row(kind: EntityKind, row: &Row<'_>) -> RepoResult<Record> {
    let id: String = row.get(0)?;
    let created_at = parse_timestamp(kind, "created_at", &row.get::<_, String>(1)?)?;
    let updated_at = parse_timestamp(kind, "updated_at", &row.get::<_, String>(2)?)?;

    let mut fields = BTreeMap::new();
    for (offset, spec) in kind.fields().iter().enumerate() {
        let value = read_column(kind, spec, row, offset + KEY_COLUMNS.len())?;
        if value != FieldValue::Null || spec.nullable {
            fields.insert(spec.name.to_string(), value);
        }
    }

    let record = Record {
        kind,
        id,
        created_at,
        updated_at,
        fields,
    };
    record.validate_shape()?;
    Ok(record)
}

fn read_column(
    kind: EntityKind,
    spec: &FieldSpec,
    row: &Row<'_>,
    index: usize,
) -> RepoResult<FieldValue> {
    let value = match spec.field_type {
        FieldType::Text => row.get::<_, Option<String>>(index)?.map(FieldValue::Text),
        FieldType::Integer => row.get::<_, Option<i64>>(index)?.map(FieldValue::Int),
        FieldType::Real => row.get::<_, Option<f64>>(index)?.map(FieldValue::Float),
        FieldType::Boolean => match row.get::<_, Option<i64>>(index)? {
            None => None,
            Some(0) => Some(FieldValue::Bool(false)),
            Some(1) => Some(FieldValue::Bool(true)),
            Some(other) => {
                return Err(RepoError::InvalidData(format!(
                    "invalid boolean `{other}` in {}.{}",
                    kind.table_name(),
                    spec.name
                )))
            }
        },
    };
    Ok(value.unwrap_or(FieldValue::Null))
}

fn stored_created_at(
    conn: &Connection,
    kind: EntityKind,
    id: &str,
) -> RepoResult<Option<DateTime<Utc>>> {
    let raw: Option<String> = conn
        .query_row(
            &format!("SELECT created_at FROM {} WHERE id = ?1;", kind.table_name()),
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|value| parse_timestamp(kind, "created_at", &value))
        .transpose()
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(kind: EntityKind, column: &str, value: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid timestamp `{value}` in {}.{column}",
                kind.table_name()
            ))
        })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for kind in EntityKind::ALL {
        let table = kind.table_name();
        let columns = table_columns(conn, table)?;
        if columns.is_empty() {
            return Err(RepoError::MissingRequiredTable(table));
        }
        if let Some(column) = column_names(kind)
            .into_iter()
            .find(|column| !columns.contains(*column))
        {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<BTreeSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = BTreeSet::new();
    while let Some(row) = rows.next()? {
        columns.insert(row.get::<_, String>("name")?);
    }
    Ok(columns)
}
