//! SQLite backend
//!
//! Entity records live in the `entities` table, index records in
//! `entity_indexes`, both as JSON text. File databases keep a pool of idle
//! connections so calls for different keys do not queue on one connection;
//! an in-memory database exists only inside its single connection.
//!
//! Index updates run in a `BEGIN IMMEDIATE` transaction, so handles opened
//! separately on one file (other processes included) queue on SQLite's write
//! lock instead of overwriting each other's records.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use super::{Backend, IndexRecord};
use crate::config::StoreConfig;
use crate::db;
use crate::errors::{lock_poisoned, storage_error, Result};
use crate::migrations::apply_migrations;

enum Connections {
    Memory(Mutex<Connection>),
    File {
        path: PathBuf,
        busy_timeout: Duration,
        pool_size: usize,
        idle: Mutex<Vec<Connection>>,
    },
}

/// SQLite-backed storage
pub struct SqliteBackend {
    connections: Connections,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.connections {
            Connections::Memory(_) => f.write_str("SqliteBackend(:memory:)"),
            Connections::File { path, .. } => write!(f, "SqliteBackend({})", path.display()),
        }
    }
}

impl SqliteBackend {
    /// Open the database described by `config`, applying pending migrations
    pub fn open(config: &StoreConfig) -> Result<Self> {
        match &config.path {
            None => Self::open_in_memory(),
            Some(path) => Self::open_file(path, config.busy_timeout(), config.pool_size),
        }
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = db::open_in_memory()?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            connections: Connections::Memory(Mutex::new(conn)),
        })
    }

    /// Open (creating if needed) a database file
    pub fn open_file(path: &Path, busy_timeout: Duration, pool_size: usize) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| storage_error("create_db_dir", e))?;
        }

        let mut conn = db::open(path)?;
        db::configure(&conn, busy_timeout)?;
        apply_migrations(&mut conn)?;

        tracing::debug!(path = %path.display(), pool_size, "opened sqlite store");

        Ok(Self {
            connections: Connections::File {
                path: path.to_path_buf(),
                busy_timeout,
                pool_size,
                idle: Mutex::new(vec![conn]),
            },
        })
    }

    /// Run `f` on a connection, mapping SQLite failures to StorageFailure
    fn with_conn<R>(
        &self,
        op: &str,
        f: impl FnOnce(&mut Connection) -> rusqlite::Result<R>,
    ) -> Result<R> {
        match &self.connections {
            Connections::Memory(conn) => {
                let mut conn = conn.lock().map_err(|_| lock_poisoned("sqlite.memory"))?;
                f(&mut conn).map_err(|e| storage_error(op, e))
            }
            Connections::File {
                path,
                busy_timeout,
                pool_size,
                idle,
            } => {
                let pooled = idle
                    .lock()
                    .map_err(|_| lock_poisoned("sqlite.pool"))?
                    .pop();
                let mut conn = match pooled {
                    Some(conn) => conn,
                    None => {
                        let conn = db::open(path)?;
                        db::configure(&conn, *busy_timeout)?;
                        conn
                    }
                };

                let result = f(&mut conn).map_err(|e| storage_error(op, e));

                let mut idle = idle.lock().map_err(|_| lock_poisoned("sqlite.pool"))?;
                if idle.len() < *pool_size {
                    idle.push(conn);
                }

                result
            }
        }
    }
}

fn encode(value: &impl serde::Serialize) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn read_index(conn: &Connection, index_name: &str) -> rusqlite::Result<Option<IndexRecord>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT record_json FROM entity_indexes WHERE index_name = ?1",
            [index_name],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|raw| decode(&raw)).transpose()
}

fn write_index(conn: &Connection, index_name: &str, record: &IndexRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO entity_indexes (index_name, record_json, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(index_name) DO UPDATE SET
            record_json = excluded.record_json,
            updated_at = excluded.updated_at",
        params![index_name, encode(record)?, now_ms()],
    )?;
    Ok(())
}

impl Backend for SqliteBackend {
    fn get_entity(&self, entity_type: &str, key: &str) -> Result<Option<Value>> {
        self.with_conn("get_entity", |conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT state_json FROM entities WHERE entity_type = ?1 AND entity_key = ?2",
                    params![entity_type, key],
                    |row| row.get(0),
                )
                .optional()?;
            raw.map(|raw| decode(&raw)).transpose()
        })
    }

    fn contains_entity(&self, entity_type: &str, key: &str) -> Result<bool> {
        self.with_conn("contains_entity", |conn| {
            conn.query_row(
                "SELECT 1 FROM entities WHERE entity_type = ?1 AND entity_key = ?2",
                params![entity_type, key],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
        })
    }

    fn insert_entity(&self, entity_type: &str, key: &str, state: &Value) -> Result<bool> {
        self.with_conn("insert_entity", |conn| {
            let now = now_ms();
            let inserted = conn.execute(
                "INSERT INTO entities (entity_type, entity_key, state_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(entity_type, entity_key) DO NOTHING",
                params![entity_type, key, encode(state)?, now],
            )?;
            Ok(inserted == 1)
        })
    }

    fn update_entity(&self, entity_type: &str, key: &str, state: &Value) -> Result<bool> {
        self.with_conn("update_entity", |conn| {
            let updated = conn.execute(
                "UPDATE entities SET state_json = ?3, updated_at = ?4
                 WHERE entity_type = ?1 AND entity_key = ?2",
                params![entity_type, key, encode(state)?, now_ms()],
            )?;
            Ok(updated == 1)
        })
    }

    fn delete_entity(&self, entity_type: &str, key: &str) -> Result<bool> {
        self.with_conn("delete_entity", |conn| {
            let deleted = conn.execute(
                "DELETE FROM entities WHERE entity_type = ?1 AND entity_key = ?2",
                params![entity_type, key],
            )?;
            Ok(deleted == 1)
        })
    }

    fn entity_keys(&self, entity_type: &str) -> Result<Vec<String>> {
        self.with_conn("entity_keys", |conn| {
            let mut stmt = conn.prepare(
                "SELECT entity_key FROM entities WHERE entity_type = ?1
                 ORDER BY created_at, rowid",
            )?;
            let keys = stmt
                .query_map([entity_type], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(keys)
        })
    }

    fn load_index(&self, index_name: &str) -> Result<Option<IndexRecord>> {
        self.with_conn("load_index", |conn| read_index(conn, index_name))
    }

    fn save_index(&self, index_name: &str, record: &IndexRecord) -> Result<()> {
        self.with_conn("save_index", |conn| write_index(conn, index_name, record))
    }

    fn update_index(
        &self,
        index_name: &str,
        f: &mut dyn FnMut(&mut IndexRecord),
    ) -> Result<bool> {
        self.with_conn("update_index", |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let before = read_index(&tx, index_name)?.unwrap_or_default();
            let mut record = before.clone();
            f(&mut record);
            let changed = record != before;
            if changed {
                write_index(&tx, index_name, &record)?;
            }
            tx.commit()?;
            Ok(changed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_roundtrip() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert!(backend
            .insert_entity("user", "a@example.com", &json!({"name": "A"}))
            .unwrap());
        assert!(!backend
            .insert_entity("user", "a@example.com", &json!({"name": "B"}))
            .unwrap());

        assert_eq!(
            backend.get_entity("user", "a@example.com").unwrap(),
            Some(json!({"name": "A"}))
        );
        assert!(backend.contains_entity("user", "a@example.com").unwrap());
        assert!(!backend.contains_entity("team", "a@example.com").unwrap());
    }

    #[test]
    fn test_update_delete_report_missing() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert!(!backend.update_entity("user", "x", &json!({})).unwrap());
        assert!(!backend.delete_entity("user", "x").unwrap());

        backend.insert_entity("user", "x", &json!({"v": 1})).unwrap();
        assert!(backend.update_entity("user", "x", &json!({"v": 2})).unwrap());
        assert_eq!(
            backend.get_entity("user", "x").unwrap(),
            Some(json!({"v": 2}))
        );
        assert!(backend.delete_entity("user", "x").unwrap());
        assert_eq!(backend.get_entity("user", "x").unwrap(), None);
    }

    #[test]
    fn test_index_record_upsert() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert_eq!(backend.load_index("users").unwrap(), None);

        let mut record = IndexRecord::default();
        record.insert("a");
        backend.save_index("users", &record).unwrap();
        record.seeded = true;
        backend.save_index("users", &record).unwrap();

        assert_eq!(backend.load_index("users").unwrap(), Some(record));
    }

    #[test]
    fn test_update_index_is_atomic_across_handles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.db");
        let first = SqliteBackend::open(&StoreConfig::file(&path)).unwrap();
        let second = SqliteBackend::open(&StoreConfig::file(&path)).unwrap();

        std::thread::scope(|scope| {
            for (tag, backend) in [("a", &first), ("b", &second)] {
                scope.spawn(move || {
                    for i in 0..25 {
                        let key = format!("{}{}", tag, i);
                        backend
                            .update_index("users", &mut |record: &mut IndexRecord| {
                                record.insert(&key);
                            })
                            .unwrap();
                    }
                });
            }
        });

        let record = first.load_index("users").unwrap().unwrap();
        assert_eq!(record.keys.len(), 50);
        assert_eq!(second.load_index("users").unwrap(), Some(record));
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.db");

        {
            let backend = SqliteBackend::open(&StoreConfig::file(&path)).unwrap();
            backend.insert_entity("user", "k", &json!({"v": 1})).unwrap();
        }

        let backend = SqliteBackend::open(&StoreConfig::file(&path)).unwrap();
        assert_eq!(backend.get_entity("user", "k").unwrap(), Some(json!({"v": 1})));
    }

    #[test]
    fn test_corrupt_blob_is_storage_failure() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend
            .with_conn("seed_corruption", |conn| {
                conn.execute(
                    "INSERT INTO entities VALUES ('user', 'bad', 'not json', 0, 0)",
                    [],
                )
            })
            .unwrap();

        let err = backend.get_entity("user", "bad").unwrap_err();
        assert_eq!(err.kind(), claritydash_core::ExErrorKind::StorageFailure);
    }
}
