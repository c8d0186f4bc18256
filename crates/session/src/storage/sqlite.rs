// SQLite-backed key-value storage: a single `kv` table in a local database file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::{entry_size, KeyValueStore, StorageError};

const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE kv (
    key     TEXT PRIMARY KEY,
    value   TEXT NOT NULL
);
"#;

const MIGRATIONS: &[(i64, &str)] = &[(1, MIGRATION_V1_SQL)];

#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
    quota_bytes: Option<usize>,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create storage parent directory `{}`", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open storage at `{}`", path.display()))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory storage")?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .context("failed to configure sqlite pragmas for storage")?;
        ensure_migration_table(&conn)?;
        apply_pending_migrations(&mut conn)?;
        Ok(Self { conn, quota_bytes: None })
    }

    /// Reject writes once keys + values exceed `bytes`.
    pub fn with_quota(mut self, bytes: Option<usize>) -> Self {
        self.quota_bytes = bytes;
        self
    }

    pub fn schema_version(&self) -> Result<i64> {
        current_schema_version(&self.conn)
    }

    fn used_bytes(&self) -> Result<usize, StorageError> {
        let used: i64 = self
            .conn
            .query_row(
                "SELECT COALESCE(SUM(length(CAST(key AS BLOB)) + length(CAST(value AS BLOB))), 0) \
                 FROM kv",
                [],
                |row| row.get(0),
            )
            .map_err(backend)?;
        Ok(used.max(0) as usize)
    }
}

impl KeyValueStore for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(backend)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(limit) = self.quota_bytes {
            let previous = self.get(key)?.map(|old| entry_size(key, &old)).unwrap_or(0);
            let next_used = self.used_bytes()? - previous + entry_size(key, value);
            if next_used > limit {
                return Err(StorageError::QuotaExceeded { limit });
            }
        }

        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(backend)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key]).map_err(backend)?;
        Ok(())
    }

    fn len(&self) -> Result<usize, StorageError> {
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0)).map_err(backend)?;
        Ok(count.max(0) as usize)
    }

    fn key_at(&self, index: usize) -> Result<Option<String>, StorageError> {
        self.conn
            .query_row(
                "SELECT key FROM kv ORDER BY key ASC LIMIT 1 OFFSET ?1",
                params![index as i64],
                |row| row.get(0),
            )
            .optional()
            .map_err(backend)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        // Range scan instead of LIKE so `%` and `_` in a prefix stay literal.
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv WHERE key >= ?1 ORDER BY key ASC")
            .map_err(backend)?;
        let rows = stmt.query_map(params![prefix], |row| row.get::<_, String>(0)).map_err(backend)?;

        let mut keys = Vec::new();
        for row in rows {
            let key = row.map_err(backend)?;
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key);
        }
        Ok(keys)
    }
}

fn backend(error: rusqlite::Error) -> StorageError {
    StorageError::Backend(error.to_string())
}

fn ensure_migration_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            applied_at  TEXT NOT NULL
        );
        ",
    )
    .context("failed to ensure schema_migrations table exists")
}

fn current_schema_version(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| row.get(0))
        .context("failed to read current schema version")
}

fn apply_pending_migrations(conn: &mut Connection) -> Result<()> {
    let mut current_version = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current_version {
            continue;
        }

        let tx = conn.transaction().context("failed to start migration transaction")?;
        tx.execute_batch(sql)
            .with_context(|| format!("failed to apply storage migration v{version}"))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
            params![version],
        )
        .with_context(|| format!("failed to record migration v{version}"))?;
        tx.commit().with_context(|| format!("failed to commit migration v{version}"))?;
        current_version = *version;
    }

    Ok(())
}
