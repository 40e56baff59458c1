//! Durable physical store over SQLite via rusqlite.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::physical::PhysicalStore;

/// One SQLite file holding a single `kv_store` table. All access goes
/// through a mutex; callers may share the store across threads.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path`. WAL journal mode is set at
    /// connection time; the schema is created if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        Self::init(conn)
    }

    /// Throwaway store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        // PRAGMA journal_mode returns the resulting mode as a row.
        conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv_store (
                 key TEXT PRIMARY KEY NOT NULL,
                 val TEXT NOT NULL
             );",
        )?;
        tracing::debug!("opened key-value table");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl PhysicalStore for SqliteStore {
    fn set_key_val(&self, key: &str, val: &str) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO kv_store (key, val) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET val = excluded.val",
            params![key, val],
        )?;
        Ok(())
    }

    fn get_key_val(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .lock()
            .query_row(
                "SELECT val FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn delete_key_val(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .lock()
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn get_all_keys(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn get_query_vals(
        &self,
        pattern: &str,
        limit: u64,
    ) -> Result<Vec<(String, String)>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT key, val FROM kv_store WHERE key LIKE ?1 ORDER BY key LIMIT ?2",
        )?;
        // SQLite treats a negative LIMIT as unlimited.
        let limit = if limit == 0 { -1 } else { limit as i64 };
        let rows = stmt
            .query_map(params![pattern, limit], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_query_one(&self, pattern: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .lock()
            .query_row(
                "SELECT val FROM kv_store WHERE key LIKE ?1 ORDER BY key LIMIT 1",
                params![pattern],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn get_query_count(&self, pattern: &str) -> Result<u64, StoreError> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM kv_store WHERE key LIKE ?1",
            params![pattern],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn purge(&self) -> Result<(), StoreError> {
        self.conn.lock().execute("DELETE FROM kv_store", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crud_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("test.kv.db")).unwrap();

        store.set_key_val("k1", "v1").unwrap();
        store.set_key_val("k1", "v2").unwrap();
        assert_eq!(store.get_key_val("k1").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.get_key_val("missing").unwrap(), None);

        store.delete_key_val("k1").unwrap();
        assert_eq!(store.get_key_val("k1").unwrap(), None);
        store.delete_key_val("k1").unwrap();
    }

    #[test]
    fn queries_and_limit() {
        let store = SqliteStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.set_key_val(&format!("item.{i}"), &format!("v{i}")).unwrap();
        }
        store.set_key_val("other", "x").unwrap();

        assert_eq!(store.get_query_count("item.%").unwrap(), 5);
        assert_eq!(store.get_query_vals("item.%", 2).unwrap().len(), 2);
        assert_eq!(store.get_query_vals("item.%", 0).unwrap().len(), 5);
        assert_eq!(
            store.get_query_one("item.%").unwrap().as_deref(),
            Some("v0")
        );
        assert_eq!(store.get_query_one("none.%").unwrap(), None);

        let keys = store.get_all_keys().unwrap();
        assert_eq!(keys.len(), 6);
        assert!(keys.contains(&"other".to_string()));
    }

    #[test]
    fn purge_clears_table() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set_key_val("a", "1").unwrap();
        store.purge().unwrap();
        assert!(store.get_all_keys().unwrap().is_empty());
    }
}
