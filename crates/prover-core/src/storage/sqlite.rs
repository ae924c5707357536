use crate::error::Error;
use rusqlite::{Connection, Result};
use tracing::{debug, info};

const SCHEMA_VERSION: i64 = 1;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, Error> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.migrate_schema()?;
        Ok(db)
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, foreign keys on)");
        Ok(())
    }

    /// Create the schema on a fresh database. Existing rows are history and
    /// are never dropped here; a database written by a newer build is refused.
    fn migrate_schema(&self) -> Result<(), Error> {
        let version: i64 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version > SCHEMA_VERSION {
            return Err(Error::UnsupportedSchema {
                found: version,
                supported: SCHEMA_VERSION,
            });
        }
        if version == SCHEMA_VERSION {
            debug!("SQLite schema is current (version {})", version);
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(include_str!("schema.sql"))?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION))?;
        tx.commit()?;
        info!(
            "SQLite schema upgraded from version {} to {}",
            version, SCHEMA_VERSION
        );
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn truncate_all(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM file_proving_result;
             DELETE FROM file_section;
             DELETE FROM section_status_data;
             DELETE FROM section_status;
             DELETE FROM section_category;
             DELETE FROM file;
             DELETE FROM directory;",
        )?;
        debug!("All tables truncated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn user_version(db: &Database) -> i64 {
        db.connection()
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_fresh_database_gets_current_version() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(user_version(&db), SCHEMA_VERSION);
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prover.db");
        let path = path.to_str().unwrap();
        {
            let db = Database::open(path).unwrap();
            db.connection()
                .execute(
                    "INSERT INTO directory (name, owner, created_at) VALUES ('a', 'alice', 'now')",
                    [],
                )
                .unwrap();
        }
        let db = Database::open(path).unwrap();
        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM directory", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(user_version(&db), SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_schema_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prover.db");
        let path = path.to_str().unwrap();
        Connection::open(path)
            .unwrap()
            .execute_batch("PRAGMA user_version = 99;")
            .unwrap();

        match Database::open(path) {
            Err(Error::UnsupportedSchema { found, supported }) => {
                assert_eq!(found, 99);
                assert_eq!(supported, SCHEMA_VERSION);
            }
            other => panic!("expected UnsupportedSchema, got {:?}", other.err()),
        }
    }
}
