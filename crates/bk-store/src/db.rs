//! SQLite connection, schema and maintenance helpers.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, Transaction};
use tracing::debug;

use crate::blob::Table;
use crate::{Result, StoreError};

pub(crate) const LOGIN_TABLE: &str = "login";
pub(crate) const LOGIN_ROW_ID: &str = "login";
pub(crate) const REFS_TABLE: &str = "refs";

/// Handle to the local cache database.
///
/// The connection is opened once and kept for the life of the handle; one
/// handle per database file per command is assumed.
pub struct LocalDb {
    path: PathBuf,
    conn: Connection,
}

/// Row counts per cache table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub cells: u64,
    pub contents: u64,
    pub references: u64,
    pub snapshots: u64,
    pub dep_tables: u64,
    pub deltas: u64,
}

impl LocalDb {
    /// Opens (creating if needed) the database at `path` and ensures the schema.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|error| StoreError::Io {
                path: parent.to_path_buf(),
                error,
            })?;
        }
        let conn = Connection::open(&path)?;
        conn.busy_timeout(Duration::from_secs(10))?;
        let db = Self { path, conn };
        db.init_schema()?;
        debug!(path = %db.path.display(), "opened local cache");
        Ok(db)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Runs `f` inside one transaction, committing only if it succeeds.
    pub(crate) fn with_tx<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.pragma_update(None, "auto_vacuum", "INCREMENTAL")?;
        for table in Table::ALL {
            self.conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {} (id TEXT UNIQUE, blob BLOB);",
                table.as_str()
            ))?;
        }
        self.conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS login (
                id TEXT UNIQUE,
                username TEXT,
                token TEXT
            );
            CREATE TABLE IF NOT EXISTS refs (
                reference TEXT UNIQUE,
                version TEXT NOT NULL,
                cell_id TEXT NOT NULL,
                content_id TEXT
            );
            CREATE INDEX IF NOT EXISTS cell_id_index ON refs (cell_id);
            CREATE INDEX IF NOT EXISTS content_id_index ON refs (content_id);
            CREATE INDEX IF NOT EXISTS version_index ON refs (version);
            ",
        )?;
        Ok(())
    }

    /// Drops every cached artifact; the username survives, the token does not.
    pub fn clean(&self) -> Result<()> {
        for table in Table::ALL {
            self.delete_all(table)?;
        }
        self.conn
            .execute(&format!("DELETE FROM {REFS_TABLE}"), [])?;
        let login = self.get_login()?;
        self.set_login(&login.without_token())?;
        self.vacuum()?;
        debug!("local cache cleaned");
        Ok(())
    }

    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute_batch("VACUUM;")?;
        Ok(())
    }

    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            cells: self.count(Table::Cells.as_str())?,
            contents: self.count(Table::Contents.as_str())?,
            references: self.count(REFS_TABLE)?,
            snapshots: self.count(Table::Snapshots.as_str())?,
            dep_tables: self.count(Table::DepTables.as_str())?,
            deltas: self.count(Table::Deltas.as_str())?,
        })
    }

    fn count(&self, table: &str) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

impl std::fmt::Debug for LocalDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDb").field("path", &self.path).finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::Result;
    use bk_domain::{BlockName, Credentials, DepTable, Resource};
    use tempfile::{tempdir, TempDir};

    pub(crate) fn new_db() -> Result<(TempDir, LocalDb)> {
        let temp = tempdir()?;
        let db = LocalDb::open(temp.path().join("nested").join("bk.db"))?;
        Ok((temp, db))
    }

    #[test]
    fn creates_schema_and_parent_directories() -> Result<()> {
        let (temp, db) = new_db()?;
        assert!(temp.path().join("nested").join("bk.db").is_file());
        assert_eq!(db.stats()?, StoreStats::default());
        let index_count: i64 = db.conn().query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = 'refs'",
            [],
            |row| row.get(0),
        )?;
        assert!(index_count >= 3, "expected reverse-lookup indexes on refs");
        Ok(())
    }

    #[test]
    fn reopening_keeps_existing_rows() -> Result<()> {
        let temp = tempdir()?;
        let path = temp.path().join("bk.db");
        let version = BlockName::new("dummy", "block", "master").version(1);
        {
            let db = LocalDb::open(&path)?;
            db.set_dep_table(&version, &DepTable::new())?;
        }
        let db = LocalDb::open(&path)?;
        assert_eq!(db.get_dep_table(&version)?, DepTable::new());
        Ok(())
    }

    #[test]
    fn clean_keeps_username_but_drops_token_and_artifacts() -> Result<()> {
        let (_temp, db) = new_db()?;
        let version = BlockName::new("dummy", "block", "master").version(0);
        db.set_login(&Credentials::new("pepe", Some("token".into())))?;
        db.set_dep_table(&version, &DepTable::new())?;
        let mut resources = bk_domain::ReferencedResources::new();
        resources.insert(version.clone(), "alf.c", Resource::file("alf.c", "Hello Alf"));
        db.create_published_resources(&resources)?;

        db.clean()?;

        assert_eq!(db.get_login()?, Credentials::new("pepe", None));
        assert_eq!(db.stats()?, StoreStats::default());
        assert!(db.get_dep_table(&version).is_err());
        Ok(())
    }
}
