//! Generic key→blob table operations.

use std::collections::BTreeMap;

use rusqlite::{params, params_from_iter, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{from_stored, to_stored};
use crate::{LocalDb, Result, StoreError};

/// Upper bound of bound parameters per statement; SQLite builds may be
/// compiled with a limit as low as 999.
pub const MAX_BOUND_PARAMS: usize = 500;

/// Key→blob tables of the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    Cells,
    Contents,
    Snapshots,
    DepTables,
    Deltas,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Self::Contents,
        Self::Cells,
        Self::Snapshots,
        Self::DepTables,
        Self::Deltas,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cells => "cells",
            Self::Contents => "contents",
            Self::Snapshots => "snapshots",
            Self::DepTables => "dep_tables",
            Self::Deltas => "deltas",
        }
    }
}

#[derive(Clone, Copy)]
enum WriteMode {
    Insert,
    Upsert,
}

impl WriteMode {
    fn verb(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Upsert => "INSERT OR REPLACE",
        }
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

impl LocalDb {
    /// Inserts a new row; fails if the key already exists.
    pub fn create<T: Serialize + ?Sized>(&self, table: Table, key: &str, value: &T) -> Result<()> {
        self.write_one(table, key, value, WriteMode::Insert)
    }

    /// Replaces an existing row; fails with [`StoreError::NotInStore`] if absent.
    pub fn update<T: Serialize + ?Sized>(&self, table: Table, key: &str, value: &T) -> Result<()> {
        let stored = to_stored(key, value)?;
        let changed = self.conn().execute(
            &format!("UPDATE {} SET blob = ?1 WHERE id = ?2", table.as_str()),
            params![stored, key],
        )?;
        if changed == 0 {
            return Err(StoreError::not_in_store(table.as_str(), key));
        }
        Ok(())
    }

    pub fn upsert<T: Serialize + ?Sized>(&self, table: Table, key: &str, value: &T) -> Result<()> {
        self.write_one(table, key, value, WriteMode::Upsert)
    }

    /// Reads one row; absent rows and stored nulls are both a miss.
    pub fn read<T: DeserializeOwned>(&self, table: Table, key: &str) -> Result<T> {
        let stored: Option<String> = self
            .conn()
            .query_row(
                &format!("SELECT blob FROM {} WHERE id = ?1", table.as_str()),
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        let Some(stored) = stored else {
            return Err(StoreError::not_in_store(table.as_str(), key));
        };
        from_stored(key, &stored)?.ok_or_else(|| StoreError::not_in_store(table.as_str(), key))
    }

    /// Reads every present key; missing keys are simply absent from the result.
    pub fn read_multi<T: DeserializeOwned>(
        &self,
        table: Table,
        keys: &[String],
    ) -> Result<BTreeMap<String, T>> {
        let mut found = BTreeMap::new();
        for chunk in keys.chunks(MAX_BOUND_PARAMS) {
            let sql = format!(
                "SELECT id, blob FROM {} WHERE id IN ({})",
                table.as_str(),
                placeholders(chunk.len())
            );
            let mut stmt = self.conn().prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (key, stored) = row?;
                if let Some(value) = from_stored(&key, &stored)? {
                    found.insert(key, value);
                }
            }
        }
        Ok(found)
    }

    pub fn create_multi<T: Serialize>(&self, table: Table, rows: &[(String, T)]) -> Result<()> {
        self.write_multi(table, rows, WriteMode::Insert)
    }

    /// Replaces existing rows; fails without writing anything if any key is absent.
    pub fn update_multi<T: Serialize>(&self, table: Table, rows: &[(String, T)]) -> Result<()> {
        self.with_tx(|tx| {
            let sql = format!("UPDATE {} SET blob = ?1 WHERE id = ?2", table.as_str());
            let mut stmt = tx.prepare(&sql)?;
            for (key, value) in rows {
                let stored = to_stored(key, value)?;
                if stmt.execute(params![stored, key])? == 0 {
                    return Err(StoreError::not_in_store(table.as_str(), key.clone()));
                }
            }
            Ok(())
        })
    }

    pub fn upsert_multi<T: Serialize>(&self, table: Table, rows: &[(String, T)]) -> Result<()> {
        self.write_multi(table, rows, WriteMode::Upsert)
    }

    pub fn delete(&self, table: Table, key: &str) -> Result<()> {
        self.conn().execute(
            &format!("DELETE FROM {} WHERE id = ?1", table.as_str()),
            params![key],
        )?;
        Ok(())
    }

    pub fn delete_multi(&self, table: Table, keys: &[String]) -> Result<()> {
        self.with_tx(|tx| {
            for chunk in keys.chunks(MAX_BOUND_PARAMS) {
                let sql = format!(
                    "DELETE FROM {} WHERE id IN ({})",
                    table.as_str(),
                    placeholders(chunk.len())
                );
                tx.execute(&sql, params_from_iter(chunk.iter()))?;
            }
            Ok(())
        })
    }

    pub fn delete_all(&self, table: Table) -> Result<()> {
        self.conn()
            .execute(&format!("DELETE FROM {}", table.as_str()), [])?;
        Ok(())
    }

    fn write_one<T: Serialize + ?Sized>(
        &self,
        table: Table,
        key: &str,
        value: &T,
        mode: WriteMode,
    ) -> Result<()> {
        let stored = to_stored(key, value)?;
        self.conn().execute(
            &format!("{} INTO {} (id, blob) VALUES (?1, ?2)", mode.verb(), table.as_str()),
            params![key, stored],
        )?;
        Ok(())
    }

    fn write_multi<T: Serialize>(
        &self,
        table: Table,
        rows: &[(String, T)],
        mode: WriteMode,
    ) -> Result<()> {
        let encoded = rows
            .iter()
            .map(|(key, value)| Ok((key.clone(), to_stored(key, value)?)))
            .collect::<Result<Vec<(String, String)>>>()?;
        self.with_tx(|tx| {
            for chunk in encoded.chunks(MAX_BOUND_PARAMS / 2) {
                let values = vec!["(?, ?)"; chunk.len()].join(", ");
                let sql = format!(
                    "{} INTO {} (id, blob) VALUES {values}",
                    mode.verb(),
                    table.as_str()
                );
                let flat = chunk.iter().flat_map(|(key, stored)| [key, stored]);
                tx.execute(&sql, params_from_iter(flat))?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::new_db;
    use anyhow::Result;
    use bk_domain::{BlockDelta, VersionTag};

    fn delta(message: &str) -> BlockDelta {
        BlockDelta::new(message, VersionTag::Stable, None)
    }

    #[test]
    fn create_read_update_delete_cycle() -> Result<()> {
        let (_temp, db) = new_db()?;
        db.create(Table::Deltas, "k1", &delta("one"))?;
        assert!(
            db.create(Table::Deltas, "k1", &delta("dup")).is_err(),
            "create must not overwrite"
        );
        assert_eq!(db.read::<BlockDelta>(Table::Deltas, "k1")?, delta("one"));

        db.update(Table::Deltas, "k1", &delta("two"))?;
        assert_eq!(db.read::<BlockDelta>(Table::Deltas, "k1")?, delta("two"));
        let err = db
            .update(Table::Deltas, "absent", &delta("x"))
            .expect_err("update of a missing key");
        assert!(err.is_not_found());

        db.upsert(Table::Deltas, "k2", &delta("three"))?;
        db.delete(Table::Deltas, "k1")?;
        let err = db
            .read::<BlockDelta>(Table::Deltas, "k1")
            .expect_err("deleted row");
        assert!(err.is_not_found());
        assert_eq!(db.read::<BlockDelta>(Table::Deltas, "k2")?, delta("three"));
        Ok(())
    }

    #[test]
    fn null_values_read_as_missing() -> Result<()> {
        let (_temp, db) = new_db()?;
        db.upsert(Table::Deltas, "nothing", &Option::<BlockDelta>::None)?;
        let err = db
            .read::<BlockDelta>(Table::Deltas, "nothing")
            .expect_err("null must be a miss");
        assert!(err.is_not_found());
        Ok(())
    }

    #[test]
    fn multi_row_operations_cross_chunk_boundaries() -> Result<()> {
        let (_temp, db) = new_db()?;
        let total = MAX_BOUND_PARAMS * 3 + 7;
        let rows: Vec<(String, BlockDelta)> = (0..total)
            .map(|i| (format!("key-{i}"), delta(&format!("m{i}"))))
            .collect();
        db.create_multi(Table::Deltas, &rows)?;

        let keys: Vec<String> = rows.iter().map(|(key, _)| key.clone()).collect();
        let found: BTreeMap<String, BlockDelta> = db.read_multi(Table::Deltas, &keys)?;
        assert_eq!(found.len(), total);
        assert_eq!(found.get("key-1500"), Some(&delta("m1500")));

        let replaced: Vec<(String, BlockDelta)> = rows
            .iter()
            .map(|(key, _)| (key.clone(), delta("same")))
            .collect();
        db.upsert_multi(Table::Deltas, &replaced)?;
        db.update_multi(Table::Deltas, &replaced[..3])?;
        assert_eq!(db.read::<BlockDelta>(Table::Deltas, "key-0")?, delta("same"));

        db.delete_multi(Table::Deltas, &keys[..total - 1])?;
        let left: BTreeMap<String, BlockDelta> = db.read_multi(Table::Deltas, &keys)?;
        assert_eq!(left.len(), 1);

        db.delete_all(Table::Deltas)?;
        assert!(db.read_multi::<BlockDelta>(Table::Deltas, &keys)?.is_empty());
        Ok(())
    }

    #[test]
    fn update_multi_is_all_or_nothing() -> Result<()> {
        let (_temp, db) = new_db()?;
        db.create(Table::Deltas, "present", &delta("old"))?;
        let rows = vec![
            ("present".to_string(), delta("new")),
            ("absent".to_string(), delta("new")),
        ];
        assert!(db.update_multi(Table::Deltas, &rows).is_err());
        assert_eq!(db.read::<BlockDelta>(Table::Deltas, "present")?, delta("old"));
        Ok(())
    }
}
