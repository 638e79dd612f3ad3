//! Per-version artifacts: dependency tables, cell snapshots and deltas.

use rusqlite::params;
use tracing::debug;

use bk_domain::{BlockDelta, BlockVersion, CanonicalKey, CellsSnapshot, DepTable};

use crate::blob::Table;
use crate::db::REFS_TABLE;
use crate::{LocalDb, Result};

impl LocalDb {
    pub fn get_dep_table(&self, version: &BlockVersion) -> Result<DepTable> {
        self.read(Table::DepTables, &version.canonical_key())
    }

    pub fn set_dep_table(&self, version: &BlockVersion, table: &DepTable) -> Result<()> {
        self.upsert(Table::DepTables, &version.canonical_key(), table)
    }

    pub fn get_cells_snapshot(&self, version: &BlockVersion) -> Result<CellsSnapshot> {
        self.read(Table::Snapshots, &version.canonical_key())
    }

    pub fn create_cells_snapshot(
        &self,
        version: &BlockVersion,
        snapshot: &CellsSnapshot,
    ) -> Result<()> {
        self.create(Table::Snapshots, &version.canonical_key(), snapshot)
    }

    pub fn get_delta_info(&self, version: &BlockVersion) -> Result<BlockDelta> {
        self.read(Table::Deltas, &version.canonical_key())
    }

    pub fn upsert_delta_info(&self, version: &BlockVersion, delta: &BlockDelta) -> Result<()> {
        self.upsert(Table::Deltas, &version.canonical_key(), delta)
    }

    /// Forgets everything cached for `version`: snapshot, dependency table,
    /// delta and reference links, all or nothing.
    pub fn remove_dev_references(&self, version: &BlockVersion) -> Result<()> {
        let key = version.canonical_key();
        self.with_tx(|tx| {
            for table in [Table::Snapshots, Table::DepTables, Table::Deltas] {
                tx.execute(
                    &format!("DELETE FROM {} WHERE id = ?1", table.as_str()),
                    params![key],
                )?;
            }
            let links = tx.execute(
                &format!("DELETE FROM {REFS_TABLE} WHERE version = ?1"),
                params![key],
            )?;
            debug!(%version, links, "dropped cached artifacts");
            Ok(())
        })
    }
}
