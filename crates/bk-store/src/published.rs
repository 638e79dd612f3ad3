//! Deduplicated published cells and contents plus the reference index.

use std::collections::HashMap;

use rusqlite::{params, params_from_iter};
use tracing::{debug, warn};

use bk_domain::{
    CanonicalKey, Cell, Content, ContentId, Reference, ReferencedResources, References, Resource,
};

use crate::blob::{Table, MAX_BOUND_PARAMS};
use crate::codec::{from_stored, to_stored};
use crate::db::REFS_TABLE;
use crate::{LocalDb, Result};

/// Rows removed by [`LocalDb::collect_garbage`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GarbageReport {
    pub cells: usize,
    pub contents: usize,
}

impl LocalDb {
    /// Resolves whatever part of `references` is held locally.
    ///
    /// Names that are not stored are simply absent from the result; rows
    /// that no longer decode are logged and skipped.
    pub fn get_published_resources(
        &self,
        references: &References,
    ) -> Result<ReferencedResources> {
        let wanted: HashMap<String, Reference> = references
            .explode()
            .into_iter()
            .map(|reference| (reference.canonical_key(), reference))
            .collect();
        let keys: Vec<&String> = wanted.keys().collect();
        let mut found = ReferencedResources::new();
        for chunk in keys.chunks(MAX_BOUND_PARAMS) {
            let sql = format!(
                "SELECT r.reference, c.blob, ct.blob FROM {REFS_TABLE} r \
                 JOIN {cells} c ON r.cell_id = c.id \
                 LEFT JOIN {contents} ct ON r.content_id = ct.id \
                 WHERE r.reference IN ({})",
                vec!["?"; chunk.len()].join(", "),
                cells = Table::Cells.as_str(),
                contents = Table::Contents.as_str(),
            );
            let mut stmt = self.conn().prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?;
            for row in rows {
                let (key, cell, content) = row?;
                let Some(reference) = wanted.get(&key) else {
                    continue;
                };
                match decode_resource(&key, &cell, content.as_deref()) {
                    Ok(Some(resource)) => {
                        found.insert(reference.version.clone(), reference.cell.clone(), resource);
                    }
                    Ok(None) => warn!(reference = %key, "stored cell is empty, skipping"),
                    Err(err) => {
                        warn!(reference = %key, error = %err, "skipping undecodable resource");
                    }
                }
            }
        }
        debug!(requested = wanted.len(), found = found.len(), "local published resources");
        Ok(found)
    }

    /// Stores resources and links each reference to them in one transaction.
    ///
    /// Content goes first, then the cell, then the reference link. Content rows
    /// are keyed by the hash of their bytes whatever id the server sent, so
    /// identical bytes collapse onto one row.
    pub fn create_published_resources(&self, resources: &ReferencedResources) -> Result<()> {
        self.with_tx(|tx| {
            let mut put_content = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {} (id, blob) VALUES (?1, ?2)",
                Table::Contents.as_str()
            ))?;
            let mut put_cell = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {} (id, blob) VALUES (?1, ?2)",
                Table::Cells.as_str()
            ))?;
            let mut put_ref = tx.prepare(&format!(
                "INSERT OR REPLACE INTO {REFS_TABLE} (reference, version, cell_id, content_id) \
                 VALUES (?1, ?2, ?3, ?4)"
            ))?;
            for (reference, resource) in resources.explode() {
                let content_id = match &resource.content {
                    Some(content) => {
                        let content = addressed(content);
                        let id = content.id.canonical_key();
                        put_content.execute(params![id, to_stored(&id, &content)?])?;
                        Some(id)
                    }
                    None => None,
                };
                let cell_id = resource.cell.id.canonical_key();
                put_cell.execute(params![cell_id, to_stored(&cell_id, &resource.cell)?])?;
                put_ref.execute(params![
                    reference.canonical_key(),
                    reference.version.canonical_key(),
                    cell_id,
                    content_id,
                ])?;
            }
            Ok(())
        })?;
        debug!(count = resources.len(), "stored published resources");
        Ok(())
    }

    /// Deletes cells and contents that no reference links to.
    pub fn collect_garbage(&self) -> Result<GarbageReport> {
        let report = self.with_tx(|tx| {
            let cells = tx.execute(
                &format!(
                    "DELETE FROM {cells} WHERE NOT EXISTS \
                     (SELECT 1 FROM {REFS_TABLE} r WHERE r.cell_id = {cells}.id)",
                    cells = Table::Cells.as_str()
                ),
                [],
            )?;
            let contents = tx.execute(
                &format!(
                    "DELETE FROM {contents} WHERE NOT EXISTS \
                     (SELECT 1 FROM {REFS_TABLE} r WHERE r.content_id = {contents}.id)",
                    contents = Table::Contents.as_str()
                ),
                [],
            )?;
            Ok(GarbageReport { cells, contents })
        })?;
        debug!(cells = report.cells, contents = report.contents, "collected garbage");
        Ok(report)
    }
}

fn addressed(content: &Content) -> Content {
    let id = ContentId::of(content.blob.as_bytes());
    if id != content.id {
        debug!(sent = %content.id, derived = %id, "content id does not match its bytes");
    }
    Content {
        id,
        blob: content.blob.clone(),
    }
}

fn decode_resource(key: &str, cell: &str, content: Option<&str>) -> Result<Option<Resource>> {
    let Some(cell) = from_stored::<Cell>(key, cell)? else {
        return Ok(None);
    };
    let content = match content {
        Some(stored) => from_stored::<Content>(key, stored)?,
        None => None,
    };
    Ok(Some(Resource::new(cell, content)))
}
