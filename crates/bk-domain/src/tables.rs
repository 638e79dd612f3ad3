use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::block::{BlockName, BlockVersion};
use crate::reference::CellName;

/// File names of one version, in server order.
pub type CellsSnapshot = Vec<CellName>;

/// Versions a block version depends on, one per dependency block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepTable(BTreeMap<BlockName, BlockVersion>);

impl DepTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, version: BlockVersion) -> Option<BlockVersion> {
        self.0.insert(version.block.clone(), version)
    }

    #[must_use]
    pub fn get(&self, block: &BlockName) -> Option<&BlockVersion> {
        self.0.get(block)
    }

    pub fn versions(&self) -> impl Iterator<Item = &BlockVersion> {
        self.0.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<BlockVersion> for DepTable {
    fn from_iter<I: IntoIterator<Item = BlockVersion>>(iter: I) -> Self {
        let mut table = DepTable::new();
        for version in iter {
            table.insert(version);
        }
        table
    }
}
