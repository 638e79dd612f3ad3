use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::block::BlockVersion;
use crate::id::CanonicalKey;
use crate::resource::Resource;

/// Path of a file inside a block.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellName(String);

impl CellName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CellName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CellName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CellName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pointer to one file of one version.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub version: BlockVersion,
    pub cell: CellName,
}

impl Reference {
    #[must_use]
    pub fn new(version: BlockVersion, cell: CellName) -> Self {
        Self { version, cell }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.version, self.cell)
    }
}

impl CanonicalKey for Reference {
    fn canonical_key(&self) -> String {
        format!("{}:{}", self.version.canonical_key(), self.cell)
    }
}

/// Requested file names grouped by version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct References(BTreeMap<BlockVersion, BTreeSet<CellName>>);

impl References {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, version: BlockVersion, cell: impl Into<CellName>) {
        self.0.entry(version).or_default().insert(cell.into());
    }

    pub fn extend<I, C>(&mut self, version: &BlockVersion, cells: I)
    where
        I: IntoIterator<Item = C>,
        C: Into<CellName>,
    {
        let entry = self.0.entry(version.clone()).or_default();
        entry.extend(cells.into_iter().map(Into::into));
    }

    pub fn remove(&mut self, version: &BlockVersion) -> Option<BTreeSet<CellName>> {
        self.0.remove(version)
    }

    #[must_use]
    pub fn get(&self, version: &BlockVersion) -> Option<&BTreeSet<CellName>> {
        self.0.get(version)
    }

    pub fn versions(&self) -> impl Iterator<Item = &BlockVersion> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlockVersion, &BTreeSet<CellName>)> {
        self.0.iter()
    }

    /// One [`Reference`] per requested file.
    #[must_use]
    pub fn explode(&self) -> Vec<Reference> {
        self.0
            .iter()
            .flat_map(|(version, cells)| {
                cells
                    .iter()
                    .map(move |cell| Reference::new(version.clone(), cell.clone()))
            })
            .collect()
    }

    /// Number of individual file references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Requested names that `found` does not hold, per version.
    #[must_use]
    pub fn difference(&self, found: &ReferencedResources) -> References {
        let mut missing = References::new();
        for (version, cells) in &self.0 {
            let held = found.0.get(version);
            let absent: BTreeSet<CellName> = cells
                .iter()
                .filter(|cell| held.is_none_or(|resources| !resources.contains_key(*cell)))
                .cloned()
                .collect();
            if !absent.is_empty() {
                missing.0.insert(version.clone(), absent);
            }
        }
        missing
    }
}

impl fmt::Display for References {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.explode().iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join(", "))
    }
}

impl FromIterator<Reference> for References {
    fn from_iter<I: IntoIterator<Item = Reference>>(iter: I) -> Self {
        let mut refs = References::new();
        for reference in iter {
            refs.insert(reference.version, reference.cell);
        }
        refs
    }
}

/// Resolved resources grouped by version and file name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferencedResources(BTreeMap<BlockVersion, BTreeMap<CellName, Resource>>);

impl ReferencedResources {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, version: BlockVersion, cell: impl Into<CellName>, resource: Resource) {
        self.0
            .entry(version)
            .or_default()
            .insert(cell.into(), resource);
    }

    #[must_use]
    pub fn get(&self, version: &BlockVersion, cell: &CellName) -> Option<&Resource> {
        self.0.get(version).and_then(|cells| cells.get(cell))
    }

    #[must_use]
    pub fn version(&self, version: &BlockVersion) -> Option<&BTreeMap<CellName, Resource>> {
        self.0.get(version)
    }

    /// Every (reference, resource) pair.
    pub fn explode(&self) -> impl Iterator<Item = (Reference, &Resource)> {
        self.0.iter().flat_map(|(version, cells)| {
            cells.iter().map(move |(cell, resource)| {
                (Reference::new(version.clone(), cell.clone()), resource)
            })
        })
    }

    /// Consumes `other`, keeping existing entries where both hold a name.
    pub fn merge(&mut self, other: ReferencedResources) {
        for (version, cells) in other.0 {
            let entry = self.0.entry(version).or_default();
            for (cell, resource) in cells {
                entry.entry(cell).or_insert(resource);
            }
        }
    }

    #[must_use]
    pub fn references(&self) -> References {
        self.explode().map(|(reference, _)| reference).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
