use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::id::CanonicalKey;

const DEFAULT_BRANCH: &str = "master";
const UNPUBLISHED_MARKER: &str = "-";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid block name '{0}' (expected owner/name[/branch])")]
    BlockName(String),
    #[error("invalid block version '{0}' (expected owner/name[/branch]@time)")]
    BlockVersion(String),
}

/// Identity of a block: owner, block name and branch.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockName {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

impl BlockName {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            branch: branch.into(),
        }
    }

    #[must_use]
    pub fn version(&self, time: u64) -> BlockVersion {
        BlockVersion::new(self.clone(), VersionTime::At(time))
    }

    #[must_use]
    pub fn unpublished(&self) -> BlockVersion {
        BlockVersion::new(self.clone(), VersionTime::Unpublished)
    }
}

impl fmt::Display for BlockName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.name, self.branch)
    }
}

impl FromStr for BlockName {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.trim().split('/').collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(ParseError::BlockName(value.to_string()));
        }
        match parts.as_slice() {
            [owner, name] => Ok(Self::new(*owner, *name, DEFAULT_BRANCH)),
            [owner, name, branch] => Ok(Self::new(*owner, *name, *branch)),
            _ => Err(ParseError::BlockName(value.to_string())),
        }
    }
}

impl CanonicalKey for BlockName {
    fn canonical_key(&self) -> String {
        self.to_string()
    }
}

/// Position of a version on its branch.
///
/// Serialized as a signed ordinal where `-1` marks a version that has not
/// been published yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum VersionTime {
    Unpublished,
    At(u64),
}

impl From<i64> for VersionTime {
    fn from(value: i64) -> Self {
        u64::try_from(value).map_or(Self::Unpublished, Self::At)
    }
}

impl From<VersionTime> for i64 {
    fn from(value: VersionTime) -> Self {
        match value {
            VersionTime::Unpublished => -1,
            VersionTime::At(time) => i64::try_from(time).unwrap_or(i64::MAX),
        }
    }
}

impl fmt::Display for VersionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unpublished => f.write_str(UNPUBLISHED_MARKER),
            Self::At(time) => write!(f, "{time}"),
        }
    }
}

/// A specific revision of a block.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockVersion {
    pub block: BlockName,
    pub time: VersionTime,
}

impl BlockVersion {
    #[must_use]
    pub fn new(block: BlockName, time: VersionTime) -> Self {
        Self { block, time }
    }

    /// Unpublished versions are never fetched, cached or considered stale.
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self.time, VersionTime::At(_))
    }
}

impl fmt::Display for BlockVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.block, self.time)
    }
}

impl FromStr for BlockVersion {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::BlockVersion(value.to_string());
        let (block, time) = value.trim().rsplit_once('@').ok_or_else(invalid)?;
        let block: BlockName = block.parse().map_err(|_| invalid())?;
        let time = if time == UNPUBLISHED_MARKER {
            VersionTime::Unpublished
        } else {
            VersionTime::At(time.parse().map_err(|_| invalid())?)
        };
        Ok(Self::new(block, time))
    }
}

impl CanonicalKey for BlockVersion {
    fn canonical_key(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn parses_versions_with_default_branch() -> Result<()> {
        let version: BlockVersion = "dummy/block@3".parse()?;
        assert_eq!(version.block, BlockName::new("dummy", "block", "master"));
        assert_eq!(version.time, VersionTime::At(3));
        assert_eq!(version.canonical_key(), "dummy/block/master@3");

        let unpublished: BlockVersion = "dummy/block/dev@-".parse()?;
        assert!(!unpublished.is_published());
        assert_eq!(unpublished.to_string(), "dummy/block/dev@-");
        Ok(())
    }

    #[test]
    fn rejects_malformed_names() {
        assert!("dummy".parse::<BlockName>().is_err());
        assert!("a//b".parse::<BlockName>().is_err());
        assert!("dummy/block".parse::<BlockVersion>().is_err());
        assert!("dummy/block@x".parse::<BlockVersion>().is_err());
    }

    #[test]
    fn negative_ordinals_mean_unpublished() {
        assert_eq!(VersionTime::from(-1), VersionTime::Unpublished);
        assert_eq!(VersionTime::from(7), VersionTime::At(7));
        assert_eq!(i64::from(VersionTime::Unpublished), -1);
    }
}
