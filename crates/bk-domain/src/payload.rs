//! Payloads of the operations the client forwards without caching.

use std::collections::BTreeMap;

use ciborium::Value;
use serde::{Deserialize, Serialize};

use crate::block::BlockVersion;
use crate::delta::VersionTag;
use crate::reference::CellName;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub can_write: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub last_version: Option<BlockVersion>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub version: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub last_compatible: Option<String>,
}

/// Old name → new name between two times of a block.
pub type Renames = BTreeMap<CellName, CellName>;

/// A publication; the change set itself is opaque to this layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub parent: BlockVersion,
    pub tag: VersionTag,
    pub message: String,
    #[serde(default)]
    pub versiontag: Option<String>,
    pub changes: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinderRequest(pub Value);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinderResult(pub Value);
