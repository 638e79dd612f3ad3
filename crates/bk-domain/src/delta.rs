use std::fmt;

use serde::{Deserialize, Serialize};

/// Mutability class of a published version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VersionTag {
    /// May still change server-side.
    Dev,
    /// Durably immutable.
    Stable,
}

impl VersionTag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "DEV",
            Self::Stable => "STABLE",
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-supplied metadata of a version, compared to detect drift.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDelta {
    pub message: String,
    pub tag: VersionTag,
    /// Publication date, seconds since the epoch.
    #[serde(default)]
    pub date: Option<i64>,
    /// Optional human label such as `@v1.2`.
    #[serde(default)]
    pub versiontag: Option<String>,
}

impl BlockDelta {
    pub fn new(message: impl Into<String>, tag: VersionTag, date: Option<i64>) -> Self {
        Self {
            message: message.into(),
            tag,
            date,
            versiontag: None,
        }
    }

    #[must_use]
    pub fn is_dev(&self) -> bool {
        self.tag == VersionTag::Dev
    }
}
