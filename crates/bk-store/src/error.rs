use std::path::PathBuf;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors surfaced by the local cache.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("[BK801] {key} not found in {table}")]
    NotInStore { table: &'static str, key: String },
    #[error("[BK802] local cache query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("[BK803] local cache value for {key} could not be decoded: {error}")]
    Codec { key: String, error: String },
    #[error("[BK804] could not prepare local cache at {}: {error}", path.display())]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn not_in_store(table: &'static str, key: impl Into<String>) -> Self {
        Self::NotInStore {
            table,
            key: key.into(),
        }
    }

    /// True for a cache miss; every other variant is a real failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotInStore { .. })
    }
}
