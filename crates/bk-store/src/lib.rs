#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

//! Local SQLite cache backing the registry client.
//!
//! One database file holds:
//! - the single-row `login` table with the remembered credentials,
//! - key→blob tables for per-version artifacts (`snapshots`, `dep_tables`,
//!   `deltas`),
//! - deduplicated `cells` and `contents` keyed by their content ids,
//! - the `refs` index linking a reference to the cell/content pair it
//!   resolves to.
//!
//! Values are stored as CBOR, text-encoded; keys are the canonical keys of
//! the domain types.

mod artifacts;
mod blob;
pub mod codec;
mod db;
mod error;
mod login;
mod published;

pub use blob::{Table, MAX_BOUND_PARAMS};
pub use db::{LocalDb, StoreStats};
pub use error::{Result, StoreError};
pub use published::GarbageReport;
