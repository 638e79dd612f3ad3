#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

//! Value types shared by the registry access layer.
//!
//! Everything here is plain data: identities of blocks and versions, the
//! per-version artifacts the client caches, and the content-addressed
//! resources references resolve to. Each type that is used as a storage key
//! exposes exactly one deterministic [`CanonicalKey`] encoding.

pub mod block;
pub mod credentials;
pub mod delta;
pub mod id;
pub mod payload;
pub mod reference;
pub mod resource;
pub mod tables;

pub use block::{BlockName, BlockVersion, ParseError, VersionTime};
pub use credentials::Credentials;
pub use delta::{BlockDelta, VersionTag};
pub use id::{CanonicalKey, ContentId};
pub use payload::{BlockInfo, FinderRequest, FinderResult, PublishRequest, Renames, ServerInfo};
pub use reference::{CellName, Reference, ReferencedResources, References};
pub use resource::{Blob, Cell, CellKind, Content, Resource};
pub use tables::{CellsSnapshot, DepTable};
