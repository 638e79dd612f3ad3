#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

//! Authenticated, caching access to the block registry.
//!
//! Layers, outermost first:
//! - [`BlockApiProxy`] serves artifacts from the local store and keeps DEV
//!   versions coherent with the server,
//! - [`AuthManager`] upgrades anonymous calls to authenticated ones,
//! - [`RestClient`] speaks CBOR over HTTP to `<server>/v1`.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
mod fingerprint;
pub mod io;
pub(crate) mod net;
pub mod proxy;
pub mod rest;

pub use api::{BlockApi, Call, Operation, RemoteApi, Reply, Session};
pub use auth::{AuthManager, LoginStore, LOGIN_RETRIES};
pub use config::{Config, NetworkConfig, DEFAULT_HTTP_TIMEOUT, DEFAULT_SERVER_URL};
pub use error::{ApiError, ErrorKind};
pub use fingerprint::machine_fingerprint;
pub use io::UserIo;
pub use proxy::{BlockApiProxy, DeltaMemo, PublishedResources};
pub use rest::RestClient;
