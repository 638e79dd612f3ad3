//! Cache-first access to the registry.
//!
//! [`BlockApiProxy`] is the entry point callers use. Published artifacts of
//! STABLE versions are immutable and served from the local store once
//! cached. DEV versions may change on the server, so the first delta lookup
//! of a DEV version in a proxy's lifetime re-checks the server and drops
//! every cached artifact of the version when the delta moved.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::debug;

use bk_domain::{
    BlockDelta, BlockInfo, BlockName, BlockVersion, CellsSnapshot, DepTable, FinderRequest,
    FinderResult, PublishRequest, ReferencedResources, References, Renames, ServerInfo,
    VersionTime,
};
use bk_store::LocalDb;

use crate::api::{BlockApi, RemoteApi};
use crate::error::{ApiError, ErrorKind};
use crate::io::UserIo;

/// Outcome of a batch resource lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishedResources {
    pub resources: ReferencedResources,
    /// Requested references neither the store nor the server could resolve.
    pub missing: References,
}

/// Deltas already validated by one proxy.
#[derive(Debug, Default)]
pub struct DeltaMemo(HashMap<BlockVersion, BlockDelta>);

impl DeltaMemo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, version: &BlockVersion) -> Option<&BlockDelta> {
        self.0.get(version)
    }

    pub fn insert(&mut self, version: BlockVersion, delta: BlockDelta) {
        self.0.insert(version, delta);
    }

    pub fn forget(&mut self, version: &BlockVersion) {
        self.0.remove(version);
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

pub struct BlockApiProxy<R> {
    store: Rc<LocalDb>,
    remote: R,
    io: Rc<dyn UserIo>,
    memo: DeltaMemo,
    // only used to announce each block once
    retrieved_blocks: HashSet<BlockName>,
}

impl<R: RemoteApi> BlockApiProxy<R> {
    pub fn new(store: Rc<LocalDb>, remote: R, io: Rc<dyn UserIo>) -> Self {
        Self {
            store,
            remote,
            io,
            memo: DeltaMemo::new(),
            retrieved_blocks: HashSet::new(),
        }
    }

    #[must_use]
    pub fn remote(&self) -> &R {
        &self.remote
    }

    #[must_use]
    pub fn memo(&self) -> &DeltaMemo {
        &self.memo
    }

    /// Username remembered by the local store.
    pub fn user_name(&self) -> Result<Option<String>, ApiError> {
        Ok(self.store.get_username()?)
    }

    /// Delta of `version`, validated at most once per proxy.
    ///
    /// Lookup order is memo, local store, server. A cached DEV delta is
    /// re-checked against the server; if the server cannot be asked the
    /// cached one is kept with a warning.
    pub fn get_version_delta_info(
        &mut self,
        version: &BlockVersion,
    ) -> Result<Option<BlockDelta>, ApiError> {
        if !version.is_published() {
            return Ok(None);
        }
        if let Some(delta) = self.memo.get(version) {
            return Ok(Some(delta.clone()));
        }
        let delta = match self.store.get_delta_info(version) {
            Ok(cached) if cached.is_dev() => self.recheck_dev(version, cached)?,
            Ok(cached) => cached,
            Err(err) if err.is_not_found() => {
                let Some(delta) = self.remote.get_version_delta_info(version)? else {
                    return Ok(None);
                };
                if delta.is_dev() {
                    // snapshot or dep table left by an older run may be outdated
                    self.store.remove_dev_references(version)?;
                }
                self.store.upsert_delta_info(version, &delta)?;
                delta
            }
            Err(err) => return Err(err.into()),
        };
        self.memo.insert(version.clone(), delta.clone());
        Ok(Some(delta))
    }

    fn recheck_dev(
        &mut self,
        version: &BlockVersion,
        cached: BlockDelta,
    ) -> Result<BlockDelta, ApiError> {
        match self.remote.get_version_delta_info(version) {
            Ok(Some(fresh)) if fresh != cached => {
                debug!(%version, tag = %fresh.tag, "dev version changed on server");
                self.store.remove_dev_references(version)?;
                self.store.upsert_delta_info(version, &fresh)?;
                if fresh.is_dev() {
                    self.io
                        .info(&format!("Dev version of {version} has been updated"));
                }
                Ok(fresh)
            }
            Ok(_) => Ok(cached),
            Err(err) if err.is(ErrorKind::Connectivity) || err.is(ErrorKind::NotFound) => {
                self.io.warn(&format!(
                    "You depend on DEV version \"{version}\", \
                     but unable to check updates in server: {err}"
                ));
                Ok(cached)
            }
            Err(err) => Err(err),
        }
    }

    pub fn get_dep_table(&mut self, version: &BlockVersion) -> Result<Option<DepTable>, ApiError> {
        if self.get_version_delta_info(version)?.is_none() {
            return Ok(None);
        }
        match self.store.get_dep_table(version) {
            Ok(table) => Ok(Some(table)),
            Err(err) if err.is_not_found() => {
                let table = self.remote.get_dep_table(version)?;
                if let Some(table) = &table {
                    self.store.set_dep_table(version, table)?;
                }
                Ok(table)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn get_cells_snapshot(
        &mut self,
        version: &BlockVersion,
    ) -> Result<Option<CellsSnapshot>, ApiError> {
        if self.get_version_delta_info(version)?.is_none() {
            return Ok(None);
        }
        match self.store.get_cells_snapshot(version) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) if err.is_not_found() => {
                let snapshot = self.remote.get_cells_snapshot(version)?;
                if let Some(snapshot) = &snapshot {
                    self.store.create_cells_snapshot(version, snapshot)?;
                }
                Ok(snapshot)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Resolves `references` from the store, fetching only what it lacks.
    ///
    /// Versions deleted on the server and references nobody could resolve
    /// end up in [`PublishedResources::missing`]; a partial result is not an
    /// error.
    pub fn get_published_resources(
        &mut self,
        references: &References,
    ) -> Result<PublishedResources, ApiError> {
        let mut wanted = references.clone();
        for version in references.versions() {
            if !version.is_published() {
                wanted.remove(version);
                continue;
            }
            match self.get_version_delta_info(version) {
                Ok(_) => {}
                Err(err) if err.is(ErrorKind::NotFound) => {
                    self.io
                        .error(&format!("Block {version} has been deleted from server"));
                    wanted.remove(version);
                }
                Err(err) => return Err(err),
            }
        }

        let mut resources = self.store.get_published_resources(&wanted)?;
        let absent = wanted.difference(&resources);
        if !absent.is_empty() {
            debug!(count = absent.len(), "references not in local store");
            for version in absent.versions() {
                if self.retrieved_blocks.insert(version.block.clone()) {
                    self.io
                        .info(&format!("Downloading files from: {}", version.block));
                }
            }
            let fetched = match self.remote.get_published_resources(&absent) {
                Ok(fetched) => fetched,
                Err(err) if err.is(ErrorKind::NotFound) => {
                    debug!(error = %err, "server resolved none of the batch");
                    ReferencedResources::new()
                }
                Err(err) => return Err(err),
            };
            if !fetched.is_empty() {
                debug!(count = fetched.len(), "caching fetched resources");
                self.store.create_published_resources(&fetched)?;
                resources.merge(fetched);
            }
        }

        let missing = references.difference(&resources);
        if !missing.is_empty() {
            self.io.error(&format!(
                "The following files could not be retrieved: {missing}"
            ));
        }
        Ok(PublishedResources { resources, missing })
    }

    /// Compares cached deltas of `parents` with the server before a publish.
    ///
    /// Every mismatching parent loses its cached artifacts. With `publish`
    /// set, mismatches are fatal once all parents have been checked;
    /// otherwise they are only reported. Returns the mismatching versions.
    pub fn check_valid(
        &mut self,
        parents: &[BlockVersion],
        publish: bool,
    ) -> Result<Vec<BlockVersion>, ApiError> {
        let mut mismatched = Vec::new();
        for version in parents.iter().filter(|version| version.is_published()) {
            let cached = match self.store.get_delta_info(version) {
                Ok(cached) => cached,
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err.into()),
            };
            let current = match self.remote.get_version_delta_info(version) {
                Ok(current) => current,
                Err(err) if err.is(ErrorKind::NotFound) => None,
                Err(err) if publish => return Err(err),
                Err(err) => {
                    self.io
                        .warn(&format!("Unable to check {version} against server: {err}"));
                    continue;
                }
            };
            if current.as_ref() == Some(&cached) {
                continue;
            }
            debug!(%version, "cached delta differs from server");
            self.store.remove_dev_references(version)?;
            self.memo.forget(version);
            if publish {
                self.io.warn(&format!(
                    "Your ancestor {version} in cache doesn't match server one"
                ));
                self.io.warn(&format!(
                    "The block {} was probably deleted on server, the cache has been updated",
                    version.block
                ));
            } else {
                self.io.info(&format!("{version} updated in cache"));
            }
            mismatched.push(version.clone());
        }
        if publish && !mismatched.is_empty() {
            let listed: Vec<String> = mismatched.iter().map(ToString::to_string).collect();
            return Err(ApiError::new(
                ErrorKind::CacheMismatch,
                format!(
                    "There was a cache mismatch due to deleted blocks ({}). \
                     Review your changes or just retry",
                    listed.join(", ")
                ),
            ));
        }
        Ok(mismatched)
    }

    /// Server info, or `None` with a warning when the server is unreachable.
    pub fn probe_server_info(&mut self) -> Result<Option<ServerInfo>, ApiError> {
        match self.remote.get_server_info() {
            Ok(info) => Ok(Some(info)),
            Err(err) if err.is(ErrorKind::Connectivity) => {
                self.io
                    .warn(&format!("Unable to check server info: {err}"));
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn get_version_by_tag(
        &mut self,
        block: &BlockName,
        tag: &str,
    ) -> Result<BlockVersion, ApiError> {
        self.remote.get_version_by_tag(block, tag)
    }

    pub fn get_block_info(&mut self, block: &BlockName) -> Result<BlockInfo, ApiError> {
        self.remote.get_block_info(block)
    }

    pub fn get_renames(
        &mut self,
        block: &BlockName,
        from: VersionTime,
        to: VersionTime,
    ) -> Result<Renames, ApiError> {
        self.remote.get_renames(block, from, to)
    }

    pub fn publish(&mut self, request: &PublishRequest) -> Result<BlockVersion, ApiError> {
        self.remote.publish(request)
    }

    pub fn find(&mut self, request: &FinderRequest) -> Result<FinderResult, ApiError> {
        self.remote.find(request)
    }

    pub fn get_server_info(&mut self) -> Result<ServerInfo, ApiError> {
        self.remote.get_server_info()
    }

    pub fn require_auth(&mut self) -> Result<(), ApiError> {
        self.remote.require_auth()
    }

    pub fn authenticate(&mut self, user: &str, password: &str) -> Result<String, ApiError> {
        self.remote.authenticate(user, password)
    }
}
