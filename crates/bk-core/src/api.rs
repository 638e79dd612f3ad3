//! The operation set shared by the transport, the auth wrapper and mocks.
//!
//! Every remote capability goes through [`RemoteApi::invoke`]; the typed
//! helpers of [`BlockApi`] are written once on top of it, so decorators
//! only need to wrap a single method.

use std::fmt;

use bk_domain::{
    BlockDelta, BlockInfo, BlockName, BlockVersion, CellsSnapshot, DepTable, FinderRequest,
    FinderResult, PublishRequest, ReferencedResources, References, Renames, ServerInfo,
    VersionTime,
};

use crate::error::ApiError;

/// Logical remote operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    GetPublishedResources,
    Publish,
    RequireAuth,
    GetDepTable,
    GetCellsSnapshot,
    Find,
    GetRenames,
    GetBlockInfo,
    GetServerInfo,
    Authenticate,
    GetVersionDeltaInfo,
    GetVersionByTag,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetPublishedResources => "get_published_resources",
            Self::Publish => "publish",
            Self::RequireAuth => "require_auth",
            Self::GetDepTable => "get_dep_table",
            Self::GetCellsSnapshot => "get_cells_snapshot",
            Self::Find => "find",
            Self::GetRenames => "get_renames",
            Self::GetBlockInfo => "get_block_info",
            Self::GetServerInfo => "get_server_info",
            Self::Authenticate => "authenticate",
            Self::GetVersionDeltaInfo => "get_version_delta_info",
            Self::GetVersionByTag => "get_version_by_tag",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remote call with its arguments.
#[derive(Clone, Copy)]
pub enum Call<'a> {
    GetPublishedResources(&'a References),
    Publish(&'a PublishRequest),
    RequireAuth,
    GetDepTable(&'a BlockVersion),
    GetCellsSnapshot(&'a BlockVersion),
    Find(&'a FinderRequest),
    GetRenames {
        block: &'a BlockName,
        from: VersionTime,
        to: VersionTime,
    },
    GetBlockInfo(&'a BlockName),
    GetServerInfo,
    Authenticate {
        user: &'a str,
        password: &'a str,
    },
    GetVersionDeltaInfo(&'a BlockVersion),
    GetVersionByTag {
        block: &'a BlockName,
        tag: &'a str,
    },
}

impl Call<'_> {
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::GetPublishedResources(_) => Operation::GetPublishedResources,
            Self::Publish(_) => Operation::Publish,
            Self::RequireAuth => Operation::RequireAuth,
            Self::GetDepTable(_) => Operation::GetDepTable,
            Self::GetCellsSnapshot(_) => Operation::GetCellsSnapshot,
            Self::Find(_) => Operation::Find,
            Self::GetRenames { .. } => Operation::GetRenames,
            Self::GetBlockInfo(_) => Operation::GetBlockInfo,
            Self::GetServerInfo => Operation::GetServerInfo,
            Self::Authenticate { .. } => Operation::Authenticate,
            Self::GetVersionDeltaInfo(_) => Operation::GetVersionDeltaInfo,
            Self::GetVersionByTag { .. } => Operation::GetVersionByTag,
        }
    }
}

// Arguments may hold a password; only the operation is printed.
impl fmt::Debug for Call<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Call").field(&self.operation()).finish()
    }
}

/// Decoded result of a remote call.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Resources(ReferencedResources),
    Version(BlockVersion),
    Unit,
    DepTable(DepTable),
    Snapshot(CellsSnapshot),
    Finder(FinderResult),
    Renames(Renames),
    BlockInfo(BlockInfo),
    ServerInfo(ServerInfo),
    Token(String),
    Delta(BlockDelta),
}

impl Reply {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resources(_) => "resources",
            Self::Version(_) => "version",
            Self::Unit => "empty",
            Self::DepTable(_) => "dependency table",
            Self::Snapshot(_) => "snapshot",
            Self::Finder(_) => "finder",
            Self::Renames(_) => "renames",
            Self::BlockInfo(_) => "block info",
            Self::ServerInfo(_) => "server info",
            Self::Token(_) => "token",
            Self::Delta(_) => "delta",
        }
    }
}

/// Anything able to execute a [`Call`].
pub trait RemoteApi {
    fn invoke(&mut self, call: &Call<'_>) -> Result<Reply, ApiError>;
}

impl<T: RemoteApi + ?Sized> RemoteApi for &mut T {
    fn invoke(&mut self, call: &Call<'_>) -> Result<Reply, ApiError> {
        (**self).invoke(call)
    }
}

/// Identity state carried by a transport between calls.
pub trait Session {
    fn token(&self) -> Option<&str>;
    fn set_token(&mut self, token: Option<String>);
    /// Sets the machine fingerprint and claimed username sent on every call.
    fn set_identity(&mut self, fingerprint: &str, user: Option<&str>);
}

macro_rules! expect_reply {
    ($reply:expr, $variant:path, $operation:expr) => {
        match $reply {
            $variant(value) => Ok(value),
            other => Err(ApiError::unexpected_reply($operation, &other)),
        }
    };
}

/// Typed helpers over [`RemoteApi::invoke`].
///
/// Version-keyed lookups return `None` for unpublished versions without
/// issuing any call.
pub trait BlockApi: RemoteApi {
    fn get_published_resources(
        &mut self,
        references: &References,
    ) -> Result<ReferencedResources, ApiError> {
        let reply = self.invoke(&Call::GetPublishedResources(references))?;
        expect_reply!(reply, Reply::Resources, Operation::GetPublishedResources)
    }

    fn publish(&mut self, request: &PublishRequest) -> Result<BlockVersion, ApiError> {
        let reply = self.invoke(&Call::Publish(request))?;
        expect_reply!(reply, Reply::Version, Operation::Publish)
    }

    fn require_auth(&mut self) -> Result<(), ApiError> {
        match self.invoke(&Call::RequireAuth)? {
            Reply::Unit => Ok(()),
            other => Err(ApiError::unexpected_reply(Operation::RequireAuth, &other)),
        }
    }

    fn get_dep_table(&mut self, version: &BlockVersion) -> Result<Option<DepTable>, ApiError> {
        if !version.is_published() {
            return Ok(None);
        }
        let reply = self.invoke(&Call::GetDepTable(version))?;
        expect_reply!(reply, Reply::DepTable, Operation::GetDepTable).map(Some)
    }

    fn get_cells_snapshot(
        &mut self,
        version: &BlockVersion,
    ) -> Result<Option<CellsSnapshot>, ApiError> {
        if !version.is_published() {
            return Ok(None);
        }
        let reply = self.invoke(&Call::GetCellsSnapshot(version))?;
        expect_reply!(reply, Reply::Snapshot, Operation::GetCellsSnapshot).map(Some)
    }

    fn find(&mut self, request: &FinderRequest) -> Result<FinderResult, ApiError> {
        let reply = self.invoke(&Call::Find(request))?;
        expect_reply!(reply, Reply::Finder, Operation::Find)
    }

    fn get_renames(
        &mut self,
        block: &BlockName,
        from: VersionTime,
        to: VersionTime,
    ) -> Result<Renames, ApiError> {
        let reply = self.invoke(&Call::GetRenames { block, from, to })?;
        expect_reply!(reply, Reply::Renames, Operation::GetRenames)
    }

    fn get_block_info(&mut self, block: &BlockName) -> Result<BlockInfo, ApiError> {
        let reply = self.invoke(&Call::GetBlockInfo(block))?;
        expect_reply!(reply, Reply::BlockInfo, Operation::GetBlockInfo)
    }

    fn get_server_info(&mut self) -> Result<ServerInfo, ApiError> {
        let reply = self.invoke(&Call::GetServerInfo)?;
        expect_reply!(reply, Reply::ServerInfo, Operation::GetServerInfo)
    }

    /// Exchanges a username and password for a token.
    fn authenticate(&mut self, user: &str, password: &str) -> Result<String, ApiError> {
        let reply = self.invoke(&Call::Authenticate { user, password })?;
        expect_reply!(reply, Reply::Token, Operation::Authenticate)
    }

    fn get_version_delta_info(
        &mut self,
        version: &BlockVersion,
    ) -> Result<Option<BlockDelta>, ApiError> {
        if !version.is_published() {
            return Ok(None);
        }
        let reply = self.invoke(&Call::GetVersionDeltaInfo(version))?;
        expect_reply!(reply, Reply::Delta, Operation::GetVersionDeltaInfo).map(Some)
    }

    fn get_version_by_tag(
        &mut self,
        block: &BlockName,
        tag: &str,
    ) -> Result<BlockVersion, ApiError> {
        let reply = self.invoke(&Call::GetVersionByTag { block, tag })?;
        expect_reply!(reply, Reply::Version, Operation::GetVersionByTag)
    }
}

impl<T: RemoteApi + ?Sized> BlockApi for T {}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, VecDeque};

    use super::*;
    use crate::error::ErrorKind;

    /// In-memory remote answering from per-operation scripts.
    ///
    /// Each operation pops its next scripted answer; an empty script falls
    /// back to the operation's sticky default, if one was set.
    #[derive(Default)]
    pub(crate) struct MockRemote {
        scripts: HashMap<Operation, VecDeque<Result<Reply, ErrorKind>>>,
        defaults: HashMap<Operation, Result<Reply, ErrorKind>>,
        pub(crate) calls: Vec<Operation>,
        pub(crate) token: Option<String>,
        pub(crate) identities: Vec<(String, Option<String>)>,
        pub(crate) credentials_seen: Vec<(String, String)>,
    }

    impl MockRemote {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn push(&mut self, operation: Operation, answer: Result<Reply, ErrorKind>) {
            self.scripts.entry(operation).or_default().push_back(answer);
        }

        pub(crate) fn always(&mut self, operation: Operation, answer: Result<Reply, ErrorKind>) {
            self.defaults.insert(operation, answer);
        }

        pub(crate) fn count(&self, operation: Operation) -> usize {
            self.calls.iter().filter(|op| **op == operation).count()
        }
    }

    impl RemoteApi for MockRemote {
        fn invoke(&mut self, call: &Call<'_>) -> Result<Reply, ApiError> {
            let operation = call.operation();
            self.calls.push(operation);
            if let Call::Authenticate { user, password } = call {
                self.credentials_seen
                    .push(((*user).to_string(), (*password).to_string()));
            }
            let answer = self
                .scripts
                .get_mut(&operation)
                .and_then(VecDeque::pop_front)
                .or_else(|| self.defaults.get(&operation).cloned())
                .unwrap_or(Err(ErrorKind::Service));
            answer.map_err(|kind| ApiError::new(kind, format!("scripted {operation} failure")))
        }
    }

    impl Session for MockRemote {
        fn token(&self) -> Option<&str> {
            self.token.as_deref()
        }

        fn set_token(&mut self, token: Option<String>) {
            self.token = token;
        }

        fn set_identity(&mut self, fingerprint: &str, user: Option<&str>) {
            self.identities
                .push((fingerprint.to_string(), user.map(ToOwned::to_owned)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockRemote;
    use super::*;
    use crate::error::ErrorKind;
    use bk_domain::VersionTag;

    #[test]
    fn unpublished_versions_never_reach_the_remote() -> Result<(), ApiError> {
        let mut remote = MockRemote::new();
        let draft = BlockName::new("dummy", "block", "master").unpublished();
        assert_eq!(remote.get_dep_table(&draft)?, None);
        assert_eq!(remote.get_cells_snapshot(&draft)?, None);
        assert_eq!(remote.get_version_delta_info(&draft)?, None);
        assert!(remote.calls.is_empty());
        Ok(())
    }

    #[test]
    fn typed_helpers_reject_mismatched_replies() {
        let mut remote = MockRemote::new();
        remote.push(Operation::GetBlockInfo, Ok(Reply::Unit));
        let err = remote
            .get_block_info(&BlockName::new("dummy", "block", "master"))
            .expect_err("wrong reply variant");
        assert_eq!(err.kind(), ErrorKind::Service);
    }

    #[test]
    fn typed_helpers_unwrap_matching_replies() -> Result<(), ApiError> {
        let mut remote = MockRemote::new();
        let delta = BlockDelta::new("msg", VersionTag::Stable, None);
        remote.push(Operation::GetVersionDeltaInfo, Ok(Reply::Delta(delta.clone())));
        let version = BlockName::new("dummy", "block", "master").version(2);
        assert_eq!(remote.get_version_delta_info(&version)?, Some(delta));
        assert_eq!(remote.count(Operation::GetVersionDeltaInfo), 1);
        Ok(())
    }

    #[test]
    fn call_debug_hides_arguments() {
        let call = Call::Authenticate {
            user: "pepe",
            password: "hunter2",
        };
        let rendered = format!("{call:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("Authenticate"));
    }
}
