use bk_domain::BlockName;
use url::Url;

use crate::api::{Call, Operation};
use crate::error::{ApiError, ErrorKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AuthMode {
    /// Bearer token when one is held, anonymous otherwise.
    Token,
    /// HTTP basic auth with the submitted username and password.
    Basic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Endpoint {
    pub(crate) method: Method,
    pub(crate) pattern: &'static str,
    pub(crate) auth: AuthMode,
}

const fn token(method: Method, pattern: &'static str) -> Endpoint {
    Endpoint {
        method,
        pattern,
        auth: AuthMode::Token,
    }
}

pub(crate) fn endpoint(operation: Operation) -> Endpoint {
    use Method::{Get, Post};
    match operation {
        Operation::GetPublishedResources => token(Post, "/get_published_resources"),
        Operation::Publish => token(Post, "/publish"),
        Operation::RequireAuth => token(Get, "/require_auth"),
        Operation::GetDepTable => token(
            Get,
            "/users/:user_name/blocks/:block_name/branches/:branch_name/versions/:version/block_version_table/",
        ),
        Operation::GetCellsSnapshot => token(Post, "/cells_snapshot"),
        Operation::Find => token(Post, "/finder_result"),
        Operation::GetRenames => token(Post, "/renames"),
        Operation::GetBlockInfo => token(
            Get,
            "/users/:user_name/blocks/:block_name/branches/:branch_name/info",
        ),
        Operation::GetServerInfo => token(Post, "/get_server_info"),
        Operation::Authenticate => Endpoint {
            method: Get,
            pattern: "/authenticate",
            auth: AuthMode::Basic,
        },
        Operation::GetVersionDeltaInfo => token(
            Get,
            "/users/:user_name/blocks/:block_name/branches/:branch_name/version/:version/delta_info",
        ),
        Operation::GetVersionByTag => token(
            Get,
            "/users/:user_name/blocks/:block_name/branches/:branch_name/tag/:tag",
        ),
    }
}

/// Values for the `:name` placeholders of a call's endpoint.
pub(crate) fn url_params(call: &Call<'_>) -> Vec<(&'static str, String)> {
    match call {
        Call::GetDepTable(version) | Call::GetVersionDeltaInfo(version) => {
            let mut params = block_params(&version.block);
            params.push(("version", version.time.to_string()));
            params
        }
        Call::GetBlockInfo(block) => block_params(*block),
        Call::GetVersionByTag { block, tag } => {
            let mut params = block_params(*block);
            params.push(("tag", (*tag).to_string()));
            params
        }
        _ => Vec::new(),
    }
}

fn block_params(block: &BlockName) -> Vec<(&'static str, String)> {
    vec![
        ("user_name", block.owner.clone()),
        ("block_name", block.name.clone()),
        ("branch_name", block.branch.clone()),
    ]
}

/// Substitutes every placeholder of `pattern` and joins it to `base`.
///
/// A `/:` left after substitution means a parameter was never supplied.
pub(crate) fn build_url(
    base: &str,
    pattern: &str,
    params: &[(&'static str, String)],
) -> Result<Url, ApiError> {
    let mut path = pattern.to_string();
    for (name, value) in params {
        path = path.replace(&format!(":{name}"), value);
    }
    let raw = format!("{base}{path}");
    if raw.contains("/:") {
        return Err(ApiError::new(
            ErrorKind::InvalidUrl,
            format!("unresolved placeholder in {raw}"),
        ));
    }
    Url::parse(&raw).map_err(|err| ApiError::new(ErrorKind::InvalidUrl, format!("{raw}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://registry.test/v1";

    #[test]
    fn placeholders_are_substituted_from_the_call() -> Result<(), ApiError> {
        let version = BlockName::new("maya", "lib", "dev").version(7);
        let call = Call::GetVersionDeltaInfo(&version);
        let pattern = endpoint(call.operation()).pattern;
        let url = build_url(BASE, pattern, &url_params(&call))?;
        assert_eq!(
            url.as_str(),
            "https://registry.test/v1/users/maya/blocks/lib/branches/dev/version/7/delta_info"
        );
        Ok(())
    }

    #[test]
    fn unfilled_placeholders_are_a_client_error() {
        let pattern = endpoint(Operation::GetBlockInfo).pattern;
        let err = build_url(BASE, pattern, &[("user_name", "maya".into())])
            .expect_err("block and branch are missing");
        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
    }

    #[test]
    fn only_authenticate_uses_basic_auth() {
        let all = [
            Operation::GetPublishedResources,
            Operation::Publish,
            Operation::RequireAuth,
            Operation::GetDepTable,
            Operation::GetCellsSnapshot,
            Operation::Find,
            Operation::GetRenames,
            Operation::GetBlockInfo,
            Operation::GetServerInfo,
            Operation::Authenticate,
            Operation::GetVersionDeltaInfo,
            Operation::GetVersionByTag,
        ];
        for operation in all {
            let expected = if operation == Operation::Authenticate {
                AuthMode::Basic
            } else {
                AuthMode::Token
            };
            assert_eq!(endpoint(operation).auth, expected, "{operation}");
        }
    }
}
