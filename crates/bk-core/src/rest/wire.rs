//! CBOR request bodies and response envelopes.

use ciborium::Value;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use bk_domain::{BlockName, VersionTime};

use crate::api::{Call, Operation, Reply};
use crate::error::{ApiError, ErrorKind};

pub(crate) const CBOR_CONTENT_TYPE: &str = "application/cbor";

const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
struct Data<'a, T: ?Sized> {
    data: &'a T,
}

#[derive(Serialize)]
struct RenamesBody<'a> {
    block: &'a BlockName,
    t1: VersionTime,
    t2: VersionTime,
}

#[derive(Serialize)]
struct ClientInfo {
    os: &'static str,
    arch: &'static str,
    version: &'static str,
}

/// Severity of a message the server attaches to a reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum MessageLevel {
    Warn,
    Error,
    #[serde(other)]
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct ServerMessage {
    pub(crate) level: MessageLevel,
    pub(crate) text: String,
}

/// `{return, info}` wrapper of every CBOR reply.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(rename = "return", default)]
    pub(crate) value: Option<Value>,
    #[serde(default)]
    pub(crate) info: Vec<ServerMessage>,
}

fn to_cbor<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ApiError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).map_err(|err| {
        ApiError::new(
            ErrorKind::Service,
            format!("could not encode request: {err}"),
        )
    })?;
    Ok(bytes)
}

/// CBOR body of `call`, if its endpoint takes one.
pub(crate) fn request_body(call: &Call<'_>) -> Result<Option<Vec<u8>>, ApiError> {
    let bytes = match call {
        Call::GetPublishedResources(references) => to_cbor(&Data { data: *references })?,
        Call::Publish(request) => to_cbor(&Data { data: *request })?,
        Call::GetCellsSnapshot(version) => to_cbor(&Data { data: *version })?,
        Call::Find(request) => to_cbor(&Data { data: *request })?,
        Call::GetRenames { block, from, to } => to_cbor(&RenamesBody {
            block: *block,
            t1: *from,
            t2: *to,
        })?,
        Call::GetServerInfo => to_cbor(&Data {
            data: &ClientInfo {
                os: std::env::consts::OS,
                arch: std::env::consts::ARCH,
                version: CLIENT_VERSION,
            },
        })?,
        Call::RequireAuth
        | Call::GetDepTable(_)
        | Call::GetBlockInfo(_)
        | Call::Authenticate { .. }
        | Call::GetVersionDeltaInfo(_)
        | Call::GetVersionByTag { .. } => return Ok(None),
    };
    Ok(Some(bytes))
}

pub(crate) fn decode_envelope(bytes: &[u8]) -> Result<Envelope, ApiError> {
    ciborium::from_reader(bytes).map_err(|err| {
        ApiError::new(
            ErrorKind::Service,
            format!("malformed reply envelope: {err}"),
        )
    })
}

fn typed<T: DeserializeOwned>(operation: Operation, value: &Value) -> Result<T, ApiError> {
    value.deserialized().map_err(|err| {
        ApiError::new(
            ErrorKind::Service,
            format!("error handling server response to {operation}: {err}"),
        )
    })
}

/// Converts the `return` value of a successful reply into the operation's type.
pub(crate) fn decode_reply(operation: Operation, value: &Value) -> Result<Reply, ApiError> {
    Ok(match operation {
        Operation::GetPublishedResources => Reply::Resources(typed(operation, value)?),
        Operation::Publish | Operation::GetVersionByTag => {
            Reply::Version(typed(operation, value)?)
        }
        Operation::RequireAuth => Reply::Unit,
        Operation::GetDepTable => Reply::DepTable(typed(operation, value)?),
        Operation::GetCellsSnapshot => Reply::Snapshot(typed(operation, value)?),
        Operation::Find => Reply::Finder(typed(operation, value)?),
        Operation::GetRenames => Reply::Renames(typed(operation, value)?),
        Operation::GetBlockInfo => Reply::BlockInfo(typed(operation, value)?),
        Operation::GetServerInfo => Reply::ServerInfo(typed(operation, value)?),
        Operation::Authenticate => Reply::Token(typed(operation, value)?),
        Operation::GetVersionDeltaInfo => Reply::Delta(typed(operation, value)?),
    })
}

/// Human-readable rendering of an error body.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        Value::Null => String::new(),
        other => format!("{other:?}"),
    }
}
