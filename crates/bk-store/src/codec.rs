//! Value encoding for stored blobs.
//!
//! `serialize` produces CBOR bytes, `encode` turns them into the text stored
//! in the database; `decode` is the exact inverse of `encode`, so
//! `decode(encode(serialize(x))) == serialize(x)`.

use base64::prelude::{Engine as _, BASE64_STANDARD_NO_PAD};
use ciborium::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).map_err(|err| err.to_string())?;
    Ok(bytes)
}

#[must_use]
pub fn encode(serialized: &[u8]) -> String {
    BASE64_STANDARD_NO_PAD.encode(serialized)
}

pub fn decode(encoded: &str) -> Result<Vec<u8>, String> {
    BASE64_STANDARD_NO_PAD
        .decode(encoded.as_bytes())
        .map_err(|err| err.to_string())
}

/// Deserializes CBOR bytes; a stored null decodes to `None`.
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>, String> {
    let value: Value = ciborium::from_reader(bytes).map_err(|err| err.to_string())?;
    if value.is_null() {
        return Ok(None);
    }
    value.deserialized().map(Some).map_err(|err| err.to_string())
}

pub(crate) fn to_stored<T: Serialize + ?Sized>(key: &str, value: &T) -> crate::Result<String> {
    serialize(value)
        .map(|bytes| encode(&bytes))
        .map_err(|error| crate::StoreError::Codec {
            key: key.to_string(),
            error,
        })
}

pub(crate) fn from_stored<T: DeserializeOwned>(
    key: &str,
    stored: &str,
) -> crate::Result<Option<T>> {
    decode(stored)
        .and_then(|bytes| deserialize(&bytes))
        .map_err(|error| crate::StoreError::Codec {
            key: key.to_string(),
            error,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use bk_domain::{BlockDelta, BlockName, Resource, VersionTag};

    #[test]
    fn decode_inverts_encode_exactly() -> Result<()> {
        let delta = BlockDelta::new("first", VersionTag::Dev, Some(1_400_000_000));
        let serialized = serialize(&delta).map_err(|e| anyhow!(e))?;
        let decoded = decode(&encode(&serialized)).map_err(|e| anyhow!(e))?;
        assert_eq!(decoded, serialized);
        let back: Option<BlockDelta> = deserialize(&decoded).map_err(|e| anyhow!(e))?;
        assert_eq!(back, Some(delta));
        Ok(())
    }

    #[test]
    fn binary_content_survives_storage_encoding() -> Result<()> {
        let resource = Resource::file("bin/blob.dat", vec![0_u8, 159, 146, 150, 255]);
        let stored = to_stored("k", &resource)?;
        let back: Option<Resource> = from_stored("k", &stored)?;
        assert_eq!(back, Some(resource));
        let version = BlockName::new("a", "b", "c").version(4);
        let stored = to_stored("k", &version)?;
        assert_eq!(from_stored("k", &stored)?, Some(version));
        Ok(())
    }

    #[test]
    fn stored_null_reads_as_nothing() -> Result<()> {
        let stored = to_stored("k", &Option::<BlockDelta>::None)?;
        let back: Option<BlockDelta> = from_stored("k", &stored)?;
        assert!(back.is_none());
        Ok(())
    }
}
