use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::id::ContentId;
use crate::reference::CellName;

/// Raw bytes of a published file.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Blob(Vec<u8>);

impl Blob {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
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

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.0.len())
    }
}

impl Serialize for Blob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Blob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BlobVisitor;

        impl<'de> Visitor<'de> for BlobVisitor {
            type Value = Blob;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a byte string")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Blob, E> {
                Ok(Blob(v.to_vec()))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Blob, E> {
                Ok(Blob(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Blob, E> {
                Ok(Blob(v.as_bytes().to_vec()))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Blob, A::Error> {
                let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(byte) = seq.next_element::<u8>()? {
                    bytes.push(byte);
                }
                Ok(Blob(bytes))
            }
        }

        deserializer.deserialize_byte_buf(BlobVisitor)
    }
}

/// Metadata flavour of a cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CellKind {
    /// A concrete file with content.
    Simple {
        #[serde(default)]
        content_type: Option<String>,
    },
    /// A name that resolves to one of several concrete cells; has no content.
    Virtual { targets: Vec<CellName> },
}

/// Published cell metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub id: ContentId,
    pub name: CellName,
    pub kind: CellKind,
}

impl Cell {
    /// Builds a cell whose id is derived from its metadata.
    #[must_use]
    pub fn new(name: CellName, kind: CellKind) -> Self {
        let id = ContentId::of(Self::metadata_bytes(&name, &kind).as_bytes());
        Self { id, name, kind }
    }

    #[must_use]
    pub fn simple(name: impl Into<CellName>) -> Self {
        Self::new(name.into(), CellKind::Simple { content_type: None })
    }

    #[must_use]
    pub fn virtual_cell(name: impl Into<CellName>, targets: Vec<CellName>) -> Self {
        Self::new(name.into(), CellKind::Virtual { targets })
    }

    #[must_use]
    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, CellKind::Virtual { .. })
    }

    fn metadata_bytes(name: &CellName, kind: &CellKind) -> String {
        match kind {
            CellKind::Simple { content_type } => {
                format!("simple\0{name}\0{}", content_type.as_deref().unwrap_or(""))
            }
            CellKind::Virtual { targets } => {
                let joined: Vec<&str> = targets.iter().map(CellName::as_str).collect();
                format!("virtual\0{name}\0{}", joined.join("\0"))
            }
        }
    }
}

/// File bytes keyed by their content id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: ContentId,
    pub blob: Blob,
}

impl Content {
    #[must_use]
    pub fn new(blob: Blob) -> Self {
        Self {
            id: ContentId::of(blob.as_bytes()),
            blob,
        }
    }
}

/// What a reference resolves to: the cell plus its content, if concrete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub cell: Cell,
    pub content: Option<Content>,
}

impl Resource {
    #[must_use]
    pub fn new(cell: Cell, content: Option<Content>) -> Self {
        Self { cell, content }
    }

    /// A simple cell with the given bytes.
    #[must_use]
    pub fn file(name: impl Into<CellName>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(Cell::simple(name), Some(Content::new(Blob::new(bytes))))
    }
}
