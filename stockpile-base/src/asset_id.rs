use std::fmt;
use std::fmt::{Debug, Formatter};

use serde::de::Visitor;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Engine-level unique identifier of a loaded asset. The host engine assigns these; the
/// pool uses them as the secondary index.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct AssetId(pub u128);

impl AssetId {
    pub const fn null() -> Self {
        AssetId(0)
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        AssetId(uuid.as_u128())
    }

    pub fn as_uuid(&self) -> Uuid {
        Uuid::from_u128(self.0)
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn from_u128(u: u128) -> Self {
        Self(u)
    }

    pub fn as_u128(&self) -> u128 {
        self.0
    }
}

impl Debug for AssetId {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> fmt::Result {
        f.debug_tuple("AssetId")
            .field(&Uuid::from_u128(self.0))
            .finish()
    }
}

impl fmt::Display for AssetId {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", Uuid::from_u128(self.0))
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&Uuid::from_u128(self.0).to_string())
        } else {
            Uuid::from_u128(self.0).serialize(serializer)
        }
    }
}

struct AssetIdVisitor;

impl<'a> Visitor<'a> for AssetIdVisitor {
    type Value = AssetId;

    fn expecting(
        &self,
        fmt: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(fmt, "a UUID-formatted string")
    }

    fn visit_str<E: de::Error>(
        self,
        s: &str,
    ) -> Result<Self::Value, E> {
        uuid::Uuid::parse_str(s)
            .map(|id| AssetId(id.as_u128()))
            .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(s), &self))
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_string(AssetIdVisitor)
        } else {
            Ok(AssetId(Uuid::deserialize(deserializer)?.as_u128()))
        }
    }
}
