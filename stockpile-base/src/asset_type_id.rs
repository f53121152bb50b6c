use std::fmt;
use std::fmt::{Debug, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type tag for assets. The host engine defines what types exist; a value of
/// `None` where an `Option<AssetTypeId>` is accepted means "any type".
#[derive(Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetTypeId(pub u128);

impl AssetTypeId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        AssetTypeId(uuid.as_u128())
    }

    pub fn as_uuid(&self) -> Uuid {
        Uuid::from_u128(self.0)
    }
}

impl Debug for AssetTypeId {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> fmt::Result {
        f.debug_tuple("AssetTypeId")
            .field(&Uuid::from_u128(self.0))
            .finish()
    }
}
