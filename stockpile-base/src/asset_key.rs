use std::fmt;

use serde::{Deserialize, Serialize};

/// Key identifying an asset by its bundle name and bundle-relative path.
///
/// This is the primary pool key and the unit the loader tracks completion counts by.
/// Formats as `bundle:path`, which is also how failed items appear in failure messages.
#[derive(Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Debug, Serialize, Deserialize)]
pub struct AssetKey {
    bundle: String,
    path: String,
}

impl AssetKey {
    pub fn new(
        bundle: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        AssetKey {
            bundle: bundle.into(),
            path: path.into(),
        }
    }

    pub fn bundle(&self) -> &str {
        &self.bundle
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for AssetKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{}", self.bundle, self.path)
    }
}
