use serde::{Deserialize, Serialize};

use crate::AssetTypeId;

/// Bundle used when a config does not name one. Always resolvable synchronously.
pub const DEFAULT_BUNDLE: &str = "resources";

/// One entry in a load request: a single file or a directory inside a bundle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Bundle-relative path of the file or directory
    pub path: String,
    /// Restricts the load to one asset type. `None` loads any type.
    #[serde(default)]
    pub asset_type: Option<AssetTypeId>,
    /// True for a single file, false for a directory
    #[serde(default)]
    pub is_file: bool,
    /// Bundle to load from. `None` means [`DEFAULT_BUNDLE`].
    #[serde(default)]
    pub bundle: Option<String>,
}

impl AssetConfig {
    /// Config for a single file in the default bundle.
    pub fn file(path: impl Into<String>) -> Self {
        AssetConfig {
            path: path.into(),
            asset_type: None,
            is_file: true,
            bundle: None,
        }
    }

    /// Config for a directory in the default bundle.
    pub fn dir(path: impl Into<String>) -> Self {
        AssetConfig {
            path: path.into(),
            asset_type: None,
            is_file: false,
            bundle: None,
        }
    }

    pub fn with_bundle(
        mut self,
        bundle: impl Into<String>,
    ) -> Self {
        self.bundle = Some(bundle.into());
        self
    }

    pub fn with_asset_type(
        mut self,
        asset_type: AssetTypeId,
    ) -> Self {
        self.asset_type = Some(asset_type);
        self
    }

    /// The bundle this config loads from, falling back to the default bundle.
    pub fn bundle_name(&self) -> &str {
        self.bundle.as_deref().unwrap_or(DEFAULT_BUNDLE)
    }
}
