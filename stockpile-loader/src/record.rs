use std::sync::Arc;

use stockpile_base::{AssetConfig, AssetKey, AssetTypeId, LoadState};

use crate::engine_io::AssetBundle;

/// One configured item within a session: the immutable descriptor plus its load state.
///
/// Records are created as bundles resolve during initialization and discarded when the
/// session resets. Only the state field is ever written afterwards.
pub(crate) struct AssetRecord {
    asset_type: Option<AssetTypeId>,
    path: String,
    is_file: bool,
    bundle_name: String,
    bundle: Arc<dyn AssetBundle>,
    state: LoadState,
}

impl AssetRecord {
    pub(crate) fn new(
        config: &AssetConfig,
        bundle: Arc<dyn AssetBundle>,
    ) -> Self {
        AssetRecord {
            asset_type: config.asset_type,
            path: config.path.clone(),
            is_file: config.is_file,
            bundle_name: config.bundle_name().to_string(),
            bundle,
            state: LoadState::Waiting,
        }
    }

    pub(crate) fn asset_type(&self) -> Option<AssetTypeId> {
        self.asset_type
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn is_file(&self) -> bool {
        self.is_file
    }

    pub(crate) fn bundle(&self) -> Arc<dyn AssetBundle> {
        self.bundle.clone()
    }

    pub(crate) fn key(&self) -> AssetKey {
        AssetKey::new(&self.bundle_name, &self.path)
    }

    pub(crate) fn state(&self) -> LoadState {
        self.state
    }

    pub(crate) fn set_state(
        &mut self,
        state: LoadState,
    ) {
        self.state = state;
    }
}
