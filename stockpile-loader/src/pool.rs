use std::sync::Arc;

use stockpile_base::hashing::{HashMap, HashSet};
use stockpile_base::{AssetId, AssetKey, AssetTypeId};

use crate::bundle_util;
use crate::engine_io::{AssetBundle, EngineAsset, EngineIo};

/// Error type for pool operations that need bundle access.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PoolError {
    /// The named bundle is not resolved, so its directory listing is unavailable
    #[error("bundle '{0}' is not resolved")]
    BundleNotResolved(String),
}

/// Registry of loaded assets, keyed by `(bundle, path)`, with a secondary identifier
/// index and a batch-membership index for bulk release.
///
/// Adding an asset takes one engine reference; every successful removal returns it.
/// The pool is an explicit object: loader sessions get a shared handle to one, and
/// tests can instantiate isolated pools. It is shared, process-wide state from the
/// point of view of the sessions using it; reference counts and batch membership are
/// not session-scoped.
#[derive(Default)]
pub struct AssetPool {
    /// Pool key to loaded asset
    assets: HashMap<AssetKey, Arc<dyn EngineAsset>>,
    /// Engine identifier to pool key
    id_to_key: HashMap<AssetId, AssetKey>,
    /// Batch name to the keys loaded under it
    batches: HashMap<String, HashSet<AssetKey>>,
    /// Engine identifier to batch name. Kept consistent with `batches` on every
    /// add and release.
    id_to_batch: HashMap<AssetId, String>,
}

impl AssetPool {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a loaded asset under the batch name, taking one engine reference.
    ///
    /// Re-adding an identifier that is already registered is a no-op, so the
    /// reference count is never incremented twice for the same asset.
    pub fn add(
        &mut self,
        asset: Arc<dyn EngineAsset>,
        bundle: &dyn AssetBundle,
        batch_name: &str,
    ) {
        let asset_id = asset.asset_id();
        if self.id_to_key.contains_key(&asset_id) {
            return;
        }
        let Some(path) = bundle.path_of(asset_id) else {
            log::warn!(
                "add failed: asset {} has no path in bundle {}",
                asset_id,
                bundle.name()
            );
            return;
        };

        asset.add_ref();
        let key = AssetKey::new(bundle.name(), path);
        log::debug!("pool add {} as {}", asset_id, key);
        self.id_to_key.insert(asset_id, key.clone());
        if !batch_name.is_empty() {
            self.batches
                .entry(batch_name.to_string())
                .or_default()
                .insert(key.clone());
            self.id_to_batch.insert(asset_id, batch_name.to_string());
        }
        self.assets.insert(key, asset);
    }

    /// Registers every asset in the list. See [`AssetPool::add`].
    pub fn add_all(
        &mut self,
        assets: impl IntoIterator<Item = Arc<dyn EngineAsset>>,
        bundle: &dyn AssetBundle,
        batch_name: &str,
    ) {
        for asset in assets {
            self.add(asset, bundle, batch_name);
        }
    }

    /// Keys of every asset currently held by the pool.
    pub fn all_asset_paths(&self) -> Vec<AssetKey> {
        self.assets.keys().cloned().collect()
    }

    pub fn has(
        &self,
        path: &str,
        bundle_name: &str,
    ) -> bool {
        self.assets.contains_key(&AssetKey::new(bundle_name, path))
    }

    /// Looks up an asset by path. Missing entries log a warning and return `None`.
    pub fn get(
        &self,
        path: &str,
        bundle_name: &str,
    ) -> Option<Arc<dyn EngineAsset>> {
        let key = AssetKey::new(bundle_name, path);
        let asset = self.assets.get(&key).cloned();
        if asset.is_none() {
            log::warn!("get failed: asset {} is not loaded", key);
        }
        asset
    }

    pub fn has_asset_id(
        &self,
        asset_id: AssetId,
    ) -> bool {
        self.id_to_key.contains_key(&asset_id)
    }

    /// Looks up an asset by engine identifier. Missing entries log a warning and
    /// return `None`.
    pub fn get_by_asset_id(
        &self,
        asset_id: AssetId,
    ) -> Option<Arc<dyn EngineAsset>> {
        let Some(key) = self.id_to_key.get(&asset_id) else {
            log::warn!("get failed: asset {} is not loaded", asset_id);
            return None;
        };
        self.assets.get(key).cloned()
    }

    /// Releases every asset loaded under the batch, then forgets the batch.
    /// Unknown batch names are a no-op.
    pub fn release_batch(
        &mut self,
        batch_name: &str,
    ) {
        let Some(keys) = self.batches.remove(batch_name) else {
            return;
        };
        for key in keys {
            self.release(&key);
        }
    }

    /// Releases the single asset at `(bundle, path)`.
    pub fn release_path(
        &mut self,
        path: &str,
        bundle_name: &str,
    ) {
        self.release(&AssetKey::new(bundle_name, path));
    }

    /// Releases every pooled asset under `dir` in the named bundle, optionally
    /// restricted to one asset type. Returns how many assets were released, or an
    /// error if the bundle is not resolved.
    pub fn release_dir(
        &mut self,
        dir: &str,
        bundle_name: &str,
        asset_type: Option<AssetTypeId>,
        engine: &dyn EngineIo,
    ) -> Result<usize, PoolError> {
        let bundle = engine
            .resolved_bundle(bundle_name)
            .ok_or_else(|| PoolError::BundleNotResolved(bundle_name.to_string()))?;
        let mut released = 0;
        for asset_id in bundle_util::dir_entry_ids(&*bundle, dir, asset_type) {
            if self.release_asset_id(asset_id) {
                released += 1;
            }
        }
        Ok(released)
    }

    /// Releases an asset by engine identifier, if it is pooled. Returns whether
    /// anything was released.
    pub fn release_asset_id(
        &mut self,
        asset_id: AssetId,
    ) -> bool {
        let Some(key) = self.id_to_key.get(&asset_id).cloned() else {
            return false;
        };
        self.release(&key);
        true
    }

    /// Returns one engine reference for every held asset and clears all indices.
    pub fn release_all(&mut self) {
        for asset in self.assets.values() {
            asset.remove_ref();
        }
        self.assets.clear();
        self.id_to_key.clear();
        self.batches.clear();
        self.id_to_batch.clear();
    }

    fn release(
        &mut self,
        key: &AssetKey,
    ) {
        let Some(asset) = self.assets.remove(key) else {
            log::warn!("release failed: asset {} is not loaded", key);
            return;
        };
        let asset_id = asset.asset_id();
        if let Some(batch_name) = self.id_to_batch.remove(&asset_id) {
            if let Some(keys) = self.batches.get_mut(&batch_name) {
                keys.remove(key);
            }
        }
        self.id_to_key.remove(&asset_id);
        asset.remove_ref();
    }
}
