//! Stateless helpers over the engine's bundle interface, plus a handle cache so
//! repeated resolution of the same bundle name is free.

use std::sync::Arc;

use stockpile_base::hashing::HashMap;
use stockpile_base::{AssetId, AssetTypeId};

use crate::engine_io::{AssetBundle, EngineIo};

/// Strips a single trailing separator so `"maps/"` and `"maps"` address the same directory.
pub fn normalize_dir(dir: &str) -> &str {
    dir.strip_suffix('/').unwrap_or(dir)
}

/// Number of entries of the given type under `dir`.
pub fn dir_entry_count(
    bundle: &dyn AssetBundle,
    dir: &str,
    asset_type: Option<AssetTypeId>,
) -> usize {
    bundle.dir_entries(normalize_dir(dir), asset_type).len()
}

/// Identifiers of all entries of the given type under `dir`.
pub fn dir_entry_ids(
    bundle: &dyn AssetBundle,
    dir: &str,
    asset_type: Option<AssetTypeId>,
) -> Vec<AssetId> {
    bundle.dir_entries(normalize_dir(dir), asset_type)
}

/// Cache of resolved bundle handles, keyed by bundle name.
///
/// Successful asynchronous resolutions are inserted by the loader; `resolve` also
/// consults the engine's synchronous path and caches hits.
#[derive(Default)]
pub struct BundleCache {
    bundles: HashMap<String, Arc<dyn AssetBundle>>,
}

impl BundleCache {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<Arc<dyn AssetBundle>> {
        self.bundles.get(name).cloned()
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        bundle: Arc<dyn AssetBundle>,
    ) {
        self.bundles.insert(name.into(), bundle);
    }

    /// Returns the cached handle for `name`, or asks the engine for an
    /// already-resolved bundle and caches it. Returns `None` if the bundle
    /// needs an asynchronous resolution.
    pub fn resolve(
        &mut self,
        engine: &dyn EngineIo,
        name: &str,
    ) -> Option<Arc<dyn AssetBundle>> {
        if let Some(bundle) = self.bundles.get(name) {
            return Some(bundle.clone());
        }
        let bundle = engine.resolved_bundle(name)?;
        self.bundles.insert(name.to_string(), bundle.clone());
        Some(bundle)
    }

    pub fn clear(&mut self) {
        self.bundles.clear();
    }
}
