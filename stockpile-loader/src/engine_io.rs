use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Sender;
use stockpile_base::{AssetId, AssetTypeId};

//
// Interface toward the host engine
//
// The engine owns all I/O, decoding and memory management. This crate only drives it:
// it asks for bundles and loads, and the engine answers by sending LoaderEvents on the
// channel the request carried. Completion events are delivered on the engine's own
// notification path and are consumed by BatchLoader::update(), so all session state is
// only ever touched from a single logical thread.
//

/// Identifies one in-flight engine request issued by a loader session. The engine echoes
/// it back unchanged in the result event; its encoding is private to the loader.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct RequestHandle(pub u64);

/// A loaded asset as exposed by the host engine. The engine owns the memory and frees it
/// when the reference count permits; the pool only manipulates the count.
pub trait EngineAsset: Send + Sync {
    /// Stable engine-level identifier for this asset
    fn asset_id(&self) -> AssetId;

    fn add_ref(&self);

    fn remove_ref(&self);
}

/// A named, independently loadable group of assets managed by the host engine.
pub trait AssetBundle: Send + Sync {
    fn name(&self) -> &str;

    /// Identifiers of all entries under `dir`, optionally restricted to one asset type.
    /// `dir` is expected to be normalized (no trailing separator).
    fn dir_entries(
        &self,
        dir: &str,
        asset_type: Option<AssetTypeId>,
    ) -> Vec<AssetId>;

    /// Bundle-relative path of an asset in this bundle, if it exists.
    fn path_of(
        &self,
        asset_id: AssetId,
    ) -> Option<String>;

    /// Begin loading a single file.
    /// The outcome arrives as a FileRequestComplete event on `result_tx`.
    fn request_load_file(
        &self,
        request: RequestHandle,
        path: &str,
        asset_type: Option<AssetTypeId>,
        result_tx: &Sender<LoaderEvent>,
    );

    /// Begin loading every matching entry under a directory.
    /// Zero or more DirRequestProgress events may arrive on `result_tx`, followed by
    /// exactly one DirRequestComplete event.
    fn request_load_dir(
        &self,
        request: RequestHandle,
        dir: &str,
        asset_type: Option<AssetTypeId>,
        result_tx: &Sender<LoaderEvent>,
    );
}

/// Entry point to the host engine: bundle resolution.
pub trait EngineIo: Send + Sync {
    /// Returns a bundle the engine has already resolved, if any. The default bundle is
    /// expected to always be available through this path.
    fn resolved_bundle(
        &self,
        name: &str,
    ) -> Option<Arc<dyn AssetBundle>>;

    /// Begin resolving a bundle by name.
    /// The outcome arrives as a BundleRequestComplete event on `result_tx`.
    fn request_bundle(
        &self,
        request: RequestHandle,
        name: &str,
        result_tx: &Sender<LoaderEvent>,
    );
}

/// Outcome of a bundle resolution request.
pub struct RequestBundleResult {
    pub request: RequestHandle,
    pub bundle_name: String,
    pub result: Result<Arc<dyn AssetBundle>, String>,
}

impl fmt::Debug for RequestBundleResult {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RequestBundleResult")
            .field("request", &self.request)
            .field("bundle_name", &self.bundle_name)
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

/// Outcome of a single-file load request.
pub struct RequestFileResult {
    pub request: RequestHandle,
    pub result: Result<Arc<dyn EngineAsset>, String>,
}

impl fmt::Debug for RequestFileResult {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RequestFileResult")
            .field("request", &self.request)
            .field("ok", &self.result.is_ok())
            .finish()
    }
}

/// Outcome of a directory load request.
pub struct RequestDirResult {
    pub request: RequestHandle,
    pub result: Result<Vec<Arc<dyn EngineAsset>>, String>,
}

impl fmt::Debug for RequestDirResult {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RequestDirResult")
            .field("request", &self.request)
            .field("asset_count", &self.result.as_ref().map(|assets| assets.len()))
            .finish()
    }
}

/// Progress notification for an in-flight directory load.
#[derive(Copy, Clone, Debug)]
pub struct RequestDirProgress {
    pub request: RequestHandle,
    pub completed: u32,
    pub total: u32,
}

/// Loader events which drive state changes for one loading session.
#[derive(Debug)]
pub enum LoaderEvent {
    /// Sent by the engine when a bundle resolution succeeds or fails
    BundleRequestComplete(RequestBundleResult),
    /// Sent by the engine when a single-file load succeeds or fails
    FileRequestComplete(RequestFileResult),
    /// Sent by the engine while a directory load makes progress
    DirRequestProgress(RequestDirProgress),
    /// Sent by the engine when a directory load succeeds or fails
    DirRequestComplete(RequestDirResult),
}
