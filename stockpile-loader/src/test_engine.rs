//! In-memory engine used by the tests in this crate.
//!
//! Completion events are normally sent on the session channel as soon as a request is
//! issued, which lets a single `update()` drive a session to its terminal state. In
//! deferred mode events queue inside the engine instead and the test pumps them one at
//! a time, which makes in-flight admission control observable.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::Sender;
use stockpile_base::hashing::{HashMap, HashSet};
use stockpile_base::{AssetId, AssetTypeId, DEFAULT_BUNDLE};

use crate::engine_io::{
    AssetBundle, EngineAsset, EngineIo, LoaderEvent, RequestBundleResult, RequestDirProgress,
    RequestDirResult, RequestFileResult, RequestHandle,
};

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) struct TestAsset {
    asset_id: AssetId,
    refs: AtomicU32,
}

impl TestAsset {
    fn new() -> Arc<Self> {
        Arc::new(TestAsset {
            asset_id: AssetId::from_uuid(uuid::Uuid::new_v4()),
            refs: AtomicU32::new(0),
        })
    }

    pub(crate) fn ref_count(&self) -> u32 {
        self.refs.load(Ordering::SeqCst)
    }
}

impl EngineAsset for TestAsset {
    fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    fn add_ref(&self) {
        self.refs.fetch_add(1, Ordering::SeqCst);
    }

    fn remove_ref(&self) {
        self.refs.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct EventQueue {
    deferred: AtomicBool,
    pending: Mutex<VecDeque<(Sender<LoaderEvent>, LoaderEvent)>>,
}

impl EventQueue {
    fn dispatch(
        &self,
        result_tx: &Sender<LoaderEvent>,
        event: LoaderEvent,
    ) {
        if self.deferred.load(Ordering::SeqCst) {
            self.pending
                .lock()
                .unwrap()
                .push_back((result_tx.clone(), event));
        } else {
            let _ = result_tx.send(event);
        }
    }
}

pub(crate) struct TestBundle {
    name: String,
    queue: Arc<EventQueue>,
    assets: Mutex<Vec<(String, Arc<TestAsset>)>>,
    failing: Mutex<HashSet<String>>,
    flaky: Mutex<HashMap<String, u32>>,
    /// Dirs that report progress before the listing is known
    spurious_progress: Mutex<HashSet<String>>,
    /// Paths and dirs whose completion event is sent twice
    duplicate_results: Mutex<HashSet<String>>,
    load_attempts: AtomicUsize,
}

impl TestBundle {
    fn new(
        name: &str,
        queue: Arc<EventQueue>,
    ) -> Arc<Self> {
        Arc::new(TestBundle {
            name: name.to_string(),
            queue,
            assets: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::default()),
            flaky: Mutex::new(HashMap::default()),
            spurious_progress: Mutex::new(HashSet::default()),
            duplicate_results: Mutex::new(HashSet::default()),
            load_attempts: AtomicUsize::new(0),
        })
    }

    fn add_file(
        &self,
        path: &str,
    ) -> Arc<TestAsset> {
        let asset = TestAsset::new();
        self.assets
            .lock()
            .unwrap()
            .push((path.to_string(), asset.clone()));
        asset
    }

    fn asset_at(
        &self,
        path: &str,
    ) -> Option<Arc<TestAsset>> {
        self.assets
            .lock()
            .unwrap()
            .iter()
            .find(|(asset_path, _)| asset_path == path)
            .map(|(_, asset)| asset.clone())
    }

    pub(crate) fn load_attempt_count(&self) -> usize {
        self.load_attempts.load(Ordering::SeqCst)
    }

    /// Consumes one failure for flaky paths; always fails paths marked failing.
    fn should_fail(
        &self,
        path: &str,
    ) -> bool {
        if self.failing.lock().unwrap().contains(path) {
            return true;
        }
        let mut flaky = self.flaky.lock().unwrap();
        if let Some(remaining) = flaky.get_mut(path) {
            if *remaining > 0 {
                *remaining -= 1;
                return true;
            }
        }
        false
    }
}

impl AssetBundle for TestBundle {
    fn name(&self) -> &str {
        &self.name
    }

    fn dir_entries(
        &self,
        dir: &str,
        _asset_type: Option<AssetTypeId>,
    ) -> Vec<AssetId> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };
        let mut entries: Vec<(String, AssetId)> = self
            .assets
            .lock()
            .unwrap()
            .iter()
            .filter(|(path, _)| path.starts_with(&prefix))
            .map(|(path, asset)| (path.clone(), asset.asset_id))
            .collect();
        entries.sort();
        entries.into_iter().map(|(_, asset_id)| asset_id).collect()
    }

    fn path_of(
        &self,
        asset_id: AssetId,
    ) -> Option<String> {
        self.assets
            .lock()
            .unwrap()
            .iter()
            .find(|(_, asset)| asset.asset_id == asset_id)
            .map(|(path, _)| path.clone())
    }

    fn request_load_file(
        &self,
        request: RequestHandle,
        path: &str,
        _asset_type: Option<AssetTypeId>,
        result_tx: &Sender<LoaderEvent>,
    ) {
        self.load_attempts.fetch_add(1, Ordering::SeqCst);
        let result = if self.should_fail(path) {
            Err(format!("simulated failure for {}", path))
        } else {
            match self.asset_at(path) {
                Some(asset) => Ok(asset as Arc<dyn EngineAsset>),
                None => Err(format!("no asset at {}", path)),
            }
        };
        let duplicated = self.duplicate_results.lock().unwrap().contains(path);
        self.queue.dispatch(
            result_tx,
            LoaderEvent::FileRequestComplete(RequestFileResult {
                request,
                result: result.clone(),
            }),
        );
        if duplicated {
            self.queue.dispatch(
                result_tx,
                LoaderEvent::FileRequestComplete(RequestFileResult { request, result }),
            );
        }
    }

    fn request_load_dir(
        &self,
        request: RequestHandle,
        dir: &str,
        asset_type: Option<AssetTypeId>,
        result_tx: &Sender<LoaderEvent>,
    ) {
        self.load_attempts.fetch_add(1, Ordering::SeqCst);
        if self.should_fail(dir) {
            self.queue.dispatch(
                result_tx,
                LoaderEvent::DirRequestComplete(RequestDirResult {
                    request,
                    result: Err(format!("simulated failure for {}", dir)),
                }),
            );
            return;
        }
        let assets: Vec<Arc<dyn EngineAsset>> = self
            .dir_entries(dir, asset_type)
            .into_iter()
            .filter_map(|asset_id| self.path_of(asset_id))
            .filter_map(|path| self.asset_at(&path))
            .map(|asset| asset as Arc<dyn EngineAsset>)
            .collect();
        let total = assets.len() as u32;
        if self.spurious_progress.lock().unwrap().contains(dir) {
            for completed_total in [(0, 0), (0, total)] {
                self.queue.dispatch(
                    result_tx,
                    LoaderEvent::DirRequestProgress(RequestDirProgress {
                        request,
                        completed: completed_total.0,
                        total: completed_total.1,
                    }),
                );
            }
        }
        for completed in 1..=total {
            self.queue.dispatch(
                result_tx,
                LoaderEvent::DirRequestProgress(RequestDirProgress {
                    request,
                    completed,
                    total,
                }),
            );
        }
        let duplicated = self.duplicate_results.lock().unwrap().contains(dir);
        self.queue.dispatch(
            result_tx,
            LoaderEvent::DirRequestComplete(RequestDirResult {
                request,
                result: Ok(assets.clone()),
            }),
        );
        if duplicated {
            self.queue.dispatch(
                result_tx,
                LoaderEvent::DirRequestComplete(RequestDirResult {
                    request,
                    result: Ok(assets),
                }),
            );
        }
    }
}

pub(crate) struct TestEngine {
    queue: Arc<EventQueue>,
    /// Bundles available through the synchronous path
    resolved: Mutex<HashMap<String, Arc<TestBundle>>>,
    /// Bundles that require an asynchronous resolution
    loadable: Mutex<HashMap<String, Arc<TestBundle>>>,
    failing_bundles: Mutex<HashSet<String>>,
    bundle_requests: AtomicUsize,
}

impl TestEngine {
    pub(crate) fn new() -> Self {
        let queue = Arc::new(EventQueue::default());
        let engine = TestEngine {
            queue: queue.clone(),
            resolved: Mutex::new(HashMap::default()),
            loadable: Mutex::new(HashMap::default()),
            failing_bundles: Mutex::new(HashSet::default()),
            bundle_requests: AtomicUsize::new(0),
        };
        engine
            .resolved
            .lock()
            .unwrap()
            .insert(DEFAULT_BUNDLE.to_string(), TestBundle::new(DEFAULT_BUNDLE, queue));
        engine
    }

    /// Engine that queues events until the test delivers them with `deliver_one`.
    pub(crate) fn deferred() -> Self {
        let engine = Self::new();
        engine.queue.deferred.store(true, Ordering::SeqCst);
        engine
    }

    pub(crate) fn test_bundle(
        &self,
        name: &str,
    ) -> Option<Arc<TestBundle>> {
        let resolved = self.resolved.lock().unwrap();
        if let Some(bundle) = resolved.get(name) {
            return Some(bundle.clone());
        }
        self.loadable.lock().unwrap().get(name).cloned()
    }

    /// Adds a file-backed asset to a bundle, creating the bundle on the synchronous
    /// path if it does not exist yet.
    pub(crate) fn add_file(
        &self,
        bundle_name: &str,
        path: &str,
    ) -> Arc<TestAsset> {
        if let Some(bundle) = self.test_bundle(bundle_name) {
            return bundle.add_file(path);
        }
        let bundle = TestBundle::new(bundle_name, self.queue.clone());
        let asset = bundle.add_file(path);
        self.resolved
            .lock()
            .unwrap()
            .insert(bundle_name.to_string(), bundle);
        asset
    }

    /// Registers a bundle that only resolves through `request_bundle`.
    pub(crate) fn add_loadable_bundle(
        &self,
        name: &str,
    ) {
        self.loadable
            .lock()
            .unwrap()
            .insert(name.to_string(), TestBundle::new(name, self.queue.clone()));
    }

    pub(crate) fn fail_bundle(
        &self,
        name: &str,
    ) {
        self.failing_bundles
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    pub(crate) fn clear_bundle_failure(
        &self,
        name: &str,
    ) {
        self.failing_bundles.lock().unwrap().remove(name);
    }

    pub(crate) fn fail_path(
        &self,
        bundle_name: &str,
        path: &str,
    ) {
        self.test_bundle(bundle_name)
            .unwrap()
            .failing
            .lock()
            .unwrap()
            .insert(path.to_string());
    }

    /// Makes a path fail `times` loads before succeeding.
    pub(crate) fn fail_path_times(
        &self,
        bundle_name: &str,
        path: &str,
        times: u32,
    ) {
        self.test_bundle(bundle_name)
            .unwrap()
            .flaky
            .lock()
            .unwrap()
            .insert(path.to_string(), times);
    }

    /// Makes a dir report 0/0 and 0/n progress before the real progress events.
    pub(crate) fn emit_spurious_dir_progress(
        &self,
        bundle_name: &str,
        dir: &str,
    ) {
        self.test_bundle(bundle_name)
            .unwrap()
            .spurious_progress
            .lock()
            .unwrap()
            .insert(dir.to_string());
    }

    /// Makes a path or dir send its completion event twice.
    pub(crate) fn duplicate_result(
        &self,
        bundle_name: &str,
        path: &str,
    ) {
        self.test_bundle(bundle_name)
            .unwrap()
            .duplicate_results
            .lock()
            .unwrap()
            .insert(path.to_string());
    }

    pub(crate) fn bundle_request_count(&self) -> usize {
        self.bundle_requests.load(Ordering::SeqCst)
    }

    /// Delivers the oldest queued event in deferred mode. Returns false when empty.
    pub(crate) fn deliver_one(&self) -> bool {
        let entry = self.queue.pending.lock().unwrap().pop_front();
        match entry {
            Some((result_tx, event)) => {
                let _ = result_tx.send(event);
                true
            }
            None => false,
        }
    }

    pub(crate) fn pending_event_count(&self) -> usize {
        self.queue.pending.lock().unwrap().len()
    }
}

impl EngineIo for TestEngine {
    fn resolved_bundle(
        &self,
        name: &str,
    ) -> Option<Arc<dyn AssetBundle>> {
        self.resolved
            .lock()
            .unwrap()
            .get(name)
            .map(|bundle| bundle.clone() as Arc<dyn AssetBundle>)
    }

    fn request_bundle(
        &self,
        request: RequestHandle,
        name: &str,
        result_tx: &Sender<LoaderEvent>,
    ) {
        self.bundle_requests.fetch_add(1, Ordering::SeqCst);
        let result = if self.failing_bundles.lock().unwrap().contains(name) {
            Err(format!("simulated bundle failure for {}", name))
        } else {
            match self.test_bundle(name) {
                Some(bundle) => Ok(bundle as Arc<dyn AssetBundle>),
                None => Err(format!("unknown bundle {}", name)),
            }
        };
        self.queue.dispatch(
            result_tx,
            LoaderEvent::BundleRequestComplete(RequestBundleResult {
                request,
                bundle_name: name.to_string(),
                result,
            }),
        );
    }
}
