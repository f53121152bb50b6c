use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};
use stockpile_base::{AssetConfig, AssetKey, ErrorCode, LoadState};

use crate::agent::{LoaderAgent, LoaderCallbacks};
use crate::bundle_util::{self, BundleCache};
use crate::engine_io::{
    AssetBundle, EngineIo, LoaderEvent, RequestBundleResult, RequestDirProgress, RequestDirResult,
    RequestFileResult, RequestHandle,
};
use crate::pool::AssetPool;
use crate::record::AssetRecord;

// Bundle resolution requests are tagged with the initialization generation so results
// belonging to an abandoned attempt can be discarded. Item load requests carry the
// record index directly: at most one request per record is ever outstanding, because a
// record is only re-dispatched after its failure event arrived.

fn bundle_request_handle(
    generation: u64,
    config_index: usize,
) -> RequestHandle {
    RequestHandle((generation << 32) | config_index as u64)
}

fn unpack_bundle_request(request: RequestHandle) -> (u64, usize) {
    (request.0 >> 32, (request.0 & 0xFFFF_FFFF) as usize)
}

/// Drives one batch of load requests from configuration to terminal success or failure.
///
/// A session runs `start()` → bundle resolution → bounded-parallel loads → Completed or
/// Failed, retrying failed bundles session-wide and failed items item-wide up to the
/// configured limit. Successfully loaded assets are registered in the injected pool
/// under this loader's batch name. Engine completions arrive as [`LoaderEvent`]s on a
/// channel owned by the session; the host must call [`BatchLoader::update`] on its
/// notification path to make progress.
pub struct BatchLoader {
    agent: LoaderAgent,
    engine: Arc<dyn EngineIo>,
    pool: Arc<Mutex<AssetPool>>,
    batch_name: String,
    configs: Vec<AssetConfig>,
    bundles: BundleCache,
    events_tx: Sender<LoaderEvent>,
    events_rx: Receiver<LoaderEvent>,
    /// Bumped on every initialization attempt; stale bundle results are discarded
    init_generation: u64,
    /// Configs whose bundle resolution is still outstanding
    pending_resolves: usize,
    /// Whether initialization has ever succeeded for the current configs
    init_success: bool,
    /// Item loads currently in flight
    in_flight: usize,
    retry_count: u32,
}

impl BatchLoader {
    pub fn new(
        engine: Arc<dyn EngineIo>,
        pool: Arc<Mutex<AssetPool>>,
    ) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        BatchLoader {
            agent: LoaderAgent::new(),
            engine,
            pool,
            batch_name: String::new(),
            configs: Vec::default(),
            bundles: BundleCache::new(),
            events_tx,
            events_rx,
            init_generation: 0,
            pending_resolves: 0,
            init_success: false,
            in_flight: 0,
            retry_count: 0,
        }
    }

    /// Assets loaded by this session register in the pool under this batch name,
    /// enabling bulk release with [`AssetPool::release_batch`].
    pub fn with_batch_name(
        mut self,
        batch_name: impl Into<String>,
    ) -> Self {
        self.batch_name = batch_name.into();
        self
    }

    pub fn batch_name(&self) -> &str {
        &self.batch_name
    }

    /// Maximum concurrent in-flight loads. Clamped to at least 1; defaults to 10.
    pub fn set_parallelism(
        &mut self,
        parallelism: usize,
    ) {
        self.agent.set_parallelism(parallelism);
    }

    /// Additional attempts after the first failure; 0 (the default) disables retry.
    pub fn set_max_retries(
        &mut self,
        max_retries: u32,
    ) {
        self.agent.set_max_retries(max_retries);
    }

    pub fn set_callbacks(
        &mut self,
        callbacks: LoaderCallbacks,
    ) {
        self.agent.set_callbacks(callbacks);
    }

    /// Begins a loading session for the given configuration list.
    ///
    /// Must not be called while a session is still in flight; use
    /// [`BatchLoader::retry_failed`] to re-drive a failed session.
    pub fn start(
        &mut self,
        configs: Vec<AssetConfig>,
    ) {
        self.configs = configs;
        self.begin_session();
    }

    /// Re-drives a session that reached terminal failure (or never finished
    /// initializing): resets the retry budget and either restarts initialization or
    /// re-dispatches the failed items.
    pub fn retry_failed(&mut self) {
        self.in_flight = 0;
        self.retry_count = 0;
        if !self.init_success {
            self.retry_count += 1;
            self.begin_session();
        } else {
            self.retry_failed_items();
        }
    }

    /// Processes all pending engine completions, possibly changing item states and
    /// dispatching further loads. Call on the host's notification path.
    #[profiling::function]
    pub fn update(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            log::debug!("handle event {:?}", event);
            match event {
                LoaderEvent::BundleRequestComplete(result) => self.handle_bundle_result(result),
                LoaderEvent::FileRequestComplete(result) => self.handle_file_result(result),
                LoaderEvent::DirRequestProgress(progress) => self.handle_dir_progress(progress),
                LoaderEvent::DirRequestComplete(result) => self.handle_dir_result(result),
            }
        }
    }

    /// Item loads currently in flight. Never exceeds the configured parallelism.
    pub fn active_load_count(&self) -> usize {
        self.in_flight
    }

    pub fn is_session_complete(&self) -> bool {
        self.agent.is_complete()
    }

    fn begin_session(&mut self) {
        self.agent.reset();
        self.init_success = false;
        self.in_flight = 0;
        self.init_generation += 1;
        self.pending_resolves = 0;

        let engine = self.engine.clone();
        for config_index in 0..self.configs.len() {
            let bundle_name = self.configs[config_index].bundle_name().to_string();
            match self.bundles.resolve(&*engine, &bundle_name) {
                Some(bundle) => self.register_item(config_index, bundle),
                None => {
                    self.pending_resolves += 1;
                    let request = bundle_request_handle(self.init_generation, config_index);
                    self.engine
                        .request_bundle(request, &bundle_name, &self.events_tx);
                }
            }
        }
        if self.pending_resolves == 0 {
            self.enter_loading();
        }
    }

    /// Computes an item's total sub-resource count and registers its record.
    fn register_item(
        &mut self,
        config_index: usize,
        bundle: Arc<dyn AssetBundle>,
    ) {
        let config = &self.configs[config_index];
        let total = if config.is_file {
            1
        } else {
            bundle_util::dir_entry_count(&*bundle, &config.path, config.asset_type) as u32
        };
        let key = AssetKey::new(config.bundle_name(), &config.path);
        let record = AssetRecord::new(config, bundle);
        self.agent.set_total_count(key, total);
        self.agent.push_record(record);
    }

    /// All bundles resolved; start dispatching loads.
    fn enter_loading(&mut self) {
        self.init_success = true;
        self.in_flight = 0;
        let max_load = self.agent.record_count().min(self.agent.max_parallel());
        // An empty session still has to run the dispatch decision once so it reports
        // completion.
        for _ in 0..max_load.max(1) {
            self.dispatch_next();
        }
    }

    /// The dispatch decision, run at loading entry and after every completion or
    /// failure: load the first waiting item, else finish, else wait for stragglers,
    /// else spend a retry, else report terminal failure.
    fn dispatch_next(&mut self) {
        if let Some(index) = self.agent.first_waiting() {
            self.load_item(index);
            return;
        }
        if self.agent.all_finished() {
            self.agent.complete_all();
            return;
        }
        if self.in_flight > 0 {
            return;
        }
        if self.retry_count < self.agent.max_retries() {
            self.retry_failed_items();
            return;
        }
        self.agent.report_failed_items();
    }

    fn load_item(
        &mut self,
        index: usize,
    ) {
        let Some(record) = self.agent.record_mut(index) else {
            return;
        };
        record.set_state(LoadState::Loading);
        let is_file = record.is_file();
        let path = record.path().to_string();
        let asset_type = record.asset_type();
        let bundle = record.bundle();

        self.in_flight += 1;
        let request = RequestHandle(index as u64);
        if is_file {
            bundle.request_load_file(request, &path, asset_type, &self.events_tx);
        } else {
            let dir = bundle_util::normalize_dir(&path);
            bundle.request_load_dir(request, dir, asset_type, &self.events_tx);
        }
    }

    /// Spends one retry: resets failed records to waiting and re-dispatches them.
    fn retry_failed_items(&mut self) {
        self.retry_count += 1;
        let reset_count = self.agent.reset_failed();
        log::debug!(
            "retry {} resetting {} failed items",
            self.retry_count,
            reset_count
        );
        let max_load = reset_count.min(self.agent.max_parallel());
        for _ in 0..max_load {
            self.dispatch_next();
        }
    }

    fn handle_bundle_result(
        &mut self,
        result: RequestBundleResult,
    ) {
        let (generation, config_index) = unpack_bundle_request(result.request);
        if generation != self.init_generation {
            log::debug!(
                "discarding stale bundle result for {} (generation {})",
                result.bundle_name,
                generation
            );
            return;
        }
        match result.result {
            Ok(bundle) => {
                self.bundles.insert(&result.bundle_name, bundle.clone());
                self.register_item(config_index, bundle);
                self.pending_resolves -= 1;
                if self.pending_resolves == 0 {
                    self.enter_loading();
                }
            }
            Err(message) => {
                log::warn!(
                    "bundle {} failed to resolve: {}",
                    result.bundle_name,
                    message
                );
                if self.retry_count < self.agent.max_retries() {
                    self.retry_count += 1;
                    self.begin_session();
                } else {
                    let msg = format!("failed to load bundle {}", result.bundle_name);
                    self.agent.fail(ErrorCode::BundleLoadFailed, &msg);
                }
            }
        }
    }

    fn handle_file_result(
        &mut self,
        result: RequestFileResult,
    ) {
        let index = result.request.0 as usize;
        let Some(record) = self.agent.record(index) else {
            return;
        };
        if record.state() != LoadState::Loading {
            log::debug!("discarding file result for item {} not in loading state", index);
            return;
        }
        let key = record.key();
        let bundle = record.bundle();

        self.in_flight = self.in_flight.saturating_sub(1);
        match result.result {
            Ok(asset) => {
                if let Some(record) = self.agent.record_mut(index) {
                    record.set_state(LoadState::Finished);
                }
                self.pool
                    .lock()
                    .unwrap()
                    .add(asset, &*bundle, &self.batch_name);
                self.agent.update_complete_count(key, 1, 1);
            }
            Err(message) => {
                log::warn!("load failed for {}: {}", key, message);
                if let Some(record) = self.agent.record_mut(index) {
                    record.set_state(LoadState::Failed);
                }
            }
        }
        self.dispatch_next();
    }

    fn handle_dir_progress(
        &mut self,
        progress: RequestDirProgress,
    ) {
        let index = progress.request.0 as usize;
        let Some(record) = self.agent.record(index) else {
            return;
        };
        if record.state() != LoadState::Loading {
            return;
        }
        // The engine reports a spurious 0/0 before the listing is known
        if progress.completed > 0 && progress.total > 0 {
            let key = record.key();
            self.agent
                .update_complete_count(key, progress.completed, progress.total);
        }
    }

    fn handle_dir_result(
        &mut self,
        result: RequestDirResult,
    ) {
        let index = result.request.0 as usize;
        let Some(record) = self.agent.record(index) else {
            return;
        };
        if record.state() != LoadState::Loading {
            log::debug!("discarding dir result for item {} not in loading state", index);
            return;
        }
        let key = record.key();
        let bundle = record.bundle();

        self.in_flight = self.in_flight.saturating_sub(1);
        match result.result {
            Ok(assets) => {
                if let Some(record) = self.agent.record_mut(index) {
                    record.set_state(LoadState::Finished);
                }
                self.pool
                    .lock()
                    .unwrap()
                    .add_all(assets, &*bundle, &self.batch_name);
            }
            Err(message) => {
                log::warn!("load failed for {}: {}", key, message);
                if let Some(record) = self.agent.record_mut(index) {
                    record.set_state(LoadState::Failed);
                }
            }
        }
        self.dispatch_next();
    }
}
