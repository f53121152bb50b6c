use stockpile_base::hashing::HashMap;
use stockpile_base::{AssetKey, ErrorCode, LoadState};

use crate::record::AssetRecord;

pub type ProgressFn = Box<dyn FnMut(f32)>;
pub type CompleteFn = Box<dyn FnMut()>;
pub type FailFn = Box<dyn FnMut(ErrorCode, &str)>;

/// User callbacks for one loading session.
///
/// `progress` receives a value in [0,1]. `complete` is invoked at most once per session.
/// `fail` receives an error code and a human-readable message; for item failures the
/// message lists every still-failing item as a `bundle:path` line.
#[derive(Default)]
pub struct LoaderCallbacks {
    pub progress: Option<ProgressFn>,
    pub complete: Option<CompleteFn>,
    pub fail: Option<FailFn>,
}

impl LoaderCallbacks {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn on_progress(
        mut self,
        f: impl FnMut(f32) + 'static,
    ) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    pub fn on_complete(
        mut self,
        f: impl FnMut() + 'static,
    ) -> Self {
        self.complete = Some(Box::new(f));
        self
    }

    pub fn on_fail(
        mut self,
        f: impl FnMut(ErrorCode, &str) + 'static,
    ) -> Self {
        self.fail = Some(Box::new(f));
        self
    }
}

/// Per-item completion counter. Progress across the session is the sum of these.
struct ItemCount {
    completed: u32,
    total: u32,
}

/// Bookkeeping for one loading session: the record list, per-item completion counters,
/// aggregate progress and the user callbacks. The batch loader drives it.
pub(crate) struct LoaderAgent {
    max_parallel: usize,
    max_retries: u32,
    records: Vec<AssetRecord>,
    item_counts: HashMap<AssetKey, ItemCount>,
    is_complete: bool,
    callbacks: LoaderCallbacks,
}

impl LoaderAgent {
    pub(crate) fn new() -> Self {
        LoaderAgent {
            max_parallel: 10,
            max_retries: 0,
            records: Vec::default(),
            item_counts: HashMap::default(),
            is_complete: false,
            callbacks: LoaderCallbacks::default(),
        }
    }

    /// Set the maximum number of concurrent in-flight loads. Clamped to at least 1.
    pub(crate) fn set_parallelism(
        &mut self,
        parallelism: usize,
    ) {
        self.max_parallel = parallelism.max(1);
    }

    /// Set the number of additional attempts after the first failure. 0 disables retry.
    pub(crate) fn set_max_retries(
        &mut self,
        max_retries: u32,
    ) {
        self.max_retries = max_retries;
    }

    pub(crate) fn set_callbacks(
        &mut self,
        callbacks: LoaderCallbacks,
    ) {
        self.callbacks = callbacks;
    }

    pub(crate) fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    pub(crate) fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Clears all per-session state. Parallelism, retry limit and callbacks survive.
    pub(crate) fn reset(&mut self) {
        self.is_complete = false;
        self.records.clear();
        self.item_counts.clear();
    }

    /// Registers the total sub-resource count for an item, starting at 0 completed.
    pub(crate) fn set_total_count(
        &mut self,
        key: AssetKey,
        total: u32,
    ) {
        self.item_counts.insert(key, ItemCount { completed: 0, total });
    }

    /// Updates the completed count for an item, clamped to its total, and reports
    /// aggregate progress.
    pub(crate) fn update_complete_count(
        &mut self,
        key: AssetKey,
        completed: u32,
        total: u32,
    ) {
        let completed = completed.min(total);
        self.item_counts
            .entry(key)
            .and_modify(|count| {
                count.completed = completed;
                count.total = total;
            })
            .or_insert(ItemCount { completed, total });
        self.report_progress();
    }

    pub(crate) fn push_record(
        &mut self,
        record: AssetRecord,
    ) {
        self.records.push(record);
    }

    pub(crate) fn record(
        &self,
        index: usize,
    ) -> Option<&AssetRecord> {
        self.records.get(index)
    }

    pub(crate) fn record_mut(
        &mut self,
        index: usize,
    ) -> Option<&mut AssetRecord> {
        self.records.get_mut(index)
    }

    pub(crate) fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Index of the first record still waiting to load. Dispatch order is this linear
    /// scan, deliberately: first-found-in-list, not priority-ordered.
    pub(crate) fn first_waiting(&self) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.state() == LoadState::Waiting)
    }

    pub(crate) fn all_finished(&self) -> bool {
        self.records
            .iter()
            .all(|record| record.state() == LoadState::Finished)
    }

    /// Resets every failed record back to waiting, returning how many were reset.
    pub(crate) fn reset_failed(&mut self) -> usize {
        let mut count = 0;
        for record in &mut self.records {
            if record.state() == LoadState::Failed {
                record.set_state(LoadState::Waiting);
                count += 1;
            }
        }
        count
    }

    /// Reports terminal failure, listing every record still in the failed state.
    pub(crate) fn report_failed_items(&mut self) {
        let lines: Vec<String> = self
            .records
            .iter()
            .filter(|record| record.state() == LoadState::Failed)
            .map(|record| record.key().to_string())
            .collect();
        let msg = format!("failed to load assets:\n{}", lines.join("\n"));
        self.fail(ErrorCode::FileLoadFailed, &msg);
    }

    fn report_progress(&mut self) {
        let Some(progress) = self.callbacks.progress.as_mut() else {
            return;
        };
        let mut completed = 0u32;
        let mut total = 0u32;
        for count in self.item_counts.values() {
            completed += count.completed;
            total += count.total;
        }
        // 0/0 is undefined until at least one item has registered a total
        let percent = if total == 0 {
            0.0
        } else {
            (completed as f32 / total as f32).clamp(0.0, 1.0)
        };
        progress(percent);
    }

    /// Reports terminal success. Idempotent; a second call is a no-op.
    pub(crate) fn complete_all(&mut self) {
        if self.is_complete {
            return;
        }
        self.is_complete = true;
        if let Some(complete) = self.callbacks.complete.as_mut() {
            complete();
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub(crate) fn fail(
        &mut self,
        code: ErrorCode,
        msg: &str,
    ) {
        if let Some(fail) = self.callbacks.fail.as_mut() {
            fail(code, msg);
        }
    }
}
