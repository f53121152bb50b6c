/// Load progress of one configured item within a session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// Registered but not dispatched yet
    Waiting,
    /// A load request is in flight
    Loading,
    /// Loaded and registered in the pool
    Finished,
    /// The load failed; eligible for a retry pass
    Failed,
}

/// Error codes surfaced through a session's fail callback.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    /// An individual file or directory load failed after its bundle was available
    FileLoadFailed = 1,
    /// A named bundle could not be resolved
    BundleLoadFailed = 2,
}
