//! Batched asset loading on top of an engine's asynchronous asset IO.
//!
//! A [`BatchLoader`] drives one batch of file and directory loads from configuration
//! to a terminal state, with aggregate progress reporting, bounded parallelism and
//! configurable retry. Everything it loads successfully is registered in a shared
//! [`AssetPool`], which owns one engine reference per asset and releases assets by
//! batch, path, directory or identifier.
//!
//! The engine side is abstracted behind the [`EngineIo`], [`AssetBundle`] and
//! [`EngineAsset`] traits. Engine completions are delivered as [`LoaderEvent`]s on a
//! channel the session owns; the host calls [`BatchLoader::update`] to pump them.

mod agent;
pub mod bundle_util;
mod engine_io;
mod loader;
mod pool;
mod record;

#[cfg(test)]
pub(crate) mod test_engine;

pub use agent::LoaderCallbacks;
pub use engine_io::{
    AssetBundle, EngineAsset, EngineIo, LoaderEvent, RequestBundleResult, RequestDirProgress,
    RequestDirResult, RequestFileResult, RequestHandle,
};
pub use loader::BatchLoader;
pub use pool::{AssetPool, PoolError};
