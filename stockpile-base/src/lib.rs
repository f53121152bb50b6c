pub mod hashing;

mod asset_id;
mod asset_key;
mod asset_type_id;
mod config;
mod state;

pub use asset_id::AssetId;
pub use asset_key::AssetKey;
pub use asset_type_id::AssetTypeId;
pub use config::AssetConfig;
pub use config::DEFAULT_BUNDLE;
pub use state::ErrorCode;
pub use state::LoadState;
