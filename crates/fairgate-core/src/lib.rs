pub mod config;
pub mod snapshot;
pub mod types;

pub use config::{ConfigError, FairgateConfig, Parameters, RawParameters, StorageBackend, StorageConfig};
pub use snapshot::{BatchError, Malformed, SnapshotRecord};
pub use types::*;
