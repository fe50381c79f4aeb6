pub mod check;
pub mod init;
pub mod run;
pub mod status;

use std::path::Path;

use anyhow::bail;
use fairgate_core::{FairgateConfig, Parameters, StorageBackend, StorageConfig};
use fairgate_state::{JsonFileStore, RedbStore, UnitStore};

use crate::StorageArgs;

/// Load the config file and validate its parameters.
///
/// Runs before any store is opened, so a bad config never touches state.
pub fn load_config(path: &Path) -> anyhow::Result<(FairgateConfig, Parameters)> {
    let config = FairgateConfig::from_file(path)?;
    let params = config.parameters()?;
    Ok((config, params))
}

/// Merge CLI overrides into the configured storage section.
pub fn resolve_storage(config: &FairgateConfig, args: &StorageArgs) -> anyhow::Result<StorageConfig> {
    let mut storage = config.storage();
    if let Some(backend) = &args.backend {
        storage.backend = Some(match backend.as_str() {
            "json" => StorageBackend::Json,
            "redb" => StorageBackend::Redb,
            other => bail!("unknown storage backend: {other}"),
        });
    }
    if let Some(p) = &args.state {
        storage.state_path = Some(p.clone());
    }
    if let Some(p) = &args.events {
        storage.events_path = Some(p.clone());
    }
    if let Some(p) = &args.db {
        storage.db_path = Some(p.clone());
    }
    Ok(storage)
}

pub fn open_store(storage: &StorageConfig) -> anyhow::Result<Box<dyn UnitStore>> {
    let store: Box<dyn UnitStore> = match storage.backend() {
        StorageBackend::Json => Box::new(JsonFileStore::new(
            storage.state_path(),
            storage.events_path(),
        )),
        StorageBackend::Redb => Box::new(RedbStore::open(&storage.db_path())?),
    };
    tracing::debug!(backend = ?storage.backend(), "store opened");
    Ok(store)
}
