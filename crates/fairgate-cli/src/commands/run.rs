use std::path::Path;

use fairgate_core::RunSummary;
use fairgate_core::snapshot::load_batch;
use fairgate_engine::Engine;

use super::{load_config, open_store, resolve_storage};
use crate::StorageArgs;

pub fn run(config: &Path, snapshots: &Path, storage: &StorageArgs, format: &str) -> anyhow::Result<()> {
    let (config, params) = load_config(config)?;
    let storage = resolve_storage(&config, storage)?;
    let records = load_batch(snapshots)?;

    let engine = Engine::new(params, open_store(&storage)?);
    let summary = engine.run(records)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => print!("{}", format_summary(&summary)),
    }
    Ok(())
}

fn format_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str("✓ Engine run complete\n");
    out.push_str(&format!("  Snapshots processed: {}\n", summary.snapshots_processed));
    out.push_str(&format!("  Units touched:       {}\n", summary.units_touched));
    out.push_str(&format!("  Events emitted:      {}\n", summary.events_emitted));
    out.push_str(&format!("  Malformed skipped:   {}\n", summary.malformed_skipped));
    out
}
