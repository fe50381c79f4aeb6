use std::path::{Path, PathBuf};

use anyhow::bail;

use super::load_config;

pub fn check_params(config: &Path, paths: &[PathBuf], strict: bool, format: &str) -> anyhow::Result<()> {
    let (_, params) = load_config(config)?;
    let report = fairgate_crosscheck::crosscheck(&params, paths, strict)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => println!("{}", fairgate_crosscheck::format_report(&report)),
    }

    if !report.passed() {
        bail!("parameter cross-check failed");
    }
    Ok(())
}
