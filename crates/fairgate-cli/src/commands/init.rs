use std::path::Path;

use anyhow::bail;
use fairgate_core::FairgateConfig;

pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    std::fs::write(path, FairgateConfig::scaffold().to_toml_string()?)?;
    println!("✓ Generated {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_a_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fairgate.toml");
        init(&path, false).unwrap();

        let params = FairgateConfig::from_file(&path).unwrap().parameters().unwrap();
        assert_eq!(params.consecutive_required_standard(), 3);

        assert!(init(&path, false).is_err());
        init(&path, true).unwrap();
    }
}
