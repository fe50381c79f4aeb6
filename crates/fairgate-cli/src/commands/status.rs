use std::path::Path;

use anyhow::bail;
use fairgate_core::UnitState;
use fairgate_state::UnitStore;

use super::{load_config, open_store, resolve_storage};
use crate::StorageArgs;

pub fn status(config: &Path, storage: &StorageArgs, unit: Option<&str>, format: &str) -> anyhow::Result<()> {
    let (config, _) = load_config(config)?;
    let store = open_store(&resolve_storage(&config, storage)?)?;
    let units = store.load_units()?;

    let selected: Vec<&UnitState> = match unit {
        Some(id) => match units.get(id) {
            Some(state) => vec![state],
            None => bail!("unknown unit: {id}"),
        },
        None => units.values().collect(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&selected)?),
        _ => print!("{}", format_table(&selected)),
    }
    Ok(())
}

fn format_table(units: &[&UnitState]) -> String {
    if units.is_empty() {
        return "No units recorded yet.\n".to_string();
    }
    let mut out = format!(
        "{:<24} {:<10} {:>6} {:>8} {:>7}  {}\n",
        "UNIT", "STATE", "COUNT", "COOLDOWN", "RATIO", "LAST SEEN"
    );
    for u in units {
        out.push_str(&format!(
            "{:<24} {:<10} {:>6} {:>8} {:>7.3}  {}\n",
            u.unit_id,
            u.state.label(),
            u.consecutive,
            u.cooldown_left,
            u.last_ratio,
            u.last_timestamp
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairgate_core::FlagState;

    #[test]
    fn table_has_one_row_per_unit() {
        let a = UnitState {
            unit_id: "north-ward".to_string(),
            state: FlagState::Candidate,
            consecutive: 2,
            cooldown_left: 0,
            last_ratio: 0.58,
            last_timestamp: "2024-01-02T00:00:00Z".to_string(),
        };
        let table = format_table(&[&a]);
        assert_eq!(table.lines().count(), 2);
        assert!(table.contains("CANDIDATE"));
        assert!(table.contains("0.580"));
    }

    #[test]
    fn empty_table_message() {
        assert_eq!(format_table(&[]), "No units recorded yet.\n");
    }
}
