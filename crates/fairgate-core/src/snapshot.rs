//! Snapshot batch ingest.
//!
//! Batches arrive as a JSON array. Records are validated one by one so a
//! single bad record never takes the whole batch down: each element comes
//! back as either a [`Snapshot`] or the reason it was rejected.

use std::path::Path;

use serde_json::Value;
use serde_json::value::RawValue;
use thiserror::Error;

use crate::types::Snapshot;

/// Why a single record was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Malformed {
    #[error("record #{index} is not an object")]
    NotAnObject { index: usize },
    #[error("record #{index} is missing `{field}`")]
    MissingField { index: usize, field: &'static str },
    #[error("record #{index} has an invalid `{field}`")]
    InvalidField { index: usize, field: &'static str },
    #[error("record #{index} could not be decoded: {message}")]
    Undecodable { index: usize, message: String },
}

/// Errors that make the whole batch unreadable.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to read snapshot batch: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot batch is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot batch must be a JSON array")]
    NotAnArray,
}

pub type SnapshotRecord = Result<Snapshot, Malformed>;

fn text_field(
    obj: &serde_json::Map<String, Value>,
    index: usize,
    field: &'static str,
) -> Result<String, Malformed> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(Malformed::MissingField { index, field }),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(_) => Err(Malformed::InvalidField { index, field }),
    }
}

/// Validate one record of a batch.
pub fn parse_record(index: usize, value: &Value) -> SnapshotRecord {
    let obj = value.as_object().ok_or(Malformed::NotAnObject { index })?;
    let unit_id = text_field(obj, index, "unit_id")?;
    let timestamp = text_field(obj, index, "timestamp")?;
    let ratio = match obj.get("ratio") {
        None | Some(Value::Null) => {
            return Err(Malformed::MissingField {
                index,
                field: "ratio",
            });
        }
        Some(v) => v
            .as_f64()
            .filter(|r| r.is_finite())
            .ok_or(Malformed::InvalidField {
                index,
                field: "ratio",
            })?,
    };

    Ok(Snapshot {
        unit_id,
        timestamp,
        ratio,
    })
}

/// Parse a JSON array of snapshot records, keeping feed order.
///
/// The array is split into raw elements first, so a record JSON cannot
/// represent as a value (an out-of-range number, say) is skipped on its
/// own instead of failing the batch.
pub fn parse_batch(json: &str) -> Result<Vec<SnapshotRecord>, BatchError> {
    let items: Vec<&RawValue> = match serde_json::from_str(json) {
        Ok(items) => items,
        Err(e) if e.is_data() => return Err(BatchError::NotAnArray),
        Err(e) => return Err(e.into()),
    };
    Ok(items
        .into_iter()
        .enumerate()
        .map(|(index, raw)| match serde_json::from_str::<Value>(raw.get()) {
            Ok(item) => parse_record(index, &item),
            Err(e) => Err(Malformed::Undecodable {
                index,
                message: e.to_string(),
            }),
        })
        .collect())
}

pub fn load_batch(path: &Path) -> Result<Vec<SnapshotRecord>, BatchError> {
    let content = std::fs::read_to_string(path)?;
    parse_batch(&content)
}
