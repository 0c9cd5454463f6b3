//! Validating decode from raw JSON into the typed records.
//!
//! Files on disk were written by several generations of the pipeline, so
//! numbers sometimes arrive as strings, optional text as `"N/A"` or `""`, and
//! individual race entries may be incomplete. Missing optional fields become
//! `None`/empty; a record without a jockey name is rejected; a single broken
//! race entry is dropped without losing the rest of the record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{DerivedStats, JockeyRecord, RaceEntry, VenueMeeting};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON object")]
    NotAnObject,

    #[error("record has no jockey name")]
    MissingName,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJockeyRecord {
    #[serde(default, deserialize_with = "opt_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "bool_or_false")]
    is_female: bool,
    #[serde(default, deserialize_with = "string_or_empty")]
    rank: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    location: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    age: String,
    #[serde(default)]
    stats: Value,
    #[serde(default)]
    derived: Value,
}

/// Decode a jockey file.
pub fn decode_jockey(raw: &str) -> Result<JockeyRecord, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }

    let raw: RawJockeyRecord = serde_json::from_value(value)?;
    let name = raw.name.ok_or(DecodeError::MissingName)?;

    let entries = match raw.stats {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            warn!("Jockey {}: stats is not an array ({}), ignoring", name, type_name(&other));
            Vec::new()
        }
    };

    let mut stats = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<RaceEntry>(entry) {
            Ok(entry) => stats.push(entry),
            Err(e) => warn!("Jockey {}: dropping race entry #{}: {}", name, index, e),
        }
    }

    // Derived stats are recomputed on every derive run, so a stale or
    // foreign-shaped block is simply discarded.
    let derived = match raw.derived {
        Value::Null => None,
        value => match serde_json::from_value::<DerivedStats>(value) {
            Ok(derived) => Some(derived),
            Err(e) => {
                debug!("Jockey {}: discarding derived block: {}", name, e);
                None
            }
        },
    };

    Ok(JockeyRecord {
        name,
        is_female: raw.is_female,
        rank: raw.rank,
        location: raw.location,
        age: raw.age,
        stats,
        derived,
    })
}

/// Decode a meeting file.
pub fn decode_meeting(raw: &str) -> Result<VenueMeeting, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject);
    }
    Ok(serde_json::from_value(value)?)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned = s.trim().trim_start_matches('$').trim_end_matches("kg").trim();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

// ==================== Field deserializers ====================

pub fn opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_as_f64)
        .filter(|n| *n > 0.0))
}

pub fn opt_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_as_f64)
        .filter(|n| *n >= 1.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32))
}

pub fn u32_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_as_f64)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX))
        .map_or(0, |n| n as u32))
}

pub fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

pub fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(opt_string(deserializer)?.unwrap_or_default())
}

pub fn opt_grade<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(opt_string(deserializer)?.filter(|g| !g.eq_ignore_ascii_case("n/a")))
}

pub fn bool_or_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}
