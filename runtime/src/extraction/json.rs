//! Structured-JSON extraction.
//!
//! Locates the list of index entries inside an arbitrary JSON document with
//! an ordered chain of lookups, then maps every entry through static alias
//! tables. Nothing here can fail: an unrecognised document yields no records.

use crate::model::{now_stamp, IndexRecord};
use serde_json::{Map, Value};
use tracing::{debug, info};

type Object = Map<String, Value>;

/// A lookup searches for the entry list in one known place. A lookup that
/// finds its key claims the document even when the value is not a list.
type Lookup = fn(&Object) -> Option<&Value>;

/// Lookups in priority order; the first match wins.
const LOOKUPS: &[(&str, Lookup)] = &[
    ("indices", top_level_indices),
    ("data.indices", nested_indices),
    ("data", data_list),
    ("scan", first_index_like_list),
];

/// Record fields that can be filled from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Change,
    High,
    Low,
    Open,
    PrevClose,
    Timestamp,
}

/// Accepted source keys per field, in priority order.
const ALIASES: &[(Field, &[&str])] = &[
    (Field::Name, &["name"]),
    (Field::Change, &["change", "absoluteChange"]),
    (Field::High, &["high", "dayHigh"]),
    (Field::Low, &["low", "dayLow"]),
    (Field::Open, &["open", "openPrice"]),
    (Field::PrevClose, &["prevClose", "previousClose"]),
    (Field::Timestamp, &["timestamp"]),
];

/// Extract index records from a JSON document.
///
/// Order follows the source list. Elements that are not objects are skipped.
pub fn process_json_data(data: &Value) -> Vec<IndexRecord> {
    let Some(obj) = data.as_object() else {
        debug!("JSON document is not an object; nothing to extract");
        return Vec::new();
    };
    debug!(keys = ?obj.keys().collect::<Vec<_>>(), "probing JSON document");

    let Some(entries) = locate_entries(obj) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(Value::as_object)
        .map(record_from_entry)
        .collect()
}

/// Whether a JSON value carries nothing worth extracting.
pub fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(o) => o.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn locate_entries(obj: &Object) -> Option<&Vec<Value>> {
    let (label, found) = LOOKUPS
        .iter()
        .find_map(|(label, lookup)| lookup(obj).map(|v| (*label, v)))?;
    match found.as_array() {
        Some(list) => {
            info!(location = label, len = list.len(), "found candidate indices list");
            Some(list)
        }
        None => {
            debug!(location = label, "indices location holds no list");
            None
        }
    }
}

fn top_level_indices(obj: &Object) -> Option<&Value> {
    obj.get("indices")
}

fn nested_indices(obj: &Object) -> Option<&Value> {
    obj.get("data")?.as_object()?.get("indices")
}

fn data_list(obj: &Object) -> Option<&Value> {
    obj.get("data").filter(|v| v.is_array())
}

fn first_index_like_list(obj: &Object) -> Option<&Value> {
    obj.values().find(|value| {
        value
            .as_array()
            .and_then(|list| list.first())
            .and_then(Value::as_object)
            .is_some_and(|first| first.contains_key("name") || first.contains_key("index"))
    })
}

fn record_from_entry(entry: &Object) -> IndexRecord {
    let mut record = IndexRecord::default();
    for (field, keys) in ALIASES {
        let value = keys.iter().find_map(|k| entry.get(*k)).map(raw_text);
        let slot = match field {
            Field::Name => &mut record.name,
            Field::Change => &mut record.change,
            Field::High => &mut record.high,
            Field::Low => &mut record.low,
            Field::Open => &mut record.open,
            Field::PrevClose => &mut record.prev_close,
            Field::Timestamp => &mut record.timestamp,
        };
        *slot = match (field, value) {
            (Field::Timestamp, None) => now_stamp(),
            (_, v) => v.unwrap_or_default(),
        };
    }
    record
}

/// Render a JSON value as the raw string kept in a record.
fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
