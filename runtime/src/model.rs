//! The index record shared by every extractor, the store and the REST layer.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Timestamp format stamped by extractors when the source carries none.
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the global indices listing.
///
/// Every market field is kept as the raw string the source produced; signs,
/// separators and currency symbols are never normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub change: String,
    #[serde(default)]
    pub high: String,
    #[serde(default)]
    pub low: String,
    #[serde(default)]
    pub open: String,
    #[serde(default)]
    pub prev_close: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Current time in [`RECORD_TIME_FORMAT`].
pub fn now_stamp() -> String {
    Utc::now().format(RECORD_TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_flat_shape() {
        let record = IndexRecord {
            name: "NIKKEI 225".to_string(),
            change: "-120.50".to_string(),
            ..IndexRecord::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();
        let keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["name", "change", "high", "low", "open", "prev_close", "timestamp"]
        );
        assert!(!obj.contains_key("change_percent"));
    }

    #[test]
    fn test_record_ignores_unknown_fields_on_read() {
        let record: IndexRecord = serde_json::from_str(
            r#"{"name": "DAX", "change": "3.1", "change_percent": "0.2%"}"#,
        )
        .unwrap();
        assert_eq!(record.name, "DAX");
        assert_eq!(record.change, "3.1");
        assert!(record.high.is_empty());
    }

    #[test]
    fn test_now_stamp_format() {
        let stamp = now_stamp();
        assert_eq!(stamp.len(), "2026-01-01 00:00:00".len());
        assert!(chrono::NaiveDateTime::parse_from_str(&stamp, RECORD_TIME_FORMAT).is_ok());
    }
}
