//! Typed access over the raw string store
//!
//! All reads fail open: a malformed value is logged and treated as absent
//! rather than surfaced. Access decisions must never be blocked by corrupt
//! local data, so callers see `None` and fall back to their defaults.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{StoreAdapter, StoreError};

/// Read a JSON-encoded record. Malformed JSON is treated as absent.
pub fn read_record<T: DeserializeOwned>(store: &dyn StoreAdapter, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!("Malformed record under {}: {}", key, e);
            None
        }
    }
}

/// Write a record as JSON.
pub fn write_record<T: Serialize>(
    store: &dyn StoreAdapter,
    key: &str,
    record: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(record)?;
    store.set(key, &json)
}

/// Read a `"true"`/`"false"` flag. Anything else is treated as absent.
pub fn read_bool(store: &dyn StoreAdapter, key: &str) -> Option<bool> {
    let raw = store.get(key)?;
    match raw.trim() {
        "true" => Some(true),
        "false" => Some(false),
        other => {
            tracing::warn!("Malformed flag under {}: {:?}", key, other);
            None
        }
    }
}

/// Write a `"true"`/`"false"` flag.
pub fn write_bool(store: &dyn StoreAdapter, key: &str, value: bool) -> Result<(), StoreError> {
    store.set(key, if value { "true" } else { "false" })
}

/// Read an RFC 3339 timestamp. Accepts a bare string or a JSON-quoted one
/// (older builds wrote the quoted form). Malformed values are absent.
pub fn read_timestamp(store: &dyn StoreAdapter, key: &str) -> Option<DateTime<Utc>> {
    let raw = store.get(key)?;
    let text = raw.trim();
    let text = text.strip_prefix('"').unwrap_or(text);
    let text = text.strip_suffix('"').unwrap_or(text);

    match DateTime::parse_from_rfc3339(text) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("Malformed timestamp under {}: {}", key, e);
            None
        }
    }
}

/// Write a timestamp as a bare RFC 3339 string.
pub fn write_timestamp(
    store: &dyn StoreAdapter,
    key: &str,
    value: DateTime<Utc>,
) -> Result<(), StoreError> {
    store.set(key, &value.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::TimeZone;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_record_roundtrip() {
        let store = MemoryStore::new();
        let sample = Sample {
            name: "acme".to_string(),
            count: 3,
        };

        write_record(&store, "sample", &sample).unwrap();
        let loaded: Sample = read_record(&store, "sample").unwrap();
        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_malformed_record_is_absent() {
        let store = MemoryStore::new();
        store.set("sample", "{broken").unwrap();

        let loaded: Option<Sample> = read_record(&store, "sample");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_bool_roundtrip_and_malformed() {
        let store = MemoryStore::new();

        write_bool(&store, "flag", true).unwrap();
        assert_eq!(store.get("flag").as_deref(), Some("true"));
        assert_eq!(read_bool(&store, "flag"), Some(true));

        write_bool(&store, "flag", false).unwrap();
        assert_eq!(read_bool(&store, "flag"), Some(false));

        store.set("flag", "yes").unwrap();
        assert_eq!(read_bool(&store, "flag"), None);
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let store = MemoryStore::new();
        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();

        write_timestamp(&store, "ts", ts).unwrap();
        assert_eq!(read_timestamp(&store, "ts"), Some(ts));
    }

    #[test]
    fn test_timestamp_accepts_json_quoted_form() {
        let store = MemoryStore::new();
        store.set("ts", "\"2025-03-14T09:26:53+00:00\"").unwrap();

        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(read_timestamp(&store, "ts"), Some(ts));
    }

    #[test]
    fn test_malformed_timestamp_is_absent() {
        let store = MemoryStore::new();
        store.set("ts", "last tuesday").unwrap();
        assert_eq!(read_timestamp(&store, "ts"), None);
    }
}
