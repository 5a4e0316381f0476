//! Durable slot store.
//!
//! [`SlotStore`] is the raw string-keyed back-end contract: synchronous,
//! process-wide, no transactions, no expiry, writes that may fail.
//! [`DurableSlotStore`] wraps a back-end and turns every failure into
//! "absent" on read and "no-op" on write, so the cache can never abort a
//! stage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::StoreError;
use super::types::Slot;

// ─── Back-end Trait ─────────────────────────────────────────────────────────

/// A synchronous string-keyed key-value store.
pub trait SlotStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Remove every key.
    fn clear(&self) -> Result<(), StoreError>;
}

// ─── In-memory Back-end ─────────────────────────────────────────────────────

/// Heap-backed store, optionally capped to simulate a storage quota.
#[derive(Debug, Default)]
pub struct MemorySlotStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes once keys plus values exceed `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SlotStore for MemorySlotStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;

        if let Some(quota) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .clear();
        Ok(())
    }
}

// ─── Fail-closed Wrapper ────────────────────────────────────────────────────

/// Best-effort typed access over any [`SlotStore`].
///
/// Cloning is cheap and shares the same back-end.
#[derive(Clone)]
pub struct DurableSlotStore {
    inner: Arc<dyn SlotStore>,
}

impl DurableSlotStore {
    pub fn new(inner: Arc<dyn SlotStore>) -> Self {
        Self { inner }
    }

    /// A fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySlotStore::new()))
    }

    /// Read and deserialize a JSON value. Any failure reads as absent.
    pub fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_text(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key, error = %e, "failed to parse stored value");
                None
            }
        }
    }

    /// Read a raw string. Empty strings read as absent.
    pub fn read_text(&self, key: &str) -> Option<String> {
        match self.inner.get(key) {
            Ok(Some(raw)) if !raw.is_empty() => Some(raw),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(key, error = %e, "slot store read failed");
                None
            }
        }
    }

    /// Serialize and write a value. Failures leave the prior value in place.
    pub fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.write_text(key, &raw),
            Err(e) => tracing::warn!(key, error = %e, "failed to serialize slot value"),
        }
    }

    /// Write a raw string. Failures leave the prior value in place.
    pub fn write_text(&self, key: &str, value: &str) {
        if let Err(e) = self.inner.set(key, value) {
            tracing::warn!(key, error = %e, "slot store write dropped");
        }
    }

    /// Empty every slot and stage cache entry.
    pub fn clear_all(&self) {
        if let Err(e) = self.inner.clear() {
            tracing::warn!(error = %e, "slot store clear failed");
        }
    }

    /// Read a structured slot.
    pub fn read_slot(&self, slot: Slot) -> Option<serde_json::Value> {
        if slot.is_text() {
            self.read_text(slot.key()).map(serde_json::Value::String)
        } else {
            self.read_json(slot.key())
        }
    }

    /// Read a raw-text slot.
    pub fn read_slot_text(&self, slot: Slot) -> Option<String> {
        self.read_text(slot.key())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    /// Back-end whose every call fails.
    struct BrokenStore;

    impl SlotStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::DatabaseError {
                reason: "disk I/O error".into(),
            })
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::DatabaseError {
                reason: "disk I/O error".into(),
            })
        }
        fn clear(&self) -> Result<(), StoreError> {
            Err(StoreError::LockPoisoned)
        }
    }

    #[test]
    fn test_json_round_trip() {
        let store = DurableSlotStore::in_memory();
        store.write_json("classified_breaks", &json!({"x": 1}));
        assert_eq!(
            store.read_json::<Value>("classified_breaks"),
            Some(json!({"x": 1}))
        );
    }

    #[test]
    fn test_absent_key_reads_none() {
        let store = DurableSlotStore::in_memory();
        assert!(store.read_json::<Value>("validation_results").is_none());
        assert!(store.read_text("nbim_csv_text").is_none());
    }

    #[test]
    fn test_corrupt_json_reads_none() {
        let backend = Arc::new(MemorySlotStore::new());
        backend.set("corrections_list", "{not json").unwrap();
        let store = DurableSlotStore::new(backend);
        assert!(store.read_json::<Value>("corrections_list").is_none());
        // Raw access still sees the text.
        assert_eq!(store.read_text("corrections_list").as_deref(), Some("{not json"));
    }

    #[test]
    fn test_broken_backend_is_invisible() {
        let store = DurableSlotStore::new(Arc::new(BrokenStore));
        store.write_json("audit_trail", &json!([1]));
        store.clear_all();
        assert!(store.read_json::<Value>("audit_trail").is_none());
        assert!(store.read_slot(Slot::AuditTrail).is_none());
    }

    #[test]
    fn test_quota_write_keeps_prior_value() {
        let backend = Arc::new(MemorySlotStore::with_quota(64));
        let store = DurableSlotStore::new(backend.clone());

        store.write_text("nbim_csv_text", "A,B\n1,2");
        store.write_text("nbim_csv_text", &"x".repeat(500));

        assert_eq!(store.read_text("nbim_csv_text").as_deref(), Some("A,B\n1,2"));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_quota_counts_replacement_not_addition() {
        let backend = MemorySlotStore::with_quota(20);
        backend.set("k", "0123456789").unwrap();
        // Replacing the same key frees its old bytes first.
        backend.set("k", "9876543210").unwrap();
        assert!(matches!(
            backend.set("other", "0123456789"),
            Err(StoreError::QuotaExceeded { .. })
        ));
    }

    #[test]
    fn test_clear_all_empties_store() {
        let backend = Arc::new(MemorySlotStore::new());
        let store = DurableSlotStore::new(backend.clone());
        store.write_json("validation_results", &json!({"ok": true}));
        store.write_text("custody_csv_text", "A,B\n3,4");
        store.clear_all();
        assert!(backend.is_empty());
    }

    #[test]
    fn test_read_slot_text_and_structured() {
        let store = DurableSlotStore::in_memory();
        store.write_text(Slot::NbimCsvText.key(), "A,B\n1,2");
        store.write_json(Slot::CorrectionsList.key(), &json!([{"break_id": 1}]));

        assert_eq!(store.read_slot_text(Slot::NbimCsvText).as_deref(), Some("A,B\n1,2"));
        assert_eq!(
            store.read_slot(Slot::NbimCsvText),
            Some(Value::String("A,B\n1,2".into()))
        );
        assert_eq!(
            store.read_slot(Slot::CorrectionsList),
            Some(json!([{"break_id": 1}]))
        );
    }
}
