//! Workflow context assembly.
//!
//! Builds the partial mapping of known sub-results that rides along with an
//! outbound request. Absent slots are omitted, never sent as null, and an
//! empty context is never attached at all.

use serde_json::{Map, Value};

use super::store::DurableSlotStore;
use super::types::{is_object_shaped, Slot};

/// Sub-results currently known, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowContext {
    entries: Map<String, Value>,
}

impl WorkflowContext {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, slot: Slot) -> Option<&Value> {
        self.entries.get(slot.field_name())
    }

    /// Field names present.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    /// Serialized form for the `context` field, or `None` when empty.
    pub fn to_attachment(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        serde_json::to_string(&self.entries).ok()
    }
}

/// Assemble context from the four context-relevant slots.
pub fn assemble_context(store: &DurableSlotStore) -> WorkflowContext {
    assemble_context_from(store, &Slot::CONTEXT)
}

/// Assemble context from a chosen subset of slots.
///
/// Raw-text slots and non-object values are never included.
pub fn assemble_context_from(store: &DurableSlotStore, slots: &[Slot]) -> WorkflowContext {
    let mut entries = Map::new();

    for &slot in slots {
        if slot.is_text() {
            continue;
        }
        if let Some(value) = store.read_slot(slot).filter(is_object_shaped) {
            entries.insert(slot.field_name().to_string(), value);
        }
    }

    let context = WorkflowContext { entries };
    if context.is_empty() {
        tracing::info!("no context keys found to include");
    } else {
        tracing::info!(keys = ?context.keys(), "including context keys");
    }
    context
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_store_gives_empty_context() {
        let store = DurableSlotStore::in_memory();
        let ctx = assemble_context(&store);
        assert!(ctx.is_empty());
        assert!(ctx.to_attachment().is_none());
    }

    #[test]
    fn test_only_present_slots_included() {
        let store = DurableSlotStore::in_memory();
        store.write_json(Slot::ValidationResults.key(), &json!({"rows": 10}));

        let ctx = assemble_context(&store);
        assert_eq!(ctx.keys(), vec!["validation_results"]);
        assert_eq!(
            serde_json::from_str::<Value>(&ctx.to_attachment().unwrap()).unwrap(),
            json!({"validation_results": {"rows": 10}})
        );
    }

    #[test]
    fn test_audit_trail_and_texts_excluded() {
        let store = DurableSlotStore::in_memory();
        store.write_json(Slot::AuditTrail.key(), &json!([{"event": "x"}]));
        store.write_text(Slot::NbimCsvText.key(), "A,B\n1,2");

        assert!(assemble_context(&store).is_empty());
        // Even when requested explicitly, raw text never becomes context.
        assert!(assemble_context_from(&store, &[Slot::NbimCsvText]).is_empty());
    }

    #[test]
    fn test_non_object_stored_value_skipped() {
        let store = DurableSlotStore::in_memory();
        store.write_json(Slot::ClassifiedBreaks.key(), &json!("pending"));
        store.write_text(Slot::BreaksFoundGlobal.key(), "{corrupt");
        store.write_json(Slot::CorrectionsList.key(), &json!([1]));

        let ctx = assemble_context(&store);
        assert_eq!(ctx.keys(), vec!["corrections_list"]);
    }

    #[test]
    fn test_subset_assembly() {
        let store = DurableSlotStore::in_memory();
        store.write_json(Slot::ValidationResults.key(), &json!({"rows": 10}));
        store.write_json(Slot::ClassifiedBreaks.key(), &json!({"x": 1}));

        let ctx = assemble_context_from(&store, &[Slot::ClassifiedBreaks]);
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.get(Slot::ClassifiedBreaks), Some(&json!({"x": 1})));
        assert!(ctx.get(Slot::ValidationResults).is_none());
    }

    #[test]
    fn test_all_four_present() {
        let store = DurableSlotStore::in_memory();
        for slot in Slot::EXTRACTED {
            store.write_json(slot.key(), &json!({"slot": slot.key()}));
        }
        let ctx = assemble_context(&store);
        let mut keys = ctx.keys();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "breaks_found_global",
                "classified_breaks",
                "corrections_list",
                "validation_results"
            ]
        );
    }
}
