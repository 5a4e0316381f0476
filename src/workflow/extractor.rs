//! Stage output extraction.
//!
//! Pulls the named sub-results out of a stage response and persists each one
//! to its own slot. A missing or malformed payload, or a missing field, is
//! skipped silently; extraction never fails a stage.

use serde_json::{Map, Value};

use super::store::DurableSlotStore;
use super::types::{is_object_shaped, Slot};
use crate::client::WorkflowResponse;

/// The structured payload of a stage response, one optional field per slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagePayload {
    pub validation_results: Option<Value>,
    pub breaks_found_global: Option<Value>,
    pub classified_breaks: Option<Value>,
    pub corrections_list: Option<Value>,
    pub audit_trail: Option<Value>,
}

impl StagePayload {
    /// Keep only object-shaped values under the known field names.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let field = |slot: Slot| {
            object
                .get(slot.field_name())
                .filter(|v| is_object_shaped(v))
                .cloned()
        };

        Self {
            validation_results: field(Slot::ValidationResults),
            breaks_found_global: field(Slot::BreaksFoundGlobal),
            classified_breaks: field(Slot::ClassifiedBreaks),
            corrections_list: field(Slot::CorrectionsList),
            audit_trail: field(Slot::AuditTrail),
        }
    }

    /// The value destined for `slot`, if present.
    pub fn get(&self, slot: Slot) -> Option<&Value> {
        match slot {
            Slot::ValidationResults => self.validation_results.as_ref(),
            Slot::BreaksFoundGlobal => self.breaks_found_global.as_ref(),
            Slot::ClassifiedBreaks => self.classified_breaks.as_ref(),
            Slot::CorrectionsList => self.corrections_list.as_ref(),
            Slot::AuditTrail => self.audit_trail.as_ref(),
            Slot::NbimCsvText | Slot::CustodyCsvText => None,
        }
    }

    /// Present fields, in extraction order.
    pub fn present(&self) -> Vec<(Slot, &Value)> {
        Slot::EXTRACTED
            .iter()
            .filter_map(|&slot| self.get(slot).map(|v| (slot, v)))
            .collect()
    }
}

/// Locate the structured payload inside a raw response document.
///
/// Prefers `result.output_parsed`; falls back to decoding
/// `result.output_text` as JSON. Returns `None` when neither yields a JSON
/// object.
pub fn locate_payload(response: &Value) -> Option<StagePayload> {
    let result = WorkflowResponse::from_value(response).result?;

    let parsed = match result.output_parsed {
        Some(parsed) => parsed,
        None => {
            let text = result.output_text?;
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!(error = %e, "output_text is not JSON, skipping extraction");
                    return None;
                }
            }
        }
    };

    parsed.as_object().map(StagePayload::from_object)
}

/// Persist every present sub-result of `response` to its slot.
///
/// Idempotent: the same response always yields the same slot contents.
pub fn extract_stage_outputs(store: &DurableSlotStore, response: &Value) {
    let Some(payload) = locate_payload(response) else {
        tracing::debug!("no structured payload in stage response");
        return;
    };

    for (slot, value) in payload.present() {
        store.write_json(slot.key(), value);
        tracing::info!(field = slot.field_name(), "saved stage output");
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_parsed_is_preferred() {
        let response = json!({
            "success": true,
            "result": {
                "output_parsed": {"classified_breaks": {"from": "parsed"}},
                "output_text": "{\"classified_breaks\": {\"from\": \"text\"}}"
            }
        });
        let payload = locate_payload(&response).unwrap();
        assert_eq!(payload.classified_breaks, Some(json!({"from": "parsed"})));
    }

    #[test]
    fn test_output_text_fallback() {
        let response = json!({
            "result": {"output_text": "{\"validation_results\": {\"rows\": 12}}"}
        });
        let payload = locate_payload(&response).unwrap();
        assert_eq!(payload.validation_results, Some(json!({"rows": 12})));
        assert!(payload.classified_breaks.is_none());
    }

    #[test]
    fn test_null_output_parsed_falls_back_to_text() {
        let response = json!({
            "result": {"output_parsed": null, "output_text": "{\"audit_trail\": []}"}
        });
        let payload = locate_payload(&response).unwrap();
        assert_eq!(payload.audit_trail, Some(json!([])));
    }

    #[test]
    fn test_unparseable_text_yields_none() {
        let response = json!({"result": {"output_text": "Here are your breaks: ..."}});
        assert!(locate_payload(&response).is_none());
    }

    #[test]
    fn test_non_object_payload_yields_none() {
        assert!(locate_payload(&json!({"result": {"output_parsed": "done"}})).is_none());
        assert!(locate_payload(&json!({"result": {"output_text": "[1, 2]"}})).is_none());
        assert!(locate_payload(&json!({"success": true})).is_none());
        assert!(locate_payload(&json!({"result": "flat string"})).is_none());
    }

    #[test]
    fn test_scalar_fields_are_skipped() {
        let response = json!({
            "result": {"output_parsed": {
                "classified_breaks": "none",
                "corrections_list": null,
                "breaks_found_global": 0,
                "audit_trail": [{"step": "fix"}]
            }}
        });
        let payload = locate_payload(&response).unwrap();
        assert_eq!(payload.present().len(), 1);
        assert_eq!(payload.present()[0].0, Slot::AuditTrail);
    }

    #[test]
    fn test_extract_writes_present_slots_only() {
        let store = DurableSlotStore::in_memory();
        store.write_json(Slot::CorrectionsList.key(), &json!(["kept"]));

        let response = json!({
            "success": true,
            "result": {"output_parsed": {
                "classified_breaks": {"x": 1},
                "unknown_field": {"y": 2}
            }}
        });
        extract_stage_outputs(&store, &response);

        assert_eq!(store.read_slot(Slot::ClassifiedBreaks), Some(json!({"x": 1})));
        assert_eq!(store.read_slot(Slot::CorrectionsList), Some(json!(["kept"])));
        assert!(store.read_slot(Slot::ValidationResults).is_none());
        assert!(store.read_text("unknown_field").is_none());
    }

    #[test]
    fn test_extract_is_idempotent() {
        let response = json!({
            "result": {"output_parsed": {
                "validation_results": {"ok": true},
                "breaks_found_global": [{"break_id": 1}],
                "classified_breaks": {"b1": "timing"},
                "corrections_list": [{"break_id": 1, "fix": "rebook"}],
                "audit_trail": [{"event": "identified"}]
            }}
        });

        let once = DurableSlotStore::in_memory();
        extract_stage_outputs(&once, &response);

        let twice = DurableSlotStore::in_memory();
        extract_stage_outputs(&twice, &response);
        extract_stage_outputs(&twice, &response);

        for slot in Slot::EXTRACTED {
            assert!(once.read_slot(slot).is_some());
            assert_eq!(once.read_slot(slot), twice.read_slot(slot));
        }
    }

    #[test]
    fn test_extract_without_payload_has_no_side_effects() {
        let store = DurableSlotStore::in_memory();
        extract_stage_outputs(&store, &json!({"success": true, "result": {}}));
        for slot in Slot::EXTRACTED {
            assert!(store.read_slot(slot).is_none());
        }
    }
}
