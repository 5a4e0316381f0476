//! Typed view over break lists held in slots.
//!
//! The service does not fix the container shape, so both a bare array and an
//! object with a `breaks` array are accepted. Items that do not fit
//! [`BreakItem`] are dropped individually.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Break identifier: the service emits either numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BreakId {
    Number(i64),
    Text(String),
}

/// A single reconciliation break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakItem {
    pub break_id: BreakId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coac_event_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Classifier confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_for_auto_correction: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    // Reviewer acceptance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<String>,
}

/// Read break items out of a slot value.
pub fn read_break_items(value: &Value) -> Vec<BreakItem> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("breaks").and_then(Value::as_array) {
            Some(items) => items,
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    let parsed: Vec<BreakItem> = items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect();

    if parsed.len() < items.len() {
        tracing::debug!(
            total = items.len(),
            skipped = items.len() - parsed.len(),
            "skipped malformed break items"
        );
    }
    parsed
}
