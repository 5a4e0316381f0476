//! Shared types for the workflow core.
//!
//! Stages, durable slots, stage cache entries and stage states used across
//! the extractor, context assembler and orchestrator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::fingerprint::Fingerprint;

// ─── Stages ─────────────────────────────────────────────────────────────────

/// One of the three workflow steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Identify,
    Fix,
    Report,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Identify, Stage::Fix, Stage::Report];

    /// Store key of this stage's cache entry.
    pub fn cache_key(self) -> &'static str {
        match self {
            Stage::Identify => "workflow:identify_breaks",
            Stage::Fix => "workflow:breaks_fixer",
            Stage::Report => "workflow:report_generation",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Identify => "identify",
            Stage::Fix => "fix",
            Stage::Report => "report",
        }
    }
}

// ─── Slots ──────────────────────────────────────────────────────────────────

/// A named, independently-present durable storage location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    ValidationResults,
    BreaksFoundGlobal,
    ClassifiedBreaks,
    CorrectionsList,
    AuditTrail,
    /// Raw text of the uploaded NBIM file.
    NbimCsvText,
    /// Raw text of the uploaded custody file.
    CustodyCsvText,
}

impl Slot {
    /// Slots filled from a stage response, in extraction order.
    pub const EXTRACTED: [Slot; 5] = [
        Slot::ValidationResults,
        Slot::BreaksFoundGlobal,
        Slot::ClassifiedBreaks,
        Slot::CorrectionsList,
        Slot::AuditTrail,
    ];

    /// Slots eligible for outbound context. Audit trail and raw texts never are.
    pub const CONTEXT: [Slot; 4] = [
        Slot::ValidationResults,
        Slot::BreaksFoundGlobal,
        Slot::ClassifiedBreaks,
        Slot::CorrectionsList,
    ];

    /// Store key of the slot.
    pub fn key(self) -> &'static str {
        match self {
            Slot::ValidationResults => "validation_results",
            Slot::BreaksFoundGlobal => "breaks_found_global",
            Slot::ClassifiedBreaks => "classified_breaks",
            Slot::CorrectionsList => "corrections_list",
            Slot::AuditTrail => "audit_trail",
            Slot::NbimCsvText => "nbim_csv_text",
            Slot::CustodyCsvText => "custody_csv_text",
        }
    }

    /// Field name used in stage payloads and in outbound context.
    ///
    /// Structured slots share their store key with their field name.
    pub fn field_name(self) -> &'static str {
        self.key()
    }

    /// Raw-text slots are stored verbatim rather than as JSON.
    pub fn is_text(self) -> bool {
        matches!(self, Slot::NbimCsvText | Slot::CustodyCsvText)
    }
}

/// JSON values treated as "object-shaped": objects and arrays.
pub fn is_object_shaped(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

// ─── Stage Cache ────────────────────────────────────────────────────────────

/// Fingerprints of the two Identify inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFingerprints {
    pub primary: Fingerprint,
    pub secondary: Fingerprint,
}

/// A cached stage result. Written whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCacheEntry {
    /// The full response document, verbatim.
    pub response: Value,
    /// Epoch milliseconds when the entry was written.
    pub timestamp: i64,
    /// Identify only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_fingerprints: Option<InputFingerprints>,
}

impl StageCacheEntry {
    pub fn new(response: Value, input_fingerprints: Option<InputFingerprints>) -> Self {
        Self {
            response,
            timestamp: chrono::Utc::now().timestamp_millis(),
            input_fingerprints,
        }
    }

    /// Whether this entry was produced from exactly these inputs.
    pub fn matches_inputs(&self, inputs: &InputFingerprints) -> bool {
        self.input_fingerprints.as_ref() == Some(inputs)
    }
}

// ─── Stage State ────────────────────────────────────────────────────────────

/// Logical lifecycle of a stage: `NotRun -> Running -> {Cached, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    NotRun,
    Running,
    Cached,
    Failed,
}

// ─── Tests ──────────────────────────────────────────────────────────────────
