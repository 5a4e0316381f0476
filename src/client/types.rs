//! Wire types for the run-workflow endpoint.
//!
//! Requests are multipart forms; responses are JSON documents whose shape is
//! only loosely guaranteed by the service. The response view below checks
//! each field explicitly instead of trusting a schema.

use serde_json::Value;

// ─── Request Types ───────────────────────────────────────────────────────────

/// Multipart field carrying the instruction text.
pub const FIELD_INPUT_AS_TEXT: &str = "input_as_text";
/// Multipart field for the NBIM-side file (Identify only).
pub const FIELD_NBIM_FILE: &str = "nbim_file";
/// Multipart field for the custody-side file (Identify only).
pub const FIELD_CUSTODY_FILE: &str = "custody_file";
/// Multipart field carrying serialized workflow context.
pub const FIELD_CONTEXT: &str = "context";
/// Multipart field carrying serialized reviewer feedback (legacy Fix flow).
pub const FIELD_FEEDBACK: &str = "feedback";

/// A binary file part of the multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    /// Form field name, e.g. `nbim_file`.
    pub field: String,
    /// File name reported to the service.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One outbound stage submission.
///
/// `context` and `feedback` are already-serialized JSON objects. A `None`
/// means the field is left out of the form entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageRequest {
    pub input_as_text: String,
    pub attachments: Vec<FileAttachment>,
    pub context: Option<String>,
    pub feedback: Option<String>,
}

impl StageRequest {
    pub fn new(input_as_text: impl Into<String>) -> Self {
        Self {
            input_as_text: input_as_text.into(),
            ..Self::default()
        }
    }

    /// Multipart field names in the order they are appended to the form.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names = vec![FIELD_INPUT_AS_TEXT];
        names.extend(self.attachments.iter().map(|a| a.field.as_str()));
        if self.context.is_some() {
            names.push(FIELD_CONTEXT);
        }
        if self.feedback.is_some() {
            names.push(FIELD_FEEDBACK);
        }
        names
    }
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// Fallback message when the service reports failure without saying why.
pub const GENERIC_FAILURE_MESSAGE: &str = "Workflow failed";

/// Typed view over a run-workflow response document.
///
/// Each field is `None` when absent or of the wrong JSON type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowResponse {
    pub success: Option<bool>,
    pub error: Option<String>,
    pub result: Option<WorkflowResult>,
}

/// The `result` object of a successful run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowResult {
    /// Already-structured payload.
    pub output_parsed: Option<Value>,
    /// JSON payload encoded as a string.
    pub output_text: Option<String>,
}

impl WorkflowResponse {
    pub fn from_value(value: &Value) -> Self {
        let result = value.get("result").filter(|r| r.is_object()).map(|r| WorkflowResult {
            output_parsed: r.get("output_parsed").filter(|v| !v.is_null()).cloned(),
            output_text: r
                .get("output_text")
                .and_then(Value::as_str)
                .map(str::to_string),
        });

        Self {
            success: value.get("success").and_then(Value::as_bool),
            error: value.get("error").and_then(Value::as_str).map(str::to_string),
            result,
        }
    }

    /// Only an explicit `success: false` is a failure; absence means success.
    pub fn is_failure(&self) -> bool {
        self.success == Some(false)
    }

    /// The service-provided error message, or the generic fallback.
    pub fn failure_message(&self) -> String {
        match self.error.as_deref() {
            Some(msg) if !msg.is_empty() => msg.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
