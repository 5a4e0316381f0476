//! Stage orchestrator: Identify → Fix → Report.
//!
//! Each stage is one request/response cycle against the remote service:
//! 1. **Cache**: return the stored result when the stage's reuse rule allows
//! 2. **Assemble**: instruction text, attachments and context from slots
//! 3. **Submit**: exactly one remote call, never retried
//! 4. **Persist**: extract sub-results into slots, then write the stage cache
//!
//! Reuse rules are fixed:
//! - Identify is fingerprint-gated. Identical input fingerprints return the
//!   cached response untouched; anything else resets every slot and cache
//!   entry and starts a new run.
//! - Fix and Report are first-call-wins. A cached response is returned until
//!   the next reset. The feedback variant of Fix always calls the service.
//!
//! Slot reads for a request happen before the submission, slot writes after
//! the response is validated. Nothing guards two concurrent invocations of
//! the same stage; the later response wins the cache write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use super::breaks::{read_break_items, BreakItem};
use super::context::{assemble_context, assemble_context_from};
use super::database::SqliteSlotStore;
use super::errors::WorkflowError;
use super::extractor::extract_stage_outputs;
use super::fingerprint::{fingerprint, UploadedFile};
use super::instructions::{build_fix_instruction, IDENTIFY_INSTRUCTION, REPORT_INSTRUCTION};
use super::store::DurableSlotStore;
use super::types::{InputFingerprints, Slot, Stage, StageCacheEntry, StageState};
use crate::client::types::{FIELD_CUSTODY_FILE, FIELD_NBIM_FILE};
use crate::client::{
    FileAttachment, HttpWorkflowClient, StageRequest, WorkflowConfig, WorkflowResponse,
    WorkflowTransport,
};

// ─── StageOrchestrator ──────────────────────────────────────────────────────

/// Runs workflow stages against an injected transport and slot store.
pub struct StageOrchestrator {
    transport: Arc<dyn WorkflowTransport>,
    store: DurableSlotStore,
    /// Last transition per stage during this process's lifetime.
    states: Mutex<HashMap<Stage, StageState>>,
}

impl StageOrchestrator {
    pub fn new(transport: Arc<dyn WorkflowTransport>, store: DurableSlotStore) -> Self {
        Self {
            transport,
            store,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Build an HTTP-backed orchestrator from configuration.
    ///
    /// An unusable `store_path` degrades to an in-memory store.
    pub fn from_config(config: WorkflowConfig) -> Result<Self, WorkflowError> {
        let store = match config.store_path.as_deref() {
            Some(path) => match SqliteSlotStore::open(path) {
                Ok(sqlite) => DurableSlotStore::new(Arc::new(sqlite)),
                Err(e) => {
                    tracing::warn!(path, error = %e, "slot database unavailable, caching in memory");
                    DurableSlotStore::in_memory()
                }
            },
            None => DurableSlotStore::in_memory(),
        };
        let transport = HttpWorkflowClient::from_config(config)?;
        Ok(Self::new(Arc::new(transport), store))
    }

    pub fn store(&self) -> &DurableSlotStore {
        &self.store
    }

    /// Whether the remote service answers its liveness probe.
    pub async fn health_check(&self) -> Result<bool, WorkflowError> {
        Ok(self.transport.health_check().await?)
    }

    // ─── Identify ───────────────────────────────────────────────────────

    /// Identify breaks between the NBIM (`primary`) and custody (`secondary`)
    /// files.
    pub async fn identify_breaks(
        &self,
        primary: &UploadedFile,
        secondary: &UploadedFile,
    ) -> Result<Value, WorkflowError> {
        let request_id = Uuid::new_v4();
        let inputs = InputFingerprints {
            primary: fingerprint(primary),
            secondary: fingerprint(secondary),
        };

        if let Some(entry) = self.cached_entry(Stage::Identify) {
            if entry.matches_inputs(&inputs) {
                tracing::info!(
                    %request_id,
                    stage = Stage::Identify.as_str(),
                    cached_at = entry.timestamp,
                    "input fingerprints unchanged, reusing cached result"
                );
                self.set_state(Stage::Identify, StageState::Cached);
                return Ok(entry.response);
            }
        }

        // New run: nothing from a previous run may leak in.
        self.reset();
        self.set_state(Stage::Identify, StageState::Running);

        let (primary_bytes, secondary_bytes) =
            match futures::future::try_join(primary.bytes(), secondary.bytes()).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.set_state(Stage::Identify, StageState::Failed);
                    return Err(WorkflowError::FileRead {
                        path: format!("{} / {}", primary.name(), secondary.name()),
                        reason: e.to_string(),
                    });
                }
            };

        self.persist_input_text(Slot::NbimCsvText, primary.name(), &primary_bytes);
        self.persist_input_text(Slot::CustodyCsvText, secondary.name(), &secondary_bytes);

        // Normally empty straight after the reset.
        let context = assemble_context(&self.store);

        let request = StageRequest {
            input_as_text: IDENTIFY_INSTRUCTION.to_string(),
            attachments: vec![
                FileAttachment {
                    field: FIELD_NBIM_FILE.to_string(),
                    file_name: primary.name().to_string(),
                    bytes: primary_bytes,
                },
                FileAttachment {
                    field: FIELD_CUSTODY_FILE.to_string(),
                    file_name: secondary.name().to_string(),
                    bytes: secondary_bytes,
                },
            ],
            context: context.to_attachment(),
            feedback: None,
        };

        self.run_stage(Stage::Identify, request, Some(inputs), request_id)
            .await
    }

    /// Cached Identify response, if any. Never calls the service.
    pub fn get_cached_identify_breaks(&self) -> Option<Value> {
        self.cached_response(Stage::Identify)
    }

    // ─── Fix ────────────────────────────────────────────────────────────

    /// Ask the service to correct the identified breaks.
    pub async fn fix_breaks(&self) -> Result<Value, WorkflowError> {
        let request_id = Uuid::new_v4();
        if let Some(response) = self.reuse_cached(Stage::Fix, request_id) {
            return Ok(response);
        }
        self.run_fix(None, request_id).await
    }

    /// Fix with reviewer feedback attached. Always calls the service and
    /// replaces the cached Fix result.
    pub async fn fix_breaks_with_feedback(&self, feedback: &Value) -> Result<Value, WorkflowError> {
        self.run_fix(Some(feedback), Uuid::new_v4()).await
    }

    async fn run_fix(
        &self,
        feedback: Option<&Value>,
        request_id: Uuid,
    ) -> Result<Value, WorkflowError> {
        self.set_state(Stage::Fix, StageState::Running);

        let nbim_text = self.store.read_slot_text(Slot::NbimCsvText);
        let custody_text = self.store.read_slot_text(Slot::CustodyCsvText);
        tracing::info!(
            %request_id,
            has_nbim = nbim_text.is_some(),
            has_custody = custody_text.is_some(),
            "loaded input texts for fix"
        );

        let context = assemble_context_from(&self.store, &[Slot::ClassifiedBreaks]);

        let request = StageRequest {
            input_as_text: build_fix_instruction(nbim_text.as_deref(), custody_text.as_deref()),
            attachments: Vec::new(),
            context: context.to_attachment(),
            feedback: feedback.and_then(|f| serde_json::to_string(f).ok()),
        };

        self.run_stage(Stage::Fix, request, None, request_id).await
    }

    /// Cached Fix response, if any. Never calls the service.
    pub fn get_cached_breaks_fixer(&self) -> Option<Value> {
        self.cached_response(Stage::Fix)
    }

    // ─── Report ─────────────────────────────────────────────────────────

    /// Generate the reconciliation report from everything known so far.
    pub async fn generate_report(&self) -> Result<Value, WorkflowError> {
        let request_id = Uuid::new_v4();
        if let Some(response) = self.reuse_cached(Stage::Report, request_id) {
            return Ok(response);
        }
        self.set_state(Stage::Report, StageState::Running);

        let context = assemble_context(&self.store);
        let request = StageRequest {
            input_as_text: REPORT_INSTRUCTION.to_string(),
            context: context.to_attachment(),
            ..StageRequest::default()
        };

        self.run_stage(Stage::Report, request, None, request_id).await
    }

    /// Cached Report response, if any. Never calls the service.
    pub fn get_cached_report(&self) -> Option<Value> {
        self.cached_response(Stage::Report)
    }

    // ─── State ──────────────────────────────────────────────────────────

    /// Clear every slot and stage cache entry.
    pub fn reset(&self) {
        tracing::info!("resetting workflow slots and stage caches");
        self.store.clear_all();
        if let Ok(mut states) = self.states.lock() {
            states.clear();
        }
    }

    /// Where `stage` stands. Falls back to the store when this orchestrator
    /// has not touched the stage yet.
    pub fn stage_state(&self, stage: Stage) -> StageState {
        let tracked = self
            .states
            .lock()
            .ok()
            .and_then(|states| states.get(&stage).copied());

        match tracked {
            Some(state) => state,
            None if self.cached_entry(stage).is_some() => StageState::Cached,
            None => StageState::NotRun,
        }
    }

    /// Classified breaks from the latest run, as typed items.
    pub fn classified_break_items(&self) -> Vec<BreakItem> {
        self.store
            .read_slot(Slot::ClassifiedBreaks)
            .map(|value| read_break_items(&value))
            .unwrap_or_default()
    }

    /// Cached response of any stage.
    pub fn cached_response(&self, stage: Stage) -> Option<Value> {
        self.cached_entry(stage).map(|entry| entry.response)
    }

    // ─── Helpers ────────────────────────────────────────────────────────

    fn cached_entry(&self, stage: Stage) -> Option<StageCacheEntry> {
        self.store.read_json(stage.cache_key())
    }

    fn reuse_cached(&self, stage: Stage, request_id: Uuid) -> Option<Value> {
        let entry = self.cached_entry(stage)?;
        tracing::info!(
            %request_id,
            stage = stage.as_str(),
            cached_at = entry.timestamp,
            "reusing cached stage result"
        );
        self.set_state(stage, StageState::Cached);
        Some(entry.response)
    }

    fn set_state(&self, stage: Stage, state: StageState) {
        if let Ok(mut states) = self.states.lock() {
            states.insert(stage, state);
        }
    }

    /// Store an upload's text for later stages. Non-UTF-8 input is skipped.
    fn persist_input_text(&self, slot: Slot, name: &str, bytes: &[u8]) {
        match std::str::from_utf8(bytes) {
            Ok(text) => {
                self.store.write_text(slot.key(), text);
                tracing::debug!(slot = slot.key(), file = name, "saved input text");
            }
            Err(e) => {
                tracing::warn!(file = name, error = %e, "input file is not UTF-8, text not kept");
            }
        }
    }

    /// Submit, validate, extract, cache.
    async fn run_stage(
        &self,
        stage: Stage,
        request: StageRequest,
        inputs: Option<InputFingerprints>,
        request_id: Uuid,
    ) -> Result<Value, WorkflowError> {
        tracing::info!(
            %request_id,
            stage = stage.as_str(),
            has_context = request.context.is_some(),
            "submitting stage"
        );

        let response = match self.transport.run_workflow(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%request_id, stage = stage.as_str(), error = %e, "stage transport failed");
                self.set_state(stage, StageState::Failed);
                return Err(e.into());
            }
        };

        let view = WorkflowResponse::from_value(&response);
        if view.is_failure() {
            let message = view.failure_message();
            tracing::warn!(%request_id, stage = stage.as_str(), message = %message, "stage reported failure");
            self.set_state(stage, StageState::Failed);
            return Err(WorkflowError::WorkflowFailed { message });
        }

        extract_stage_outputs(&self.store, &response);
        self.store.write_json(
            stage.cache_key(),
            &StageCacheEntry::new(response.clone(), inputs),
        );
        self.set_state(stage, StageState::Cached);

        tracing::info!(%request_id, stage = stage.as_str(), "stage completed");
        Ok(response)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
