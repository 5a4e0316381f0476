//! Workflow Core: stage cache and context assembly for reconciliation runs.
//!
//! Submodules:
//! - `types`: Stage and slot enums, stage cache entries, stage states
//! - `fingerprint`: Uploaded files and their cheap identity fingerprints
//! - `store`: `SlotStore` back-ends and the fail-closed `DurableSlotStore`
//! - `database`: SQLite slot store
//! - `extractor`: Pulls sub-results out of stage responses into slots
//! - `context`: Assembles the context object sent with each request
//! - `instructions`: Stage instruction texts
//! - `breaks`: Typed view over classified break lists
//! - `orchestrator`: Identify → Fix → Report with per-stage reuse rules
//! - `errors`: Workflow and store error types

pub mod breaks;
pub mod context;
pub mod database;
pub mod errors;
pub mod extractor;
pub mod fingerprint;
pub mod instructions;
pub mod orchestrator;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use breaks::{read_break_items, BreakId, BreakItem};
pub use context::{assemble_context, WorkflowContext};
pub use database::SqliteSlotStore;
pub use errors::{StoreError, WorkflowError};
pub use extractor::extract_stage_outputs;
pub use fingerprint::{fingerprint, Fingerprint, UploadedFile};
pub use orchestrator::StageOrchestrator;
pub use store::{DurableSlotStore, MemorySlotStore, SlotStore};
pub use types::{InputFingerprints, Slot, Stage, StageCacheEntry, StageState};
