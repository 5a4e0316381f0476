//! Workflow Client: transport to the remote reconciliation service.
//!
//! This module handles all communication with the compute service:
//! - Multipart stage submissions to the run-workflow endpoint
//! - Typed, presence-checked views over the JSON response
//! - Liveness probing
//! - Configuration loading from `_workflow/config.yaml`
//!
//! The orchestrator depends only on [`WorkflowTransport`], never on reqwest.

pub mod client;
pub mod config;
pub mod errors;
pub mod types;

// Re-exports for convenience
pub use client::{HttpWorkflowClient, WorkflowTransport};
pub use config::WorkflowConfig;
pub use errors::TransportError;
pub use types::{FileAttachment, StageRequest, WorkflowResponse, WorkflowResult};
