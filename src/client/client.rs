//! HTTP client for the remote workflow service.
//!
//! Every stage is a single multipart `POST` to the run-workflow endpoint that
//! answers with one JSON document. The orchestrator only sees the
//! [`WorkflowTransport`] trait, so tests swap this client for an in-process
//! fake.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client as HttpClient;
use serde_json::Value;

use super::config::WorkflowConfig;
use super::errors::TransportError;
use super::types::{StageRequest, FIELD_CONTEXT, FIELD_FEEDBACK, FIELD_INPUT_AS_TEXT};

// ─── Transport Trait ─────────────────────────────────────────────────────────

/// A single-RPC transport to the workflow service.
///
/// Implementations submit the request exactly once and return the decoded
/// JSON body. They never interpret `success`; that is the caller's job.
#[async_trait]
pub trait WorkflowTransport: Send + Sync {
    /// Submit one stage request and return the raw response document.
    async fn run_workflow(&self, request: StageRequest) -> Result<Value, TransportError>;

    /// Whether the service is reachable.
    async fn health_check(&self) -> Result<bool, TransportError> {
        Ok(true)
    }
}

// ─── HttpWorkflowClient ──────────────────────────────────────────────────────

/// reqwest-backed transport.
pub struct HttpWorkflowClient {
    http: HttpClient,
    config: WorkflowConfig,
}

impl HttpWorkflowClient {
    /// Create a client from configuration. Does NOT check connectivity.
    pub fn from_config(config: WorkflowConfig) -> Result<Self, TransportError> {
        let http = HttpClient::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TransportError::ConnectionFailed {
                endpoint: config.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Build the multipart body. Optional fields are omitted, never sent empty.
    fn build_form(request: StageRequest) -> Form {
        let mut form = Form::new().text(FIELD_INPUT_AS_TEXT, request.input_as_text);

        for attachment in request.attachments {
            let part = Part::bytes(attachment.bytes).file_name(attachment.file_name);
            form = form.part(attachment.field, part);
        }
        if let Some(context) = request.context {
            form = form.text(FIELD_CONTEXT, context);
        }
        if let Some(feedback) = request.feedback {
            form = form.text(FIELD_FEEDBACK, feedback);
        }
        form
    }

    fn map_send_error(&self, url: &str, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout {
                duration_secs: self.config.request_timeout_secs,
            }
        } else {
            TransportError::ConnectionFailed {
                endpoint: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl WorkflowTransport for HttpWorkflowClient {
    async fn run_workflow(&self, request: StageRequest) -> Result<Value, TransportError> {
        let url = self.config.workflow_url();

        // Metadata only; file bodies can be large.
        tracing::info!(
            url = %url,
            fields = ?request.field_names(),
            input_len = request.input_as_text.len(),
            attachment_bytes = request.attachments.iter().map(|a| a.bytes.len()).sum::<usize>(),
            "workflow request"
        );

        let response = self
            .http
            .post(&url)
            .multipart(Self::build_form(request))
            .send()
            .await
            .map_err(|e| self.map_send_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(TransportError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| TransportError::InvalidResponse {
                reason: format!("failed to read response body: {e}"),
            })?;

        serde_json::from_str(&body_text).map_err(|e| TransportError::InvalidResponse {
            reason: format!("response is not JSON: {e}"),
        })
    }

    /// Probe the service root. Unreachable means `Ok(false)`, not an error.
    async fn health_check(&self) -> Result<bool, TransportError> {
        let url = self.config.health_url();

        match self
            .http
            .get(&url)
            .timeout(self.config.connect_timeout())
            .send()
            .await
        {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "health check failed");
                Ok(false)
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
