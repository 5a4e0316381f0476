//! Workflow client configuration loading.
//!
//! Reads `_workflow/config.yaml` and resolves environment variables.
//! Config holds where the service lives and where the slot store is kept.
//! The caching policy is fixed in code and intentionally absent here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::errors::TransportError;

/// Relative location of the config file under a project root.
const CONFIG_RELATIVE_PATH: &str = "_workflow/config.yaml";

/// Env var that pins the project root.
const ROOT_ENV_VAR: &str = "RECON_WORKFLOW_ROOT";

// ─── Public Types ────────────────────────────────────────────────────────────

/// Runtime configuration for the workflow client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkflowConfig {
    /// Service origin, e.g. `http://127.0.0.1:8000`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the run-workflow endpoint.
    #[serde(default = "default_workflow_path")]
    pub workflow_path: String,
    /// Path answered by the service's liveness probe.
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Total request timeout. Stage runs are model-backed and slow.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// SQLite file backing the slot store. `None` keeps slots in memory.
    #[serde(default)]
    pub store_path: Option<String>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_workflow_path() -> String {
    "/api/run-workflow".to_string()
}
fn default_health_path() -> String {
    "/".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            workflow_path: default_workflow_path(),
            health_path: default_health_path(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            store_path: None,
        }
    }
}

impl WorkflowConfig {
    /// Full URL of the run-workflow endpoint.
    pub fn workflow_url(&self) -> String {
        join_url(&self.base_url, &self.workflow_path)
    }

    /// Full URL of the health endpoint.
    pub fn health_url(&self) -> String {
        join_url(&self.base_url, &self.health_path)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Join an origin and a path without doubling or dropping the slash.
fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Resolve the config path relative to the project root.
///
/// Checks `RECON_WORKFLOW_ROOT` first, then searches upward from `start`
/// for `_workflow/config.yaml`.
pub fn find_config_path(start: &Path) -> Result<PathBuf, TransportError> {
    if let Ok(root) = std::env::var(ROOT_ENV_VAR) {
        let candidate = PathBuf::from(&root).join(CONFIG_RELATIVE_PATH);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_RELATIVE_PATH);
        if candidate.exists() {
            return Ok(candidate);
        }
        if !dir.pop() {
            break;
        }
    }

    Err(TransportError::ConfigError {
        reason: format!("could not find {CONFIG_RELATIVE_PATH}"),
    })
}

/// Load and parse the workflow configuration file.
///
/// Performs environment-variable interpolation on `${VAR_NAME}` and
/// `${VAR_NAME:-default}` before parsing.
pub fn load_workflow_config(path: &Path) -> Result<WorkflowConfig, TransportError> {
    let raw = std::fs::read_to_string(path).map_err(|e| TransportError::ConfigError {
        reason: format!("failed to read {}: {e}", path.display()),
    })?;
    parse_workflow_config(&raw)
}

/// Parse a configuration document from a string.
pub fn parse_workflow_config(raw: &str) -> Result<WorkflowConfig, TransportError> {
    let interpolated = interpolate_env_vars(raw);

    let mut config: WorkflowConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| TransportError::ConfigError {
            reason: format!("failed to parse config: {e}"),
        })?;

    if config.base_url.trim().is_empty() {
        return Err(TransportError::ConfigError {
            reason: "base_url must not be empty".into(),
        });
    }

    config.store_path = config.store_path.map(|p| expand_tilde(&p));
    Ok(config)
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve a variable expression like `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> String {
    if let Some(idx) = expr.find(":-") {
        let var_name = &expr[..idx];
        let default = &expr[idx + 2..];
        std::env::var(var_name).unwrap_or_else(|_| default.to_string())
    } else {
        std::env::var(expr).unwrap_or_default()
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_env_vars_with_default() {
        std::env::remove_var("__RECON_TEST_NONEXISTENT_VAR__");
        let input = "${__RECON_TEST_NONEXISTENT_VAR__:-http://fallback:9000}";
        assert_eq!(interpolate_env_vars(input), "http://fallback:9000");
    }

    #[test]
    fn test_interpolate_env_vars_with_value() {
        std::env::set_var("__RECON_TEST_BASE_URL__", "http://10.0.0.2:8000");
        let input = "base_url: ${__RECON_TEST_BASE_URL__:-http://fallback}";
        assert_eq!(
            interpolate_env_vars(input),
            "base_url: http://10.0.0.2:8000"
        );
        std::env::remove_var("__RECON_TEST_BASE_URL__");
    }

    #[test]
    fn test_interpolate_no_vars() {
        let input = "plain text with no variables";
        assert_eq!(interpolate_env_vars(input), input);
    }

    #[test]
    fn test_expand_tilde() {
        let result = expand_tilde("~/recon/slots.db");
        assert!(!result.starts_with('~'), "tilde should be expanded");
        assert!(result.ends_with("/recon/slots.db"));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse_workflow_config("{}").unwrap();
        assert_eq!(config, WorkflowConfig::default());
        assert_eq!(config.workflow_url(), "http://127.0.0.1:8000/api/run-workflow");
        assert_eq!(config.health_url(), "http://127.0.0.1:8000/");
    }

    #[test]
    fn test_partial_document_overrides() {
        let yaml = r#"
            base_url: "http://recon.internal:8080/"
            request_timeout_secs: 60
            store_path: "/var/lib/recon/slots.db"
        "#;
        let config = parse_workflow_config(yaml).unwrap();
        assert_eq!(config.workflow_url(), "http://recon.internal:8080/api/run-workflow");
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.store_path.as_deref(), Some("/var/lib/recon/slots.db"));
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let result = parse_workflow_config("base_url: \"\"");
        assert!(matches!(result, Err(TransportError::ConfigError { .. })));
    }

    #[test]
    fn test_find_and_load_config() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(root.path().join("_workflow")).unwrap();
        std::fs::write(
            root.path().join(CONFIG_RELATIVE_PATH),
            "workflow_path: /run\n",
        )
        .unwrap();

        let path = find_config_path(&nested).unwrap();
        let config = load_workflow_config(&path).unwrap();
        assert_eq!(config.workflow_url(), "http://127.0.0.1:8000/run");
    }
}
