pub mod client;
pub mod workflow;

use std::path::{Path, PathBuf};

use client::config::{find_config_path, load_workflow_config};
use client::WorkflowConfig;
use workflow::{StageOrchestrator, WorkflowError};

/// Return the platform-standard data directory for the workflow client.
///
/// - macOS: `~/Library/Application Support/com.recon-workflow/`
/// - Windows: `{FOLDERID_RoamingAppData}\com.recon-workflow\`
/// - Linux: `$XDG_DATA_HOME/com.recon-workflow/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.recon-workflow/` only if none of the above can be resolved.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("com.recon-workflow");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".recon-workflow")
}

/// Initialize the tracing subscriber, writing structured logs to the data
/// directory. Returns the log file path.
///
/// On each startup:
/// 1. Rotates existing logs (workflow.log → workflow.log.1 → .2 → .3, keeps last 3).
/// 2. Opens a fresh workflow.log with a line-flushing writer.
/// 3. Logs a startup banner with the log location.
pub fn init_tracing() -> std::io::Result<PathBuf> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = data_dir();
    std::fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join("workflow.log");
    rotate_log_file(&log_path, 3);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("recon_workflow=info,warn"));

    fmt::fmt()
        .with_env_filter(filter)
        .with_writer(FlushingWriter::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .try_init()
        .map_err(|e| std::io::Error::other(format!("tracing already initialized: {e}")))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %log_dir.display(),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== recon-workflow starting ==="
    );

    Ok(log_path)
}

/// Rotate log files: `workflow.log` → `workflow.log.1` → `.2` → … → `.{keep}`.
///
/// Oldest file beyond `keep` is deleted. Missing files in the chain are skipped.
fn rotate_log_file(base_path: &Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    // Shift: .{n-1} → .{n}
    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// File writer that flushes after every write so log lines survive a crash.
#[derive(Clone)]
struct FlushingWriter {
    file: std::sync::Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: std::sync::Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Resolve configuration for `start` and build an orchestrator from it.
///
/// A missing `_workflow/config.yaml` means defaults; a config file that
/// exists but does not parse is an error.
pub fn open_orchestrator(start: &Path) -> Result<StageOrchestrator, WorkflowError> {
    let config = match find_config_path(start) {
        Ok(path) => {
            tracing::info!(path = %path.display(), "loading workflow config");
            load_workflow_config(&path)?
        }
        Err(e) => {
            tracing::info!(reason = %e, "no workflow config found, using defaults");
            WorkflowConfig::default()
        }
    };
    StageOrchestrator::from_config(config)
}
