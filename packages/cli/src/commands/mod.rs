pub mod inspect;
pub mod replay;
pub mod verify;

pub use inspect::{inspect, InspectArgs};
pub use replay::{replay, ReplayArgs};
pub use verify::{verify, VerifyArgs};

use crate::config::Config;
use anyhow::{Context, Result};
use elicast_ot::OperationLog;
use std::fs;
use std::path::Path;

/// Read and validate a serialized log
pub fn load_log(config: &Config, cwd: &str, path: &Path) -> Result<OperationLog> {
    let path = config.resolve_log(cwd, path);
    let content = fs::read_to_string(&path).with_context(|| format!("Cannot read {}", path.display()))?;
    let log = OperationLog::from_json(&content).with_context(|| format!("Invalid log {}", path.display()))?;

    tracing::debug!(path = %path.display(), ops = log.len(), "Loaded log");
    Ok(log)
}
