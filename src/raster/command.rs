//! Shared subprocess runner for external raster tools.

use super::ToolError;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs an external tool to completion, capturing its output.
///
/// Exit code 0 signals success; anything else yields [`ToolError::Failed`]
/// with the tool's stderr preserved as diagnostics. The child is killed if
/// the owning future is dropped, so a cancelled run does not leave stray
/// subprocesses behind.
pub(crate) async fn run_tool(program: &str, args: &[String]) -> Result<(), ToolError> {
    debug!(program, args = ?args, "invoking external tool");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ToolError::Launch {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!(program, status = %output.status, stderr = %stderr, "external tool failed");
        return Err(ToolError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr,
        });
    }

    Ok(())
}
