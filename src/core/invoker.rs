use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::core::checkpoint::CheckpointMonitor;
use crate::core::error::BridgeError;

/// One external assistant invocation: argv is passed verbatim, no shell.
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct InvokeOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Resolve the assistant binary: explicit override, then `~/.local/bin`,
/// then the bare name for PATH lookup.
pub fn resolve_binary(explicit: Option<&str>, name: &str) -> String {
    if let Some(path) = explicit {
        return path.to_string();
    }
    if let Some(home) = dirs::home_dir() {
        let local = home.join(".local").join("bin").join(name);
        if local.exists() {
            return local.to_string_lossy().to_string();
        }
    }
    name.to_string()
}

/// Spawn the process, stream-capture both pipes line by line (feeding each
/// stdout chunk to the checkpoint monitor when one is attached), and map the
/// exit status. On deadline expiry the child is killed and a timeout-tagged
/// error carries whatever output was captured.
pub async fn invoke(
    req: &InvokeRequest,
    mut monitor: Option<&mut CheckpointMonitor>,
) -> Result<InvokeOutput> {
    let mut cmd = Command::new(&req.program);
    cmd.args(&req.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &req.cwd {
        cmd.current_dir(dir);
    }

    debug!("Invoking assistant: {} ({} args)", req.program, req.args.len());
    let started = Instant::now();
    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn assistant process: {}", req.program))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("failed to open assistant stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("failed to open assistant stderr"))?;

    let mut stdout_buf = String::new();
    let mut stderr_buf = String::new();

    let run = async {
        let stdout_read = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(m) = monitor.as_deref_mut() {
                    m.observe(&line);
                }
                stdout_buf.push_str(&line);
                stdout_buf.push('\n');
            }
        };
        let stderr_read = async {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                stderr_buf.push_str(&line);
                stderr_buf.push('\n');
            }
        };
        tokio::join!(stdout_read, stderr_read);
        child.wait().await
    };

    match tokio::time::timeout(req.timeout, run).await {
        Ok(status) => {
            let status = status.context("failed waiting for assistant process")?;
            if status.success() {
                Ok(InvokeOutput {
                    stdout: stdout_buf,
                    stderr: stderr_buf,
                })
            } else {
                Err(anyhow::Error::new(BridgeError::Process {
                    exit_code: status.code(),
                    stdout: stdout_buf,
                    stderr: stderr_buf,
                }))
            }
        }
        Err(_elapsed) => {
            warn!(
                "Assistant exceeded {}s deadline, killing process",
                req.timeout.as_secs()
            );
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill timed-out assistant: {}", e);
            }
            let _ = child.wait().await;
            Err(anyhow::Error::new(BridgeError::Timeout {
                waited_ms: started.elapsed().as_millis() as u64,
                stdout: stdout_buf,
                stderr: stderr_buf,
            }))
        }
    }
}
