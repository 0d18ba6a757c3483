use std::fmt;

/// Typed failure taxonomy for the bridge. Carried inside `anyhow::Error` so
/// call sites that only log can stay on plain `Result`, while the engine can
/// `downcast_ref` where the failure kind changes behavior (timeout vs crash,
/// validation vs background failure).
#[derive(Debug)]
pub enum BridgeError {
    /// Bad input to `submit`. The only error that reaches the caller
    /// synchronously, before any side effect.
    Validation(String),
    /// The assistant process exited non-zero or was killed by a signal.
    Process {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The assistant process exceeded its deadline and was terminated.
    Timeout {
        waited_ms: u64,
        stdout: String,
        stderr: String,
    },
    /// The external memory service rejected or dropped a call.
    Store(String),
    /// A notification channel failed to deliver.
    Notification(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Validation(msg) => write!(f, "validation error: {}", msg),
            BridgeError::Process {
                exit_code, stderr, ..
            } => match exit_code {
                Some(code) => write!(f, "assistant exited with code {}: {}", code, stderr.trim()),
                None => write!(f, "assistant killed by signal: {}", stderr.trim()),
            },
            BridgeError::Timeout { waited_ms, .. } => {
                write!(f, "assistant timed out after {}ms", waited_ms)
            }
            BridgeError::Store(msg) => write!(f, "memory store error: {}", msg),
            BridgeError::Notification(msg) => write!(f, "notification error: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

impl BridgeError {
    pub fn validation(msg: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(BridgeError::Validation(msg.into()))
    }

    pub fn store(msg: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(BridgeError::Store(msg.into()))
    }
}

/// True when the error chain bottoms out in a process timeout.
pub fn is_timeout(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<BridgeError>(),
        Some(BridgeError::Timeout { .. })
    )
}

/// True when the error chain bottoms out in a validation failure.
pub fn is_validation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<BridgeError>(),
        Some(BridgeError::Validation(_))
    )
}
