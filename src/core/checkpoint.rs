use anyhow::Result;
use regex::{Regex, RegexBuilder};

use crate::core::error::BridgeError;

/// Watches the assistant's streamed output for a caller-supplied marker.
///
/// Monitoring is advisory: the first matching chunk latches
/// `reached = true` and records the triggering text, but the underlying
/// process keeps running to natural completion. The engine inspects the
/// latch after the process exits.
#[derive(Debug)]
pub struct CheckpointMonitor {
    pattern: Regex,
    reached: bool,
    matched_text: Option<String>,
}

/// Final monitor state, carried on the invocation outcome.
#[derive(Debug, Clone, Default)]
pub struct CheckpointReport {
    pub reached: bool,
    pub matched_text: Option<String>,
}

impl CheckpointMonitor {
    /// Compile a case-insensitive pattern. An invalid pattern fails here,
    /// synchronously, so the caller can reject the submission before any
    /// process is spawned.
    pub fn new(pattern: &str) -> Result<Self> {
        let compiled = compile_pattern(pattern)?;
        Ok(Self {
            pattern: compiled,
            reached: false,
            matched_text: None,
        })
    }

    /// Wrap a pattern that was already compiled (and therefore validated)
    /// at submission time.
    pub fn from_regex(pattern: Regex) -> Self {
        Self {
            pattern,
            reached: false,
            matched_text: None,
        }
    }

    /// Test one output chunk. After the first match further chunks are
    /// accepted but no longer inspected.
    pub fn observe(&mut self, chunk: &str) {
        if self.reached {
            return;
        }
        if self.pattern.is_match(chunk) {
            self.reached = true;
            self.matched_text = Some(chunk.trim_end().to_string());
        }
    }

    pub fn reached(&self) -> bool {
        self.reached
    }

    pub fn report(&self) -> CheckpointReport {
        CheckpointReport {
            reached: self.reached,
            matched_text: self.matched_text.clone(),
        }
    }
}

/// Compile a checkpoint pattern case-insensitively, mapping compile errors
/// to the validation taxonomy.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| BridgeError::validation(format!("invalid checkpoint pattern: {}", e)))
}
