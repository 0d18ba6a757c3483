use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;

use crate::core::registry::TaskDescriptor;
use crate::core::status::types::TaskStatus;

/// Point-in-time snapshot of the job counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct JobStats {
    pub submitted: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Per-key atomic counters shared by every in-flight task.
#[derive(Default)]
pub struct JobCounters {
    submitted: AtomicU64,
    active: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl JobCounters {
    pub fn on_submit(&self) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_terminal(&self, success: bool) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        if success {
            self.completed.fetch_add(1, Ordering::SeqCst);
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn snapshot(&self) -> JobStats {
        JobStats {
            submitted: self.submitted.load(Ordering::SeqCst),
            active: self.active.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Terminal outcome kept in the engine's bounded recent-completions list.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedJob {
    pub task_id: String,
    pub agent_id: String,
    pub status: TaskStatus,
    pub session_id: Option<String>,
    pub finished_at_secs: u64,
}

/// Compile-time-checked status surface the rest of the system consumes.
#[async_trait]
pub trait JobStatusTracker: Send + Sync {
    async fn active_jobs(&self) -> Vec<TaskDescriptor>;
    async fn completed_jobs(&self) -> Vec<CompletedJob>;
    fn stats(&self) -> JobStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_submit_and_terminal() {
        let counters = JobCounters::default();
        counters.on_submit();
        counters.on_submit();
        counters.on_terminal(true);

        let stats = counters.snapshot();
        assert_eq!(stats.submitted, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 0);

        counters.on_terminal(false);
        let stats = counters.snapshot();
        assert_eq!(stats.active, 0);
        assert_eq!(stats.failed, 1);
    }
}
