//! The asynchronous task lifecycle engine.
//!
//! `submit` validates, assigns identity, registers the task, and returns the
//! id immediately; everything else runs in a spawned background unit of
//! work. Within one task the lifecycle is strictly ordered: initial record,
//! in-progress update, invocation, completion update, archival, retention
//! cleanup, record deletion, notification, deregistration. Failures past
//! submission resolve the task to `failed`; they are never re-thrown.

pub mod stats;

#[cfg(test)]
pub(crate) mod tests;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::checkpoint::{CheckpointMonitor, CheckpointReport, compile_pattern};
use crate::core::classify::{Classification, classify};
use crate::core::config::{AssistantConfig, EngineConfig};
use crate::core::error::BridgeError;
use crate::core::invoker::{InvokeRequest, invoke, resolve_binary};
use crate::core::notify::NotificationRouter;
use crate::core::notify::format::{InteractionMode, NotificationEvent};
use crate::core::registry::{TaskDescriptor, TaskRegistry};
use crate::core::status::StatusStore;
use crate::core::status::archive::archive_if_needed;
use crate::core::status::cleanup::cleanup_old_records;
use crate::core::status::types::{
    ErrorEntry, ErrorType, TaskStatus, TaskStatusRecord, now_secs,
};
use stats::{CompletedJob, JobCounters, JobStats, JobStatusTracker};

const RESULT_EXCERPT_LEN: usize = 8000;
const COMPLETED_JOBS_CAP: usize = 200;

/// Everything a caller can say when submitting a task.
#[derive(Debug, Clone, Default)]
pub struct TaskSubmission {
    pub prompt: String,
    pub agent_id: String,
    pub work_folder: Option<String>,
    pub session_id: Option<String>,
    pub interaction_mode: Option<String>,
    pub checkpoint_pattern: Option<String>,
    pub max_iterations: Option<u32>,
    pub keep_records: Option<usize>,
    pub elevate: bool,
}

/// What the engine hands the assistant runner for one invocation.
#[derive(Debug, Clone)]
pub struct AssistantRequest {
    pub prompt: String,
    pub work_folder: Option<PathBuf>,
    pub session_id: Option<String>,
    pub checkpoint_pattern: Option<Regex>,
}

#[derive(Debug, Clone)]
pub struct AssistantOutcome {
    pub stdout: String,
    pub stderr: String,
    pub checkpoint: CheckpointReport,
    pub duration_ms: u64,
}

/// Seam between the engine and the external assistant process, so tests can
/// script outcomes without spawning anything.
#[async_trait]
pub trait AssistantRunner: Send + Sync {
    async fn run(&self, request: AssistantRequest) -> Result<AssistantOutcome>;
}

/// Production runner: spawns the assistant CLI via the process invoker.
pub struct CliAssistantRunner {
    program: String,
    flags: Vec<String>,
    timeout: Duration,
}

impl CliAssistantRunner {
    pub fn new(config: &AssistantConfig) -> Self {
        Self {
            program: resolve_binary(config.binary.as_deref(), &config.binary_name),
            flags: config.flags.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl AssistantRunner for CliAssistantRunner {
    async fn run(&self, request: AssistantRequest) -> Result<AssistantOutcome> {
        let mut args = self.flags.clone();
        if let Some(session) = &request.session_id {
            args.push("--resume".to_string());
            args.push(session.clone());
        }
        args.push(request.prompt.clone());

        let invoke_request = InvokeRequest {
            program: self.program.clone(),
            args,
            cwd: request.work_folder.clone(),
            timeout: self.timeout,
        };
        let mut monitor = request
            .checkpoint_pattern
            .clone()
            .map(CheckpointMonitor::from_regex);

        let started = Instant::now();
        let output = invoke(&invoke_request, monitor.as_mut()).await?;
        Ok(AssistantOutcome {
            stdout: output.stdout,
            stderr: output.stderr,
            checkpoint: monitor.map(|m| m.report()).unwrap_or_default(),
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// Validated, classified submission ready for the background phase.
struct PreparedTask {
    task_id: String,
    submission: TaskSubmission,
    mode: InteractionMode,
    pattern: Option<Regex>,
    classification: Classification,
}

pub struct TaskEngine {
    registry: Arc<TaskRegistry>,
    store: Arc<dyn StatusStore>,
    router: Arc<NotificationRouter>,
    runner: Arc<dyn AssistantRunner>,
    config: EngineConfig,
    counters: JobCounters,
    completed: Mutex<Vec<CompletedJob>>,
}

impl TaskEngine {
    pub fn new(
        registry: Arc<TaskRegistry>,
        store: Arc<dyn StatusStore>,
        router: Arc<NotificationRouter>,
        runner: Arc<dyn AssistantRunner>,
        config: EngineConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            store,
            router,
            runner,
            config,
            counters: JobCounters::default(),
            completed: Mutex::new(Vec::new()),
        })
    }

    /// Validate and launch a task. Returns the generated task id as soon as
    /// the descriptor is registered; the lifecycle continues out-of-band.
    /// Validation problems are the only errors this call surfaces.
    pub async fn submit(self: &Arc<Self>, submission: TaskSubmission) -> Result<String> {
        if submission.prompt.trim().is_empty() {
            return Err(BridgeError::validation("prompt is required"));
        }
        if submission.agent_id.trim().is_empty() {
            return Err(BridgeError::validation("agent_id is required"));
        }
        let mode = parse_interaction_mode(submission.interaction_mode.as_deref())?;
        let pattern = match &submission.checkpoint_pattern {
            Some(raw) => Some(compile_pattern(raw)?),
            None => None,
        };

        let task_id = format!("task-{}", Uuid::new_v4());
        self.registry
            .create(&task_id, &submission.agent_id, &submission.prompt)
            .await;
        self.counters.on_submit();
        let classification = classify(&submission.prompt);
        info!(
            "Task {} submitted by {} ({}, complexity {})",
            task_id,
            submission.agent_id,
            classification.task_type.as_str(),
            classification.complexity_score
        );

        let prepared = PreparedTask {
            task_id: task_id.clone(),
            submission,
            mode,
            pattern,
            classification,
        };
        let engine = self.clone();
        tokio::spawn(async move {
            engine.run_task(prepared).await;
        });

        Ok(task_id)
    }

    fn initial_record(&self, prepared: &PreparedTask) -> TaskStatusRecord {
        let submission = &prepared.submission;
        let classification = &prepared.classification;
        let now = now_secs();
        TaskStatusRecord {
            task_id: prepared.task_id.clone(),
            agent_id: submission.agent_id.clone(),
            prompt: submission.prompt.clone(),
            session_id: submission.session_id.clone(),
            work_folder: submission.work_folder.clone(),
            status: TaskStatus::Pending,
            started_at: now,
            updated_at: now,
            completed_at: None,
            progress: "Task accepted".to_string(),
            progress_percentage: 0,
            steps_completed: 0,
            total_steps: 3,
            current_step: "pending".to_string(),
            step_details: None,
            checkpoint_reached: false,
            checkpoint_text: None,
            task_type: classification.task_type,
            complexity_score: classification.complexity_score,
            result: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            execution_time_ms: None,
            memory_usage_mb: None,
            cpu_usage_percent: None,
            files_created: Vec::new(),
            files_modified: Vec::new(),
            commands_executed: Vec::new(),
            urls_accessed: Vec::new(),
            should_archive: classification.should_archive,
            archive_priority: classification.archive_priority,
            archive_tags: classification.archive_tags.clone(),
            elevated: submission.elevate,
        }
    }

    /// The background phase. Nothing here re-throws: every failure either
    /// resolves the task to `failed` or is logged and skipped, and the
    /// notification plus deregistration always run.
    async fn run_task(self: Arc<Self>, prepared: PreparedTask) {
        let mut record = self.initial_record(&prepared);

        // The create is the one store call the engine must see fail: without
        // a record id there is nothing to update later.
        let record_id = match self.store.create_record(&record).await {
            Ok(id) => {
                if let Err(e) = self
                    .store
                    .attach_record(&record.agent_id, &id)
                    .await
                {
                    warn!("Failed to attach record for {}: {}", record.task_id, e);
                }
                Some(id)
            }
            Err(e) => {
                error!(
                    "Failed to create status record for {}: {}",
                    record.task_id, e
                );
                record.push_error(ErrorEntry::new(
                    ErrorType::Api,
                    format!("status record creation failed: {}", e),
                ));
                record.status = TaskStatus::Failed;
                record.completed_at = Some(now_secs());
                self.finalize(&prepared, record, None).await;
                return;
            }
        };

        record.status = TaskStatus::InProgress;
        record.progress = "Invoking assistant".to_string();
        record.progress_percentage = 10;
        record.steps_completed = 1;
        record.current_step = "invoke".to_string();
        record.touch();
        if let Some(id) = &record_id
            && let Err(e) = self.store.update_record(id, &record).await
        {
            warn!("Progress update failed for {}: {}", record.task_id, e);
        }

        let request = AssistantRequest {
            prompt: prepared.submission.prompt.clone(),
            work_folder: prepared.submission.work_folder.clone().map(PathBuf::from),
            session_id: prepared.submission.session_id.clone(),
            checkpoint_pattern: if prepared.mode == InteractionMode::Checkpoint {
                prepared.pattern.clone()
            } else {
                None
            },
        };

        match self.runner.run(request).await {
            Ok(outcome) => {
                record.status = TaskStatus::Completed;
                record.result = Some(excerpt(&outcome.stdout));
                record.progress = "Assistant finished".to_string();
                record.progress_percentage = 100;
                record.steps_completed = 3;
                record.current_step = "completed".to_string();
                record.execution_time_ms = Some(outcome.duration_ms);
                record.checkpoint_reached = outcome.checkpoint.reached;
                record.checkpoint_text = outcome.checkpoint.matched_text;
                if !outcome.stderr.trim().is_empty() {
                    record.warnings.push(excerpt(&outcome.stderr));
                }
            }
            Err(e) => {
                record.push_error(error_entry_for(&e));
                record.status = TaskStatus::Failed;
                record.progress = "Assistant failed".to_string();
                record.current_step = "failed".to_string();
            }
        }
        record.completed_at = Some(now_secs());
        record.touch();

        self.finalize(&prepared, record, record_id).await;
    }

    /// Terminal sequence: completion update, archival, retention cleanup,
    /// record deletion, notification, deregistration. Strictly in that
    /// order, each step best-effort except the order itself.
    async fn finalize(
        &self,
        prepared: &PreparedTask,
        record: TaskStatusRecord,
        record_id: Option<String>,
    ) {
        let task_id = &record.task_id;
        let agent_id = &record.agent_id;

        if let Some(id) = &record_id {
            if let Err(e) = self.store.update_record(id, &record).await {
                warn!("Completion update failed for {}: {}", task_id, e);
            }

            archive_if_needed(self.store.as_ref(), &record).await;

            let keep = prepared
                .submission
                .keep_records
                .unwrap_or(self.config.keep_records);
            cleanup_old_records(self.store.as_ref(), agent_id, keep).await;

            if let Err(e) = self.store.detach_record(agent_id, id).await {
                warn!("Detach failed for {}: {}", task_id, e);
            }
            if let Err(e) = self.store.delete_record(id).await {
                warn!("Record deletion failed for {}: {}", task_id, e);
            }
        }

        let event = self.build_event(prepared, &record).await;
        self.router.notify(&event).await;

        self.registry.remove(task_id).await;
        let success = record.status == TaskStatus::Completed;
        self.counters.on_terminal(success);

        let mut completed = self.completed.lock().await;
        completed.push(CompletedJob {
            task_id: task_id.clone(),
            agent_id: agent_id.clone(),
            status: record.status,
            session_id: record.session_id.clone(),
            finished_at_secs: now_secs(),
        });
        if completed.len() > COMPLETED_JOBS_CAP {
            let overflow = completed.len() - COMPLETED_JOBS_CAP;
            completed.drain(..overflow);
        }
        drop(completed);

        info!("Task {} resolved as {}", task_id, record.status.as_str());
    }

    async fn build_event(
        &self,
        prepared: &PreparedTask,
        record: &TaskStatusRecord,
    ) -> NotificationEvent {
        let submission = &prepared.submission;
        let max_iterations = submission.max_iterations.unwrap_or(self.config.max_iterations);
        let iterations_used = match &submission.session_id {
            Some(session) => {
                let completed = self.completed.lock().await;
                1 + completed
                    .iter()
                    .filter(|c| c.session_id.as_deref() == Some(session.as_str()))
                    .count() as u32
            }
            None => 1,
        };

        NotificationEvent {
            task_id: record.task_id.clone(),
            agent_id: record.agent_id.clone(),
            success: record.status == TaskStatus::Completed,
            status: record.status,
            result: record.result.clone(),
            error: record.errors.last().map(|e| e.message.clone()),
            execution_time_ms: record.execution_time_ms,
            checkpoint_reached: record.checkpoint_reached,
            can_continue: record.checkpoint_reached && iterations_used < max_iterations,
            session_id: record.session_id.clone(),
            interaction_mode: prepared.mode,
            timestamp_secs: 0,
        }
        .stamp_now()
    }
}

#[async_trait]
impl JobStatusTracker for TaskEngine {
    async fn active_jobs(&self) -> Vec<TaskDescriptor> {
        self.registry.all().await
    }

    async fn completed_jobs(&self) -> Vec<CompletedJob> {
        self.completed.lock().await.clone()
    }

    fn stats(&self) -> JobStats {
        self.counters.snapshot()
    }
}

fn parse_interaction_mode(raw: Option<&str>) -> Result<InteractionMode> {
    match raw {
        None | Some("immediate") => Ok(InteractionMode::Immediate),
        Some("checkpoint") => Ok(InteractionMode::Checkpoint),
        Some(other) => Err(BridgeError::validation(format!(
            "unknown interaction mode: {}",
            other
        ))),
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > RESULT_EXCERPT_LEN {
        let cut: String = trimmed.chars().take(RESULT_EXCERPT_LEN).collect();
        format!("{}...", cut)
    } else {
        trimmed.to_string()
    }
}

fn error_entry_for(err: &anyhow::Error) -> ErrorEntry {
    match err.downcast_ref::<BridgeError>() {
        Some(BridgeError::Timeout { waited_ms, stderr, .. }) => {
            ErrorEntry::new(ErrorType::Timeout, err.to_string())
                .with_details(format!("waited {}ms; stderr: {}", waited_ms, stderr.trim()))
        }
        Some(BridgeError::Process { stderr, .. }) => {
            ErrorEntry::new(ErrorType::System, err.to_string())
                .with_details(stderr.trim().to_string())
        }
        Some(BridgeError::Store(_)) => ErrorEntry::new(ErrorType::Api, err.to_string()),
        Some(BridgeError::Validation(_)) => {
            ErrorEntry::new(ErrorType::Validation, err.to_string())
        }
        Some(BridgeError::Notification(_)) => {
            ErrorEntry::new(ErrorType::Network, err.to_string())
        }
        None => ErrorEntry::new(ErrorType::System, err.to_string()),
    }
}
