use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Timeout => "timeout",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled | TaskStatus::Timeout
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    FileOperation,
    CodeGeneration,
    Analysis,
    Search,
    GitOperation,
    TerminalCommand,
    MultiStep,
    Other,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::FileOperation => "file_operation",
            TaskType::CodeGeneration => "code_generation",
            TaskType::Analysis => "analysis",
            TaskType::Search => "search",
            TaskType::GitOperation => "git_operation",
            TaskType::TerminalCommand => "terminal_command",
            TaskType::MultiStep => "multi_step",
            TaskType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchivePriority {
    Low,
    Medium,
    High,
}

impl ArchivePriority {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchivePriority::Low => "low",
            ArchivePriority::Medium => "medium",
            ArchivePriority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    System,
    User,
    Network,
    Permission,
    Timeout,
    Api,
    Validation,
}

/// Append-only entry in a status record's error list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub timestamp: u64,
    pub error_type: ErrorType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub recoverable: bool,
}

impl ErrorEntry {
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            timestamp: now_secs(),
            error_type,
            message: message.into(),
            details: None,
            recoverable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// The authoritative task state, persisted as a record in the external
/// memory service. The engine is the sole writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusRecord {
    // Identity
    pub task_id: String,
    pub agent_id: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_folder: Option<String>,

    // Lifecycle
    pub status: TaskStatus,
    pub started_at: u64,
    pub updated_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,

    // Progress
    pub progress: String,
    pub progress_percentage: u8,
    pub steps_completed: u32,
    pub total_steps: u32,
    pub current_step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_details: Option<String>,
    pub checkpoint_reached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_text: Option<String>,

    // Classification
    pub task_type: TaskType,
    pub complexity_score: u8,

    // Outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub errors: Vec<ErrorEntry>,
    pub warnings: Vec<String>,

    // Metrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_usage_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_usage_percent: Option<f64>,

    // Side-effect ledger
    pub files_created: Vec<String>,
    pub files_modified: Vec<String>,
    pub commands_executed: Vec<String>,
    pub urls_accessed: Vec<String>,

    // Archival
    pub should_archive: bool,
    pub archive_priority: ArchivePriority,
    pub archive_tags: Vec<String>,
    /// Elevated records are exempt from retention cleanup.
    pub elevated: bool,
}

impl TaskStatusRecord {
    pub fn record_label(task_id: &str) -> String {
        format!("task_status_{}", task_id)
    }

    pub fn label(&self) -> String {
        Self::record_label(&self.task_id)
    }

    pub fn touch(&mut self) {
        self.updated_at = now_secs();
    }

    pub fn push_error(&mut self, entry: ErrorEntry) {
        self.errors.push(entry);
    }
}
