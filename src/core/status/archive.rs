//! Long-term archival of completed tasks: a human-readable text block
//! submitted to the archival store as a separate, immutable entry.

use tracing::{debug, warn};

use super::StatusStore;
use super::types::TaskStatusRecord;

/// Render a record into the long-form archive text. Sections with nothing
/// to say are omitted.
pub fn format_archive_entry(record: &TaskStatusRecord) -> String {
    let mut sections = Vec::new();

    sections.push(format!(
        "=== Task Archive: {} ===\nAgent: {}\nType: {}\nStatus: {}\nPriority: {}",
        record.task_id,
        record.agent_id,
        record.task_type.as_str(),
        record.status.as_str(),
        record.archive_priority.as_str(),
    ));

    sections.push(format!("--- Original Request ---\n{}", record.prompt));

    sections.push(format!(
        "--- Progress ---\n{} ({}%, step {}/{}: {})",
        record.progress,
        record.progress_percentage,
        record.steps_completed,
        record.total_steps,
        record.current_step,
    ));

    if let Some(result) = &record.result {
        sections.push(format!("--- Result ---\n{}", result));
    }

    let mut outputs = Vec::new();
    if !record.files_created.is_empty() {
        outputs.push(format!("Files created: {}", record.files_created.join(", ")));
    }
    if !record.files_modified.is_empty() {
        outputs.push(format!(
            "Files modified: {}",
            record.files_modified.join(", ")
        ));
    }
    if !record.commands_executed.is_empty() {
        outputs.push(format!(
            "Commands executed: {}",
            record.commands_executed.join(", ")
        ));
    }
    if !record.urls_accessed.is_empty() {
        outputs.push(format!("URLs accessed: {}", record.urls_accessed.join(", ")));
    }
    if !outputs.is_empty() {
        sections.push(format!("--- Outputs ---\n{}", outputs.join("\n")));
    }

    if let Some(ms) = record.execution_time_ms {
        sections.push(format!(
            "--- Performance ---\nExecution time: {}ms\nComplexity: {}/10",
            ms, record.complexity_score
        ));
    }

    if !record.errors.is_empty() || !record.warnings.is_empty() {
        let mut issues = Vec::new();
        for e in &record.errors {
            issues.push(format!("[{:?}] {}", e.error_type, e.message));
        }
        for w in &record.warnings {
            issues.push(format!("[warning] {}", w));
        }
        sections.push(format!("--- Issues ---\n{}", issues.join("\n")));
    }

    if !record.archive_tags.is_empty() {
        sections.push(format!("--- Tags ---\n{}", record.archive_tags.join(", ")));
    }

    sections.join("\n\n")
}

/// Submit the archive entry when the record is flagged for it. Best-effort:
/// archival failure never aborts task completion.
pub async fn archive_if_needed(store: &dyn StatusStore, record: &TaskStatusRecord) {
    if !record.should_archive {
        return;
    }
    let text = format_archive_entry(record);
    match store.archive(&record.agent_id, &text).await {
        Ok(()) => debug!("Archived task {} for {}", record.task_id, record.agent_id),
        Err(e) => warn!("Failed to archive task {}: {}", record.task_id, e),
    }
}
