//! Retention cleanup: keep the most recent non-elevated status records per
//! agent, detach and delete the rest. Elevated records are never touched.

use tracing::{debug, warn};

use super::{StatusStore, StoredRecord};
use super::types::TaskStatusRecord;

#[derive(Debug, Clone)]
pub struct CleanupCandidate {
    pub record_id: String,
    pub elevated: bool,
    pub created_at_secs: u64,
}

/// Pure selection: sort non-elevated candidates newest-first and return the
/// ids of everything beyond `keep`.
pub fn select_for_removal(candidates: Vec<CleanupCandidate>, keep: usize) -> Vec<String> {
    let mut removable: Vec<CleanupCandidate> =
        candidates.into_iter().filter(|c| !c.elevated).collect();
    removable.sort_by(|a, b| b.created_at_secs.cmp(&a.created_at_secs));
    removable
        .into_iter()
        .skip(keep)
        .map(|c| c.record_id)
        .collect()
}

fn to_candidate(stored: &StoredRecord) -> Option<CleanupCandidate> {
    if !stored.label.starts_with("task_status_") {
        return None;
    }
    // Records that fail to parse are left alone rather than deleted blind.
    let record: TaskStatusRecord = match serde_json::from_str(&stored.value) {
        Ok(r) => r,
        Err(e) => {
            warn!("Skipping unparseable status record {}: {}", stored.id, e);
            return None;
        }
    };
    Some(CleanupCandidate {
        record_id: stored.id.clone(),
        elevated: record.elevated,
        created_at_secs: record.started_at,
    })
}

/// List the agent's records, pick the prunable ones, and remove them one by
/// one. Partial failures are logged per record and never abort the batch.
pub async fn cleanup_old_records(store: &dyn StatusStore, agent_id: &str, keep: usize) {
    let stored = match store.list_records(agent_id).await {
        Ok(records) => records,
        Err(e) => {
            warn!("Cleanup skipped, could not list records for {}: {}", agent_id, e);
            return;
        }
    };

    let candidates: Vec<CleanupCandidate> = stored.iter().filter_map(to_candidate).collect();
    let doomed = select_for_removal(candidates, keep);
    if doomed.is_empty() {
        return;
    }
    debug!("Pruning {} old status record(s) for {}", doomed.len(), agent_id);

    for record_id in doomed {
        if let Err(e) = store.detach_record(agent_id, &record_id).await {
            warn!("Failed to detach record {}: {}", record_id, e);
        }
        if let Err(e) = store.delete_record(&record_id).await {
            warn!("Failed to delete record {}: {}", record_id, e);
        }
    }
}
