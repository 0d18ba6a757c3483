use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tracing::{debug, info};

const PROMPT_EXCERPT_LEN: usize = 100;

/// Lightweight in-memory record of a live task. The authoritative state
/// lives in the external memory service; this map only answers "is this
/// task id ours and still running".
#[derive(Debug, Clone, serde::Serialize)]
pub struct TaskDescriptor {
    pub task_id: String,
    pub agent_id: String,
    pub prompt_excerpt: String,
    pub created_at_secs: u64,
    #[serde(skip)]
    created: Instant,
}

impl TaskDescriptor {
    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }
}

/// Concurrent task-id → descriptor map with a time-to-live safety net.
///
/// Completion logic removes descriptors explicitly; the background sweep
/// only catches descriptors leaked by a failed cleanup path.
pub struct TaskRegistry {
    inner: Mutex<HashMap<String, TaskDescriptor>>,
    ttl: Duration,
}

impl TaskRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Insert a descriptor with a truncated prompt excerpt. Pure in-memory
    /// insert; replaces any stale entry under the same id.
    pub async fn create(&self, task_id: &str, agent_id: &str, prompt: &str) {
        let excerpt: String = prompt.chars().take(PROMPT_EXCERPT_LEN).collect();
        let descriptor = TaskDescriptor {
            task_id: task_id.to_string(),
            agent_id: agent_id.to_string(),
            prompt_excerpt: excerpt,
            created_at_secs: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            created: Instant::now(),
        };
        self.inner.lock().await.insert(task_id.to_string(), descriptor);
    }

    pub async fn get(&self, task_id: &str) -> Option<TaskDescriptor> {
        self.inner.lock().await.get(task_id).cloned()
    }

    /// Idempotent: removing an absent id is a no-op.
    pub async fn remove(&self, task_id: &str) {
        self.inner.lock().await.remove(task_id);
    }

    pub async fn all(&self) -> Vec<TaskDescriptor> {
        self.inner.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Evict descriptors older than the ttl. Returns how many were dropped.
    pub async fn sweep(&self) -> usize {
        let mut map = self.inner.lock().await;
        let before = map.len();
        map.retain(|_, d| d.created.elapsed() < self.ttl);
        let evicted = before - map.len();
        if evicted > 0 {
            info!("Registry sweep evicted {} stale task descriptor(s)", evicted);
        }
        evicted
    }

    /// Run the eviction sweep on a fixed interval for the life of the
    /// process.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await; // First tick fires immediately; skip it
            loop {
                ticker.tick().await;
                debug!("Running task registry sweep");
                registry.sweep().await;
            }
        });
    }
}
