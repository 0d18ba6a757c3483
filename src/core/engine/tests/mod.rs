//! Engine lifecycle tests, driven through scripted doubles for the status
//! store, the notification channels, and the assistant runner.


use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::checkpoint::CheckpointReport;
use crate::core::config::EngineConfig;
use crate::core::error::BridgeError;
use crate::core::notify::format::NotificationEvent;
use crate::core::notify::{DeliveryOutcome, NotificationChannel, NotificationRouter};
use crate::core::registry::TaskRegistry;
use crate::core::status::types::TaskStatusRecord;
use crate::core::status::{StatusStore, StoredRecord};

use super::{AssistantOutcome, AssistantRequest, AssistantRunner, TaskEngine};

// --- Status store double ---

pub(crate) struct MemoryStatusStore {
    pub records: Mutex<HashMap<String, TaskStatusRecord>>,
    /// Every record version ever written, in arrival order.
    pub history: Mutex<Vec<TaskStatusRecord>>,
    /// Every store call in arrival order, for causal-ordering assertions.
    pub ops: Mutex<Vec<String>>,
    pub archives: Mutex<Vec<String>>,
    pub fail_create: bool,
    next_id: AtomicUsize,
}

impl MemoryStatusStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
            ops: Mutex::new(Vec::new()),
            archives: Mutex::new(Vec::new()),
            fail_create: false,
            next_id: AtomicUsize::new(1),
        })
    }

    pub fn failing_create() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
            ops: Mutex::new(Vec::new()),
            archives: Mutex::new(Vec::new()),
            fail_create: true,
            next_id: AtomicUsize::new(1),
        })
    }

    pub async fn op_log(&self) -> Vec<String> {
        self.ops.lock().await.clone()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn create_record(&self, record: &TaskStatusRecord) -> Result<String> {
        if self.fail_create {
            self.ops.lock().await.push("create:failed".to_string());
            return Err(BridgeError::store("store unavailable"));
        }
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records
            .lock()
            .await
            .insert(id.clone(), record.clone());
        self.history.lock().await.push(record.clone());
        self.ops
            .lock()
            .await
            .push(format!("create:{}", record.status.as_str()));
        Ok(id)
    }

    async fn update_record(&self, record_id: &str, record: &TaskStatusRecord) -> Result<()> {
        self.records
            .lock()
            .await
            .insert(record_id.to_string(), record.clone());
        self.history.lock().await.push(record.clone());
        self.ops
            .lock()
            .await
            .push(format!("update:{}", record.status.as_str()));
        Ok(())
    }

    async fn delete_record(&self, record_id: &str) -> Result<()> {
        self.records.lock().await.remove(record_id);
        self.ops.lock().await.push("delete".to_string());
        Ok(())
    }

    async fn attach_record(&self, _agent_id: &str, _record_id: &str) -> Result<()> {
        self.ops.lock().await.push("attach".to_string());
        Ok(())
    }

    async fn detach_record(&self, _agent_id: &str, _record_id: &str) -> Result<()> {
        self.ops.lock().await.push("detach".to_string());
        Ok(())
    }

    async fn list_records(&self, _agent_id: &str) -> Result<Vec<StoredRecord>> {
        self.ops.lock().await.push("list".to_string());
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .map(|(id, record)| StoredRecord {
                id: id.clone(),
                label: record.label(),
                value: serde_json::to_string(record).unwrap(),
                created_at: None,
            })
            .collect())
    }

    async fn archive(&self, _agent_id: &str, text: &str) -> Result<()> {
        self.ops.lock().await.push("archive".to_string());
        self.archives.lock().await.push(text.to_string());
        Ok(())
    }
}

// --- Notification channel double ---

#[derive(Clone, Copy)]
pub(crate) enum ChannelScript {
    Deliver,
    NotConfigured,
    Fail,
}

pub(crate) struct RecordingChannel {
    script: ChannelScript,
    pub events: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl RecordingChannel {
    pub fn new(script: ChannelScript) -> (Box<Self>, Arc<Mutex<Vec<NotificationEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            Box::new(Self {
                script,
                events: events.clone(),
            }),
            events,
        )
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, event: &NotificationEvent) -> Result<DeliveryOutcome> {
        self.events.lock().await.push(event.clone());
        match self.script {
            ChannelScript::Deliver => Ok(DeliveryOutcome::Delivered),
            ChannelScript::NotConfigured => Ok(DeliveryOutcome::NotConfigured),
            ChannelScript::Fail => Err(anyhow::anyhow!("channel down")),
        }
    }
}

// --- Assistant runner double ---

#[derive(Clone)]
pub(crate) enum RunnerScript {
    Succeed {
        stdout: String,
        checkpoint: bool,
        delay: Duration,
    },
    FailProcess,
    FailTimeout,
}

pub(crate) struct ScriptedRunner {
    script: RunnerScript,
    pub spawns: AtomicUsize,
}

impl ScriptedRunner {
    pub fn new(script: RunnerScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            spawns: AtomicUsize::new(0),
        })
    }

    pub fn succeed(stdout: &str) -> Arc<Self> {
        Self::new(RunnerScript::Succeed {
            stdout: stdout.to_string(),
            checkpoint: false,
            delay: Duration::ZERO,
        })
    }
}

#[async_trait]
impl AssistantRunner for ScriptedRunner {
    async fn run(&self, _request: AssistantRequest) -> Result<AssistantOutcome> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            RunnerScript::Succeed {
                stdout,
                checkpoint,
                delay,
            } => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                Ok(AssistantOutcome {
                    stdout: stdout.clone(),
                    stderr: String::new(),
                    checkpoint: CheckpointReport {
                        reached: *checkpoint,
                        matched_text: checkpoint.then(|| "READY".to_string()),
                    },
                    duration_ms: 5,
                })
            }
            RunnerScript::FailProcess => Err(anyhow::Error::new(BridgeError::Process {
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "boom".to_string(),
            })),
            RunnerScript::FailTimeout => Err(anyhow::Error::new(BridgeError::Timeout {
                waited_ms: 1800_000,
                stdout: "partial".to_string(),
                stderr: String::new(),
            })),
        }
    }
}

// --- Harness ---

pub(crate) struct EngineHarness {
    pub engine: Arc<TaskEngine>,
    pub registry: Arc<TaskRegistry>,
    pub store: Arc<MemoryStatusStore>,
    pub runner: Arc<ScriptedRunner>,
    pub primary_events: Arc<Mutex<Vec<NotificationEvent>>>,
    pub fallback_events: Arc<Mutex<Vec<NotificationEvent>>>,
}

pub(crate) fn harness(
    store: Arc<MemoryStatusStore>,
    runner: Arc<ScriptedRunner>,
    primary: ChannelScript,
    fallback: ChannelScript,
) -> EngineHarness {
    let registry = Arc::new(TaskRegistry::new(Duration::from_secs(3600)));
    let (primary_channel, primary_events) = RecordingChannel::new(primary);
    let (fallback_channel, fallback_events) = RecordingChannel::new(fallback);
    let router = Arc::new(NotificationRouter::new(primary_channel, fallback_channel));
    let engine = TaskEngine::new(
        registry.clone(),
        store.clone(),
        router,
        runner.clone(),
        EngineConfig::default(),
    );
    EngineHarness {
        engine,
        registry,
        store,
        runner,
        primary_events,
        fallback_events,
    }
}

impl EngineHarness {
    /// Wait until `count` tasks have resolved, or panic after two seconds.
    pub async fn wait_for_completed(&self, count: usize) {
        use super::stats::JobStatusTracker;
        for _ in 0..200 {
            if self.engine.completed_jobs().await.len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("tasks did not resolve in time");
    }
}
