//! One structured notification event, with small pure renderers per
//! channel. Channels never build their own payload text.

use serde::{Deserialize, Serialize};

use crate::core::status::types::{TaskStatus, now_secs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    Immediate,
    Checkpoint,
}

impl InteractionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionMode::Immediate => "immediate",
            InteractionMode::Checkpoint => "checkpoint",
        }
    }
}

/// Ephemeral event built from the terminal status record plus delivery
/// metadata. Exists only for the duration of the routing attempt.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub task_id: String,
    pub agent_id: String,
    pub success: bool,
    pub status: TaskStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub execution_time_ms: Option<u64>,
    pub checkpoint_reached: bool,
    pub can_continue: bool,
    pub session_id: Option<String>,
    pub interaction_mode: InteractionMode,
    pub timestamp_secs: u64,
}

impl NotificationEvent {
    pub fn stamp_now(mut self) -> Self {
        self.timestamp_secs = now_secs();
        self
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{}…", cut)
    } else {
        text.to_string()
    }
}

/// Chat-native rendering: short markdown-ish message for a room.
pub fn render_chat(event: &NotificationEvent) -> String {
    let headline = if event.checkpoint_reached {
        format!("⏸️ Task `{}` paused at a checkpoint", event.task_id)
    } else if event.success {
        format!("✅ Task `{}` completed", event.task_id)
    } else {
        format!("❌ Task `{}` failed", event.task_id)
    };

    let mut lines = vec![headline, format!("Agent: {}", event.agent_id)];

    if let Some(result) = &event.result {
        lines.push(format!("Result: {}", truncate(result, 500)));
    }
    if let Some(error) = &event.error {
        lines.push(format!("Error: {}", truncate(error, 500)));
    }
    if let Some(ms) = event.execution_time_ms {
        lines.push(format!("Took: {}ms", ms));
    }
    if event.checkpoint_reached {
        let continuation = if event.can_continue {
            match &event.session_id {
                Some(session) => format!("Continue with session `{}`", session),
                None => "Continuation available".to_string(),
            }
        } else {
            "Iteration budget exhausted".to_string()
        };
        lines.push(continuation);
    }
    lines.join("\n")
}

/// Fallback rendering: simplified plain text for the HTTP callback.
pub fn render_callback(event: &NotificationEvent) -> String {
    let outcome = if event.checkpoint_reached {
        "checkpoint"
    } else if event.success {
        "completed"
    } else {
        "failed"
    };
    let detail = event
        .result
        .as_deref()
        .or(event.error.as_deref())
        .unwrap_or("(no output)");
    format!(
        "Task {} for agent {} {}: {}",
        event.task_id,
        event.agent_id,
        outcome,
        truncate(detail, 1000)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> NotificationEvent {
        NotificationEvent {
            task_id: "task-1".to_string(),
            agent_id: "agent-a".to_string(),
            success: true,
            status: TaskStatus::Completed,
            result: Some("done".to_string()),
            error: None,
            execution_time_ms: Some(42),
            checkpoint_reached: false,
            can_continue: false,
            session_id: None,
            interaction_mode: InteractionMode::Immediate,
            timestamp_secs: 0,
        }
    }

    #[test]
    fn chat_render_success() {
        let text = render_chat(&event());
        assert!(text.contains("✅"));
        assert!(text.contains("task-1"));
        assert!(text.contains("Result: done"));
        assert!(text.contains("Took: 42ms"));
    }

    #[test]
    fn chat_render_failure_carries_error() {
        let mut e = event();
        e.success = false;
        e.status = TaskStatus::Failed;
        e.result = None;
        e.error = Some("assistant exited with code 1".to_string());
        let text = render_chat(&e);
        assert!(text.contains("❌"));
        assert!(text.contains("assistant exited with code 1"));
    }

    #[test]
    fn chat_render_checkpoint_mentions_continuation() {
        let mut e = event();
        e.checkpoint_reached = true;
        e.can_continue = true;
        e.session_id = Some("sess-9".to_string());
        e.interaction_mode = InteractionMode::Checkpoint;
        let text = render_chat(&e);
        assert!(text.contains("⏸️"));
        assert!(text.contains("sess-9"));
    }

    #[test]
    fn callback_render_has_equivalent_information() {
        let chat = render_chat(&event());
        let callback = render_callback(&event());
        for token in ["task-1", "agent-a", "done"] {
            assert!(chat.contains(token));
            assert!(callback.contains(token));
        }
    }

    #[test]
    fn long_results_are_truncated() {
        let mut e = event();
        e.result = Some("y".repeat(5000));
        let text = render_chat(&e);
        assert!(text.len() < 1200);
        assert!(text.contains('…'));
    }
}
