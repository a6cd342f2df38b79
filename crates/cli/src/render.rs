//! Terminal rendering of workflow views.

use colored::Colorize;
use sw_protocol::{
    ConnectionState, EventKind, StageStatus, StageUpdateEvent, WorkflowStatus, WorkflowView,
};

/// Turns successive views into output lines, printing only what changed.
pub struct Printer {
    json: bool,
    seen_events: usize,
    /// Last event printed, to tell an appended log from a reset one.
    last_event: Option<StageUpdateEvent>,
    connection: Option<ConnectionState>,
    status: Option<WorkflowStatus>,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            seen_events: 0,
            last_event: None,
            connection: None,
            status: None,
        }
    }

    pub fn render(&mut self, view: &WorkflowView) -> serde_json::Result<Vec<String>> {
        if self.json {
            return Ok(vec![serde_json::to_string(view)?]);
        }

        let mut lines = Vec::new();

        if self.connection != Some(view.connection_state) {
            self.connection = Some(view.connection_state);
            lines.push(connection_line(view.connection_state));
        }

        // After a reset the log no longer extends what was printed, even
        // when it has grown past the old length again.
        let extends_printed = match self.seen_events.checked_sub(1) {
            Some(last) => view.agent_updates.get(last) == self.last_event.as_ref(),
            None => true,
        };
        if !extends_printed {
            self.seen_events = 0;
        }
        lines.extend(
            view.agent_updates[self.seen_events..]
                .iter()
                .filter_map(event_line),
        );
        self.seen_events = view.agent_updates.len();
        self.last_event = view.agent_updates.last().cloned();

        if self.status != Some(view.workflow_status) {
            self.status = Some(view.workflow_status);
            if let Some(line) = status_line(view.workflow_status) {
                lines.push(line);
            }
        }

        Ok(lines)
    }
}

fn connection_line(state: ConnectionState) -> String {
    let label = match state {
        ConnectionState::Connecting => "connecting".yellow(),
        ConnectionState::Open => "connected".green(),
        ConnectionState::Closed => "disconnected".dimmed(),
        ConnectionState::Error => "connection error".red(),
    };
    format!("~ {label}")
}

fn event_line(event: &StageUpdateEvent) -> Option<String> {
    match event.kind {
        EventKind::HeartbeatAck => None,
        EventKind::Lifecycle => event.message.as_ref().map(|m| format!("· {m}")),
        EventKind::StageUpdate => {
            let stage = event.stage_name.as_deref()?.bold();
            let line = match event.stage_status? {
                StageStatus::Running => format!("▶ {stage} {}", "running".yellow()),
                StageStatus::Completed => format!("✔ {stage} {}", "completed".green()),
                StageStatus::Error => match &event.error_message {
                    Some(reason) => format!("✖ {stage} {}: {reason}", "failed".red()),
                    None => format!("✖ {stage} {}", "failed".red()),
                },
            };
            Some(line)
        }
    }
}

fn status_line(status: WorkflowStatus) -> Option<String> {
    match status {
        WorkflowStatus::Completed => Some(format!("workflow {}", "completed".green().bold())),
        WorkflowStatus::Error => Some(format!("workflow {}", "failed".red().bold())),
        _ => None,
    }
}
