//! Decoding of inbound stream frames into [`StageUpdateEvent`]s.
//!
//! Frame mapping:
//! - `agent_update` -> stage update (requires `agent` and `status`)
//! - `status_response` -> stage update when it names a stage and a status,
//!   lifecycle notice otherwise
//! - `connection` -> lifecycle notice
//! - `pong` -> heartbeat acknowledgement

use sw_protocol::{InboundMessage, StageReport, StageStatus, StageUpdateEvent};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("agent_update frame without a stage name")]
    MissingStage,
    #[error("agent_update frame for stage {0} without a status")]
    MissingStatus(String),
}

/// Parse one text frame.
pub fn parse_frame(text: &str) -> Result<StageUpdateEvent, ProtocolError> {
    let message: InboundMessage = serde_json::from_str(text)?;
    to_event(message)
}

/// Normalize a decoded wire message.
pub fn to_event(message: InboundMessage) -> Result<StageUpdateEvent, ProtocolError> {
    match message {
        InboundMessage::AgentUpdate(report) => stage_event(report),
        InboundMessage::StatusResponse(report) => {
            if report.agent.is_some() && report.status.is_some() {
                stage_event(report)
            } else {
                Ok(StageUpdateEvent::lifecycle(report.message.or(report.error))
                    .with_timestamp(report.timestamp))
            }
        }
        InboundMessage::Connection(notice) => {
            Ok(StageUpdateEvent::lifecycle(notice.message.or(notice.status))
                .with_timestamp(notice.timestamp))
        }
        InboundMessage::Pong { timestamp } => {
            Ok(StageUpdateEvent::heartbeat_ack().with_timestamp(timestamp))
        }
    }
}

fn stage_event(report: StageReport) -> Result<StageUpdateEvent, ProtocolError> {
    let StageReport {
        agent,
        status,
        result,
        message,
        error,
        timestamp,
    } = report;

    let stage = agent.ok_or(ProtocolError::MissingStage)?;
    let status = status.ok_or_else(|| ProtocolError::MissingStatus(stage.clone()))?;

    // Failed stages report their reason in `error`, older servers in `message`.
    let error_message = match status {
        StageStatus::Error => error.or(message),
        _ => error,
    };

    let mut event = StageUpdateEvent::stage_update(stage, status).with_timestamp(timestamp);
    event.result_payload = result;
    event.error_message = error_message;
    Ok(event)
}
