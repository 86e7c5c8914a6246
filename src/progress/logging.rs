//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler, ProgressKind};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        let session = event.session_id;
        let stage = event.stage;
        let percent = event.progress_percent;

        match event.kind {
            ProgressKind::StageStarted => {
                info!(%session, %stage, percent, "Starting stage");
            }
            ProgressKind::StageRetrying => {
                warn!(%session, %stage, percent, "Retrying stage with strict schema");
            }
            ProgressKind::StageCompleted => {
                info!(%session, %stage, percent, "Stage complete");
            }
            ProgressKind::StageDegraded => {
                warn!(%session, %stage, percent, message = %event.message, "Stage degraded");
            }
            ProgressKind::StageFailed => {
                warn!(%session, %stage, percent, message = %event.message, "Stage failed");
            }
            ProgressKind::SessionCompleted => {
                info!(%session, message = %event.message, "Analysis complete");
            }
            ProgressKind::SessionFailed => {
                warn!(%session, message = %event.message, "Analysis failed");
            }
            ProgressKind::SessionCancelled => {
                debug!(%session, percent, "Analysis cancelled");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SessionStatus;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_logging_all_kinds() {
        let handler = LoggingHandler;
        let kinds = [
            ProgressKind::StageStarted,
            ProgressKind::StageRetrying,
            ProgressKind::StageCompleted,
            ProgressKind::StageDegraded,
            ProgressKind::StageFailed,
            ProgressKind::SessionCompleted,
            ProgressKind::SessionFailed,
            ProgressKind::SessionCancelled,
        ];

        for kind in kinds {
            handler.on_progress(&ProgressEvent {
                session_id: Uuid::new_v4(),
                stage: SessionStatus::FinalSynthesis,
                kind,
                progress_percent: 70,
                message: "test".to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}
