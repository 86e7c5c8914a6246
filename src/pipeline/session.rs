//! Analysis session state machine
//!
//! `PENDING -> STRUCTURE_ANALYSIS -> TECHNICAL_COMMERCIAL_ANALYSIS ->
//! RISK_ASSESSMENT -> FINAL_SYNTHESIS -> COMPLETED`, with every non-terminal
//! state able to move to `FAILED` or `CANCELLED`.

use super::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    StructureAnalysis,
    TechnicalCommercialAnalysis,
    RiskAssessment,
    FinalSynthesis,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "PENDING",
            SessionStatus::StructureAnalysis => "STRUCTURE_ANALYSIS",
            SessionStatus::TechnicalCommercialAnalysis => "TECHNICAL_COMMERCIAL_ANALYSIS",
            SessionStatus::RiskAssessment => "RISK_ASSESSMENT",
            SessionStatus::FinalSynthesis => "FINAL_SYNTHESIS",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Failed => "FAILED",
            SessionStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            SessionStatus::StructureAnalysis => Some(Stage::StructureAnalysis),
            SessionStatus::TechnicalCommercialAnalysis => Some(Stage::TechnicalCommercialAnalysis),
            SessionStatus::RiskAssessment => Some(Stage::RiskAssessment),
            SessionStatus::FinalSynthesis => Some(Stage::FinalSynthesis),
            _ => None,
        }
    }

    fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Failed | Cancelled) => true,
            (Pending, StructureAnalysis)
            | (StructureAnalysis, TechnicalCommercialAnalysis)
            | (TechnicalCommercialAnalysis, RiskAssessment)
            | (RiskAssessment, FinalSynthesis)
            | (FinalSynthesis, Completed) => true,
            _ => false,
        }
    }
}

impl From<Stage> for SessionStatus {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::StructureAnalysis => SessionStatus::StructureAnalysis,
            Stage::TechnicalCommercialAnalysis => SessionStatus::TechnicalCommercialAnalysis,
            Stage::RiskAssessment => SessionStatus::RiskAssessment,
            Stage::FinalSynthesis => SessionStatus::FinalSynthesis,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("Session {id} has already been started")]
    AlreadyStarted { id: Uuid },
}

/// One run of the pipeline for a given request
///
/// Only the orchestrator running the session mutates it. Cancellation is
/// requested through a shared token and observed at stage boundaries.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSession {
    pub id: Uuid,
    status: SessionStatus,
    current_stage: Option<Stage>,
    progress_percent: u8,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    cancel: CancellationToken,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: SessionStatus::Pending,
            current_stage: None,
            progress_percent: 0,
            created_at: Utc::now(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current_stage(&self) -> Option<Stage> {
        self.current_stage
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Requests cooperative cancellation; an in-flight call still completes
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that cancels this session from another task
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn ensure_pending(&self) -> Result<(), SessionError> {
        if self.status == SessionStatus::Pending {
            Ok(())
        } else {
            Err(SessionError::AlreadyStarted { id: self.id })
        }
    }

    pub(crate) fn begin_stage(&mut self, stage: Stage) -> Result<(), SessionError> {
        self.transition(SessionStatus::from(stage))?;
        self.current_stage = Some(stage);
        self.advance_progress(stage.progress_range().0);
        Ok(())
    }

    pub(crate) fn complete(&mut self) -> Result<(), SessionError> {
        self.transition(SessionStatus::Completed)?;
        self.current_stage = None;
        self.advance_progress(100);
        Ok(())
    }

    pub(crate) fn fail(&mut self) -> Result<(), SessionError> {
        self.transition(SessionStatus::Failed)
    }

    pub(crate) fn mark_cancelled(&mut self) -> Result<(), SessionError> {
        self.transition(SessionStatus::Cancelled)
    }

    /// Progress never moves backwards
    pub(crate) fn advance_progress(&mut self, percent: u8) {
        self.progress_percent = self.progress_percent.max(percent.min(100));
    }

    fn transition(&mut self, next: SessionStatus) -> Result<(), SessionError> {
        if !self.status.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}
