//! Pipeline stages and the per-attempt record each one leaves behind

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    StructureAnalysis,
    TechnicalCommercialAnalysis,
    RiskAssessment,
    FinalSynthesis,
}

impl Stage {
    /// Execution order
    pub const ALL: [Stage; 4] = [
        Stage::StructureAnalysis,
        Stage::TechnicalCommercialAnalysis,
        Stage::RiskAssessment,
        Stage::FinalSynthesis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::StructureAnalysis => "STRUCTURE_ANALYSIS",
            Stage::TechnicalCommercialAnalysis => "TECHNICAL_COMMERCIAL_ANALYSIS",
            Stage::RiskAssessment => "RISK_ASSESSMENT",
            Stage::FinalSynthesis => "FINAL_SYNTHESIS",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::StructureAnalysis => "structure analysis",
            Stage::TechnicalCommercialAnalysis => "technical and commercial analysis",
            Stage::RiskAssessment => "risk assessment",
            Stage::FinalSynthesis => "final synthesis",
        }
    }

    /// Mandatory stages fail the session; the others degrade it
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Stage::StructureAnalysis | Stage::FinalSynthesis)
    }

    pub fn default_timeout(&self) -> Duration {
        match self {
            Stage::StructureAnalysis | Stage::RiskAssessment => Duration::from_secs(45),
            Stage::TechnicalCommercialAnalysis | Stage::FinalSynthesis => Duration::from_secs(60),
        }
    }

    /// Progress percent when the stage starts and when it resolves
    pub fn progress_range(&self) -> (u8, u8) {
        match self {
            Stage::StructureAnalysis => (5, 25),
            Stage::TechnicalCommercialAnalysis => (25, 50),
            Stage::RiskAssessment => (50, 70),
            Stage::FinalSynthesis => (70, 95),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one stage attempt, retries included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage_name: Stage,
    /// 1 for the first attempt, 2 for the strict-schema retry
    pub attempt: u8,
    pub raw_model_output: String,
    pub parsed_fields: Map<String, Value>,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StageResult {
    pub fn success(
        stage: Stage,
        attempt: u8,
        raw_model_output: impl Into<String>,
        parsed_fields: Map<String, Value>,
    ) -> Self {
        Self {
            stage_name: stage,
            attempt,
            raw_model_output: raw_model_output.into(),
            parsed_fields,
            succeeded: true,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Sentinel for a failed attempt; carries no parsed fields
    pub fn failure(
        stage: Stage,
        attempt: u8,
        raw_model_output: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            stage_name: stage,
            attempt,
            raw_model_output: raw_model_output.into(),
            parsed_fields: Map::new(),
            succeeded: false,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}
