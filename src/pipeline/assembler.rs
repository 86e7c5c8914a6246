use super::context::StageContext;
use super::stage::Stage;
use crate::criteria::{CriterionKey, WeightTable};
use crate::output::{AnalysisResult, AnalysisStatus, RiskLevel};
use crate::scoring::{self, QualityGate};
use std::collections::{BTreeMap, BTreeSet};

/// Merges stage outputs and the scoring outcome into the final result
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAssembler {
    gate: QualityGate,
}

impl ResultAssembler {
    pub fn new(gate: QualityGate) -> Self {
        Self { gate }
    }

    /// Builds the result of a session whose mandatory stages all succeeded
    pub fn assemble(&self, context: &StageContext, weights: &WeightTable) -> AnalysisResult {
        let flagged = context.flagged_criteria();
        let mut outputs = context.criteria_outputs();
        for key in &flagged {
            if let Some(output) = outputs.get_mut(key) {
                output.risk_flag = true;
            }
        }

        let outcome = scoring::score(&outputs, weights, &self.gate);
        let failed_stages = context.unavailable().clone();

        let status = if failed_stages.is_empty() && outcome.degraded.is_empty() {
            AnalysisStatus::Completed
        } else {
            AnalysisStatus::Partial
        };

        AnalysisResult {
            status,
            overall_weighted_score: outcome.overall_weighted_score,
            risk_level: outcome.risk_level,
            confidence_level: confidence_level(outcome.passed_count()),
            criteria_scores: outcome.criteria_scores,
            executive_summary: context.executive_summary(),
            recommendations: context.recommendations(),
            failed_stages,
        }
    }

    /// Result of a session stopped by a mandatory stage
    pub fn failed(&self, context: &StageContext, failed_stage: Stage) -> AnalysisResult {
        let mut failed_stages: BTreeSet<Stage> = context.unavailable().clone();
        failed_stages.insert(failed_stage);

        AnalysisResult {
            status: AnalysisStatus::Failed,
            overall_weighted_score: 0,
            risk_level: RiskLevel::High,
            criteria_scores: BTreeMap::new(),
            executive_summary: String::new(),
            recommendations: Vec::new(),
            confidence_level: 0,
            failed_stages,
        }
    }
}

/// Share of criteria that passed the quality gate, scaled to 0-100
pub fn confidence_level(passed: usize) -> u8 {
    let total = CriterionKey::ALL.len();
    ((passed.min(total) * 100) as f64 / total as f64).round() as u8
}
