use crate::criteria::CriterionKey;
use crate::pipeline::Stage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Completed,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        f.write_str(s)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Partial => "partial",
            AnalysisStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Final score for one criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaScore {
    pub criterion_key: CriterionKey,
    pub score: u8,
    pub justification: String,
    pub risk_flag: bool,
    /// Set when the criterion failed the quality gate and carries the sentinel score
    #[serde(default, skip_serializing_if = "is_false")]
    pub degraded: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Final report payload of one analysis session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub status: AnalysisStatus,
    pub overall_weighted_score: u8,
    pub risk_level: RiskLevel,
    pub criteria_scores: BTreeMap<CriterionKey, CriteriaScore>,
    pub executive_summary: String,
    pub recommendations: Vec<String>,
    pub confidence_level: u8,
    pub failed_stages: BTreeSet<Stage>,
}

impl AnalysisResult {
    pub fn degraded_criteria(&self) -> Vec<CriterionKey> {
        self.criteria_scores
            .values()
            .filter(|s| s.degraded)
            .map(|s| s.criterion_key)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_json_shape() {
        let mut criteria_scores = BTreeMap::new();
        criteria_scores.insert(
            CriterionKey::BudgetCompliance,
            CriteriaScore {
                criterion_key: CriterionKey::BudgetCompliance,
                score: 70,
                justification: "Over budget by twenty percent".to_string(),
                risk_flag: true,
                degraded: false,
            },
        );

        let result = AnalysisResult {
            status: AnalysisStatus::Partial,
            overall_weighted_score: 70,
            risk_level: RiskLevel::Medium,
            criteria_scores,
            executive_summary: "Summary".to_string(),
            recommendations: vec!["Negotiate price".to_string()],
            confidence_level: 10,
            failed_stages: BTreeSet::from([Stage::TechnicalCommercialAnalysis]),
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "partial");
        assert_eq!(value["risk_level"], "medium");
        assert_eq!(value["criteria_scores"]["budget_compliance"]["score"], 70);
        assert_eq!(value["criteria_scores"]["budget_compliance"]["risk_flag"], true);
        assert!(value["criteria_scores"]["budget_compliance"].get("degraded").is_none());
        assert_eq!(value["failed_stages"][0], "TECHNICAL_COMMERCIAL_ANALYSIS");
    }

    #[test]
    fn test_degraded_criteria_follow_the_flag_not_the_text() {
        let entry = |key, justification: &str, degraded| CriteriaScore {
            criterion_key: key,
            score: if degraded { 0 } else { 88 },
            justification: justification.to_string(),
            risk_flag: degraded,
            degraded,
        };
        let criteria_scores = BTreeMap::from([
            (
                CriterionKey::Methodology,
                entry(
                    CriterionKey::Methodology,
                    "Criterion could not be evaluated by earlier vendors, this one documents it",
                    false,
                ),
            ),
            (
                CriterionKey::Scalability,
                entry(CriterionKey::Scalability, "no score given", true),
            ),
        ]);
        let result = AnalysisResult {
            status: AnalysisStatus::Partial,
            overall_weighted_score: 50,
            risk_level: RiskLevel::Medium,
            criteria_scores,
            executive_summary: String::new(),
            recommendations: Vec::new(),
            confidence_level: 50,
            failed_stages: BTreeSet::new(),
        };

        assert_eq!(result.degraded_criteria(), vec![CriterionKey::Scalability]);

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["criteria_scores"]["scalability"]["degraded"], true);
        let back: AnalysisResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }
}
