//! The fixed set of evaluation criteria and their weight table

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Version of the default weight table; bump whenever a default weight changes
pub const WEIGHT_TABLE_VERSION: &str = "2024.2";

/// Allowed drift of the weight sum away from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// One of the ten fixed evaluation dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKey {
    BudgetCompliance,
    TimelineCompliance,
    TechnicalCompliance,
    TeamExpertise,
    FunctionalCoverage,
    QualityAssurance,
    Methodology,
    Scalability,
    Communication,
    AddedValue,
}

impl CriterionKey {
    pub const ALL: [CriterionKey; 10] = [
        CriterionKey::BudgetCompliance,
        CriterionKey::TimelineCompliance,
        CriterionKey::TechnicalCompliance,
        CriterionKey::TeamExpertise,
        CriterionKey::FunctionalCoverage,
        CriterionKey::QualityAssurance,
        CriterionKey::Methodology,
        CriterionKey::Scalability,
        CriterionKey::Communication,
        CriterionKey::AddedValue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CriterionKey::BudgetCompliance => "budget_compliance",
            CriterionKey::TimelineCompliance => "timeline_compliance",
            CriterionKey::TechnicalCompliance => "technical_compliance",
            CriterionKey::TeamExpertise => "team_expertise",
            CriterionKey::FunctionalCoverage => "functional_coverage",
            CriterionKey::QualityAssurance => "quality_assurance",
            CriterionKey::Methodology => "methodology",
            CriterionKey::Scalability => "scalability",
            CriterionKey::Communication => "communication",
            CriterionKey::AddedValue => "added_value",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|k| k.as_str() == needle)
    }

    pub fn default_weight(&self) -> f64 {
        match self {
            CriterionKey::BudgetCompliance => 0.15,
            CriterionKey::TimelineCompliance => 0.15,
            CriterionKey::TechnicalCompliance => 0.15,
            CriterionKey::TeamExpertise => 0.10,
            CriterionKey::FunctionalCoverage => 0.10,
            CriterionKey::QualityAssurance => 0.10,
            CriterionKey::Methodology => 0.08,
            CriterionKey::Scalability => 0.07,
            CriterionKey::Communication => 0.05,
            CriterionKey::AddedValue => 0.05,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CriterionKey::BudgetCompliance => "Proposed cost versus the budget stated in the specification",
            CriterionKey::TimelineCompliance => "Proposed schedule versus the required deadlines",
            CriterionKey::TechnicalCompliance => "Technology stack and architecture versus technical requirements",
            CriterionKey::TeamExpertise => "Relevant experience and qualifications of the proposed team",
            CriterionKey::FunctionalCoverage => "Share of required functionality the proposal commits to deliver",
            CriterionKey::QualityAssurance => "Testing, acceptance and quality control commitments",
            CriterionKey::Methodology => "Delivery process, planning and project management approach",
            CriterionKey::Scalability => "Ability of the proposed solution to grow with load and scope",
            CriterionKey::Communication => "Reporting cadence, transparency and points of contact",
            CriterionKey::AddedValue => "Useful extras offered beyond the stated requirements",
        }
    }
}

impl fmt::Display for CriterionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A criterion together with its effective weight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Criterion {
    pub key: CriterionKey,
    pub weight: f64,
    pub display_description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightError {
    #[error("Unknown criterion in weight overrides: {0}")]
    UnknownCriterion(String),

    #[error("Weight for {key} must be within [0, 1], got {weight}")]
    OutOfRange { key: CriterionKey, weight: f64 },

    #[error("Criterion weights must sum to 1.0, got {sum:.6}")]
    BadSum { sum: f64 },
}

/// Weights for all ten criteria; always sums to 1.0 within tolerance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightTable {
    weights: BTreeMap<CriterionKey, f64>,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            weights: CriterionKey::ALL
                .into_iter()
                .map(|k| (k, k.default_weight()))
                .collect(),
        }
    }
}

impl WeightTable {
    /// Equal weights across all criteria
    pub fn uniform() -> Self {
        let share = 1.0 / CriterionKey::ALL.len() as f64;
        Self {
            weights: CriterionKey::ALL.into_iter().map(|k| (k, share)).collect(),
        }
    }

    /// Merges caller-supplied overrides (keyed by criterion name) onto the defaults
    pub fn with_overrides<'a>(
        overrides: impl IntoIterator<Item = (&'a String, &'a f64)>,
    ) -> Result<Self, WeightError> {
        let mut table = Self::default();
        for (name, weight) in overrides {
            let key = CriterionKey::parse(name)
                .ok_or_else(|| WeightError::UnknownCriterion(name.clone()))?;
            table.weights.insert(key, *weight);
        }
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), WeightError> {
        for (key, weight) in &self.weights {
            if !weight.is_finite() || *weight < 0.0 || *weight > 1.0 {
                return Err(WeightError::OutOfRange {
                    key: *key,
                    weight: *weight,
                });
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightError::BadSum { sum });
        }
        Ok(())
    }

    pub fn weight(&self, key: CriterionKey) -> f64 {
        self.weights.get(&key).copied().unwrap_or(0.0)
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn criteria(&self) -> Vec<Criterion> {
        CriterionKey::ALL
            .into_iter()
            .map(|key| Criterion {
                key,
                weight: self.weight(key),
                display_description: key.description(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_weights_sum_to_one() {
        let table = WeightTable::default();
        assert!((table.sum() - 1.0).abs() < WEIGHT_SUM_TOLERANCE);
        assert!(table.validate().is_ok());
        assert_eq!(table.criteria().len(), 10);
    }

    #[test]
    fn test_uniform_weights_are_valid() {
        let table = WeightTable::uniform();
        assert!(table.validate().is_ok());
        assert!((table.weight(CriterionKey::AddedValue) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_overrides_that_keep_sum_are_accepted() {
        let overrides = HashMap::from([
            ("budget_compliance".to_string(), 0.20),
            ("added_value".to_string(), 0.0),
        ]);
        let table = WeightTable::with_overrides(&overrides).unwrap();
        assert_eq!(table.weight(CriterionKey::BudgetCompliance), 0.20);
        assert_eq!(table.weight(CriterionKey::AddedValue), 0.0);
    }

    #[test]
    fn test_overrides_with_bad_sum_are_rejected() {
        let overrides = HashMap::from([("budget_compliance".to_string(), 0.20)]);
        let err = WeightTable::with_overrides(&overrides).unwrap_err();
        assert!(matches!(err, WeightError::BadSum { .. }));
    }

    #[test]
    fn test_unknown_override_key_is_rejected() {
        let overrides = HashMap::from([("price".to_string(), 0.15)]);
        let err = WeightTable::with_overrides(&overrides).unwrap_err();
        assert_eq!(err, WeightError::UnknownCriterion("price".to_string()));
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let overrides = HashMap::from([
            ("budget_compliance".to_string(), -0.05),
            ("timeline_compliance".to_string(), 0.35),
        ]);
        let err = WeightTable::with_overrides(&overrides).unwrap_err();
        assert!(matches!(err, WeightError::OutOfRange { .. }));
    }

    #[test]
    fn test_criterion_key_parse_roundtrip() {
        for key in CriterionKey::ALL {
            assert_eq!(CriterionKey::parse(key.as_str()), Some(key));
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
        assert_eq!(CriterionKey::parse(" Budget_Compliance "), Some(CriterionKey::BudgetCompliance));
    }
}
