//! Criteria scoring engine
//!
//! Pure functions only: criterion outputs and a weight table go in, an
//! overall weighted score and risk level come out. Criteria that fail the
//! quality gate are kept with a sentinel score and a raised risk flag so the
//! result always carries all ten entries.

use crate::criteria::{CriterionKey, WeightTable};
use crate::output::{CriteriaScore, RiskLevel};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const DEGRADED_SCORE: u8 = 0;
pub const DEGRADED_JUSTIFICATION_PREFIX: &str = "Criterion could not be evaluated";
pub const DEFAULT_MIN_JUSTIFICATION_WORDS: usize = 30;

const LOW_RISK_THRESHOLD: u8 = 80;
const HIGH_RISK_THRESHOLD: u8 = 60;

/// Raw model output for one criterion, before validation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CriterionOutput {
    /// `None` when the model did not supply an integer
    pub score: Option<i64>,
    pub justification: String,
    pub risk_flag: bool,
}

impl CriterionOutput {
    pub fn new(score: i64, justification: impl Into<String>) -> Self {
        Self {
            score: Some(score),
            justification: justification.into(),
            risk_flag: false,
        }
    }

    pub fn with_risk_flag(mut self, risk_flag: bool) -> Self {
        self.risk_flag = risk_flag;
        self
    }

    /// Reads `{score, justification, risk_flag}` without coercing types
    pub fn from_value(value: &Value) -> Self {
        Self {
            score: value.get("score").and_then(Value::as_i64),
            justification: value
                .get("justification")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            risk_flag: value
                .get("risk_flag")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradeReason {
    Missing,
    ScoreNotInteger,
    ScoreOutOfRange(i64),
    JustificationTooShort { words: usize, min: usize },
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradeReason::Missing => write!(f, "no output was produced for this criterion"),
            DegradeReason::ScoreNotInteger => write!(f, "score is missing or not an integer"),
            DegradeReason::ScoreOutOfRange(score) => {
                write!(f, "score {} is outside the range 0-100", score)
            }
            DegradeReason::JustificationTooShort { words, min } => write!(
                f,
                "justification has {} words, at least {} are required",
                words, min
            ),
        }
    }
}

/// Validation applied to every criterion before it counts toward the score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityGate {
    pub min_justification_words: usize,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            min_justification_words: DEFAULT_MIN_JUSTIFICATION_WORDS,
        }
    }
}

impl QualityGate {
    pub fn new(min_justification_words: usize) -> Self {
        Self {
            min_justification_words,
        }
    }

    pub fn check(&self, output: Option<&CriterionOutput>) -> Result<u8, DegradeReason> {
        let output = output.ok_or(DegradeReason::Missing)?;
        let score = output.score.ok_or(DegradeReason::ScoreNotInteger)?;
        if !(0..=100).contains(&score) {
            return Err(DegradeReason::ScoreOutOfRange(score));
        }

        let words = output.justification.split_whitespace().count();
        if words < self.min_justification_words {
            return Err(DegradeReason::JustificationTooShort {
                words,
                min: self.min_justification_words,
            });
        }

        Ok(score as u8)
    }
}

/// Everything the scoring engine derives from one set of criterion outputs
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOutcome {
    pub criteria_scores: BTreeMap<CriterionKey, CriteriaScore>,
    pub degraded: BTreeSet<CriterionKey>,
    pub overall_weighted_score: u8,
    pub risk_level: RiskLevel,
}

impl ScoringOutcome {
    pub fn passed_count(&self) -> usize {
        self.criteria_scores.len() - self.degraded.len()
    }

    pub fn any_risk_flag(&self) -> bool {
        self.criteria_scores.values().any(|s| s.risk_flag)
    }
}

/// Gates every criterion, then computes the weighted score and risk level
pub fn score(
    outputs: &BTreeMap<CriterionKey, CriterionOutput>,
    weights: &WeightTable,
    gate: &QualityGate,
) -> ScoringOutcome {
    let mut criteria_scores = BTreeMap::new();
    let mut degraded = BTreeSet::new();

    for key in CriterionKey::ALL {
        let output = outputs.get(&key);
        let entry = match gate.check(output) {
            Ok(score) => CriteriaScore {
                criterion_key: key,
                score,
                justification: output
                    .map(|o| o.justification.trim().to_string())
                    .unwrap_or_default(),
                risk_flag: output.map(|o| o.risk_flag).unwrap_or(false),
                degraded: false,
            },
            Err(reason) => {
                degraded.insert(key);
                degraded_score(key, &reason)
            }
        };
        criteria_scores.insert(key, entry);
    }

    let overall_weighted_score =
        weighted_score(criteria_scores.values().map(|s| (s.criterion_key, s.score)), weights);
    let any_flag = criteria_scores.values().any(|s| s.risk_flag);

    ScoringOutcome {
        criteria_scores,
        degraded,
        overall_weighted_score,
        risk_level: risk_level(overall_weighted_score, any_flag),
    }
}

/// Sentinel entry for a criterion that did not pass the quality gate
pub fn degraded_score(key: CriterionKey, reason: &DegradeReason) -> CriteriaScore {
    CriteriaScore {
        criterion_key: key,
        score: DEGRADED_SCORE,
        justification: format!("{}: {}", DEGRADED_JUSTIFICATION_PREFIX, reason),
        risk_flag: true,
        degraded: true,
    }
}

/// Weights are summed in millionths so exact halves round up
const WEIGHT_SCALE: u64 = 1_000_000;

/// `round(sum(score_i * weight_i))` with halves rounded up, clamped to 0..=100
pub fn weighted_score(
    scores: impl IntoIterator<Item = (CriterionKey, u8)>,
    weights: &WeightTable,
) -> u8 {
    let total: u64 = scores
        .into_iter()
        .map(|(key, score)| u64::from(score) * scaled_weight(weights.weight(key)))
        .sum();
    ((total + WEIGHT_SCALE / 2) / WEIGHT_SCALE).min(100) as u8
}

fn scaled_weight(weight: f64) -> u64 {
    (weight.clamp(0.0, 1.0) * WEIGHT_SCALE as f64).round() as u64
}

pub fn risk_level(overall_score: u8, any_risk_flag: bool) -> RiskLevel {
    if overall_score < HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if overall_score >= LOW_RISK_THRESHOLD && !any_risk_flag {
        RiskLevel::Low
    } else {
        RiskLevel::Medium
    }
}
