use crate::criteria::WeightTable;
use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Input of one analysis: a TZ and the proposals evaluated against it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub tz_text: String,
    pub kp_texts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_overrides: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_hint: Option<String>,
}

impl AnalysisRequest {
    pub fn new(tz_text: impl Into<String>, kp_texts: Vec<String>) -> Self {
        Self {
            tz_text: tz_text.into(),
            kp_texts,
            weight_overrides: None,
            provider_hint: None,
        }
    }

    pub fn with_weight_overrides(mut self, overrides: BTreeMap<String, f64>) -> Self {
        self.weight_overrides = Some(overrides);
        self
    }

    pub fn with_provider_hint(mut self, hint: impl Into<String>) -> Self {
        self.provider_hint = Some(hint.into());
        self
    }

    /// Checks inputs and resolves the effective weight table
    ///
    /// Runs before any session exists, so a rejected request leaves no trace.
    pub fn validate(&self) -> Result<WeightTable, AnalysisError> {
        if self.tz_text.trim().is_empty() {
            return Err(AnalysisError::Validation(
                "tz_text must not be empty".to_string(),
            ));
        }

        if self.kp_texts.is_empty() {
            return Err(AnalysisError::Validation(
                "at least one kp_text is required".to_string(),
            ));
        }

        if let Some(index) = self.kp_texts.iter().position(|kp| kp.trim().is_empty()) {
            return Err(AnalysisError::Validation(format!(
                "kp_texts[{}] must not be empty",
                index
            )));
        }

        match &self.weight_overrides {
            Some(overrides) => WeightTable::with_overrides(overrides)
                .map_err(|e| AnalysisError::Validation(e.to_string())),
            None => Ok(WeightTable::default()),
        }
    }
}
