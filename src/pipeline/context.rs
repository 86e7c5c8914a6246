//! Parsed output accumulated across the stages of one session

use super::stage::Stage;
use crate::criteria::CriterionKey;
use crate::scoring::CriterionOutput;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// What later stages are allowed to see
///
/// Only the parsed fields of successful stages are kept; raw model text
/// never flows forward, which keeps prompts bounded in size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageContext {
    parsed: BTreeMap<Stage, Map<String, Value>>,
    unavailable: BTreeSet<Stage>,
}

impl StageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, stage: Stage, fields: Map<String, Value>) {
        self.unavailable.remove(&stage);
        self.parsed.insert(stage, fields);
    }

    pub fn record_unavailable(&mut self, stage: Stage) {
        self.parsed.remove(&stage);
        self.unavailable.insert(stage);
    }

    pub fn fields(&self, stage: Stage) -> Option<&Map<String, Value>> {
        self.parsed.get(&stage)
    }

    pub fn unavailable(&self) -> &BTreeSet<Stage> {
        &self.unavailable
    }

    /// JSON object keyed by stage name, in stage order
    pub fn prior_results_json(&self) -> String {
        let object: Map<String, Value> = self
            .parsed
            .iter()
            .map(|(stage, fields)| (stage.as_str().to_string(), Value::Object(fields.clone())))
            .collect();
        serde_json::to_string_pretty(&Value::Object(object)).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn unavailable_list(&self) -> String {
        if self.unavailable.is_empty() {
            return "none".to_string();
        }
        self.unavailable
            .iter()
            .map(Stage::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Criteria the risk stage named as carrying a material risk
    pub fn flagged_criteria(&self) -> BTreeSet<CriterionKey> {
        self.parsed
            .get(&Stage::RiskAssessment)
            .and_then(|fields| fields.get("flagged_criteria"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(CriterionKey::parse)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Per-criterion outputs of the synthesis stage; unknown keys are ignored
    pub fn criteria_outputs(&self) -> BTreeMap<CriterionKey, CriterionOutput> {
        let Some(criteria) = self
            .parsed
            .get(&Stage::FinalSynthesis)
            .and_then(|fields| fields.get("criteria"))
            .and_then(Value::as_object)
        else {
            return BTreeMap::new();
        };

        criteria
            .iter()
            .filter_map(|(name, value)| {
                CriterionKey::parse(name).map(|key| (key, CriterionOutput::from_value(value)))
            })
            .collect()
    }

    pub fn executive_summary(&self) -> String {
        self.synthesis_field("executive_summary")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    pub fn recommendations(&self) -> Vec<String> {
        self.synthesis_field("recommendations")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn synthesis_field(&self, name: &str) -> Option<&Value> {
        self.parsed.get(&Stage::FinalSynthesis)?.get(name)
    }
}
