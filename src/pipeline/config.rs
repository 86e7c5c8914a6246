use super::stage::Stage;
use crate::scoring::QualityGate;
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    stage_timeouts: BTreeMap<Stage, Duration>,
    pub quality_gate: QualityGate,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeouts: Stage::ALL
                .into_iter()
                .map(|stage| (stage, stage.default_timeout()))
                .collect(),
            quality_gate: QualityGate::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage_timeout(mut self, stage: Stage, timeout: Duration) -> Self {
        self.stage_timeouts.insert(stage, timeout);
        self
    }

    /// Same timeout for every stage
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        for stage in Stage::ALL {
            self.stage_timeouts.insert(stage, timeout);
        }
        self
    }

    pub fn with_min_justification_words(mut self, words: usize) -> Self {
        self.quality_gate = QualityGate::new(words);
        self
    }

    pub fn timeout_for(&self, stage: Stage) -> Duration {
        self.stage_timeouts
            .get(&stage)
            .copied()
            .unwrap_or_else(|| stage.default_timeout())
    }
}
