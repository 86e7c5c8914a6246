//! Prompt template registry
//!
//! One template per pipeline stage and one instruction per criterion.
//! Lookups and rendering are pure; the registry holds no mutable state.

mod templates;

use crate::criteria::{CriterionKey, WeightTable};
use crate::pipeline::Stage;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

pub use templates::{STRICT_SCHEMA_SUFFIX, SYSTEM_PROMPT};

pub const PROMPT_TEMPLATE_VERSION: &str = "2024.2";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("Template for {stage} references {{{placeholder}}} but no value was supplied")]
    MissingValue { stage: Stage, placeholder: String },

    #[error("Template for {stage} has an unterminated placeholder at byte {offset}")]
    Unterminated { stage: Stage, offset: usize },
}

/// Parameterised prompt for one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTemplate {
    pub system: String,
    pub user: String,
}

impl StageTemplate {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Placeholder names referenced by the user template, in order of appearance
    pub fn placeholders(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut rest = self.user.as_str();
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            match placeholder_name(after) {
                Some(name) => {
                    if !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                    rest = &after[name.len() + 1..];
                }
                None => rest = after,
            }
        }
        names
    }
}

/// Scoring instruction for one criterion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionTemplate {
    pub key: CriterionKey,
    pub instruction: String,
}

/// A fully rendered prompt, ready for the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Values substituted into a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext {
    values: HashMap<String, String>,
}

impl PromptContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct PromptRegistry {
    stages: BTreeMap<Stage, StageTemplate>,
    criteria: BTreeMap<CriterionKey, CriterionTemplate>,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        let stages = Stage::ALL
            .into_iter()
            .map(|stage| {
                let user = match stage {
                    Stage::StructureAnalysis => templates::STRUCTURE_ANALYSIS,
                    Stage::TechnicalCommercialAnalysis => templates::TECHNICAL_COMMERCIAL_ANALYSIS,
                    Stage::RiskAssessment => templates::RISK_ASSESSMENT,
                    Stage::FinalSynthesis => templates::FINAL_SYNTHESIS,
                };
                (stage, StageTemplate::new(SYSTEM_PROMPT, user))
            })
            .collect();

        let criteria = CriterionKey::ALL
            .into_iter()
            .map(|key| {
                let instruction = match key {
                    CriterionKey::BudgetCompliance => templates::BUDGET_COMPLIANCE,
                    CriterionKey::TimelineCompliance => templates::TIMELINE_COMPLIANCE,
                    CriterionKey::TechnicalCompliance => templates::TECHNICAL_COMPLIANCE,
                    CriterionKey::TeamExpertise => templates::TEAM_EXPERTISE,
                    CriterionKey::FunctionalCoverage => templates::FUNCTIONAL_COVERAGE,
                    CriterionKey::QualityAssurance => templates::QUALITY_ASSURANCE,
                    CriterionKey::Methodology => templates::METHODOLOGY,
                    CriterionKey::Scalability => templates::SCALABILITY,
                    CriterionKey::Communication => templates::COMMUNICATION,
                    CriterionKey::AddedValue => templates::ADDED_VALUE,
                };
                (
                    key,
                    CriterionTemplate {
                        key,
                        instruction: instruction.to_string(),
                    },
                )
            })
            .collect();

        Self { stages, criteria }
    }
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the built-in template for one stage
    pub fn with_stage_template(mut self, stage: Stage, template: StageTemplate) -> Self {
        self.stages.insert(stage, template);
        self
    }

    pub fn stage_template(&self, stage: Stage) -> &StageTemplate {
        // every stage is populated by Default and never removed
        &self.stages[&stage]
    }

    pub fn criterion_template(&self, key: CriterionKey) -> &CriterionTemplate {
        &self.criteria[&key]
    }

    pub fn render(&self, stage: Stage, context: &PromptContext) -> Result<RenderedPrompt, PromptError> {
        let template = self.stage_template(stage);
        Ok(RenderedPrompt {
            system: template.system.clone(),
            user: substitute(stage, &template.user, context)?,
        })
    }

    /// One line per criterion, with its weight, for the synthesis prompt
    pub fn criteria_instructions(&self, weights: &WeightTable) -> String {
        self.criteria
            .values()
            .map(|t| {
                format!(
                    "- {} (weight {:.0}%): {}",
                    t.key,
                    weights.weight(t.key) * 100.0,
                    t.instruction
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Appends the strict-schema instruction used for the single content retry
    pub fn strict_retry(&self, prompt: &str, required_keys: &[&str]) -> String {
        let suffix = STRICT_SCHEMA_SUFFIX.replace("{required_keys}", &required_keys.join(", "));
        format!("{}{}", prompt, suffix)
    }
}

/// Labels proposals `KP #1..n` so the model can refer to them
pub fn format_proposals(kp_texts: &[String]) -> String {
    kp_texts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("KP #{}:\n<<<\n{}\n>>>", i + 1, text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn placeholder_name(after_brace: &str) -> Option<&str> {
    let end = after_brace.find('}')?;
    let name = &after_brace[..end];
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    valid.then_some(name)
}

fn substitute(stage: Stage, template: &str, context: &PromptContext) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut consumed = 0;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        match placeholder_name(after) {
            Some(name) => {
                let value = context.get(name).ok_or_else(|| PromptError::MissingValue {
                    stage,
                    placeholder: name.to_string(),
                })?;
                out.push_str(value);
                let skip = open + 1 + name.len() + 1;
                consumed += skip;
                rest = &rest[skip..];
            }
            None => {
                if after.trim_start().is_empty() {
                    return Err(PromptError::Unterminated {
                        stage,
                        offset: consumed + open,
                    });
                }
                out.push('{');
                consumed += open + 1;
                rest = after;
            }
        }
    }

    out.push_str(rest);
    Ok(out)
}
