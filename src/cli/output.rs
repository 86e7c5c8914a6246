//! Output formatting for analysis results
//!
//! JSON output is the exact `AnalysisResult` payload; human output is a
//! compact report for terminals.

use crate::criteria::{WeightTable, WEIGHT_TABLE_VERSION};
use crate::error::AnalysisError;
use crate::output::{AnalysisResult, AnalysisStatus};
use anyhow::{Context, Result};
use serde_json::json;

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Justifications longer than this are cut in human output
const JUSTIFICATION_PREVIEW_CHARS: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_result(&self, result: &AnalysisResult, weights: &WeightTable) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result)
                .context("Failed to serialize analysis result to JSON"),
            OutputFormat::Human => Ok(self.format_result_human(result, weights)),
        }
    }

    pub fn format_criteria(&self, weights: &WeightTable) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let output = json!({
                    "version": WEIGHT_TABLE_VERSION,
                    "criteria": weights.criteria(),
                });
                serde_json::to_string_pretty(&output).context("Failed to serialize criteria to JSON")
            }
            OutputFormat::Human => Ok(self.format_criteria_human(weights)),
        }
    }

    pub fn format_error(&self, error: &AnalysisError) -> String {
        match self.format {
            OutputFormat::Json => json!({
                "error": error.code(),
                "message": error.to_string(),
            })
            .to_string(),
            OutputFormat::Human => format!("\u{2717} {}: {}", error.code(), error),
        }
    }

    fn format_result_human(&self, result: &AnalysisResult, weights: &WeightTable) -> String {
        let mut output = String::new();

        let header = match result.status {
            AnalysisStatus::Completed => "\u{2713} Proposal Analysis",
            AnalysisStatus::Partial => "\u{26A0} Proposal Analysis (Partial)",
            AnalysisStatus::Failed => "\u{2717} Proposal Analysis (Failed)",
        };
        output.push_str(header);
        output.push('\n');
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!(
            "Overall Score: {}/100\n",
            result.overall_weighted_score
        ));
        output.push_str(&format!("Risk Level:    {}\n", result.risk_level));
        output.push_str(&format!(
            "Confidence:    {} {}%\n\n",
            confidence_bar(result.confidence_level),
            result.confidence_level
        ));

        if !result.criteria_scores.is_empty() {
            output.push_str("Criteria:\n");
            let count = result.criteria_scores.len();
            for (i, (key, score)) in result.criteria_scores.iter().enumerate() {
                let connector = if i + 1 == count { "\u{2514}" } else { "\u{251C}" };
                let flag = if score.risk_flag { " \u{26A0}" } else { "" };
                output.push_str(&format!(
                    "{}\u{2500} {:<22} {:>3}  (weight {:>2.0}%){}\n",
                    connector,
                    key.as_str(),
                    score.score,
                    weights.weight(*key) * 100.0,
                    flag
                ));
                output.push_str(&format!(
                    "   {}\n",
                    preview(&score.justification, JUSTIFICATION_PREVIEW_CHARS)
                ));
            }
            output.push('\n');
        }

        if !result.failed_stages.is_empty() {
            let stages: Vec<&str> = result.failed_stages.iter().map(|s| s.as_str()).collect();
            output.push_str(&format!("Failed Stages: {}\n\n", stages.join(", ")));
        }

        if !result.executive_summary.is_empty() {
            output.push_str("Executive Summary:\n");
            output.push_str(&result.executive_summary);
            output.push_str("\n\n");
        }

        if !result.recommendations.is_empty() {
            output.push_str("Recommendations:\n");
            for (i, rec) in result.recommendations.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, rec));
            }
        }

        output
    }

    fn format_criteria_human(&self, weights: &WeightTable) -> String {
        let mut output = format!("Evaluation Criteria (weight table {})\n", WEIGHT_TABLE_VERSION);
        output.push_str(RULE);
        output.push_str("\n\n");

        for criterion in weights.criteria() {
            output.push_str(&format!(
                "{:<22} {:>5.1}%  {}\n",
                criterion.key.as_str(),
                criterion.weight * 100.0,
                criterion.display_description
            ));
        }
        output.push_str(&format!("\n{:<22} {:>5.1}%\n", "total", weights.sum() * 100.0));
        output
    }
}

fn confidence_bar(percent: u8) -> String {
    let filled = (usize::from(percent.min(100)) + 5) / 10;
    "\u{2588}".repeat(filled) + &"\u{2591}".repeat(10 - filled)
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
