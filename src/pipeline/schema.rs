//! Expected response shape of every stage
//!
//! A response is either accepted as-is or rejected with a `SchemaViolation`;
//! it is never patched up. The only leniency is unwrapping a markdown code
//! fence around the JSON body.

use super::stage::Stage;
use serde::de::IgnoredAny;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    String,
    StringArray,
    Array,
    Object,
    Number { min: Option<f64>, max: Option<f64> },
}

impl FieldKind {
    fn describe(&self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::StringArray => "an array of strings",
            FieldKind::Array => "an array",
            FieldKind::Object => "an object",
            FieldKind::Number { .. } => "a number",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

const PERCENT: FieldKind = FieldKind::Number {
    min: Some(0.0),
    max: Some(100.0),
};
const ANY_NUMBER: FieldKind = FieldKind::Number {
    min: None,
    max: None,
};

const STRUCTURE_FIELDS: &[FieldSpec] = &[
    field("tz_summary", FieldKind::String),
    field("requirements", FieldKind::Array),
    field("proposals", FieldKind::Array),
];

const TECHNICAL_COMMERCIAL_FIELDS: &[FieldSpec] = &[
    field("technical_findings", FieldKind::StringArray),
    field("commercial_findings", FieldKind::StringArray),
    field("coverage_percent", PERCENT),
    field("budget_deviation_percent", ANY_NUMBER),
    field("timeline_deviation_percent", ANY_NUMBER),
];

const RISK_FIELDS: &[FieldSpec] = &[
    field("risks", FieldKind::Array),
    field("flagged_criteria", FieldKind::StringArray),
];

const SYNTHESIS_FIELDS: &[FieldSpec] = &[
    field("criteria", FieldKind::Object),
    field("executive_summary", FieldKind::String),
    field("recommendations", FieldKind::StringArray),
];

pub fn required_fields(stage: Stage) -> &'static [FieldSpec] {
    match stage {
        Stage::StructureAnalysis => STRUCTURE_FIELDS,
        Stage::TechnicalCommercialAnalysis => TECHNICAL_COMMERCIAL_FIELDS,
        Stage::RiskAssessment => RISK_FIELDS,
        Stage::FinalSynthesis => SYNTHESIS_FIELDS,
    }
}

pub fn required_keys(stage: Stage) -> Vec<&'static str> {
    required_fields(stage).iter().map(|f| f.name).collect()
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaViolation {
    #[error("response is not valid JSON: {0}")]
    NotJson(String),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("required field '{0}' is missing")]
    MissingField(&'static str),

    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field '{field}' is {value}, expected a value within [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Strips a surrounding markdown code fence, if any
///
/// Content that already parses as JSON is returned as is, so backticks inside
/// string values are never mistaken for a fence.
pub fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    if serde_json::from_str::<IgnoredAny>(trimmed).is_ok() {
        return trimmed;
    }

    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after_fence = &trimmed[start + 3..];
    let body = after_fence.strip_prefix("json").unwrap_or(after_fence);

    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => trimmed,
    }
}

/// Parses a raw model answer and checks it against the stage's schema
pub fn parse_stage_response(stage: Stage, raw: &str) -> Result<Map<String, Value>, SchemaViolation> {
    let value: Value = serde_json::from_str(extract_json(raw))
        .map_err(|e| SchemaViolation::NotJson(e.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(SchemaViolation::NotAnObject);
    };

    for spec in required_fields(stage) {
        let value = fields
            .get(spec.name)
            .ok_or(SchemaViolation::MissingField(spec.name))?;
        check_field(spec, value)?;
    }

    Ok(fields)
}

fn check_field(spec: &FieldSpec, value: &Value) -> Result<(), SchemaViolation> {
    let wrong_type = || SchemaViolation::WrongType {
        field: spec.name,
        expected: spec.kind.describe(),
    };

    match spec.kind {
        FieldKind::String => {
            value.as_str().ok_or_else(wrong_type)?;
        }
        FieldKind::Array => {
            value.as_array().ok_or_else(wrong_type)?;
        }
        FieldKind::StringArray => {
            let items = value.as_array().ok_or_else(wrong_type)?;
            if !items.iter().all(Value::is_string) {
                return Err(wrong_type());
            }
        }
        FieldKind::Object => {
            value.as_object().ok_or_else(wrong_type)?;
        }
        FieldKind::Number { min, max } => {
            let number = value.as_f64().ok_or_else(wrong_type)?;
            let lo = min.unwrap_or(f64::NEG_INFINITY);
            let hi = max.unwrap_or(f64::INFINITY);
            if number < lo || number > hi {
                return Err(SchemaViolation::OutOfRange {
                    field: spec.name,
                    value: number,
                    min: lo,
                    max: hi,
                });
            }
        }
    }
    Ok(())
}
