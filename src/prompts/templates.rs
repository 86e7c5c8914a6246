//! Built-in prompt texts
//!
//! Placeholders are `{lower_snake}` names; JSON braces in the response
//! examples never match because they are followed by a quote or newline.

pub const SYSTEM_PROMPT: &str = "You are a senior procurement analyst who evaluates commercial proposals (KP) \
against a technical specification (TZ). You are precise, you cite concrete figures from the documents, \
and you never invent facts that are not present in the input. You always answer with a single JSON object \
and nothing else.";

pub const STRUCTURE_ANALYSIS: &str = r#"Extract the structure of the technical specification (TZ) and of every commercial proposal (KP) below.

TECHNICAL SPECIFICATION (TZ):
<<<
{tz_text}
>>>

COMMERCIAL PROPOSALS ({kp_count}):
{kp_texts}

Instructions:
- Summarise the TZ in a few sentences, including budget, deadline and scope when they are stated.
- List every distinct requirement of the TZ, with any numeric limits (budget, duration, volumes) copied exactly.
- For every KP list what it offers: price, duration, team, technologies, deliverables and guarantees.
- Do NOT evaluate or score anything yet.

RESPONSE FORMAT (JSON):
{
  "tz_summary": "string",
  "requirements": [{"id": "R1", "text": "string", "category": "budget|timeline|technical|functional|team|quality|other"}],
  "proposals": [{"label": "KP #1", "price": "string", "duration": "string", "offer": ["string"]}]
}
"#;

pub const TECHNICAL_COMMERCIAL_ANALYSIS: &str = r#"Compare the proposals against the specification using the structured extraction below.

PRIOR ANALYSIS (JSON):
{prior_results}

Unavailable stages: {unavailable_stages}

Instructions:
- For each requirement decide whether the proposals cover it fully, partially or not at all.
- Compare the proposed price with the TZ budget and the proposed duration with the TZ deadline.
- Deviations are percentages relative to the TZ value: positive means over budget or later than required.
- Use 0 for a deviation only when the documents show no deviation.

RESPONSE FORMAT (JSON):
{
  "technical_findings": ["string"],
  "commercial_findings": ["string"],
  "coverage_percent": 0,
  "budget_deviation_percent": 0,
  "timeline_deviation_percent": 0
}
"#;

pub const RISK_ASSESSMENT: &str = r#"Assess the delivery risks of the proposals using the analysis so far.

PRIOR ANALYSIS (JSON):
{prior_results}

Unavailable stages: {unavailable_stages}

Instructions:
- Identify concrete risks (budget overrun, schedule slip, missing expertise, unclear scope, vendor lock-in and so on).
- Rate every risk as low, medium or high and state what mitigates it.
- List in "flagged_criteria" the evaluation criteria that carry a material risk. Use only these keys:
{criterion_keys}

RESPONSE FORMAT (JSON):
{
  "risks": [{"description": "string", "severity": "low|medium|high", "mitigation": "string"}],
  "flagged_criteria": ["criterion_key"]
}
"#;

pub const FINAL_SYNTHESIS: &str = r#"Produce the final evaluation of the proposals against the specification.

PRIOR ANALYSIS (JSON):
{prior_results}

Unavailable stages: {unavailable_stages}

Score EVERY criterion below with an integer from 0 to 100 and a justification of at least {min_justification_words} words that cites evidence from the documents. Set "risk_flag" to true when the criterion carries a material risk.

CRITERIA:
{criteria_instructions}

RESPONSE FORMAT (JSON):
{
  "criteria": {
    "criterion_key": {"score": 0, "justification": "string", "risk_flag": false}
  },
  "executive_summary": "string",
  "recommendations": ["string"]
}
"#;

pub const STRICT_SCHEMA_SUFFIX: &str = r#"

IMPORTANT: Your previous answer could not be parsed. Respond with ONE valid JSON object that matches the RESPONSE FORMAT exactly.
Do not add markdown fences, comments or any text before or after the JSON. Every one of these top-level keys is required: {required_keys}"#;

pub const BUDGET_COMPLIANCE: &str =
    "Does the proposed price fit the TZ budget? 100 means at or below budget, every 10% overrun should cost roughly 20 points.";
pub const TIMELINE_COMPLIANCE: &str =
    "Does the proposed schedule meet the TZ deadline? 100 means on time or earlier, penalise every month of delay heavily.";
pub const TECHNICAL_COMPLIANCE: &str =
    "Does the proposed technology stack and architecture satisfy the technical requirements of the TZ?";
pub const TEAM_EXPERTISE: &str =
    "Is the proposed team qualified and large enough, with relevant experience in similar projects?";
pub const FUNCTIONAL_COVERAGE: &str =
    "Which share of the functional requirements does the proposal cover completely?";
pub const QUALITY_ASSURANCE: &str =
    "Are testing, acceptance, warranty and quality control processes described and adequate?";
pub const METHODOLOGY: &str =
    "Is the delivery methodology (phases, milestones, reporting) clear and suitable for the project?";
pub const SCALABILITY: &str =
    "Can the proposed solution grow in load, data volume and features without a redesign?";
pub const COMMUNICATION: &str =
    "Are communication channels, responsibilities and escalation paths with the customer defined?";
pub const ADDED_VALUE: &str =
    "What does the proposal offer beyond the TZ (support, training, extra features) that benefits the customer?";
