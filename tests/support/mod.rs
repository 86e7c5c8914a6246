//! Shared builders for pipeline integration tests

#![allow(dead_code)]

use proposal_analyzer::criteria::CriterionKey;
use proposal_analyzer::llm::{GatewayConfig, LlmGateway, MockLLMClient, MockResponse};
use proposal_analyzer::pipeline::{AnalysisRequest, PipelineConfig, PipelineOrchestrator};
use proposal_analyzer::progress::ProgressRecorder;
use proposal_analyzer::prompts::PromptRegistry;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const TZ_TEXT: &str = "Разработка веб-приложения для учёта заявок. \
    Бюджет: 1 000 000 руб. Срок: 3 месяца. Требования: авторизация, отчёты, REST API.";

pub const KP_TEXT: &str = "Предлагаем разработку веб-приложения на Rust и React. \
    Стоимость: 1 200 000 руб. Срок: 4 месяца. Команда: 4 разработчика, QA, менеджер.";

/// A justification comfortably above the 30-word floor
pub fn justification(topic: &str) -> String {
    format!(
        "The proposal addresses {} with concrete commitments. It names the responsible \
         team members, states the delivery dates, and describes how acceptance will be \
         checked against the specification. Some details remain vague and should be \
         confirmed in writing before the contract is signed.",
        topic
    )
}

pub fn request() -> AnalysisRequest {
    AnalysisRequest::new(TZ_TEXT, vec![KP_TEXT.to_string()])
}

pub fn uniform_weights() -> BTreeMap<String, f64> {
    CriterionKey::ALL
        .iter()
        .map(|k| (k.as_str().to_string(), 0.1))
        .collect()
}

pub fn structure_response() -> MockResponse {
    MockResponse::json(&json!({
        "tz_summary": "Web application for request tracking, 1,000,000 RUB, 3 months",
        "requirements": [
            {"id": "R1", "text": "Authorization"},
            {"id": "R2", "text": "Reports"},
            {"id": "R3", "text": "REST API"}
        ],
        "proposals": [
            {"label": "KP #1", "price": 1200000, "duration_months": 4}
        ]
    }))
}

pub fn technical_response(budget_deviation: f64, timeline_deviation: f64) -> MockResponse {
    MockResponse::json(&json!({
        "technical_findings": ["Stack matches the requested architecture"],
        "commercial_findings": ["Price exceeds the budget", "Schedule exceeds the deadline"],
        "coverage_percent": 100,
        "budget_deviation_percent": budget_deviation,
        "timeline_deviation_percent": timeline_deviation
    }))
}

pub fn risk_response(flagged: &[&str]) -> MockResponse {
    MockResponse::json(&json!({
        "risks": flagged
            .iter()
            .map(|k| json!({"criterion": k, "description": "Deviation from the specification"}))
            .collect::<Vec<_>>(),
        "flagged_criteria": flagged
    }))
}

pub fn criteria_object(scores: &BTreeMap<CriterionKey, i64>) -> Map<String, Value> {
    scores
        .iter()
        .map(|(key, score)| {
            (
                key.as_str().to_string(),
                json!({"score": score, "justification": justification(key.as_str())}),
            )
        })
        .collect()
}

pub fn uniform_scores(score: i64) -> BTreeMap<CriterionKey, i64> {
    CriterionKey::ALL.into_iter().map(|k| (k, score)).collect()
}

pub fn synthesis_response(criteria: Map<String, Value>) -> MockResponse {
    MockResponse::json(&json!({
        "criteria": criteria,
        "executive_summary": "The proposal covers the scope but exceeds budget and schedule.",
        "recommendations": ["Negotiate the price", "Request a shorter schedule"]
    }))
}

/// All four stage responses of a clean run
pub fn happy_path(scores: &BTreeMap<CriterionKey, i64>) -> Vec<MockResponse> {
    vec![
        structure_response(),
        technical_response(0.0, 0.0),
        risk_response(&[]),
        synthesis_response(criteria_object(scores)),
    ]
}

/// One body that satisfies every stage schema, for order-independent mocks
pub fn universal_response(score: i64) -> MockResponse {
    MockResponse::json(&json!({
        "tz_summary": "Summary",
        "requirements": [],
        "proposals": [],
        "technical_findings": [],
        "commercial_findings": [],
        "coverage_percent": 90,
        "budget_deviation_percent": 0,
        "timeline_deviation_percent": 0,
        "risks": [],
        "flagged_criteria": [],
        "criteria": criteria_object(&uniform_scores(score)),
        "executive_summary": "Acceptable proposal.",
        "recommendations": ["Proceed"]
    }))
}

pub fn gateway_config() -> GatewayConfig {
    GatewayConfig::default().with_backoff_base(Duration::from_millis(1))
}

pub fn gateway(client: Arc<MockLLMClient>) -> Arc<LlmGateway> {
    Arc::new(LlmGateway::new(client, gateway_config()))
}

pub fn orchestrator(gateway: Arc<LlmGateway>) -> (PipelineOrchestrator, Arc<ProgressRecorder>) {
    let recorder = Arc::new(ProgressRecorder::new());
    let orchestrator =
        PipelineOrchestrator::new(gateway, PromptRegistry::default(), PipelineConfig::default())
            .with_progress_handler(recorder.clone());
    (orchestrator, recorder)
}

pub fn scripted(responses: Vec<MockResponse>) -> Arc<MockLLMClient> {
    let client = Arc::new(MockLLMClient::new());
    client.add_responses(responses);
    client
}
