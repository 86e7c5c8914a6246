use super::assembler::ResultAssembler;
use super::config::PipelineConfig;
use super::context::StageContext;
use super::request::AnalysisRequest;
use super::schema::{parse_stage_response, required_keys};
use super::session::{AnalysisSession, SessionStatus};
use super::stage::{Stage, StageResult};
use crate::criteria::{CriterionKey, WeightTable};
use crate::error::{AnalysisError, GatewayError};
use crate::llm::{GatewayRequest, LlmGateway};
use crate::output::AnalysisResult;
use crate::progress::{ProgressEvent, ProgressHandler, ProgressKind};
use crate::prompts::{format_proposals, PromptContext, PromptRegistry};
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// First attempt plus one strict-schema retry
const CONTENT_ATTEMPTS: u8 = 2;

/// Everything a finished session leaves behind
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub session: AnalysisSession,
    /// Every stage attempt in execution order, retries included
    pub stage_results: Vec<StageResult>,
    /// `None` only when the session was cancelled
    pub result: Option<AnalysisResult>,
    /// Error that stopped a mandatory stage
    pub error: Option<AnalysisError>,
}

impl AnalysisRun {
    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn is_cancelled(&self) -> bool {
        self.session.status() == SessionStatus::Cancelled
    }

    pub fn attempts_for(&self, stage: Stage) -> usize {
        self.stage_results
            .iter()
            .filter(|r| r.stage_name == stage)
            .count()
    }

    pub fn into_result(self) -> Result<AnalysisResult, AnalysisError> {
        self.result.ok_or(AnalysisError::Cancelled)
    }
}

pub struct PipelineOrchestrator {
    gateway: Arc<LlmGateway>,
    prompts: PromptRegistry,
    config: PipelineConfig,
    assembler: ResultAssembler,
    progress_handlers: Vec<Arc<dyn ProgressHandler>>,
}

impl PipelineOrchestrator {
    pub fn new(gateway: Arc<LlmGateway>, prompts: PromptRegistry, config: PipelineConfig) -> Self {
        let assembler = ResultAssembler::new(config.quality_gate);
        Self {
            gateway,
            prompts,
            config,
            assembler,
            progress_handlers: Vec::new(),
        }
    }

    pub fn with_progress_handler(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress_handlers.push(handler);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Validates the request and opens a session for it
    ///
    /// Invalid input is rejected here, before any session exists.
    pub fn start(&self, request: &AnalysisRequest) -> Result<AnalysisSession, AnalysisError> {
        request.validate()?;
        let session = AnalysisSession::new();
        info!(
            session_id = %session.id,
            kp_count = request.kp_texts.len(),
            "Analysis session created"
        );
        Ok(session)
    }

    /// Validates, runs to completion and returns the result
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let session = self.start(request)?;
        self.run(session, request).await?.into_result()
    }

    /// Runs a session on its own task
    pub fn spawn(
        self: &Arc<Self>,
        session: AnalysisSession,
        request: AnalysisRequest,
    ) -> JoinHandle<Result<AnalysisRun, AnalysisError>> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.run(session, &request).await })
    }

    /// Drives a pending session through every stage
    ///
    /// Only fails for a request that no longer validates or a session that
    /// was already started; every stage outcome is reported inside the run.
    pub async fn run(
        &self,
        mut session: AnalysisSession,
        request: &AnalysisRequest,
    ) -> Result<AnalysisRun, AnalysisError> {
        let weights = request.validate()?;
        session.ensure_pending()?;

        let start = Instant::now();
        let mut context = StageContext::new();
        let mut stage_results = Vec::new();

        info!(session_id = %session.id, "Starting analysis pipeline");

        for stage in Stage::ALL {
            if session.is_cancel_requested() {
                return self.cancelled(session, stage_results);
            }

            session.begin_stage(stage)?;
            info!(session_id = %session.id, stage = %stage, "Stage started");
            self.publish(
                &session,
                ProgressKind::StageStarted,
                format!("Starting {}", stage.display_name()),
            );

            let stage_start = Instant::now();
            let outcome = self
                .run_stage(&mut session, stage, request, &weights, &context, &mut stage_results)
                .await;

            if session.is_cancel_requested() {
                debug!(session_id = %session.id, stage = %stage, "Discarding result of cancelled session");
                return self.cancelled(session, stage_results);
            }

            let (_, end) = stage.progress_range();
            match outcome {
                Ok(fields) => {
                    context.record_success(stage, fields);
                    session.advance_progress(end);
                    info!(
                        session_id = %session.id,
                        stage = %stage,
                        duration_ms = stage_start.elapsed().as_millis() as u64,
                        "Stage complete"
                    );
                    self.publish(
                        &session,
                        ProgressKind::StageCompleted,
                        format!("Completed {}", stage.display_name()),
                    );
                }
                Err(error) if !stage.is_mandatory() => {
                    context.record_unavailable(stage);
                    session.advance_progress(end);
                    warn!(
                        session_id = %session.id,
                        stage = %stage,
                        code = %error.code(),
                        error = %error,
                        "Stage degraded, continuing without it"
                    );
                    self.publish(
                        &session,
                        ProgressKind::StageDegraded,
                        format!("{} unavailable: {}", stage.display_name(), error),
                    );
                }
                Err(error) => {
                    warn!(
                        session_id = %session.id,
                        stage = %stage,
                        code = %error.code(),
                        error = %error,
                        "Mandatory stage failed"
                    );
                    self.publish(
                        &session,
                        ProgressKind::StageFailed,
                        format!("{} failed: {}", stage.display_name(), error),
                    );

                    session.fail()?;
                    self.publish(
                        &session,
                        ProgressKind::SessionFailed,
                        format!("Analysis failed during {}", stage.display_name()),
                    );

                    return Ok(AnalysisRun {
                        result: Some(self.assembler.failed(&context, stage)),
                        session,
                        stage_results,
                        error: Some(error),
                    });
                }
            }
        }

        let result = self.assembler.assemble(&context, &weights);
        session.complete()?;

        info!(
            session_id = %session.id,
            status = %result.status,
            score = result.overall_weighted_score,
            risk = %result.risk_level,
            duration_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );
        self.publish(
            &session,
            ProgressKind::SessionCompleted,
            format!(
                "Analysis {}: score {}, risk {}",
                result.status, result.overall_weighted_score, result.risk_level
            ),
        );

        Ok(AnalysisRun {
            session,
            stage_results,
            result: Some(result),
            error: None,
        })
    }

    /// One stage: render, call, validate, and at most one strict retry
    async fn run_stage(
        &self,
        session: &mut AnalysisSession,
        stage: Stage,
        request: &AnalysisRequest,
        weights: &WeightTable,
        context: &StageContext,
        stage_results: &mut Vec<StageResult>,
    ) -> Result<Map<String, Value>, AnalysisError> {
        let prompt = match self
            .prompts
            .render(stage, &self.prompt_context(stage, request, weights, context))
        {
            Ok(prompt) => prompt,
            Err(e) => {
                stage_results.push(StageResult::failure(stage, 1, "", e.to_string()));
                return Err(e.into());
            }
        };

        let mut user_prompt = prompt.user.clone();
        let mut last_error = None;

        for attempt in 1..=CONTENT_ATTEMPTS {
            let call = GatewayRequest::new(
                format!("{}/{}", session.id, stage),
                prompt.system.clone(),
                user_prompt.clone(),
            )
            .with_timeout(self.config.timeout_for(stage))
            .with_provider_hint(request.provider_hint.clone());

            let error = match self.gateway.complete(&call).await {
                Ok(response) => match parse_stage_response(stage, &response.content) {
                    Ok(fields) => {
                        debug!(
                            session_id = %session.id,
                            stage = %stage,
                            attempt,
                            provider = %response.provider,
                            "Stage response accepted"
                        );
                        stage_results.push(StageResult::success(
                            stage,
                            attempt,
                            response.content,
                            fields.clone(),
                        ));
                        return Ok(fields);
                    }
                    Err(violation) => {
                        stage_results.push(StageResult::failure(
                            stage,
                            attempt,
                            response.content,
                            violation.to_string(),
                        ));
                        GatewayError::InvalidResponse {
                            provider: response.provider,
                            message: violation.to_string(),
                        }
                    }
                },
                Err(e) => {
                    stage_results.push(StageResult::failure(stage, attempt, "", e.to_string()));
                    if !e.is_content_failure() {
                        return Err(e.into());
                    }
                    e
                }
            };

            last_error = Some(error);

            if attempt < CONTENT_ATTEMPTS {
                if session.is_cancel_requested() {
                    return Err(AnalysisError::Cancelled);
                }
                warn!(
                    session_id = %session.id,
                    stage = %stage,
                    attempt,
                    "Unusable stage response, retrying with strict schema instruction"
                );
                user_prompt = self.prompts.strict_retry(&prompt.user, &required_keys(stage));

                // one point past the stage start keeps the idempotency key distinct
                let retry_percent = session.progress_percent() + 1;
                session.advance_progress(retry_percent);
                self.publish(
                    session,
                    ProgressKind::StageRetrying,
                    format!("Retrying {} with strict schema", stage.display_name()),
                );
            }
        }

        Err(last_error
            .map(AnalysisError::from)
            .unwrap_or(AnalysisError::Cancelled))
    }

    fn prompt_context(
        &self,
        stage: Stage,
        request: &AnalysisRequest,
        weights: &WeightTable,
        context: &StageContext,
    ) -> PromptContext {
        match stage {
            Stage::StructureAnalysis => PromptContext::new()
                .with("tz_text", request.tz_text.trim())
                .with("kp_texts", format_proposals(&request.kp_texts))
                .with("kp_count", request.kp_texts.len().to_string()),
            Stage::TechnicalCommercialAnalysis | Stage::RiskAssessment | Stage::FinalSynthesis => {
                PromptContext::new()
                    .with("prior_results", context.prior_results_json())
                    .with("unavailable_stages", context.unavailable_list())
                    .with("criterion_keys", criterion_key_list())
                    .with("criteria_instructions", self.prompts.criteria_instructions(weights))
                    .with(
                        "min_justification_words",
                        self.config.quality_gate.min_justification_words.to_string(),
                    )
            }
        }
    }

    fn cancelled(
        &self,
        mut session: AnalysisSession,
        stage_results: Vec<StageResult>,
    ) -> Result<AnalysisRun, AnalysisError> {
        session.mark_cancelled()?;
        info!(
            session_id = %session.id,
            progress = session.progress_percent(),
            "Analysis cancelled"
        );
        self.publish(&session, ProgressKind::SessionCancelled, "Analysis cancelled".to_string());

        Ok(AnalysisRun {
            session,
            stage_results,
            result: None,
            error: None,
        })
    }

    fn publish(&self, session: &AnalysisSession, kind: ProgressKind, message: String) {
        let event = ProgressEvent {
            session_id: session.id,
            stage: session.status(),
            kind,
            progress_percent: session.progress_percent(),
            message,
            timestamp: Utc::now(),
        };
        for handler in &self.progress_handlers {
            handler.on_progress(&event);
        }
    }
}

fn criterion_key_list() -> String {
    CriterionKey::ALL
        .iter()
        .map(|k| format!("- {}", k))
        .collect::<Vec<_>>()
        .join("\n")
}

impl std::fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("gateway", &self.gateway)
            .field("config", &self.config)
            .field("progress_handlers", &self.progress_handlers.len())
            .finish()
    }
}
