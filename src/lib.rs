//! proposal-analyzer - LLM-driven compliance scoring of commercial proposals
//!
//! A technical specification (TZ) and one or more commercial proposals (KP)
//! go through a four-stage LLM pipeline. Each stage is a structured request
//! whose JSON answer is validated before the next stage builds on it. The
//! final report scores every proposal against ten weighted criteria.
//!
//! # Core Concepts
//!
//! - **Gateway**: the single path to LLM providers, with a shared concurrency
//!   cap, transport retries and optional provider fallback
//! - **Stages**: structure analysis and final synthesis are mandatory;
//!   technical/commercial analysis and risk assessment may degrade
//! - **Sessions**: one pipeline run with a status, monotonic progress and a
//!   cancellation token
//! - **Scoring**: pure weighted scoring behind a quality gate
//!
//! # Example Usage
//!
//! ```ignore
//! use proposal_analyzer::{AnalysisRequest, AnalyzerConfig, PipelineOrchestrator, PromptRegistry};
//!
//! async fn evaluate(tz: String, kp: String) -> anyhow::Result<()> {
//!     let config = AnalyzerConfig::default();
//!     let orchestrator = PipelineOrchestrator::new(
//!         config.create_gateway()?,
//!         PromptRegistry::default(),
//!         config.to_pipeline_config(),
//!     );
//!
//!     let result = orchestrator.analyze(&AnalysisRequest::new(tz, vec![kp])).await?;
//!     println!("{} ({})", result.overall_weighted_score, result.risk_level);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod criteria;
pub mod error;
pub mod llm;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod scoring;
pub mod util;

// Re-export key types for convenient access
pub use config::{AnalyzerConfig, ConfigError};
pub use criteria::{CriterionKey, WeightTable};
pub use error::{AnalysisError, BackendError, ErrorCode, GatewayError};
pub use llm::{GatewayConfig, LLMClient, LlmGateway};
pub use output::{AnalysisResult, AnalysisStatus, CriteriaScore, RiskLevel};
pub use pipeline::{
    AnalysisRequest, AnalysisRun, AnalysisSession, PipelineOrchestrator, SessionStatus, Stage,
};
pub use progress::{ProgressBroadcaster, ProgressEvent, ProgressHandler};
pub use prompts::PromptRegistry;
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
