//! Multi-stage analysis pipeline
//!
//! Four stages run strictly in sequence per session; each sees only the
//! parsed output of the stages before it. Sessions are independent and may
//! run concurrently on a shared gateway.

pub mod assembler;
pub mod config;
pub mod context;
pub mod orchestrator;
pub mod request;
pub mod schema;
pub mod session;
pub mod stage;

pub use assembler::ResultAssembler;
pub use config::PipelineConfig;
pub use context::StageContext;
pub use orchestrator::{AnalysisRun, PipelineOrchestrator};
pub use request::AnalysisRequest;
pub use schema::{parse_stage_response, SchemaViolation};
pub use session::{AnalysisSession, SessionError, SessionStatus};
pub use stage::{Stage, StageResult};
