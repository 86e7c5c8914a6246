//! Report payload shapes produced by the analysis pipeline

pub mod schema;

pub use schema::{AnalysisResult, AnalysisStatus, CriteriaScore, RiskLevel};
