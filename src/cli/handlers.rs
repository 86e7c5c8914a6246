//! Command handlers
//!
//! Each handler returns the process exit code.

use super::commands::{AnalyzeArgs, CriteriaArgs};
use super::output::OutputFormatter;
use crate::config::AnalyzerConfig;
use crate::criteria::WeightTable;
use crate::error::AnalysisError;
use crate::output::AnalysisStatus;
use crate::pipeline::{AnalysisRequest, PipelineOrchestrator};
use crate::progress::LoggingHandler;
use crate::prompts::PromptRegistry;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Completed or partial report
pub const EXIT_SUCCESS: i32 = 0;
/// A mandatory stage failed
pub const EXIT_FAILED: i32 = 1;
/// Unreadable input, bad weights, bad configuration or rejected request
pub const EXIT_INVALID_INPUT: i32 = 2;
/// Interrupted with Ctrl-C
pub const EXIT_CANCELLED: i32 = 130;

pub async fn handle_analyze(args: &AnalyzeArgs, quiet: bool) -> i32 {
    match run_analyze(args, quiet).await {
        Ok(code) => code,
        Err(e) => {
            error!("Analysis could not start: {:#}", e);
            eprintln!("Error: {:#}", e);
            EXIT_INVALID_INPUT
        }
    }
}

pub fn handle_criteria(args: &CriteriaArgs) -> i32 {
    let formatter = OutputFormatter::new(args.format.into());

    let rendered = load_weights(args.weights.as_deref())
        .and_then(|weights| formatter.format_criteria(&weights));

    match rendered {
        Ok(output) => {
            println!("{}", output);
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_INVALID_INPUT
        }
    }
}

async fn run_analyze(args: &AnalyzeArgs, quiet: bool) -> Result<i32> {
    let request = build_request(args)?;

    let mut config = AnalyzerConfig::default();
    if let Some(provider) = args.provider {
        config = config.with_provider(provider, args.model.clone());
    } else if let Some(model) = &args.model {
        config.model = model.clone();
    }
    debug!("Effective configuration:\n{}", config);

    let gateway = config
        .create_gateway()
        .context("Failed to initialize the LLM gateway")?;
    let orchestrator = PipelineOrchestrator::new(
        gateway,
        PromptRegistry::default(),
        config.to_pipeline_config(),
    )
    .with_progress_handler(Arc::new(LoggingHandler));

    let formatter = OutputFormatter::new(args.format.into());

    let session = match orchestrator.start(&request) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e));
            return Ok(EXIT_INVALID_INPUT);
        }
    };
    let weights = request.validate()?;

    let token = session.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling analysis");
            token.cancel();
        }
    });

    let run = orchestrator.run(session, &request).await;
    interrupt.abort();

    let run = match run {
        Ok(run) => run,
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e));
            return Ok(EXIT_INVALID_INPUT);
        }
    };

    if let Some(e) = &run.error {
        eprintln!("{}", formatter.format_error(e));
    }

    let Some(result) = run.result else {
        eprintln!("{}", formatter.format_error(&AnalysisError::Cancelled));
        return Ok(EXIT_CANCELLED);
    };

    let rendered = formatter.format_result(&result, &weights)?;
    write_output(&rendered, args.output.as_deref())?;

    if let Some(path) = &args.output {
        if !quiet {
            eprintln!("Report written to {}", path.display());
        }
    }

    info!(
        status = %result.status,
        score = result.overall_weighted_score,
        risk = %result.risk_level,
        "Analysis finished"
    );

    Ok(match result.status {
        AnalysisStatus::Completed | AnalysisStatus::Partial => EXIT_SUCCESS,
        AnalysisStatus::Failed => EXIT_FAILED,
    })
}

fn build_request(args: &AnalyzeArgs) -> Result<AnalysisRequest> {
    let tz_text = read_document(&args.tz)?;
    let kp_texts = args
        .kp
        .iter()
        .map(|path| read_document(path))
        .collect::<Result<Vec<_>>>()?;

    let mut request = AnalysisRequest::new(tz_text, kp_texts);
    if let Some(weights) = &args.weights {
        request = request.with_weight_overrides(parse_weight_overrides(weights)?);
    }
    if let Some(hint) = &args.provider_hint {
        request = request.with_provider_hint(hint.clone());
    }
    Ok(request)
}

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Accepts inline JSON (`{"budget_compliance": 0.2, ...}`) or a path to a JSON file
fn parse_weight_overrides(value: &str) -> Result<BTreeMap<String, f64>> {
    let trimmed = value.trim();
    let json = if trimmed.starts_with('{') {
        trimmed.to_string()
    } else {
        read_document(Path::new(trimmed))?
    };
    serde_json::from_str(&json).context("Weight overrides must be a JSON object of criterion -> weight")
}

fn load_weights(value: Option<&str>) -> Result<WeightTable> {
    match value {
        Some(value) => {
            let overrides = parse_weight_overrides(value)?;
            Ok(WeightTable::with_overrides(&overrides)?)
        }
        None => Ok(WeightTable::default()),
    }
}

fn write_output(rendered: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, format!("{}\n", rendered))
            .with_context(|| format!("Failed to write output to {}", path.display())),
        None => {
            println!("{}", rendered);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::OutputFormatArg;
    use crate::criteria::CriterionKey;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn analyze_args(tz: PathBuf, kp: Vec<PathBuf>) -> AnalyzeArgs {
        AnalyzeArgs {
            tz,
            kp,
            weights: None,
            format: OutputFormatArg::Json,
            provider: None,
            model: None,
            provider_hint: None,
            output: None,
        }
    }

    #[test]
    fn test_inline_weight_overrides() {
        let overrides =
            parse_weight_overrides(r#"{"budget_compliance": 0.2, "scalability": 0.0}"#).unwrap();
        assert_eq!(overrides["budget_compliance"], 0.2);
        assert_eq!(overrides.len(), 2);
    }

    #[test]
    fn test_weight_overrides_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("weights.json");
        fs::write(&path, r#"{"communication": 0.05}"#).unwrap();

        let overrides = parse_weight_overrides(path.to_str().unwrap()).unwrap();
        assert_eq!(overrides["communication"], 0.05);
    }

    #[test]
    fn test_weight_overrides_reject_non_object() {
        assert!(parse_weight_overrides("{not json").is_err());
        assert!(parse_weight_overrides("/definitely/missing/weights.json").is_err());
    }

    #[test]
    fn test_load_weights() {
        let table = load_weights(None).unwrap();
        assert_eq!(table, WeightTable::default());

        let table =
            load_weights(Some(r#"{"budget_compliance": 0.2, "scalability": 0.0}"#)).unwrap();
        assert_eq!(table.weight(CriterionKey::BudgetCompliance), 0.2);
        assert_eq!(table.weight(CriterionKey::Scalability), 0.0);

        // 0.15 + 0.05 over budget makes the sum 1.05
        assert!(load_weights(Some(r#"{"budget_compliance": 0.2}"#)).is_err());
    }

    #[test]
    fn test_build_request_reads_every_proposal() {
        let dir = TempDir::new().unwrap();
        let tz = dir.path().join("tz.txt");
        let kp_a = dir.path().join("a.txt");
        let kp_b = dir.path().join("b.txt");
        fs::write(&tz, "Поставка серверного оборудования").unwrap();
        fs::write(&kp_a, "Offer A").unwrap();
        fs::write(&kp_b, "Offer B").unwrap();

        let mut args = analyze_args(tz, vec![kp_a, kp_b]);
        args.provider_hint = Some("openai".to_string());
        let request = build_request(&args).unwrap();

        assert_eq!(request.tz_text, "Поставка серверного оборудования");
        assert_eq!(request.kp_texts, vec!["Offer A", "Offer B"]);
        assert_eq!(request.provider_hint.as_deref(), Some("openai"));
    }

    #[test]
    fn test_missing_document_is_reported() {
        let args = analyze_args(PathBuf::from("/missing/tz.txt"), vec![PathBuf::from("/missing/kp.txt")]);
        let error = build_request(&args).unwrap_err();
        assert!(format!("{:#}", error).contains("/missing/tz.txt"));
    }

    #[tokio::test]
    async fn test_analyze_with_missing_files_exits_with_invalid_input() {
        let args = analyze_args(PathBuf::from("/missing/tz.txt"), vec![PathBuf::from("/missing/kp.txt")]);
        assert_eq!(handle_analyze(&args, true).await, EXIT_INVALID_INPUT);
    }

    #[test]
    fn test_criteria_exit_codes() {
        let args = CriteriaArgs {
            weights: None,
            format: OutputFormatArg::Json,
        };
        assert_eq!(handle_criteria(&args), EXIT_SUCCESS);

        let args = CriteriaArgs {
            weights: Some(r#"{"unknown_criterion": 1.0}"#.to_string()),
            format: OutputFormatArg::Human,
        };
        assert_eq!(handle_criteria(&args), EXIT_INVALID_INPUT);
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        write_output("{}", Some(&path)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
    }
}
