use clap::{Parser, Subcommand, ValueEnum};
use genai::adapter::AdapterKind;
use std::path::PathBuf;

/// LLM-driven evaluation of commercial proposals against a technical specification
#[derive(Parser, Debug)]
#[command(
    name = "proposal-analyzer",
    about = "LLM-driven evaluation of commercial proposals against a technical specification",
    version,
    author,
    long_about = "proposal-analyzer runs a staged LLM pipeline over a technical specification \
                  (TZ) and one or more commercial proposals (KP). Every proposal is scored \
                  against ten weighted criteria and summarised in a single report. Providers \
                  supported: Ollama, OpenAI, Anthropic, Gemini, xAI, Groq."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Increase verbosity (can be used multiple times)"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Analyze proposals against a technical specification",
        long_about = "Runs structure analysis, technical/commercial analysis, risk assessment \
                      and final synthesis, then prints the scored report.\n\n\
                      Examples:\n  \
                      proposal-analyzer analyze --tz tz.txt --kp offer.txt\n  \
                      proposal-analyzer analyze --tz tz.txt --kp a.txt --kp b.txt --format json\n  \
                      proposal-analyzer analyze --tz tz.txt --kp a.txt --weights weights.json\n  \
                      proposal-analyzer analyze --tz tz.txt --kp a.txt --provider ollama --model qwen2.5:14b"
    )]
    Analyze(AnalyzeArgs),

    #[command(
        about = "Show the evaluation criteria and their weights",
        long_about = "Prints the ten evaluation criteria with the effective weights, \
                      optionally after applying overrides.\n\n\
                      Examples:\n  \
                      proposal-analyzer criteria\n  \
                      proposal-analyzer criteria --weights '{\"budget_compliance\":0.2,\"scalability\":0.0}'"
    )]
    Criteria(CriteriaArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(long, value_name = "FILE", help = "Technical specification (TZ) text file")]
    pub tz: PathBuf,

    #[arg(
        long,
        value_name = "FILE",
        required = true,
        num_args = 1..,
        help = "Commercial proposal (KP) text file; repeat for several proposals"
    )]
    pub kp: Vec<PathBuf>,

    #[arg(
        short = 'w',
        long,
        value_name = "JSON|FILE",
        help = "Criterion weight overrides as inline JSON or a path to a JSON file"
    )]
    pub weights: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'p',
        long,
        value_parser = parse_adapter_kind,
        help = "LLM provider (overrides PROPOSAL_PROVIDER)"
    )]
    pub provider: Option<AdapterKind>,

    #[arg(
        short = 'm',
        long,
        value_name = "MODEL",
        help = "Model name to use (provider-specific, e.g., 'qwen2.5:14b' for Ollama)"
    )]
    pub model: Option<String>,

    #[arg(
        long,
        value_name = "NAME",
        help = "Preferred provider label passed through to the LLM gateway"
    )]
    pub provider_hint: Option<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct CriteriaArgs {
    #[arg(
        short = 'w',
        long,
        value_name = "JSON|FILE",
        help = "Criterion weight overrides as inline JSON or a path to a JSON file"
    )]
    pub weights: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_adapter_kind(s: &str) -> Result<AdapterKind, String> {
    crate::config::parse_provider(s).map_err(|_| {
        format!(
            "Invalid provider: {}. Valid options: ollama, openai, anthropic, gemini, xai, groq",
            s
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_analyze_args() {
        let args = CliArgs::parse_from([
            "proposal-analyzer",
            "analyze",
            "--tz",
            "tz.txt",
            "--kp",
            "kp.txt",
        ]);
        match args.command {
            Commands::Analyze(analyze) => {
                assert_eq!(analyze.tz, PathBuf::from("tz.txt"));
                assert_eq!(analyze.kp, vec![PathBuf::from("kp.txt")]);
                assert_eq!(analyze.format, OutputFormatArg::Human);
                assert!(analyze.provider.is_none());
                assert!(analyze.weights.is_none());
                assert!(analyze.output.is_none());
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_analyze_with_several_proposals() {
        let args = CliArgs::parse_from([
            "proposal-analyzer",
            "analyze",
            "--tz",
            "tz.txt",
            "--kp",
            "a.txt",
            "--kp",
            "b.txt",
            "--format",
            "json",
            "--provider",
            "claude",
        ]);
        match args.command {
            Commands::Analyze(analyze) => {
                assert_eq!(analyze.kp.len(), 2);
                assert_eq!(analyze.format, OutputFormatArg::Json);
                assert_eq!(analyze.provider, Some(AdapterKind::Anthropic));
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_analyze_requires_a_proposal() {
        let result =
            CliArgs::try_parse_from(["proposal-analyzer", "analyze", "--tz", "tz.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_provider() {
        let result = CliArgs::try_parse_from([
            "proposal-analyzer",
            "analyze",
            "--tz",
            "tz.txt",
            "--kp",
            "kp.txt",
            "--provider",
            "nope",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_criteria_command() {
        let args = CliArgs::parse_from(["proposal-analyzer", "criteria", "-f", "json"]);
        match args.command {
            Commands::Criteria(criteria) => {
                assert_eq!(criteria.format, OutputFormatArg::Json);
                assert!(criteria.weights.is_none());
            }
            _ => panic!("Expected Criteria command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["proposal-analyzer", "criteria", "--log-level", "debug"]);
        assert_eq!(args.log_level, Some("debug".to_string()));

        let args = CliArgs::parse_from(["proposal-analyzer", "-v", "criteria"]);
        assert!(args.verbose);

        let result = CliArgs::try_parse_from(["proposal-analyzer", "-v", "-q", "criteria"]);
        assert!(result.is_err());
    }
}
