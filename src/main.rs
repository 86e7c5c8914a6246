use proposal_analyzer::cli::commands::{CliArgs, Commands};
use proposal_analyzer::cli::handlers::{handle_analyze, handle_criteria};
use proposal_analyzer::util::{init_logging, LoggingConfig};
use proposal_analyzer::VERSION;

use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::from_cli(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    debug!("proposal-analyzer v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Analyze(analyze_args) => handle_analyze(analyze_args, args.quiet).await,
        Commands::Criteria(criteria_args) => handle_criteria(criteria_args),
    };

    std::process::exit(exit_code);
}
