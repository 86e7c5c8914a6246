pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{AnalyzeArgs, CliArgs, Commands, CriteriaArgs, OutputFormatArg};
pub use handlers::{handle_analyze, handle_criteria};
pub use output::{OutputFormat, OutputFormatter};
