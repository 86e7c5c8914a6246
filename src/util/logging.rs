//! Structured logging setup
//!
//! Pretty console output on stderr by default, JSON lines when
//! `PROPOSAL_LOG_JSON=true`. `RUST_LOG` always wins over the configured
//! level. Initialisation happens at most once per process.
//!
//! ```no_run
//! use proposal_analyzer::util::logging;
//!
//! logging::init_from_env();
//! tracing::info!(session_id = "abc", "Analysis started");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

const CRATE_TARGET: &str = "proposal_analyzer";
const LEVEL_ENV: &str = "PROPOSAL_LOG_LEVEL";
const JSON_ENV: &str = "PROPOSAL_LOG_JSON";

/// Dependencies that are noisy at info level
const QUIET_TARGETS: &[&str] = &["h2=warn", "hyper=warn", "hyper_util=warn", "reqwest=warn", "genai=warn"];

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: Level,
    pub use_json: bool,
    pub include_target: bool,
    /// File and line of every event
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Level and format from `PROPOSAL_LOG_LEVEL` / `PROPOSAL_LOG_JSON`
    pub fn from_env() -> Self {
        Self {
            level: env::var(LEVEL_ENV)
                .map(|s| parse_level(&s))
                .unwrap_or(Level::INFO),
            use_json: json_from_env(),
            ..Default::default()
        }
    }

    /// Command-line flags take precedence over the environment:
    /// an explicit level, then `--verbose` (DEBUG), then `--quiet` (ERROR)
    pub fn from_cli(log_level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        let env_config = Self::from_env();
        let level = match log_level {
            Some(level) => parse_level(level),
            None if verbose => Level::DEBUG,
            None if quiet => Level::ERROR,
            None => env_config.level,
        };

        Self {
            level,
            // locations only help when someone is already digging
            include_location: level == Level::TRACE,
            ..env_config
        }
    }
}

/// Parses a level name case-insensitively, falling back to INFO
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Filter for our crate at `level`, plus quiet defaults when `RUST_LOG` is unset
pub fn build_filter(level: Level) -> EnvFilter {
    let rust_log_set = env::var("RUST_LOG").is_ok();
    let mut filter = EnvFilter::from_default_env();

    let mut directives = vec![format!("{}={}", CRATE_TARGET, level)];
    if !rust_log_set {
        directives.extend(QUIET_TARGETS.iter().map(|d| d.to_string()));
    }

    for directive in directives {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("Ignoring log directive '{}': {}", directive, e),
        }
    }
    filter
}

pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);
        let registry = tracing_subscriber::registry().with(filter);

        if config.use_json {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

pub fn init_from_env() {
    init_logging(LoggingConfig::from_env());
}

fn json_from_env() -> bool {
    env::var(JSON_ENV)
        .ok()
        .and_then(|v| v.trim().to_lowercase().parse::<bool>().ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvReset;

    impl Drop for EnvReset {
        fn drop(&mut self) {
            env::remove_var(LEVEL_ENV);
            env::remove_var(JSON_ENV);
        }
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("Debug"), Level::DEBUG);
        assert_eq!(parse_level(" WARN "), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("verbose"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        let _reset = EnvReset;
        env::set_var(LEVEL_ENV, "debug");
        env::set_var(JSON_ENV, "TRUE");

        let config = LoggingConfig::from_env();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.use_json);
    }

    #[test]
    #[serial]
    fn test_cli_flags_override_env() {
        let _reset = EnvReset;
        env::set_var(LEVEL_ENV, "warn");

        assert_eq!(LoggingConfig::from_cli(None, false, false).level, Level::WARN);
        assert_eq!(LoggingConfig::from_cli(None, true, false).level, Level::DEBUG);
        assert_eq!(LoggingConfig::from_cli(None, false, true).level, Level::ERROR);

        let explicit = LoggingConfig::from_cli(Some("trace"), false, true);
        assert_eq!(explicit.level, Level::TRACE);
        assert!(explicit.include_location);
    }

    #[test]
    fn test_build_filter_includes_crate_directive() {
        let filter = build_filter(Level::DEBUG);
        assert!(filter.to_string().to_lowercase().contains("proposal_analyzer=debug"));
    }
}
