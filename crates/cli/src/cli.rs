//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::StrategyKind;
use std::path::PathBuf;

/// bwc - bandwidth-constrained trajectory compression
#[derive(Parser, Debug)]
#[command(
    name = "bwc",
    author,
    version,
    about = "Bandwidth-constrained windowed trajectory compression",
    long_about = "Compresses a time-ordered stream of position reports from many moving \n\
                  objects, keeping at most a fixed number of points per time window \n\
                  across all trajectories."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BWC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BWC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compress a JSON-lines sample file
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "compressor.toml",
        env = "BWC_CONFIG"
    )]
    pub config: PathBuf,

    /// Input samples, one JSON object per line
    #[arg(short, long, env = "BWC_INPUT")]
    pub input: PathBuf,

    /// Output file for the compressed trajectories (stdout when omitted)
    #[arg(short, long, env = "BWC_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Ground-truth samples for optimal-replay strategies (defaults to the input)
    #[arg(long, env = "BWC_REFERENCE")]
    pub reference: Option<PathBuf>,

    /// Override the eviction queue limit
    #[arg(long, env = "BWC_LIMIT")]
    pub limit: Option<usize>,

    /// Override the window length in seconds
    #[arg(long, env = "BWC_WINDOW")]
    pub window: Option<f64>,

    /// Override the strategy
    #[arg(long, value_enum, env = "BWC_STRATEGY")]
    pub strategy: Option<StrategyArg>,

    /// Withhold each trajectory's newest point (delay instrumentation)
    #[arg(long)]
    pub hold_back: bool,

    /// Report the replay error of every compressed trajectory
    #[arg(long)]
    pub evaluate: bool,

    /// Validate configuration and exit without compressing
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BWC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "compressor.toml", env = "BWC_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "compressor.toml", env = "BWC_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Strategy selection on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyArg {
    Squish,
    StTrace,
    StTraceOptimal,
    StTraceOptimalRegular,
    DeadReckoning,
}

impl From<StrategyArg> for StrategyKind {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Squish => Self::Squish,
            StrategyArg::StTrace => Self::StTrace,
            StrategyArg::StTraceOptimal => Self::StTraceOptimal,
            StrategyArg::StTraceOptimalRegular => Self::StTraceOptimalRegular,
            StrategyArg::DeadReckoning => Self::DeadReckoning,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "bwc",
            "run",
            "--config",
            "c.toml",
            "--input",
            "in.jsonl",
            "--limit",
            "25",
            "--strategy",
            "st-trace-optimal-regular",
            "--hold-back",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.limit, Some(25));
                assert_eq!(args.strategy, Some(StrategyArg::StTraceOptimalRegular));
                assert!(args.hold_back);
                assert!(args.output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_strategy_arg_mapping() {
        assert_eq!(
            StrategyKind::from(StrategyArg::DeadReckoning),
            StrategyKind::DeadReckoning
        );
    }
}
