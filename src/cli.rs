//! CLI argument parsing for taskdump

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "taskdump")]
#[command(version)]
#[command(about = "Inspect, deduplicate, filter and diff goroutine stack dumps", long_about = None)]
pub struct Cli {
    /// Dump file loaded into the variable `original`
    #[arg(value_name = "DUMP")]
    pub dump: Option<PathBuf>,

    /// Statement to execute (repeatable); skips the interactive loop
    #[arg(short = 'x', long = "exec", value_name = "STMT")]
    pub exec: Vec<String>,

    /// File of statements to execute, one per line
    #[arg(long = "script", value_name = "FILE", conflicts_with = "exec")]
    pub script: Option<PathBuf>,

    /// Configuration file (taskdump.toml)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Summary output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_dump() {
        let cli = Cli::parse_from(["taskdump", "goroutines.txt"]);
        assert_eq!(cli.dump, Some(PathBuf::from("goroutines.txt")));
        assert!(cli.exec.is_empty());
        assert!(cli.script.is_none());
    }

    #[test]
    fn test_cli_empty() {
        let cli = Cli::parse_from(["taskdump"]);
        assert!(cli.dump.is_none());
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.no_color);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_repeated_exec() {
        let cli = Cli::parse_from([
            "taskdump",
            "dump.txt",
            "-x",
            "original.dedup()",
            "--exec",
            "original",
        ]);
        assert_eq!(cli.exec, vec!["original.dedup()", "original"]);
    }

    #[test]
    fn test_cli_format_json() {
        let cli = Cli::parse_from(["taskdump", "--format", "json"]);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_exec_conflicts_with_script() {
        let result = Cli::try_parse_from(["taskdump", "-x", "original", "--script", "s.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_config_and_flags() {
        let cli = Cli::parse_from([
            "taskdump",
            "--config",
            "taskdump.toml",
            "--no-color",
            "--debug",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("taskdump.toml")));
        assert!(cli.no_color);
        assert!(cli.debug);
    }
}
