//! Command-line argument parsing

use crate::config::{CompareConfig, FailurePolicy, OutputFormat};
use crate::error::Result;
use crate::registry::{Dialect, Endpoint};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "registry-compare")]
#[command(about = "List the images of a source registry that are missing from a target registry")]
#[command(version)]
pub struct Args {
    /// Source registry endpoint (host:port or http(s) URL)
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Target registry endpoint (host:port or http(s) URL)
    #[arg(value_name = "TARGET")]
    pub target: String,

    #[arg(
        long = "source-dialect",
        value_enum,
        help = "API dialect of the source registry [default: v1]"
    )]
    pub source_dialect: Option<Dialect>,

    #[arg(
        long = "target-dialect",
        value_enum,
        help = "API dialect of the target registry [default: v2]"
    )]
    pub target_dialect: Option<Dialect>,

    #[arg(
        long = "concurrency",
        short = 'j',
        help = "Maximum number of repositories queried at once [default: 8]"
    )]
    pub concurrency: Option<usize>,

    #[arg(
        long = "retry",
        help = "Attempts per tag listing before giving up [default: 5]"
    )]
    pub retry: Option<u32>,

    #[arg(
        long = "timeout",
        short = 't',
        help = "Per-request timeout in seconds [default: 30]"
    )]
    pub timeout: Option<u64>,

    #[arg(
        long = "deadline",
        help = "Abort the whole comparison after this many seconds"
    )]
    pub deadline: Option<u64>,

    #[arg(
        long = "best-effort",
        help = "Report listing failures and keep going instead of aborting"
    )]
    pub best_effort: bool,

    #[arg(long = "output", short = 'o', value_enum, help = "Output format [default: text]")]
    pub output: Option<OutputFormat>,

    #[arg(long = "verbose", short = 'v', help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long = "quiet",
        short = 'q',
        conflicts_with = "verbose",
        help = "Only print results and errors"
    )]
    pub quiet: bool,

    #[arg(long = "config", help = "Path to a JSON configuration file")]
    pub config: Option<PathBuf>,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    pub fn endpoints(&self) -> Result<(Endpoint, Endpoint)> {
        Ok((Endpoint::parse(&self.source)?, Endpoint::parse(&self.target)?))
    }

    /// Resolve settings: defaults, then the config file, then
    /// `REGISTRY_COMPARE_*` variables, then explicit flags.
    pub fn to_config(&self) -> Result<CompareConfig> {
        self.to_config_with_env(|name| std::env::var(name).ok())
    }

    pub fn to_config_with_env<F>(&self, lookup: F) -> Result<CompareConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match &self.config {
            Some(path) => CompareConfig::load(path)?,
            None => CompareConfig::default(),
        };
        let mut config = base.apply_env(lookup)?;

        if let Some(dialect) = self.source_dialect {
            config.source_dialect = dialect;
        }
        if let Some(dialect) = self.target_dialect {
            config.target_dialect = dialect;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(retry) = self.retry {
            config.retry.max_attempts = retry;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(deadline) = self.deadline {
            config.deadline = Some(deadline);
        }
        if self.best_effort {
            config.failure_policy = FailurePolicy::BestEffort;
        }
        if let Some(output) = self.output {
            config.output = output;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_two_positionals_required() {
        assert!(Args::try_parse_from(["registry-compare", "old:5000"]).is_err());
        assert!(Args::try_parse_from(["registry-compare", "a:1", "b:2", "c:3"]).is_err());
        assert!(Args::try_parse_from(["registry-compare", "old:5000", "new:5000"]).is_ok());
    }

    #[test]
    fn test_default_dialects_are_v1_to_v2() {
        let args = Args::try_parse_from(["registry-compare", "old:5000", "new:5000"]).unwrap();
        let config = args.to_config_with_env(no_env).unwrap();
        assert_eq!(config.source_dialect, Dialect::V1);
        assert_eq!(config.target_dialect, Dialect::V2);
        assert_eq!(config.failure_policy, FailurePolicy::FailFast);
        assert_eq!(config.output, OutputFormat::Text);

        let (source, target) = args.endpoints().unwrap();
        assert_eq!(source.address(), "old:5000");
        assert_eq!(target.address(), "new:5000");
    }

    #[test]
    fn test_flags_override_environment() {
        let args = Args::try_parse_from([
            "registry-compare",
            "--source-dialect",
            "v2",
            "-j",
            "4",
            "--best-effort",
            "-o",
            "json",
            "a:5000",
            "b:5000",
        ])
        .unwrap();
        let config = args
            .to_config_with_env(|name| match name {
                "REGISTRY_COMPARE_CONCURRENCY" => Some("64".to_string()),
                "REGISTRY_COMPARE_TIMEOUT" => Some("5".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.source_dialect, Dialect::V2);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.timeout, 5);
        assert_eq!(config.failure_policy, FailurePolicy::BestEffort);
        assert_eq!(config.output, OutputFormat::Json);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let args =
            Args::try_parse_from(["registry-compare", "-j", "0", "a:5000", "b:5000"]).unwrap();
        assert!(args.to_config_with_env(no_env).is_err());

        let args = Args::try_parse_from(["registry-compare", "", "b:5000"]).unwrap();
        assert!(args.endpoints().is_err());

        assert!(
            Args::try_parse_from(["registry-compare", "--source-dialect", "v3", "a:1", "b:2"])
                .is_err()
        );
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Args::try_parse_from(["registry-compare", "-q", "-v", "a:1", "b:2"]).is_err());
    }
}
