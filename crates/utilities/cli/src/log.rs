//! Logging flags and tracing subscriber setup.

use crate::CliResult;
use clap::{ArgAction, Parser, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Output format of log lines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable, one event per line.
    #[default]
    Terminal,
    /// Human readable with shortened fields.
    Compact,
    /// One JSON object per event.
    Json,
}

/// Logging flags.
#[derive(Parser, Debug, Default, Clone, PartialEq, Eq)]
pub struct LogArgs {
    /// Verbosity: info by default, `-v` for debug, `-vv` for trace.
    ///
    /// `RUST_LOG` directives take precedence.
    #[arg(short = 'v', long = "verbosity", action = ArgAction::Count, global = true)]
    pub verbosity: u8,
    /// Log line format.
    #[arg(id = "log.format", long = "log.format", value_enum, default_value_t = LogFormat::Terminal, env = "LOG_FORMAT", global = true)]
    pub format: LogFormat,
}

impl LogArgs {
    /// Maps the verbosity count to a level.
    pub const fn level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Installs the global tracing subscriber.
    ///
    /// `filter` replaces the default filter derived from the verbosity and `RUST_LOG`.
    pub fn init_tracing_subscriber(&self, filter: Option<EnvFilter>) -> CliResult<()> {
        let filter = filter.unwrap_or_else(|| {
            EnvFilter::builder().with_default_directive(self.level().into()).from_env_lossy()
        });

        let registry = tracing_subscriber::registry().with(filter);
        match self.format {
            LogFormat::Terminal => registry.with(fmt::layer()).try_init()?,
            LogFormat::Compact => registry.with(fmt::layer().compact()).try_init()?,
            LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
        }
        Ok(())
    }
}
