use std::ffi::OsString;
use std::fmt;
use std::str::FromStr;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "krbmv",
    about = "Move Kerberos credentials from one credential cache to another",
    version
)]
pub struct Cli {
    /// Source credential cache. Defaults to KRB5CCNAME or the system default.
    #[arg(short = 'c', long = "source-cache", value_name = "NAME")]
    pub source_cache: Option<OsString>,

    /// Target credential cache.
    #[arg(short = 'n', long = "target-cache", value_name = "NAME", env = "KRB5CCNEW")]
    pub target_cache: Option<OsString>,

    /// Overwrite a FILE cache that already holds a principal.
    #[arg(short, long)]
    pub force: bool,

    /// Log verbosity.
    #[arg(short, long = "log-level", default_value = "warn", value_name = "LEVEL")]
    pub log_level: LogLevel,

    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive for `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" | "critical" => Ok(LogLevel::Error),
            other => Err(format!(
                "unknown log level '{other}' (expected trace, debug, info, warn or error)"
            )),
        }
    }
}
