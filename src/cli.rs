use clap::{Parser, ValueEnum};

/// HTTP runner that extracts procurement notices from the SEACE public search.
#[derive(Parser, Debug)]
#[command(name = "seace-runner", version, about)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = TracingFormat::default())]
    pub tracing: TracingFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable output for local development
    Pretty,
    /// One JSON object per line, for log collectors
    Json,
}

impl Default for TracingFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}
