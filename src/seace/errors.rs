//! Error taxonomy for a SEACE run.
//!
//! Every variant names the stage that failed so callers (and tests) can tell a
//! navigation failure apart from a results timeout or a layout mismatch.

use std::fmt;
use std::time::Duration;

/// Which bounded wait expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    /// A dropdown's option panel never became visible.
    Panel,
    /// The result table never rendered a genuine data row after searching.
    Results,
    /// A page advance never produced a fresh page of rows.
    Pagination,
}

impl fmt::Display for WaitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Panel => "dropdown panel",
            Self::Results => "search results",
            Self::Pagination => "next result page",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("timed out after {timeout:.2?} waiting for {kind}")]
    Timeout { kind: WaitKind, timeout: Duration },
    #[error("option {text:?} not found in {panel}")]
    OptionNotFound { panel: String, text: String },
    #[error("result table {0} not found, page layout does not match")]
    SchemaMismatch(String),
    /// The next-page control was present earlier in the walk and is now gone.
    #[error("next-page control {locator} disappeared on result page {page}")]
    PaginatorLost { page: u32, locator: String },
    #[error("browser failure: {0:#}")]
    Browser(#[source] anyhow::Error),
    #[error("run panicked: {0}")]
    Panicked(String),
}

impl RunError {
    pub fn timeout(kind: WaitKind, timeout: Duration) -> Self {
        Self::Timeout { kind, timeout }
    }

    /// Stable tag identifying the failed stage, carried in failure records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Navigation { .. } => "navigation",
            Self::ElementNotFound(_) => "element_not_found",
            Self::Timeout {
                kind: WaitKind::Panel,
                ..
            } => "panel_timeout",
            Self::Timeout {
                kind: WaitKind::Results,
                ..
            } => "results_timeout",
            Self::Timeout {
                kind: WaitKind::Pagination,
                ..
            } => "pagination_timeout",
            Self::OptionNotFound { .. } => "option_not_found",
            Self::SchemaMismatch(_) => "schema_mismatch",
            Self::PaginatorLost { .. } => "paginator_lost",
            Self::Browser(_) => "browser",
            Self::Panicked(_) => "panicked",
        }
    }

    /// Whether a per-criterion filter step may absorb this error and move on.
    pub fn is_skippable_filter_error(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound(_)
                | Self::OptionNotFound { .. }
                | Self::Timeout {
                    kind: WaitKind::Panel,
                    ..
                }
        )
    }
}

impl From<chromiumoxide::error::CdpError> for RunError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Browser(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for RunError {
    fn from(err: std::io::Error) -> Self {
        Self::Browser(anyhow::Error::new(err))
    }
}
