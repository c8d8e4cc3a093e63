//! Engine-independent capability surface over a browser page.
//!
//! Everything above this module talks to a [`UiDriver`], never to a concrete
//! automation engine, so the run pipeline can be exercised against a scripted
//! fake page.

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::trace;

use crate::seace::errors::{RunError, WaitKind};

/// A CSS selector identifying one or more elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A page-state predicate evaluated by [`UiDriver::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// At least one matching element is rendered and not hidden, including
    /// elements toggled through inline `display` styles.
    Visible(Locator),
    /// At least one row matches `rows` without also matching `placeholder`.
    RowsPresent { rows: Locator, placeholder: Locator },
    /// The element's text differs from `previous`, or the element is gone.
    TextChanged { locator: Locator, previous: String },
}

/// Bounds for one polled wait.
#[derive(Debug, Clone, Copy)]
pub struct Wait {
    pub kind: WaitKind,
    pub timeout: Duration,
    pub interval: Duration,
    /// Fixed expiry shared by several waits; `timeout` from the start of the
    /// wait when unset.
    pub deadline: Option<Instant>,
}

impl Wait {
    pub fn new(kind: WaitKind, timeout: Duration, interval: Duration) -> Self {
        Self {
            kind,
            timeout,
            interval,
            deadline: None,
        }
    }

    /// Expire at `deadline` regardless of when the wait starts. Timeout errors
    /// still report `timeout` as the configured bound.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

#[async_trait]
pub trait UiDriver: Send + Sync {
    /// Load `url`, failing with [`RunError::Navigation`] if the page is not
    /// ready within `timeout`.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), RunError>;

    /// Click a composite dropdown to reveal its option panel.
    async fn open_dropdown(&self, control: &Locator) -> Result<(), RunError>;

    /// Normalized visible text of every option currently in the panel.
    async fn list_options(&self, items: &Locator) -> Result<Vec<String>, RunError>;

    /// Click the panel item whose normalized text equals `text` exactly.
    async fn select_option_by_text(&self, items: &Locator, text: &str) -> Result<(), RunError>;

    async fn click(&self, locator: &Locator) -> Result<(), RunError>;

    async fn read_text(&self, locator: &Locator) -> Result<String, RunError>;

    /// Whether the control is disabled, either natively or via `disabled_class`.
    async fn is_disabled(&self, locator: &Locator, disabled_class: &str)
    -> Result<bool, RunError>;

    /// Evaluate a predicate once against the current page.
    async fn check(&self, condition: &Condition) -> Result<bool, RunError>;

    async fn capture_screenshot(&self, path: &Path) -> Result<(), RunError>;

    /// The full rendered markup of the page.
    async fn capture_markup(&self) -> Result<String, RunError>;

    /// Release the page and everything backing it.
    async fn close(self: Box<Self>) -> anyhow::Result<()>;

    /// Poll `condition` until it holds or `wait.timeout` elapses.
    ///
    /// Errors from individual checks are treated as "not yet": a table that
    /// is mid re-render can briefly fail to resolve.
    async fn wait_for_condition(&self, condition: &Condition, wait: Wait) -> Result<(), RunError> {
        let deadline = wait
            .deadline
            .unwrap_or_else(|| Instant::now() + wait.timeout);
        loop {
            match time::timeout_at(deadline, self.check(condition)).await {
                Ok(Ok(true)) => return Ok(()),
                Ok(Ok(false)) => {}
                Ok(Err(e)) => trace!(error = %e, ?condition, "condition check failed, polling again"),
                Err(_elapsed) => return Err(RunError::timeout(wait.kind, wait.timeout)),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(RunError::timeout(wait.kind, wait.timeout));
            }
            time::sleep(wait.interval.min(deadline - now)).await;
        }
    }

    /// Wait until an option panel with at least one item is visible.
    async fn wait_for_panel_visible(&self, items: &Locator, wait: Wait) -> Result<(), RunError> {
        self.wait_for_condition(&Condition::Visible(items.clone()), wait)
            .await
    }
}

/// Provisions one isolated driver per run.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn UiDriver>, RunError>;
}
