//! Best-effort evidence capture when a run fails.
//!
//! Writes `<safe run id>.png` and `<safe run id>.html` into the debug
//! directory. Nothing here returns an error: a failed capture is logged and
//! shows up as a `None` path, leaving the run's original error untouched.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::{fs, time};
use tracing::{info, warn};

use crate::seace::driver::UiDriver;
use crate::seace::errors::RunError;
use crate::seace::models::Diagnostics;

/// Replace every character outside `[A-Za-z0-9_-]` with `-`.
pub fn safe_file_stem(run_id: &str) -> String {
    run_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct DiagnosticCapture {
    dir: PathBuf,
    step_timeout: Duration,
}

impl DiagnosticCapture {
    pub fn new(dir: impl Into<PathBuf>, step_timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            step_timeout,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn capture(&self, run_id: &str, driver: &dyn UiDriver) -> Diagnostics {
        // Concurrent runs may race to create the directory; create_dir_all
        // treats an existing directory as success.
        if let Err(e) = fs::create_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), error = %e, "failed to create debug directory");
            return Diagnostics::default();
        }

        let stem = safe_file_stem(run_id);
        let screenshot = self.dir.join(format!("{stem}.png"));
        let html = self.dir.join(format!("{stem}.html"));

        let screenshot_path = self
            .bounded("screenshot", driver.capture_screenshot(&screenshot))
            .await
            .map(|()| screenshot.display().to_string());

        let html_path = match self.bounded("markup", driver.capture_markup()).await {
            Some(markup) => match fs::write(&html, markup).await {
                Ok(()) => Some(html.display().to_string()),
                Err(e) => {
                    warn!(path = %html.display(), error = %e, "failed to write page markup");
                    None
                }
            },
            None => None,
        };

        info!(
            screenshot = screenshot_path.as_deref(),
            html = html_path.as_deref(),
            "diagnostics captured"
        );

        Diagnostics {
            screenshot_path,
            html_path,
        }
    }

    async fn bounded<T>(
        &self,
        what: &'static str,
        step: impl Future<Output = Result<T, RunError>>,
    ) -> Option<T> {
        match time::timeout(self.step_timeout, step).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(what, error = %e, "diagnostic capture step failed");
                None
            }
            Err(_) => {
                warn!(what, timeout = ?self.step_timeout, "diagnostic capture step timed out");
                None
            }
        }
    }
}
