//! Run orchestration: one [`RunSession`] per request, owning one browser page
//! from launch to close.

use chrono::{DateTime, SecondsFormat, Utc};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, error, info, warn};

use crate::seace::diagnostics::DiagnosticCapture;
use crate::seace::driver::{BrowserLauncher, UiDriver};
use crate::seace::errors::RunError;
use crate::seace::layout::{DEFAULT_SEACE_URL, SeaceLayout};
use crate::seace::models::{
    Diagnostics, FilterCriteria, RunFailure, RunMeta, RunOutcome, RunReport, RunStatus,
};
use crate::seace::pagination::{PaginationWalker, WalkOutcome};
use crate::seace::resolver;
use crate::seace::search::{FilterReport, SearchController};
use crate::utils::{fmt_duration, log_if_slow};

/// Timeouts, grace delays and output locations for a run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub target_url: String,
    pub navigation_timeout: Duration,
    pub panel_timeout: Duration,
    pub results_timeout: Duration,
    pub page_timeout: Duration,
    /// Delay after triggering the search, before polling for rows.
    pub search_grace: Duration,
    /// Delay after clicking "next", before polling for the new page.
    pub page_settle: Duration,
    pub poll_interval: Duration,
    pub max_pages: u32,
    pub debug_dir: PathBuf,
    /// Bound on each diagnostic capture step.
    pub capture_timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_SEACE_URL.to_owned(),
            navigation_timeout: Duration::from_secs(60),
            panel_timeout: Duration::from_secs(10),
            results_timeout: Duration::from_secs(60),
            page_timeout: Duration::from_secs(30),
            search_grace: Duration::from_millis(1500),
            page_settle: Duration::from_millis(500),
            poll_interval: Duration::from_millis(250),
            max_pages: 200,
            debug_dir: PathBuf::from("debug"),
            capture_timeout: Duration::from_secs(15),
        }
    }
}

/// Timestamp-derived run id: RFC 3339 with milliseconds plus the last six
/// (random) characters of a ULID.
pub fn new_run_id(now: DateTime<Utc>) -> String {
    let ulid = ulid::Ulid::new().to_string();
    format!(
        "{}-{}",
        now.to_rfc3339_opts(SecondsFormat::Millis, true),
        &ulid[ulid.len() - 6..]
    )
}

/// One end-to-end execution for one caller request.
#[derive(Debug)]
pub struct RunSession {
    run_id: String,
    criteria: FilterCriteria,
    started_at: DateTime<Utc>,
    status: RunStatus,
}

impl RunSession {
    pub fn new(criteria: FilterCriteria) -> Self {
        let started_at = Utc::now();
        Self {
            run_id: new_run_id(started_at),
            criteria,
            started_at,
            status: RunStatus::Pending,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    fn transition(&mut self, to: RunStatus) {
        debug!(from = ?self.status, to = ?to, "run status");
        self.status = to;
    }

    /// Launch a browser, drive the search to completion and release the
    /// browser on every exit path, panics inside the pipeline included.
    pub async fn execute(
        mut self,
        launcher: &dyn BrowserLauncher,
        layout: &SeaceLayout,
        settings: &RunSettings,
    ) -> RunOutcome {
        self.transition(RunStatus::Running);
        let start = Instant::now();

        let driver = match launcher.launch().await {
            Ok(driver) => driver,
            Err(e) => {
                error!(error = %e, "failed to launch browser");
                self.transition(RunStatus::Failed);
                return RunOutcome::Failed(RunFailure::new(
                    self.run_id,
                    e,
                    Diagnostics::default(),
                ));
            }
        };

        let result = AssertUnwindSafe(self.drive(driver.as_ref(), layout, settings))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(RunError::Panicked(panic_message(panic.as_ref()))));

        let outcome = match result {
            Ok((walk, filters)) => {
                self.transition(RunStatus::Succeeded);
                info!(
                    total = walk.records.len(),
                    pages = walk.pages_processed,
                    complete = walk.complete,
                    duration = fmt_duration(start.elapsed()),
                    "run succeeded"
                );
                RunOutcome::Succeeded(self.report(walk, filters, settings))
            }
            Err(e) => {
                self.transition(RunStatus::Failed);
                error!(
                    stage = e.kind(),
                    error = %e,
                    duration = fmt_duration(start.elapsed()),
                    "run failed"
                );
                let capture = DiagnosticCapture::new(&settings.debug_dir, settings.capture_timeout);
                let diagnostics = capture.capture(&self.run_id, driver.as_ref()).await;
                RunOutcome::Failed(RunFailure::new(self.run_id.clone(), e, diagnostics))
            }
        };

        let closing = Instant::now();
        if let Err(e) = driver.close().await {
            warn!(error = ?e, "failed to close browser");
        }
        log_if_slow(closing, Duration::from_secs(5), "browser close");

        outcome
    }

    async fn drive(
        &self,
        driver: &dyn UiDriver,
        layout: &SeaceLayout,
        settings: &RunSettings,
    ) -> Result<(WalkOutcome, FilterReport), RunError> {
        driver
            .navigate(&settings.target_url, settings.navigation_timeout)
            .await?;
        debug!(url = settings.target_url.as_str(), "search page loaded");

        let options = resolver::resolve(&self.criteria);
        let controller = SearchController::new(driver, layout, settings);
        let filters = controller.apply_filters(&options).await?;
        controller.execute_search().await?;
        controller.await_results_settled().await?;

        let walk = PaginationWalker::new(driver, layout, settings)?
            .walk()
            .await?;
        Ok((walk, filters))
    }

    fn report(&self, walk: WalkOutcome, filters: FilterReport, settings: &RunSettings) -> RunReport {
        RunReport {
            run_id: self.run_id.clone(),
            total: walk.records.len(),
            items: walk.records,
            meta: RunMeta {
                source: settings.target_url.clone(),
                scraped_at: Utc::now(),
                pages_processed: walk.pages_processed,
                filters_applied: self.criteria.clone(),
                filters_skipped: filters.skipped,
                complete: walk.complete,
            },
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Entry point consumed by the transport: criteria in, tagged outcome out.
#[derive(Clone)]
pub struct SeaceRunner {
    launcher: Arc<dyn BrowserLauncher>,
    layout: Arc<SeaceLayout>,
    settings: Arc<RunSettings>,
}

impl SeaceRunner {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, layout: SeaceLayout, settings: RunSettings) -> Self {
        Self {
            launcher,
            layout: Arc::new(layout),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub async fn run(&self, criteria: FilterCriteria) -> RunOutcome {
        let session = RunSession::new(criteria);
        let span = tracing::info_span!("run", run_id = session.run_id());
        async move {
            info!(
                department = session.criteria.department.as_str(),
                object_type = session.criteria.object_type.as_str(),
                year = session.criteria.year.as_str(),
                started_at = %session.started_at,
                "run started"
            );
            session
                .execute(self.launcher.as_ref(), &self.layout, &self.settings)
                .await
        }
        .instrument(span)
        .await
    }
}
