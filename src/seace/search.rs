//! Applies resolved filters to the search form, triggers the search and waits
//! for the asynchronous result table to settle.

use tokio::time;
use tracing::{debug, info, warn};

use crate::seace::driver::{Condition, UiDriver, Wait};
use crate::seace::errors::{RunError, WaitKind};
use crate::seace::layout::SeaceLayout;
use crate::seace::models::{Criterion, ResolvedOption};
use crate::seace::resolver;
use crate::seace::session::RunSettings;

/// Which criteria made it onto the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub applied: Vec<(Criterion, String)>,
    pub skipped: Vec<Criterion>,
}

pub struct SearchController<'a> {
    driver: &'a dyn UiDriver,
    layout: &'a SeaceLayout,
    settings: &'a RunSettings,
}

impl<'a> SearchController<'a> {
    pub fn new(driver: &'a dyn UiDriver, layout: &'a SeaceLayout, settings: &'a RunSettings) -> Self {
        Self {
            driver,
            layout,
            settings,
        }
    }

    /// Apply each option in turn.
    ///
    /// A missing dropdown, a panel that never opens or an unmatched option
    /// skips that criterion only; the search then runs unfiltered on that
    /// axis. Anything else (a dead browser) is returned.
    pub async fn apply_filters(&self, options: &[ResolvedOption]) -> Result<FilterReport, RunError> {
        let mut report = FilterReport::default();

        for option in options {
            match self.select(option).await {
                Ok(label) => {
                    debug!(criterion = %option.criterion, label = label.as_str(), "filter applied");
                    report.applied.push((option.criterion, label));
                }
                Err(e) if e.is_skippable_filter_error() => {
                    warn!(
                        criterion = %option.criterion,
                        value = option.raw_value.as_str(),
                        error = %e,
                        "could not apply filter, skipping"
                    );
                    self.dismiss_panel(option.criterion).await;
                    report.skipped.push(option.criterion);
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "filters applied"
        );
        Ok(report)
    }

    /// open -> wait for panel -> match by text -> click, as one step.
    async fn select(&self, option: &ResolvedOption) -> Result<String, RunError> {
        let dropdown = self.layout.dropdown(option.criterion);

        self.driver.open_dropdown(&dropdown.control).await?;
        self.driver
            .wait_for_panel_visible(&dropdown.items, self.wait(WaitKind::Panel))
            .await?;

        let labels = self.driver.list_options(&dropdown.items).await?;
        // A pinned label wins only if the panel actually offers it.
        let label = option
            .ui_identifier
            .as_deref()
            .filter(|id| labels.iter().any(|l| l == id))
            .or_else(|| resolver::pick_option(&labels, option))
            .ok_or_else(|| RunError::OptionNotFound {
                panel: dropdown.items.to_string(),
                text: option.ui_label.clone(),
            })?
            .to_owned();

        self.driver
            .select_option_by_text(&dropdown.items, &label)
            .await?;
        Ok(label)
    }

    /// Best-effort close of a panel left open by a skipped criterion.
    async fn dismiss_panel(&self, criterion: Criterion) {
        let dropdown = self.layout.dropdown(criterion);
        let visible = self
            .driver
            .check(&Condition::Visible(dropdown.items.clone()))
            .await
            .unwrap_or(false);
        if visible && let Err(e) = self.driver.click(&dropdown.control).await {
            debug!(%criterion, error = %e, "failed to dismiss option panel");
        }
    }

    /// Click search, then give the backend a grace period to start its
    /// request cycle; the page exposes no "request started" signal.
    pub async fn execute_search(&self) -> Result<(), RunError> {
        self.driver.click(&self.layout.search_button).await?;
        debug!("search triggered");
        time::sleep(self.settings.search_grace).await;
        Ok(())
    }

    /// Poll until the table holds at least one genuine data row.
    ///
    /// The table is shown and hidden through inline styles, so settling is
    /// judged by row count rather than visibility.
    pub async fn await_results_settled(&self) -> Result<(), RunError> {
        let condition = Condition::RowsPresent {
            rows: self.layout.rows.clone(),
            placeholder: self.layout.placeholder_row.clone(),
        };
        self.driver
            .wait_for_condition(&condition, self.wait(WaitKind::Results))
            .await?;
        debug!("search results settled");
        Ok(())
    }

    fn wait(&self, kind: WaitKind) -> Wait {
        let timeout = match kind {
            WaitKind::Panel => self.settings.panel_timeout,
            WaitKind::Results => self.settings.results_timeout,
            WaitKind::Pagination => self.settings.page_timeout,
        };
        Wait::new(kind, timeout, self.settings.poll_interval)
    }
}
