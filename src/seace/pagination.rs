//! Walks the paginated result table to exhaustion.
//!
//! ```text
//! Extracting --> CheckingNext --(next enabled)--> Extracting (page + 1)
//!                     |
//!                     +--(next disabled / no progress / page cap)--> Done
//!                     +--(paginator gone after it was used)--> PaginatorLost
//! ```

use tokio::time;
use tracing::{debug, info, warn};

use crate::seace::driver::{Condition, UiDriver, Wait};
use crate::seace::errors::{RunError, WaitKind};
use crate::seace::extract::RecordExtractor;
use crate::seace::layout::SeaceLayout;
use crate::seace::models::{PageCursor, ResultRecord};
use crate::seace::session::RunSettings;

/// Everything collected by a finished walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutcome {
    pub records: Vec<ResultRecord>,
    pub pages_processed: u32,
    /// False only when the page cap stopped the walk with a next page available.
    pub complete: bool,
}

enum Step {
    Extracting,
    CheckingNext,
    Done { complete: bool },
}

pub struct PaginationWalker<'a> {
    driver: &'a dyn UiDriver,
    layout: &'a SeaceLayout,
    settings: &'a RunSettings,
    extractor: RecordExtractor,
}

impl<'a> PaginationWalker<'a> {
    pub fn new(
        driver: &'a dyn UiDriver,
        layout: &'a SeaceLayout,
        settings: &'a RunSettings,
    ) -> Result<Self, RunError> {
        Ok(Self {
            driver,
            layout,
            settings,
            extractor: RecordExtractor::new(layout)?,
        })
    }

    /// Run the state machine from page 1, which must already be settled.
    ///
    /// A page advance that never renders fresh rows fails the whole walk
    /// with a pagination timeout; records gathered so far are discarded
    /// rather than reported as a complete set.
    pub async fn walk(&self) -> Result<WalkOutcome, RunError> {
        let mut cursor = PageCursor::first();
        let mut records = Vec::new();
        let mut pages_processed = 0;
        let mut paginator_seen = false;
        let mut step = Step::Extracting;

        loop {
            step = match step {
                Step::Extracting => {
                    let markup = self.driver.capture_markup().await?;
                    let page = self.extractor.extract(&markup)?;
                    if page.records.is_empty() {
                        debug!(page = cursor.page_index, "page yielded no records, stopping");
                        cursor.finish();
                        Step::Done { complete: true }
                    } else {
                        debug!(
                            page = cursor.page_index,
                            records = page.records.len(),
                            dropped = page.dropped_rows,
                            "page extracted"
                        );
                        records.extend(page.records);
                        pages_processed = cursor.page_index;
                        Step::CheckingNext
                    }
                }
                Step::CheckingNext => {
                    let has_next = match self.next_page_state().await? {
                        Some(enabled) => {
                            paginator_seen = true;
                            enabled
                        }
                        // Pages past the first were reached through this
                        // control, so losing it means the walk cannot finish.
                        None if paginator_seen || cursor.page_index > 1 => {
                            return Err(RunError::PaginatorLost {
                                page: cursor.page_index,
                                locator: self.layout.next_page.to_string(),
                            });
                        }
                        None => {
                            debug!("no paginator rendered, single page of results");
                            false
                        }
                    };

                    if !has_next {
                        cursor.finish();
                        Step::Done { complete: true }
                    } else if cursor.page_index >= self.settings.max_pages {
                        warn!(
                            max_pages = self.settings.max_pages,
                            "page cap reached with more pages available, result is incomplete"
                        );
                        Step::Done { complete: false }
                    } else {
                        self.advance().await?;
                        cursor.advance();
                        Step::Extracting
                    }
                }
                Step::Done { complete } => {
                    info!(
                        pages = pages_processed,
                        records = records.len(),
                        complete,
                        "pagination finished"
                    );
                    return Ok(WalkOutcome {
                        records,
                        pages_processed,
                        complete,
                    });
                }
            };
        }
    }

    /// A missing paginator means the results fit on one page.
    /// `Some(enabled)` for a rendered next-page control, `None` when the
    /// page has no paginator at all.
    async fn next_page_state(&self) -> Result<Option<bool>, RunError> {
        match self
            .driver
            .is_disabled(&self.layout.next_page, &self.layout.disabled_class)
            .await
        {
            Ok(disabled) => Ok(Some(!disabled)),
            Err(RunError::ElementNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Click "next" and wait for a fresh page of rows. Both waits share one
    /// `page_timeout` deadline.
    async fn advance(&self) -> Result<(), RunError> {
        let marker = self
            .driver
            .read_text(&self.layout.first_row)
            .await
            .unwrap_or_default();

        self.driver.click(&self.layout.next_page).await?;
        time::sleep(self.settings.page_settle).await;

        let wait = Wait::new(
            WaitKind::Pagination,
            self.settings.page_timeout,
            self.settings.poll_interval,
        )
        .with_deadline(time::Instant::now() + self.settings.page_timeout);

        if !marker.is_empty() {
            let changed = Condition::TextChanged {
                locator: self.layout.first_row.clone(),
                previous: marker,
            };
            self.driver.wait_for_condition(&changed, wait).await?;
        }

        let rows = Condition::RowsPresent {
            rows: self.layout.rows.clone(),
            placeholder: self.layout.placeholder_row.clone(),
        };
        self.driver.wait_for_condition(&rows, wait).await
    }
}
