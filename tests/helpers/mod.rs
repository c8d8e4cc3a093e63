//! Scripted stand-in for the SEACE search page.
//!
//! `FakeTarget` describes what the page offers (dropdown options, result pages)
//! and how it misbehaves; `FakeLauncher` hands out one `FakeDriver` per run and
//! counts launches and closes so tests can check the browser is always released.
#![allow(dead_code)]

use async_trait::async_trait;
use html_scraper::{Html, Selector};
use seace_runner::seace::layout::SeaceLayout;
use seace_runner::seace::{
    BrowserLauncher, Condition, Criterion, Locator, RunError, RunSettings, SeaceRunner, UiDriver,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TARGET_URL: &str = "https://seace.test/buscadorPublico.xhtml";

/// One rendered table row: the text of each cell.
pub type Row = Vec<String>;

#[derive(Debug, Clone, Default)]
pub struct FakeTarget {
    /// Option labels per dropdown. A criterion without an entry has no
    /// dropdown control on the page.
    pub options: HashMap<Criterion, Vec<String>>,
    /// Result pages as shown after searching, in paginator order.
    pub pages: Vec<Vec<Row>>,
    /// Rows never render after the search is triggered.
    pub never_settle: bool,
    /// Clicking "next" leaves the current page in place.
    pub stale_pagination: bool,
    /// Markup captured for extraction lacks the result table, as when the
    /// page re-renders between settling and being read.
    pub table_detached_on_capture: bool,
    /// Reading the next-page control fails at the protocol level.
    pub paginator_error: bool,
    /// The next-page control is not rendered on this (0-based) page.
    pub paginator_missing_on: Option<usize>,
    pub fail_navigation: bool,
    pub fail_screenshot: bool,
    pub panic_on_search: bool,
}

impl FakeTarget {
    /// A page offering the usual department, object type and year dropdowns.
    pub fn with_pages(pages: Vec<Vec<Row>>) -> Self {
        let mut options = HashMap::new();
        options.insert(
            Criterion::Department,
            labels(&["-- Seleccione --", "Amazonas", "Áncash", "Lima", "Lima Metropolitana"]),
        );
        options.insert(
            Criterion::ObjectType,
            labels(&["-- Seleccione --", "Bien", "Consultoría de Obra", "Obra", "Servicio"]),
        );
        options.insert(Criterion::Year, labels(&["2023", "2024", "2025"]));
        Self {
            options,
            pages,
            ..Self::default()
        }
    }

    /// `page_count` pages of `per_page` valid rows each, numbered from 1.
    pub fn uniform(page_count: usize, per_page: usize) -> Self {
        let pages = (0..page_count)
            .map(|p| (1..=per_page).map(|i| record_row(p * per_page + i)).collect())
            .collect();
        Self::with_pages(pages)
    }
}

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

/// A well-formed seven-cell result row.
pub fn record_row(n: usize) -> Row {
    vec![
        n.to_string(),
        format!("MUNICIPALIDAD DISTRITAL {n}"),
        "05/03/2025 10:20".to_owned(),
        format!("AS-SM-{n}-2025-MDL/CS-1"),
        String::new(),
        "Obra".to_owned(),
        format!("MEJORAMIENTO DEL SERVICIO {n}"),
    ]
}

/// A row with too few cells, as rendered for group headers.
pub fn short_row() -> Row {
    vec!["x".to_owned(), "y".to_owned(), "z".to_owned()]
}

/// Everything observable about one driver, shared with the test.
#[derive(Debug, Default)]
pub struct Journal {
    pub navigations: Vec<String>,
    pub selections: Vec<String>,
    pub searches: usize,
    pub next_clicks: usize,
}

#[derive(Debug, Default)]
struct PageState {
    open_panel: Option<Criterion>,
    searched: bool,
    current_page: usize,
}

pub struct FakeDriver {
    target: Arc<FakeTarget>,
    layout: SeaceLayout,
    state: Mutex<PageState>,
    journal: Arc<Mutex<Journal>>,
    closed: Arc<AtomicUsize>,
}

impl FakeDriver {
    fn criterion_for_control(&self, control: &Locator) -> Option<Criterion> {
        Criterion::ALL
            .into_iter()
            .find(|c| &self.layout.dropdown(*c).control == control)
    }

    fn criterion_for_items(&self, items: &Locator) -> Option<Criterion> {
        Criterion::ALL
            .into_iter()
            .find(|c| &self.layout.dropdown(*c).items == items)
    }

    fn current_rows(&self) -> Vec<Row> {
        let state = self.state.lock().unwrap();
        if !state.searched || self.target.never_settle {
            return Vec::new();
        }
        self.target
            .pages
            .get(state.current_page)
            .cloned()
            .unwrap_or_default()
    }

    fn first_row_text(&self) -> Option<String> {
        self.current_rows().first().map(|cells| {
            cells
                .iter()
                .map(String::as_str)
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    fn render(&self) -> String {
        let rows = self.current_rows();
        let mut body = String::new();
        if rows.is_empty() {
            body.push_str(
                "<tr class=\"ui-widget-content ui-datatable-empty-message\">\
                 <td colspan=\"7\">No se encontraron Datos</td></tr>",
            );
        }
        for row in rows {
            body.push_str("<tr class=\"ui-widget-content\">");
            for cell in row {
                body.push_str(&format!("<td role=\"gridcell\">  {cell}\n</td>"));
            }
            body.push_str("</tr>");
        }
        format!(
            "<html><body><form id=\"tbBuscador:idFormBuscarProceso\"><table>\
             <tbody id=\"tbBuscador:idFormBuscarProceso:dtProcesos_data\" class=\"ui-datatable-data\">\
             {body}</tbody></table></form></body></html>"
        )
    }
}

#[async_trait]
impl UiDriver for FakeDriver {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), RunError> {
        self.journal.lock().unwrap().navigations.push(url.to_owned());
        if self.target.fail_navigation {
            return Err(RunError::Navigation {
                url: url.to_owned(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_owned(),
            });
        }
        Ok(())
    }

    async fn open_dropdown(&self, control: &Locator) -> Result<(), RunError> {
        let criterion = self
            .criterion_for_control(control)
            .filter(|c| self.target.options.contains_key(c))
            .ok_or_else(|| RunError::ElementNotFound(control.to_string()))?;
        self.state.lock().unwrap().open_panel = Some(criterion);
        Ok(())
    }

    async fn list_options(&self, items: &Locator) -> Result<Vec<String>, RunError> {
        let criterion = self.criterion_for_items(items);
        let open = self.state.lock().unwrap().open_panel;
        match criterion {
            Some(c) if open == Some(c) => Ok(self.target.options.get(&c).cloned().unwrap_or_default()),
            _ => Ok(Vec::new()),
        }
    }

    async fn select_option_by_text(&self, items: &Locator, text: &str) -> Result<(), RunError> {
        let options = self.list_options(items).await?;
        if !options.iter().any(|o| o == text) {
            return Err(RunError::OptionNotFound {
                panel: items.to_string(),
                text: text.to_owned(),
            });
        }
        self.state.lock().unwrap().open_panel = None;
        self.journal.lock().unwrap().selections.push(text.to_owned());
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<(), RunError> {
        if *locator == self.layout.search_button {
            if self.target.panic_on_search {
                panic!("search button detached");
            }
            self.state.lock().unwrap().searched = true;
            self.journal.lock().unwrap().searches += 1;
        } else if *locator == self.layout.next_page {
            self.journal.lock().unwrap().next_clicks += 1;
            let mut state = self.state.lock().unwrap();
            if !self.target.stale_pagination && state.current_page + 1 < self.target.pages.len() {
                state.current_page += 1;
            }
        } else if self.criterion_for_control(locator).is_some() {
            self.state.lock().unwrap().open_panel = None;
        } else {
            return Err(RunError::ElementNotFound(locator.to_string()));
        }
        Ok(())
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, RunError> {
        if *locator == self.layout.first_row {
            return self
                .first_row_text()
                .ok_or_else(|| RunError::ElementNotFound(locator.to_string()));
        }
        Err(RunError::ElementNotFound(locator.to_string()))
    }

    async fn is_disabled(&self, locator: &Locator, _disabled_class: &str) -> Result<bool, RunError> {
        if self.target.paginator_error {
            return Err(RunError::Browser(anyhow::anyhow!("Request timed out.")));
        }
        let current = self.state.lock().unwrap().current_page;
        if *locator != self.layout.next_page
            || self.target.pages.len() < 2
            || self.target.paginator_missing_on == Some(current)
        {
            return Err(RunError::ElementNotFound(locator.to_string()));
        }
        Ok(current + 1 >= self.target.pages.len())
    }

    async fn check(&self, condition: &Condition) -> Result<bool, RunError> {
        match condition {
            Condition::Visible(items) => {
                let open = self.state.lock().unwrap().open_panel;
                Ok(self.criterion_for_items(items).is_some_and(|c| {
                    open == Some(c) && self.target.options.get(&c).is_some_and(|o| !o.is_empty())
                }))
            }
            Condition::RowsPresent { rows, placeholder } => {
                let rows = Selector::parse(rows.as_str()).unwrap();
                let placeholder = Selector::parse(placeholder.as_str()).unwrap();
                let html = Html::parse_document(&self.render());
                Ok(html.select(&rows).any(|row| !placeholder.matches(&row)))
            }
            Condition::TextChanged { previous, .. } => {
                Ok(self.first_row_text().as_deref() != Some(previous.as_str()))
            }
        }
    }

    async fn capture_screenshot(&self, path: &Path) -> Result<(), RunError> {
        if self.target.fail_screenshot {
            return Err(RunError::Browser(anyhow::anyhow!("screenshot target closed")));
        }
        std::fs::write(path, b"\x89PNG\r\n\x1a\n")?;
        Ok(())
    }

    async fn capture_markup(&self) -> Result<String, RunError> {
        if self.target.table_detached_on_capture {
            return Ok("<html><body><div id=\"mensaje\">Mantenimiento</div></body></html>".to_owned());
        }
        Ok(self.render())
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeLauncher {
    target: Arc<FakeTarget>,
    pub fail_launch: bool,
    pub launched: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    pub journal: Arc<Mutex<Journal>>,
}

impl FakeLauncher {
    pub fn new(target: FakeTarget) -> Self {
        Self {
            target: Arc::new(target),
            fail_launch: false,
            launched: Arc::default(),
            closed: Arc::default(),
            journal: Arc::default(),
        }
    }

    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn selections(&self) -> Vec<String> {
        self.journal.lock().unwrap().selections.clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn UiDriver>, RunError> {
        if self.fail_launch {
            return Err(RunError::Browser(anyhow::anyhow!("chromium not found")));
        }
        self.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeDriver {
            target: self.target.clone(),
            layout: SeaceLayout::default(),
            state: Mutex::default(),
            journal: self.journal.clone(),
            closed: self.closed.clone(),
        }))
    }
}

/// Millisecond-scale timeouts so failure paths finish quickly.
pub fn fast_settings(debug_dir: &Path) -> RunSettings {
    RunSettings {
        target_url: TARGET_URL.to_owned(),
        navigation_timeout: Duration::from_secs(1),
        panel_timeout: Duration::from_millis(100),
        results_timeout: Duration::from_millis(150),
        page_timeout: Duration::from_millis(150),
        search_grace: Duration::from_millis(1),
        page_settle: Duration::from_millis(1),
        poll_interval: Duration::from_millis(5),
        max_pages: 200,
        debug_dir: PathBuf::from(debug_dir),
        capture_timeout: Duration::from_secs(1),
    }
}

pub fn runner(launcher: &FakeLauncher, settings: RunSettings) -> SeaceRunner {
    SeaceRunner::new(Arc::new(launcher.clone()), SeaceLayout::default(), settings)
}
