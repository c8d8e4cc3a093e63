//! [`UiDriver`] over headless Chromium via `chromiumoxide`.
//!
//! Every run launches its own browser process with a single page; nothing is
//! pooled or shared between runs.

use anyhow::Context;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::seace::driver::{BrowserLauncher, Condition, Locator, UiDriver};
use crate::seace::errors::RunError;
use crate::utils::collapse_whitespace;

#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub window_size: (u32, u32),
    /// Bound on each individual CDP request.
    pub request_timeout: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            window_size: (1366, 900),
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub struct ChromeLauncher {
    options: ChromeOptions,
}

impl ChromeLauncher {
    pub fn new(options: ChromeOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn UiDriver>, RunError> {
        let (width, height) = self.options.window_size;
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(width, height)
            .request_timeout(self.options.request_timeout);
        if !self.options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| RunError::Browser(anyhow::anyhow!("invalid browser config: {e}")))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch chromium")
            .map_err(RunError::Browser)?;

        // The handler drives the CDP websocket and must be polled for the
        // browser to make progress.
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!(error = %close_err, "failed to close browser after page creation failure");
                }
                handler_task.abort();
                return Err(e.into());
            }
        };

        info!(headless = self.options.headless, "browser launched");
        Ok(Box::new(ChromeDriver {
            browser: Mutex::new(browser),
            page,
            handler_task,
        }))
    }
}

pub struct ChromeDriver {
    // Only touched on close.
    browser: Mutex<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl ChromeDriver {
    /// First element matching `locator`.
    ///
    /// Uses `querySelectorAll` so that "nothing matched" is an empty result
    /// rather than a CDP error; only that case is `ElementNotFound`. Transport
    /// and protocol failures surface as [`RunError::Browser`].
    async fn find(&self, locator: &Locator) -> Result<Element, RunError> {
        self.page
            .find_elements(locator.as_str())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RunError::ElementNotFound(locator.to_string()))
    }

    async fn text_of(element: &Element) -> Result<String, RunError> {
        let text = element.inner_text().await?.unwrap_or_default();
        Ok(collapse_whitespace(&text))
    }

    async fn eval_bool(&self, script: String) -> Result<bool, RunError> {
        self.page
            .evaluate(script)
            .await?
            .into_value::<bool>()
            .context("condition script did not return a boolean")
            .map_err(RunError::Browser)
    }
}

/// Quote a value as a JavaScript string literal.
fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

/// Scripts are plain expressions; chromiumoxide treats anything that looks
/// like a function literal as a function to call.
fn condition_script(condition: &Condition) -> String {
    match condition {
        Condition::Visible(items) => format!(
            "Array.from(document.querySelectorAll({sel})).some(el => {{ \
                const s = window.getComputedStyle(el); \
                return s.display !== 'none' && s.visibility !== 'hidden' && el.getClientRects().length > 0; \
            }})",
            sel = js_str(items.as_str())
        ),
        Condition::RowsPresent { rows, placeholder } => format!(
            "Array.from(document.querySelectorAll({rows})).filter(r => !r.matches({skip})).length > 0",
            rows = js_str(rows.as_str()),
            skip = js_str(placeholder.as_str())
        ),
        Condition::TextChanged { locator, previous } => format!(
            "[document.querySelector({sel})].every(el => \
                el === null || el.innerText.replace(/\\s+/g, ' ').trim() !== {prev})",
            sel = js_str(locator.as_str()),
            prev = js_str(previous)
        ),
    }
}

#[async_trait]
impl UiDriver for ChromeDriver {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), RunError> {
        match time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(RunError::Navigation {
                url: url.to_owned(),
                reason: e.to_string(),
            }),
            Err(_) => Err(RunError::Navigation {
                url: url.to_owned(),
                reason: format!("page not ready within {timeout:.2?}"),
            }),
        }
    }

    async fn open_dropdown(&self, control: &Locator) -> Result<(), RunError> {
        self.find(control).await?.click().await?;
        Ok(())
    }

    async fn list_options(&self, items: &Locator) -> Result<Vec<String>, RunError> {
        let elements = self.page.find_elements(items.as_str()).await?;
        let mut labels = Vec::with_capacity(elements.len());
        for element in &elements {
            labels.push(Self::text_of(element).await?);
        }
        Ok(labels)
    }

    async fn select_option_by_text(&self, items: &Locator, text: &str) -> Result<(), RunError> {
        let elements = self.page.find_elements(items.as_str()).await?;
        for element in &elements {
            if Self::text_of(element).await? == text {
                element.click().await?;
                debug!(option = text, "option clicked");
                return Ok(());
            }
        }
        Err(RunError::OptionNotFound {
            panel: items.to_string(),
            text: text.to_owned(),
        })
    }

    async fn click(&self, locator: &Locator) -> Result<(), RunError> {
        self.find(locator).await?.click().await?;
        Ok(())
    }

    async fn read_text(&self, locator: &Locator) -> Result<String, RunError> {
        Self::text_of(&self.find(locator).await?).await
    }

    async fn is_disabled(
        &self,
        locator: &Locator,
        disabled_class: &str,
    ) -> Result<bool, RunError> {
        let element = self.find(locator).await?;
        if element.attribute("disabled").await?.is_some() {
            return Ok(true);
        }
        if element.attribute("aria-disabled").await?.as_deref() == Some("true") {
            return Ok(true);
        }
        let classes = element.attribute("class").await?.unwrap_or_default();
        Ok(classes.split_whitespace().any(|c| c == disabled_class))
    }

    async fn check(&self, condition: &Condition) -> Result<bool, RunError> {
        self.eval_bool(condition_script(condition)).await
    }

    async fn capture_screenshot(&self, path: &Path) -> Result<(), RunError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        let png = self.page.screenshot(params).await?;
        tokio::fs::write(path, &png).await?;
        debug!(path = %path.display(), size_kb = png.len() / 1024, "screenshot saved");
        Ok(())
    }

    async fn capture_markup(&self) -> Result<String, RunError> {
        Ok(self.page.content().await?)
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        let ChromeDriver {
            browser,
            page,
            handler_task,
        } = *self;
        let mut browser = browser.into_inner();

        if let Err(e) = page.close().await {
            debug!(error = %e, "page close failed, closing browser anyway");
        }
        let closed = browser.close().await.context("failed to close browser");
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "failed to reap browser process");
        }
        handler_task.abort();
        closed.map(|_| ())
    }
}
