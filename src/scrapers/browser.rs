use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, info, warn};

use super::html::HtmlNode;
use super::traits::{PageOpener, ResultsPage};
use crate::config::ScoutConfig;

/// Headless Chrome instance that opens results pages
pub struct ChromeBrowser {
    browser: Browser,
    navigation_timeout: Duration,
    element_wait: Duration,
}

impl ChromeBrowser {
    /// Launch Chrome
    pub fn new(config: &ScoutConfig) -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .idle_browser_timeout(config.navigation_timeout * 2)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;

        Ok(Self {
            browser,
            navigation_timeout: config.navigation_timeout,
            element_wait: config.element_wait,
        })
    }
}

#[async_trait]
impl PageOpener for ChromeBrowser {
    type Page = ChromePage;

    async fn open_page(&self) -> Result<ChromePage> {
        let tab = self.browser.new_tab().context("Failed to open tab")?;
        tab.set_default_timeout(self.navigation_timeout);
        Ok(ChromePage {
            tab,
            element_wait: self.element_wait,
        })
    }

    fn backend_name(&self) -> &'static str {
        "headless_chrome"
    }
}

/// Run a blocking browser call on tokio's blocking pool.
///
/// The awaiting future can be dropped (and the session cancelled) while the
/// call is still running; the call itself finishes in the background.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("Browser task panicked")?
}

/// One Chrome tab showing a results page
pub struct ChromePage {
    tab: Arc<Tab>,
    element_wait: Duration,
}

impl ChromePage {
    async fn with_tab<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tab = self.tab.clone();
        run_blocking(move || f(&tab)).await
    }

    async fn evaluate_f64(&self, expression: &'static str) -> Result<f64> {
        self.with_tab(move |tab| {
            let result = tab.evaluate(expression, false)?;
            Ok(result.value.and_then(|v| v.as_f64()).unwrap_or(0.0))
        })
        .await
    }
}

#[async_trait]
impl ResultsPage for ChromePage {
    type Node = HtmlNode;

    async fn navigate(&mut self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        let url = url.to_string();
        self.with_tab(move |tab| {
            tab.navigate_to(&url)?;
            tab.wait_until_navigated()
                .context("Page did not finish loading")?;
            Ok(())
        })
        .await
    }

    async fn reload(&mut self) -> Result<()> {
        self.with_tab(|tab| {
            tab.reload(false, None)?;
            tab.wait_until_navigated()
                .context("Page did not finish reloading")?;
            Ok(())
        })
        .await
    }

    async fn scroll_height(&mut self) -> Result<f64> {
        self.evaluate_f64("document.body.scrollHeight").await
    }

    async fn scroll_by(&mut self, pixels: f64) -> Result<()> {
        self.with_tab(move |tab| {
            tab.evaluate(&format!("window.scrollBy(0, {})", pixels), false)?;
            Ok(())
        })
        .await
    }

    async fn wait_for(&mut self, selector: &str) -> Result<()> {
        let selector = selector.to_string();
        let timeout = self.element_wait;
        self.with_tab(move |tab| {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)
                .with_context(|| format!("No element matching {}", selector))?;
            Ok(())
        })
        .await
    }

    async fn items(&mut self, selector: &str) -> Result<Vec<HtmlNode>> {
        let html = self
            .with_tab(|tab| {
                let html_result = tab.evaluate("document.documentElement.outerHTML", false)?;
                Ok(html_result.value)
            })
            .await?;
        let html = match html {
            Some(value) => value.as_str().unwrap_or("").to_string(),
            None => {
                warn!("Could not get HTML from page");
                String::new()
            }
        };

        debug!("Captured {} bytes of page HTML", html.len());
        Ok(HtmlNode::select_document(&html, selector))
    }

    async fn close(&mut self) -> Result<()> {
        self.with_tab(|tab| {
            tab.close(true).context("Failed to close tab")?;
            Ok(())
        })
        .await
    }
}
