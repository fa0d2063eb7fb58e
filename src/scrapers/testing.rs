//! Scripted page, browser and image source for tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use super::browser::run_blocking;
use super::html::HtmlNode;
use super::images::ImageSource;
use super::traits::{PageOpener, ResultsPage};

/// Everything a `MockPage` was asked to do
#[derive(Debug, Default, Clone)]
pub struct PageLog {
    pub navigated: Vec<String>,
    pub reloads: usize,
    pub scrolls: Vec<f64>,
    pub waits: usize,
    pub closed: bool,
}

/// A page that serves one HTML document per load.
///
/// `navigate` shows the first snapshot and every `reload` advances to the
/// next one, sticking on the last.
pub struct MockPage {
    snapshots: Vec<String>,
    current: usize,
    height: f64,
    fail_navigation: bool,
    fail_reload: bool,
    navigation_delay: Option<Duration>,
    log: Arc<Mutex<PageLog>>,
}

impl MockPage {
    pub fn new(snapshots: Vec<String>) -> Self {
        Self {
            snapshots,
            current: 0,
            height: 2000.0,
            fail_navigation: false,
            fail_reload: false,
            navigation_delay: None,
            log: Arc::new(Mutex::new(PageLog::default())),
        }
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub fn failing_reload(mut self) -> Self {
        self.fail_reload = true;
        self
    }

    /// Block a thread for `delay` on every navigation, like a hung page load
    pub fn with_navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = Some(delay);
        self
    }

    pub fn log_handle(&self) -> Arc<Mutex<PageLog>> {
        self.log.clone()
    }

    pub fn log(&self) -> PageLog {
        self.log.lock().unwrap().clone()
    }

    fn document(&self) -> &str {
        self.snapshots
            .get(self.current)
            .or_else(|| self.snapshots.last())
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[async_trait]
impl ResultsPage for MockPage {
    type Node = HtmlNode;

    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.log.lock().unwrap().navigated.push(url.to_string());
        if let Some(delay) = self.navigation_delay {
            run_blocking(move || {
                std::thread::sleep(delay);
                Ok(())
            })
            .await?;
        }
        if self.fail_navigation {
            bail!("net::ERR_NAME_NOT_RESOLVED");
        }
        self.current = 0;
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        self.log.lock().unwrap().reloads += 1;
        if self.fail_reload {
            bail!("net::ERR_CONNECTION_RESET");
        }
        if self.current + 1 < self.snapshots.len() {
            self.current += 1;
        }
        Ok(())
    }

    async fn scroll_height(&mut self) -> Result<f64> {
        Ok(self.height)
    }

    async fn scroll_by(&mut self, pixels: f64) -> Result<()> {
        self.log.lock().unwrap().scrolls.push(pixels);
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str) -> Result<()> {
        self.log.lock().unwrap().waits += 1;
        if HtmlNode::select_document(self.document(), selector).is_empty() {
            return Err(anyhow!("timed out waiting for {}", selector));
        }
        Ok(())
    }

    async fn items(&mut self, selector: &str) -> Result<Vec<HtmlNode>> {
        Ok(HtmlNode::select_document(self.document(), selector))
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Hands out a single prepared `MockPage`
pub struct MockOpener {
    page: Mutex<Option<MockPage>>,
}

impl MockOpener {
    pub fn new(page: MockPage) -> Self {
        Self {
            page: Mutex::new(Some(page)),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: Mutex::new(None),
        }
    }
}

#[async_trait]
impl PageOpener for MockOpener {
    type Page = MockPage;

    async fn open_page(&self) -> Result<MockPage> {
        self.page
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow!("browser process exited"))
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// Image source answering with the URL's bytes, recording every request
#[derive(Default)]
pub struct MockImageSource {
    failing: HashSet<String>,
    hanging: HashSet<String>,
    requested: Mutex<Vec<String>>,
}

impl MockImageSource {
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn hanging(mut self, url: &str) -> Self {
        self.hanging.insert(url.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageSource for MockImageSource {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.requested.lock().unwrap().push(url.to_string());
        if self.hanging.contains(url) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing.contains(url) {
            bail!("HTTP 404");
        }
        Ok(url.as_bytes().to_vec())
    }
}

/// One fully populated results card
pub fn full_item(n: usize) -> String {
    format!(
        r#"<div class="iva-item-content-OWwoq"><img src="https://img.example/{n}.jpg"><div class="iva-item-body-GQomw"><a href="/item/{n}">Bicycle {n}</a></div><span>{n}0 000 ₽</span><div class="style-root-Dh2i5"><p>Seller {n}</p>4,7{n} reviews</div><div class="iva-item-bottomBlock-FhNhY"><p>Description {n}</p></div></div>"#
    )
}

/// A results card missing its description paragraph
pub fn item_without_description(n: usize) -> String {
    format!(
        r#"<div class="iva-item-content-OWwoq"><img src="https://img.example/{n}.jpg"><div class="iva-item-body-GQomw"><a href="/item/{n}">Bicycle {n}</a></div><span>{n}0 000 ₽</span></div>"#
    )
}

/// A results card with no image tag
pub fn item_without_image(n: usize) -> String {
    format!(
        r#"<div class="iva-item-content-OWwoq"><div class="iva-item-body-GQomw"><a href="/item/{n}">Bicycle {n}</a></div><span>{n}0 000 ₽</span><div class="iva-item-bottomBlock-FhNhY"><p>Description {n}</p></div></div>"#
    )
}

/// A results card with no title link
pub fn item_without_title(n: usize) -> String {
    format!(
        r#"<div class="iva-item-content-OWwoq"><img src="https://img.example/{n}.jpg"><span>{n}0 000 ₽</span><div class="iva-item-bottomBlock-FhNhY"><p>Description {n}</p></div></div>"#
    )
}

/// Wrap cards into a results document
pub fn results_page(items: &[String]) -> String {
    format!(
        "<html><head><title>Results</title></head><body><div class=\"items\">{}</div></body></html>",
        items.concat()
    )
}
