use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Placeholder some pages put where an image URL should be
const NO_PHOTO_PLACEHOLDER: &str = "Нет фото";

/// Something that can download image bytes for a URL
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// `ImageSource` over a reqwest client
pub struct HttpImageSource {
    client: Client,
}

impl HttpImageSource {
    /// Build the HTTP client.
    ///
    /// `accept_invalid_certs` disables TLS certificate checks. It exists for
    /// image CDNs with broken chains and is off unless configured.
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        if accept_invalid_certs {
            warn!("TLS certificate verification disabled for image downloads");
        }

        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch image")?;

        if response.status() != reqwest::StatusCode::OK {
            anyhow::bail!("unexpected status {}", response.status());
        }

        let bytes = response.bytes().await.context("Failed to read image body")?;
        Ok(bytes.to_vec())
    }
}

/// Downloads listing images in parallel with a bounded number of requests in flight
pub struct ImageFetcher {
    source: Arc<dyn ImageSource>,
    timeout: Duration,
    concurrency: usize,
}

impl ImageFetcher {
    pub fn new(source: Arc<dyn ImageSource>, timeout: Duration, concurrency: usize) -> Self {
        Self {
            source,
            timeout,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch every URL, returning results aligned with `urls`.
    ///
    /// Absent URLs produce `None` without a request. Failures and timeouts
    /// produce `None` for their slot only. Cancelling `cancel` abandons
    /// fetches still in flight.
    pub async fn fetch_all(
        &self,
        urls: &[Option<String>],
        cancel: &CancellationToken,
    ) -> Vec<Option<Vec<u8>>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let requested = urls.iter().flatten().filter(|u| is_fetchable(u)).count();
        info!(
            total = urls.len(),
            requested = requested,
            concurrency = self.concurrency,
            "Fetching listing images"
        );

        let mut handles = Vec::with_capacity(urls.len());
        for url in urls {
            let url = match url {
                Some(url) if is_fetchable(url) => url.clone(),
                _ => {
                    handles.push(None);
                    continue;
                }
            };

            let source = self.source.clone();
            let sem = semaphore.clone();
            let cancel = cancel.clone();
            let timeout = self.timeout;

            let handle = tokio::spawn(async move {
                let fetch = async {
                    let _permit = sem.acquire().await.ok()?;
                    match tokio::time::timeout(timeout, source.get(&url)).await {
                        Ok(Ok(bytes)) => {
                            debug!(url = %url, bytes = bytes.len(), "Image downloaded");
                            Some(bytes)
                        }
                        Ok(Err(e)) => {
                            warn!(url = %url, "Image download failed: {:#}", e);
                            None
                        }
                        Err(_) => {
                            warn!(url = %url, timeout_ms = timeout.as_millis() as u64, "Image download timed out");
                            None
                        }
                    }
                };

                tokio::select! {
                    _ = cancel.cancelled() => None,
                    result = fetch => result,
                }
            });
            handles.push(Some(handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let data = match handle {
                Some(handle) => handle.await.unwrap_or_else(|e| {
                    warn!("Image task failed: {}", e);
                    None
                }),
                None => None,
            };
            results.push(data);
        }

        let fetched = results.iter().filter(|r| r.is_some()).count();
        info!(fetched = fetched, requested = requested, "Image fetch finished");
        results
    }
}

fn is_fetchable(url: &str) -> bool {
    !url.trim().is_empty() && url != NO_PHOTO_PLACEHOLDER
}
