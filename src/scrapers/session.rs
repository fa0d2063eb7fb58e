use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::extractor::FieldExtractor;
use super::images::{HttpImageSource, ImageFetcher, ImageSource};
use super::loader::IncrementalLoader;
use super::traits::{PageOpener, ResultsPage};
use super::types::SearchParams;
use crate::config::{RetryMode, ScoutConfig};
use crate::error::{ScoutError, ScoutResult};
use crate::models::Listing;

/// Where an extraction session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Navigating,
    Loading,
    Extracting,
    Incomplete,
    Complete,
    Fetching,
    Done,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Working state for one query
#[derive(Debug)]
pub struct ExtractionSession {
    pub query: String,
    pub item_limit: usize,
    pub max_attempts: usize,
    pub attempts_used: usize,
    /// In results page order
    pub collected: Vec<Listing>,
    complete: bool,
    state: SessionState,
}

impl ExtractionSession {
    pub fn new(params: &SearchParams) -> Self {
        Self {
            query: params.query.clone(),
            item_limit: params.item_limit,
            max_attempts: params.max_attempts,
            attempts_used: 0,
            collected: Vec::new(),
            complete: false,
            state: SessionState::Created,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!(query = %self.query, from = %self.state, to = %next, "Session state change");
        self.state = next;
    }

    fn absorb(&mut self, listings: Vec<Listing>, mode: RetryMode) {
        match mode {
            RetryMode::Replace => {
                self.collected = listings;
                self.collected.truncate(self.item_limit);
            }
            RetryMode::Accumulate => {
                let room = self.item_limit.saturating_sub(self.collected.len());
                self.collected.extend(listings.into_iter().take(room));
            }
        }
    }
}

/// What a finished session hands to the report renderer
#[derive(Debug)]
pub struct SessionReport {
    pub listings: Vec<Listing>,
    pub attempts_used: usize,
    /// `false` when attempts ran out before a full yield
    pub complete: bool,
}

/// Result of extracting one attempt's items
struct AttemptYield {
    listings: Vec<Listing>,
    considered: usize,
    skipped: usize,
}

impl AttemptYield {
    /// Every considered item produced an image reference and a description
    fn is_complete(&self) -> bool {
        let with_images = self.listings.iter().filter(|l| l.has_image_url()).count();
        let with_descriptions = self.listings.iter().filter(|l| l.has_description()).count();
        with_images >= self.considered && with_descriptions >= self.considered
    }
}

/// Runs the navigate / load / extract / retry / fetch cycle for a query
pub struct ExtractionController<O: PageOpener> {
    opener: O,
    loader: IncrementalLoader,
    extractor: FieldExtractor,
    fetcher: ImageFetcher,
    search_url: String,
    retry_mode: RetryMode,
}

impl<O: PageOpener> ExtractionController<O> {
    /// Build a controller that downloads images over HTTP
    pub fn new(opener: O, config: &ScoutConfig) -> ScoutResult<Self> {
        let source = HttpImageSource::new(config.image_timeout, config.accept_invalid_certs)
            .map_err(|e| ScoutError::Config(format!("{:#}", e)))?;
        Self::with_image_source(opener, config, Arc::new(source))
    }

    pub fn with_image_source(
        opener: O,
        config: &ScoutConfig,
        source: Arc<dyn ImageSource>,
    ) -> ScoutResult<Self> {
        config.validate()?;

        Ok(Self {
            opener,
            loader: IncrementalLoader::new(
                config.selectors.item.clone(),
                config.scroll_steps,
                config.scroll_delay,
            ),
            extractor: FieldExtractor::new(config.selectors.clone()),
            fetcher: ImageFetcher::new(source, config.image_timeout, config.image_concurrency),
            search_url: config.search_url.clone(),
            retry_mode: config.retry_mode,
        })
    }

    /// Run one session for `params`.
    ///
    /// Only a failed initial navigation, an unavailable browser or
    /// cancellation produce an error. Running out of attempts returns the
    /// best result so far with `complete == false`.
    pub async fn run(
        &self,
        params: &SearchParams,
        cancel: &CancellationToken,
    ) -> ScoutResult<SessionReport> {
        params.validate()?;
        let url = params.search_url(&self.search_url);
        info!(
            query = %params.query,
            url = %url,
            item_limit = params.item_limit,
            max_attempts = params.max_attempts,
            backend = self.opener.backend_name(),
            "Starting extraction session"
        );

        let mut session = ExtractionSession::new(params);
        let mut page = self
            .opener
            .open_page()
            .await
            .map_err(ScoutError::BrowserUnavailable)?;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ScoutError::Cancelled),
            result = self.crawl(&mut page, &mut session, &url) => result,
        };

        if let Err(e) = page.close().await {
            warn!("Failed to close page: {:#}", e);
        }
        outcome?;

        session.transition(SessionState::Fetching);
        let urls: Vec<Option<String>> = session
            .collected
            .iter()
            .map(|listing| listing.image_url.clone())
            .collect();
        let images = self.fetcher.fetch_all(&urls, cancel).await;
        if cancel.is_cancelled() {
            return Err(ScoutError::Cancelled);
        }
        for (listing, data) in session.collected.iter_mut().zip(images) {
            listing.image_data = data;
        }

        session.transition(SessionState::Done);
        info!(
            query = %session.query,
            listings = session.collected.len(),
            attempts = session.attempts_used,
            complete = session.complete,
            "Extraction session finished"
        );

        Ok(SessionReport {
            listings: session.collected,
            attempts_used: session.attempts_used,
            complete: session.complete,
        })
    }

    async fn crawl(
        &self,
        page: &mut O::Page,
        session: &mut ExtractionSession,
        url: &str,
    ) -> ScoutResult<()> {
        session.transition(SessionState::Navigating);
        page.navigate(url)
            .await
            .map_err(|source| ScoutError::Navigation {
                url: url.to_string(),
                source,
            })?;

        while session.attempts_used < session.max_attempts {
            session.attempts_used += 1;
            info!(
                attempt = session.attempts_used,
                max_attempts = session.max_attempts,
                "Loading results"
            );

            session.transition(SessionState::Loading);
            if let Err(e) = self.loader.load(page).await {
                warn!("Scrolling failed, extracting what is rendered: {:#}", e);
            }

            session.transition(SessionState::Extracting);
            let attempt = self.extract_attempt(page, session.item_limit).await;
            let complete = attempt.is_complete();
            info!(
                considered = attempt.considered,
                extracted = attempt.listings.len(),
                skipped = attempt.skipped,
                "Attempt extracted"
            );
            session.absorb(attempt.listings, self.retry_mode);

            if complete {
                session.complete = true;
                session.transition(SessionState::Complete);
                break;
            }

            session.transition(SessionState::Incomplete);
            if session.attempts_used >= session.max_attempts {
                break;
            }
            warn!("Not enough data on the page, reloading and trying again");
            if let Err(e) = page.reload().await {
                warn!("Reload failed, navigating to the results page again: {:#}", e);
                if let Err(e) = page.navigate(url).await {
                    warn!("Navigation retry failed, next attempt uses the current page: {:#}", e);
                }
            }
        }

        if !session.complete {
            warn!(
                attempts = session.attempts_used,
                collected = session.collected.len(),
                "Giving up on a complete result set"
            );
        }
        Ok(())
    }

    async fn extract_attempt(&self, page: &mut O::Page, item_limit: usize) -> AttemptYield {
        let nodes = match page.items(&self.extractor.selectors().item).await {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!("Failed to enumerate result items: {:#}", e);
                Vec::new()
            }
        };
        info!("Found {} items on the page", nodes.len());

        let considered = nodes.len().min(item_limit);
        let mut listings = Vec::with_capacity(considered);
        let mut skipped = 0;

        for (idx, node) in nodes.iter().take(considered).enumerate() {
            match self.extractor.extract(node) {
                Ok(listing) => listings.push(listing),
                Err(gap) => {
                    debug!(item = idx, "Skipping item: {}", gap);
                    skipped += 1;
                }
            }
        }

        AttemptYield {
            listings,
            considered,
            skipped,
        }
    }
}
