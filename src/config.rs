use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};

use crate::error::{ScoutError, ScoutResult};
use crate::scrapers::types::SiteSelectors;

/// What a retry does with listings collected by earlier attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryMode {
    /// Each attempt replaces the working set
    #[default]
    Replace,
    /// Attempts append to the working set, capped at the item limit.
    /// The same listing can appear more than once.
    Accumulate,
}

impl FromStr for RetryMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "accumulate" => Ok(Self::Accumulate),
            other => Err(format!("unknown retry mode `{}`", other)),
        }
    }
}

/// Scraper configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    /// Results page URL with a `{query}` placeholder
    pub search_url: String,
    pub item_limit: usize,
    pub max_attempts: usize,
    pub scroll_steps: usize,
    pub scroll_delay: Duration,
    pub navigation_timeout: Duration,
    pub element_wait: Duration,
    pub image_timeout: Duration,
    pub image_concurrency: usize,
    pub accept_invalid_certs: bool,
    pub retry_mode: RetryMode,
    pub headless: bool,
    pub selectors: SiteSelectors,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.avito.ru/all?q={query}".to_string(),
            item_limit: 50,
            max_attempts: 3,
            scroll_steps: 14,
            scroll_delay: Duration::from_millis(1000),
            navigation_timeout: Duration::from_secs(60),
            element_wait: Duration::from_secs(10),
            image_timeout: Duration::from_secs(5),
            image_concurrency: 8,
            accept_invalid_certs: false,
            retry_mode: RetryMode::Replace,
            headless: true,
            selectors: SiteSelectors::default(),
        }
    }
}

impl ScoutConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = Self::default();
        let config = Self {
            search_url: env::var("SCOUT_SEARCH_URL").unwrap_or(defaults.search_url),
            item_limit: parse_var("SCOUT_ITEM_LIMIT", defaults.item_limit)?,
            max_attempts: parse_var("SCOUT_MAX_ATTEMPTS", defaults.max_attempts)?,
            scroll_steps: parse_var("SCOUT_SCROLL_STEPS", defaults.scroll_steps)?,
            scroll_delay: Duration::from_millis(parse_var(
                "SCOUT_SCROLL_DELAY_MS",
                defaults.scroll_delay.as_millis() as u64,
            )?),
            navigation_timeout: Duration::from_secs(parse_var(
                "SCOUT_NAVIGATION_TIMEOUT_SECS",
                defaults.navigation_timeout.as_secs(),
            )?),
            element_wait: Duration::from_secs(parse_var(
                "SCOUT_ELEMENT_WAIT_SECS",
                defaults.element_wait.as_secs(),
            )?),
            image_timeout: Duration::from_secs(parse_var(
                "SCOUT_IMAGE_TIMEOUT_SECS",
                defaults.image_timeout.as_secs(),
            )?),
            image_concurrency: parse_var("SCOUT_IMAGE_CONCURRENCY", defaults.image_concurrency)?,
            accept_invalid_certs: parse_var(
                "SCOUT_ACCEPT_INVALID_CERTS",
                defaults.accept_invalid_certs,
            )?,
            retry_mode: match env::var("SCOUT_RETRY_MODE") {
                Ok(raw) => raw
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))
                    .context("SCOUT_RETRY_MODE must be `replace` or `accumulate`")?,
                Err(_) => defaults.retry_mode,
            },
            headless: parse_var("SCOUT_HEADLESS", defaults.headless)?,
            selectors: defaults.selectors,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the session cannot run with
    pub fn validate(&self) -> ScoutResult<()> {
        if !self.search_url.contains("{query}") {
            return Err(ScoutError::Config(
                "search URL must contain a {query} placeholder".into(),
            ));
        }
        for (name, value) in [
            ("item limit", self.item_limit),
            ("max attempts", self.max_attempts),
            ("scroll steps", self.scroll_steps),
            ("image concurrency", self.image_concurrency),
        ] {
            if value == 0 {
                return Err(ScoutError::Config(format!("{} must be greater than 0", name)));
            }
        }
        self.selectors.validate()
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value, got `{}`", name, raw)),
        Err(_) => Ok(default),
    }
}
