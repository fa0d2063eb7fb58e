use thiserror::Error;

/// Failures that reach the caller of an extraction session.
///
/// Missing fields, skipped items, failed image downloads and incomplete
/// attempts are all recovered inside the session and never show up here.
#[derive(Debug, Error)]
pub enum ScoutError {
    /// The results page could not be loaded at all
    #[error("failed to load search page {url}: {source}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// The browser collaborator could not hand out a page
    #[error("browser unavailable: {0}")]
    BrowserUnavailable(#[source] anyhow::Error),

    #[error("extraction session cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type ScoutResult<T> = std::result::Result<T, ScoutError>;
