use serde::{Deserialize, Serialize};

use crate::error::{ScoutError, ScoutResult};

/// Parameters for one search session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    /// Free-text query, or a full search URL
    pub query: String,
    /// Maximum number of listings returned
    pub item_limit: usize,
    /// Maximum number of load/extract attempts
    pub max_attempts: usize,
}

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Reject limits a session cannot run with
    pub fn validate(&self) -> ScoutResult<()> {
        if self.query.trim().is_empty() {
            return Err(ScoutError::Config("query must not be empty".into()));
        }
        if self.item_limit == 0 {
            return Err(ScoutError::Config("item limit must be greater than 0".into()));
        }
        if self.max_attempts == 0 {
            return Err(ScoutError::Config("max attempts must be greater than 0".into()));
        }
        Ok(())
    }

    /// Build the results page URL from a `{query}` template.
    ///
    /// Spaces become `+`; nothing else is escaped, so callers must sanitize
    /// hostile input themselves. A query that already is a URL is used as is.
    pub fn search_url(&self, template: &str) -> String {
        let query = self.query.trim().replace(' ', "+");
        if query.starts_with("http://") || query.starts_with("https://") {
            return query;
        }
        template.replace("{query}", &query)
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            query: String::new(),
            item_limit: 50,
            max_attempts: 3,
        }
    }
}

/// CSS selectors for the parts of a results item.
///
/// The extractor's rules are driven entirely by this table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSelectors {
    /// One search result card
    pub item: String,
    pub image: String,
    /// Attribute holding the image URL
    pub image_attr: String,
    /// Body container holding the title link
    pub title_block: String,
    pub title_link: String,
    /// First price-bearing text element
    pub price: String,
    pub seller_block: String,
    pub seller_name: String,
    pub description_block: String,
    pub description_text: String,
}

impl SiteSelectors {
    /// Check that every selector parses
    pub fn validate(&self) -> ScoutResult<()> {
        let fields = [
            ("item", &self.item),
            ("image", &self.image),
            ("title_block", &self.title_block),
            ("title_link", &self.title_link),
            ("price", &self.price),
            ("seller_block", &self.seller_block),
            ("seller_name", &self.seller_name),
            ("description_block", &self.description_block),
            ("description_text", &self.description_text),
        ];

        for (name, selector) in fields {
            if scraper::Selector::parse(selector).is_err() {
                return Err(ScoutError::Config(format!(
                    "selector `{}` for {} does not parse",
                    selector, name
                )));
            }
        }

        if self.image_attr.trim().is_empty() {
            return Err(ScoutError::Config("image_attr must not be empty".into()));
        }

        Ok(())
    }
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            item: "div.iva-item-content-OWwoq".to_string(),
            image: "img".to_string(),
            image_attr: "src".to_string(),
            title_block: "div.iva-item-body-GQomw".to_string(),
            title_link: "a".to_string(),
            price: "span".to_string(),
            seller_block: "div.style-root-Dh2i5".to_string(),
            seller_name: "p".to_string(),
            description_block: "div.iva-item-bottomBlock-FhNhY".to_string(),
            description_text: "p".to_string(),
        }
    }
}
