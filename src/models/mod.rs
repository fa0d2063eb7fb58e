use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seller name used when the listing has no seller block
pub const UNSPECIFIED: &str = "unspecified";

/// Rating / review placeholder when the seller block is missing entirely
pub const NOT_PROVIDED: &str = "not provided";

/// Description placeholder when the bottom block has no text
pub const NO_DESCRIPTION: &str = "no description";

/// Prefix put on review text when a seller block exists without a name
pub const NO_SELLER_NAME: &str = "no seller name:";

/// One listing extracted from a search results item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    /// Raw display text, e.g. "12 500 ₽"
    pub price: String,
    pub seller_name: String,
    /// `None` only when a seller block exists but carries no seller name
    pub seller_rating: Option<String>,
    pub review_count: String,
    pub description: String,
    pub image_url: Option<String>,
    /// Filled in by the image fetch phase
    #[serde(skip)]
    pub image_data: Option<Vec<u8>>,
    pub scraped_at: DateTime<Utc>,
}

impl Listing {
    pub fn has_image_url(&self) -> bool {
        self.image_url.is_some()
    }

    pub fn has_description(&self) -> bool {
        self.description != NO_DESCRIPTION
    }

    /// First `max_chars` characters of the description, for report previews
    pub fn summary(&self, max_chars: usize) -> &str {
        match self.description.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.description[..idx],
            None => &self.description,
        }
    }
}
