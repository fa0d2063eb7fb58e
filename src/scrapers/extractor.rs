use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use super::traits::ItemNode;
use super::types::SiteSelectors;
use crate::models::{Listing, NOT_PROVIDED, NO_DESCRIPTION, NO_SELLER_NAME, UNSPECIFIED};

/// Title extraction failed, so the item is left out of the results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Gap {
    #[error("item has no title block")]
    TitleBlock,
    #[error("title block has no link")]
    TitleLink,
    #[error("title link has no text")]
    TitleText,
}

#[derive(Debug, Clone, PartialEq)]
struct SellerInfo {
    name: String,
    rating: Option<String>,
    reviews: String,
}

/// Maps one rendered results item to a `Listing`
#[derive(Debug, Clone, Default)]
pub struct FieldExtractor {
    selectors: SiteSelectors,
}

impl FieldExtractor {
    pub fn new(selectors: SiteSelectors) -> Self {
        Self { selectors }
    }

    pub fn selectors(&self) -> &SiteSelectors {
        &self.selectors
    }

    /// Extract every field from `node`.
    ///
    /// Optional fields fall back to sentinel values; only a missing title
    /// yields a `Gap`. Call once per node.
    pub fn extract<N: ItemNode>(&self, node: &N) -> Result<Listing, Gap> {
        let image_url = self.image_url(node);
        let title = self.title(node)?;
        let price = self.price(node);
        let seller = self.seller(node);
        let description = self.description(node);

        debug!(
            title = %title,
            price = %price,
            seller = %seller.name,
            has_image = image_url.is_some(),
            "Extracted listing"
        );

        Ok(Listing {
            title,
            price,
            seller_name: seller.name,
            seller_rating: seller.rating,
            review_count: seller.reviews,
            description,
            image_url,
            image_data: None,
            scraped_at: Utc::now(),
        })
    }

    fn image_url<N: ItemNode>(&self, node: &N) -> Option<String> {
        node.select_first(&self.selectors.image)?
            .attr(&self.selectors.image_attr)
            .map(|src| src.trim().to_string())
            .filter(|src| !src.is_empty())
    }

    fn title<N: ItemNode>(&self, node: &N) -> Result<String, Gap> {
        let block = node
            .select_first(&self.selectors.title_block)
            .ok_or(Gap::TitleBlock)?;
        let link = block
            .select_first(&self.selectors.title_link)
            .ok_or(Gap::TitleLink)?;
        let text = link.text().trim().to_string();
        if text.is_empty() {
            return Err(Gap::TitleText);
        }
        Ok(text)
    }

    fn price<N: ItemNode>(&self, node: &N) -> String {
        node.select_first(&self.selectors.price)
            .map(|el| el.text())
            .unwrap_or_else(|| NOT_PROVIDED.to_string())
    }

    fn seller<N: ItemNode>(&self, node: &N) -> SellerInfo {
        let Some(block) = node.select_first(&self.selectors.seller_block) else {
            return SellerInfo {
                name: UNSPECIFIED.to_string(),
                rating: Some(NOT_PROVIDED.to_string()),
                reviews: NOT_PROVIDED.to_string(),
            };
        };

        let combined = block.text();
        match block.select_first(&self.selectors.seller_name) {
            Some(name_el) => {
                let name = name_el.text().trim().to_string();
                let (rating, reviews) = split_rating(&combined, &name);
                SellerInfo {
                    name,
                    rating: Some(rating),
                    reviews,
                }
            }
            None => SellerInfo {
                name: UNSPECIFIED.to_string(),
                rating: None,
                reviews: format!("{} {}", NO_SELLER_NAME, collapse_whitespace(&combined)),
            },
        }
    }

    fn description<N: ItemNode>(&self, node: &N) -> String {
        node.select_all(&self.selectors.description_block)
            .first()
            .and_then(|block| block.select_first(&self.selectors.description_text))
            .map(|p| p.text().trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string())
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split seller block text into rating (first 3 chars) and review count.
///
/// The seller name is removed from the front first; if the block text does
/// not start with it, the whole text is used. Layout whitespace around the
/// parts is dropped.
fn split_rating(combined: &str, name: &str) -> (String, String) {
    let combined = collapse_whitespace(combined);
    let name = collapse_whitespace(name);
    let rest = combined
        .strip_prefix(name.as_str())
        .unwrap_or(&combined)
        .trim_start();
    match rest.char_indices().nth(3) {
        Some((idx, _)) => (rest[..idx].to_string(), rest[idx..].trim().to_string()),
        None => (rest.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::html::HtmlNode;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(SiteSelectors::default())
    }

    const FULL_ITEM: &str = r#"<div class="iva-item-content-OWwoq"><img src="https://img.example/bike.jpg"><img src="https://img.example/other.jpg"><div class="iva-item-body-GQomw"><a href="/bike">Mountain bike</a></div><span>15 000 ₽</span><div class="style-root-Dh2i5"><p>Velo Shop</p>
4,9
128 reviews</div><div class="iva-item-bottomBlock-FhNhY"><p>  Full suspension, 21 gears.  </p></div></div>"#;

    #[test]
    fn test_full_item() {
        let listing = extractor().extract(&HtmlNode::new(FULL_ITEM)).unwrap();
        assert_eq!(listing.title, "Mountain bike");
        assert_eq!(listing.price, "15 000 ₽");
        assert_eq!(listing.image_url.as_deref(), Some("https://img.example/bike.jpg"));
        assert_eq!(listing.seller_name, "Velo Shop");
        assert_eq!(listing.seller_rating.as_deref(), Some("4,9"));
        assert_eq!(listing.review_count, "128 reviews");
        assert_eq!(listing.description, "Full suspension, 21 gears.");
        assert!(listing.image_data.is_none());
    }

    #[test]
    fn test_missing_title_block_is_gap() {
        let node = HtmlNode::new(
            r#"<div class="iva-item-content-OWwoq"><img src="x.jpg"><span>1 ₽</span></div>"#,
        );
        assert_eq!(extractor().extract(&node).unwrap_err(), Gap::TitleBlock);
    }

    #[test]
    fn test_missing_title_link_is_gap() {
        let node = HtmlNode::new(
            r#"<div class="iva-item-content-OWwoq"><div class="iva-item-body-GQomw">Bike</div></div>"#,
        );
        assert_eq!(extractor().extract(&node).unwrap_err(), Gap::TitleLink);
    }

    #[test]
    fn test_empty_title_text_is_gap() {
        let node = HtmlNode::new(
            r#"<div class="iva-item-content-OWwoq"><div class="iva-item-body-GQomw"><a href="/x">  </a></div></div>"#,
        );
        assert_eq!(extractor().extract(&node).unwrap_err(), Gap::TitleText);
    }

    #[test]
    fn test_absent_seller_block() {
        let node = HtmlNode::new(
            r#"<div class="iva-item-content-OWwoq"><div class="iva-item-body-GQomw"><a>Bike</a></div><span>100 ₽</span></div>"#,
        );
        let listing = extractor().extract(&node).unwrap();
        assert_eq!(listing.seller_name, UNSPECIFIED);
        assert_eq!(listing.seller_rating.as_deref(), Some(NOT_PROVIDED));
        assert_eq!(listing.review_count, NOT_PROVIDED);
        assert_eq!(listing.description, NO_DESCRIPTION);
        assert!(listing.image_url.is_none());
    }

    #[test]
    fn test_seller_block_without_name() {
        let node = HtmlNode::new(
            "<div class=\"iva-item-content-OWwoq\"><div class=\"iva-item-body-GQomw\"><a>Bike</a></div><div class=\"style-root-Dh2i5\">5,0\n3 reviews</div></div>",
        );
        let listing = extractor().extract(&node).unwrap();
        assert_eq!(listing.seller_name, UNSPECIFIED);
        assert!(listing.seller_rating.is_none());
        assert_eq!(listing.review_count, "no seller name: 5,0 3 reviews");
    }

    #[test]
    fn test_image_without_src() {
        let node = HtmlNode::new(
            r#"<div class="iva-item-content-OWwoq"><img alt="none"><div class="iva-item-body-GQomw"><a>Bike</a></div></div>"#,
        );
        assert!(extractor().extract(&node).unwrap().image_url.is_none());
    }

    #[test]
    fn test_description_block_without_paragraph() {
        let node = HtmlNode::new(
            r#"<div class="iva-item-content-OWwoq"><div class="iva-item-body-GQomw"><a>Bike</a></div><div class="iva-item-bottomBlock-FhNhY"><span>Delivery</span></div></div>"#,
        );
        assert_eq!(extractor().extract(&node).unwrap().description, NO_DESCRIPTION);
    }

    #[test]
    fn test_split_rating() {
        assert_eq!(
            split_rating("Shop4,5\n17 reviews", "Shop"),
            ("4,5".to_string(), "17 reviews".to_string())
        );
        assert_eq!(split_rating("Shop5", "Shop"), ("5".to_string(), String::new()));
        assert_eq!(
            split_rating("4,8 отзывы", "Other"),
            ("4,8".to_string(), "отзывы".to_string())
        );
        assert_eq!(
            split_rating("  Velo\n Shop \n 4,9\n  128 reviews ", " Velo Shop"),
            ("4,9".to_string(), "128 reviews".to_string())
        );
    }

    #[test]
    fn test_pretty_printed_seller_block() {
        let node = HtmlNode::new(
            r#"<div class="iva-item-content-OWwoq">
                <div class="iva-item-body-GQomw"><a href="/bike">Bike</a></div>
                <div class="style-root-Dh2i5">
                    <p>
                        Velo Shop
                    </p>
                    <span>4,9</span>
                    <span>128 reviews</span>
                </div>
            </div>"#,
        );
        let listing = extractor().extract(&node).unwrap();
        assert_eq!(listing.seller_name, "Velo Shop");
        assert_eq!(listing.seller_rating.as_deref(), Some("4,9"));
        assert_eq!(listing.review_count, "128 reviews");
    }
}
