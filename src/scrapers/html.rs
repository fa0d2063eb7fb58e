use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::traits::ItemNode;

/// An element snapshot backed by its outer HTML.
///
/// Each query re-parses the fragment so the node stays `Send` and owns no
/// borrowed tree.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlNode {
    html: String,
}

impl HtmlNode {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn from_element(element: ElementRef<'_>) -> Self {
        Self::new(element.html())
    }

    /// Select every element matching `selector` in a full document
    pub fn select_document(document: &str, selector: &str) -> Vec<Self> {
        let Some(selector) = parse_selector(selector) else {
            return Vec::new();
        };
        let document = Html::parse_document(document);
        document.select(&selector).map(Self::from_element).collect()
    }

    fn with_element<R>(&self, default: R, f: impl FnOnce(ElementRef<'_>) -> R) -> R {
        let fragment = Html::parse_fragment(&self.html);
        let element = fragment
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .next();
        match element {
            Some(element) => f(element),
            None => default,
        }
    }
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(selector) => Some(selector),
        Err(e) => {
            debug!("Invalid selector {:?}: {:?}", selector, e);
            None
        }
    }
}

/// Text of `element` without script or style contents, whitespace runs
/// collapsed to single spaces
fn visible_text(element: ElementRef<'_>) -> String {
    let mut words: Vec<&str> = Vec::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|parent| matches!(parent.value().name(), "script" | "style"));
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

impl ItemNode for HtmlNode {
    fn select_first(&self, selector: &str) -> Option<Self> {
        let selector = parse_selector(selector)?;
        self.with_element(None, |element| {
            element.select(&selector).next().map(Self::from_element)
        })
    }

    fn select_all(&self, selector: &str) -> Vec<Self> {
        let Some(selector) = parse_selector(selector) else {
            return Vec::new();
        };
        self.with_element(Vec::new(), |element| {
            element.select(&selector).map(Self::from_element).collect()
        })
    }

    fn text(&self) -> String {
        self.with_element(String::new(), visible_text)
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.with_element(None, |element| {
            element.value().attr(name).map(str::to_string)
        })
    }
}
