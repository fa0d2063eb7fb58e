pub mod browser;
pub mod extractor;
pub mod html;
pub mod images;
pub mod loader;
pub mod session;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use browser::{ChromeBrowser, ChromePage};
pub use extractor::{FieldExtractor, Gap};
pub use html::HtmlNode;
pub use images::{HttpImageSource, ImageFetcher, ImageSource};
pub use loader::IncrementalLoader;
pub use session::{ExtractionController, ExtractionSession, SessionReport, SessionState};
pub use traits::{ItemNode, PageOpener, ResultsPage};
pub use types::{SearchParams, SiteSelectors};
