use anyhow::Result;
use async_trait::async_trait;

/// A rendered DOM node that can be queried with CSS selectors.
///
/// Nodes are snapshots: querying one never touches the live page.
pub trait ItemNode: Sized + Send {
    /// First descendant matching `selector`
    fn select_first(&self, selector: &str) -> Option<Self>;

    /// All descendants matching `selector`, in document order
    fn select_all(&self, selector: &str) -> Vec<Self>;

    /// Visible text content with whitespace runs collapsed
    fn text(&self) -> String;

    /// Attribute value on the node itself
    fn attr(&self, name: &str) -> Option<String>;
}

/// One browser page showing search results
#[async_trait]
pub trait ResultsPage: Send {
    type Node: ItemNode;

    async fn navigate(&mut self, url: &str) -> Result<()>;

    async fn reload(&mut self) -> Result<()>;

    /// Current scrollable height of the document body in pixels
    async fn scroll_height(&mut self) -> Result<f64>;

    async fn scroll_by(&mut self, pixels: f64) -> Result<()>;

    /// Wait until at least one element matches `selector`
    async fn wait_for(&mut self, selector: &str) -> Result<()>;

    /// Snapshot every element matching `selector`
    async fn items(&mut self, selector: &str) -> Result<Vec<Self::Node>>;

    async fn close(&mut self) -> Result<()>;
}

/// Hands out pages from the browser-automation collaborator
#[async_trait]
pub trait PageOpener: Send + Sync {
    type Page: ResultsPage;

    async fn open_page(&self) -> Result<Self::Page>;

    /// Name of the browser backend, for logs
    fn backend_name(&self) -> &'static str;
}
