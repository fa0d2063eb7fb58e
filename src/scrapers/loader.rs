use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

use super::traits::ResultsPage;

/// Drives scroll-triggered lazy loading of a results page
#[derive(Debug, Clone)]
pub struct IncrementalLoader {
    /// Element that must be present before moving to the next step
    pub item_selector: String,
    pub steps: usize,
    pub delay_per_step: Duration,
}

impl IncrementalLoader {
    pub fn new(item_selector: impl Into<String>, steps: usize, delay_per_step: Duration) -> Self {
        Self {
            item_selector: item_selector.into(),
            steps,
            delay_per_step,
        }
    }

    /// Scroll the page down in `steps` equal increments.
    ///
    /// The height is probed once up front. A zero height turns every step
    /// into a no-op scroll; the caller sees that as zero items.
    pub async fn load<P: ResultsPage + ?Sized>(&self, page: &mut P) -> Result<()> {
        let total_height = page.scroll_height().await?;
        let steps = self.steps.max(1);
        let step_size = total_height / steps as f64;
        debug!(
            total_height = total_height,
            steps = steps,
            delay_ms = self.delay_per_step.as_millis() as u64,
            "Starting incremental scroll"
        );

        for step in 0..steps {
            page.scroll_by(step_size).await?;
            if let Err(e) = page.wait_for(&self.item_selector).await {
                warn!(step = step, "No result items appeared after scroll: {}", e);
            }
            tokio::time::sleep(self.delay_per_step).await;
        }

        debug!("Incremental scroll finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::testing::MockPage;

    #[tokio::test]
    async fn test_scrolls_in_equal_increments() {
        let mut page = MockPage::new(vec![String::new()]).with_height(1400.0);
        let loader = IncrementalLoader::new("div.item", 14, Duration::ZERO);

        loader.load(&mut page).await.unwrap();

        let log = page.log();
        assert_eq!(log.scrolls.len(), 14);
        assert!(log.scrolls.iter().all(|dy| (*dy - 100.0).abs() < f64::EPSILON));
        assert_eq!(log.waits, 14);
    }

    #[tokio::test]
    async fn test_empty_page_scrolls_are_noops() {
        let mut page = MockPage::new(vec![String::new()]).with_height(0.0);
        let loader = IncrementalLoader::new("div.item", 4, Duration::ZERO);

        loader.load(&mut page).await.unwrap();

        assert_eq!(page.log().scrolls, vec![0.0; 4]);
    }
}
