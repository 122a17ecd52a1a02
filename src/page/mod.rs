//! Page automation abstraction the scrape loop runs against.
//!
//! A driver exposes just enough of a rendered page to read a table and press
//! a button: query elements, read their text and attributes, click, wait.

#[cfg(feature = "browser")]
pub mod chromium;
pub mod html;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

// Not `Send`: scraper's parsed documents can't cross threads, and the loop
// never leaves the task it was started on.
#[async_trait(?Send)]
pub trait PageDriver {
    /// Handle to an element of the current page.
    type Element;

    /// All elements matching `selector`, in document order.
    async fn query_all(&mut self, selector: &str) -> Result<Vec<Self::Element>>;

    /// Descendants of `scope` matching `selector`, in document order.
    async fn query_in(&mut self, scope: &Self::Element, selector: &str)
        -> Result<Vec<Self::Element>>;

    /// First element matching `selector`.
    async fn query_first(&mut self, selector: &str) -> Result<Option<Self::Element>> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    /// Rendered text of `element`, untrimmed.
    async fn text(&mut self, element: &Self::Element) -> Result<String>;

    async fn has_attribute(&mut self, element: &Self::Element, name: &str) -> Result<bool>;

    /// Whether `element` is a disabled control.
    async fn is_disabled(&mut self, element: &Self::Element) -> Result<bool> {
        self.has_attribute(element, "disabled").await
    }

    /// Activate `element`. The page may re-render; handles obtained before
    /// the click should not be reused.
    async fn click(&mut self, element: &Self::Element) -> Result<()>;

    /// Give the page time to settle.
    async fn wait(&mut self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
