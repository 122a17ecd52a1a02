//! Live page driven through a Chromium instance over CDP.
//!
//! Needed when the ratings table is rendered client-side and paging is
//! script-driven, which the plain HTML driver can't follow.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::PageDriver;
use crate::settings::BrowserSettings;

const RENDER_POLL: Duration = Duration::from_millis(250);

pub struct ChromiumPage {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumPage {
    /// Launch Chromium, open `url` and wait until at least one element
    /// matching `ready_selector` has rendered (or the navigation timeout
    /// runs out).
    pub async fn launch(settings: &BrowserSettings, url: &str, ready_selector: &str) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_secs(settings.request_timeout_secs))
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if let Some(dir) = &settings.user_data_dir {
            builder = builder.user_data_dir(dir);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("Failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler: {e}");
                }
            }
        });

        let opened = async {
            let page = browser
                .new_page(url)
                .await
                .with_context(|| format!("Failed to open {url}"))?;
            page.wait_for_navigation()
                .await
                .with_context(|| format!("Navigation to {url} failed"))?;
            anyhow::Ok(page)
        }
        .await;
        let page = match opened {
            Ok(page) => page,
            Err(e) => {
                if let Err(close) = browser.close().await {
                    debug!("Closing Chromium after failed open: {close}");
                }
                let _ = browser.wait().await;
                handler.abort();
                return Err(e);
            }
        };
        info!("Opened {url}");

        let mut this = Self {
            browser,
            page,
            handler,
        };
        this.wait_for_render(
            ready_selector,
            Duration::from_secs(settings.navigation_timeout_secs),
        )
        .await;
        Ok(this)
    }

    /// The table is filled in by script after load; poll for its rows.
    async fn wait_for_render(&mut self, selector: &str, limit: Duration) {
        let start = Instant::now();
        loop {
            match self.page.find_elements(selector).await {
                Ok(found) if !found.is_empty() => {
                    debug!("{} rows rendered after {:?}", found.len(), start.elapsed());
                    return;
                }
                Ok(_) => {}
                Err(e) => debug!("Waiting for {selector}: {e}"),
            }
            if start.elapsed() >= limit {
                warn!("Nothing matched {selector:?} after {limit:?}; reading the page anyway");
                return;
            }
            tokio::time::sleep(RENDER_POLL).await;
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await.context("Failed to close Chromium")?;
        if let Err(e) = self.browser.wait().await {
            debug!("Chromium exit: {e}");
        }
        self.handler.abort();
        Ok(())
    }
}

#[async_trait(?Send)]
impl PageDriver for ChromiumPage {
    type Element = Element;

    async fn query_all(&mut self, selector: &str) -> Result<Vec<Element>> {
        self.page
            .find_elements(selector)
            .await
            .with_context(|| format!("Query {selector:?} failed"))
    }

    async fn query_in(&mut self, scope: &Element, selector: &str) -> Result<Vec<Element>> {
        scope
            .find_elements(selector)
            .await
            .with_context(|| format!("Query {selector:?} failed"))
    }

    async fn text(&mut self, element: &Element) -> Result<String> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn has_attribute(&mut self, element: &Element, name: &str) -> Result<bool> {
        Ok(element.attribute(name).await?.is_some())
    }

    async fn is_disabled(&mut self, element: &Element) -> Result<bool> {
        if self.has_attribute(element, "disabled").await? {
            return Ok(true);
        }
        // Frameworks sometimes toggle the DOM property without the attribute.
        Ok(matches!(
            element.property("disabled").await?,
            Some(Value::Bool(true))
        ))
    }

    async fn click(&mut self, element: &Element) -> Result<()> {
        element.click().await.context("Click failed")?;
        Ok(())
    }
}
