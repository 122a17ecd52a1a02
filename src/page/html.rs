//! Static HTML driver backed by `scraper`.
//!
//! Pages come either from saved snapshots (offline runs and tests) or from
//! plain HTTP, where activating a control means following its `href`.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::PageDriver;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

enum Source {
    Snapshots { pages: Vec<String>, current: usize },
    Http { client: Client, location: Url },
}

pub struct HtmlPage {
    source: Source,
    document: Html,
    /// Bumped on every click so stale handles are caught.
    generation: u64,
}

/// Path from the document root to an element: each step is a selector and
/// the index of the match taken within the previous step's element.
#[derive(Debug, Clone)]
pub struct NodePath {
    generation: u64,
    steps: Vec<(String, usize)>,
}

impl HtmlPage {
    pub fn from_snapshots(pages: Vec<String>) -> Result<Self> {
        let first = pages.first().context("no HTML snapshots given")?;
        let document = Html::parse_document(first);
        Ok(Self {
            source: Source::Snapshots { pages, current: 0 },
            document,
            generation: 0,
        })
    }

    /// Read snapshot files, one per page, in the order given.
    pub fn load_snapshots(paths: &[PathBuf]) -> Result<Self> {
        let pages = paths
            .iter()
            .map(|p| {
                std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read snapshot {}", p.display()))
            })
            .collect::<Result<Vec<_>>>()?;
        info!("Loaded {} HTML snapshots", pages.len());
        Self::from_snapshots(pages)
    }

    pub async fn fetch(url: &str) -> Result<Self> {
        let location = Url::parse(url).with_context(|| format!("Invalid URL: {url}"))?;
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        let body = get_text(&client, &location).await?;
        Ok(Self {
            source: Source::Http { client, location },
            document: Html::parse_document(&body),
            generation: 0,
        })
    }

    fn path(&self, steps: Vec<(String, usize)>) -> NodePath {
        NodePath {
            generation: self.generation,
            steps,
        }
    }

    fn resolve(&self, path: &NodePath) -> Result<ElementRef<'_>> {
        if path.generation != self.generation {
            bail!("stale element handle: page re-rendered since it was queried");
        }
        let mut steps = path.steps.iter();
        let (selector, index) = steps.next().context("empty element path")?;
        let mut current = self
            .document
            .select(&parse_selector(selector)?)
            .nth(*index)
            .ok_or_else(|| anyhow!("element {selector}[{index}] not found"))?;
        for (selector, index) in steps {
            current = current
                .select(&parse_selector(selector)?)
                .nth(*index)
                .ok_or_else(|| anyhow!("element {selector}[{index}] not found"))?;
        }
        Ok(current)
    }

    fn rerender(&mut self, html: &str) {
        self.document = Html::parse_document(html);
        self.generation += 1;
    }
}

#[async_trait(?Send)]
impl PageDriver for HtmlPage {
    type Element = NodePath;

    async fn query_all(&mut self, selector: &str) -> Result<Vec<NodePath>> {
        let count = self.document.select(&parse_selector(selector)?).count();
        Ok((0..count)
            .map(|i| self.path(vec![(selector.to_string(), i)]))
            .collect())
    }

    async fn query_in(&mut self, scope: &NodePath, selector: &str) -> Result<Vec<NodePath>> {
        let count = self.resolve(scope)?.select(&parse_selector(selector)?).count();
        Ok((0..count)
            .map(|i| {
                let mut steps = scope.steps.clone();
                steps.push((selector.to_string(), i));
                self.path(steps)
            })
            .collect())
    }

    async fn text(&mut self, element: &NodePath) -> Result<String> {
        let raw: String = self.resolve(element)?.text().collect();
        Ok(raw.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    async fn has_attribute(&mut self, element: &NodePath, name: &str) -> Result<bool> {
        Ok(self.resolve(element)?.value().attr(name).is_some())
    }

    async fn click(&mut self, element: &NodePath) -> Result<()> {
        let href = self
            .resolve(element)?
            .value()
            .attr("href")
            .map(str::to_string);

        let next = match &mut self.source {
            Source::Snapshots { pages, current } => {
                // Past the last snapshot the page just re-renders as is.
                if *current + 1 < pages.len() {
                    *current += 1;
                }
                debug!(snapshot = *current, "Advanced snapshot");
                pages[*current].clone()
            }
            Source::Http { client, location } => {
                let href = href.context(
                    "advance control has no href; script-driven pagination needs the browser driver",
                )?;
                let target = location
                    .join(&href)
                    .with_context(|| format!("Bad href on advance control: {href}"))?;
                debug!(url = %target, "Following advance control");
                let body = get_text(client, &target).await?;
                *location = target;
                body
            }
        };

        self.rerender(&next);
        Ok(())
    }
}

async fn get_text(client: &Client, url: &Url) -> Result<String> {
    client
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
        .with_context(|| format!("Failed to fetch {url}"))
}

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow!("invalid selector {selector:?}: {e}"))
}
