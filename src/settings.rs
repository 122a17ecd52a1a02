use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::page::html::parse_selector;
use crate::plan::score::Weights;

const DEFAULT_FILE: &str = "course_ratings";
const ENV_PREFIX: &str = "COURSES";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scrape: ScrapeSettings,
    pub browser: BrowserSettings,
    pub weights: Weights,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    pub delay_ms: u64,
    /// 0 = unbounded.
    pub max_pages: usize,
    /// 0 = no deadline.
    pub timeout_secs: u64,
    pub selectors: Selectors,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            delay_ms: 200,
            max_pages: 1000,
            timeout_secs: 0,
            selectors: Selectors::default(),
        }
    }
}

impl ScrapeSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn page_limit(&self) -> Option<usize> {
        (self.max_pages > 0).then_some(self.max_pages)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub row: String,
    pub cell: String,
    pub course_name: String,
    pub advance: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            row: "table tbody tr".into(),
            cell: "td".into(),
            course_name: "span.text-base".into(),
            advance: r#"nav[aria-label="Pagination"] button:last-child"#.into(),
        }
    }
}

impl Selectors {
    /// Parse every selector once so typos fail before a browser is launched.
    pub fn validate(&self) -> Result<()> {
        for (name, selector) in [
            ("row", &self.row),
            ("cell", &self.cell),
            ("course_name", &self.course_name),
            ("advance", &self.advance),
        ] {
            parse_selector(selector).with_context(|| format!("scrape.selectors.{name}"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    /// Reuse a profile that is already signed in.
    pub user_data_dir: Option<PathBuf>,
    pub request_timeout_secs: u64,
    /// How long to wait for the first table rows after opening the page.
    pub navigation_timeout_secs: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            user_data_dir: None,
            request_timeout_secs: 30,
            navigation_timeout_secs: 30,
        }
    }
}

/// Defaults, then `course_ratings.toml` (or `path`), then `COURSES__*` env vars.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let file = match path {
        Some(p) => File::from(p).required(true),
        None => File::with_name(DEFAULT_FILE).required(false),
    };

    Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to load configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.scrape.delay(), Duration::from_millis(200));
        assert_eq!(s.scrape.page_limit(), Some(1000));
        assert_eq!(s.scrape.timeout(), None);
        assert!(s.browser.headless);
        assert_eq!(s.weights.rating, 12.0);
        s.scrape.selectors.validate().unwrap();
    }

    #[test]
    fn zero_means_unbounded() {
        let s = ScrapeSettings {
            max_pages: 0,
            timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(s.page_limit(), None);
        assert_eq!(s.timeout(), None);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r##"
[scrape]
delay_ms = 500
timeout_secs = 90

[scrape.selectors]
row = "#ratings tr"

[weights]
interest = 20.0
"##
        )
        .unwrap();

        let s = load(Some(file.path())).unwrap();
        assert_eq!(s.scrape.delay_ms, 500);
        assert_eq!(s.scrape.timeout(), Some(Duration::from_secs(90)));
        assert_eq!(s.scrape.max_pages, 1000);
        assert_eq!(s.scrape.selectors.row, "#ratings tr");
        assert_eq!(s.scrape.selectors.cell, "td");
        assert_eq!(s.weights.interest, 20.0);
        assert_eq!(s.weights.rating, 12.0);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(load(Some(Path::new("does/not/exist.toml"))).is_err());
    }

    #[test]
    fn bad_selector_named() {
        let selectors = Selectors {
            advance: "nav[".into(),
            ..Default::default()
        };
        let err = selectors.validate().unwrap_err();
        assert!(format!("{err:#}").contains("scrape.selectors.advance"));
    }
}
