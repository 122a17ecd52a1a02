use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::page::PageDriver;
use crate::record::CourseRecord;
use crate::settings::{ScrapeSettings, Selectors};

/// Rows with fewer cells than this are layout rows, not courses.
const MIN_CELLS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Advance control disabled or missing.
    Exhausted,
    PageLimit,
    TimedOut,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::Exhausted => "last page reached",
            StopReason::PageLimit => "page limit reached",
            StopReason::TimedOut => "timed out",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub pages: usize,
    pub stop: StopReason,
}

/// Read every qualifying row of the current page.
pub async fn extract_rows<D: PageDriver>(
    driver: &mut D,
    selectors: &Selectors,
) -> Result<Vec<CourseRecord>> {
    let rows = driver.query_all(&selectors.row).await?;
    let mut records = Vec::with_capacity(rows.len());

    for row in &rows {
        let cells = driver.query_in(row, &selectors.cell).await?;
        if cells.len() < MIN_CELLS {
            continue;
        }

        let name = match driver
            .query_in(&cells[0], &selectors.course_name)
            .await?
            .first()
        {
            Some(span) => driver.text(span).await?,
            None => String::new(),
        };

        let mut texts = Vec::with_capacity(MIN_CELLS - 1);
        for cell in &cells[1..MIN_CELLS] {
            texts.push(driver.text(cell).await?);
        }

        records.push(CourseRecord::from_cells(
            &name,
            &texts[0],
            [
                texts[1].as_str(),
                texts[2].as_str(),
                texts[3].as_str(),
                texts[4].as_str(),
            ],
        ));
    }

    Ok(records)
}

pub async fn locate_advance_control<D: PageDriver>(
    driver: &mut D,
    selectors: &Selectors,
) -> Result<Option<D::Element>> {
    driver.query_first(&selectors.advance).await
}

pub async fn is_advance_disabled<D: PageDriver>(
    driver: &mut D,
    control: Option<&D::Element>,
) -> Result<bool> {
    match control {
        Some(control) => driver.is_disabled(control).await,
        None => Ok(true),
    }
}

/// Scrape page after page into `records` until the advance control is
/// disabled or missing, or a safeguard from `settings` fires.
///
/// Records collected before an error stay in `records`.
pub async fn run_loop<D: PageDriver>(
    driver: &mut D,
    settings: &ScrapeSettings,
    records: &mut Vec<CourseRecord>,
    progress: &ProgressBar,
) -> Result<ScrapeSummary> {
    let deadline = settings.timeout().map(|t| Instant::now() + t);
    let mut pages = 0usize;

    let stop = loop {
        let step = scrape_page(driver, settings, records, &mut pages);
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, step).await {
                Ok(next) => next?,
                Err(_) => break StopReason::TimedOut,
            },
            None => step.await?,
        };

        progress.set_message(format!("page {}, {} courses", pages, records.len()));
        if let Some(stop) = next {
            break stop;
        }
    };

    match stop {
        StopReason::Exhausted => info!("Scraped {} courses from {} pages", records.len(), pages),
        _ => warn!(
            "Stopped early ({}): {} courses from {} pages",
            stop,
            records.len(),
            pages
        ),
    }

    Ok(ScrapeSummary { pages, stop })
}

/// One loop iteration. `Some` means stop.
async fn scrape_page<D: PageDriver>(
    driver: &mut D,
    settings: &ScrapeSettings,
    records: &mut Vec<CourseRecord>,
    pages: &mut usize,
) -> Result<Option<StopReason>> {
    let page = *pages + 1;
    let rows = extract_rows(driver, &settings.selectors)
        .await
        .with_context(|| format!("Reading rows on page {page}"))?;
    debug!(page, rows = rows.len(), "Extracted rows");
    records.extend(rows);
    *pages = page;

    let control = locate_advance_control(driver, &settings.selectors)
        .await
        .with_context(|| format!("Locating advance control on page {page}"))?;
    if is_advance_disabled(driver, control.as_ref()).await? {
        return Ok(Some(StopReason::Exhausted));
    }
    let Some(control) = control else {
        return Ok(Some(StopReason::Exhausted));
    };

    if settings.page_limit().is_some_and(|limit| page >= limit) {
        return Ok(Some(StopReason::PageLimit));
    }

    driver
        .click(&control)
        .await
        .with_context(|| format!("Activating advance control on page {page}"))?;
    driver.wait(settings.delay()).await;
    Ok(None)
}

/// `run_loop` with a spinner on stderr.
pub async fn run<D: PageDriver>(
    driver: &mut D,
    settings: &ScrapeSettings,
    records: &mut Vec<CourseRecord>,
) -> Result<ScrapeSummary> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let result = run_loop(driver, settings, records, &pb).await;
    pb.finish_and_clear();
    result
}
