mod output;
mod page;
mod plan;
mod record;
mod scrape;
mod settings;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use tracing::{error, info, warn};

use page::html::HtmlPage;
use page::PageDriver;
use record::CourseRecord;
use settings::Settings;

#[derive(Parser)]
#[command(name = "course_ratings", about = "Course ratings scraper and course planner")]
struct Cli {
    /// Config file (default: ./course_ratings.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the paginated ratings table and print every row as JSON
    #[command(group(ArgGroup::new("source").required(true).args(["url", "html"])))]
    Scrape {
        /// Page to open
        #[arg(long)]
        url: Option<String>,
        /// Saved pages, one per table page, in order
        #[arg(long, num_args = 1..)]
        html: Vec<PathBuf>,
        /// Fetch over plain HTTP instead of driving a browser
        #[arg(long, requires = "url")]
        http: bool,
        /// Also write the JSON to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Stop after this many pages (0 = no limit)
        #[arg(short = 'n', long)]
        max_pages: Option<usize>,
        /// Give up after this many seconds, keeping what was read
        #[arg(long)]
        timeout: Option<u64>,
        /// Pause after each click
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Show the browser window
        #[arg(long)]
        headful: bool,
        /// Chromium profile directory
        #[arg(long)]
        user_data_dir: Option<PathBuf>,
    },
    /// Pick the best specialization and course set from scraped ratings
    Plan {
        #[arg(short, long, default_value = "ratings.json")]
        input: PathBuf,
        /// Number of courses to take
        #[arg(long, default_value_t = plan::DEFAULT_PLAN_SIZE)]
        courses: usize,
        /// Interest override, e.g. CS-6515=2 (repeatable)
        #[arg(long, value_parser = parse_interest)]
        interest: Vec<(String, u8)>,
    },
    /// Courses ranked by planner score
    Overview {
        #[arg(short, long, default_value = "ratings.json")]
        input: PathBuf,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Scrape {
            url,
            html,
            http,
            out,
            max_pages,
            timeout,
            delay_ms,
            headful,
            user_data_dir,
        } => {
            if let Some(n) = max_pages {
                settings.scrape.max_pages = n;
            }
            if let Some(secs) = timeout {
                settings.scrape.timeout_secs = secs;
            }
            if let Some(ms) = delay_ms {
                settings.scrape.delay_ms = ms;
            }
            if headful {
                settings.browser.headless = false;
            }
            if user_data_dir.is_some() {
                settings.browser.user_data_dir = user_data_dir;
            }
            settings.scrape.selectors.validate()?;

            let source = match (url, http) {
                (Some(url), true) => Source::Http(url),
                (Some(url), false) => Source::Browser(url),
                (None, _) => Source::Snapshots(html),
            };
            scrape_command(&settings, source, out.as_deref()).await
        }
        Commands::Plan {
            input,
            courses,
            interest,
        } => {
            let records = output::load_records(&input)?;
            let overrides: HashMap<String, u8> = interest.into_iter().collect();
            let cands = plan::candidates(&records, &settings.weights, &overrides);
            info!("Planning from {} of {} courses", cands.len(), records.len());

            let catalog = plan::catalog::builtin();
            for spec in &catalog {
                spec.validate()?;
            }
            let best = plan::best_plan(&cands, &catalog, courses);
            output::print_plan(best.as_ref(), courses);
            Ok(())
        }
        Commands::Overview { input, limit } => {
            let records = output::load_records(&input)?;
            output::print_overview(&records, &settings.weights, limit);
            Ok(())
        }
    };

    // stderr: stdout may be piped JSON
    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

enum Source {
    Browser(String),
    Http(String),
    Snapshots(Vec<PathBuf>),
}

async fn scrape_command(settings: &Settings, source: Source, out: Option<&Path>) -> Result<()> {
    let mut records = Vec::new();

    let run = match source {
        Source::Snapshots(paths) => {
            let mut page = HtmlPage::load_snapshots(&paths)?;
            scrape_with(&mut page, settings, &mut records).await
        }
        Source::Http(url) => {
            let mut page = HtmlPage::fetch(&url).await?;
            scrape_with(&mut page, settings, &mut records).await
        }
        Source::Browser(url) => browser_scrape(settings, &url, &mut records).await,
    };

    if let Err(e) = &run {
        error!("Scrape failed after {} courses: {:#}", records.len(), e);
        warn!("Emitting partial results");
    }

    output::print_records(&records)?;
    if let Some(path) = out {
        output::write_records(path, &records)?;
    }
    run
}

async fn scrape_with<D: PageDriver>(
    driver: &mut D,
    settings: &Settings,
    records: &mut Vec<CourseRecord>,
) -> Result<()> {
    let summary = scrape::run(driver, &settings.scrape, records).await?;
    info!("{} pages, {}", summary.pages, summary.stop);
    Ok(())
}

#[cfg(feature = "browser")]
async fn browser_scrape(
    settings: &Settings,
    url: &str,
    records: &mut Vec<CourseRecord>,
) -> Result<()> {
    let mut page =
        page::chromium::ChromiumPage::launch(&settings.browser, url, &settings.scrape.selectors.row)
            .await?;
    let run = scrape_with(&mut page, settings, records).await;
    if let Err(e) = page.close().await {
        warn!("{:#}", e);
    }
    run
}

#[cfg(not(feature = "browser"))]
async fn browser_scrape(
    _settings: &Settings,
    _url: &str,
    _records: &mut Vec<CourseRecord>,
) -> Result<()> {
    bail!("built without the `browser` feature; use --http or --html")
}

fn parse_interest(s: &str) -> Result<(String, u8)> {
    let (code, value) = s
        .split_once('=')
        .with_context(|| format!("expected CODE=N, got {s:?}"))?;
    let value: u8 = value
        .trim()
        .parse()
        .with_context(|| format!("interest for {code} must be 0-255"))?;
    if code.trim().is_empty() {
        bail!("missing course code in {s:?}");
    }
    Ok((code.trim().to_string(), value))
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
