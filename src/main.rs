mod browser;
mod coordinator;
mod error;
mod extract;
mod page;
mod pagination;
mod poll;
mod product;
mod session;
mod settings;
mod writer;

use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::browser::BrowserPage;
use crate::coordinator::RunCoordinator;
use crate::poll::{PollPolicy, RetryPolicy};
use crate::session::{ExtractionPolicy, PageSession};
use crate::settings::{Settings, SiteProfile};
use crate::writer::CatalogWriter;

#[derive(Parser)]
#[command(
    name = "catalog_scraper",
    about = "Scrape the webscraper.io e-commerce demo into one CSV per category"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape categories and write one file per category
    Run {
        /// Comma-separated category names (default: all, in table order)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
        /// Directory the catalog files are written to
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
        /// WebDriver server URL (chromedriver)
        #[arg(long)]
        webdriver: Option<String>,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
        /// Fail a whole category on the first unparsable listing
        #[arg(long)]
        strict: bool,
        /// Hide the per-category progress bar
        #[arg(short, long)]
        quiet: bool,
    },
    /// List the category table with resolved URLs
    Categories,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    let site = SiteProfile::webscraper_demo().with_base_url(&settings.base_url)?;

    let result = match cli.command {
        Commands::Categories => {
            for c in &site.categories {
                println!("{:<10} {}", c.name, site.resolve(&c.path)?);
            }
            Ok(())
        }
        Commands::Run {
            only,
            out_dir,
            webdriver,
            headed,
            strict,
            quiet,
        } => {
            if let Some(dir) = out_dir {
                settings.output_dir = dir;
            }
            if let Some(url) = webdriver {
                settings.webdriver_url = url;
            }
            if headed {
                settings.headless = false;
            }
            let policy = if strict {
                ExtractionPolicy::AbortCategory
            } else {
                ExtractionPolicy::SkipInvalid
            };
            run(&settings, site, &only, policy, !quiet).await
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run(
    settings: &Settings,
    site: SiteProfile,
    only: &[String],
    policy: ExtractionPolicy,
    progress: bool,
) -> anyhow::Result<()> {
    let categories = site.select(only)?;
    let writer = CatalogWriter::new(&settings.output_dir).with_delimiter(settings.delimiter_byte()?);
    let coordinator = RunCoordinator::new(categories, product::product_header(), writer)
        .with_deadline(settings.category_deadline());

    let page = BrowserPage::connect(settings).await?;
    let session = PageSession::new(
        page,
        site,
        PollPolicy {
            interval: settings.settle_interval(),
            max_attempts: settings.max_pagination_clicks,
        },
        RetryPolicy {
            max_retries: settings.navigation_retries,
            base_backoff: settings.retry_backoff(),
        },
    )
    .with_policy(policy)
    .with_progress(progress);

    // The browser is released on every path out of here, Ctrl-C included.
    let report = until_interrupted(coordinator.run(&session), tokio::signal::ctrl_c()).await;

    if let Err(e) = session.into_page().quit().await {
        warn!("Failed to close browser session: {}", e);
    }

    let Some(report) = report else {
        anyhow::bail!("run cancelled");
    };
    report.print();
    info!(
        "Run finished: {} written, {} failed",
        report.succeeded(),
        report.failed()
    );

    if !report.outcomes.is_empty() && report.succeeded() == 0 {
        anyhow::bail!("every category failed");
    }
    Ok(())
}

/// `None` when `interrupt` fires first. A failed signal listener is logged and
/// the work keeps running.
async fn until_interrupted<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future<Output = std::io::Result<()>>,
) -> Option<T> {
    tokio::pin!(work);
    tokio::select! {
        out = &mut work => return Some(out),
        signal = interrupt => match signal {
            Ok(()) => {
                warn!("Interrupted; closing the browser");
                return None;
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        },
    }
    Some(work.await)
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
