use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::error::ScrapeError;
use crate::session::ProductSource;
use crate::settings::CategoryTarget;
use crate::writer::CatalogWriter;

pub struct CategoryOutcome {
    pub category: String,
    pub result: Result<WrittenCatalog, ScrapeError>,
}

#[derive(Debug, Clone)]
pub struct WrittenCatalog {
    pub path: PathBuf,
    pub rows: usize,
    pub skipped: usize,
    pub pagination_clicks: u32,
    pub elapsed: Duration,
}

#[derive(Default)]
pub struct RunReport {
    pub outcomes: Vec<CategoryOutcome>,
}

impl RunReport {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.len() - self.failed()
    }

    pub fn print(&self) {
        println!(
            "{:<10} | {:>6} | {:>7} | {:>6} | {:>7} | {}",
            "Category", "Rows", "Skipped", "Clicks", "Time", "Output"
        );
        println!("{}", "-".repeat(72));
        for o in &self.outcomes {
            match &o.result {
                Ok(w) => println!(
                    "{:<10} | {:>6} | {:>7} | {:>6} | {:>6.1}s | {}",
                    o.category,
                    w.rows,
                    w.skipped,
                    w.pagination_clicks,
                    w.elapsed.as_secs_f64(),
                    w.path.display()
                ),
                Err(e) => println!("{:<10} | FAILED: {}", o.category, e),
            }
        }
        println!(
            "\n{} categories written, {} failed.",
            self.succeeded(),
            self.failed()
        );
    }
}

/// Drives one scrape + write per category, in table order.
pub struct RunCoordinator {
    categories: Vec<CategoryTarget>,
    header: Vec<String>,
    writer: CatalogWriter,
    deadline: Option<Duration>,
}

impl RunCoordinator {
    pub fn new(categories: Vec<CategoryTarget>, header: Vec<String>, writer: CatalogWriter) -> Self {
        Self {
            categories,
            header,
            writer,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// A failing category is logged and the run moves on to the next one.
    pub async fn run<S: ProductSource>(&self, source: &S) -> RunReport {
        let mut report = RunReport::default();
        for target in &self.categories {
            info!("Scraping category '{}' ({})", target.name, target.path);
            let result = self.run_category(source, target).await;
            if let Err(e) = &result {
                error!("Category '{}' failed: {}", target.name, e);
            }
            report.outcomes.push(CategoryOutcome {
                category: target.name.clone(),
                result,
            });
        }
        report
    }

    async fn run_category<S: ProductSource>(
        &self,
        source: &S,
        target: &CategoryTarget,
    ) -> Result<WrittenCatalog, ScrapeError> {
        let t0 = Instant::now();
        let fetch = source.fetch_category(target);
        let scrape = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, fetch).await.map_err(|_| {
                ScrapeError::DeadlineExceeded {
                    category: target.name.clone(),
                    deadline,
                }
            })??,
            None => fetch.await?,
        };

        let path = self.writer.path_for(&target.name);
        self.writer.write(&path, &self.header, &scrape.products)?;

        Ok(WrittenCatalog {
            path,
            rows: scrape.products.len(),
            skipped: scrape.skipped,
            pagination_clicks: scrape.pagination_clicks,
            elapsed: t0.elapsed(),
        })
    }
}
