use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::extract::extract_product;
use crate::page::Page;
use crate::pagination;
use crate::poll::{retry, PollPolicy, RetryPolicy};
use crate::product::Product;
use crate::settings::{CategoryTarget, SiteProfile};

/// What to do when one listing element cannot be turned into a product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionPolicy {
    /// Log the element and keep going.
    #[default]
    SkipInvalid,
    /// Fail the whole category.
    AbortCategory,
}

/// Products of one category, in document order.
#[derive(Debug, Clone, Default)]
pub struct CategoryScrape {
    pub products: Vec<Product>,
    pub skipped: usize,
    pub pagination_clicks: u32,
}

/// Anything that can produce a category's products.
#[async_trait]
pub trait ProductSource: Send + Sync {
    async fn fetch_category(&self, target: &CategoryTarget) -> Result<CategoryScrape, ScrapeError>;
}

pub struct PageSession<P> {
    page: P,
    site: SiteProfile,
    pagination: PollPolicy,
    retry: RetryPolicy,
    policy: ExtractionPolicy,
    show_progress: bool,
}

impl<P: Page> PageSession<P> {
    pub fn new(page: P, site: SiteProfile, pagination: PollPolicy, retry: RetryPolicy) -> Self {
        Self {
            page,
            site,
            pagination,
            retry,
            policy: ExtractionPolicy::default(),
            show_progress: true,
        }
    }

    pub fn with_policy(mut self, policy: ExtractionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    #[cfg(test)]
    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn into_page(self) -> P {
        self.page
    }

    /// Navigate, dismiss cookies, load everything, then extract every listing.
    pub async fn get_all_products(&self, path: &str) -> Result<CategoryScrape, ScrapeError> {
        let url = self.site.resolve(path)?;
        let page = &self.page;
        let url_ref = &url;
        retry(&self.retry, "navigation", move || page.goto(url_ref)).await?;
        info!("Loaded {}", url);

        self.accept_cookies().await?;

        let outcome =
            pagination::exhaust(&self.page, &self.site.selectors.load_more, &self.pagination).await?;
        info!("Pagination done after {} clicks", outcome.clicks);

        let listings = self.discover_listings().await?;
        let (products, skipped) = self.extract_all(&listings).await?;

        Ok(CategoryScrape {
            products,
            skipped,
            pagination_clicks: outcome.clicks,
        })
    }

    async fn accept_cookies(&self) -> Result<(), ScrapeError> {
        let Some(button) = self.page.find_one(&self.site.selectors.cookie_consent).await? else {
            return Ok(());
        };
        if !self.page.is_visible(&button).await? {
            debug!("Cookie banner present but hidden; leaving it");
            return Ok(());
        }
        debug!("Dismissing cookie banner");
        self.page.click(&button).await
    }

    async fn discover_listings(&self) -> Result<Vec<P::Node>, ScrapeError> {
        let page = &self.page;
        let selector = self.site.selectors.listing.as_str();
        let found = retry(&self.retry, "listing discovery", move || async move {
            let nodes = page.find_all(selector).await?;
            if nodes.is_empty() {
                Err(ScrapeError::NoListings(selector.to_string()))
            } else {
                Ok(nodes)
            }
        })
        .await;

        match found {
            Ok(nodes) => Ok(nodes),
            Err(ScrapeError::NoListings(_)) => {
                warn!("No listing elements matched `{}`; catalog is empty", selector);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn extract_all(&self, listings: &[P::Node]) -> Result<(Vec<Product>, usize), ScrapeError> {
        let pb = progress_bar(listings.len(), self.show_progress);
        let mut products = Vec::with_capacity(listings.len());
        let mut skipped = 0;

        for (i, node) in listings.iter().enumerate() {
            match extract_product(&self.page, node, &self.site.selectors).await {
                Ok(p) => products.push(p),
                Err(e) if e.is_element_level() && self.policy == ExtractionPolicy::SkipInvalid => {
                    warn!("Skipping listing #{}: {}", i + 1, e);
                    skipped += 1;
                }
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(e);
                }
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!("Extracted {} products ({} skipped)", products.len(), skipped);
        Ok((products, skipped))
    }
}

#[async_trait]
impl<P: Page> ProductSource for PageSession<P> {
    async fn fetch_category(&self, target: &CategoryTarget) -> Result<CategoryScrape, ScrapeError> {
        self.get_all_products(&target.path).await
    }
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}
