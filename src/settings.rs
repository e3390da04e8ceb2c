use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;
use url::Url;

use crate::error::ScrapeError;

const ENV_PREFIX: &str = "SCRAPER";

/// CSS selectors the extraction depends on. Any markup change on the site breaks these.
#[derive(Debug, Clone)]
pub struct Selectors {
    pub listing: String,
    pub title: String,
    pub title_attribute: String,
    pub description: String,
    pub price: String,
    pub rating_marker: String,
    pub review_count: String,
    pub cookie_consent: String,
    pub load_more: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTarget {
    pub name: String,
    pub path: String,
}

impl CategoryTarget {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
        }
    }
}

/// Everything that ties a run to one particular site.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub base_url: Url,
    pub selectors: Selectors,
    pub categories: Vec<CategoryTarget>,
}

impl SiteProfile {
    /// The webscraper.io "load more" e-commerce test site.
    pub fn webscraper_demo() -> Self {
        Self {
            base_url: Url::parse("https://webscraper.io/").expect("static base url"),
            selectors: Selectors {
                listing: ".card-body".into(),
                title: ".caption > h4 > a".into(),
                title_attribute: "title".into(),
                description: ".caption > .card-text".into(),
                price: ".caption > .price".into(),
                rating_marker: "div.ratings > p:nth-of-type(2) > span".into(),
                review_count: "div.ratings > p.review-count".into(),
                cookie_consent: ".acceptCookies".into(),
                load_more: ".ecomerce-items-scroll-more".into(),
            },
            categories: vec![
                CategoryTarget::new("home", "/test-sites/e-commerce/more"),
                CategoryTarget::new("computers", "/test-sites/e-commerce/more/computers"),
                CategoryTarget::new("phones", "/test-sites/e-commerce/more/phones"),
                CategoryTarget::new("laptops", "/test-sites/e-commerce/more/computers/laptops"),
                CategoryTarget::new("tablets", "/test-sites/e-commerce/more/computers/tablets"),
                CategoryTarget::new("touch", "/test-sites/e-commerce/more/phones/touch"),
            ],
        }
    }

    pub fn with_base_url(mut self, base: &str) -> Result<Self, ScrapeError> {
        self.base_url =
            Url::parse(base).map_err(|e| ScrapeError::Config(format!("base_url {base:?}: {e}")))?;
        Ok(self)
    }

    /// Resolve a category path against the base origin.
    pub fn resolve(&self, path: &str) -> Result<Url, ScrapeError> {
        self.base_url.join(path).map_err(|e| ScrapeError::Navigation {
            url: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Keep only the named categories, in table order.
    pub fn select(&self, names: &[String]) -> Result<Vec<CategoryTarget>, ScrapeError> {
        if names.is_empty() {
            return Ok(self.categories.clone());
        }
        if let Some(unknown) = names
            .iter()
            .find(|n| !self.categories.iter().any(|c| &c.name == *n))
        {
            return Err(ScrapeError::UnknownCategory(unknown.clone()));
        }
        Ok(self
            .categories
            .iter()
            .filter(|c| names.contains(&c.name))
            .cloned()
            .collect())
    }
}

/// Runtime knobs, overridable through `SCRAPER_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub webdriver_url: String,
    pub headless: bool,
    pub output_dir: PathBuf,
    pub delimiter: char,
    pub settle_ms: u64,
    pub max_pagination_clicks: u32,
    pub category_timeout_secs: u64,
    pub navigation_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Settings {
    pub fn load() -> Result<Self, ScrapeError> {
        let builder = Self::defaults(Config::builder())?.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true),
        );
        Ok(builder.build()?.try_deserialize()?)
    }

    fn defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ScrapeError> {
        Ok(builder
            .set_default("base_url", "https://webscraper.io/")?
            .set_default("webdriver_url", "http://localhost:9515")?
            .set_default("headless", true)?
            .set_default("output_dir", ".")?
            .set_default("delimiter", ",")?
            .set_default("settle_ms", 200)?
            .set_default("max_pagination_clicks", 500)?
            .set_default("category_timeout_secs", 600)?
            .set_default("navigation_retries", 3)?
            .set_default("retry_backoff_ms", 1000)?)
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// `None` when the timeout is zero, meaning no deadline.
    pub fn category_deadline(&self) -> Option<Duration> {
        (self.category_timeout_secs > 0).then(|| Duration::from_secs(self.category_timeout_secs))
    }

    pub fn delimiter_byte(&self) -> Result<u8, ScrapeError> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(ScrapeError::Config(format!(
                "delimiter {:?} must be a single ASCII character",
                self.delimiter
            )))
        }
    }
}
