use async_trait::async_trait;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;
use tracing::info;
use url::Url;

use crate::error::ScrapeError;
use crate::page::Page;
use crate::settings::Settings;

fn driver_err(e: WebDriverError) -> ScrapeError {
    ScrapeError::Driver(e.to_string())
}

fn chrome_capabilities(headless: bool) -> Result<ChromeCapabilities, ScrapeError> {
    let mut caps = DesiredCapabilities::chrome();
    if headless {
        caps.set_headless().map_err(driver_err)?;
    }
    caps.set_no_sandbox().map_err(driver_err)?;
    caps.set_disable_dev_shm_usage().map_err(driver_err)?;
    caps.add_arg("--window-size=1920,1080").map_err(driver_err)?;
    Ok(caps)
}

/// A Chrome session behind a WebDriver server (chromedriver).
pub struct BrowserPage {
    driver: WebDriver,
}

impl BrowserPage {
    pub async fn connect(settings: &Settings) -> Result<Self, ScrapeError> {
        let caps = chrome_capabilities(settings.headless)?;
        info!("Connecting to WebDriver at {}", settings.webdriver_url);
        let driver = WebDriver::new(&settings.webdriver_url, caps)
            .await
            .map_err(driver_err)?;
        Ok(Self { driver })
    }

    /// End the browser session.
    pub async fn quit(self) -> Result<(), ScrapeError> {
        info!("Closing browser session");
        self.driver.quit().await.map_err(driver_err)
    }
}

#[async_trait]
impl Page for BrowserPage {
    type Node = WebElement;

    async fn goto(&self, url: &Url) -> Result<(), ScrapeError> {
        self.driver
            .goto(url.as_str())
            .await
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<WebElement>, ScrapeError> {
        self.driver
            .find_all(By::Css(selector))
            .await
            .map_err(driver_err)
    }

    async fn find_all_in(
        &self,
        node: &WebElement,
        selector: &str,
    ) -> Result<Vec<WebElement>, ScrapeError> {
        node.find_all(By::Css(selector)).await.map_err(driver_err)
    }

    async fn is_visible(&self, node: &WebElement) -> Result<bool, ScrapeError> {
        node.is_displayed().await.map_err(driver_err)
    }

    async fn click(&self, node: &WebElement) -> Result<(), ScrapeError> {
        node.click().await.map_err(driver_err)
    }

    async fn text_of(&self, node: &WebElement) -> Result<String, ScrapeError> {
        node.text().await.map_err(driver_err)
    }

    async fn attribute_of(
        &self,
        node: &WebElement,
        name: &str,
    ) -> Result<Option<String>, ScrapeError> {
        node.attr(name).await.map_err(driver_err)
    }
}
