//! Chromium session driven over the DevTools protocol.
//!
//! The session never logs in. It expects the profile directory to already
//! hold an authenticated session for the feed site.

use crate::error::{ItemError, ScrapeError};
use crate::scraper::{ClosablePage, FeedPage};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    pub profile_dir: Option<PathBuf>,
    pub executable: Option<PathBuf>,
    pub window: (u32, u32),
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: false,
            profile_dir: None,
            executable: None,
            window: (1280, 1024),
        }
    }
}

impl BrowserSettings {
    fn to_config(&self) -> Result<BrowserConfig, ScrapeError> {
        let mut builder = BrowserConfig::builder().window_size(self.window.0, self.window.1);
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(dir) = &self.profile_dir {
            builder = builder.user_data_dir(dir);
        }
        if let Some(exe) = &self.executable {
            builder = builder.chrome_executable(exe);
        }
        builder.build().map_err(ScrapeError::Launch)
    }
}

/// One browser process plus the tab showing the feed.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    pub async fn open(settings: &BrowserSettings, feed_url: &str) -> Result<Self, ScrapeError> {
        let url = Url::parse(feed_url)?;
        let (browser, mut handler) = Browser::launch(settings.to_config()?)
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("browser handler stopped: {}", e);
                    break;
                }
            }
        });

        info!("opening {}", url);
        let page = browser
            .new_page(url.as_str())
            .await
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                detail: e.to_string(),
            })?;
        page.wait_for_navigation()
            .await
            .map_err(|e| ScrapeError::Navigation {
                url: url.to_string(),
                detail: e.to_string(),
            })?;

        Ok(Self {
            browser,
            page,
            handler,
        })
    }
}

#[async_trait]
impl ClosablePage for ChromiumSession {
    async fn close(mut self) -> Result<(), ScrapeError> {
        self.browser
            .close()
            .await
            .map_err(|e| ScrapeError::Session(e.to_string()))?;
        let _ = self.browser.wait().await;
        let _ = self.handler.await;
        Ok(())
    }
}

#[async_trait]
impl FeedPage for ChromiumSession {
    async fn read_items(
        &self,
        selector: &str,
    ) -> Result<Vec<Result<String, ItemError>>, ScrapeError> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| ScrapeError::Session(e.to_string()))?;

        let mut items = Vec::with_capacity(elements.len());
        for element in elements {
            items.push(match element.inner_text().await {
                Ok(text) => Ok(text.unwrap_or_default()),
                Err(e) => Err(ItemError(e.to_string())),
            });
        }
        Ok(items)
    }

    async fn scroll_by(&self, pixels: i64) -> Result<(), ScrapeError> {
        self.page
            .evaluate(format!("window.scrollBy(0, {})", pixels))
            .await
            .map_err(|e| ScrapeError::Session(e.to_string()))?;
        Ok(())
    }
}
