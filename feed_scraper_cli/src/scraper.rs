use crate::error::{ItemError, ScrapeError};
use crate::{CollectedSet, Insertion, ProgressEvent};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_SELECTOR: &str = "article div[lang]";
pub const DEFAULT_MIN_LENGTH: usize = 20;

/// A live page the scraper can read nodes from and scroll.
#[async_trait]
pub trait FeedPage: Send + Sync {
    /// Text of every node currently matching `selector`, one result per node.
    async fn read_items(&self, selector: &str)
        -> Result<Vec<Result<String, ItemError>>, ScrapeError>;

    async fn scroll_by(&self, pixels: i64) -> Result<(), ScrapeError>;
}

/// A page backed by a resource that has to be shut down after scraping.
#[async_trait]
pub trait ClosablePage: FeedPage + Sized {
    async fn close(self) -> Result<(), ScrapeError>;
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub duration: Duration,
    pub poll_interval: Duration,
    pub selector: String,
    pub min_length: usize,
    pub scroll_step: i64,
    pub large_scroll_step: i64,
    /// Every n-th poll scrolls by `large_scroll_step`. Zero disables it.
    pub large_scroll_every: u32,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
            selector: DEFAULT_SELECTOR.to_string(),
            min_length: DEFAULT_MIN_LENGTH,
            scroll_step: 1000,
            large_scroll_step: 3000,
            large_scroll_every: 5,
        }
    }
}

impl ScrapeSettings {
    /// Scroll distance for the given 1-based poll number.
    pub fn scroll_distance(&self, poll: u32) -> i64 {
        if self.large_scroll_every > 0 && poll % self.large_scroll_every == 0 {
            self.large_scroll_step
        } else {
            self.scroll_step
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Detached(String),
    Empty,
    TooShort(usize),
    Duplicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Text(String),
    Skip(SkipReason),
}

impl From<Result<String, ItemError>> for ItemOutcome {
    fn from(item: Result<String, ItemError>) -> Self {
        match item {
            Ok(text) if text.trim().is_empty() => ItemOutcome::Skip(SkipReason::Empty),
            Ok(text) => ItemOutcome::Text(text),
            Err(ItemError(detail)) => ItemOutcome::Skip(SkipReason::Detached(detail)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipTally {
    pub detached: usize,
    pub empty: usize,
    pub too_short: usize,
    pub duplicate: usize,
}

impl SkipTally {
    pub fn record(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::Detached(_) => self.detached += 1,
            SkipReason::Empty => self.empty += 1,
            SkipReason::TooShort(_) => self.too_short += 1,
            SkipReason::Duplicate => self.duplicate += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.detached + self.empty + self.too_short + self.duplicate
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub collected: CollectedSet,
    pub skipped: SkipTally,
    pub polls: u32,
}

/// Folds one poll's node results into the collected set. Returns how many
/// blocks were added.
pub fn absorb(
    collected: &mut CollectedSet,
    skipped: &mut SkipTally,
    items: Vec<Result<String, ItemError>>,
) -> usize {
    let mut added = 0;
    for item in items {
        let reason = match ItemOutcome::from(item) {
            ItemOutcome::Text(text) => match collected.insert(&text) {
                Insertion::Added => {
                    added += 1;
                    continue;
                }
                Insertion::Duplicate => SkipReason::Duplicate,
                Insertion::TooShort(len) => SkipReason::TooShort(len),
            },
            ItemOutcome::Skip(reason) => reason,
        };
        if let SkipReason::Detached(detail) = &reason {
            debug!("skipping node: {}", detail);
        }
        skipped.record(&reason);
    }
    added
}

pub struct FeedScraper {
    settings: ScrapeSettings,
}

impl FeedScraper {
    pub fn new(settings: ScrapeSettings) -> Result<Self, ScrapeError> {
        if settings.selector.trim().is_empty() {
            return Err(ScrapeError::InvalidSelector(settings.selector));
        }
        Ok(Self { settings })
    }

    /// Reads, scrolls and waits until the configured duration has elapsed.
    pub async fn scrape(
        &self,
        page: &dyn FeedPage,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Extraction, ScrapeError> {
        let settings = &self.settings;
        let mut collected = CollectedSet::new(settings.min_length);
        let mut skipped = SkipTally::default();
        let mut polls = 0u32;
        let start = Instant::now();

        info!(
            "scraping {:?} for {}s",
            settings.selector,
            settings.duration.as_secs()
        );

        while start.elapsed() < settings.duration {
            polls += 1;
            let items = page.read_items(&settings.selector).await?;
            let added = absorb(&mut collected, &mut skipped, items);
            debug!("poll {}: {} new, {} total", polls, added, collected.len());

            if let Some(sink) = progress {
                sink.emit(ProgressEvent {
                    elapsed: start.elapsed().min(settings.duration),
                    total: settings.duration,
                    count: collected.len(),
                    newest: collected.last().cloned(),
                });
            }

            page.scroll_by(settings.scroll_distance(polls)).await?;
            tokio::time::sleep(settings.poll_interval).await;
        }

        info!(
            "collected {} blocks in {} polls ({} skipped)",
            collected.len(),
            polls,
            skipped.total()
        );

        Ok(Extraction {
            collected,
            skipped,
            polls,
        })
    }

    /// Scrapes `page`, then closes it. A failed close is logged and never
    /// replaces the scrape result.
    pub async fn scrape_and_close<P: ClosablePage>(
        &self,
        page: P,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Extraction, ScrapeError> {
        let result = self.scrape(&page, progress).await;
        if let Err(e) = page.close().await {
            warn!("failed to close page after scraping: {}", e);
        }
        result
    }
}
