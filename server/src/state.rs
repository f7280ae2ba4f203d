use chrono::{DateTime, Utc};
use dashmap::DashMap;
use feed_scraper_cli::{ai::QuestionAnswerer, analysis::FilterCriteria, config::AppConfig, ProgressEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub enum JobStatus {
    Running { progress: Option<ProgressEvent> },
    Done { count: usize, skipped: usize },
    Failed { error: String },
}

#[derive(Clone, Debug)]
pub struct Job {
    pub started_at: DateTime<Utc>,
    pub status: JobStatus,
}

/// What the user has collected in this server's lifetime, plus the filter
/// they are currently looking through.
#[derive(Debug, Default)]
pub struct Session {
    pub blocks: Vec<String>,
    pub criteria: FilterCriteria,
}

impl Session {
    pub fn filtered(&self) -> Vec<String> {
        self.criteria.apply(&self.blocks)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<DashMap<Uuid, Job>>,
    pub session: Arc<RwLock<Session>>,
    pub config: Arc<AppConfig>,
    pub answerer: Arc<QuestionAnswerer>,
    scraping: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(config: AppConfig, answerer: QuestionAnswerer) -> Self {
        AppState {
            jobs: Arc::new(DashMap::new()),
            session: Arc::new(RwLock::new(Session::default())),
            config: Arc::new(config),
            answerer: Arc::new(answerer),
            scraping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claims the browser for one scrape. None if a scrape is already running.
    /// The claim is released when the guard drops, even if the job panics.
    pub fn try_begin_scrape(&self) -> Option<ScrapeGuard> {
        self.scraping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScrapeGuard {
                scraping: self.scraping.clone(),
            })
    }
}

pub struct ScrapeGuard {
    scraping: Arc<AtomicBool>,
}

impl Drop for ScrapeGuard {
    fn drop(&mut self) {
        self.scraping.store(false, Ordering::Release);
    }
}
