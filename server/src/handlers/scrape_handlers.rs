use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use feed_scraper_cli::{
    browser::ChromiumSession,
    error::ScrapeError,
    scraper::{Extraction, FeedScraper, ScrapeSettings},
    snapshot::SnapshotPage,
    ProgressEvent,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use crate::state::{AppState, Job, JobStatus};

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ScrapePayload {
    pub duration_secs: Option<u64>,
}

#[derive(Serialize)]
pub struct JobCreated {
    pub job_id: Uuid,
}

#[derive(Serialize)]
pub struct JobPollResponse {
    pub status: String,
    pub started_at: String,
    pub elapsed_secs: Option<u64>,
    pub total_secs: Option<u64>,
    pub count: Option<usize>,
    pub skipped: Option<usize>,
    pub newest: Option<String>,
    pub error: Option<String>,
}

/// POST /api/scrape
pub async fn start_scrape(
    State(state): State<AppState>,
    payload: Option<Json<ScrapePayload>>,
) -> impl IntoResponse {
    let Some(guard) = state.try_begin_scrape() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "A scrape is already running" })),
        );
    };
    let payload = payload.map(|Json(p)| p).unwrap_or_default();

    let mut settings = state.config.scrape.clone();
    if let Some(secs) = payload.duration_secs {
        settings.duration = Duration::from_secs(secs);
    }

    // only one job runs at a time, so earlier ones are all finished
    state.jobs.clear();
    let job_id = Uuid::new_v4();
    state.jobs.insert(
        job_id,
        Job {
            started_at: Utc::now(),
            status: JobStatus::Running { progress: None },
        },
    );
    // a new run replaces whatever was collected before
    state.session.write().await.blocks.clear();

    let state_clone = state.clone();
    tokio::spawn(async move {
        let status = match run_scrape(&state_clone, job_id, settings).await {
            Ok(extraction) => {
                let count = extraction.collected.len();
                let skipped = extraction.skipped.total();
                state_clone.session.write().await.blocks = extraction.collected.into_texts();
                info!("job {} collected {} blocks", job_id, count);
                JobStatus::Done { count, skipped }
            }
            Err(e) => {
                error!("job {} failed: {}", job_id, e);
                JobStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        // release before publishing, so a client that sees the job finish can start the next one
        drop(guard);
        if let Some(mut job) = state_clone.jobs.get_mut(&job_id) {
            job.status = status;
        }
    });

    (StatusCode::ACCEPTED, Json(json!(JobCreated { job_id })))
}

async fn run_scrape(
    state: &AppState,
    job_id: Uuid,
    settings: ScrapeSettings,
) -> Result<Extraction, ScrapeError> {
    let scraper = FeedScraper::new(settings)?;
    let jobs = state.jobs.clone();
    let sink = move |event: ProgressEvent| {
        if let Some(mut job) = jobs.get_mut(&job_id) {
            job.status = JobStatus::Running {
                progress: Some(event),
            };
        }
    };

    match &state.config.replay_dir {
        Some(dir) => {
            let page = SnapshotPage::from_dir(dir)?;
            scraper.scrape(&page, Some(&sink)).await
        }
        None => {
            let session =
                ChromiumSession::open(&state.config.browser, &state.config.feed_url).await?;
            scraper.scrape_and_close(session, Some(&sink)).await
        }
    }
}

/// GET /api/jobs/{id}
pub async fn poll_job(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let Some(job) = state.jobs.get(&id).map(|j| j.value().clone()) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Job not found" })));
    };

    let mut resp = JobPollResponse {
        status: String::new(),
        started_at: job.started_at.to_rfc3339(),
        elapsed_secs: None,
        total_secs: None,
        count: None,
        skipped: None,
        newest: None,
        error: None,
    };
    match job.status {
        JobStatus::Running { progress } => {
            resp.status = "running".to_string();
            if let Some(event) = progress {
                resp.elapsed_secs = Some(event.elapsed.as_secs());
                resp.total_secs = Some(event.total.as_secs());
                resp.count = Some(event.count);
                resp.newest = event.newest.map(|b| b.text);
            }
        }
        JobStatus::Done { count, skipped } => {
            resp.status = "done".to_string();
            resp.count = Some(count);
            resp.skipped = Some(skipped);
        }
        JobStatus::Failed { error } => {
            resp.status = "failed".to_string();
            resp.error = Some(error);
        }
    }
    (StatusCode::OK, Json(json!(resp)))
}
