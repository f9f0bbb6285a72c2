//! Local tracking for remote font-build jobs.
//!
//! A tracked job is created before the remote call is made, then driven to
//! `ready` or `failed` by [`run_font_job`] on a background task. Progress
//! moves 5 → 10 → (10..90 while polling) → 92 → 100; a failure resets it to 0.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::font_service::{CreateJobRequest, FontBuildService, FontServiceError, StatusCheck};
use crate::fonts::{FontRegistry, LoadedFont};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Submitting,
    Processing,
    Downloading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FontJob {
    pub id: Uuid,
    pub remote_job_id: Option<String>,
    pub phase: JobPhase,
    /// 0..=100.
    pub progress: u8,
    pub message: String,
    /// Set once the downloaded font is in the registry.
    pub font_id: Option<Uuid>,
    pub family: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FontJob {
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, JobPhase::Ready | JobPhase::Failed)
    }
}

#[derive(Debug)]
struct TrackedJob {
    job: FontJob,
    touched: Instant,
}

/// Jobs by local id. Finished jobs are kept for `retention` after their last
/// update and swept when a new job is created.
#[derive(Debug)]
pub struct JobTracker {
    retention: Duration,
    jobs: RwLock<HashMap<Uuid, TrackedJob>>,
}

impl JobTracker {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self) -> FontJob {
        let now = Utc::now();
        let job = FontJob {
            id: Uuid::new_v4(),
            remote_job_id: None,
            phase: JobPhase::Submitting,
            progress: 5,
            message: "Creating job...".to_string(),
            font_id: None,
            family: None,
            created_at: now,
            updated_at: now,
        };

        let now = Instant::now();
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, tracked| !tracked.job.is_finished() || now.duration_since(tracked.touched) < self.retention);
        if jobs.len() < before {
            debug!(evicted = before - jobs.len(), "Expired font jobs dropped");
        }
        jobs.insert(
            job.id,
            TrackedJob {
                job: job.clone(),
                touched: now,
            },
        );
        job
    }

    pub async fn get(&self, id: Uuid) -> Option<FontJob> {
        self.jobs.read().await.get(&id).map(|tracked| tracked.job.clone())
    }

    async fn update<F>(&self, id: Uuid, apply: F)
    where
        F: FnOnce(&mut FontJob),
    {
        if let Some(tracked) = self.jobs.write().await.get_mut(&id) {
            apply(&mut tracked.job);
            tracked.job.updated_at = Utc::now();
            tracked.touched = Instant::now();
        }
    }
}

/// Poll cadence and the overall budget for waiting on the remote job.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

/// Drives one job to completion. Never returns an error: the outcome is
/// recorded on the tracked job.
pub async fn run_font_job(
    service: Arc<dyn FontBuildService>,
    tracker: Arc<JobTracker>,
    fonts: Arc<FontRegistry>,
    job_id: Uuid,
    request: CreateJobRequest,
    settings: PollSettings,
) {
    match drive(service.as_ref(), &tracker, &fonts, job_id, request, settings).await {
        Ok(font) => {
            info!(job_id = %job_id, font_id = %font.id, family = %font.family, "Font job finished");
        }
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "Font job failed");
            tracker
                .update(job_id, |job| {
                    job.phase = JobPhase::Failed;
                    job.progress = 0;
                    job.message = format!("Error: {e}");
                })
                .await;
        }
    }
}

async fn drive(
    service: &dyn FontBuildService,
    tracker: &JobTracker,
    fonts: &FontRegistry,
    job_id: Uuid,
    request: CreateJobRequest,
    settings: PollSettings,
) -> Result<Arc<LoadedFont>, FontServiceError> {
    let created = service.create_job(request).await?;
    tracker
        .update(job_id, |job| {
            job.remote_job_id = Some(created.job_id.clone());
            job.phase = JobPhase::Processing;
            job.progress = 10;
            job.message = format!("Job created: {}. Processing...", created.job_id);
        })
        .await;

    tokio::time::timeout(
        settings.timeout,
        poll_until_done(service, tracker, job_id, &created.job_id, settings.interval),
    )
    .await
    .map_err(|_| FontServiceError::TimedOut(settings.timeout.as_secs()))??;

    tracker
        .update(job_id, |job| {
            job.phase = JobPhase::Downloading;
            job.progress = 92;
            job.message = "Downloading font...".to_string();
        })
        .await;

    let download = service.download_font(&created.job_id).await?;
    info!(
        job_id = %job_id,
        bytes = download.data.len(),
        content_type = %download.content_type,
        "Font file received"
    );
    let font = fonts.load(download.data, Some(created.font_name)).await?;

    tracker
        .update(job_id, |job| {
            job.phase = JobPhase::Ready;
            job.progress = 100;
            job.message = "Font generated and loaded.".to_string();
            job.font_id = Some(font.id);
            job.family = Some(font.family.clone());
        })
        .await;

    Ok(font)
}

async fn poll_until_done(
    service: &dyn FontBuildService,
    tracker: &JobTracker,
    job_id: Uuid,
    remote_job_id: &str,
    interval: Duration,
) -> Result<(), FontServiceError> {
    loop {
        let status = service.job_status(remote_job_id).await?;
        match status.classify() {
            StatusCheck::Finished => return Ok(()),
            StatusCheck::Failed(message) => return Err(FontServiceError::JobFailed(message)),
            StatusCheck::Running { progress, message } => {
                tracker
                    .update(job_id, |job| {
                        job.progress = progress;
                        job.message = message;
                    })
                    .await;
            }
        }
        tokio::time::sleep(interval).await;
    }
}
