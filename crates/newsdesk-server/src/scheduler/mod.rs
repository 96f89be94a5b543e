//! Background job scheduler.
//!
//! Registers the recurring purge-and-refresh job at server startup.

use std::sync::Arc;

use newsdesk_core::AppConfig;
use newsdesk_ingest::IngestService;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the refresh cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    service: Arc<IngestService>,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_refresh_job(&scheduler, service, &config).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the auto-refresh job on `NEWSDESK_REFRESH_CRON`.
///
/// Each tick purges articles older than `NEWSDESK_REFRESH_MAX_AGE_HOURS` and
/// refills every pipeline. A tick that fires while a previous refresh is still
/// running supersedes it.
async fn register_refresh_job(
    scheduler: &JobScheduler,
    service: Arc<IngestService>,
    config: &AppConfig,
) -> Result<(), JobSchedulerError> {
    let max_age_hours = config.refresh_max_age_hours;

    let job = Job::new_async(config.refresh_cron.as_str(), move |_uuid, _lock| {
        let service = Arc::clone(&service);

        Box::pin(async move {
            tracing::info!(max_age_hours, "scheduler: starting auto-refresh");
            let report = service.purge_and_refresh(max_age_hours, false).await;
            if report.success {
                tracing::info!(
                    removed = report.removed,
                    added = report.articles_added,
                    duration_ms = report.duration_ms,
                    "scheduler: auto-refresh complete"
                );
            } else {
                tracing::error!(
                    error = report.error.as_deref().unwrap_or("unknown"),
                    "scheduler: auto-refresh failed"
                );
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %config.refresh_cron, "scheduler: auto-refresh registered");
    Ok(())
}
