use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::error::Result;
use crate::events::GenEvent;
use crate::generator::api::JobApi;
use crate::generator::schemas::JobStatusResponse;
use crate::job::JobStatus;

/// Cosmetic progress labels shown while a job runs
pub const PHASE_LABELS: [&str; 5] = [
    "Analyzing room requirements...",
    "Arranging room adjacencies...",
    "Synthesizing candidate layouts...",
    "Scoring candidates...",
    "Building 3D models...",
];

pub const GENERIC_FAILURE: &str = "Generation failed. Please try again.";

type StatusRequest = Pin<Box<dyn Future<Output = Result<JobStatusResponse>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionTiming {
    pub poll_interval: Duration,
    pub ticker_interval: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            ticker_interval: Duration::from_secs(3),
        }
    }
}

/// Handle to a running generation task. Cancelling or dropping it stops
/// both the poller and the ticker.
#[derive(Debug)]
pub struct GenerationSession {
    id: Uuid,
    handle: Option<JoinHandle<()>>,
}

impl GenerationSession {
    pub fn start(
        api: Arc<dyn JobApi>,
        prompt: String,
        timing: SessionTiming,
        tx: UnboundedSender<GenEvent>,
    ) -> Self {
        let id = Uuid::new_v4();
        let handle = tokio::spawn(run_session(id, api, prompt, timing, tx));

        Self {
            id,
            handle: Some(handle),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stop polling and ticking, returning once the task is gone
    pub async fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            // Cancelled or already finished, either way nothing is left running
            let _ = handle.await;
            debug!("Generation session {} cancelled", self.id);
        }
    }
}

impl Drop for GenerationSession {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run_session(
    session: Uuid,
    api: Arc<dyn JobApi>,
    prompt: String,
    timing: SessionTiming,
    tx: UnboundedSender<GenEvent>,
) {
    let job_id = match api.submit(&prompt).await {
        Ok(job_id) => job_id,
        Err(e) => {
            warn!("Failed to submit generation job: {}", e);
            let _ = tx.send(GenEvent::JobFailed {
                session,
                job_id: None,
                error: e.to_string(),
            });
            return;
        }
    };

    if tx.send(GenEvent::JobSubmitted { session, job_id: job_id.clone() }).is_err() {
        return;
    }

    let start = Instant::now();
    let mut poll = interval_at(start + timing.poll_interval, timing.poll_interval);
    let mut ticker = interval_at(start + timing.ticker_interval, timing.ticker_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut phase = 0;
    let mut in_flight: Option<StatusRequest> = None;

    loop {
        tokio::select! {
            biased;

            _ = ticker.tick() => {
                if phase + 1 >= PHASE_LABELS.len() {
                    continue;
                }
                phase += 1;
                let event = GenEvent::Phase { session, index: phase, label: PHASE_LABELS[phase] };
                if tx.send(event).is_err() {
                    return;
                }
            }

            response = status_response(&mut in_flight), if in_flight.is_some() => {
                in_flight = None;
                let response = match response {
                    Ok(response) => response,
                    Err(e) => {
                        warn!("Polling job {} failed, retrying on next tick: {}", job_id, e);
                        continue;
                    }
                };

                let event = match response.status {
                    JobStatus::Completed => match response.result {
                        Some(result) => {
                            info!("Job {} completed with {} candidates", job_id, result.candidates.len());
                            GenEvent::JobComplete { session, job_id: job_id.clone(), result }
                        }
                        None => GenEvent::JobFailed {
                            session,
                            job_id: Some(job_id.clone()),
                            error: "Job completed without a result".to_string(),
                        },
                    },
                    JobStatus::Failed => {
                        let error = response.error.unwrap_or_else(|| GENERIC_FAILURE.to_string());
                        warn!("Job {} failed: {}", job_id, error);
                        GenEvent::JobFailed { session, job_id: Some(job_id.clone()), error }
                    }
                    status => GenEvent::JobStatus { session, job_id: job_id.clone(), status },
                };

                let terminal = event.is_terminal();
                if tx.send(event).is_err() || terminal {
                    return;
                }
            }

            // At most one status request is outstanding
            _ = poll.tick(), if in_flight.is_none() => {
                let api = api.clone();
                let job_id = job_id.clone();
                in_flight = Some(Box::pin(async move { api.job_status(&job_id).await }));
            }
        }
    }
}

async fn status_response(request: &mut Option<StatusRequest>) -> Result<JobStatusResponse> {
    match request.as_mut() {
        Some(request) => request.await,
        None => std::future::pending().await,
    }
}
