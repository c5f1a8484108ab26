use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;
use vx_core::{GenerationResult, RoomType};
use crate::error::{AppError, Result};
use crate::events::GenEvent;
use crate::generator::api::JobApi;
use crate::generator::schemas::JobStatusResponse;
use crate::generator::session::{GenerationSession, SessionTiming, GENERIC_FAILURE, PHASE_LABELS};
use crate::generator::Generator;
use crate::job::JobStatus;
use crate::wizard::{Wizard, WizardError, WizardStep};

enum Reply {
    Status(JobStatus),
    Completed(Option<GenerationResult>),
    Failed(Option<&'static str>),
    TransportError,
}

/// Scripted job API that counts every request it receives
struct FakeApi {
    submit_error: Option<&'static str>,
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
    submits: AtomicUsize,
    polls: AtomicUsize,
}

impl FakeApi {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            submit_error: None,
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
            submits: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        })
    }

    fn rejecting(message: &'static str) -> Arc<Self> {
        Arc::new(Self {
            submit_error: Some(message),
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            submits: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        })
    }

    fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn requests(&self) -> usize {
        self.submits.load(Ordering::SeqCst) + self.polls()
    }
}

#[async_trait]
impl JobApi for FakeApi {
    async fn submit(&self, prompt: &str) -> Result<String> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.submit_error {
            Some(message) => Err(AppError::Rejected(message.to_string())),
            None => Ok("job-42".to_string()),
        }
    }

    async fn job_status(&self, _job_id: &str) -> Result<JobStatusResponse> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Status(JobStatus::Processing));

        let response = |status, result, error: Option<&str>| JobStatusResponse {
            status,
            result,
            error: error.map(str::to_string),
        };

        match reply {
            Reply::Status(status) => Ok(response(status, None, None)),
            Reply::Completed(result) => Ok(response(JobStatus::Completed, result, None)),
            Reply::Failed(error) => Ok(response(JobStatus::Failed, None, error)),
            Reply::TransportError => Err(AppError::BackendError("HTTP 502 Bad Gateway: upstream".to_string())),
        }
    }
}

fn three_candidates() -> GenerationResult {
    let candidate = |id: u32| {
        json!({
            "id": id,
            "score": 70 + id,
            "model_url": format!("/static/models/model_{}.ply", id),
            "spec": {"rooms": [
                {"id": "living_0", "type": "Living", "area": 400, "color": "#A8DADC"},
                {"id": "bedroom_0", "type": "Bedroom", "area": 250 + id * 10, "color": "#F1FAEE"}
            ]},
            "layout": {"rooms": {
                "living_0": {"type": "Polygon", "coordinates": [[0, 0], [6, 0], [6, 6], [0, 6], [0, 0]]},
                "bedroom_0": {"type": "Polygon", "coordinates": [[6, 0], [10, 0], [10, 5], [6, 5], [6, 0]]}
            }},
            "stats": {"efficiency": 80, "privacy": 70, "daylight": 65, "circulation": 60, "average": 68.75}
        })
    };

    serde_json::from_value(json!({
        "model_url": "/static/models/model_1.ply",
        "candidates": [candidate(0), candidate(1), candidate(2)]
    }))
    .unwrap()
}

fn wizard_in_review(api: Arc<FakeApi>) -> Wizard {
    let mut wizard = Wizard::new(Generator::new(api, SessionTiming::default()));
    wizard.add_room(RoomType::Living, 400.0).unwrap();
    wizard.add_room(RoomType::Bedroom, 250.0).unwrap();
    assert_eq!(wizard.next().unwrap(), WizardStep::Review);
    wizard
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_generation() {
    let api = FakeApi::new(vec![
        Reply::Status(JobStatus::Processing),
        Reply::Status(JobStatus::Processing),
        Reply::Completed(Some(three_candidates())),
    ]);
    let mut wizard = wizard_in_review(api.clone());

    assert_eq!(wizard.generate().unwrap(), WizardStep::Generating);
    assert_eq!(wizard.phase_label(), PHASE_LABELS[0]);
    assert_eq!(wizard.wait_for_outcome().await, WizardStep::Results);

    let active = wizard.store().active().unwrap();
    assert_eq!(active.id, 1);
    assert_eq!(active.model_url, "/static/models/model_1.ply");
    assert_eq!(wizard.job().unwrap().status, JobStatus::Completed);

    // Polls at 2, 4 and 6; ticker advances at 3 and 6
    assert_eq!(api.polls(), 3);
    assert_eq!(wizard.phase_advances(), 2);
    assert_eq!(wizard.phase_label(), PHASE_LABELS[2]);
    assert!(!wizard.is_generating());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.polls(), 3);
    assert_eq!(wizard.phase_advances(), 2);

    let prompts = api.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("a living room of 400 sqft"));
}

#[tokio::test(start_paused = true)]
async fn test_completed_on_first_poll_stops_everything() {
    let api = FakeApi::new(vec![Reply::Completed(Some(three_candidates()))]);
    let mut wizard = wizard_in_review(api.clone());
    wizard.generate().unwrap();

    assert_eq!(wizard.wait_for_outcome().await, WizardStep::Results);
    assert_eq!(wizard.phase_advances(), 0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.polls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_submit_failure_returns_to_review() {
    let api = FakeApi::rejecting("Rate limit exceeded");
    let mut wizard = wizard_in_review(api.clone());
    wizard.generate().unwrap();

    assert_eq!(wizard.wait_for_outcome().await, WizardStep::Review);
    assert!(wizard.error().unwrap().contains("Rate limit exceeded"));
    assert!(wizard.job().is_none());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.polls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_poll_errors_are_swallowed() {
    let api = FakeApi::new(vec![
        Reply::TransportError,
        Reply::Status(JobStatus::Queued),
        Reply::TransportError,
        Reply::Completed(Some(three_candidates())),
    ]);
    let mut wizard = wizard_in_review(api.clone());
    wizard.generate().unwrap();

    assert_eq!(wizard.wait_for_outcome().await, WizardStep::Results);
    assert_eq!(api.polls(), 4);
    assert!(wizard.error().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_job_failure_messages() {
    let api = FakeApi::new(vec![Reply::Status(JobStatus::Processing), Reply::Failed(Some("No valid layout found"))]);
    let mut wizard = wizard_in_review(api.clone());
    wizard.generate().unwrap();

    assert_eq!(wizard.wait_for_outcome().await, WizardStep::Review);
    assert_eq!(wizard.error(), Some("No valid layout found"));
    assert_eq!(wizard.job().unwrap().status, JobStatus::Failed);
    assert!(wizard.store().is_empty());

    // Without a server message the generic one is shown
    let api = FakeApi::new(vec![Reply::Failed(None)]);
    let mut wizard = wizard_in_review(api);
    wizard.generate().unwrap();
    wizard.wait_for_outcome().await;
    assert_eq!(wizard.error(), Some(GENERIC_FAILURE));
}

#[tokio::test(start_paused = true)]
async fn test_completed_without_result_is_failure() {
    let api = FakeApi::new(vec![Reply::Completed(None)]);
    let mut wizard = wizard_in_review(api.clone());
    wizard.generate().unwrap();

    assert_eq!(wizard.wait_for_outcome().await, WizardStep::Review);
    assert!(wizard.error().is_some());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.polls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_failure_clears_previous_run() {
    let api = FakeApi::new(vec![Reply::Failed(Some("busy")), Reply::Completed(Some(three_candidates()))]);
    let mut wizard = wizard_in_review(api.clone());
    wizard.generate().unwrap();
    assert_eq!(wizard.wait_for_outcome().await, WizardStep::Review);

    wizard.generate().unwrap();
    assert!(wizard.error().is_none());
    assert!(wizard.job().is_none());
    assert_eq!(wizard.wait_for_outcome().await, WizardStep::Results);
    assert_eq!(wizard.store().candidates().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_session() {
    let api = FakeApi::new(Vec::new());
    let mut wizard = wizard_in_review(api.clone());
    wizard.generate().unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(api.polls(), 2);

    wizard.reset().await;
    assert_eq!(wizard.step(), WizardStep::Rooms);
    assert!(wizard.input().rooms.is_empty());
    assert!(!wizard.is_generating());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.polls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_wizard_stops_polling() {
    let api = FakeApi::new(Vec::new());
    let mut wizard = wizard_in_review(api.clone());
    wizard.generate().unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(api.polls(), 1);
    drop(wizard);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(api.polls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_events_are_ignored() {
    let api = FakeApi::new(Vec::new());
    let mut wizard = wizard_in_review(api);
    wizard.generate().unwrap();

    let stale = GenEvent::JobComplete {
        session: Uuid::new_v4(),
        job_id: "old-job".to_string(),
        result: three_candidates(),
    };
    assert!(!wizard.handle_event(stale));
    assert_eq!(wizard.step(), WizardStep::Generating);
    assert!(wizard.store().is_empty());

    wizard.reset().await;
}

#[tokio::test(start_paused = true)]
async fn test_select_candidate_makes_no_requests() {
    let api = FakeApi::new(vec![Reply::Completed(Some(three_candidates()))]);
    let mut wizard = wizard_in_review(api.clone());
    wizard.generate().unwrap();
    wizard.wait_for_outcome().await;

    let before = api.requests();
    let active = wizard.select_candidate(2).unwrap();
    assert_eq!(active.id, 2);
    assert_eq!(active.model_url, "/static/models/model_2.ply");
    assert_eq!(active.spec.room("bedroom_0").unwrap().area, 270.0);

    assert!(matches!(
        wizard.select_candidate(7),
        Err(WizardError::Core(vx_core::Error::UnknownCandidate(7)))
    ));
    assert_eq!(wizard.store().active().unwrap().id, 2);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(api.requests(), before);

    // Results chart against the requested 1200 sq ft
    let series = wizard.derived_series();
    assert_eq!(series.len(), 3);
    assert_eq!(series[2].value, 1200.0 - 400.0 - 270.0);
}

#[tokio::test(start_paused = true)]
async fn test_transitions_are_guarded() {
    let api = FakeApi::new(Vec::new());
    let mut wizard = Wizard::new(Generator::new(api, SessionTiming::default()));

    assert!(matches!(wizard.back(), Err(WizardError::InvalidTransition { .. })));
    assert!(matches!(wizard.generate(), Err(WizardError::InvalidTransition { .. })));

    wizard.add_room(RoomType::Living, 2000.0).unwrap();
    assert!(matches!(wizard.next(), Err(WizardError::Validation(_))));
    assert_eq!(wizard.step(), WizardStep::Rooms);
    assert_eq!(wizard.input().rooms.len(), 1);
    assert!(wizard.error().is_some());

    wizard.edit(|input| input.total_area = 2000.0).unwrap();
    assert_eq!(wizard.next().unwrap(), WizardStep::Review);
    assert!(wizard.error().is_none());

    // Rooms are frozen outside step 1
    assert!(wizard.add_room(RoomType::Study, 100.0).is_err());
    assert_eq!(wizard.back().unwrap(), WizardStep::Rooms);
    assert!(wizard.add_room(RoomType::Study, 100.0).is_ok());
}

/// Job API whose status requests take longer than the poll interval
#[derive(Default)]
struct SlowApi {
    polls: AtomicUsize,
}

#[async_trait]
impl JobApi for SlowApi {
    async fn submit(&self, _prompt: &str) -> Result<String> {
        Ok("job-slow".to_string())
    }

    async fn job_status(&self, _job_id: &str) -> Result<JobStatusResponse> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(7)).await;
        Ok(JobStatusResponse { status: JobStatus::Processing, result: None, error: None })
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_poll_does_not_hold_back_ticker() {
    let api = Arc::new(SlowApi::default());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let start = tokio::time::Instant::now();
    let session = GenerationSession::start(api.clone(), "a small cabin".to_string(), SessionTiming::default(), tx);

    let mut phase_times = Vec::new();
    while phase_times.len() < 3 {
        match rx.recv().await {
            Some(GenEvent::Phase { .. }) => phase_times.push(start.elapsed().as_secs()),
            Some(_) => {}
            None => break,
        }
    }
    assert_eq!(phase_times, vec![3, 6, 9]);

    // One request from 2 to 9, the next starts at 9 rather than a burst of catch-up polls
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(api.polls.load(Ordering::SeqCst), 2);

    session.cancel().await;
}

mod http {
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use crate::config::AppConfig;
    use crate::error::AppError;
    use crate::generator::api::{ApiClient, JobApi};
    use crate::job::JobStatus;

    const PLY: &str = "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\n\
                       property float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n\
                       0 0 0\n4 0 0\n0 3 2.8\n3 0 1 2\n";

    async fn generate(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer test-token");
        if !authorized {
            return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Not authenticated"})));
        }
        if body["prompt"].as_str().unwrap_or_default().is_empty() {
            return (StatusCode::OK, Json(json!({"success": false, "error": "Empty prompt"})));
        }
        (StatusCode::OK, Json(json!({"success": true, "job_id": "65f0c0ffee"})))
    }

    async fn job(Path(job_id): Path<String>) -> Json<Value> {
        Json(json!({"_id": job_id, "status": "pending", "prompt": "two bedrooms", "user_id": "u1"}))
    }

    async fn serve() -> String {
        let app = Router::new()
            .route("/api/v1/generate", post(generate))
            .route("/api/v1/jobs/{job_id}", get(job))
            .route(
                "/api/v1/my-designs",
                get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token"}))) }),
            )
            .route("/static/models/model_0.ply", get(|| async { PLY }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base: &str, token: Option<&str>) -> ApiClient {
        let config = AppConfig::default().with_overrides(Some(base.to_string()), token.map(str::to_string));
        ApiClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_submit_and_poll_over_http() {
        let base = serve().await;
        let api = client(&base, Some("test-token"));

        let job_id = api.submit("two bedrooms facing the garden").await.unwrap();
        assert_eq!(job_id, "65f0c0ffee");

        let status = api.job_status(&job_id).await.unwrap();
        assert_eq!(status.status, JobStatus::Queued);
        assert!(status.result.is_none());

        assert!(matches!(api.submit("").await, Err(AppError::Rejected(msg)) if msg == "Empty prompt"));
    }

    #[tokio::test]
    async fn test_http_errors_carry_server_detail() {
        let base = serve().await;

        let anonymous = client(&base, None);
        let err = anonymous.submit("two bedrooms").await.unwrap_err();
        assert!(matches!(err, AppError::BackendError(msg) if msg.contains("Not authenticated")));

        let err = client(&base, Some("test-token")).my_designs().await.unwrap_err();
        assert!(err.to_string().contains("Invalid token"));
    }

    #[tokio::test]
    async fn test_fetch_relative_model() {
        let base = serve().await;
        let api = client(&base, None);

        assert_eq!(api.resolve_asset_url("https://cdn.example.com/m.ply"), "https://cdn.example.com/m.ply");
        assert_eq!(
            api.resolve_asset_url("/static/models/model_0.ply"),
            format!("{}/static/models/model_0.ply", base)
        );

        let mesh = api.fetch_model("/static/models/model_0.ply").await.unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
    }
}
