#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use tokio::sync::oneshot;
use x121_console::api::{ApiError, ConsoleApi};
use x121_console::retry::RetryPolicy;
use x121_console::AdminConsole;
use x121_console_core::credentials::StaticCredentials;
use x121_console_core::dashboard::{DashboardStats, MetricValue};
use x121_console_core::feedback::{FeedbackBundle, FeedbackRecord, FeedbackSummary};
use x121_console_core::identity::CallerIdentity;
use x121_console_core::session::{MemorySessionStore, SessionGate};
use x121_console_core::videos::OwnedItem;

pub const ADMIN_ID: &str = "admin";
pub const ADMIN_SECRET: &str = "s3cret";

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn sample_stats() -> DashboardStats {
    DashboardStats {
        data_volume: BTreeMap::from([
            ("total_videos".to_string(), MetricValue::Number(128.0)),
            ("storage".to_string(), MetricValue::Text("1.2 TB".to_string())),
        ]),
        video_types: BTreeMap::from([("tutorial".to_string(), MetricValue::Number(40.0))]),
        user_scale: BTreeMap::from([("active_users".to_string(), MetricValue::Number(17.0))]),
    }
}

pub fn record(video_id: &str, phase_index: i64, user_rating: i64) -> FeedbackRecord {
    FeedbackRecord {
        video_id: video_id.to_string(),
        phase_index,
        user_rating,
        user_comment: Some(format!("phase {phase_index}")),
        summary: None,
        time_start: phase_index as f64 * 10.0,
        time_end: phase_index as f64 * 10.0 + 9.5,
        video_name: format!("{video_id}.mp4"),
        user_email: Some("viewer@x121.io".to_string()),
        user_id: None,
        rated_at: None,
    }
}

/// Ten records with ratings 5,3,4,5,4,5,3,5,4,5 at phases 0..10.
pub fn scenario_bundle() -> FeedbackBundle {
    let ratings = [5, 3, 4, 5, 4, 5, 3, 5, 4, 5];
    FeedbackBundle {
        summary: FeedbackSummary {
            total_feedbacks: 10,
            average_rating: 4.2,
            with_comments: 6,
            rating_distribution: BTreeMap::from([(3, 2), (4, 3), (5, 5)]),
        },
        feedbacks: ratings
            .iter()
            .enumerate()
            .map(|(i, &r)| record("vid-1", i as i64, r))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Fake backend that counts calls per query. Failing queries return
/// [`ApiError::Status`] with the configured code.
#[derive(Default)]
pub struct FakeApi {
    pub dashboard_calls: AtomicU32,
    pub feedback_calls: AtomicU32,
    pub items_calls: AtomicU32,
    dashboard_failure: Mutex<Option<u16>>,
    feedback_failure: Mutex<Option<u16>>,
    dashboard_hold: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_dashboard(&self, status: Option<u16>) {
        *self.dashboard_failure.lock().unwrap() = status;
    }

    pub fn fail_feedback(&self, status: Option<u16>) {
        *self.feedback_failure.lock().unwrap() = status;
    }

    /// Make the next dashboard query wait until the returned sender fires.
    pub fn hold_dashboard(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.dashboard_hold.lock().unwrap() = Some(rx);
        tx
    }

    pub fn dashboard_calls(&self) -> u32 {
        self.dashboard_calls.load(Ordering::SeqCst)
    }

    pub fn feedback_calls(&self) -> u32 {
        self.feedback_calls.load(Ordering::SeqCst)
    }

    pub fn items_calls(&self) -> u32 {
        self.items_calls.load(Ordering::SeqCst)
    }
}

fn status_error(status: u16) -> ApiError {
    ApiError::Status {
        status,
        body: "upstream unavailable".to_string(),
    }
}

#[async_trait]
impl ConsoleApi for FakeApi {
    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.dashboard_calls.fetch_add(1, Ordering::SeqCst);
        let hold = self.dashboard_hold.lock().unwrap().take();
        if let Some(release) = hold {
            let _ = release.await;
        }
        let failure = *self.dashboard_failure.lock().unwrap();
        match failure {
            Some(status) => Err(status_error(status)),
            None => Ok(sample_stats()),
        }
    }

    async fn feedback_bundle(&self) -> Result<FeedbackBundle, ApiError> {
        self.feedback_calls.fetch_add(1, Ordering::SeqCst);
        let failure = *self.feedback_failure.lock().unwrap();
        match failure {
            Some(status) => Err(status_error(status)),
            None => Ok(scenario_bundle()),
        }
    }

    async fn owned_items(&self, identity: &CallerIdentity) -> Result<Vec<OwnedItem>, ApiError> {
        self.items_calls.fetch_add(1, Ordering::SeqCst);
        let owner = identity.as_str().unwrap_or_default();
        Ok(vec![
            OwnedItem {
                id: format!("{owner}-a"),
                original_filename: Some("intro.mp4".to_string()),
            },
            OwnedItem {
                id: format!("{owner}-b"),
                original_filename: None,
            },
        ])
    }
}

// ---------------------------------------------------------------------------
// Console construction
// ---------------------------------------------------------------------------

pub fn credentials() -> StaticCredentials {
    StaticCredentials::new(ADMIN_ID, ADMIN_SECRET)
}

/// Console over `api`, restoring its session from `store`. No retries.
pub fn build_console(api: Arc<FakeApi>, store: MemorySessionStore) -> AdminConsole {
    let gate = SessionGate::restore(Arc::new(store)).unwrap();
    AdminConsole::new(
        Arc::new(gate),
        Arc::new(credentials()),
        api,
        RetryPolicy::none(),
    )
}

// ---------------------------------------------------------------------------
// HTTP backend
// ---------------------------------------------------------------------------

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_backend(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
