//! HTTP trigger for crawl runs.
//!
//! | Route | Method | Response |
//! |-------|--------|----------|
//! | `/health` | GET | `ok` |
//! | `/scrape` | POST | Text summary: 200 when the run completes, 500 when setup fails, 409 while another run is in flight |
//!
//! Runs are serialised: a request arriving while a run is in progress is
//! refused rather than queued. Each run executes on its own task and keeps
//! going to shutdown even if the client that triggered it disconnects.

use crate::config::Settings;
use crate::orchestrator::{CrawlError, run};
use crate::outputs::report::RunReport;
use crate::store::AnyStore;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use std::error::Error;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

pub struct AppState {
    pub settings: Settings,
    pub store: AnyStore,
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(settings: Settings, store: AnyStore) -> Self {
        Self {
            settings,
            store,
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/scrape", post(scrape))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Start a run on its own task; `running` is released when the run ends.
fn spawn_run(
    state: Arc<AppState>,
    running: OwnedMutexGuard<()>,
) -> JoinHandle<Result<RunReport, CrawlError>> {
    tokio::spawn(async move {
        let _running = running;
        run(&state.settings, &state.store).await
    })
}

async fn scrape(State(state): State<Arc<AppState>>) -> (StatusCode, String) {
    let Ok(running) = Arc::clone(&state.run_lock).try_lock_owned() else {
        warn!("Scrape requested while a run is in progress");
        return (
            StatusCode::CONFLICT,
            "BUSY: a run is already in progress\n".to_string(),
        );
    };

    match spawn_run(Arc::clone(&state), running).await {
        Ok(Ok(report)) => (StatusCode::OK, report.to_string()),
        Ok(Err(e)) => {
            error!(error = %e, "Run failed during setup");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("FAILED: {e}\n"))
        }
        Err(e) => {
            error!(error = %e, "Run task did not complete");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "FAILED: run task did not complete\n".to_string(),
            )
        }
    }
}

/// Serve the trigger endpoints until the process is stopped.
#[instrument(level = "info", skip(state))]
pub async fn serve(bind: &str, state: AppState) -> Result<(), Box<dyn Error>> {
    let listener = TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, router(Arc::new(state))).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceId;
    use crate::render::EngineKind;
    use crate::store::MemoryStore;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn state(settings: Settings) -> Arc<AppState> {
        let store = AnyStore::Memory(MemoryStore::new());
        Arc::new(AppState::new(settings, store))
    }

    fn idle_settings() -> Settings {
        Settings {
            engine: EngineKind::Http,
            sources: Some(Vec::<SourceId>::new()),
            ..Settings::default()
        }
    }

    fn scrape_request() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/scrape")
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(body: Body) -> String {
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = router(state(idle_settings()))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response.into_body()).await, "ok");
    }

    #[tokio::test]
    async fn test_scrape_returns_summary() {
        let response = router(state(idle_settings()))
            .oneshot(scrape_request())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response.into_body()).await;
        assert!(text.starts_with("COMPLETED"));
    }

    #[tokio::test]
    async fn test_scrape_refused_while_running() {
        let state = state(idle_settings());
        let _running = state.run_lock.lock().await;

        let response = router(Arc::clone(&state))
            .oneshot(scrape_request())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_setup_failure_is_a_500_with_one_line() {
        let settings = Settings {
            concurrency: 0,
            ..idle_settings()
        };
        let response = router(state(settings))
            .oneshot(scrape_request())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let text = body_text(response.into_body()).await;
        assert!(text.starts_with("FAILED:"));
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_run_finishes_after_caller_goes_away() {
        let name = format!("news_detached_run_{}", std::process::id());
        let dir = std::env::temp_dir().join(name);
        let dir = dir.to_string_lossy().to_string();

        let state = state(Settings {
            report_dir: Some(dir.clone()),
            ..idle_settings()
        });

        let running = Arc::clone(&state.run_lock).try_lock_owned().unwrap();
        drop(spawn_run(Arc::clone(&state), running));

        // The lock comes back only once the detached run has ended.
        let _idle = state.run_lock.lock().await;
        let days: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(days.len(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
