//! Pipeline status handler.

use std::{sync::Arc, time::Instant};

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::pipeline::PipelineStat;

/// Shared state for the status handler.
pub struct DebugState {
    stat: Arc<PipelineStat>,
    started_at: Instant,
}

impl DebugState {
    /// Creates the debug state around the pipeline counters.
    pub fn new(stat: Arc<PipelineStat>) -> Self {
        Self { stat, started_at: Instant::now() }
    }
}

/// Snapshot returned by the status endpoint.
#[derive(Debug, Serialize)]
struct Status {
    uptime_secs: u64,
    urls_read: u64,
    requests_built: u64,
}

/// Creates a router for the status endpoint.
pub fn router(state: Arc<DebugState>) -> Router {
    Router::new().route("/debug/status", get(status_handler)).with_state(state)
}

async fn status_handler(State(state): State<Arc<DebugState>>) -> Json<Status> {
    Json(Status {
        uptime_secs: state.started_at.elapsed().as_secs(),
        urls_read: state.stat.urls_read(),
        requests_built: state.stat.requests_built(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_status_payload() {
        let stat = Arc::new(PipelineStat::default());
        stat.on_url();
        stat.on_request();
        stat.on_request();

        let state = Arc::new(DebugState::new(stat));
        let Json(status) = status_handler(State(state)).await;

        let v = serde_json::to_value(&status).unwrap();
        assert_eq!(v["urls_read"], 1);
        assert_eq!(v["requests_built"], 2);
        assert!(v["uptime_secs"].is_u64());
    }
}
