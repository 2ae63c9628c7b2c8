//! Compute-and-cache demonstration endpoint
//!
//! `mode=before` always runs the unoptimized workload and forbids caching.
//! `mode=after` runs the reduced workload, memoizes the result in-process and
//! lets shared caches keep the response.

use crate::{
    error::{ServerError, ServerResult},
    server::ServerState,
};
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use storefront_core::{simulate, Mode, WorkloadParams};
use tracing::{debug, info};

/// `Cache-Control` for baseline measurements
pub const NO_STORE: &str = "no-store, max-age=0";

/// Raw query parameters, validated by `WorkloadParams::from_query`
#[derive(Debug, Default, Deserialize)]
pub struct HeavyQuery {
    pub mode: Option<String>,
    pub size: Option<String>,
    pub rounds: Option<String>,
}

/// Response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeavyResponse {
    pub mode: Mode,
    pub cached: bool,
    pub result: u64,
    /// Omitted on cache hits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// GET /api/public-heavy
pub async fn public_heavy(
    State(state): State<ServerState>,
    Query(query): Query<HeavyQuery>,
) -> ServerResult<Response> {
    state.profiling.ensure_started().await;

    let params = WorkloadParams::from_query(
        query.mode.as_deref(),
        query.size.as_deref(),
        query.rounds.as_deref(),
        &state.config.workload.limits(),
    )?;
    let key = params.cache_key();

    if params.mode.is_cacheable() {
        if let Some(result) = state.cache.get(&key) {
            debug!(key = %key, "Cache hit");
            let body = HeavyResponse {
                mode: params.mode,
                cached: true,
                result,
                duration_ms: None,
            };
            return Ok(respond(state.config.cache.shared_cache_control(), body));
        }
        debug!(key = %key, "Cache miss");
    }

    let start = Instant::now();
    let result = tokio::task::spawn_blocking(move || simulate(&params))
        .await
        .map_err(|e| ServerError::Internal(format!("Workload task failed: {}", e)))??;
    let duration_ms = start.elapsed().as_millis() as u64;

    info!(
        mode = %params.mode,
        size = params.size,
        rounds = params.rounds,
        result,
        duration_ms,
        "Workload computed"
    );

    let cache_control = match params.mode {
        Mode::After => {
            state.cache.set(key, result, state.config.cache.ttl());
            state.config.cache.shared_cache_control()
        }
        Mode::Before => NO_STORE.to_string(),
    };

    let body = HeavyResponse {
        mode: params.mode,
        cached: false,
        result,
        duration_ms: Some(duration_ms),
    };
    Ok(respond(cache_control, body))
}

fn respond(cache_control: String, body: HeavyResponse) -> Response {
    ([(header::CACHE_CONTROL, cache_control)], Json(body)).into_response()
}
