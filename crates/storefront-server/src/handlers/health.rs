//! Health check handlers

use crate::{error::ServerResult, server::ServerState};
use axum::{extract::State, Json};
use serde_json::{json, Value};

const SERVICE: &str = "storefront-server";

/// Basic health check
pub async fn health_check() -> ServerResult<Json<Value>> {
    Ok(Json(json!({
        "status": "ok",
        "service": SERVICE,
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Readiness check - reports cache size and profiler state.
///
/// A failed profiler does not make the service unready; requests are still served.
pub async fn readiness_check(State(state): State<ServerState>) -> ServerResult<Json<Value>> {
    let mut checks = serde_json::Map::new();

    checks.insert(
        "cache".to_string(),
        json!({
            "status": "ok",
            "entries": state.cache.len(),
            "ttl_secs": state.config.cache.ttl_secs
        }),
    );

    let profiling = match state.profiling.status() {
        Some(status) => json!(status),
        None => json!("pending"),
    };
    checks.insert(
        "profiling".to_string(),
        json!({
            "status": profiling,
            "configured": state.profiling.is_configured()
        }),
    );

    Ok(Json(json!({
        "status": "ready",
        "service": SERVICE,
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "checks": checks
    })))
}

/// Liveness check - checks if server is alive
pub async fn liveness_check() -> ServerResult<Json<Value>> {
    Ok(Json(json!({
        "status": "alive",
        "service": SERVICE,
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ServerConfig, profiling::ProfilingHook};

    fn create_test_state() -> ServerState {
        ServerState::with_profiling(ServerConfig::default(), ProfilingHook::disabled())
    }

    #[tokio::test]
    async fn test_health_check() {
        let json_value = health_check().await.unwrap().0;

        assert_eq!(json_value["status"], "ok");
        assert_eq!(json_value["service"], "storefront-server");
        assert_eq!(json_value["version"], crate::VERSION);
        assert!(json_value["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_readiness_check() {
        let state = create_test_state();
        state.cache.set("after:1000:4", 1, state.config.cache.ttl());

        let json_value = readiness_check(State(state.clone())).await.unwrap().0;
        assert_eq!(json_value["status"], "ready");
        assert_eq!(json_value["checks"]["cache"]["entries"], 1);
        assert_eq!(json_value["checks"]["profiling"]["status"], "pending");
        assert_eq!(json_value["checks"]["profiling"]["configured"], false);

        state.profiling.ensure_started().await;
        let json_value = readiness_check(State(state)).await.unwrap().0;
        assert_eq!(json_value["checks"]["profiling"]["status"], "disabled");
    }

    #[tokio::test]
    async fn test_liveness_check() {
        let json_value = liveness_check().await.unwrap().0;
        assert_eq!(json_value["status"], "alive");
        assert_eq!(json_value["service"], "storefront-server");
    }
}
