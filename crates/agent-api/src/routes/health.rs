//! Health check and API info.

use axum::Json;
use progear_core::AgentKind;
use serde::Serialize;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    agents: [AgentKind; 4],
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "progear-ai-api",
        version: VERSION,
        agents: AgentKind::ALL,
    })
}

#[derive(Debug, Serialize)]
pub struct ApiInfo {
    name: &'static str,
    version: &'static str,
    health: &'static str,
    agents: usize,
}

pub async fn root() -> Json<ApiInfo> {
    Json(ApiInfo {
        name: "ProGear AI Sales API",
        version: VERSION,
        health: "/health",
        agents: AgentKind::ALL.len(),
    })
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::testing::get;

    #[tokio::test]
    async fn test_health_lists_agents() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "progear-ai-api");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(
            body["agents"],
            json!(["sales", "inventory", "customer", "pricing"])
        );
    }

    #[tokio::test]
    async fn test_root_info() {
        let (status, body) = get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "ProGear AI Sales API");
        assert_eq!(body["health"], "/health");
        assert_eq!(body["agents"], 4);
    }
}
