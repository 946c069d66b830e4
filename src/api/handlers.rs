use axum::extract::{State, rejection::JsonRejection};
use axum::Json;
use std::sync::Arc;

use crate::config::API_VERSION;
use crate::error::ApiError;
use crate::pipeline::IntelligenceService;

use super::models::{
    Endpoints, ExtractRequest, HealthResponse, IntelligenceResponse, SearchRequest, ServiceIndex,
};

pub async fn index_handler() -> Json<ServiceIndex> {
    Json(ServiceIndex {
        name: "Web Intelligence API",
        version: API_VERSION,
        endpoints: Endpoints {
            health: "/api/health",
            search: "/api/search (POST)",
            extract: "/api/extract (POST)",
        },
    })
}

/// Liveness only; external providers are never contacted.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: API_VERSION.to_string(),
    })
}

pub async fn search_handler(
    State(service): State<Arc<IntelligenceService>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<IntelligenceResponse>, ApiError> {
    let Json(request) = payload?;
    service.search_and_extract(request).await.map(Json)
}

pub async fn extract_handler(
    State(service): State<Arc<IntelligenceService>>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<IntelligenceResponse>, ApiError> {
    let Json(request) = payload?;
    service.extract(request).await.map(Json)
}
