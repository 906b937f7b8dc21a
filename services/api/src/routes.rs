use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use contract_preflight::entity::EntityStory;
use contract_preflight::error::AppError;
use contract_preflight::quality::{GateReport, PageRecord};
use contract_preflight::PreflightReport;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct PreflightRequest {
    #[serde(default)]
    pub(crate) pages: Option<Vec<PageRecord>>,
    #[serde(default)]
    pub(crate) entity_story: Option<EntityStory>,
}

impl PreflightRequest {
    fn into_parts(self) -> Result<(Vec<PageRecord>, Option<EntityStory>), AppError> {
        let pages = self
            .pages
            .ok_or_else(|| AppError::BadRequest("pages must be an array of page records".to_string()))?;
        Ok((pages, self.entity_story))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PreflightResponse {
    pub(crate) generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub(crate) report: PreflightReport,
}

#[derive(Debug, Serialize)]
pub(crate) struct GateResponse {
    pub(crate) generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub(crate) report: GateReport,
}

pub(crate) fn preflight_router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/preflight", post(preflight_endpoint))
        .route("/api/v1/preflight/gate", post(gate_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn preflight_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<PreflightRequest>,
) -> Result<Json<PreflightResponse>, AppError> {
    let (pages, story) = payload.into_parts()?;
    let report = state.engine.assess(&pages, story);
    info!(
        pages = pages.len(),
        gate_color = report.gate.gate_color.label(),
        "preflight request served"
    );

    Ok(Json(PreflightResponse {
        generated_at: Utc::now(),
        report,
    }))
}

pub(crate) async fn gate_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<PreflightRequest>,
) -> Result<Json<GateResponse>, AppError> {
    let (pages, _) = payload.into_parts()?;
    Ok(Json(GateResponse {
        generated_at: Utc::now(),
        report: state.engine.gate(&pages),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use contract_preflight::PreflightEngine;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    fn state() -> AppState {
        let handle = PrometheusBuilder::new().build_recorder().handle();
        AppState::new(PreflightEngine::default(), handle)
    }

    fn app(state: AppState) -> Router {
        preflight_router().layer(Extension(state))
    }

    async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds");
        let response = app.oneshot(request).await.expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let json = serde_json::from_slice(&bytes).expect("body is json");
        (status, json)
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let state = state();
        let request = || Request::builder().uri("/ready").body(Body::empty()).expect("request builds");

        let response = app(state.clone()).oneshot(request()).await.expect("router responds");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.mark_ready();
        let response = app(state).oneshot(request()).await.expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn preflight_returns_every_domain() {
        let body = json!({
            "pages": [{
                "page": 1,
                "text": "Distribution Agreement\nEffective date: January 1, 2024.\nTerritory: Worldwide.\nTerm of 3 years.",
                "char_count": 100
            }]
        });
        let (status, json) = post_json(app(state()), "/api/v1/preflight", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["gate_color"], "GREEN");
        assert!(json["generated_at"].is_string());
        assert_eq!(json["opportunity_spine"]["checks"].as_array().map(Vec::len), Some(6));
        assert!(json["health_score"]["calibrated_score"].is_number());
    }

    #[tokio::test]
    async fn gate_endpoint_reports_empty_documents() {
        let (status, json) = post_json(app(state()), "/api/v1/preflight/gate", json!({ "pages": [] })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["gate_color"], "RED");
        assert_eq!(json["gate_reasons"], json!(["no_pages"]));
        assert_eq!(json["metrics"], json!({}));
    }

    #[tokio::test]
    async fn missing_pages_is_a_bad_request() {
        let (status, json) = post_json(app(state()), "/api/v1/preflight", json!({ "pages": null })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"]
            .as_str()
            .is_some_and(|message| message.contains("pages")));
    }
}
