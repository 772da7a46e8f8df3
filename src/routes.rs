use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use url::Url;

use crate::{
    error::{validation_error, AppError},
    features::FeatureExtractor,
    model::Classifier,
    types::{FeaturesResponse, PredictResponse, UrlRequest},
};

#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<FeatureExtractor>,
    pub classifier: Arc<dyn Classifier>,
    pub metrics: Option<PrometheusHandle>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/features", post(features))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        // The browser extension calls from its own origin.
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Rejects anything that is not an absolute http(s) URL with a host. Accepted
/// URLs come back in normalized form.
fn validate_url(raw: &str) -> Result<String, AppError> {
    let url = Url::parse(raw.trim()).map_err(|e| validation_error(&format!("invalid url: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(validation_error("url scheme must be http or https"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(validation_error("url must have a host"));
    }
    Ok(url.to_string())
}

pub async fn predict(
    State(state): State<AppState>,
    Json(payload): Json<UrlRequest>,
) -> Result<Json<PredictResponse>, AppError> {
    let start = Instant::now();
    metrics::counter!("predict_requests_total").increment(1);

    let url = validate_url(&payload.url)?;
    let features = state.extractor.extract(&url).await;
    let label = state.classifier.predict(&features)?;

    metrics::counter!("predictions_total", "label" => label.to_string()).increment(1);
    info!(
        "Classified {} as {} in {:.1}ms",
        url,
        label,
        start.elapsed().as_millis() as f64
    );

    Ok(Json(PredictResponse { url, label }))
}

pub async fn features(
    State(state): State<AppState>,
    Json(payload): Json<UrlRequest>,
) -> Result<Json<FeaturesResponse>, AppError> {
    let url = validate_url(&payload.url)?;
    let features = state.extractor.extract(&url).await;

    Ok(Json(FeaturesResponse { url, features }))
}

pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.as_ref().map(PrometheusHandle::render).unwrap_or_default()
}
