use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use routes::{
    batches::submit_batch,
    comments::list_comments,
    health::{live, ready},
    insights::{get_consultations, get_metrics},
    keywords::{export_keywords, get_keywords},
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Probes for k8s/systemd
    let probes = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let ingestion = Router::new().route(
        "/batches",
        post(submit_batch).layer(DefaultBodyLimit::max(app_state.config.ingest_max_body_bytes)),
    );

    let insights = Router::new()
        .route("/comments", get(list_comments))
        .route("/consultations", get(get_consultations))
        .route("/metrics", get(get_metrics))
        .route("/keywords", get(get_keywords))
        .route("/keywords/export", get(export_keywords));

    probes.merge(ingestion).merge(insights)
}
