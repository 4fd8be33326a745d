use std::sync::Arc;

use api_router::{api_routes_v1, api_state::ApiState};
use axum::Router;
use common::{storage::store::StorageManager, utils::config::get_config};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;

    let openai_client = Arc::new(async_openai::Client::with_config(
        async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ));

    let storage = StorageManager::new(&config).await?;
    info!(
        backend = ?storage.backend_kind(),
        base_dir = ?storage.local_base_path(),
        "Storage initialized"
    );

    let api_state = ApiState::new(&config, storage, openai_client).await?;
    info!(
        processing_model = %config.processing_model,
        collaborator_timeout_secs = config.collaborator_timeout_secs,
        "Ingestion pipeline ready"
    );

    let app = app_router(api_state);

    let serve_address = format!("0.0.0.0:{}", config.http_port);
    info!("Starting server listening on {}", serve_address);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn app_router(api_state: ApiState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes_v1(&api_state))
        .with_state(api_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use common::{
        storage::db::SurrealDbClient,
        utils::config::{AppConfig, StorageKind},
    };
    use ingestion_pipeline::IngestionPipeline;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn smoke_test_config(database: &str) -> AppConfig {
        AppConfig {
            openai_api_key: "test-key".into(),
            surrealdb_address: "mem://".into(),
            surrealdb_namespace: "test_ns".into(),
            surrealdb_database: database.into(),
            http_port: 0,
            openai_base_url: "https://example.com".into(),
            storage: StorageKind::Memory,
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn smoke_startup_with_in_memory_surrealdb() {
        let database = format!("test_db_{}", Uuid::new_v4());
        let config = smoke_test_config(&database);

        let db = Arc::new(
            SurrealDbClient::memory(&config.surrealdb_namespace, &database)
                .await
                .expect("failed to start in-memory surrealdb"),
        );
        db.ensure_initialized()
            .await
            .expect("failed to initialize schema");

        let openai_client = Arc::new(async_openai::Client::with_config(
            async_openai::config::OpenAIConfig::new()
                .with_api_key(&config.openai_api_key)
                .with_api_base(&config.openai_base_url),
        ));
        let storage = StorageManager::new(&config)
            .await
            .expect("failed to build storage manager");

        let pipeline = Arc::new(IngestionPipeline::new(
            db.clone(),
            openai_client,
            config.clone(),
            storage,
        ));
        let api_state = ApiState {
            db,
            config,
            pipeline,
        };

        let app = app_router(api_state);

        for uri in ["/api/v1/live", "/api/v1/ready", "/api/v1/metrics"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
                .await
                .expect("router response");
            assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
        }
    }
}
