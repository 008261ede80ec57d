//! Standalone bridge REST server binary.
//!
//! ## Purpose
//! Runs the bridge REST server on its own.
//!
//! ## Intended use
//! This binary is useful for development and debugging when you only want
//! the bridge endpoint (with OpenAPI/Swagger UI). The workspace's main
//! `llamador-run` binary is the production entry point.

use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_rest::{ApiDoc, AppState};
use llamador_core::config::rest_addr_from_env_value;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = rest_addr_from_env_value(std::env::var("LLAMADOR_REST_ADDR").ok())?;

    tracing::info!("-- Starting llamador bridge REST API on {}", addr);

    let app = api_rest::router(AppState::new())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
