use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_rest::{ApiDoc, AppState};
use llamador_core::config::{backend_base_url_from_env_value, rest_addr_from_env_value};
use llamador_core::BridgeConfig;

/// Main entry point for the llamador application
///
/// Starts the REST server carrying the patient-calling bridge:
/// - SSE push subscriptions for waiting-room monitors
/// - call dispatch for the agenda
/// - health check and Swagger UI
///
/// # Environment Variables
/// - `LLAMADOR_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `BACKEND_BASE_URL`: base URL of the reverse-proxied agenda backend
///   (optional; consumed by the surrounding application, not the bridge)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("llamador=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = rest_addr_from_env_value(std::env::var("LLAMADOR_REST_ADDR").ok())?;
    let backend_base_url = backend_base_url_from_env_value(std::env::var("BACKEND_BASE_URL").ok())?;
    let config = BridgeConfig::new(rest_addr, backend_base_url);

    tracing::info!("++ Starting llamador bridge on {}", config.rest_addr());
    if let Some(backend) = config.backend_base_url() {
        tracing::info!("++ Agenda backend proxied at {}", backend);
    }

    let app = api_rest::router(AppState::new())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.rest_addr()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
