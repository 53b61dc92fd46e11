use std::sync::Arc;

use agent_onboarding::config::ServiceConfig;
use agent_onboarding::error::Result;
use agent_onboarding::onboarding::{OnboardingRouteState, OnboardingSessions, onboarding_routes};
use agent_onboarding::store::{CheckpointStore, LibSqlBackend};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServiceConfig::from_env()?;

    eprintln!("Agent onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Default flavor: {}", config.default_flavor);
    eprintln!("   API: http://0.0.0.0:{}/api/onboarding", config.port);

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn CheckpointStore> = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);

    let resumable = store
        .list_sessions()
        .await?
        .iter()
        .filter(|record| !record.phase().is_terminal())
        .count();
    tracing::info!(resumable, "Loaded onboarding checkpoints");

    // ── HTTP ─────────────────────────────────────────────────────────────
    let state = OnboardingRouteState {
        sessions: Arc::new(OnboardingSessions::new(store)),
        default_flavor: config.default_flavor,
    };
    let app = onboarding_routes(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "Onboarding API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Ctrl+C received, shutting down...");
        })
        .await?;

    Ok(())
}
