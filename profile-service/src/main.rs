use profile_service::{
    build_router,
    config::ProfileConfig,
    services::{AuthService, KeycloakClient, MongoDb, ProfileError, TokenVerifier},
    AppState,
};
use service_core::error::AppError;
use service_core::middleware::rate_limit::create_ip_rate_limiter;
use service_core::observability::{init_metrics, init_tracing, shutdown_tracing};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Fail fast on bad configuration
    let config = ProfileConfig::load()?;

    init_tracing(&config.service_name, &config.log_level, &config.otlp_endpoint);
    init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting profile service"
    );

    let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database)
        .await
        .map_err(startup_error)?;
    db.initialize_indexes().await.map_err(startup_error)?;
    tracing::info!("Database initialized successfully");

    let keycloak = KeycloakClient::new(config.keycloak.clone()).map_err(startup_error)?;
    let verifier = TokenVerifier::new(&config.keycloak.public_key_path, &config.keycloak.issuer())
        .map_err(|e| AppError::ConfigError(e.to_string()))?;

    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let register_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.register_attempts,
        config.rate_limit.register_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Login, Register");

    let store = Arc::new(db);
    let auth_service = AuthService::new(
        store.clone(),
        Arc::new(keycloak),
        config.keycloak.default_groups.clone(),
    );
    tracing::info!(groups = ?config.keycloak.default_groups, "Default groups for new accounts");

    let state = AppState {
        config: config.clone(),
        store,
        auth_service,
        verifier,
        login_rate_limiter,
        register_rate_limiter,
    };
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    service_core::axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    shutdown_tracing();
    Ok(())
}

fn startup_error(err: ProfileError) -> AppError {
    AppError::InternalError(anyhow::Error::new(err))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
