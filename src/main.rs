//! Authentication API server

use auth_api::{
    create_routes, AuthConfig, AuthError, AuthWorkflow, DeliveryQueue, MailConfig, PgUserStore,
    ServerConfig, SmtpNotifier,
};

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env file is fine; the process environment still applies.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("auth_api=info,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("Server failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AuthError> {
    // Configuration errors are fatal at startup.
    let config = AuthConfig::from_env()?;
    let mail = MailConfig::from_env()?;
    let server = ServerConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&server.database_url)
        .await?;

    let store = PgUserStore::new(pool);
    store.run_migrations().await?;

    let (mailer, _worker) = DeliveryQueue::start(Arc::new(SmtpNotifier::new(&mail)?));
    let workflow = AuthWorkflow::new(config, Arc::new(store), mailer)?;

    let app = create_routes(Arc::new(workflow))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let address = server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(|e| AuthError::Config(format!("cannot bind {address}: {e}")))?;

    tracing::info!("Server running on http://{}", address);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("Server error: {:?}", e);
            AuthError::Internal
        })?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
