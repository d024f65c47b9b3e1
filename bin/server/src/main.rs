use parley_ai::OpenAiCompatibleProvider;
use parley_conversation::ConversationStore;
use parley_integration::WhatsAppClient;
use parley_protocol::ToolDispatcher;
use parley_server::{
    app::{self, AppState},
    cleanup,
    config::ServerConfig,
    db::SqliteStore,
    error::StartupError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> parley_core::Result<(), StartupError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| StartupError::Config {
        reason: e.to_string(),
    })?;
    tracing::info!(environment = %config.environment, "Loaded configuration");

    let store = SqliteStore::connect(&config.database_path)
        .await
        .map_err(|e| StartupError::Database {
            reason: e.to_string(),
        })?;
    let store: Arc<dyn ConversationStore> = Arc::new(store);

    // Cleanup expired sessions on startup
    cleanup::purge_expired(store.as_ref()).await;

    let mut dispatcher = ToolDispatcher::new(store.clone());
    match config.completion.api_key() {
        Some(api_key) => {
            let provider = OpenAiCompatibleProvider::new(
                config.completion.base_url.as_str(),
                api_key,
                config.completion.settings(),
            )
            .map_err(|e| StartupError::Client {
                reason: e.to_string(),
            })?;
            tracing::info!(model = %config.completion.model, "Completion provider initialized");
            dispatcher = dispatcher.with_provider(Arc::new(provider));
        }
        None => {
            tracing::warn!("COMPLETION__API_KEY not set, using fallback responses");
        }
    }

    let whatsapp = WhatsAppClient::new(config.whatsapp.settings()).map_err(|e| {
        StartupError::Client {
            reason: e.to_string(),
        }
    })?;
    if !whatsapp.is_configured() {
        tracing::warn!("WhatsApp credentials not set, outbound sending disabled");
    }

    // Spawn periodic session cleanup task
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let cleanup_task = cleanup::spawn_session_cleanup(
        store.clone(),
        Duration::from_secs(config.cleanup.interval_seconds.max(1)),
        shutdown_rx,
    );

    let state = Arc::new(AppState::new(
        dispatcher,
        config.whatsapp.verify_token.clone(),
        config.completion.model.clone(),
    ));
    let app = app::router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| StartupError::Serve {
            reason: e.to_string(),
        })?;

    tracing::info!(
        database = %config.database_path,
        model = %config.completion.model,
        "listening on http://{}",
        addr
    );
    tracing::info!("endpoints: POST /mcp, GET|POST /webhook, GET /health, GET /tools, GET /stats");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Serve {
            reason: e.to_string(),
        })?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = cleanup_task.await {
        tracing::warn!(error = %e, "Session cleanup task failed");
    }

    tracing::info!("Server exited");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutting down server...");
}
