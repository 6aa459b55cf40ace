/*****************************************************************************************
 *
 *  Textkeeper – numbered text blobs over HTTP
 *  ------------------------------------------
 *
 *  MongoDB-backed, with a connection that heals itself.
 *
 *****************************************************************************************/

use std::sync::Arc;

use axum::serve;
use tokio::net::TcpListener;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::FmtSubscriber;

use textkeeper::app;
use textkeeper::config::AppConfig;
use textkeeper::persistence::Gateway;
use textkeeper::services::text_service::TextStore;
use textkeeper::state::mongo::MongoConnector;

#[tokio::main]
async fn main() {
    //
    // ────────────────────────────────────────────────────────
    //  Load configuration (.env + environment)
    // ────────────────────────────────────────────────────────
    //
    let loaded = AppConfig::from_env();

    //
    // ────────────────────────────────────────────────────────
    //  Configure logging
    // ────────────────────────────────────────────────────────
    //
    let level_name = match &loaded {
        Ok(cfg) => cfg.log_level.clone(),
        Err(_) => std::env::var("LOG_LEVEL").unwrap_or_default(),
    };
    init_tracing(&level_name);

    tracing::info!(
        mongodb_uri_set = std::env::var_os("MONGODB_URI").is_some(),
        port_set = std::env::var_os("PORT").is_some(),
        "Environment variables loaded"
    );

    let cfg = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration, exiting");
            std::process::exit(1);
        }
    };

    tracing::info!("Starting textkeeper…");
    tracing::info!("Loaded configuration: {:?}", cfg);

    //
    // ────────────────────────────────────────────────────────
    //  Start the document store gateway
    // ────────────────────────────────────────────────────────
    //
    let connector = MongoConnector::new(
        cfg.mongodb_uri.clone(),
        cfg.collection.clone(),
        cfg.heartbeat_interval,
    );
    let gateway = Arc::new(Gateway::new(connector));
    let supervisor = Gateway::start(gateway.clone());

    //
    // ────────────────────────────────────────────────────────
    //  Build Axum app (texts + health)
    // ────────────────────────────────────────────────────────
    //
    let app = app::build_app(TextStore::new(gateway), &cfg);

    //
    // ────────────────────────────────────────────────────────
    //  Bind server and start listening
    // ────────────────────────────────────────────────────────
    //
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind address");
            supervisor.shutdown().await;
            std::process::exit(1);
        }
    };

    tracing::info!("Server running on http://{}", addr);

    if let Err(e) = serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    supervisor.shutdown().await;
    tracing::info!("Goodbye.");
}

fn init_tracing(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info"  => LevelFilter::INFO,
        "warn"  => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }
}

//
// ─────────────────────────────────────────────────────────────
//  Graceful shutdown: Ctrl+C or SIGTERM
// ─────────────────────────────────────────────────────────────
//
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::warn!("Ctrl+C received. Shutting down gracefully…"),
        _ = terminate => tracing::warn!("SIGTERM received. Shutting down gracefully…"),
    }
}
