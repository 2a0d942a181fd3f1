use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use beheard_events::{
    AblyRealtime, EmailConfig, ExpoPush, InvitationMailer, LogRealtime, PartnerNotifier,
    PushConfig, RealtimeConfig, RealtimeService,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use beheard_api::app::{build_app, build_cors_layer};
use beheard_api::config::ServerConfig;
use beheard_api::error::expose_internal_details;
use beheard_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "beheard_api=debug,beheard_events=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    expose_internal_details(config.is_development());
    tracing::info!(
        host = %config.host,
        port = %config.port,
        app_env = %config.app_env,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = beheard_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    beheard_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    beheard_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- CORS ---
    let cors = build_cors_layer(&config).expect("Invalid CORS origin in CORS_ORIGINS");

    // --- Realtime ---
    let (realtime, ably_key) = match RealtimeConfig::from_env() {
        Some(realtime_config) => {
            let ably = AblyRealtime::new(&realtime_config).expect("Invalid ABLY_API_KEY");
            let key = ably.key().clone();
            tracing::info!("Realtime publishing enabled");
            let realtime: Arc<dyn RealtimeService> = Arc::new(ably);
            (realtime, Some(key))
        }
        None => {
            tracing::warn!("ABLY_API_KEY not set, realtime events will be logged only");
            let realtime: Arc<dyn RealtimeService> = Arc::new(LogRealtime);
            (realtime, None)
        }
    };

    // --- Push ---
    let push = ExpoPush::new(pool.clone(), PushConfig::from_env())
        .expect("Failed to build push notification client");

    let notifier = PartnerNotifier::new(realtime, Arc::new(push));
    let mailer = Arc::new(InvitationMailer::new(EmailConfig::from_env()));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        notifier,
        mailer,
        ably_key,
    };

    let app = build_app(state, cors);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            tracing::error!(?result, "Server stopped unexpectedly");
            return;
        }
        () = shutdown_signal() => {}
    }

    // --- Drain in-flight requests ---
    let _ = stop_tx.send(());
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    match tokio::time::timeout(drain, server).await {
        Ok(Ok(Ok(()))) => tracing::info!("Graceful shutdown complete"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "Server error during shutdown"),
        Ok(Err(e)) => tracing::error!(error = %e, "Server task failed"),
        Err(_) => tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Shutdown timed out with requests still in flight"
        ),
    }
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
